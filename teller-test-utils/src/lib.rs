//! Test utilities for teller
//!
//! This crate provides an in-memory datagram network with fault injection,
//! message builders, and a harness that wires a server and clients onto the
//! simulated network.

pub mod builders;
pub mod harness;
pub mod network;

// Re-export commonly used types
pub use builders::MessageBuilder;
pub use harness::{ServerHandle, TestBed};
pub use network::{Datagram, Fault, FaultConfig, NetworkStats, SimulatedNetwork, SimulatedSocket};
