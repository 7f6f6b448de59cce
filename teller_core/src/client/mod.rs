//! Client side of the protocol
//!
//! - `sequencer`: request id assignment
//! - `retry`: send / await / retransmit loop and its timing policy
//! - `session`: the session object tying both to a transport

mod retry;
mod sequencer;
mod session;

pub use retry::RetryPolicy;
pub use sequencer::Sequencer;
pub use session::{ClientSession, Reply, SessionState, SessionStats};
