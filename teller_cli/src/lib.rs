//! teller command-line interface
//!
//! The binary lives in `main.rs`; the pieces it is built from are exposed here
//! so integration tests can drive them directly.

pub mod client;
pub mod config;
pub mod error;
pub mod paths;
pub mod prompt;
pub mod terminal;

pub use config::{AppConfig, ConfigManager};
pub use error::{CliError, CliResult, ExitCode};
