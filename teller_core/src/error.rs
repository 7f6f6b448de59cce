//! Error types for the teller core library
//!
//! Protocol errors cover the wire and the transport. Session errors are the
//! terminal outcomes of a client session.

use crate::protocol::RequestId;
use std::time::Duration;
use thiserror::Error;

pub use crate::protocol::error::ProtocolError;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the teller core library
#[derive(Error, Debug)]
pub enum Error {
    /// Protocol related errors
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// No reply arrived within the failure threshold; the session is over
    #[error(
        "Server unresponsive: no reply to request {request_id} after {waited:?} and {attempts} attempts"
    )]
    ServerUnresponsive {
        request_id: RequestId,
        waited: Duration,
        attempts: u32,
    },

    /// Every request id representable on the wire has been used
    #[error("Request ids exhausted after {last}")]
    RequestIdsExhausted { last: RequestId },

    /// The session was aborted earlier and sends nothing more
    #[error("Session aborted after the server became unresponsive")]
    SessionAborted,
}

impl Error {
    /// Check if this error ends the client session
    pub fn is_session_fatal(&self) -> bool {
        matches!(
            self,
            Self::ServerUnresponsive { .. }
                | Self::RequestIdsExhausted { .. }
                | Self::SessionAborted
        )
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Self::Protocol(ProtocolError::Io(source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;

    #[test]
    fn test_server_unresponsive_display() {
        let error = Error::ServerUnresponsive {
            request_id: RequestId::new(3),
            waited: Duration::from_secs(30),
            attempts: 6,
        };
        assert_eq!(
            error.to_string(),
            "Server unresponsive: no reply to request 3 after 30s and 6 attempts"
        );
        assert!(error.is_session_fatal());
        assert!(Error::SessionAborted.is_session_fatal());
        assert!(
            Error::RequestIdsExhausted {
                last: RequestId::MAX
            }
            .is_session_fatal()
        );
    }

    #[test]
    fn test_protocol_errors_are_not_session_fatal() {
        let error: Error = ProtocolError::invalid_packet("bad").into();
        assert!(!error.is_session_fatal());
    }

    #[test]
    fn test_io_error_conversion() {
        let error: Error = std::io::Error::other("boom").into();
        assert!(matches!(error, Error::Protocol(ProtocolError::Io(_))));
        // Transparent wrapping forwards the source of the inner error
        assert!(error.source().is_some());
    }
}
