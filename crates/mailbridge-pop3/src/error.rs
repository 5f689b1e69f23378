//! Error types for POP3 operations.

use std::io;
use std::time::Duration;

/// Result type alias for POP3 operations.
pub type Result<T> = std::result::Result<T, Error>;

/// POP3 error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// TLS error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// Host name not usable for TLS.
    #[error("Invalid DNS name: {0}")]
    InvalidDnsName(#[from] rustls::pki_types::InvalidDnsNameError),

    /// Server answered `-ERR`.
    #[error("Server returned -ERR: {0}")]
    Server(String),

    /// Unexpected data on the wire.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Connect or command exceeded the configured timeout.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// Feature not supported by server.
    #[error("Server does not support {0}")]
    NotSupported(String),
}

impl Error {
    /// Returns true if the server rejected the command, as opposed to a
    /// transport failure.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(self, Self::Server(_))
    }
}
