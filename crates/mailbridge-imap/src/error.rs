//! Error types for the IMAP client.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur during IMAP operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error during network operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TLS handshake or encryption error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// Invalid DNS name for TLS.
    #[error("Invalid DNS name: {0}")]
    InvalidDnsName(#[from] rustls::pki_types::InvalidDnsNameError),

    /// Response could not be parsed.
    #[error("Parse error at position {position}: {message}")]
    Parse {
        /// Byte offset in the response line.
        position: usize,
        /// What went wrong.
        message: String,
    },

    /// Server answered with a tagged NO.
    #[error("Server returned NO: {0}")]
    No(String),

    /// Server answered with a tagged BAD.
    #[error("Server returned BAD: {0}")]
    Bad(String),

    /// Server sent BYE and is closing the connection.
    #[error("Server sent BYE: {0}")]
    Bye(String),

    /// Connect or command exceeded the configured timeout.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// Command issued in a connection state that does not allow it.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Unexpected data on the wire.
    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// Result type alias using the IMAP error.
pub type Result<T> = std::result::Result<T, Error>;
