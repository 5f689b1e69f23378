//! Error types for the core library.

use thiserror::Error;

use crate::protocol::Protocol;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The operation has no meaning for the active protocol.
    #[error("{protocol} does not support this operation: {reason}")]
    NotSupportedInProtocol {
        /// Protocol the call was made against.
        protocol: Protocol,
        /// Human-readable reason.
        reason: String,
    },

    /// An argument has the wrong kind, e.g. a text value for a flag key.
    #[error("Invalid argument type: {0}")]
    InvalidArgumentType(String),

    /// An argument has the right kind but an unusable value.
    #[error("Invalid argument value: {0}")]
    InvalidArgumentValue(String),

    /// The call is illegal in the current connection state.
    #[error("Protocol state error: {0}")]
    ProtocolState(String),

    /// The message has no sender to put in `From`.
    #[error("Message sender must be a text or an address")]
    InvalidSenderType,

    /// IMAP operation failed.
    #[error(transparent)]
    Imap(#[from] mailbridge_imap::Error),

    /// POP3 operation failed.
    #[error(transparent)]
    Pop3(#[from] mailbridge_pop3::Error),

    /// SMTP operation failed.
    #[error(transparent)]
    Smtp(#[from] mailbridge_smtp::Error),

    /// MIME encoding or decoding failed.
    #[error(transparent)]
    Mime(#[from] mailbridge_mime::Error),

    /// I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for [`Error::NotSupportedInProtocol`].
    pub(crate) fn unsupported(protocol: Protocol, reason: impl Into<String>) -> Self {
        Self::NotSupportedInProtocol {
            protocol,
            reason: reason.into(),
        }
    }

    /// Returns true for errors raised by the core before touching the network.
    #[must_use]
    pub const fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Self::NotSupportedInProtocol { .. }
                | Self::InvalidArgumentType(_)
                | Self::InvalidArgumentValue(_)
                | Self::ProtocolState(_)
                | Self::InvalidSenderType
        )
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
