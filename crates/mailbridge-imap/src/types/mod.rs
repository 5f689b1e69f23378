//! Core IMAP types.

mod flags;
mod mailbox;
mod sequence;

pub use flags::{Flag, Flags};
pub use mailbox::{ListResponse, Mailbox, MailboxAttribute, MailboxStatus};
pub use sequence::{UidRange, UidSet};

use std::num::NonZeroU32;

/// IMAP command tag.
///
/// Every command carries a unique tag and the completion response repeats it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag(pub String);

impl Tag {
    /// Creates a tag from a string.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Returns the tag as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Message sequence number.
///
/// Assigned from 1 in mailbox order; shifts when messages are expunged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SeqNum(pub NonZeroU32);

impl SeqNum {
    /// Creates a sequence number, `None` for 0.
    #[must_use]
    pub fn new(n: u32) -> Option<Self> {
        NonZeroU32::new(n).map(Self)
    }

    /// Returns the underlying value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

impl std::fmt::Display for SeqNum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Persistent per-mailbox message identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Uid(pub NonZeroU32);

impl Uid {
    /// Creates a UID, `None` for 0.
    #[must_use]
    pub fn new(n: u32) -> Option<Self> {
        NonZeroU32::new(n).map(Self)
    }

    /// Returns the underlying value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

impl std::fmt::Display for Uid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status of a tagged or untagged status response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Success.
    Ok,
    /// Operational failure.
    No,
    /// Protocol error in the command.
    Bad,
    /// Connection is already authenticated.
    PreAuth,
    /// Server is closing the connection.
    Bye,
}

/// Bracketed response code, e.g. `[UIDVALIDITY 3857529045]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseCode {
    /// Mailbox opened read-only.
    ReadOnly,
    /// Mailbox opened read-write.
    ReadWrite,
    /// UIDVALIDITY of the selected mailbox.
    UidValidity(u32),
    /// Predicted next UID.
    UidNext(u32),
    /// Sequence number of the first unseen message.
    Unseen(u32),
    /// Capability list carried in a greeting or LOGIN reply.
    Capability(Vec<String>),
    /// Server refuses because of a trycreate condition.
    TryCreate,
    /// Any other code, kept verbatim.
    Other(String),
}
