//! Reply data.

/// STAT reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stat {
    /// Number of messages in the maildrop.
    pub count: u32,
    /// Total size in octets.
    pub size: u64,
}

/// One line of a LIST reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListEntry {
    /// Message number, 1-based.
    pub number: u32,
    /// Size in octets.
    pub size: u64,
}

/// One line of a UIDL reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UidlEntry {
    /// Message number, 1-based.
    pub number: u32,
    /// Server-assigned unique id, stable across sessions.
    pub uid: String,
}
