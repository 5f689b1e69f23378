//! FETCH and STORE arguments.

use crate::types::Flag;

/// A FETCH data item request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchAttribute {
    /// UID.
    Uid,
    /// FLAGS.
    Flags,
    /// INTERNALDATE.
    InternalDate,
    /// RFC822.SIZE.
    Rfc822Size,
    /// `BODY.PEEK[section]`: does not set `\Seen`. `None` fetches the
    /// whole message.
    BodyPeek(Option<String>),
}

impl FetchAttribute {
    /// `BODY.PEEK[HEADER]`.
    #[must_use]
    pub fn header() -> Self {
        Self::BodyPeek(Some("HEADER".to_string()))
    }

    /// `BODY.PEEK[]`.
    #[must_use]
    pub const fn full() -> Self {
        Self::BodyPeek(None)
    }
}

/// How STORE changes the flag set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreMode {
    /// `FLAGS`: replace.
    Replace,
    /// `+FLAGS`: add.
    Add,
    /// `-FLAGS`: remove.
    Remove,
}

/// A STORE action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreAction {
    /// Replace, add or remove.
    pub mode: StoreMode,
    /// Flags to apply.
    pub flags: Vec<Flag>,
}

impl StoreAction {
    /// Adds flags.
    #[must_use]
    pub fn add(flags: impl Into<Vec<Flag>>) -> Self {
        Self {
            mode: StoreMode::Add,
            flags: flags.into(),
        }
    }

    /// Removes flags.
    #[must_use]
    pub fn remove(flags: impl Into<Vec<Flag>>) -> Self {
        Self {
            mode: StoreMode::Remove,
            flags: flags.into(),
        }
    }
}
