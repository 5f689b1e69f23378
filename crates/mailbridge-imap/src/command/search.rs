//! SEARCH keys.

use chrono::NaiveDate;

/// A search key tree.
///
/// `And` is the implicit conjunction of IMAP search keys. An empty
/// conjunction matches everything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchKey {
    /// Every message.
    All,
    /// `\Answered` set.
    Answered,
    /// `\Answered` not set.
    Unanswered,
    /// `\Deleted` set.
    Deleted,
    /// `\Deleted` not set.
    Undeleted,
    /// `\Flagged` set.
    Flagged,
    /// `\Flagged` not set.
    Unflagged,
    /// `\Seen` set.
    Seen,
    /// `\Seen` not set.
    Unseen,
    /// `\Recent` set.
    Recent,
    /// `\Recent` not set.
    Old,
    /// `\Recent` set and `\Seen` not set.
    New,
    /// Substring of the Bcc header.
    Bcc(String),
    /// Substring of the Cc header.
    Cc(String),
    /// Substring of the To header.
    To(String),
    /// Substring of the From header.
    From(String),
    /// Substring of the Subject header.
    Subject(String),
    /// Substring of the headers or body.
    Text(String),
    /// Substring of the body.
    Body(String),
    /// Date header falls on the day.
    SentOn(NaiveDate),
    /// Date header earlier than the day.
    SentBefore(NaiveDate),
    /// Date header on or after the day.
    SentSince(NaiveDate),
    /// Negation.
    Not(Box<Self>),
    /// Disjunction.
    Or(Box<Self>, Box<Self>),
    /// Conjunction.
    And(Vec<Self>),
}

impl SearchKey {
    /// Negates a key.
    #[must_use]
    pub fn not(key: Self) -> Self {
        Self::Not(Box::new(key))
    }

    /// Builds the disjunction of two keys.
    #[must_use]
    pub fn or(a: Self, b: Self) -> Self {
        Self::Or(Box::new(a), Box::new(b))
    }

    /// Returns true if any string argument contains non-ASCII text.
    ///
    /// Such searches are sent with `CHARSET UTF-8`.
    #[must_use]
    pub fn needs_utf8(&self) -> bool {
        match self {
            Self::Bcc(s)
            | Self::Cc(s)
            | Self::To(s)
            | Self::From(s)
            | Self::Subject(s)
            | Self::Text(s)
            | Self::Body(s) => !s.is_ascii(),
            Self::Not(key) => key.needs_utf8(),
            Self::Or(a, b) => a.needs_utf8() || b.needs_utf8(),
            Self::And(keys) => keys.iter().any(Self::needs_utf8),
            _ => false,
        }
    }
}

/// Formats a date as IMAP `date` (`1-Feb-1994`).
#[must_use]
pub fn format_search_date(date: NaiveDate) -> String {
    date.format("%-d-%b-%Y").to_string()
}
