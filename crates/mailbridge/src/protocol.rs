//! Protocol selection and per-call options.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Mail protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Protocol {
    /// IMAP4rev1: folders, flags, persistent UIDs, server-side search.
    Imap,
    /// POP3: a single mailbox with session-scoped numbering.
    Pop3,
    /// SMTP: submission only.
    Smtp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Imap => "IMAP",
            Self::Pop3 => "POP3",
            Self::Smtp => "SMTP",
        })
    }
}

/// Whether texts go through [`Message::process_texts`](crate::Message::process_texts)
/// before a message is serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextProcessing {
    /// Run the text pass.
    Process,
    /// Send texts as they are.
    #[default]
    DontProcess,
}

/// How `get_identifiers` treats the caller's known ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum KnownIdPolicy {
    /// Return only ids that are not known yet.
    #[default]
    Exclude,
    /// Return only ids that are already known.
    Include,
}

impl KnownIdPolicy {
    /// Applies the policy to server ids.
    ///
    /// Without a known-id list every id is returned.
    #[must_use]
    pub fn apply(self, ids: Vec<String>, known: Option<&[String]>) -> Vec<String> {
        let Some(known) = known else {
            return ids;
        };
        ids.into_iter()
            .filter(|id| known.contains(id) == (self == Self::Include))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_known_id_polarity() {
        let server = ids(&["a", "b", "c"]);
        let known = ids(&["b"]);

        assert_eq!(
            KnownIdPolicy::Exclude.apply(server.clone(), Some(&known)),
            ids(&["a", "c"])
        );
        assert_eq!(
            KnownIdPolicy::Include.apply(server.clone(), Some(&known)),
            ids(&["b"])
        );
        assert_eq!(KnownIdPolicy::Include.apply(server.clone(), None), server);
    }

    #[test]
    fn test_display() {
        assert_eq!(Protocol::Imap.to_string(), "IMAP");
        assert_eq!(Protocol::Pop3.to_string(), "POP3");
    }
}
