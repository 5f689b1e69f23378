//! IMAP commands and their serialization.

mod search;
mod serialize;
mod tag_generator;
mod types;

use crate::types::{Mailbox, UidSet};

pub use search::{SearchKey, format_search_date};
pub use tag_generator::TagGenerator;
pub use types::{FetchAttribute, StoreAction, StoreMode};

use serialize::{
    write_astring, write_fetch_attributes, write_mailbox, write_search_key, write_store_action,
};

/// An IMAP command. APPEND is absent because its literal needs a
/// continuation round trip; the client drives it directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// CAPABILITY.
    Capability,
    /// NOOP.
    Noop,
    /// LOGOUT.
    Logout,
    /// STARTTLS.
    StartTls,
    /// LOGIN.
    Login {
        /// User name.
        username: String,
        /// Password.
        password: String,
    },
    /// SELECT (read-write).
    Select {
        /// Mailbox to open.
        mailbox: Mailbox,
    },
    /// EXAMINE (read-only).
    Examine {
        /// Mailbox to open.
        mailbox: Mailbox,
    },
    /// UNSELECT (RFC 3691): leave the selected state without expunging.
    Unselect,
    /// EXPUNGE.
    Expunge,
    /// CREATE.
    Create {
        /// Mailbox name.
        mailbox: Mailbox,
    },
    /// DELETE.
    Delete {
        /// Mailbox name.
        mailbox: Mailbox,
    },
    /// RENAME.
    Rename {
        /// Existing name.
        from: Mailbox,
        /// New name.
        to: Mailbox,
    },
    /// SUBSCRIBE.
    Subscribe {
        /// Mailbox name.
        mailbox: Mailbox,
    },
    /// UNSUBSCRIBE.
    Unsubscribe {
        /// Mailbox name.
        mailbox: Mailbox,
    },
    /// LIST.
    List {
        /// Reference name.
        reference: String,
        /// Pattern with `*` and `%` wildcards.
        pattern: String,
    },
    /// LSUB.
    Lsub {
        /// Reference name.
        reference: String,
        /// Pattern with `*` and `%` wildcards.
        pattern: String,
    },
    /// UID FETCH.
    UidFetch {
        /// Target messages.
        uids: UidSet,
        /// Requested items.
        attributes: Vec<FetchAttribute>,
    },
    /// UID SEARCH.
    UidSearch {
        /// Search criteria.
        criteria: SearchKey,
    },
    /// UID STORE.
    UidStore {
        /// Target messages.
        uids: UidSet,
        /// Flag change.
        action: StoreAction,
        /// Suppress the untagged FETCH replies.
        silent: bool,
    },
}

impl Command {
    /// Serializes the command with its tag, including the trailing CRLF.
    #[must_use]
    pub fn serialize(&self, tag: &str) -> Vec<u8> {
        let mut buf = Vec::with_capacity(64);
        buf.extend_from_slice(tag.as_bytes());
        buf.push(b' ');

        match self {
            Self::Capability => buf.extend_from_slice(b"CAPABILITY"),
            Self::Noop => buf.extend_from_slice(b"NOOP"),
            Self::Logout => buf.extend_from_slice(b"LOGOUT"),
            Self::StartTls => buf.extend_from_slice(b"STARTTLS"),
            Self::Login { username, password } => {
                buf.extend_from_slice(b"LOGIN ");
                write_astring(&mut buf, username);
                buf.push(b' ');
                write_astring(&mut buf, password);
            }
            Self::Select { mailbox } => {
                buf.extend_from_slice(b"SELECT ");
                write_mailbox(&mut buf, mailbox);
            }
            Self::Examine { mailbox } => {
                buf.extend_from_slice(b"EXAMINE ");
                write_mailbox(&mut buf, mailbox);
            }
            Self::Unselect => buf.extend_from_slice(b"UNSELECT"),
            Self::Expunge => buf.extend_from_slice(b"EXPUNGE"),
            Self::Create { mailbox } => {
                buf.extend_from_slice(b"CREATE ");
                write_mailbox(&mut buf, mailbox);
            }
            Self::Delete { mailbox } => {
                buf.extend_from_slice(b"DELETE ");
                write_mailbox(&mut buf, mailbox);
            }
            Self::Rename { from, to } => {
                buf.extend_from_slice(b"RENAME ");
                write_mailbox(&mut buf, from);
                buf.push(b' ');
                write_mailbox(&mut buf, to);
            }
            Self::Subscribe { mailbox } => {
                buf.extend_from_slice(b"SUBSCRIBE ");
                write_mailbox(&mut buf, mailbox);
            }
            Self::Unsubscribe { mailbox } => {
                buf.extend_from_slice(b"UNSUBSCRIBE ");
                write_mailbox(&mut buf, mailbox);
            }
            Self::List { reference, pattern } => {
                buf.extend_from_slice(b"LIST ");
                write_list_args(&mut buf, reference, pattern);
            }
            Self::Lsub { reference, pattern } => {
                buf.extend_from_slice(b"LSUB ");
                write_list_args(&mut buf, reference, pattern);
            }
            Self::UidFetch { uids, attributes } => {
                buf.extend_from_slice(b"UID FETCH ");
                buf.extend_from_slice(uids.to_string().as_bytes());
                buf.push(b' ');
                write_fetch_attributes(&mut buf, attributes);
            }
            Self::UidSearch { criteria } => {
                buf.extend_from_slice(b"UID SEARCH ");
                if criteria.needs_utf8() {
                    buf.extend_from_slice(b"CHARSET UTF-8 ");
                }
                write_search_key(&mut buf, criteria);
            }
            Self::UidStore {
                uids,
                action,
                silent,
            } => {
                buf.extend_from_slice(b"UID STORE ");
                buf.extend_from_slice(uids.to_string().as_bytes());
                buf.push(b' ');
                write_store_action(&mut buf, action, *silent);
            }
        }

        buf.extend_from_slice(b"\r\n");
        buf
    }

    /// Returns the command text with credentials masked, for logging.
    #[must_use]
    pub fn redacted(&self, tag: &str) -> String {
        match self {
            Self::Login { username, .. } => format!("{tag} LOGIN {username} ****"),
            other => String::from_utf8_lossy(&other.serialize(tag))
                .trim_end()
                .to_string(),
        }
    }
}

/// Writes the APPEND prefix up to and including the literal length.
#[must_use]
pub fn append_prefix(tag: &str, mailbox: &Mailbox, flags: &[crate::types::Flag], len: usize) -> Vec<u8> {
    let mut buf = Vec::with_capacity(64);
    buf.extend_from_slice(tag.as_bytes());
    buf.extend_from_slice(b" APPEND ");
    write_mailbox(&mut buf, mailbox);
    if !flags.is_empty() {
        buf.extend_from_slice(b" (");
        for (i, flag) in flags.iter().enumerate() {
            if i > 0 {
                buf.push(b' ');
            }
            buf.extend_from_slice(flag.as_str().as_bytes());
        }
        buf.push(b')');
    }
    buf.extend_from_slice(format!(" {{{len}}}\r\n").as_bytes());
    buf
}

fn write_list_args(buf: &mut Vec<u8>, reference: &str, pattern: &str) {
    write_astring(buf, &Mailbox::new(reference).to_wire());
    buf.push(b' ');
    let wire = Mailbox::new(pattern).to_wire();
    // Wildcards must stay bare; only quote for other specials.
    if wire.is_empty()
        || wire
            .bytes()
            .any(|b| matches!(b, b' ' | b'"' | b'\\' | b'(' | b')' | b'{') || b < 0x20)
    {
        write_astring(buf, &wire);
    } else {
        buf.extend_from_slice(wire.as_bytes());
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{Flag, Uid};

    fn text(cmd: &Command) -> String {
        String::from_utf8(cmd.serialize("A0001")).unwrap()
    }

    #[test]
    fn test_login() {
        let cmd = Command::Login {
            username: "user@example.com".into(),
            password: "pa ss".into(),
        };
        assert_eq!(text(&cmd), "A0001 LOGIN user@example.com \"pa ss\"\r\n");
        assert_eq!(cmd.redacted("A0001"), "A0001 LOGIN user@example.com ****");
    }

    #[test]
    fn test_select_encodes_name() {
        let cmd = Command::Select {
            mailbox: Mailbox::new("Entwürfe"),
        };
        assert_eq!(text(&cmd), "A0001 SELECT Entw&APw-rfe\r\n");
    }

    #[test]
    fn test_list_keeps_wildcards() {
        let cmd = Command::List {
            reference: String::new(),
            pattern: "*".into(),
        };
        assert_eq!(text(&cmd), "A0001 LIST \"\" *\r\n");
    }

    #[test]
    fn test_rename() {
        let cmd = Command::Rename {
            from: Mailbox::new("Work/Old"),
            to: Mailbox::new("Work/New Name"),
        };
        assert_eq!(text(&cmd), "A0001 RENAME Work/Old \"Work/New Name\"\r\n");
    }

    #[test]
    fn test_uid_fetch() {
        let cmd = Command::UidFetch {
            uids: UidSet::from_uids([Uid::new(4).unwrap(), Uid::new(5).unwrap()]),
            attributes: vec![FetchAttribute::Uid, FetchAttribute::full()],
        };
        assert_eq!(text(&cmd), "A0001 UID FETCH 4:5 (UID BODY.PEEK[])\r\n");
    }

    #[test]
    fn test_uid_search_charset() {
        let ascii = Command::UidSearch {
            criteria: SearchKey::Subject("hello".into()),
        };
        assert_eq!(text(&ascii), "A0001 UID SEARCH SUBJECT hello\r\n");

        let utf8 = Command::UidSearch {
            criteria: SearchKey::Subject("привет".into()),
        };
        assert_eq!(
            text(&utf8),
            "A0001 UID SEARCH CHARSET UTF-8 SUBJECT \"привет\"\r\n"
        );
    }

    #[test]
    fn test_uid_store() {
        let cmd = Command::UidStore {
            uids: UidSet::from_uids([Uid::new(9).unwrap()]),
            action: StoreAction::remove(vec![Flag::Deleted]),
            silent: true,
        };
        assert_eq!(text(&cmd), "A0001 UID STORE 9 -FLAGS.SILENT (\\Deleted)\r\n");
    }

    #[test]
    fn test_append_prefix() {
        let prefix = append_prefix("A0002", &Mailbox::inbox(), &[Flag::Seen], 42);
        assert_eq!(
            String::from_utf8(prefix).unwrap(),
            "A0002 APPEND INBOX (\\Seen) {42}\r\n"
        );
    }
}
