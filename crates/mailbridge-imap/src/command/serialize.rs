//! Command serialization helpers.

use crate::types::Mailbox;

use super::search::{SearchKey, format_search_date};
use super::types::{FetchAttribute, StoreAction, StoreMode};

/// Writes an astring: a bare atom when safe, otherwise a quoted string.
pub fn write_astring(buf: &mut Vec<u8>, s: &str) {
    if s.is_empty() || s.bytes().any(needs_quoting) {
        write_quoted(buf, s);
    } else {
        buf.extend_from_slice(s.as_bytes());
    }
}

fn write_quoted(buf: &mut Vec<u8>, s: &str) {
    buf.push(b'"');
    for b in s.bytes() {
        if b == b'"' || b == b'\\' {
            buf.push(b'\\');
        }
        buf.push(b);
    }
    buf.push(b'"');
}

/// Writes a mailbox name in modified UTF-7.
pub fn write_mailbox(buf: &mut Vec<u8>, mailbox: &Mailbox) {
    write_astring(buf, &mailbox.to_wire());
}

const fn needs_quoting(b: u8) -> bool {
    matches!(
        b,
        b' ' | b'"' | b'\\' | b'(' | b')' | b'{' | b'%' | b'*' | b']'
    ) || b < 0x20
        || b >= 0x7F
}

/// Writes a parenthesized FETCH attribute list.
pub fn write_fetch_attributes(buf: &mut Vec<u8>, attributes: &[FetchAttribute]) {
    buf.push(b'(');
    for (i, attr) in attributes.iter().enumerate() {
        if i > 0 {
            buf.push(b' ');
        }
        match attr {
            FetchAttribute::Uid => buf.extend_from_slice(b"UID"),
            FetchAttribute::Flags => buf.extend_from_slice(b"FLAGS"),
            FetchAttribute::InternalDate => buf.extend_from_slice(b"INTERNALDATE"),
            FetchAttribute::Rfc822Size => buf.extend_from_slice(b"RFC822.SIZE"),
            FetchAttribute::BodyPeek(section) => {
                buf.extend_from_slice(b"BODY.PEEK[");
                if let Some(section) = section {
                    buf.extend_from_slice(section.as_bytes());
                }
                buf.push(b']');
            }
        }
    }
    buf.push(b')');
}

/// Writes a STORE data item and its flag list.
pub fn write_store_action(buf: &mut Vec<u8>, action: &StoreAction, silent: bool) {
    let prefix: &[u8] = match action.mode {
        StoreMode::Replace => b"FLAGS",
        StoreMode::Add => b"+FLAGS",
        StoreMode::Remove => b"-FLAGS",
    };
    buf.extend_from_slice(prefix);
    if silent {
        buf.extend_from_slice(b".SILENT");
    }
    buf.extend_from_slice(b" (");
    for (i, flag) in action.flags.iter().enumerate() {
        if i > 0 {
            buf.push(b' ');
        }
        buf.extend_from_slice(flag.as_str().as_bytes());
    }
    buf.push(b')');
}

/// Writes a search key.
///
/// A top-level conjunction is written as a space-separated key list; nested
/// conjunctions are parenthesized. Non-ASCII strings are always quoted.
pub fn write_search_key(buf: &mut Vec<u8>, key: &SearchKey) {
    write_key(buf, key, false);
}

fn write_key(buf: &mut Vec<u8>, key: &SearchKey, nested: bool) {
    let atom: &[u8] = match key {
        SearchKey::All => b"ALL",
        SearchKey::Answered => b"ANSWERED",
        SearchKey::Unanswered => b"UNANSWERED",
        SearchKey::Deleted => b"DELETED",
        SearchKey::Undeleted => b"UNDELETED",
        SearchKey::Flagged => b"FLAGGED",
        SearchKey::Unflagged => b"UNFLAGGED",
        SearchKey::Seen => b"SEEN",
        SearchKey::Unseen => b"UNSEEN",
        SearchKey::Recent => b"RECENT",
        SearchKey::Old => b"OLD",
        SearchKey::New => b"NEW",
        SearchKey::Bcc(s) => return write_text_key(buf, b"BCC", s),
        SearchKey::Cc(s) => return write_text_key(buf, b"CC", s),
        SearchKey::To(s) => return write_text_key(buf, b"TO", s),
        SearchKey::From(s) => return write_text_key(buf, b"FROM", s),
        SearchKey::Subject(s) => return write_text_key(buf, b"SUBJECT", s),
        SearchKey::Text(s) => return write_text_key(buf, b"TEXT", s),
        SearchKey::Body(s) => return write_text_key(buf, b"BODY", s),
        SearchKey::SentOn(date) => {
            buf.extend_from_slice(b"SENTON ");
            buf.extend_from_slice(format_search_date(*date).as_bytes());
            return;
        }
        SearchKey::SentBefore(date) => {
            buf.extend_from_slice(b"SENTBEFORE ");
            buf.extend_from_slice(format_search_date(*date).as_bytes());
            return;
        }
        SearchKey::SentSince(date) => {
            buf.extend_from_slice(b"SENTSINCE ");
            buf.extend_from_slice(format_search_date(*date).as_bytes());
            return;
        }
        SearchKey::Not(inner) => {
            buf.extend_from_slice(b"NOT ");
            write_key(buf, inner, true);
            return;
        }
        SearchKey::Or(a, b) => {
            buf.extend_from_slice(b"OR ");
            write_key(buf, a, true);
            buf.push(b' ');
            write_key(buf, b, true);
            return;
        }
        SearchKey::And(keys) => {
            match keys.as_slice() {
                [] => buf.extend_from_slice(b"ALL"),
                [single] => write_key(buf, single, nested),
                _ => {
                    if nested {
                        buf.push(b'(');
                    }
                    for (i, k) in keys.iter().enumerate() {
                        if i > 0 {
                            buf.push(b' ');
                        }
                        write_key(buf, k, true);
                    }
                    if nested {
                        buf.push(b')');
                    }
                }
            }
            return;
        }
    };
    buf.extend_from_slice(atom);
}

fn write_text_key(buf: &mut Vec<u8>, name: &[u8], value: &str) {
    buf.extend_from_slice(name);
    buf.push(b' ');
    write_astring(buf, value);
}
