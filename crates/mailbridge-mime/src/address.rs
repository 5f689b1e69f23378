//! RFC 5322 mailbox and address-list handling.

use crate::encoding::{HeaderEncoding, decode_rfc2047, encode_rfc2047};
use crate::error::{Error, Result};
use std::fmt;

/// A single mailbox: optional display name plus `local@domain`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mailbox {
    /// Decoded display name.
    pub name: Option<String>,
    /// Address specification.
    pub address: String,
}

impl Mailbox {
    /// Creates a mailbox.
    #[must_use]
    pub fn new(name: Option<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.filter(|n| !n.is_empty()),
            address: address.into(),
        }
    }

    /// Parses a single mailbox.
    ///
    /// # Errors
    ///
    /// Returns an error if the value holds no mailbox or more than one.
    pub fn parse(s: &str) -> Result<Self> {
        let mut list = Self::parse_list(s);
        if list.len() != 1 {
            return Err(Error::InvalidAddress(format!(
                "expected one mailbox, found {} in {s:?}",
                list.len()
            )));
        }
        list.pop()
            .ok_or_else(|| Error::InvalidAddress(s.to_string()))
    }

    /// Parses an address-list header value.
    ///
    /// Quoted commas, comments and groups are handled. Empty entries are
    /// skipped, so malformed input yields fewer mailboxes, never an error.
    #[must_use]
    pub fn parse_list(s: &str) -> Vec<Self> {
        split_top_level(s)
            .into_iter()
            .filter_map(|item| parse_item(&item))
            .collect()
    }

    /// Returns the part before the last `@`.
    #[must_use]
    pub fn local_part(&self) -> &str {
        self.address
            .rsplit_once('@')
            .map_or(self.address.as_str(), |(local, _)| local)
    }

    /// Returns the part after the last `@`, empty when absent.
    #[must_use]
    pub fn domain(&self) -> &str {
        self.address.rsplit_once('@').map_or("", |(_, domain)| domain)
    }

    /// Formats the mailbox for a header, encoding a non-ASCII display name.
    #[must_use]
    pub fn to_header_value(&self, mode: HeaderEncoding) -> String {
        match self.name.as_deref() {
            None => self.address.clone(),
            Some(name) if !name.is_ascii() && mode != HeaderEncoding::None => {
                format!("{} <{}>", encode_rfc2047(name, mode), self.address)
            }
            Some(name) => format!("{} <{}>", quote_phrase(name), self.address),
        }
    }
}

impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_header_value(HeaderEncoding::None))
    }
}

/// Formats a list of mailboxes as a comma-separated header value.
#[must_use]
pub fn format_list(mailboxes: &[Mailbox], mode: HeaderEncoding) -> String {
    mailboxes
        .iter()
        .map(|m| m.to_header_value(mode))
        .collect::<Vec<_>>()
        .join(", ")
}

fn quote_phrase(name: &str) -> String {
    let is_atom_text = name
        .chars()
        .all(|c| c.is_alphanumeric() || c == ' ' || "!#$%&'*+-/=?^_`{|}~".contains(c));
    if is_atom_text && !name.starts_with(' ') && !name.ends_with(' ') {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('\\', "\\\\").replace('"', "\\\""))
    }
}

/// Splits at commas and group delimiters outside quotes, comments and
/// angle brackets. Group display names are discarded.
fn split_top_level(s: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escaped = false;
    let mut comment_depth = 0usize;
    let mut in_angle = false;

    for ch in s.chars() {
        if escaped {
            current.push(ch);
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_quotes || comment_depth > 0 => {
                current.push(ch);
                escaped = true;
            }
            '"' if comment_depth == 0 => {
                in_quotes = !in_quotes;
                current.push(ch);
            }
            '(' if !in_quotes => {
                comment_depth += 1;
                current.push(ch);
            }
            ')' if !in_quotes && comment_depth > 0 => {
                comment_depth -= 1;
                current.push(ch);
            }
            '<' if !in_quotes && comment_depth == 0 => {
                in_angle = true;
                current.push(ch);
            }
            '>' if !in_quotes && comment_depth == 0 => {
                in_angle = false;
                current.push(ch);
            }
            ':' if !in_quotes && comment_depth == 0 && !in_angle => current.clear(),
            ',' | ';' if !in_quotes && comment_depth == 0 && !in_angle => {
                items.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    items.push(current);
    items
}

fn parse_item(item: &str) -> Option<Mailbox> {
    let item = item.trim();
    if item.is_empty() {
        return None;
    }

    if let (Some(open), Some(close)) = (item.rfind('<'), item.rfind('>')) {
        if open < close {
            let address = strip_comments(&item[open + 1..close]).trim().to_string();
            let phrase = strip_comments(&item[..open]);
            let name = decode_rfc2047(&unquote_phrase(phrase.trim()));
            return Some(Mailbox::new(Some(name.trim().to_string()), address));
        }
    }

    let comment = extract_comment(item);
    let address = strip_comments(item).trim().to_string();
    if address.is_empty() {
        return None;
    }
    Some(Mailbox::new(comment.map(|c| decode_rfc2047(&c)), address))
}

fn unquote_phrase(phrase: &str) -> String {
    let mut result = String::with_capacity(phrase.len());
    let mut chars = phrase.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '"' => {}
            '\\' => {
                if let Some(next) = chars.next() {
                    result.push(next);
                }
            }
            _ => result.push(ch),
        }
    }
    result
}

fn strip_comments(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut depth = 0usize;
    let mut in_quotes = false;
    for ch in s.chars() {
        match ch {
            '"' if depth == 0 => {
                in_quotes = !in_quotes;
                result.push(ch);
            }
            '(' if !in_quotes => depth += 1,
            ')' if !in_quotes && depth > 0 => depth -= 1,
            _ if depth == 0 => result.push(ch),
            _ => {}
        }
    }
    result
}

fn extract_comment(s: &str) -> Option<String> {
    let open = s.find('(')?;
    let close = s.rfind(')')?;
    (open < close)
        .then(|| s[open + 1..close].trim().to_string())
        .filter(|c| !c.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_address() {
        let mailbox = Mailbox::parse("alice@example.com").unwrap();
        assert_eq!(mailbox.address, "alice@example.com");
        assert_eq!(mailbox.name, None);
        assert_eq!(mailbox.local_part(), "alice");
        assert_eq!(mailbox.domain(), "example.com");
    }

    #[test]
    fn test_parse_named_address() {
        let mailbox = Mailbox::parse("\"Doe, John\" <john@example.com>").unwrap();
        assert_eq!(mailbox.name.as_deref(), Some("Doe, John"));
        assert_eq!(mailbox.address, "john@example.com");
    }

    #[test]
    fn test_parse_list_with_quoted_commas() {
        let list = Mailbox::parse_list("\"Doe, John\" <john@example.com>, Bob <bob@example.org>,, carol@example.net");
        assert_eq!(list.len(), 3);
        assert_eq!(list[1].name.as_deref(), Some("Bob"));
        assert_eq!(list[2].address, "carol@example.net");
    }

    #[test]
    fn test_parse_group() {
        let list = Mailbox::parse_list("Team: a@x.org, b@x.org;, c@y.org");
        let addresses: Vec<_> = list.iter().map(|m| m.address.as_str()).collect();
        assert_eq!(addresses, ["a@x.org", "b@x.org", "c@y.org"]);
    }

    #[test]
    fn test_parse_comment_name() {
        let mailbox = Mailbox::parse("jdoe@example.com (John Doe)").unwrap();
        assert_eq!(mailbox.address, "jdoe@example.com");
        assert_eq!(mailbox.name.as_deref(), Some("John Doe"));
    }

    #[test]
    fn test_parse_encoded_name() {
        let mailbox = Mailbox::parse("=?utf-8?B?SMOpbGxv?= <h@example.com>").unwrap();
        assert_eq!(mailbox.name.as_deref(), Some("Héllo"));
    }

    #[test]
    fn test_parse_rejects_multiple() {
        assert!(Mailbox::parse("a@x.org, b@x.org").is_err());
        assert!(Mailbox::parse("").is_err());
    }

    #[test]
    fn test_header_value_quotes_specials() {
        let mailbox = Mailbox::new(Some("Doe, John".to_string()), "john@example.com");
        assert_eq!(mailbox.to_string(), "\"Doe, John\" <john@example.com>");
        let plain = Mailbox::new(Some("John Doe".to_string()), "john@example.com");
        assert_eq!(plain.to_string(), "John Doe <john@example.com>");
    }

    #[test]
    fn test_header_value_encodes_non_ascii() {
        let mailbox = Mailbox::new(Some("Héllo".to_string()), "h@example.com");
        assert_eq!(
            mailbox.to_header_value(HeaderEncoding::Base64),
            "=?utf-8?B?SMOpbGxv?= <h@example.com>"
        );
    }

    #[test]
    fn test_format_list_parses_back() {
        let list = vec![
            Mailbox::new(Some("Doe, John".to_string()), "john@example.com"),
            Mailbox::new(None, "bob@example.org"),
        ];
        let value = format_list(&list, HeaderEncoding::Base64);
        assert_eq!(Mailbox::parse_list(&value), list);
    }
}
