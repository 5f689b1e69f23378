//! Reply parsing.

use crate::error::{Error, Result};
use crate::types::{ListEntry, Stat, UidlEntry};

/// Splits a status line into its text, failing on `-ERR`.
///
/// # Errors
///
/// [`Error::Server`] for `-ERR`, [`Error::Protocol`] for anything else that
/// is not `+OK`.
pub fn parse_status(line: &str) -> Result<&str> {
    let line = line.trim_end_matches(['\r', '\n']);
    if let Some(rest) = line.strip_prefix("+OK") {
        Ok(rest.trim_start())
    } else if let Some(rest) = line.strip_prefix("-ERR") {
        Err(Error::Server(rest.trim_start().to_string()))
    } else {
        Err(Error::Protocol(format!("unexpected status line: {line}")))
    }
}

/// Parses the text of a STAT reply: `count size`.
///
/// # Errors
///
/// [`Error::Protocol`] if the numbers are missing.
pub fn parse_stat(text: &str) -> Result<Stat> {
    let mut parts = text.split_ascii_whitespace();
    let count = parts.next().and_then(|s| s.parse().ok());
    let size = parts.next().and_then(|s| s.parse().ok());
    match (count, size) {
        (Some(count), Some(size)) => Ok(Stat { count, size }),
        _ => Err(Error::Protocol(format!("malformed STAT reply: {text}"))),
    }
}

/// Parses one scan listing line: `number size`.
///
/// # Errors
///
/// [`Error::Protocol`] if the line is malformed.
pub fn parse_list_line(line: &str) -> Result<ListEntry> {
    let mut parts = line.split_ascii_whitespace();
    let number = parts.next().and_then(|s| s.parse().ok());
    let size = parts.next().and_then(|s| s.parse().ok());
    match (number, size) {
        (Some(number), Some(size)) => Ok(ListEntry { number, size }),
        _ => Err(Error::Protocol(format!("malformed LIST line: {line}"))),
    }
}

/// Parses one unique-id listing line: `number uid`.
///
/// # Errors
///
/// [`Error::Protocol`] if the line is malformed.
pub fn parse_uidl_line(line: &str) -> Result<UidlEntry> {
    let mut parts = line.split_ascii_whitespace();
    let number = parts.next().and_then(|s| s.parse().ok());
    match (number, parts.next()) {
        (Some(number), Some(uid)) => Ok(UidlEntry {
            number,
            uid: uid.to_string(),
        }),
        _ => Err(Error::Protocol(format!("malformed UIDL line: {line}"))),
    }
}

/// Removes the byte-stuffing of one block line. Returns `None` for the
/// terminating `.` line.
#[must_use]
pub fn unstuff(line: &[u8]) -> Option<&[u8]> {
    let content = line
        .strip_suffix(b"\r\n")
        .or_else(|| line.strip_suffix(b"\n"))
        .unwrap_or(line);
    if content == b"." {
        None
    } else if content.starts_with(b"..") {
        Some(&line[1..])
    } else {
        Some(line)
    }
}
