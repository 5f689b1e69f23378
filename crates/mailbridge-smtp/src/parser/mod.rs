//! SMTP reply parser.

use crate::error::{Error, Result};
use crate::types::{Reply, ReplyCode};

/// Parses an SMTP reply from its lines (CRLF already removed).
///
/// - Single: `250 OK`
/// - Multi: `250-First`, `250-Second`, `250 Last`
///
/// # Errors
///
/// Returns [`Error::Protocol`] if a line is malformed or the codes disagree.
pub fn parse_reply(lines: &[String]) -> Result<Reply> {
    let first = lines
        .first()
        .ok_or_else(|| Error::Protocol("empty reply".into()))?;
    let code = reply_code(first)?;

    let mut message = Vec::with_capacity(lines.len());
    for line in lines {
        if reply_code(line)? != code {
            return Err(Error::Protocol(format!("reply code changed mid-reply: {line}")));
        }
        match line.get(3..4) {
            None => message.push(String::new()),
            Some(" " | "-") => message.push(line.get(4..).unwrap_or_default().to_string()),
            Some(_) => return Err(Error::Protocol(format!("malformed reply line: {line}"))),
        }
    }
    Ok(Reply::new(ReplyCode::new(code), message))
}

fn reply_code(line: &str) -> Result<u16> {
    line.get(..3)
        .filter(|digits| digits.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|digits| digits.parse().ok())
        .ok_or_else(|| Error::Protocol(format!("invalid reply code: {line}")))
}

/// Checks if a line ends a reply: `-` after the code continues it.
#[must_use]
pub fn is_last_reply_line(line: &str) -> bool {
    line.as_bytes().get(3) != Some(&b'-')
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_parse_single_line_reply() {
        let reply = parse_reply(&lines(&["250 OK"])).unwrap();
        assert_eq!(reply.code, ReplyCode::OK);
        assert_eq!(reply.message, vec!["OK"]);
    }

    #[test]
    fn test_parse_ehlo_reply() {
        let reply = parse_reply(&lines(&[
            "250-smtp.example.com greets you",
            "250-STARTTLS",
            "250 AUTH PLAIN LOGIN",
        ]))
        .unwrap();
        assert_eq!(reply.message.len(), 3);
        assert_eq!(reply.message[2], "AUTH PLAIN LOGIN");
    }

    #[test]
    fn test_bare_code() {
        let reply = parse_reply(&lines(&["354"])).unwrap();
        assert_eq!(reply.code, ReplyCode::START_DATA);
        assert_eq!(reply.message, vec![""]);
    }

    #[test]
    fn test_is_last_reply_line() {
        assert!(is_last_reply_line("250 OK"));
        assert!(is_last_reply_line("250"));
        assert!(!is_last_reply_line("250-Continuing"));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_reply(&[]).is_err());
        assert!(parse_reply(&lines(&["25"])).is_err());
        assert!(parse_reply(&lines(&["ABC OK"])).is_err());
        assert!(parse_reply(&lines(&["250xOK"])).is_err());
        assert!(parse_reply(&lines(&["250-a", "251 b"])).is_err());
    }
}
