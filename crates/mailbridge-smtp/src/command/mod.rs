//! SMTP command serialization.

use crate::types::{Address, AuthMechanism};

/// SMTP command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// HELO, for servers that reject EHLO.
    Helo {
        /// Client hostname
        hostname: String,
    },
    /// EHLO
    Ehlo {
        /// Client hostname
        hostname: String,
    },
    /// STARTTLS
    StartTls,
    /// AUTH
    Auth {
        /// Mechanism
        mechanism: AuthMechanism,
        /// Initial response, already base64-encoded
        initial_response: Option<String>,
    },
    /// A base64 line answering a 334 challenge.
    AuthResponse(String),
    /// MAIL FROM
    MailFrom {
        /// Reverse path
        from: Address,
        /// SIZE parameter, sent when the server advertises SIZE
        size: Option<usize>,
    },
    /// RCPT TO
    RcptTo {
        /// Forward path
        to: Address,
    },
    /// DATA
    Data,
    /// RSET
    Rset,
    /// NOOP
    Noop,
    /// QUIT
    Quit,
}

impl Command {
    /// Serializes the command including CRLF.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut line = match self {
            Self::Helo { hostname } => format!("HELO {hostname}"),
            Self::Ehlo { hostname } => format!("EHLO {hostname}"),
            Self::StartTls => "STARTTLS".to_string(),
            Self::Auth {
                mechanism,
                initial_response: Some(resp),
            } => format!("AUTH {} {resp}", mechanism.as_str()),
            Self::Auth {
                mechanism,
                initial_response: None,
            } => format!("AUTH {}", mechanism.as_str()),
            Self::AuthResponse(resp) => resp.clone(),
            Self::MailFrom { from, size: None } => format!("MAIL FROM:<{from}>"),
            Self::MailFrom {
                from,
                size: Some(size),
            } => format!("MAIL FROM:<{from}> SIZE={size}"),
            Self::RcptTo { to } => format!("RCPT TO:<{to}>"),
            Self::Data => "DATA".to_string(),
            Self::Rset => "RSET".to_string(),
            Self::Noop => "NOOP".to_string(),
            Self::Quit => "QUIT".to_string(),
        }
        .into_bytes();
        line.extend_from_slice(b"\r\n");
        line
    }

    /// Command text for logs, without credentials.
    #[must_use]
    pub fn redacted(&self) -> String {
        match self {
            Self::Auth { mechanism, .. } => format!("AUTH {} ****", mechanism.as_str()),
            Self::AuthResponse(_) => "****".to_string(),
            other => String::from_utf8_lossy(&other.serialize())
                .trim_end()
                .to_string(),
        }
    }
}

/// Encodes a message for the DATA phase: line endings normalized to CRLF,
/// lines starting with `.` stuffed, and the terminating `.` line appended.
#[must_use]
pub fn encode_data(message: &[u8]) -> Vec<u8> {
    let body = message
        .strip_suffix(b"\r\n")
        .or_else(|| message.strip_suffix(b"\n"))
        .unwrap_or(message);
    let mut out = Vec::with_capacity(body.len() + body.len() / 64 + 5);
    if !body.is_empty() {
        for line in body.split(|&b| b == b'\n') {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            if line.first() == Some(&b'.') {
                out.push(b'.');
            }
            out.extend_from_slice(line);
            out.extend_from_slice(b"\r\n");
        }
    }
    out.extend_from_slice(b".\r\n");
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn addr(s: &str) -> Address {
        Address::new(s).unwrap()
    }

    #[test]
    fn test_serialize() {
        assert_eq!(
            Command::Ehlo {
                hostname: "client.example.com".into()
            }
            .serialize(),
            b"EHLO client.example.com\r\n"
        );
        assert_eq!(
            Command::Auth {
                mechanism: AuthMechanism::Plain,
                initial_response: Some("AHVzZXIAcGFzcw==".into()),
            }
            .serialize(),
            b"AUTH PLAIN AHVzZXIAcGFzcw==\r\n"
        );
        assert_eq!(
            Command::MailFrom {
                from: addr("sender@example.com"),
                size: Some(12345)
            }
            .serialize(),
            b"MAIL FROM:<sender@example.com> SIZE=12345\r\n"
        );
        assert_eq!(
            Command::RcptTo {
                to: addr("rcpt@example.com")
            }
            .serialize(),
            b"RCPT TO:<rcpt@example.com>\r\n"
        );
        assert_eq!(Command::Quit.serialize(), b"QUIT\r\n");
    }

    #[test]
    fn test_redacted() {
        let auth = Command::Auth {
            mechanism: AuthMechanism::Plain,
            initial_response: Some("c2VjcmV0".into()),
        };
        assert_eq!(auth.redacted(), "AUTH PLAIN ****");
        assert_eq!(Command::AuthResponse("c2VjcmV0".into()).redacted(), "****");
        assert_eq!(Command::Data.redacted(), "DATA");
    }

    #[test]
    fn test_encode_data() {
        assert_eq!(
            encode_data(b"Subject: x\n\n.hidden\r\nend\n"),
            b"Subject: x\r\n\r\n..hidden\r\nend\r\n.\r\n"
        );
        assert_eq!(encode_data(b""), b".\r\n");
        assert_eq!(encode_data(b"."), b"..\r\n.\r\n");
    }

    proptest! {
        #[test]
        fn encoded_data_has_single_terminator(body in "[a-z.\\r\\n]{0,200}") {
            let encoded = encode_data(body.as_bytes());
            prop_assert!(encoded.ends_with(b".\r\n"));
            let inner = &encoded[..encoded.len() - 3];
            for line in inner.split(|&b| b == b'\n').filter(|l| !l.is_empty()) {
                prop_assert!(line != b".\r");
                prop_assert!(line.ends_with(b"\r"));
            }
        }
    }
}
