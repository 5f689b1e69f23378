//! EHLO extensions.

/// An extension advertised in the EHLO reply.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Extension {
    /// STARTTLS
    StartTls,
    /// AUTH with the advertised mechanisms we know.
    Auth(Vec<AuthMechanism>),
    /// SIZE with the optional limit in bytes.
    Size(Option<usize>),
    /// 8BITMIME
    EightBitMime,
    /// Anything else, keyword uppercased.
    Other(String),
}

impl Extension {
    /// Parses one EHLO reply line.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let mut parts = line.split_whitespace();
        let keyword = parts.next().unwrap_or_default().to_ascii_uppercase();
        match keyword.as_str() {
            "STARTTLS" => Self::StartTls,
            "AUTH" => Self::Auth(parts.filter_map(AuthMechanism::parse).collect()),
            "SIZE" => Self::Size(parts.next().and_then(|s| s.parse().ok())),
            "8BITMIME" => Self::EightBitMime,
            _ => Self::Other(keyword),
        }
    }
}

/// SASL mechanisms this client can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthMechanism {
    /// PLAIN (RFC 4616)
    Plain,
    /// LOGIN
    Login,
}

impl AuthMechanism {
    /// Parses a mechanism name, case-insensitively.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("PLAIN") {
            Some(Self::Plain)
        } else if s.eq_ignore_ascii_case("LOGIN") {
            Some(Self::Login)
        } else {
            None
        }
    }

    /// Returns the mechanism name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "PLAIN",
            Self::Login => "LOGIN",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_extensions() {
        assert_eq!(Extension::parse("starttls"), Extension::StartTls);
        assert_eq!(
            Extension::parse("AUTH LOGIN CRAM-MD5 PLAIN"),
            Extension::Auth(vec![AuthMechanism::Login, AuthMechanism::Plain])
        );
        assert_eq!(Extension::parse("SIZE 35882577"), Extension::Size(Some(35_882_577)));
        assert_eq!(Extension::parse("SIZE"), Extension::Size(None));
        assert_eq!(Extension::parse("8BITMIME"), Extension::EightBitMime);
        assert_eq!(Extension::parse("pipelining"), Extension::Other("PIPELINING".into()));
    }
}
