//! POP3 commands (RFC 1939, RFC 2449, RFC 2595).

/// A POP3 command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// CAPA.
    Capa,
    /// STLS.
    Stls,
    /// USER.
    User(String),
    /// PASS.
    Pass(String),
    /// STAT.
    Stat,
    /// LIST, for one message or all.
    List(Option<u32>),
    /// UIDL, for one message or all.
    Uidl(Option<u32>),
    /// RETR.
    Retr(u32),
    /// TOP: headers plus `lines` body lines.
    Top {
        /// Message number.
        message: u32,
        /// Body lines to include.
        lines: u32,
    },
    /// DELE.
    Dele(u32),
    /// RSET.
    Rset,
    /// NOOP.
    Noop,
    /// QUIT.
    Quit,
}

impl Command {
    /// Serializes the command including CRLF.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut line = match self {
            Self::Capa => "CAPA".to_string(),
            Self::Stls => "STLS".to_string(),
            Self::User(user) => format!("USER {user}"),
            Self::Pass(password) => format!("PASS {password}"),
            Self::Stat => "STAT".to_string(),
            Self::List(None) => "LIST".to_string(),
            Self::List(Some(n)) => format!("LIST {n}"),
            Self::Uidl(None) => "UIDL".to_string(),
            Self::Uidl(Some(n)) => format!("UIDL {n}"),
            Self::Retr(n) => format!("RETR {n}"),
            Self::Top { message, lines } => format!("TOP {message} {lines}"),
            Self::Dele(n) => format!("DELE {n}"),
            Self::Rset => "RSET".to_string(),
            Self::Noop => "NOOP".to_string(),
            Self::Quit => "QUIT".to_string(),
        }
        .into_bytes();
        line.extend_from_slice(b"\r\n");
        line
    }

    /// Returns true if the positive reply is followed by a dot-terminated
    /// block.
    #[must_use]
    pub const fn is_multiline(&self) -> bool {
        matches!(
            self,
            Self::Capa | Self::List(None) | Self::Uidl(None) | Self::Retr(_) | Self::Top { .. }
        )
    }

    /// Command text for logs, without the password.
    #[must_use]
    pub fn redacted(&self) -> String {
        match self {
            Self::Pass(_) => "PASS ****".to_string(),
            other => String::from_utf8_lossy(&other.serialize())
                .trim_end()
                .to_string(),
        }
    }
}
