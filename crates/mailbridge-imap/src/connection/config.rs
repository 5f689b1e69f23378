//! Connection configuration.

use std::time::Duration;

/// Connection security mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Security {
    /// Plaintext only.
    None,
    /// Plaintext, upgraded with STARTTLS when the server offers it.
    #[default]
    StartTlsIfAvailable,
    /// Plaintext, upgraded with STARTTLS; fails when the server does not
    /// offer it.
    StartTls,
    /// TLS from the first byte (port 993).
    Implicit,
}

impl Security {
    /// Default port for this mode.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::None | Self::StartTlsIfAvailable | Self::StartTls => 143,
            Self::Implicit => 993,
        }
    }
}

/// IMAP connection parameters.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host name.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Security mode.
    pub security: Security,
    /// Applied to the connect and to every command.
    pub timeout: Duration,
    /// Skip certificate validation. Accepts self-signed and mismatched
    /// certificates; enables man-in-the-middle attacks.
    pub accept_invalid_certs: bool,
}

impl Config {
    /// Creates a configuration with the default port for `security`.
    #[must_use]
    pub fn new(host: impl Into<String>, security: Security) -> Self {
        Self {
            host: host.into(),
            port: security.default_port(),
            security,
            timeout: Duration::from_secs(30),
            accept_invalid_certs: false,
        }
    }

    /// Sets the port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enables or disables certificate validation bypass.
    #[must_use]
    pub const fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ports() {
        assert_eq!(Config::new("h", Security::Implicit).port, 993);
        assert_eq!(Config::new("h", Security::StartTlsIfAvailable).port, 143);
        assert_eq!(Config::new("h", Security::StartTls).port, 143);
        assert_eq!(Config::new("h", Security::None).port(1143).port, 1143);
    }

    #[test]
    fn test_validation_on_by_default() {
        assert!(!Config::new("h", Security::Implicit).accept_invalid_certs);
    }
}
