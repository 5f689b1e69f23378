//! Connection configuration.

use std::time::Duration;

/// Connection security mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Security {
    /// Plaintext only.
    None,
    /// Plaintext, upgraded with STARTTLS when the server advertises it.
    #[default]
    StartTlsIfAvailable,
    /// TLS from the first byte (SMTPS).
    Implicit,
}

impl Security {
    /// Default port for this mode: 465 for implicit TLS, 25 otherwise.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::None | Self::StartTlsIfAvailable => 25,
            Self::Implicit => 465,
        }
    }
}

/// SMTP connection parameters.
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
    /// Skip certificate validation.
    pub accept_invalid_certs: bool,
    /// Name announced in EHLO.
    pub client_name: String,
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
            client_name: "localhost".to_string(),
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

    /// Sets the EHLO name.
    #[must_use]
    pub fn client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = name.into();
        self
    }
}
