//! Connection configuration.

use std::time::Duration;

/// Connection security mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Security {
    /// Plaintext only.
    None,
    /// Plaintext, upgraded with STLS when the server offers it.
    StlsIfAvailable,
    /// Plaintext, upgraded with STLS; fails when the server does not
    /// offer it.
    Stls,
    /// TLS from the first byte.
    #[default]
    Implicit,
}

impl Security {
    /// Default port for this mode: 995 for implicit TLS, 110 otherwise.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::None | Self::StlsIfAvailable | Self::Stls => 110,
            Self::Implicit => 995,
        }
    }
}

/// POP3 connection parameters.
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
