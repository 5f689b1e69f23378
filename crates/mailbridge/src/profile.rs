//! Connection settings for all three protocols.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default per-operation timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Server addresses, ports, credentials and TLS flags.
///
/// A port of 0 selects the protocol default (see [`Profile::smtp_port`] and
/// friends). Missing fields in JSON take their defaults.
///
/// `accept_invalid_certs` defaults to `true`: server certificates are not
/// validated unless the caller turns it off.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    /// Authenticate to POP3 before connecting to SMTP.
    pub pop3_before_smtp: bool,
    /// Timeout applied to every network operation, in seconds.
    pub timeout: u64,
    /// Skip certificate validation for every TLS connection.
    pub accept_invalid_certs: bool,

    /// IMAP host name.
    pub imap_server_address: String,
    /// IMAP port, 0 for the default.
    pub imap_port: u16,
    /// Use implicit TLS for IMAP.
    pub imap_use_ssl: bool,
    /// IMAP login name.
    pub imap_user: String,
    /// IMAP password.
    pub imap_password: String,
    /// Refuse plaintext authentication for IMAP.
    pub imap_secure_authentication_only: bool,

    /// POP3 host name.
    pub pop3_server_address: String,
    /// POP3 port, 0 for the default.
    pub pop3_port: u16,
    /// Use implicit TLS for POP3.
    pub pop3_use_ssl: bool,
    /// POP3 login name.
    pub user: String,
    /// POP3 password.
    pub password: String,
    /// Refuse plaintext authentication for POP3.
    pub pop3_secure_authentication_only: bool,

    /// SMTP host name.
    pub smtp_server_address: String,
    /// SMTP port, 0 for the default.
    pub smtp_port: u16,
    /// Use implicit TLS for SMTP.
    pub smtp_use_ssl: bool,
    /// SMTP login name; empty skips authentication.
    pub smtp_user: String,
    /// SMTP password.
    pub smtp_password: String,
    /// Require a secured SMTP connection.
    pub smtp_secure_authentication_only: bool,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            pop3_before_smtp: false,
            timeout: DEFAULT_TIMEOUT_SECS,
            accept_invalid_certs: true,
            imap_server_address: String::new(),
            imap_port: 0,
            imap_use_ssl: false,
            imap_user: String::new(),
            imap_password: String::new(),
            imap_secure_authentication_only: false,
            pop3_server_address: String::new(),
            pop3_port: 0,
            pop3_use_ssl: false,
            user: String::new(),
            password: String::new(),
            pop3_secure_authentication_only: false,
            smtp_server_address: String::new(),
            smtp_port: 0,
            smtp_use_ssl: false,
            smtp_user: String::new(),
            smtp_password: String::new(),
            smtp_secure_authentication_only: false,
        }
    }
}

impl Profile {
    /// Creates a profile with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a profile from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid JSON for a profile.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads a profile from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// SMTP port: explicit, else 465 for SSL or secure-only, else 25.
    #[must_use]
    pub const fn smtp_port(&self) -> u16 {
        if self.smtp_port != 0 {
            self.smtp_port
        } else if self.smtp_use_ssl || self.smtp_secure_authentication_only {
            465
        } else {
            25
        }
    }

    /// POP3 port: explicit, else 995 for SSL, else 110.
    #[must_use]
    pub const fn pop3_port(&self) -> u16 {
        if self.pop3_port != 0 {
            self.pop3_port
        } else if self.pop3_use_ssl {
            995
        } else {
            110
        }
    }

    /// IMAP port: explicit, else 993 for SSL, else 143.
    #[must_use]
    pub const fn imap_port(&self) -> u16 {
        if self.imap_port != 0 {
            self.imap_port
        } else if self.imap_use_ssl {
            993
        } else {
            143
        }
    }

    /// The per-operation timeout. Zero falls back to the default.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        if self.timeout == 0 {
            Duration::from_secs(DEFAULT_TIMEOUT_SECS)
        } else {
            Duration::from_secs(self.timeout)
        }
    }
}

impl fmt::Debug for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const REDACTED: &str = "********";
        let secret = |s: &str| if s.is_empty() { "" } else { REDACTED };
        f.debug_struct("Profile")
            .field("pop3_before_smtp", &self.pop3_before_smtp)
            .field("timeout", &self.timeout)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .field("imap_server_address", &self.imap_server_address)
            .field("imap_port", &self.imap_port)
            .field("imap_use_ssl", &self.imap_use_ssl)
            .field("imap_user", &self.imap_user)
            .field("imap_password", &secret(&self.imap_password))
            .field("pop3_server_address", &self.pop3_server_address)
            .field("pop3_port", &self.pop3_port)
            .field("pop3_use_ssl", &self.pop3_use_ssl)
            .field("user", &self.user)
            .field("password", &secret(&self.password))
            .field("smtp_server_address", &self.smtp_server_address)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_use_ssl", &self.smtp_use_ssl)
            .field("smtp_user", &self.smtp_user)
            .field("smtp_password", &secret(&self.smtp_password))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_defaults() {
        let profile = Profile::default();
        assert_eq!(profile.timeout(), Duration::from_secs(30));
        assert!(profile.accept_invalid_certs);
        assert_eq!(profile.smtp_port(), 25);
        assert_eq!(profile.pop3_port(), 110);
        assert_eq!(profile.imap_port(), 143);
    }

    #[test]
    fn test_partial_json() {
        let profile = Profile::from_json_str(
            r#"{"imap_server_address": "imap.example.com", "imap_use_ssl": true, "timeout": 10}"#,
        )
        .unwrap();
        assert_eq!(profile.imap_server_address, "imap.example.com");
        assert_eq!(profile.imap_port(), 993);
        assert_eq!(profile.timeout(), Duration::from_secs(10));
        assert!(profile.accept_invalid_certs);
        assert!(profile.smtp_server_address.is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("mailbridge-profile-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"pop3_server_address": "pop.example.com", "pop3_port": 1110}"#)
            .unwrap();
        let profile = Profile::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(profile.pop3_port(), 1110);

        assert!(matches!(
            Profile::load(path),
            Err(crate::Error::Io(_))
        ));
        assert!(matches!(
            Profile::from_json_str("{not json"),
            Err(crate::Error::Serde(_))
        ));
    }

    #[test]
    fn test_debug_redacts_passwords() {
        let profile = Profile {
            imap_password: "hunter2".into(),
            smtp_password: "swordfish".into(),
            ..Profile::default()
        };
        let debug = format!("{profile:?}");
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("swordfish"));
        assert!(debug.contains("********"));
    }

    proptest! {
        #[test]
        fn explicit_ports_win(port in 1u16.., ssl: bool, secure: bool) {
            let profile = Profile {
                smtp_port: port,
                smtp_use_ssl: ssl,
                smtp_secure_authentication_only: secure,
                pop3_port: port,
                pop3_use_ssl: ssl,
                imap_port: port,
                imap_use_ssl: ssl,
                ..Profile::default()
            };
            prop_assert_eq!(profile.smtp_port(), port);
            prop_assert_eq!(profile.pop3_port(), port);
            prop_assert_eq!(profile.imap_port(), port);
        }

        #[test]
        fn default_ports_follow_flags(ssl: bool, secure: bool) {
            let profile = Profile {
                smtp_use_ssl: ssl,
                smtp_secure_authentication_only: secure,
                pop3_use_ssl: ssl,
                imap_use_ssl: ssl,
                ..Profile::default()
            };
            prop_assert_eq!(profile.smtp_port(), if ssl || secure { 465 } else { 25 });
            prop_assert_eq!(profile.pop3_port(), if ssl { 995 } else { 110 });
            prop_assert_eq!(profile.imap_port(), if ssl { 993 } else { 143 });
        }
    }
}
