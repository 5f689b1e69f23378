//! The seam between receivers/senders and the protocol clients.
//!
//! Receivers and the sender only talk to the narrow session traits here.
//! A [`Connector`] opens those sessions from a [`Profile`];
//! [`NetworkConnector`] does it over the network.

mod imap;
mod pop3;
mod smtp;

pub use imap::ImapSession;
pub use pop3::{Pop3Connection, Pop3Session};
pub use smtp::SmtpTransport;

use async_trait::async_trait;
use tracing::info;

use crate::error::Result;
use crate::profile::Profile;

/// Opens logged-in protocol sessions.
#[async_trait]
pub trait Connector: Clone + Send + Sync + 'static {
    /// IMAP session type.
    type Imap: ImapSession + 'static;
    /// POP3 session type.
    type Pop3: Pop3Session + 'static;
    /// SMTP transport type.
    type Smtp: SmtpTransport + 'static;

    /// Connects and logs in to the profile's IMAP server.
    async fn imap(&self, profile: &Profile) -> Result<Self::Imap>;

    /// Connects and logs in to the profile's POP3 server.
    async fn pop3(&self, profile: &Profile) -> Result<Self::Pop3>;

    /// Connects to the profile's SMTP server, authenticating when
    /// `smtp_user` is set.
    async fn smtp(&self, profile: &Profile) -> Result<Self::Smtp>;
}

/// Connects over TCP with the protocol crates.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetworkConnector;

#[async_trait]
impl Connector for NetworkConnector {
    type Imap = mailbridge_imap::Session;
    type Pop3 = Pop3Connection;
    type Smtp = mailbridge_smtp::Session;

    async fn imap(&self, profile: &Profile) -> Result<Self::Imap> {
        let config = imap_config(profile);
        info!(host = %config.host, port = config.port, user = %profile.imap_user, "IMAP logon");
        let session =
            mailbridge_imap::Session::connect(&config, &profile.imap_user, &profile.imap_password)
                .await?;
        Ok(session)
    }

    async fn pop3(&self, profile: &Profile) -> Result<Self::Pop3> {
        let config = pop3_config(profile);
        info!(host = %config.host, port = config.port, user = %profile.user, "POP3 logon");
        let client = mailbridge_pop3::login(&config, &profile.user, &profile.password).await?;
        Ok(Pop3Connection::new(client))
    }

    async fn smtp(&self, profile: &Profile) -> Result<Self::Smtp> {
        let config = smtp_config(profile);
        info!(host = %config.host, port = config.port, user = %profile.smtp_user, "SMTP logon");
        let credentials = (!profile.smtp_user.is_empty())
            .then_some((profile.smtp_user.as_str(), profile.smtp_password.as_str()));
        let session = mailbridge_smtp::Session::connect(&config, credentials).await?;
        Ok(session)
    }
}

/// IMAP connection settings. Implicit TLS for SSL or port 993, otherwise
/// STARTTLS: required with `imap_secure_authentication_only`, else when
/// offered.
#[must_use]
pub fn imap_config(profile: &Profile) -> mailbridge_imap::Config {
    use mailbridge_imap::Security;
    let port = profile.imap_port();
    let security = if profile.imap_use_ssl || port == 993 {
        Security::Implicit
    } else if profile.imap_secure_authentication_only {
        Security::StartTls
    } else {
        Security::StartTlsIfAvailable
    };
    mailbridge_imap::Config::new(&profile.imap_server_address, security)
        .port(port)
        .timeout(profile.timeout())
        .accept_invalid_certs(profile.accept_invalid_certs)
}

/// POP3 connection settings. Implicit TLS for SSL or port 995, otherwise
/// STLS: required with `pop3_secure_authentication_only`, else when
/// offered.
#[must_use]
pub fn pop3_config(profile: &Profile) -> mailbridge_pop3::Config {
    use mailbridge_pop3::Security;
    let port = profile.pop3_port();
    let security = if profile.pop3_use_ssl || port == 995 {
        Security::Implicit
    } else if profile.pop3_secure_authentication_only {
        Security::Stls
    } else {
        Security::StlsIfAvailable
    };
    mailbridge_pop3::Config::new(&profile.pop3_server_address, security)
        .port(port)
        .timeout(profile.timeout())
        .accept_invalid_certs(profile.accept_invalid_certs)
}

/// SMTP connection settings. Implicit TLS for SSL or port 465, otherwise
/// STARTTLS when offered.
#[must_use]
pub fn smtp_config(profile: &Profile) -> mailbridge_smtp::Config {
    use mailbridge_smtp::Security;
    let port = profile.smtp_port();
    let security = if profile.smtp_use_ssl || port == 465 {
        Security::Implicit
    } else {
        Security::StartTlsIfAvailable
    };
    mailbridge_smtp::Config::new(&profile.smtp_server_address, security)
        .port(port)
        .timeout(profile.timeout())
        .accept_invalid_certs(profile.accept_invalid_certs)
}
