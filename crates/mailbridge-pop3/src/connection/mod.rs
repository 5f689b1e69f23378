//! POP3 connection management with type-state pattern.

mod client;
mod config;
mod stream;

pub use client::{Authorization, Client, Transaction};
pub use config::{Config, Security};
pub use stream::{Pop3Stream, connect};

use tracing::{info, warn};

use crate::error::{Error, Result};

/// Connects, upgrades with STLS when configured and offered, and logs in.
/// [`Security::Stls`] refuses to log in without the upgrade.
///
/// # Errors
///
/// Returns an error if any step fails.
pub async fn login(
    config: &Config,
    username: &str,
    password: &str,
) -> Result<Client<Pop3Stream, Transaction>> {
    info!(host = %config.host, port = config.port, security = ?config.security, "connecting to POP3 server");
    let stream = connect(config).await?;
    let mut client = Client::<_, Authorization>::from_stream(stream, config.timeout).await?;

    if matches!(config.security, Security::Stls | Security::StlsIfAvailable) {
        client.capa().await?;
        if client.has_capability("STLS") {
            client = client.stls(&config.host, config.accept_invalid_certs).await?;
        } else if config.security == Security::Stls {
            return Err(Error::NotSupported(
                "server does not offer STLS, refusing plaintext login".into(),
            ));
        } else {
            warn!(host = %config.host, "server does not offer STLS, staying in plaintext");
        }
    }

    client.login(username, password).await
}
