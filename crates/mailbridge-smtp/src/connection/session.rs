//! Long-lived SMTP session.

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{info, warn};

use super::client::{Authenticated, Client, Connected};
use super::config::{Config, Security};
use super::stream::{SmtpStream, connect};
use crate::error::{Error, Result};
use crate::types::Envelope;

enum State<S> {
    Anonymous(Client<S, Connected>),
    Authenticated(Client<S, Authenticated>),
}

/// A connection kept open between sends, anonymous or authenticated.
///
/// A failed transaction drops the connection; [`Session::is_connected`]
/// then returns false.
pub struct Session<S = SmtpStream> {
    state: Option<State<S>>,
}

impl<S> std::fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.state {
            None => "closed",
            Some(State::Anonymous(_)) => "anonymous",
            Some(State::Authenticated(_)) => "authenticated",
        };
        f.debug_struct("Session").field("state", &state).finish()
    }
}

impl Session<SmtpStream> {
    /// Connects, greets, negotiates TLS per `config.security` and, when
    /// `credentials` are given, authenticates.
    ///
    /// # Errors
    ///
    /// Returns the first failing step's error.
    pub async fn connect(config: &Config, credentials: Option<(&str, &str)>) -> Result<Self> {
        let stream = connect(config).await?;
        let mut client = Client::<_, Connected>::from_stream(stream, config.timeout)
            .await?
            .ehlo(&config.client_name)
            .await?;
        if config.security == Security::StartTlsIfAvailable {
            if client.server_info().supports_starttls() {
                client = client.starttls(&config.host, config.accept_invalid_certs).await?;
            } else {
                warn!(host = %config.host, "server does not offer STARTTLS, continuing in plaintext");
            }
        }
        info!(host = %config.host, port = config.port, tls = client.is_tls(), "SMTP connected");
        Self::login(client, credentials).await
    }
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps a greeted client, authenticating when `credentials` are given.
    ///
    /// # Errors
    ///
    /// Returns an error if authentication fails.
    pub async fn login(client: Client<S, Connected>, credentials: Option<(&str, &str)>) -> Result<Self> {
        let state = match credentials {
            Some((user, password)) => State::Authenticated(client.login(user, password).await?),
            None => State::Anonymous(client),
        };
        Ok(Self { state: Some(state) })
    }

    /// Returns true while the connection is usable.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.state.is_some()
    }

    /// Sends one message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the session is closed, or the error of
    /// the failing transaction step.
    pub async fn send(&mut self, envelope: &Envelope, message: &[u8]) -> Result<()> {
        let state = self
            .state
            .take()
            .ok_or_else(|| Error::Protocol("SMTP session is closed".into()))?;
        let state = match state {
            State::Anonymous(client) => State::Anonymous(client.send(envelope, message).await?),
            State::Authenticated(client) => State::Authenticated(client.send(envelope, message).await?),
        };
        self.state = Some(state);
        Ok(())
    }

    /// Sends QUIT. A closed session is left as is.
    ///
    /// # Errors
    ///
    /// Returns an error if QUIT fails; the connection is dropped either way.
    pub async fn quit(&mut self) -> Result<()> {
        match self.state.take() {
            Some(State::Anonymous(client)) => client.quit().await,
            Some(State::Authenticated(client)) => client.quit().await,
            None => Ok(()),
        }
    }
}
