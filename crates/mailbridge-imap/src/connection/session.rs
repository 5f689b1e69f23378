//! Session wrapper over the type-state client.
//!
//! `Session` keeps whichever client state is current behind `&mut self`
//! methods, so callers can hold it in a struct field.

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{info, warn};

use super::client::{Authenticated, Client, FetchedMessage, NotAuthenticated, Selected};
use super::config::{Config, Security};
use super::stream::{self, ImapStream};
use crate::command::{FetchAttribute, SearchKey, StoreAction};
use crate::types::{Flag, ListResponse, Mailbox, MailboxStatus, SeqNum, Uid, UidSet};
use crate::{Error, Result};

enum State<S> {
    Disconnected,
    Authenticated(Client<S, Authenticated>),
    Selected(Client<S, Selected>),
}

/// A logged-in IMAP connection.
pub struct Session<S = ImapStream> {
    state: State<S>,
}

impl<S> std::fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &self.state {
            State::Disconnected => "disconnected",
            State::Authenticated(_) => "authenticated",
            State::Selected(_) => "selected",
        };
        f.debug_struct("Session").field("state", &state).finish()
    }
}

impl Session<ImapStream> {
    /// Connects, upgrades with STARTTLS when configured and offered, and
    /// logs in. [`Security::StartTls`] refuses to log in without the upgrade.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection, TLS negotiation or login fails.
    pub async fn connect(config: &Config, username: &str, password: &str) -> Result<Self> {
        info!(host = %config.host, port = config.port, security = ?config.security, "connecting to IMAP server");
        let tcp = stream::connect(config).await?;
        let mut client = Client::<_, NotAuthenticated>::from_stream(tcp, config.timeout).await?;

        match config.security {
            Security::StartTls | Security::StartTlsIfAvailable
                if client.has_capability("STARTTLS") =>
            {
                client = client
                    .starttls(&config.host, config.accept_invalid_certs)
                    .await?;
            }
            Security::StartTls => {
                return Err(Error::Protocol(
                    "server does not offer STARTTLS, refusing plaintext login".into(),
                ));
            }
            Security::StartTlsIfAvailable => {
                warn!(host = %config.host, "server does not offer STARTTLS, staying in plaintext");
            }
            Security::None | Security::Implicit => {}
        }

        Self::login(client, username, password).await
    }
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Logs in on an already greeted connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the credentials.
    pub async fn login(
        client: Client<S, NotAuthenticated>,
        username: &str,
        password: &str,
    ) -> Result<Self> {
        let client = client.login(username, password).await?;
        Ok(Self {
            state: State::Authenticated(client),
        })
    }

    /// Returns true until [`Session::logout`] is called or a transition
    /// failure left the connection unusable.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        !matches!(self.state, State::Disconnected)
    }

    /// The selected mailbox, if any.
    #[must_use]
    pub const fn selected(&self) -> Option<&Mailbox> {
        match &self.state {
            State::Selected(client) => Some(client.mailbox()),
            _ => None,
        }
    }

    /// Returns true if the server advertised `name`.
    #[must_use]
    pub fn has_capability(&self, name: &str) -> bool {
        match &self.state {
            State::Disconnected => false,
            State::Authenticated(client) => client.has_capability(name),
            State::Selected(client) => client.has_capability(name),
        }
    }

    /// Selects `mailbox`, leaving any current one without expunging it.
    ///
    /// # Errors
    ///
    /// Returns an error if the server refuses the mailbox. The session then
    /// has no mailbox selected.
    pub async fn select(&mut self, mailbox: &Mailbox) -> Result<MailboxStatus> {
        let outcome = match std::mem::replace(&mut self.state, State::Disconnected) {
            State::Disconnected => return Err(not_connected()),
            State::Authenticated(client) => client.select(mailbox).await,
            State::Selected(client) => client.select(mailbox).await,
        };
        match outcome {
            Ok(client) => {
                let status = client.status().clone();
                self.state = State::Selected(client);
                Ok(status)
            }
            Err((e, client)) => {
                self.state = State::Authenticated(client);
                Err(e)
            }
        }
    }

    /// Lists mailboxes.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn list(&mut self, reference: &str, pattern: &str) -> Result<Vec<ListResponse>> {
        match &mut self.state {
            State::Disconnected => Err(not_connected()),
            State::Authenticated(client) => client.list(reference, pattern).await,
            State::Selected(client) => client.list(reference, pattern).await,
        }
    }

    /// Lists subscribed mailboxes.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn lsub(&mut self, reference: &str, pattern: &str) -> Result<Vec<ListResponse>> {
        match &mut self.state {
            State::Disconnected => Err(not_connected()),
            State::Authenticated(client) => client.lsub(reference, pattern).await,
            State::Selected(client) => client.lsub(reference, pattern).await,
        }
    }

    /// Creates a mailbox.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn create(&mut self, mailbox: &Mailbox) -> Result<()> {
        match &mut self.state {
            State::Disconnected => Err(not_connected()),
            State::Authenticated(client) => client.create(mailbox).await,
            State::Selected(client) => client.create(mailbox).await,
        }
    }

    /// Deletes a mailbox.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn delete(&mut self, mailbox: &Mailbox) -> Result<()> {
        match &mut self.state {
            State::Disconnected => Err(not_connected()),
            State::Authenticated(client) => client.delete(mailbox).await,
            State::Selected(client) => client.delete(mailbox).await,
        }
    }

    /// Renames a mailbox.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn rename(&mut self, from: &Mailbox, to: &Mailbox) -> Result<()> {
        match &mut self.state {
            State::Disconnected => Err(not_connected()),
            State::Authenticated(client) => client.rename(from, to).await,
            State::Selected(client) => client.rename(from, to).await,
        }
    }

    /// Subscribes to a mailbox.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn subscribe(&mut self, mailbox: &Mailbox) -> Result<()> {
        match &mut self.state {
            State::Disconnected => Err(not_connected()),
            State::Authenticated(client) => client.subscribe(mailbox).await,
            State::Selected(client) => client.subscribe(mailbox).await,
        }
    }

    /// Unsubscribes from a mailbox.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn unsubscribe(&mut self, mailbox: &Mailbox) -> Result<()> {
        match &mut self.state {
            State::Disconnected => Err(not_connected()),
            State::Authenticated(client) => client.unsubscribe(mailbox).await,
            State::Selected(client) => client.unsubscribe(mailbox).await,
        }
    }

    /// Appends a message to `mailbox`.
    ///
    /// # Errors
    ///
    /// Returns an error if the server refuses the message.
    pub async fn append(&mut self, mailbox: &Mailbox, flags: &[Flag], message: &[u8]) -> Result<()> {
        match &mut self.state {
            State::Disconnected => Err(not_connected()),
            State::Authenticated(client) => client.append(mailbox, flags, message).await,
            State::Selected(client) => client.append(mailbox, flags, message).await,
        }
    }

    /// Searches the selected mailbox.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] without a selected mailbox.
    pub async fn uid_search(&mut self, criteria: &SearchKey) -> Result<Vec<Uid>> {
        self.selected_client()?.uid_search(criteria).await
    }

    /// Fetches from the selected mailbox.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] without a selected mailbox.
    pub async fn uid_fetch(
        &mut self,
        uids: &UidSet,
        attributes: Vec<FetchAttribute>,
    ) -> Result<Vec<FetchedMessage>> {
        self.selected_client()?.uid_fetch(uids, attributes).await
    }

    /// Changes flags in the selected mailbox.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] without a selected mailbox.
    pub async fn uid_store(&mut self, uids: &UidSet, action: StoreAction) -> Result<()> {
        self.selected_client()?.uid_store(uids, action).await
    }

    /// Expunges the selected mailbox.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] without a selected mailbox.
    pub async fn expunge(&mut self) -> Result<Vec<SeqNum>> {
        self.selected_client()?.expunge().await
    }

    /// Polls for changes and returns the message count of the selected
    /// mailbox.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] without a selected mailbox.
    pub async fn message_count(&mut self) -> Result<u32> {
        self.selected_client()?.refresh().await
    }

    /// Logs out. The session is disconnected afterwards even on error.
    ///
    /// # Errors
    ///
    /// Returns an error if LOGOUT fails on the wire.
    pub async fn logout(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.state, State::Disconnected) {
            State::Disconnected => Ok(()),
            State::Authenticated(client) => client.logout().await,
            State::Selected(client) => client.logout().await,
        }
    }

    fn selected_client(&mut self) -> Result<&mut Client<S, Selected>> {
        match &mut self.state {
            State::Selected(client) => Ok(client),
            State::Authenticated(_) => Err(Error::InvalidState("no mailbox selected".to_string())),
            State::Disconnected => Err(not_connected()),
        }
    }
}

fn not_connected() -> Error {
    Error::InvalidState("not connected".to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use tokio_test::io::{Builder, Mock};

    use super::*;

    fn greeting() -> Builder {
        let mut builder = Builder::new();
        builder
            .read(b"* OK [CAPABILITY IMAP4rev1] ready\r\n")
            .write(b"A0001 LOGIN user secret\r\n")
            .read(b"A0001 OK [CAPABILITY IMAP4rev1] ok\r\n");
        builder
    }

    async fn session(builder: &mut Builder) -> Session<Mock> {
        let client = Client::<_, NotAuthenticated>::from_stream(builder.build(), Duration::from_secs(5))
            .await
            .unwrap();
        Session::login(client, "user", "secret").await.unwrap()
    }

    #[tokio::test]
    async fn test_message_ops_need_selection() {
        let mut builder = greeting();
        let mut session = session(&mut builder).await;
        assert!(session.selected().is_none());
        assert!(matches!(
            session.uid_search(&SearchKey::All).await,
            Err(Error::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_select_keeps_session_usable() {
        let mut builder = greeting();
        builder
            .write(b"A0002 SELECT INBOX\r\n")
            .read(b"* 2 EXISTS\r\n")
            .read(b"A0002 OK [READ-WRITE] done\r\n")
            .write(b"A0003 SELECT Missing\r\n")
            .read(b"A0003 NO no such mailbox\r\n")
            .write(b"A0004 LIST \"\" *\r\n")
            .read(b"* LIST () \"/\" INBOX\r\n")
            .read(b"A0004 OK done\r\n");
        let mut session = session(&mut builder).await;

        let status = session.select(&Mailbox::inbox()).await.unwrap();
        assert_eq!(status.exists, 2);
        assert!(session.select(&Mailbox::new("Missing")).await.is_err());
        assert!(session.is_connected());
        assert!(session.selected().is_none());
        assert_eq!(session.list("", "*").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_logout_disconnects() {
        let mut builder = greeting();
        builder
            .write(b"A0002 LOGOUT\r\n")
            .read(b"* BYE logging out\r\n")
            .read(b"A0002 OK LOGOUT completed\r\n");
        let mut session = session(&mut builder).await;
        session.logout().await.unwrap();
        assert!(!session.is_connected());
        assert!(matches!(
            session.create(&Mailbox::new("x")).await,
            Err(Error::InvalidState(_))
        ));
    }
}
