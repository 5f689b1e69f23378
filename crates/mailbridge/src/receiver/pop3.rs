//! POP3 receiver: a single implicit mailbox and raw UIDL ids.

use async_trait::async_trait;
use mailbridge_pop3::UidlEntry;
use tracing::{debug, info, warn};

use super::MailReceiver;
use crate::error::{Error, Result};
use crate::filter::SearchFilter;
use crate::message::Message;
use crate::profile::Profile;
use crate::protocol::{KnownIdPolicy, Protocol};
use crate::selector::{Selector, Target, flatten};
use crate::transport::{Connector, NetworkConnector, Pop3Session};

/// Receives mail from a POP3 server.
///
/// Filters are accepted and ignored. Deletions take effect when the
/// session ends, so deleting reconnects right away.
pub struct Pop3Receiver<C: Connector = NetworkConnector> {
    connector: C,
    session: Option<C::Pop3>,
    profile: Option<Profile>,
}

impl Pop3Receiver {
    /// Creates a disconnected receiver using the network.
    #[must_use]
    pub fn new() -> Self {
        Self::with_connector(NetworkConnector)
    }
}

impl Default for Pop3Receiver {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Connector> Pop3Receiver<C> {
    /// Creates a disconnected receiver with a custom connector.
    #[must_use]
    pub const fn with_connector(connector: C) -> Self {
        Self {
            connector,
            session: None,
            profile: None,
        }
    }

    fn session(&mut self) -> Result<&mut C::Pop3> {
        self.session
            .as_mut()
            .ok_or_else(|| Error::ProtocolState("POP3 connection not established".into()))
    }

    /// Commits pending deletions with QUIT and logs in again.
    async fn reconnect(&mut self) -> Result<()> {
        let profile = self
            .profile
            .clone()
            .ok_or_else(|| Error::ProtocolState("POP3 connection not established".into()))?;
        if let Some(mut session) = self.session.take() {
            session.quit().await?;
        }
        info!("POP3 reconnect after delete");
        self.session = Some(self.connector.pop3(&profile).await?);
        Ok(())
    }

    async fn delete_numbers(&mut self, numbers: &[u32]) -> Result<()> {
        if numbers.is_empty() {
            return Ok(());
        }
        let session = self.session()?;
        for &number in numbers {
            session.delete(number).await?;
        }
        info!(count = numbers.len(), "POP3 messages marked deleted");
        self.reconnect().await
    }
}

/// Resolves selectors to message numbers before anything is changed on
/// the server. Each message appears once, in first-named order.
fn resolve(selectors: &[Selector], entries: &[UidlEntry]) -> Result<Vec<u32>> {
    let mut numbers = Vec::new();
    for target in flatten(selectors) {
        let number = match target {
            Target::Id(id) => entries
                .iter()
                .find(|entry| entry.uid == id)
                .map(|entry| entry.number)
                .ok_or_else(|| Error::InvalidArgumentValue(format!("unknown POP3 message id: {id}"))),
            Target::Sequence(n) => entries
                .iter()
                .find(|entry| entry.number == n)
                .map(|entry| entry.number)
                .ok_or_else(|| {
                    Error::InvalidArgumentValue(format!("no message at position {n}"))
                }),
        }?;
        if !numbers.contains(&number) {
            numbers.push(number);
        }
    }
    Ok(numbers)
}

fn uid_of(entries: &[UidlEntry], number: u32) -> String {
    entries
        .iter()
        .find(|entry| entry.number == number)
        .map_or_else(|| number.to_string(), |entry| entry.uid.clone())
}

const NO_MAILBOXES: &str = "POP3 has a single mailbox";

#[async_trait]
impl<C: Connector> MailReceiver for Pop3Receiver<C> {
    fn protocol(&self) -> Protocol {
        Protocol::Pop3
    }

    fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    async fn logon(&mut self, profile: &Profile) -> Result<()> {
        if self.session.is_some() {
            self.logoff().await?;
        }
        self.session = Some(self.connector.pop3(profile).await?);
        self.profile = Some(profile.clone());
        Ok(())
    }

    async fn logoff(&mut self) -> Result<()> {
        self.profile = None;
        if let Some(mut session) = self.session.take() {
            info!("POP3 logoff");
            session.quit().await?;
        }
        Ok(())
    }

    async fn get_headers(&mut self, filter: Option<&SearchFilter>) -> Result<Vec<Message>> {
        if filter.is_some() {
            debug!("POP3 ignores search filters");
        }
        let session = self.session()?;
        let entries = session.uids().await?;
        let mut messages = Vec::with_capacity(entries.len());
        for entry in entries {
            let header = session.header(entry.number).await?;
            messages.push(Message::from_header_data(&header, vec![entry.uid]));
        }
        Ok(messages)
    }

    async fn get_identifiers(
        &mut self,
        known_ids: Option<&[String]>,
        policy: KnownIdPolicy,
        _filter: Option<&SearchFilter>,
    ) -> Result<Vec<String>> {
        let ids = self
            .session()?
            .uids()
            .await?
            .into_iter()
            .map(|entry| entry.uid)
            .collect();
        Ok(policy.apply(ids, known_ids))
    }

    async fn get_message_count(&mut self) -> Result<u32> {
        self.session()?.count().await
    }

    async fn delete_messages(&mut self, selectors: &[Selector]) -> Result<()> {
        let entries = self.session()?.uids().await?;
        let numbers = resolve(selectors, &entries)?;
        self.delete_numbers(&numbers).await
    }

    async fn get(
        &mut self,
        delete: bool,
        selectors: Option<&[Selector]>,
        mark_as_read: bool,
    ) -> Result<Vec<Message>> {
        if !mark_as_read {
            return Err(Error::unsupported(
                Protocol::Pop3,
                "messages cannot be left unread after retrieval",
            ));
        }
        let session = self.session()?;
        let entries = session.uids().await?;
        let numbers = match selectors {
            Some(selectors) => resolve(selectors, &entries)?,
            None => entries.iter().map(|entry| entry.number).collect(),
        };

        let mut messages = Vec::with_capacity(numbers.len());
        for &number in &numbers {
            let raw = session.retrieve(number).await?;
            messages.push(Message::from_received(&raw, vec![uid_of(&entries, number)]));
        }

        if delete {
            self.delete_numbers(&numbers).await?;
        }
        Ok(messages)
    }

    async fn get_mailboxes(&mut self, _subscribed_only: bool) -> Result<Vec<String>> {
        Err(Error::unsupported(Protocol::Pop3, NO_MAILBOXES))
    }

    async fn subscribe_to_mailbox(&mut self, _name: &str) -> Result<()> {
        Err(Error::unsupported(Protocol::Pop3, NO_MAILBOXES))
    }

    async fn unsubscribe_from_mailbox(&mut self, _name: &str) -> Result<()> {
        Err(Error::unsupported(Protocol::Pop3, NO_MAILBOXES))
    }

    async fn rename_mailbox(&mut self, _name: &str, _new_name: &str) -> Result<()> {
        Err(Error::unsupported(Protocol::Pop3, NO_MAILBOXES))
    }

    async fn create_mailbox(&mut self, _name: &str) -> Result<()> {
        Err(Error::unsupported(Protocol::Pop3, NO_MAILBOXES))
    }

    async fn delete_mailbox(&mut self, _name: &str) -> Result<()> {
        Err(Error::unsupported(Protocol::Pop3, NO_MAILBOXES))
    }

    async fn undelete_messages(&mut self, _selectors: &[Selector]) -> Result<()> {
        Err(Error::unsupported(
            Protocol::Pop3,
            "deletions are committed when the session ends",
        ))
    }

    async fn clear_deleted_messages(&mut self) -> Result<()> {
        Err(Error::unsupported(
            Protocol::Pop3,
            "deletions are committed when the session ends",
        ))
    }

    async fn set_current_mailbox(&mut self, name: &str) -> Result<()> {
        debug!(mailbox = name, "POP3 has no mailboxes, ignored");
        Ok(())
    }

    async fn set_mailbox_delimiter(&mut self, _delimiter: &str) -> Result<()> {
        Ok(())
    }
}

impl<C: Connector> std::fmt::Debug for Pop3Receiver<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pop3Receiver")
            .field("connected", &self.session.is_some())
            .finish_non_exhaustive()
    }
}

impl<C: Connector> Drop for Pop3Receiver<C> {
    fn drop(&mut self) {
        if self.session.is_some() {
            warn!("POP3 receiver dropped while connected; call logoff first");
        }
    }
}
