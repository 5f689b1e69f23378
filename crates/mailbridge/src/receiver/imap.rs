//! IMAP receiver: one open folder, persistent prefixed UIDs.

use async_trait::async_trait;
use mailbridge_imap::{FetchedMessage, Flag, Mailbox, SearchKey, StoreAction, Uid, UidSet};
use tracing::{debug, info, warn};

use super::MailReceiver;
use crate::error::{Error, Result};
use crate::filter::SearchFilter;
use crate::message::Message;
use crate::profile::Profile;
use crate::protocol::{KnownIdPolicy, Protocol, TextProcessing};
use crate::selector::{Selector, Target, flatten};
use crate::sender::MailSender;
use crate::transport::{Connector, ImapSession, NetworkConnector};

const ID_PREFIX: &str = "imap-";

/// Default hierarchy delimiter until the caller or the server says otherwise.
const DEFAULT_DELIMITER: &str = "/";

/// Formats a UID as a message id, e.g. `imap-42`.
#[must_use]
pub fn imap_id(uid: Uid) -> String {
    format!("{ID_PREFIX}{}", uid.get())
}

/// Parses a message id produced by [`imap_id`].
///
/// Returns `None` when the prefix is missing or the rest is not a
/// non-zero number.
#[must_use]
pub fn parse_imap_id(id: &str) -> Option<Uid> {
    id.strip_prefix(ID_PREFIX)?.parse().ok().and_then(Uid::new)
}

/// Receives mail from an IMAP server.
///
/// After logon the current mailbox (default `INBOX`) is open read-write.
/// Switching mailbox or delimiter reopens it without expunging.
pub struct ImapReceiver<C: Connector = NetworkConnector> {
    connector: C,
    session: Option<C::Imap>,
    current_mailbox: String,
    delimiter: String,
}

impl ImapReceiver {
    /// Creates a disconnected receiver using the network.
    #[must_use]
    pub fn new() -> Self {
        Self::with_connector(NetworkConnector)
    }
}

impl Default for ImapReceiver {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Connector> ImapReceiver<C> {
    /// Creates a disconnected receiver with a custom connector.
    #[must_use]
    pub fn with_connector(connector: C) -> Self {
        Self {
            connector,
            session: None,
            current_mailbox: String::new(),
            delimiter: DEFAULT_DELIMITER.to_string(),
        }
    }

    /// Name of the open mailbox; empty means `INBOX`.
    #[must_use]
    pub fn current_mailbox(&self) -> &str {
        &self.current_mailbox
    }

    /// Configured hierarchy delimiter.
    #[must_use]
    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    fn folder(&self) -> Mailbox {
        if self.current_mailbox.is_empty() {
            Mailbox::inbox()
        } else {
            Mailbox::new(self.current_mailbox.as_str())
        }
    }

    fn session(&mut self) -> Result<&mut C::Imap> {
        self.session
            .as_mut()
            .ok_or_else(|| Error::ProtocolState("IMAP connection not established".into()))
    }

    async fn reopen_folder(&mut self) -> Result<()> {
        let folder = self.folder();
        if let Some(session) = self.session.as_mut() {
            info!(mailbox = %folder, "Opening IMAP folder");
            session.select(&folder).await?;
        }
        Ok(())
    }

    /// Reopens with the new settings; on failure restores the previous
    /// ones and reselects their folder.
    async fn reopen_or_restore(&mut self, mailbox: String, delimiter: String) -> Result<()> {
        let Err(e) = self.reopen_folder().await else {
            return Ok(());
        };
        warn!(mailbox = %self.folder(), error = %e, "Cannot open mailbox, keeping previous");
        self.current_mailbox = mailbox;
        self.delimiter = delimiter;
        if let Err(reselect) = self.reopen_folder().await {
            debug!(error = %reselect, "Previous mailbox could not be reselected");
        }
        Err(e)
    }

    async fn store(&mut self, selectors: &[Selector], action: StoreAction) -> Result<()> {
        let session = self.session()?;
        let uids = resolve(session, selectors).await?;
        if uids.is_empty() {
            return Ok(());
        }
        session.store(&UidSet::from_uids(uids), action).await
    }
}

/// UIDs matching an optional filter, ascending.
async fn search<S: ImapSession + ?Sized>(
    session: &mut S,
    filter: Option<&SearchFilter>,
) -> Result<Vec<Uid>> {
    let key = match filter {
        Some(filter) => filter.to_search_key()?,
        None => SearchKey::All,
    };
    session.search(&key).await
}

/// Resolves selectors to UIDs before anything is changed on the server.
///
/// A sequence number `n` names the `n`-th UID of the open mailbox.
async fn resolve<S: ImapSession + ?Sized>(
    session: &mut S,
    selectors: &[Selector],
) -> Result<Vec<Uid>> {
    let targets = flatten(selectors);
    let all = if targets.iter().any(|t| matches!(t, Target::Sequence(_))) {
        session.search(&SearchKey::All).await?
    } else {
        Vec::new()
    };

    targets
        .into_iter()
        .map(|target| match target {
            Target::Id(id) => parse_imap_id(id)
                .ok_or_else(|| Error::InvalidArgumentValue(format!("not an IMAP message id: {id}"))),
            Target::Sequence(n) => n
                .checked_sub(1)
                .and_then(|index| all.get(index as usize))
                .copied()
                .ok_or_else(|| {
                    Error::InvalidArgumentValue(format!("no message at position {n}"))
                }),
        })
        .collect()
}

fn summary_message(fetched: FetchedMessage) -> Option<Message> {
    let Some(uid) = fetched.uid else {
        debug!(seq = %fetched.seq, "FETCH response without UID skipped");
        return None;
    };
    let header = fetched.header.unwrap_or_default();
    let mut message = Message::from_header_data(&header, vec![imap_id(uid)]);
    apply_metadata(&mut message, fetched.size, fetched.internal_date);
    Some(message)
}

fn full_message(fetched: FetchedMessage) -> Option<Message> {
    let Some(uid) = fetched.uid else {
        debug!(seq = %fetched.seq, "FETCH response without UID skipped");
        return None;
    };
    let body = fetched.body.unwrap_or_default();
    let mut message = Message::from_received(&body, vec![imap_id(uid)]);
    apply_metadata(&mut message, fetched.size, fetched.internal_date);
    Some(message)
}

fn apply_metadata(
    message: &mut Message,
    size: Option<u32>,
    internal_date: Option<chrono::DateTime<chrono::FixedOffset>>,
) {
    if let Some(size) = size {
        message.set_size(u64::from(size));
    }
    if let Some(date) = internal_date {
        message.set_date_received(date);
    }
}

#[async_trait]
impl<C: Connector> MailReceiver for ImapReceiver<C> {
    fn protocol(&self) -> Protocol {
        Protocol::Imap
    }

    fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    async fn logon(&mut self, profile: &Profile) -> Result<()> {
        if self.session.is_some() {
            self.logoff().await?;
        }
        let mut session = self.connector.imap(profile).await?;
        let folder = self.folder();
        if let Err(e) = session.select(&folder).await {
            if let Err(logout) = session.logout().await {
                warn!(error = %logout, "IMAP logout after failed SELECT");
            }
            return Err(e);
        }
        info!(mailbox = %folder, "IMAP folder open");
        self.session = Some(session);
        Ok(())
    }

    async fn logoff(&mut self) -> Result<()> {
        if let Some(mut session) = self.session.take() {
            info!("IMAP logoff");
            session.logout().await?;
        }
        Ok(())
    }

    async fn get_headers(&mut self, filter: Option<&SearchFilter>) -> Result<Vec<Message>> {
        let session = self.session()?;
        let uids = search(session, filter).await?;
        if uids.is_empty() {
            return Ok(Vec::new());
        }
        let fetched = session.fetch_summaries(&UidSet::from_uids(uids)).await?;
        Ok(fetched.into_iter().filter_map(summary_message).collect())
    }

    async fn get_identifiers(
        &mut self,
        known_ids: Option<&[String]>,
        policy: KnownIdPolicy,
        filter: Option<&SearchFilter>,
    ) -> Result<Vec<String>> {
        let session = self.session()?;
        let ids = search(session, filter)
            .await?
            .into_iter()
            .map(imap_id)
            .collect();
        Ok(policy.apply(ids, known_ids))
    }

    async fn get_message_count(&mut self) -> Result<u32> {
        self.session()?.message_count().await
    }

    async fn delete_messages(&mut self, selectors: &[Selector]) -> Result<()> {
        self.store(selectors, StoreAction::add(vec![Flag::Deleted]))
            .await
    }

    async fn get(
        &mut self,
        delete: bool,
        selectors: Option<&[Selector]>,
        mark_as_read: bool,
    ) -> Result<Vec<Message>> {
        let session = self.session()?;
        let uids = match selectors {
            Some(selectors) => resolve(session, selectors).await?,
            None => session.search(&SearchKey::All).await?,
        };
        if uids.is_empty() {
            return Ok(Vec::new());
        }

        let set = UidSet::from_uids(uids);
        let messages: Vec<Message> = session
            .fetch_messages(&set)
            .await?
            .into_iter()
            .filter_map(full_message)
            .collect();

        if delete {
            info!(count = messages.len(), "Flagging fetched messages deleted");
            session.store(&set, StoreAction::add(vec![Flag::Deleted])).await?;
        } else if mark_as_read {
            session.store(&set, StoreAction::add(vec![Flag::Seen])).await?;
        }
        Ok(messages)
    }

    async fn get_mailboxes(&mut self, subscribed_only: bool) -> Result<Vec<String>> {
        let listed = self.session()?.list("*", subscribed_only).await?;
        Ok(listed
            .into_iter()
            .map(|entry| entry.mailbox.as_str().to_string())
            .collect())
    }

    async fn subscribe_to_mailbox(&mut self, name: &str) -> Result<()> {
        self.session()?.subscribe(&Mailbox::new(name)).await
    }

    async fn unsubscribe_from_mailbox(&mut self, name: &str) -> Result<()> {
        let mailbox = Mailbox::new(name);
        let session = self.session()?;
        let subscribed = session
            .list(mailbox.as_str(), true)
            .await?
            .iter()
            .any(|entry| entry.mailbox == mailbox);
        if subscribed {
            session.unsubscribe(&mailbox).await?;
        } else {
            debug!(mailbox = %mailbox, "Not subscribed, nothing to do");
        }
        Ok(())
    }

    async fn rename_mailbox(&mut self, name: &str, new_name: &str) -> Result<()> {
        let fallback = self.delimiter.clone();
        let mailbox = Mailbox::new(name);
        let session = self.session()?;
        let listed = session.list(mailbox.as_str(), false).await?;
        let target = match listed.iter().find(|entry| entry.mailbox == mailbox) {
            Some(entry) => match entry.parent() {
                Some(parent) => {
                    let delimiter = entry
                        .delimiter
                        .map_or(fallback, |c| c.to_string());
                    format!("{parent}{delimiter}{new_name}")
                }
                None => new_name.to_string(),
            },
            None => new_name.to_string(),
        };
        info!(from = %mailbox, to = %target, "Renaming mailbox");
        session.rename(&mailbox, &Mailbox::new(target.as_str())).await?;

        if self.folder() == mailbox {
            self.current_mailbox = target;
        }
        Ok(())
    }

    async fn create_mailbox(&mut self, name: &str) -> Result<()> {
        info!(mailbox = name, "Creating mailbox");
        self.session()?.create(&Mailbox::new(name)).await
    }

    async fn delete_mailbox(&mut self, name: &str) -> Result<()> {
        info!(mailbox = name, "Deleting mailbox");
        self.session()?.delete(&Mailbox::new(name)).await
    }

    async fn undelete_messages(&mut self, selectors: &[Selector]) -> Result<()> {
        self.store(selectors, StoreAction::remove(vec![Flag::Deleted]))
            .await
    }

    async fn clear_deleted_messages(&mut self) -> Result<()> {
        info!(mailbox = %self.folder(), "Expunging");
        self.session()?.expunge().await
    }

    async fn set_current_mailbox(&mut self, name: &str) -> Result<()> {
        let previous = std::mem::replace(&mut self.current_mailbox, name.to_string());
        let delimiter = self.delimiter.clone();
        self.reopen_or_restore(previous, delimiter).await
    }

    async fn set_mailbox_delimiter(&mut self, delimiter: &str) -> Result<()> {
        let previous = std::mem::replace(&mut self.delimiter, delimiter.to_string());
        let mailbox = self.current_mailbox.clone();
        self.reopen_or_restore(mailbox, previous).await
    }

    fn as_sender(&mut self) -> Option<&mut dyn MailSender> {
        Some(self)
    }
}

#[async_trait]
impl<C: Connector> MailSender for ImapReceiver<C> {
    /// Stores the message in the current mailbox.
    async fn send(&mut self, message: &Message, processing: TextProcessing) -> Result<()> {
        let folder = self.folder();
        let session = self.session()?;
        let data = message.create_native_message(processing)?;
        info!(mailbox = %folder, bytes = data.len(), "Appending message");
        session.append(&folder, &data).await
    }
}

impl<C: Connector> std::fmt::Debug for ImapReceiver<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImapReceiver")
            .field("connected", &self.session.is_some())
            .field("current_mailbox", &self.current_mailbox)
            .field("delimiter", &self.delimiter)
            .finish_non_exhaustive()
    }
}

impl<C: Connector> Drop for ImapReceiver<C> {
    fn drop(&mut self) {
        if self.session.is_some() {
            warn!("IMAP receiver dropped while connected; call logoff first");
        }
    }
}
