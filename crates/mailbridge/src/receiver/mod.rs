//! The receive-side contract and its IMAP and POP3 implementations.

mod imap;
mod pop3;

pub use imap::{ImapReceiver, imap_id, parse_imap_id};
pub use pop3::Pop3Receiver;

use async_trait::async_trait;

use crate::error::Result;
use crate::filter::SearchFilter;
use crate::message::Message;
use crate::profile::Profile;
use crate::protocol::{KnownIdPolicy, Protocol};
use crate::selector::Selector;
use crate::sender::MailSender;

/// Reading, deleting and organizing mail on a server.
///
/// Operations a protocol cannot perform fail with
/// [`Error::NotSupportedInProtocol`](crate::Error::NotSupportedInProtocol).
#[async_trait]
pub trait MailReceiver: Send {
    /// The protocol spoken.
    fn protocol(&self) -> Protocol;

    /// Returns true while logged on.
    fn is_connected(&self) -> bool;

    /// Connects and logs in.
    async fn logon(&mut self, profile: &Profile) -> Result<()>;

    /// Logs out. Does nothing when not connected.
    async fn logoff(&mut self) -> Result<()>;

    /// Header-only messages, optionally narrowed by a filter.
    async fn get_headers(&mut self, filter: Option<&SearchFilter>) -> Result<Vec<Message>>;

    /// Server ids, narrowed by a filter and by the caller's known ids.
    async fn get_identifiers(
        &mut self,
        known_ids: Option<&[String]>,
        policy: KnownIdPolicy,
        filter: Option<&SearchFilter>,
    ) -> Result<Vec<String>>;

    /// Messages in the mailbox.
    async fn get_message_count(&mut self) -> Result<u32>;

    /// Marks messages deleted.
    async fn delete_messages(&mut self, selectors: &[Selector]) -> Result<()>;

    /// Downloads whole messages, every message when `selectors` is `None`.
    ///
    /// Afterwards the messages are flagged deleted when `delete` is set,
    /// else flagged seen when `mark_as_read` is set.
    async fn get(
        &mut self,
        delete: bool,
        selectors: Option<&[Selector]>,
        mark_as_read: bool,
    ) -> Result<Vec<Message>>;

    /// Mailbox names, all or only subscribed ones.
    async fn get_mailboxes(&mut self, subscribed_only: bool) -> Result<Vec<String>>;

    /// Subscribes to a mailbox.
    async fn subscribe_to_mailbox(&mut self, name: &str) -> Result<()>;

    /// Unsubscribes from a mailbox.
    async fn unsubscribe_from_mailbox(&mut self, name: &str) -> Result<()>;

    /// Renames a mailbox, keeping its parent.
    async fn rename_mailbox(&mut self, name: &str, new_name: &str) -> Result<()>;

    /// Creates a mailbox.
    async fn create_mailbox(&mut self, name: &str) -> Result<()>;

    /// Deletes a mailbox.
    async fn delete_mailbox(&mut self, name: &str) -> Result<()>;

    /// Clears the deleted flag.
    async fn undelete_messages(&mut self, selectors: &[Selector]) -> Result<()>;

    /// Expunges messages marked deleted.
    async fn clear_deleted_messages(&mut self) -> Result<()>;

    /// Switches the open mailbox. Ignored by protocols without mailboxes.
    async fn set_current_mailbox(&mut self, name: &str) -> Result<()>;

    /// Sets the mailbox hierarchy delimiter. Ignored by protocols without
    /// mailboxes.
    async fn set_mailbox_delimiter(&mut self, delimiter: &str) -> Result<()>;

    /// This receiver as a sender, for protocols that can store messages.
    fn as_sender(&mut self) -> Option<&mut dyn MailSender> {
        None
    }
}
