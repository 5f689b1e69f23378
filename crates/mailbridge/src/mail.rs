//! One entry point for sending and receiving.

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::filter::SearchFilter;
use crate::message::Message;
use crate::profile::Profile;
use crate::protocol::{KnownIdPolicy, Protocol, TextProcessing};
use crate::receiver::{ImapReceiver, MailReceiver, Pop3Receiver};
use crate::selector::Selector;
use crate::sender::{MailSender, SmtpSender};
use crate::transport::{Connector, NetworkConnector};

/// Sends over SMTP (or IMAP append) and receives over IMAP or POP3.
///
/// Receive operations do nothing before [`InternetMail::logon`] has
/// chosen a receiver: lists come back empty and counts are zero.
///
/// # Example
///
/// ```no_run
/// use mailbridge::{InternetMail, Profile, Protocol};
///
/// # async fn run() -> mailbridge::Result<()> {
/// let profile = Profile {
///     imap_server_address: "imap.example.com".into(),
///     imap_user: "me".into(),
///     imap_password: "secret".into(),
///     ..Profile::default()
/// };
/// let mut mail = InternetMail::new();
/// mail.logon(&profile, Protocol::Imap).await?;
/// for message in mail.get_headers(None).await? {
///     println!("{}", message.subject);
/// }
/// mail.logoff().await?;
/// # Ok(())
/// # }
/// ```
pub struct InternetMail<C: Connector = NetworkConnector> {
    connector: C,
    smtp: SmtpSender<C>,
    receiver: Option<Box<dyn MailReceiver>>,
    current_mailbox: String,
    delimiter: String,
    known_id_policy: KnownIdPolicy,
}

impl InternetMail {
    /// Creates a facade that connects over the network.
    #[must_use]
    pub fn new() -> Self {
        Self::with_connector(NetworkConnector)
    }
}

impl Default for InternetMail {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Connector> InternetMail<C> {
    /// Creates a facade with a custom connector.
    #[must_use]
    pub fn with_connector(connector: C) -> Self {
        Self {
            smtp: SmtpSender::with_connector(connector.clone()),
            connector,
            receiver: None,
            current_mailbox: String::new(),
            delimiter: String::new(),
            known_id_policy: KnownIdPolicy::default(),
        }
    }

    /// Protocol of the active receiver, if any.
    #[must_use]
    pub fn receive_protocol(&self) -> Option<Protocol> {
        self.receiver.as_ref().map(|r| r.protocol())
    }

    /// Returns true while the SMTP connection is open.
    #[must_use]
    pub const fn is_smtp_connected(&self) -> bool {
        self.smtp.is_connected()
    }

    /// Returns true while the receiver is logged on.
    #[must_use]
    pub fn is_receiver_connected(&self) -> bool {
        self.receiver.as_ref().is_some_and(|r| r.is_connected())
    }

    /// Mailbox used by IMAP operations; empty means `INBOX`.
    #[must_use]
    pub fn current_mailbox(&self) -> &str {
        &self.current_mailbox
    }

    /// Switches the IMAP mailbox, reopening it when connected.
    ///
    /// # Errors
    ///
    /// Returns an error if the mailbox cannot be opened.
    pub async fn set_current_mailbox(&mut self, name: &str) -> Result<()> {
        if let Some(receiver) = self.receiver.as_mut() {
            receiver.set_current_mailbox(name).await?;
        }
        self.current_mailbox = name.to_string();
        Ok(())
    }

    /// Hierarchy delimiter used for IMAP mailbox names; empty until set.
    #[must_use]
    pub fn mailbox_delimiter(&self) -> &str {
        &self.delimiter
    }

    /// Sets the hierarchy delimiter, reopening the IMAP mailbox when
    /// connected.
    ///
    /// # Errors
    ///
    /// Returns an error if the mailbox cannot be reopened.
    pub async fn set_mailbox_delimiter(&mut self, delimiter: &str) -> Result<()> {
        if let Some(receiver) = self.receiver.as_mut() {
            receiver.set_mailbox_delimiter(delimiter).await?;
        }
        self.delimiter = delimiter.to_string();
        Ok(())
    }

    /// How [`InternetMail::get_identifiers`] treats known ids.
    #[must_use]
    pub const fn known_id_policy(&self) -> KnownIdPolicy {
        self.known_id_policy
    }

    /// Sets the known-id policy.
    pub const fn set_known_id_policy(&mut self, policy: KnownIdPolicy) {
        self.known_id_policy = policy;
    }

    /// Connects for sending and receiving.
    ///
    /// SMTP logs on first unless `pop3_before_smtp` is set, and only when
    /// an SMTP server is configured. The receiver logs on only when its
    /// server address is set. If the receiver fails to log on, SMTP is
    /// closed again and no receiver is kept.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProtocolState`] for SMTP as receive protocol,
    /// before any network call, and connection errors unchanged.
    pub async fn logon(&mut self, profile: &Profile, protocol: Protocol) -> Result<()> {
        if protocol == Protocol::Smtp {
            return Err(Error::ProtocolState(
                "SMTP cannot be used as the receive protocol".into(),
            ));
        }
        let previous = self.logoff().await;
        self.receiver = None;
        previous?;

        let use_smtp = !profile.smtp_server_address.is_empty();
        if use_smtp && !profile.pop3_before_smtp {
            self.smtp.logon(profile).await?;
        }

        let mut receiver: Box<dyn MailReceiver> = match protocol {
            Protocol::Imap => Box::new(ImapReceiver::with_connector(self.connector.clone())),
            Protocol::Pop3 | Protocol::Smtp => {
                Box::new(Pop3Receiver::with_connector(self.connector.clone()))
            }
        };
        let address = match protocol {
            Protocol::Imap => &profile.imap_server_address,
            Protocol::Pop3 | Protocol::Smtp => &profile.pop3_server_address,
        };
        receiver.set_current_mailbox(&self.current_mailbox).await?;
        if !self.delimiter.is_empty() {
            receiver.set_mailbox_delimiter(&self.delimiter).await?;
        }
        if address.is_empty() {
            debug!(%protocol, "No server address, receiver left disconnected");
        } else if let Err(e) = receiver.logon(profile).await {
            if let Err(smtp) = self.smtp.logoff().await {
                debug!(error = %smtp, "SMTP logoff after failed receiver logon");
            }
            return Err(e);
        }
        self.receiver = Some(receiver);

        if use_smtp && profile.pop3_before_smtp {
            self.smtp.logon(profile).await?;
        }
        info!(%protocol, "Logged on");
        Ok(())
    }

    /// Disconnects SMTP, then the receiver.
    ///
    /// # Errors
    ///
    /// Returns the first error; both connections are closed regardless.
    pub async fn logoff(&mut self) -> Result<()> {
        let smtp = self.smtp.logoff().await;
        let receiver = match self.receiver.as_mut() {
            Some(receiver) => receiver.logoff().await,
            None => Ok(()),
        };
        smtp.and(receiver)
    }

    /// Sends a message over SMTP, or stores it in the current IMAP
    /// mailbox.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProtocolState`] for POP3, or for IMAP without an
    /// IMAP receiver, before any network call.
    pub async fn send(
        &mut self,
        message: &Message,
        processing: TextProcessing,
        protocol: Protocol,
    ) -> Result<()> {
        match protocol {
            Protocol::Pop3 => Err(Error::ProtocolState(
                "POP3 cannot be used as the send protocol".into(),
            )),
            Protocol::Smtp => self.smtp.send(message, processing).await,
            Protocol::Imap => {
                let sender = self
                    .receiver
                    .as_mut()
                    .and_then(|r| r.as_sender())
                    .ok_or_else(|| Error::ProtocolState("IMAP connection not established".into()))?;
                sender.send(message, processing).await
            }
        }
    }

    /// Header-only messages. See [`MailReceiver::get_headers`].
    ///
    /// # Errors
    ///
    /// Returns receiver errors unchanged.
    pub async fn get_headers(&mut self, filter: Option<&SearchFilter>) -> Result<Vec<Message>> {
        match self.receiver.as_mut() {
            Some(receiver) => receiver.get_headers(filter).await,
            None => Ok(Vec::new()),
        }
    }

    /// Server ids, filtered by the known-id policy.
    ///
    /// # Errors
    ///
    /// Returns receiver errors unchanged.
    pub async fn get_identifiers(
        &mut self,
        known_ids: Option<&[String]>,
        filter: Option<&SearchFilter>,
    ) -> Result<Vec<String>> {
        let policy = self.known_id_policy;
        match self.receiver.as_mut() {
            Some(receiver) => receiver.get_identifiers(known_ids, policy, filter).await,
            None => Ok(Vec::new()),
        }
    }

    /// Messages in the current mailbox, zero without a receiver.
    ///
    /// # Errors
    ///
    /// Returns receiver errors unchanged.
    pub async fn get_message_count(&mut self) -> Result<u32> {
        match self.receiver.as_mut() {
            Some(receiver) => receiver.get_message_count().await,
            None => Ok(0),
        }
    }

    /// Downloads messages; `delete` and `mark_as_read` default to true.
    ///
    /// # Errors
    ///
    /// Returns receiver errors unchanged.
    pub async fn get(
        &mut self,
        delete: Option<bool>,
        selectors: Option<&[Selector]>,
        mark_as_read: Option<bool>,
    ) -> Result<Vec<Message>> {
        match self.receiver.as_mut() {
            Some(receiver) => {
                receiver
                    .get(
                        delete.unwrap_or(true),
                        selectors,
                        mark_as_read.unwrap_or(true),
                    )
                    .await
            }
            None => Ok(Vec::new()),
        }
    }

    /// Marks messages deleted (IMAP) or deletes them (POP3).
    ///
    /// # Errors
    ///
    /// Returns receiver errors unchanged.
    pub async fn delete_messages(&mut self, selectors: &[Selector]) -> Result<()> {
        match self.receiver.as_mut() {
            Some(receiver) => receiver.delete_messages(selectors).await,
            None => Ok(()),
        }
    }

    /// Clears the deleted flag (IMAP only).
    ///
    /// # Errors
    ///
    /// Returns receiver errors unchanged.
    pub async fn undelete_messages(&mut self, selectors: &[Selector]) -> Result<()> {
        match self.receiver.as_mut() {
            Some(receiver) => receiver.undelete_messages(selectors).await,
            None => Ok(()),
        }
    }

    /// Expunges the current mailbox (IMAP only).
    ///
    /// # Errors
    ///
    /// Returns receiver errors unchanged.
    pub async fn clear_deleted_messages(&mut self) -> Result<()> {
        match self.receiver.as_mut() {
            Some(receiver) => receiver.clear_deleted_messages().await,
            None => Ok(()),
        }
    }

    /// Every mailbox name (IMAP only).
    ///
    /// # Errors
    ///
    /// Returns receiver errors unchanged.
    pub async fn get_mailboxes(&mut self) -> Result<Vec<String>> {
        self.mailboxes(false).await
    }

    /// Subscribed mailbox names (IMAP only).
    ///
    /// # Errors
    ///
    /// Returns receiver errors unchanged.
    pub async fn get_mailboxes_by_subscription(&mut self) -> Result<Vec<String>> {
        self.mailboxes(true).await
    }

    async fn mailboxes(&mut self, subscribed_only: bool) -> Result<Vec<String>> {
        match self.receiver.as_mut() {
            Some(receiver) => receiver.get_mailboxes(subscribed_only).await,
            None => Ok(Vec::new()),
        }
    }

    /// Subscribes to a mailbox (IMAP only).
    ///
    /// # Errors
    ///
    /// Returns receiver errors unchanged.
    pub async fn subscribe_to_mailbox(&mut self, name: &str) -> Result<()> {
        match self.receiver.as_mut() {
            Some(receiver) => receiver.subscribe_to_mailbox(name).await,
            None => Ok(()),
        }
    }

    /// Unsubscribes from a mailbox (IMAP only).
    ///
    /// # Errors
    ///
    /// Returns receiver errors unchanged.
    pub async fn unsubscribe_from_mailbox(&mut self, name: &str) -> Result<()> {
        match self.receiver.as_mut() {
            Some(receiver) => receiver.unsubscribe_from_mailbox(name).await,
            None => Ok(()),
        }
    }

    /// Renames a mailbox under the same parent (IMAP only).
    ///
    /// # Errors
    ///
    /// Returns receiver errors unchanged.
    pub async fn rename_mailbox(&mut self, name: &str, new_name: &str) -> Result<()> {
        match self.receiver.as_mut() {
            Some(receiver) => receiver.rename_mailbox(name, new_name).await,
            None => Ok(()),
        }
    }

    /// Creates a mailbox from the root; `name` may be a hierarchical path
    /// (IMAP only).
    ///
    /// # Errors
    ///
    /// Returns receiver errors unchanged.
    pub async fn create_mailbox(&mut self, name: &str) -> Result<()> {
        match self.receiver.as_mut() {
            Some(receiver) => receiver.create_mailbox(name).await,
            None => Ok(()),
        }
    }

    /// Deletes a mailbox (IMAP only).
    ///
    /// # Errors
    ///
    /// Returns receiver errors unchanged.
    pub async fn delete_mailbox(&mut self, name: &str) -> Result<()> {
        match self.receiver.as_mut() {
            Some(receiver) => receiver.delete_mailbox(name).await,
            None => Ok(()),
        }
    }
}

impl<C: Connector> std::fmt::Debug for InternetMail<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InternetMail")
            .field("receive_protocol", &self.receive_protocol())
            .field("smtp", &self.smtp)
            .field("current_mailbox", &self.current_mailbox)
            .field("delimiter", &self.delimiter)
            .field("known_id_policy", &self.known_id_policy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::fakes::{FakeConnector, imap_profile, plain_message, pop3_profile};
    use mailbridge_imap::Flags;

    fn full_profile() -> Profile {
        Profile {
            smtp_server_address: "smtp.example.com".into(),
            pop3_server_address: "pop.example.com".into(),
            ..imap_profile()
        }
    }

    fn outgoing() -> Message {
        let mut message = Message::new();
        message.sender = Some("me@example.com".into());
        message.to.add("you@example.com").unwrap();
        message.subject = "Hello".into();
        message.texts.add_plain("Hi");
        message
    }

    #[tokio::test]
    async fn test_smtp_is_not_a_receive_protocol() {
        let fake = FakeConnector::default();
        let mut mail = InternetMail::with_connector(fake.clone());
        let err = mail.logon(&full_profile(), Protocol::Smtp).await.unwrap_err();
        assert!(matches!(err, Error::ProtocolState(_)));
        assert!(err.is_usage_error());
        assert_eq!(fake.smtp_logons(), 0);
        assert_eq!(fake.imap_logons(), 0);
    }

    #[tokio::test]
    async fn test_without_receiver_everything_is_a_no_op() {
        let mut mail = InternetMail::with_connector(FakeConnector::default());
        assert_eq!(mail.get_message_count().await.unwrap(), 0);
        assert!(mail.get_headers(None).await.unwrap().is_empty());
        assert!(mail.get(None, None, None).await.unwrap().is_empty());
        assert!(mail.get_mailboxes().await.unwrap().is_empty());
        mail.create_mailbox("Work").await.unwrap();
        mail.delete_messages(&[Selector::Sequence(1)]).await.unwrap();
        mail.logoff().await.unwrap();
    }

    #[tokio::test]
    async fn test_imap_get_marks_seen() {
        let fake = FakeConnector::default();
        fake.add_imap_message("INBOX", &plain_message("One"), Flags::new());
        fake.add_imap_message("INBOX", &plain_message("Two"), Flags::new());

        let mut mail = InternetMail::with_connector(fake.clone());
        mail.logon(&imap_profile(), Protocol::Imap).await.unwrap();
        assert_eq!(mail.receive_protocol(), Some(Protocol::Imap));

        let messages = mail.get(Some(false), None, Some(true)).await.unwrap();
        assert_eq!(messages.len(), 2);
        for flags in fake.imap_flags("INBOX") {
            assert!(flags.is_seen());
            assert!(!flags.is_deleted());
        }
        mail.logoff().await.unwrap();
    }

    #[tokio::test]
    async fn test_get_defaults_delete() {
        let fake = FakeConnector::default();
        fake.add_imap_message("INBOX", &plain_message("One"), Flags::new());

        let mut mail = InternetMail::with_connector(fake.clone());
        mail.logon(&imap_profile(), Protocol::Imap).await.unwrap();
        mail.get(None, None, None).await.unwrap();
        assert!(fake.imap_flags("INBOX")[0].is_deleted());
        mail.logoff().await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_then_clear_decrements_count() {
        let fake = FakeConnector::default();
        for subject in ["One", "Two", "Three"] {
            fake.add_imap_message("INBOX", &plain_message(subject), Flags::new());
        }
        let mut mail = InternetMail::with_connector(fake.clone());
        mail.logon(&imap_profile(), Protocol::Imap).await.unwrap();

        let before = mail.get_message_count().await.unwrap();
        let headers = mail.get_headers(None).await.unwrap();
        mail.delete_messages(&[Selector::from(&headers[0])])
            .await
            .unwrap();
        mail.clear_deleted_messages().await.unwrap();
        assert_eq!(mail.get_message_count().await.unwrap(), before - 1);
        mail.logoff().await.unwrap();
    }

    #[tokio::test]
    async fn test_pop3_mailbox_management_unsupported() {
        let fake = FakeConnector::default();
        let mut mail = InternetMail::with_connector(fake.clone());
        mail.logon(&pop3_profile(), Protocol::Pop3).await.unwrap();

        let err = mail.create_mailbox("Work").await.unwrap_err();
        assert!(matches!(
            err,
            Error::NotSupportedInProtocol {
                protocol: Protocol::Pop3,
                ..
            }
        ));
        mail.logoff().await.unwrap();
    }

    #[tokio::test]
    async fn test_logon_order_and_addresses() {
        let fake = FakeConnector::default();
        let mut mail = InternetMail::with_connector(fake.clone());

        let profile = Profile {
            pop3_server_address: String::new(),
            ..full_profile()
        };
        mail.logon(&profile, Protocol::Pop3).await.unwrap();
        assert!(mail.is_smtp_connected());
        assert!(!mail.is_receiver_connected());
        assert_eq!(fake.pop3_logons(), 0);
        assert_eq!(fake.smtp_logons(), 1);

        let profile = Profile {
            pop3_before_smtp: true,
            ..full_profile()
        };
        mail.logon(&profile, Protocol::Pop3).await.unwrap();
        assert!(mail.is_smtp_connected());
        assert!(mail.is_receiver_connected());
        assert_eq!(fake.pop3_logons(), 1);
        assert_eq!(fake.smtp_logons(), 2);

        mail.logoff().await.unwrap();
        assert!(!mail.is_smtp_connected());
        assert!(!mail.is_receiver_connected());
        assert!(fake.smtp_quit());
    }

    #[tokio::test]
    async fn test_send_protocols() {
        let fake = FakeConnector::default();
        let mut mail = InternetMail::with_connector(fake.clone());

        let err = mail
            .send(&outgoing(), TextProcessing::Process, Protocol::Imap)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ProtocolState(_)));

        mail.logon(&full_profile(), Protocol::Pop3).await.unwrap();
        let err = mail
            .send(&outgoing(), TextProcessing::Process, Protocol::Pop3)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ProtocolState(_)));
        let err = mail
            .send(&outgoing(), TextProcessing::Process, Protocol::Imap)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ProtocolState(_)));

        mail.send(&outgoing(), TextProcessing::Process, Protocol::Smtp)
            .await
            .unwrap();
        assert_eq!(fake.smtp_sent().len(), 1);

        mail.logon(&full_profile(), Protocol::Imap).await.unwrap();
        mail.send(&outgoing(), TextProcessing::DontProcess, Protocol::Imap)
            .await
            .unwrap();
        assert_eq!(fake.imap_flags("INBOX").len(), 1);
        mail.logoff().await.unwrap();
    }

    #[tokio::test]
    async fn test_mailbox_settings_apply_on_logon() {
        let fake = FakeConnector::default();
        fake.add_imap_message("Archive", &plain_message("Old"), Flags::new());

        let mut mail = InternetMail::with_connector(fake.clone());
        mail.set_current_mailbox("Archive").await.unwrap();
        mail.set_mailbox_delimiter(".").await.unwrap();
        assert_eq!(mail.mailbox_delimiter(), ".");

        mail.logon(&imap_profile(), Protocol::Imap).await.unwrap();
        assert_eq!(fake.imap_selected().as_deref(), Some("Archive"));
        assert_eq!(mail.get_message_count().await.unwrap(), 1);

        mail.set_current_mailbox("INBOX").await.unwrap();
        assert_eq!(mail.current_mailbox(), "INBOX");
        assert_eq!(mail.get_message_count().await.unwrap(), 0);
        mail.logoff().await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_logon_drops_previous_receiver() {
        let mut mail = InternetMail::with_connector(FakeConnector::default());
        let mut profile = pop3_profile();
        profile.imap_server_address = "imap.example.com".into();
        profile.smtp_server_address = "smtp.example.com".into();

        mail.logon(&profile, Protocol::Pop3).await.unwrap();
        mail.set_current_mailbox("Missing").await.unwrap();
        assert_eq!(mail.receive_protocol(), Some(Protocol::Pop3));

        assert!(mail.logon(&profile, Protocol::Imap).await.is_err());
        assert_eq!(mail.receive_protocol(), None);
        assert!(!mail.is_smtp_connected());
        assert!(!mail.is_receiver_connected());
        assert!(mail.get_headers(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_mailbox_switch_keeps_setting() {
        let fake = FakeConnector::default();
        let mut mail = InternetMail::with_connector(fake.clone());
        mail.logon(&imap_profile(), Protocol::Imap).await.unwrap();

        assert!(mail.set_current_mailbox("Missing").await.is_err());
        assert_eq!(mail.current_mailbox(), "");
        assert_eq!(fake.imap_selected().as_deref(), Some("INBOX"));
        mail.logoff().await.unwrap();
    }

    #[tokio::test]
    async fn test_known_id_policy_forwarded() {
        let fake = FakeConnector::default();
        fake.add_pop3_message("a", &plain_message("A"));
        fake.add_pop3_message("b", &plain_message("B"));

        let mut mail = InternetMail::with_connector(fake.clone());
        mail.logon(&pop3_profile(), Protocol::Pop3).await.unwrap();
        let known = vec!["a".to_string()];

        assert_eq!(mail.known_id_policy(), KnownIdPolicy::Exclude);
        assert_eq!(mail.get_identifiers(Some(&known), None).await.unwrap(), ["b"]);

        mail.set_known_id_policy(KnownIdPolicy::Include);
        assert_eq!(mail.get_identifiers(Some(&known), None).await.unwrap(), ["a"]);
        assert_eq!(mail.get_identifiers(None, None).await.unwrap(), ["a", "b"]);
        mail.logoff().await.unwrap();
    }
}
