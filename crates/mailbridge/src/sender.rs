//! Sending messages.

use async_trait::async_trait;
use mailbridge_smtp::{Address as SmtpAddress, Envelope};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::message::{BccHeader, Message};
use crate::profile::Profile;
use crate::protocol::TextProcessing;
use crate::transport::{Connector, NetworkConnector, SmtpTransport};

/// Delivers or stores outgoing messages.
#[async_trait]
pub trait MailSender: Send {
    /// Sends a message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSenderType`] when the message has no
    /// sender, and protocol errors unchanged.
    async fn send(&mut self, message: &Message, processing: TextProcessing) -> Result<()>;
}

/// Submits messages over SMTP.
pub struct SmtpSender<C: Connector = NetworkConnector> {
    connector: C,
    transport: Option<C::Smtp>,
}

impl SmtpSender {
    /// Creates a disconnected sender using the network.
    #[must_use]
    pub fn new() -> Self {
        Self::with_connector(NetworkConnector)
    }
}

impl Default for SmtpSender {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Connector> SmtpSender<C> {
    /// Creates a disconnected sender with a custom connector.
    #[must_use]
    pub const fn with_connector(connector: C) -> Self {
        Self {
            connector,
            transport: None,
        }
    }

    /// Returns true while connected.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    /// Connects to the profile's SMTP server.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or authentication fails.
    pub async fn logon(&mut self, profile: &Profile) -> Result<()> {
        self.logoff().await?;
        self.transport = Some(self.connector.smtp(profile).await?);
        Ok(())
    }

    /// Closes the connection. Does nothing when not connected.
    ///
    /// # Errors
    ///
    /// Returns an error if QUIT fails.
    pub async fn logoff(&mut self) -> Result<()> {
        if let Some(mut transport) = self.transport.take() {
            info!("SMTP logoff");
            transport.quit().await?;
        }
        Ok(())
    }
}

/// Reverse path from the sender, forward paths from To, Cc and Bcc.
fn envelope(message: &Message) -> Result<Envelope> {
    let from = SmtpAddress::new(message.sender_mailbox()?.address)?;
    let recipients = message
        .recipients()
        .map(|address| SmtpAddress::new(address.address()))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    if recipients.is_empty() {
        return Err(Error::InvalidArgumentValue("message has no recipients".into()));
    }
    Ok(Envelope::new(from, recipients)?)
}

#[async_trait]
impl<C: Connector> MailSender for SmtpSender<C> {
    async fn send(&mut self, message: &Message, processing: TextProcessing) -> Result<()> {
        let envelope = envelope(message)?;
        let data = message.to_wire(processing, BccHeader::Strip)?;
        let transport = self
            .transport
            .as_mut()
            .ok_or_else(|| Error::ProtocolState("SMTP connection not established".into()))?;
        info!(
            recipients = envelope.recipients().len(),
            bytes = data.len(),
            "Sending message"
        );
        transport.send(&envelope, &data).await
    }
}

impl<C: Connector> std::fmt::Debug for SmtpSender<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpSender")
            .field("connected", &self.transport.is_some())
            .finish_non_exhaustive()
    }
}

impl<C: Connector> Drop for SmtpSender<C> {
    fn drop(&mut self) {
        if self.transport.is_some() {
            warn!("SMTP sender dropped while connected; call logoff first");
        }
    }
}
