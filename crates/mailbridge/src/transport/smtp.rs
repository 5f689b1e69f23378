//! SMTP operations the sender needs, over [`mailbridge_smtp::Session`].

use async_trait::async_trait;
use mailbridge_smtp::{Envelope, Session};

use crate::error::Result;

/// An open SMTP connection, authenticated when credentials were given.
#[async_trait]
pub trait SmtpTransport: Send {
    /// Runs one mail transaction.
    async fn send(&mut self, envelope: &Envelope, message: &[u8]) -> Result<()>;

    /// Closes the connection.
    async fn quit(&mut self) -> Result<()>;
}

#[async_trait]
impl SmtpTransport for Session {
    async fn send(&mut self, envelope: &Envelope, message: &[u8]) -> Result<()> {
        Ok(Self::send(self, envelope, message).await?)
    }

    async fn quit(&mut self) -> Result<()> {
        Ok(Self::quit(self).await?)
    }
}
