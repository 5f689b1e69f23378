//! POP3 operations the receiver needs, over [`mailbridge_pop3::Client`].

use async_trait::async_trait;
use mailbridge_pop3::{Client, Pop3Stream, Transaction, UidlEntry};

use crate::error::{Error, Result};

/// A POP3 connection in the transaction state.
#[async_trait]
pub trait Pop3Session: Send {
    /// Number of messages in the maildrop.
    async fn count(&mut self) -> Result<u32>;

    /// Message numbers and their unique ids.
    async fn uids(&mut self) -> Result<Vec<UidlEntry>>;

    /// Header block of a message.
    async fn header(&mut self, number: u32) -> Result<Vec<u8>>;

    /// Whole message.
    async fn retrieve(&mut self, number: u32) -> Result<Vec<u8>>;

    /// Marks a message for deletion at the end of the session.
    async fn delete(&mut self, number: u32) -> Result<()>;

    /// Ends the session, committing deletions.
    async fn quit(&mut self) -> Result<()>;
}

/// [`Pop3Session`] over a network connection.
pub struct Pop3Connection {
    client: Option<Client<Pop3Stream, Transaction>>,
}

impl Pop3Connection {
    /// Wraps a logged-in client.
    #[must_use]
    pub const fn new(client: Client<Pop3Stream, Transaction>) -> Self {
        Self {
            client: Some(client),
        }
    }

    fn client(&mut self) -> Result<&mut Client<Pop3Stream, Transaction>> {
        self.client
            .as_mut()
            .ok_or_else(|| Error::ProtocolState("POP3 session already closed".into()))
    }
}

impl std::fmt::Debug for Pop3Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pop3Connection")
            .field("open", &self.client.is_some())
            .finish()
    }
}

#[async_trait]
impl Pop3Session for Pop3Connection {
    async fn count(&mut self) -> Result<u32> {
        Ok(self.client()?.stat().await?.count)
    }

    async fn uids(&mut self) -> Result<Vec<UidlEntry>> {
        Ok(self.client()?.uidl().await?)
    }

    async fn header(&mut self, number: u32) -> Result<Vec<u8>> {
        Ok(self.client()?.top(number, 0).await?)
    }

    async fn retrieve(&mut self, number: u32) -> Result<Vec<u8>> {
        Ok(self.client()?.retr(number).await?)
    }

    async fn delete(&mut self, number: u32) -> Result<()> {
        Ok(self.client()?.dele(number).await?)
    }

    async fn quit(&mut self) -> Result<()> {
        match self.client.take() {
            Some(client) => Ok(client.quit().await?),
            None => Ok(()),
        }
    }
}
