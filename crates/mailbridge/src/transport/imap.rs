//! IMAP operations the receiver needs, over [`mailbridge_imap::Session`].

use async_trait::async_trait;
use mailbridge_imap::{
    FetchAttribute, FetchedMessage, Flag, ListResponse, Mailbox, SearchKey, Session, StoreAction,
    Uid, UidSet,
};

use crate::error::Result;

/// A logged-in IMAP connection.
#[async_trait]
pub trait ImapSession: Send {
    /// Opens a mailbox read-write. Any previously open mailbox is left
    /// without expunging.
    async fn select(&mut self, mailbox: &Mailbox) -> Result<()>;

    /// UIDs matching `key` in the open mailbox, ascending.
    async fn search(&mut self, key: &SearchKey) -> Result<Vec<Uid>>;

    /// UID, flags, size, internal date and header block.
    async fn fetch_summaries(&mut self, uids: &UidSet) -> Result<Vec<FetchedMessage>>;

    /// UID, flags, size and the whole message, without setting `\Seen`.
    async fn fetch_messages(&mut self, uids: &UidSet) -> Result<Vec<FetchedMessage>>;

    /// Changes flags without waiting for per-message replies.
    async fn store(&mut self, uids: &UidSet, action: StoreAction) -> Result<()>;

    /// Removes messages flagged `\Deleted` from the open mailbox.
    async fn expunge(&mut self) -> Result<()>;

    /// Messages in the open mailbox.
    async fn message_count(&mut self) -> Result<u32>;

    /// Lists mailboxes, or only subscribed ones.
    async fn list(&mut self, pattern: &str, subscribed_only: bool) -> Result<Vec<ListResponse>>;

    /// Creates a mailbox.
    async fn create(&mut self, mailbox: &Mailbox) -> Result<()>;

    /// Deletes a mailbox.
    async fn delete(&mut self, mailbox: &Mailbox) -> Result<()>;

    /// Renames a mailbox.
    async fn rename(&mut self, from: &Mailbox, to: &Mailbox) -> Result<()>;

    /// Adds a mailbox to the subscription list.
    async fn subscribe(&mut self, mailbox: &Mailbox) -> Result<()>;

    /// Removes a mailbox from the subscription list.
    async fn unsubscribe(&mut self, mailbox: &Mailbox) -> Result<()>;

    /// Stores a message in a mailbox, flagged `\Seen`.
    async fn append(&mut self, mailbox: &Mailbox, message: &[u8]) -> Result<()>;

    /// Logs out.
    async fn logout(&mut self) -> Result<()>;
}

#[async_trait]
impl ImapSession for Session {
    async fn select(&mut self, mailbox: &Mailbox) -> Result<()> {
        Self::select(self, mailbox).await?;
        Ok(())
    }

    async fn search(&mut self, key: &SearchKey) -> Result<Vec<Uid>> {
        let mut uids = self.uid_search(key).await?;
        uids.sort_unstable();
        Ok(uids)
    }

    async fn fetch_summaries(&mut self, uids: &UidSet) -> Result<Vec<FetchedMessage>> {
        let attributes = vec![
            FetchAttribute::Uid,
            FetchAttribute::Flags,
            FetchAttribute::Rfc822Size,
            FetchAttribute::InternalDate,
            FetchAttribute::header(),
        ];
        Ok(self.uid_fetch(uids, attributes).await?)
    }

    async fn fetch_messages(&mut self, uids: &UidSet) -> Result<Vec<FetchedMessage>> {
        let attributes = vec![
            FetchAttribute::Uid,
            FetchAttribute::Flags,
            FetchAttribute::Rfc822Size,
            FetchAttribute::InternalDate,
            FetchAttribute::full(),
        ];
        Ok(self.uid_fetch(uids, attributes).await?)
    }

    async fn store(&mut self, uids: &UidSet, action: StoreAction) -> Result<()> {
        Ok(self.uid_store(uids, action).await?)
    }

    async fn expunge(&mut self) -> Result<()> {
        Self::expunge(self).await?;
        Ok(())
    }

    async fn message_count(&mut self) -> Result<u32> {
        Ok(Self::message_count(self).await?)
    }

    async fn list(&mut self, pattern: &str, subscribed_only: bool) -> Result<Vec<ListResponse>> {
        let listed = if subscribed_only {
            self.lsub("", pattern).await?
        } else {
            Self::list(self, "", pattern).await?
        };
        Ok(listed)
    }

    async fn create(&mut self, mailbox: &Mailbox) -> Result<()> {
        Ok(Self::create(self, mailbox).await?)
    }

    async fn delete(&mut self, mailbox: &Mailbox) -> Result<()> {
        Ok(Self::delete(self, mailbox).await?)
    }

    async fn rename(&mut self, from: &Mailbox, to: &Mailbox) -> Result<()> {
        Ok(Self::rename(self, from, to).await?)
    }

    async fn subscribe(&mut self, mailbox: &Mailbox) -> Result<()> {
        Ok(Self::subscribe(self, mailbox).await?)
    }

    async fn unsubscribe(&mut self, mailbox: &Mailbox) -> Result<()> {
        Ok(Self::unsubscribe(self, mailbox).await?)
    }

    async fn append(&mut self, mailbox: &Mailbox, message: &[u8]) -> Result<()> {
        Ok(Self::append(self, mailbox, &[Flag::Seen], message).await?)
    }

    async fn logout(&mut self) -> Result<()> {
        Ok(Self::logout(self).await?)
    }
}
