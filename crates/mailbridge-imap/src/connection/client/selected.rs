//! Message operations on the selected mailbox.

use chrono::{DateTime, FixedOffset};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use super::authenticated::{Transition, append, mailbox_status};
use super::states::{Authenticated, Selected};
use super::Client;
use crate::command::{Command, FetchAttribute, SearchKey, StoreAction};
use crate::parser::{FetchItem, UntaggedResponse};
use crate::types::{Flag, Flags, Mailbox, ResponseCode, SeqNum, Status, Uid, UidSet};
use crate::{Error, Result};

/// The items of one FETCH response, merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedMessage {
    /// Sequence number at fetch time.
    pub seq: SeqNum,
    /// UID, always present for UID FETCH.
    pub uid: Option<Uid>,
    /// Flags.
    pub flags: Flags,
    /// RFC822.SIZE.
    pub size: Option<u32>,
    /// INTERNALDATE.
    pub internal_date: Option<DateTime<FixedOffset>>,
    /// `BODY[HEADER]` data.
    pub header: Option<Vec<u8>>,
    /// `BODY[]` data.
    pub body: Option<Vec<u8>>,
}

impl FetchedMessage {
    fn new(seq: SeqNum) -> Self {
        Self {
            seq,
            uid: None,
            flags: Flags::new(),
            size: None,
            internal_date: None,
            header: None,
            body: None,
        }
    }

    fn merge(&mut self, items: Vec<FetchItem>) {
        for item in items {
            match item {
                FetchItem::Uid(uid) => self.uid = Some(uid),
                FetchItem::Flags(flags) => self.flags = flags,
                FetchItem::Rfc822Size(size) => self.size = Some(size),
                FetchItem::InternalDate(date) => self.internal_date = date,
                FetchItem::Body { section, data } => match section.as_deref() {
                    None | Some("") => self.body = data,
                    Some("HEADER") => self.header = data,
                    Some(other) => debug!(section = other, "ignoring unrequested body section"),
                },
            }
        }
    }
}

impl<S> Client<S, Selected>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// The selected mailbox.
    #[must_use]
    pub const fn mailbox(&self) -> &Mailbox {
        self.state.mailbox()
    }

    /// Message count as tracked from EXISTS and EXPUNGE responses.
    #[must_use]
    pub const fn exists(&self) -> u32 {
        self.state.status.exists
    }

    /// Full status of the selected mailbox.
    #[must_use]
    pub const fn status(&self) -> &crate::types::MailboxStatus {
        self.state.status()
    }

    /// Runs a command and applies the mailbox updates it carried.
    async fn execute_tracked(&mut self, command: &Command) -> Result<Vec<UntaggedResponse>> {
        let completion = self.run(command).await?;
        self.state.absorb(&completion.untagged);
        completion.into_result()
    }

    /// Polls the server and returns the refreshed message count.
    pub async fn refresh(&mut self) -> Result<u32> {
        self.execute_tracked(&Command::Noop).await?;
        Ok(self.exists())
    }

    /// Switches to another mailbox without expunging the current one.
    ///
    /// On failure the server has left the selected state, so the client is
    /// returned authenticated.
    pub async fn select(
        mut self,
        mailbox: &Mailbox,
    ) -> Transition<Self, Client<S, Authenticated>> {
        match self
            .run(&Command::Select {
                mailbox: mailbox.clone(),
            })
            .await
        {
            Ok(completion) if completion.status == Status::Ok => {
                let mut status = mailbox_status(&completion.untagged);
                status.read_only = matches!(completion.code, Some(ResponseCode::ReadOnly));
                debug!(mailbox = %mailbox, exists = status.exists, "mailbox switched");
                self.state = Selected {
                    mailbox: mailbox.clone(),
                    status,
                };
                Ok(self)
            }
            Ok(completion) => {
                let err = completion
                    .into_result()
                    .err()
                    .unwrap_or_else(|| Error::Protocol("unexpected SELECT status".to_string()));
                Err((err, self.into_state(Authenticated)))
            }
            Err(e) => Err((e, self.into_state(Authenticated))),
        }
    }

    /// Leaves the mailbox without expunging. Needs the UNSELECT extension.
    pub async fn unselect(mut self) -> Transition<Client<S, Authenticated>, Self> {
        if !self.has_capability("UNSELECT") {
            return Err((
                Error::InvalidState("server lacks UNSELECT".to_string()),
                self,
            ));
        }
        match self.execute(&Command::Unselect).await {
            Ok(_) => Ok(self.into_state(Authenticated)),
            Err(e) => Err((e, self)),
        }
    }

    /// Returns the UIDs matching `criteria`, ascending.
    pub async fn uid_search(&mut self, criteria: &SearchKey) -> Result<Vec<Uid>> {
        let untagged = self
            .execute_tracked(&Command::UidSearch {
                criteria: criteria.clone(),
            })
            .await?;
        let mut uids: Vec<Uid> = untagged
            .into_iter()
            .filter_map(|r| match r {
                UntaggedResponse::Search(numbers) => Some(numbers),
                _ => None,
            })
            .flatten()
            .filter_map(Uid::new)
            .collect();
        uids.sort_unstable();
        uids.dedup();
        Ok(uids)
    }

    /// Fetches `attributes` for `uids`, in server order.
    pub async fn uid_fetch(
        &mut self,
        uids: &UidSet,
        attributes: Vec<FetchAttribute>,
    ) -> Result<Vec<FetchedMessage>> {
        if uids.is_empty() {
            return Ok(Vec::new());
        }
        let untagged = self
            .execute_tracked(&Command::UidFetch {
                uids: uids.clone(),
                attributes,
            })
            .await?;

        let mut messages: Vec<FetchedMessage> = Vec::new();
        for response in untagged {
            if let UntaggedResponse::Fetch { seq, items } = response {
                // Servers may split one message's items over several responses.
                if let Some(existing) = messages.iter_mut().find(|m| m.seq == seq) {
                    existing.merge(items);
                } else {
                    let mut message = FetchedMessage::new(seq);
                    message.merge(items);
                    messages.push(message);
                }
            }
        }
        // Unsolicited FLAGS updates for other messages carry no UID.
        messages.retain(|m| m.uid.is_some());
        Ok(messages)
    }

    /// Changes flags on `uids`.
    pub async fn uid_store(&mut self, uids: &UidSet, action: StoreAction) -> Result<()> {
        if uids.is_empty() {
            return Ok(());
        }
        self.execute_tracked(&Command::UidStore {
            uids: uids.clone(),
            action,
            silent: true,
        })
        .await
        .map(drop)
    }

    /// Permanently removes messages flagged `\Deleted`. Returns the
    /// expunged sequence numbers.
    pub async fn expunge(&mut self) -> Result<Vec<SeqNum>> {
        let untagged = self.execute_tracked(&Command::Expunge).await?;
        Ok(untagged
            .into_iter()
            .filter_map(|r| match r {
                UntaggedResponse::Expunge(seq) => Some(seq),
                _ => None,
            })
            .collect())
    }

    /// Appends a message to any mailbox.
    pub async fn append(&mut self, mailbox: &Mailbox, flags: &[Flag], message: &[u8]) -> Result<()> {
        let untagged = append(self, mailbox, flags, message).await?;
        self.state.absorb(&untagged);
        Ok(())
    }
}
