//! Mailbox management and selection.

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use super::Client;
use super::states::{Authenticated, LoggedIn, Selected};
use crate::command::{Command, append_prefix};
use crate::parser::{Response, UntaggedResponse};
use crate::types::{Flag, ListResponse, Mailbox, MailboxStatus, ResponseCode, Status};
use crate::{Error, Result};

/// A failed transition hands the client back in its previous state.
pub type Transition<Next, Prev> = std::result::Result<Next, (Error, Prev)>;

impl<S> Client<S, Authenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Opens `mailbox` read-write.
    pub async fn select(self, mailbox: &Mailbox) -> Transition<Client<S, Selected>, Self> {
        self.open(mailbox, false).await
    }

    /// Opens `mailbox` read-only.
    pub async fn examine(self, mailbox: &Mailbox) -> Transition<Client<S, Selected>, Self> {
        self.open(mailbox, true).await
    }

    async fn open(
        mut self,
        mailbox: &Mailbox,
        read_only: bool,
    ) -> Transition<Client<S, Selected>, Self> {
        let command = if read_only {
            Command::Examine {
                mailbox: mailbox.clone(),
            }
        } else {
            Command::Select {
                mailbox: mailbox.clone(),
            }
        };
        match self.run(&command).await {
            Ok(completion) if completion.status == Status::Ok => {
                let mut status = mailbox_status(&completion.untagged);
                status.read_only =
                    read_only || matches!(completion.code, Some(ResponseCode::ReadOnly));
                debug!(mailbox = %mailbox, exists = status.exists, "mailbox opened");
                Ok(self.into_state(Selected {
                    mailbox: mailbox.clone(),
                    status,
                }))
            }
            Ok(completion) => match completion.into_result() {
                Err(e) => Err((e, self)),
                Ok(_) => Err((Error::Protocol("unexpected SELECT status".to_string()), self)),
            },
            Err(e) => Err((e, self)),
        }
    }

    /// Appends a complete RFC 5322 message to `mailbox`.
    pub async fn append(&mut self, mailbox: &Mailbox, flags: &[Flag], message: &[u8]) -> Result<()> {
        append(self, mailbox, flags, message).await.map(drop)
    }
}

/// Commands valid whether or not a mailbox is selected.
impl<S, State> Client<S, State>
where
    S: AsyncRead + AsyncWrite + Unpin,
    State: LoggedIn,
{
    /// Lists mailboxes matching `pattern` under `reference`.
    pub async fn list(&mut self, reference: &str, pattern: &str) -> Result<Vec<ListResponse>> {
        let untagged = self
            .execute(&Command::List {
                reference: reference.to_string(),
                pattern: pattern.to_string(),
            })
            .await?;
        Ok(untagged
            .into_iter()
            .filter_map(|r| match r {
                UntaggedResponse::List(entry) => Some(entry),
                _ => None,
            })
            .collect())
    }

    /// Lists subscribed mailboxes.
    pub async fn lsub(&mut self, reference: &str, pattern: &str) -> Result<Vec<ListResponse>> {
        let untagged = self
            .execute(&Command::Lsub {
                reference: reference.to_string(),
                pattern: pattern.to_string(),
            })
            .await?;
        Ok(untagged
            .into_iter()
            .filter_map(|r| match r {
                UntaggedResponse::Lsub(entry) => Some(entry),
                _ => None,
            })
            .collect())
    }

    /// Creates a mailbox.
    pub async fn create(&mut self, mailbox: &Mailbox) -> Result<()> {
        self.execute(&Command::Create {
            mailbox: mailbox.clone(),
        })
        .await
        .map(drop)
    }

    /// Deletes a mailbox.
    pub async fn delete(&mut self, mailbox: &Mailbox) -> Result<()> {
        self.execute(&Command::Delete {
            mailbox: mailbox.clone(),
        })
        .await
        .map(drop)
    }

    /// Renames a mailbox.
    pub async fn rename(&mut self, from: &Mailbox, to: &Mailbox) -> Result<()> {
        self.execute(&Command::Rename {
            from: from.clone(),
            to: to.clone(),
        })
        .await
        .map(drop)
    }

    /// Subscribes to a mailbox.
    pub async fn subscribe(&mut self, mailbox: &Mailbox) -> Result<()> {
        self.execute(&Command::Subscribe {
            mailbox: mailbox.clone(),
        })
        .await
        .map(drop)
    }

    /// Unsubscribes from a mailbox.
    pub async fn unsubscribe(&mut self, mailbox: &Mailbox) -> Result<()> {
        self.execute(&Command::Unsubscribe {
            mailbox: mailbox.clone(),
        })
        .await
        .map(drop)
    }
}

/// Shared APPEND exchange; returns the untagged data seen on the way.
pub(super) async fn append<S, State>(
    client: &mut Client<S, State>,
    mailbox: &Mailbox,
    flags: &[Flag],
    message: &[u8],
) -> Result<Vec<UntaggedResponse>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let tag = client.tags.next();
    debug!(%tag, mailbox = %mailbox, size = message.len(), "C: APPEND");
    let prefix = append_prefix(&tag, mailbox, flags, message.len());
    let timeout = client.timeout;
    let stream = &mut client.stream;

    let exchange = async {
        stream.write_command(&prefix).await?;
        match stream.read_parsed().await? {
            Response::Continuation { .. } => {}
            Response::Tagged { status, text, .. } => {
                return Err(match status {
                    Status::No => Error::No(text),
                    Status::Bad => Error::Bad(text),
                    _ => Error::Protocol(format!("APPEND refused: {text}")),
                });
            }
            Response::Untagged(other) => {
                return Err(Error::Protocol(format!(
                    "expected continuation for APPEND, got {other:?}"
                )));
            }
        }
        stream.write_raw(message).await?;
        stream.write_raw(b"\r\n").await?;
        stream.read_until_tagged(&tag).await
    };

    tokio::time::timeout(timeout, exchange)
        .await
        .map_err(|_| Error::Timeout(timeout))??
        .into_result()
}

/// Collects the SELECT/EXAMINE data.
pub(super) fn mailbox_status(untagged: &[UntaggedResponse]) -> MailboxStatus {
    let mut status = MailboxStatus::default();
    for response in untagged {
        match response {
            UntaggedResponse::Exists(n) => status.exists = *n,
            UntaggedResponse::Recent(n) => status.recent = *n,
            UntaggedResponse::Flags(flags) => status.flags = flags.clone(),
            UntaggedResponse::Ok {
                code: Some(code), ..
            } => match code {
                ResponseCode::UidValidity(v) => status.uid_validity = Some(*v),
                ResponseCode::UidNext(v) => status.uid_next = Some(*v),
                ResponseCode::Unseen(v) => status.unseen = Some(*v),
                _ => {}
            },
            _ => {}
        }
    }
    status
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use std::time::Duration;

    use tokio_test::io::{Builder, Mock};

    use super::*;
    use crate::connection::client::NotAuthenticated;

    pub(crate) fn handshake() -> Builder {
        let mut builder = Builder::new();
        builder
            .read(b"* OK [CAPABILITY IMAP4rev1] ready\r\n")
            .write(b"A0001 LOGIN u p\r\n")
            .read(b"A0001 OK [CAPABILITY IMAP4rev1 UNSELECT] ok\r\n");
        builder
    }

    pub(crate) async fn logged_in(builder: &mut Builder) -> Client<Mock, Authenticated> {
        Client::<_, NotAuthenticated>::from_stream(builder.build(), Duration::from_secs(5))
            .await
            .unwrap()
            .login("u", "p")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_select_collects_status() {
        let mut builder = handshake();
        builder
            .write(b"A0002 SELECT INBOX\r\n")
            .read(b"* 18 EXISTS\r\n")
            .read(b"* 2 RECENT\r\n")
            .read(b"* FLAGS (\\Seen \\Deleted)\r\n")
            .read(b"* OK [UIDVALIDITY 3857529045] ok\r\n")
            .read(b"* OK [UIDNEXT 4392] ok\r\n")
            .read(b"A0002 OK [READ-WRITE] SELECT completed\r\n");
        let client = logged_in(&mut builder).await;
        let selected = client.select(&Mailbox::inbox()).await.unwrap();
        let status = selected.state.status();
        assert_eq!(status.exists, 18);
        assert_eq!(status.recent, 2);
        assert_eq!(status.uid_validity, Some(3_857_529_045));
        assert_eq!(status.uid_next, Some(4392));
        assert!(!status.read_only);
    }

    #[tokio::test]
    async fn test_failed_select_returns_client() {
        let mut builder = handshake();
        builder
            .write(b"A0002 SELECT Nope\r\n")
            .read(b"A0002 NO no such mailbox\r\n")
            .write(b"A0003 NOOP\r\n")
            .read(b"A0003 OK\r\n");
        let client = logged_in(&mut builder).await;
        let (err, mut client) = client.select(&Mailbox::new("Nope")).await.unwrap_err();
        assert!(matches!(err, Error::No(_)));
        client.noop().await.unwrap();
    }

    #[tokio::test]
    async fn test_list_decodes_names() {
        let mut builder = handshake();
        builder
            .write(b"A0002 LIST \"\" *\r\n")
            .read(b"* LIST (\\HasNoChildren) \"/\" INBOX\r\n")
            .read(b"* LIST (\\HasChildren) \"/\" \"Caf&AOk-\"\r\n")
            .read(b"A0002 OK LIST completed\r\n");
        let mut client = logged_in(&mut builder).await;
        let entries = client.list("", "*").await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].mailbox.as_str(), "Café");
    }

    #[tokio::test]
    async fn test_append_waits_for_continuation() {
        let mut builder = handshake();
        builder
            .write(b"A0002 APPEND Sent (\\Seen) {5}\r\n")
            .read(b"+ go ahead\r\n")
            .write(b"hello")
            .write(b"\r\n")
            .read(b"A0002 OK APPEND completed\r\n");
        let mut client = logged_in(&mut builder).await;
        client
            .append(&Mailbox::new("Sent"), &[Flag::Seen], b"hello")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_append_refused() {
        let mut builder = handshake();
        builder
            .write(b"A0002 APPEND Sent {5}\r\n")
            .read(b"A0002 NO [TRYCREATE] no mailbox\r\n");
        let mut client = logged_in(&mut builder).await;
        let err = client
            .append(&Mailbox::new("Sent"), &[], b"hello")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::No(_)));
    }
}
