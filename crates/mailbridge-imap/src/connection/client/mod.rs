//! Type-state IMAP client.
//!
//! `Client<S, NotAuthenticated>` can only log in, `Client<S, Authenticated>`
//! manages mailboxes and `Client<S, Selected>` works on messages. Each
//! transition consumes the client.

#![allow(clippy::missing_errors_doc)]

mod authenticated;
mod not_authenticated;
mod selected;
mod states;

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

pub use self::authenticated::Transition;
pub use self::selected::FetchedMessage;
pub use self::states::{Authenticated, LoggedIn, NotAuthenticated, Selected};
use super::framed::{Completion, FramedStream};
use crate::command::{Command, TagGenerator};
use crate::parser::UntaggedResponse;
use crate::types::ResponseCode;
use crate::{Error, Result};

/// IMAP client in state `State`.
pub struct Client<S, State> {
    pub(crate) stream: FramedStream<S>,
    pub(crate) tags: TagGenerator,
    pub(crate) capabilities: Vec<String>,
    pub(crate) timeout: Duration,
    pub(crate) state: State,
}

impl<S, State: std::fmt::Debug> std::fmt::Debug for Client<S, State> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("capabilities", &self.capabilities)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<S, State> Client<S, State>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Capabilities as last reported by the server, upper-cased.
    #[must_use]
    pub fn capabilities(&self) -> &[String] {
        &self.capabilities
    }

    /// Returns true if the server advertised `name` (case-insensitive).
    #[must_use]
    pub fn has_capability(&self, name: &str) -> bool {
        self.capabilities.iter().any(|c| c.eq_ignore_ascii_case(name))
    }

    /// Sends NOOP and returns whatever the server pushed meanwhile.
    pub async fn noop(&mut self) -> Result<Vec<UntaggedResponse>> {
        self.execute(&Command::Noop).await
    }

    /// Refreshes the capability list.
    pub async fn capability(&mut self) -> Result<&[String]> {
        let untagged = self.execute(&Command::Capability).await?;
        for response in untagged {
            if let UntaggedResponse::Capability(caps) = response {
                self.capabilities = caps;
            }
        }
        Ok(&self.capabilities)
    }

    /// Sends LOGOUT and drops the connection.
    ///
    /// A server that closes the socket right after its BYE is not an error.
    pub async fn logout(mut self) -> Result<()> {
        match self.run(&Command::Logout).await {
            Ok(completion) => completion.into_result().map(|_| ()),
            Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Runs a command and fails unless it completes with OK.
    pub(crate) async fn execute(&mut self, command: &Command) -> Result<Vec<UntaggedResponse>> {
        self.run(command).await?.into_result()
    }

    /// Runs a command and returns its completion whatever the status.
    pub(crate) async fn run(&mut self, command: &Command) -> Result<Completion> {
        let tag = self.tags.next();
        debug!(command = %command.redacted(&tag), "C:");
        let bytes = command.serialize(&tag);
        let timeout = self.timeout;
        let stream = &mut self.stream;
        let exchange = async {
            stream.write_command(&bytes).await?;
            stream.read_until_tagged(&tag).await
        };
        tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| Error::Timeout(timeout))?
    }

    /// Stores capabilities carried in a `[CAPABILITY ...]` response code.
    pub(crate) fn absorb_capability_code(&mut self, code: Option<&ResponseCode>) -> bool {
        if let Some(ResponseCode::Capability(caps)) = code {
            self.capabilities.clone_from(caps);
            true
        } else {
            false
        }
    }

    pub(crate) fn into_state<T>(self, state: T) -> Client<S, T> {
        Client {
            stream: self.stream,
            tags: self.tags,
            capabilities: self.capabilities,
            timeout: self.timeout,
            state,
        }
    }
}
