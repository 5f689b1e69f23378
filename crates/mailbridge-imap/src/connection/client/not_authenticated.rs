//! Greeting, STARTTLS and LOGIN.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info};

use super::Client;
use super::states::{Authenticated, NotAuthenticated};
use crate::command::{Command, TagGenerator};
use crate::connection::framed::FramedStream;
use crate::connection::stream::ImapStream;
use crate::parser::{Response, UntaggedResponse};
use crate::{Error, Result};

impl<S> Client<S, NotAuthenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Reads the greeting from a freshly connected stream.
    ///
    /// `timeout` bounds the greeting and every later command.
    pub async fn from_stream(stream: S, timeout: Duration) -> Result<Self> {
        let mut framed = FramedStream::new(stream);
        let greeting = tokio::time::timeout(timeout, framed.read_parsed())
            .await
            .map_err(|_| Error::Timeout(timeout))??;

        let code = match greeting {
            Response::Untagged(
                UntaggedResponse::Ok { code, .. } | UntaggedResponse::PreAuth { code, .. },
            ) => code,
            Response::Untagged(UntaggedResponse::Bye { text, .. }) => {
                return Err(Error::Bye(text));
            }
            other => {
                return Err(Error::Protocol(format!("unexpected greeting: {other:?}")));
            }
        };

        let mut client = Self {
            stream: framed,
            tags: TagGenerator::default(),
            capabilities: Vec::new(),
            timeout,
            state: NotAuthenticated,
        };
        if !client.absorb_capability_code(code.as_ref()) {
            client.capability().await?;
        }
        Ok(client)
    }

    /// Logs in with LOGIN.
    pub async fn login(
        mut self,
        username: &str,
        password: &str,
    ) -> Result<Client<S, Authenticated>> {
        if self.has_capability("LOGINDISABLED") {
            return Err(Error::InvalidState(
                "server disabled LOGIN on this connection".to_string(),
            ));
        }

        let completion = self
            .run(&Command::Login {
                username: username.to_string(),
                password: password.to_string(),
            })
            .await?;

        // Capabilities often change after login; prefer what the server sent.
        let refreshed = self.absorb_capability_code(completion.code.as_ref());
        let untagged = completion.into_result()?;
        let mut refreshed_untagged = false;
        for response in untagged {
            if let UntaggedResponse::Capability(caps) = response {
                self.capabilities = caps;
                refreshed_untagged = true;
            }
        }

        info!(user = username, "IMAP login succeeded");
        let mut client = self.into_state(Authenticated);
        if !refreshed && !refreshed_untagged {
            client.capability().await?;
        }
        Ok(client)
    }
}

impl Client<ImapStream, NotAuthenticated> {
    /// Negotiates STARTTLS and returns a client on the encrypted stream.
    pub async fn starttls(mut self, host: &str, accept_invalid_certs: bool) -> Result<Self> {
        self.execute(&Command::StartTls).await?;
        debug!(host, "upgrading connection to TLS");

        let stream = self
            .stream
            .into_inner()
            .upgrade_to_tls(host, accept_invalid_certs)
            .await?;
        let mut client = Self {
            stream: FramedStream::new(stream),
            tags: self.tags,
            capabilities: Vec::new(),
            timeout: self.timeout,
            state: NotAuthenticated,
        };
        // Pre-TLS capabilities must be discarded.
        client.capability().await?;
        Ok(client)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn test_greeting_with_capabilities_and_login() {
        let mock = Builder::new()
            .read(b"* OK [CAPABILITY IMAP4rev1 AUTH=PLAIN] ready\r\n")
            .write(b"A0001 LOGIN alice \"p w\"\r\n")
            .read(b"A0001 OK [CAPABILITY IMAP4rev1 UNSELECT] logged in\r\n")
            .build();
        let client = Client::<_, NotAuthenticated>::from_stream(mock, TIMEOUT).await.unwrap();
        assert!(client.has_capability("auth=plain"));

        let client = client.login("alice", "p w").await.unwrap();
        assert!(client.has_capability("UNSELECT"));
        assert!(!client.has_capability("AUTH=PLAIN"));
    }

    #[tokio::test]
    async fn test_greeting_without_capabilities_queries_them() {
        let mock = Builder::new()
            .read(b"* OK hello\r\n")
            .write(b"A0001 CAPABILITY\r\n")
            .read(b"* CAPABILITY IMAP4rev1 STARTTLS\r\n")
            .read(b"A0001 OK done\r\n")
            .build();
        let client = Client::<_, NotAuthenticated>::from_stream(mock, TIMEOUT).await.unwrap();
        assert!(client.has_capability("STARTTLS"));
    }

    #[tokio::test]
    async fn test_bye_greeting() {
        let mock = Builder::new().read(b"* BYE too many connections\r\n").build();
        let err = Client::<_, NotAuthenticated>::from_stream(mock, TIMEOUT).await.unwrap_err();
        assert!(matches!(err, Error::Bye(text) if text == "too many connections"));
    }

    #[tokio::test]
    async fn test_login_rejected() {
        let mock = Builder::new()
            .read(b"* OK [CAPABILITY IMAP4rev1] ready\r\n")
            .write(b"A0001 LOGIN bob secret\r\n")
            .read(b"A0001 NO [AUTHENTICATIONFAILED] invalid credentials\r\n")
            .build();
        let client = Client::<_, NotAuthenticated>::from_stream(mock, TIMEOUT).await.unwrap();
        let err = client.login("bob", "secret").await.unwrap_err();
        assert!(matches!(err, Error::No(_)));
    }

    #[tokio::test]
    async fn test_login_disabled() {
        let mock = Builder::new()
            .read(b"* OK [CAPABILITY IMAP4rev1 LOGINDISABLED] ready\r\n")
            .build();
        let client = Client::<_, NotAuthenticated>::from_stream(mock, TIMEOUT).await.unwrap();
        assert!(matches!(
            client.login("bob", "secret").await,
            Err(Error::InvalidState(_))
        ));
    }
}
