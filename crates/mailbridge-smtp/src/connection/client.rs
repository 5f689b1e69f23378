//! Type-state SMTP client.

use std::marker::PhantomData;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, trace};

use super::{ServerInfo, SmtpStream};
use crate::command::{Command, encode_data};
use crate::error::{Error, Result};
use crate::parser::{is_last_reply_line, parse_reply};
use crate::types::{Address, AuthMechanism, Envelope, Extension, Reply, ReplyCode};

/// Type-state marker: greeted, not authenticated.
#[derive(Debug)]
pub struct Connected;

/// Type-state marker: authenticated.
#[derive(Debug)]
pub struct Authenticated;

/// Type-state marker: MAIL FROM accepted.
#[derive(Debug)]
pub struct MailTransaction;

/// Type-state marker: at least one RCPT TO accepted.
#[derive(Debug)]
pub struct RecipientAdded;

/// Type-state marker: DATA accepted, message expected.
#[derive(Debug)]
pub struct Data;

/// States in which a new mail transaction may start.
pub trait Ready {}

impl Ready for Connected {}
impl Ready for Authenticated {}

/// SMTP client with type-state.
pub struct Client<S, State> {
    reader: BufReader<S>,
    server_info: ServerInfo,
    hello_name: String,
    timeout: Duration,
    _state: PhantomData<State>,
}

impl<S, State> std::fmt::Debug for Client<S, State> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("server_info", &self.server_info)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl<S> Client<S, Connected>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Reads the server greeting.
    ///
    /// # Errors
    ///
    /// Returns an error if the greeting is not 2xx or does not arrive in time.
    pub async fn from_stream(stream: S, timeout: Duration) -> Result<Self> {
        let mut client = Self {
            reader: BufReader::new(stream),
            server_info: ServerInfo::default(),
            hello_name: String::new(),
            timeout,
            _state: PhantomData,
        };
        let greeting = tokio::time::timeout(timeout, client.read_reply())
            .await
            .map_err(|_| Error::Timeout(timeout))??
            .expect_success()?;
        client.server_info.hostname = greeting
            .message
            .first()
            .and_then(|line| line.split_whitespace().next())
            .unwrap_or("unknown")
            .to_string();
        debug!(server = %client.server_info.hostname, "SMTP server ready");
        Ok(client)
    }

    /// Sends EHLO and records the advertised extensions. Falls back to HELO
    /// when the server rejects EHLO permanently.
    ///
    /// # Errors
    ///
    /// Returns an error if both greetings are rejected.
    pub async fn ehlo(mut self, client_hostname: &str) -> Result<Self> {
        self.hello_name = client_hostname.to_string();
        let reply = self
            .command(&Command::Ehlo {
                hostname: client_hostname.to_string(),
            })
            .await?;
        if reply.is_success() {
            self.server_info.extensions = reply.message.iter().skip(1).map(|l| Extension::parse(l)).collect();
        } else if reply.code.is_permanent() {
            debug!(code = %reply.code, "EHLO rejected, falling back to HELO");
            self.command(&Command::Helo {
                hostname: client_hostname.to_string(),
            })
            .await?
            .expect_success()?;
            self.server_info.extensions.clear();
        } else {
            return Err(reply.into_error());
        }
        Ok(self)
    }

    /// Authenticates with the best advertised mechanism: PLAIN, then LOGIN.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotSupported`] if neither mechanism is advertised and
    /// [`Error::Auth`] if the credentials are rejected.
    pub async fn login(self, username: &str, password: &str) -> Result<Client<S, Authenticated>> {
        let mechanisms = self.server_info.auth_mechanisms();
        if mechanisms.contains(&AuthMechanism::Plain) {
            self.auth_plain(username, password).await
        } else if mechanisms.contains(&AuthMechanism::Login) {
            self.auth_login(username, password).await
        } else {
            Err(Error::NotSupported("AUTH PLAIN or AUTH LOGIN".into()))
        }
    }

    /// Authenticates with AUTH PLAIN and an initial response.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Auth`] if the server rejects the credentials.
    pub async fn auth_plain(mut self, username: &str, password: &str) -> Result<Client<S, Authenticated>> {
        let encoded = STANDARD.encode(format!("\0{username}\0{password}"));
        let reply = self
            .command(&Command::Auth {
                mechanism: AuthMechanism::Plain,
                initial_response: Some(encoded),
            })
            .await?;
        self.finish_auth(&reply, username)?;
        Ok(self.into_state())
    }

    /// Authenticates with AUTH LOGIN, answering the two 334 challenges.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Auth`] if the exchange fails.
    pub async fn auth_login(mut self, username: &str, password: &str) -> Result<Client<S, Authenticated>> {
        let mut reply = self
            .command(&Command::Auth {
                mechanism: AuthMechanism::Login,
                initial_response: None,
            })
            .await?;
        for secret in [username, password] {
            if reply.code != ReplyCode::AUTH_CONTINUE {
                return Err(Error::Auth(format!("{} {}", reply.code, reply.message_text())));
            }
            reply = self.command(&Command::AuthResponse(STANDARD.encode(secret))).await?;
        }
        self.finish_auth(&reply, username)?;
        Ok(self.into_state())
    }

    fn finish_auth(&self, reply: &Reply, username: &str) -> Result<()> {
        if reply.is_success() {
            info!(user = username, server = %self.server_info.hostname, "SMTP authentication succeeded");
            Ok(())
        } else {
            Err(Error::Auth(format!("{} {}", reply.code, reply.message_text())))
        }
    }
}

impl Client<SmtpStream, Connected> {
    /// Upgrades the connection with STARTTLS and repeats EHLO over TLS.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotSupported`] if STARTTLS is not advertised, or an
    /// error if the handshake fails.
    pub async fn starttls(mut self, hostname: &str, accept_invalid_certs: bool) -> Result<Self> {
        if !self.server_info.supports_starttls() {
            return Err(Error::NotSupported("STARTTLS".into()));
        }
        self.command(&Command::StartTls)
            .await?
            .expect_code(ReplyCode::SERVICE_READY)?;
        debug!(hostname, "upgrading SMTP connection to TLS");

        let stream = self
            .reader
            .into_inner()
            .upgrade_to_tls(hostname, accept_invalid_certs)
            .await?;
        let client = Self {
            reader: BufReader::new(stream),
            server_info: ServerInfo {
                hostname: self.server_info.hostname,
                extensions: std::collections::HashSet::new(),
            },
            hello_name: String::new(),
            timeout: self.timeout,
            _state: PhantomData,
        };
        client.ehlo(&self.hello_name).await
    }
}

impl<State> Client<SmtpStream, State> {
    /// Returns true once the connection is encrypted.
    #[must_use]
    pub fn is_tls(&self) -> bool {
        self.reader.get_ref().is_tls()
    }
}

impl<S, State> Client<S, State>
where
    S: AsyncRead + AsyncWrite + Unpin,
    State: Ready,
{
    /// Starts a mail transaction. The SIZE parameter is only sent when the
    /// server advertises the extension.
    ///
    /// # Errors
    ///
    /// Returns an error if MAIL FROM is rejected.
    pub async fn mail_from(mut self, from: &Address, size: Option<usize>) -> Result<Client<S, MailTransaction>> {
        let size = size.filter(|_| self.server_info.supports_size());
        self.command(&Command::MailFrom {
            from: from.clone(),
            size,
        })
        .await?
        .expect_success()?;
        Ok(self.into_state())
    }

    /// Runs a complete transaction: MAIL FROM, one RCPT TO per envelope
    /// recipient, DATA and the message.
    ///
    /// # Errors
    ///
    /// Returns the first rejected step's error. The connection is consumed.
    pub async fn send(self, envelope: &Envelope, message: &[u8]) -> Result<Self> {
        let mut recipients = envelope.recipients().iter();
        let first = recipients
            .next()
            .ok_or_else(|| Error::InvalidAddress("envelope has no recipients".into()))?;
        let mut client = self
            .mail_from(envelope.from(), Some(message.len()))
            .await?
            .rcpt_to(first)
            .await?;
        for rcpt in recipients {
            client = client.rcpt_to(rcpt).await?;
        }
        let client = client.data().await?.send_message(message).await?;
        info!(
            from = %envelope.from(),
            recipients = envelope.recipients().len(),
            bytes = message.len(),
            "message accepted"
        );
        Ok(client.into_state())
    }

    /// NOOP.
    ///
    /// # Errors
    ///
    /// Returns an error if the server does not answer 2xx.
    pub async fn noop(&mut self) -> Result<()> {
        self.command(&Command::Noop).await?.expect_success()?;
        Ok(())
    }
}

impl<S> Client<S, MailTransaction>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Adds the first recipient.
    ///
    /// # Errors
    ///
    /// Returns an error if RCPT TO is rejected.
    pub async fn rcpt_to(mut self, to: &Address) -> Result<Client<S, RecipientAdded>> {
        self.command(&Command::RcptTo { to: to.clone() })
            .await?
            .expect_success()?;
        Ok(self.into_state())
    }

    /// Aborts the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if RSET fails.
    pub async fn reset(mut self) -> Result<Client<S, Connected>> {
        self.command(&Command::Rset).await?.expect_success()?;
        Ok(self.into_state())
    }
}

impl<S> Client<S, RecipientAdded>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Adds another recipient.
    ///
    /// # Errors
    ///
    /// Returns an error if RCPT TO is rejected.
    pub async fn rcpt_to(mut self, to: &Address) -> Result<Self> {
        self.command(&Command::RcptTo { to: to.clone() })
            .await?
            .expect_success()?;
        Ok(self)
    }

    /// Begins the message data.
    ///
    /// # Errors
    ///
    /// Returns an error unless the server answers 354.
    pub async fn data(mut self) -> Result<Client<S, Data>> {
        self.command(&Command::Data)
            .await?
            .expect_code(ReplyCode::START_DATA)?;
        Ok(self.into_state())
    }

    /// Aborts the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if RSET fails.
    pub async fn reset(mut self) -> Result<Client<S, Connected>> {
        self.command(&Command::Rset).await?.expect_success()?;
        Ok(self.into_state())
    }
}

impl<S> Client<S, Data>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Sends the RFC 5322 message and completes the transaction. Line
    /// endings are normalized to CRLF, leading dots are stuffed and the
    /// terminating `.` line is added.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the message.
    pub async fn send_message(mut self, message: &[u8]) -> Result<Client<S, Connected>> {
        let data = encode_data(message);
        let timeout = self.timeout;
        let reply = tokio::time::timeout(timeout, async {
            self.reader.get_mut().write_all(&data).await?;
            self.reader.get_mut().flush().await?;
            self.read_reply().await
        })
        .await
        .map_err(|_| Error::Timeout(timeout))??;
        reply.expect_success()?;
        Ok(self.into_state())
    }
}

impl<S, State> Client<S, State>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Server information from the greeting and EHLO.
    #[must_use]
    pub const fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    /// Sends QUIT and closes the connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the server answers with an error code.
    pub async fn quit(mut self) -> Result<()> {
        let reply = self.command(&Command::Quit).await?;
        if reply.code != ReplyCode::CLOSING && !reply.is_success() {
            return Err(reply.into_error());
        }
        debug!(server = %self.server_info.hostname, "SMTP session closed");
        Ok(())
    }

    async fn command(&mut self, command: &Command) -> Result<Reply> {
        debug!(command = %command.redacted(), "SMTP >");
        let timeout = self.timeout;
        tokio::time::timeout(timeout, async {
            self.reader.get_mut().write_all(&command.serialize()).await?;
            self.reader.get_mut().flush().await?;
            self.read_reply().await
        })
        .await
        .map_err(|_| Error::Timeout(timeout))?
    }

    async fn read_reply(&mut self) -> Result<Reply> {
        let mut lines = Vec::new();
        loop {
            let line = self.read_line().await?;
            if line.is_empty() {
                continue;
            }
            trace!(line = %line, "SMTP <");
            let last = is_last_reply_line(&line);
            lines.push(line);
            if last {
                break;
            }
        }
        parse_reply(&lines)
    }

    async fn read_line(&mut self) -> Result<String> {
        let mut buf = Vec::new();
        if self.reader.read_until(b'\n', &mut buf).await? == 0 {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "connection closed by server",
            )));
        }
        let line = buf
            .strip_suffix(b"\r\n")
            .or_else(|| buf.strip_suffix(b"\n"))
            .unwrap_or(&buf);
        Ok(String::from_utf8_lossy(line).into_owned())
    }

    fn into_state<T>(self) -> Client<S, T> {
        Client {
            reader: self.reader,
            server_info: self.server_info,
            hello_name: self.hello_name,
            timeout: self.timeout,
            _state: PhantomData,
        }
    }
}
