//! Type-state POP3 client.

use std::marker::PhantomData;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, trace};

use super::stream::Pop3Stream;
use crate::command::Command;
use crate::error::{Error, Result};
use crate::parser::{parse_list_line, parse_stat, parse_status, parse_uidl_line, unstuff};
use crate::types::{ListEntry, Stat, UidlEntry};

/// Type-state marker: greeting read, not logged in.
#[derive(Debug)]
pub struct Authorization;

/// Type-state marker: logged in, maildrop locked.
#[derive(Debug)]
pub struct Transaction;

/// POP3 client with type-state.
pub struct Client<S, State> {
    reader: BufReader<S>,
    timeout: Duration,
    capabilities: Vec<String>,
    _state: PhantomData<State>,
}

impl<S, State> std::fmt::Debug for Client<S, State> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("capabilities", &self.capabilities)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl<S> Client<S, Authorization>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Reads the greeting.
    ///
    /// # Errors
    ///
    /// Returns an error if the server does not greet with `+OK`.
    pub async fn from_stream(stream: S, timeout: Duration) -> Result<Self> {
        let mut client = Self {
            reader: BufReader::new(stream),
            timeout,
            capabilities: Vec::new(),
            _state: PhantomData,
        };
        let greeting = tokio::time::timeout(timeout, client.read_line())
            .await
            .map_err(|_| Error::Timeout(timeout))??;
        let text = parse_status(&greeting)?;
        debug!(greeting = text, "POP3 server ready");
        Ok(client)
    }

    /// Queries CAPA. Servers without CAPA yield an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure.
    pub async fn capa(&mut self) -> Result<&[String]> {
        match self.exchange(&Command::Capa).await {
            Ok((_, block)) => {
                self.capabilities = String::from_utf8_lossy(&block)
                    .lines()
                    .map(|line| line.trim().to_ascii_uppercase())
                    .filter(|line| !line.is_empty())
                    .collect();
            }
            Err(Error::Server(_)) => self.capabilities.clear(),
            Err(e) => return Err(e),
        }
        Ok(&self.capabilities)
    }

    /// Logs in with USER and PASS.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Server`] if either command is rejected.
    pub async fn login(mut self, username: &str, password: &str) -> Result<Client<S, Transaction>> {
        self.exchange(&Command::User(username.to_string())).await?;
        self.exchange(&Command::Pass(password.to_string())).await?;
        info!(user = username, "POP3 login succeeded");
        Ok(Client {
            reader: self.reader,
            timeout: self.timeout,
            capabilities: self.capabilities,
            _state: PhantomData,
        })
    }
}

impl Client<Pop3Stream, Authorization> {
    /// Negotiates STLS and re-reads capabilities over TLS.
    ///
    /// # Errors
    ///
    /// Returns an error if STLS is refused or the handshake fails.
    pub async fn stls(mut self, hostname: &str, accept_invalid_certs: bool) -> Result<Self> {
        self.exchange(&Command::Stls).await?;
        debug!(hostname, "upgrading POP3 connection to TLS");
        let stream = self
            .reader
            .into_inner()
            .upgrade_to_tls(hostname, accept_invalid_certs)
            .await?;
        let mut client = Self {
            reader: BufReader::new(stream),
            timeout: self.timeout,
            capabilities: Vec::new(),
            _state: PhantomData,
        };
        client.capa().await?;
        Ok(client)
    }
}

impl<S> Client<S, Transaction>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Message count and maildrop size.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn stat(&mut self) -> Result<Stat> {
        let (text, _) = self.exchange(&Command::Stat).await?;
        parse_stat(&text)
    }

    /// Sizes of all messages.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn list(&mut self) -> Result<Vec<ListEntry>> {
        let (_, block) = self.exchange(&Command::List(None)).await?;
        String::from_utf8_lossy(&block)
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(parse_list_line)
            .collect()
    }

    /// Unique ids of all messages.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails or UIDL is unsupported.
    pub async fn uidl(&mut self) -> Result<Vec<UidlEntry>> {
        let (_, block) = match self.exchange(&Command::Uidl(None)).await {
            Err(Error::Server(text)) => {
                return Err(Error::NotSupported(format!("UIDL ({text})")));
            }
            other => other?,
        };
        String::from_utf8_lossy(&block)
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(parse_uidl_line)
            .collect()
    }

    /// Downloads a complete message, unstuffed, CRLF line endings.
    ///
    /// # Errors
    ///
    /// Returns an error if the message does not exist.
    pub async fn retr(&mut self, number: u32) -> Result<Vec<u8>> {
        self.exchange(&Command::Retr(number)).await.map(|(_, data)| data)
    }

    /// Downloads the header and the first `lines` body lines.
    ///
    /// # Errors
    ///
    /// Returns an error if the message does not exist or TOP is
    /// unsupported.
    pub async fn top(&mut self, number: u32, lines: u32) -> Result<Vec<u8>> {
        self.exchange(&Command::Top {
            message: number,
            lines,
        })
        .await
        .map(|(_, data)| data)
    }

    /// Marks a message for deletion at QUIT.
    ///
    /// # Errors
    ///
    /// Returns an error if the message does not exist.
    pub async fn dele(&mut self, number: u32) -> Result<()> {
        self.exchange(&Command::Dele(number)).await.map(drop)
    }

    /// Unmarks all messages marked for deletion.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn rset(&mut self) -> Result<()> {
        self.exchange(&Command::Rset).await.map(drop)
    }

    /// Keeps the connection alive.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn noop(&mut self) -> Result<()> {
        self.exchange(&Command::Noop).await.map(drop)
    }
}

impl<S, State> Client<S, State>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Capabilities from the last CAPA, upper-cased.
    #[must_use]
    pub fn capabilities(&self) -> &[String] {
        &self.capabilities
    }

    /// Returns true if CAPA listed `name` as the first word of a line.
    #[must_use]
    pub fn has_capability(&self, name: &str) -> bool {
        self.capabilities
            .iter()
            .any(|c| c.split_whitespace().next() == Some(&name.to_ascii_uppercase()[..]))
    }

    /// Sends QUIT. In the transaction state this commits deletions.
    ///
    /// # Errors
    ///
    /// Returns an error if the server reports a failure while updating the
    /// maildrop.
    pub async fn quit(mut self) -> Result<()> {
        self.exchange(&Command::Quit).await.map(drop)
    }

    /// Sends a command; returns the status text and, for multi-line
    /// commands, the unstuffed block.
    async fn exchange(&mut self, command: &Command) -> Result<(String, Vec<u8>)> {
        debug!(command = %command.redacted(), "C:");
        let timeout = self.timeout;
        let exchange = async {
            let stream = self.reader.get_mut();
            stream.write_all(&command.serialize()).await?;
            stream.flush().await?;

            let status = self.read_line().await?;
            let text = parse_status(&status)?.to_string();
            let mut block = Vec::new();
            if command.is_multiline() {
                loop {
                    let line = self.read_line_bytes().await?;
                    match unstuff(&line) {
                        Some(content) => block.extend_from_slice(content),
                        None => break,
                    }
                }
            }
            Ok((text, block))
        };
        tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| Error::Timeout(timeout))?
    }

    async fn read_line(&mut self) -> Result<String> {
        let line = self.read_line_bytes().await?;
        let line = String::from_utf8_lossy(&line).trim_end().to_string();
        trace!(%line, "S:");
        Ok(line)
    }

    async fn read_line_bytes(&mut self) -> Result<Vec<u8>> {
        let mut line = Vec::new();
        let n = self.reader.read_until(b'\n', &mut line).await?;
        if n == 0 {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "connection closed",
            )));
        }
        // Bare LF endings are tolerated and normalized.
        if !line.ends_with(b"\r\n") {
            if line.last() == Some(&b'\n') {
                line.pop();
            }
            line.extend_from_slice(b"\r\n");
        }
        Ok(line)
    }
}
