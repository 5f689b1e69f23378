//! Line and literal framing.
//!
//! A response is one CRLF-terminated line, extended by every `{n}` literal
//! announced at its end.

#![allow(clippy::missing_errors_doc)]

use std::io;

use bytes::BytesMut;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, trace};

use crate::parser::{Response, ResponseParser, UntaggedResponse};
use crate::types::{ResponseCode, Status};
use crate::{Error, Result};

const BUFFER_SIZE: usize = 8192;

/// Upper bound for a single line.
const MAX_LINE_LENGTH: usize = 1024 * 1024;

/// Upper bound for a single literal.
const MAX_LITERAL_SIZE: usize = 100 * 1024 * 1024;

/// Result of a command: the data the server sent before the tagged
/// completion, plus the completion itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Untagged responses in arrival order.
    pub untagged: Vec<UntaggedResponse>,
    /// Completion status.
    pub status: Status,
    /// Response code of the completion.
    pub code: Option<ResponseCode>,
    /// Human readable text of the completion.
    pub text: String,
}

impl Completion {
    /// Returns the untagged data if the status is OK, the matching error
    /// otherwise.
    pub fn into_result(self) -> Result<Vec<UntaggedResponse>> {
        match self.status {
            Status::Ok | Status::PreAuth => Ok(self.untagged),
            Status::No => Err(Error::No(self.text)),
            Status::Bad => Err(Error::Bad(self.text)),
            Status::Bye => Err(Error::Bye(self.text)),
        }
    }
}

/// Buffered IMAP connection.
pub struct FramedStream<S> {
    reader: BufReader<S>,
    write_buffer: BytesMut,
}

impl<S> FramedStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps a stream.
    pub fn new(stream: S) -> Self {
        Self {
            reader: BufReader::with_capacity(BUFFER_SIZE, stream),
            write_buffer: BytesMut::with_capacity(BUFFER_SIZE),
        }
    }

    /// Reads one response including its literals.
    pub async fn read_response(&mut self) -> Result<Vec<u8>> {
        let mut response = Vec::new();
        loop {
            let line = self.read_line().await?;
            response.extend_from_slice(&line);

            let Some(len) = literal_length(&line) else {
                break;
            };
            if len > MAX_LITERAL_SIZE {
                return Err(Error::Protocol(format!(
                    "literal too large: {len} bytes (max {MAX_LITERAL_SIZE})"
                )));
            }
            let start = response.len();
            response.resize(start + len, 0);
            self.reader.read_exact(&mut response[start..]).await?;
        }
        Ok(response)
    }

    /// Reads and parses one response.
    pub async fn read_parsed(&mut self) -> Result<Response> {
        let raw = self.read_response().await?;
        trace!(line = %String::from_utf8_lossy(&raw).trim_end(), "S:");
        ResponseParser::parse(&raw)
    }

    /// Reads responses until the completion for `tag` arrives.
    ///
    /// Untagged lines that fail to parse are logged and skipped so that a
    /// single odd server extension does not break the command.
    pub async fn read_until_tagged(&mut self, tag: &str) -> Result<Completion> {
        let mut untagged = Vec::new();
        loop {
            let raw = self.read_response().await?;
            trace!(line = %String::from_utf8_lossy(&raw).trim_end(), "S:");
            match ResponseParser::parse(&raw) {
                Ok(Response::Tagged {
                    tag: got,
                    status,
                    code,
                    text,
                }) if got.as_str() == tag => {
                    return Ok(Completion {
                        untagged,
                        status,
                        code,
                        text,
                    });
                }
                Ok(Response::Tagged { tag: got, .. }) => {
                    debug!(expected = tag, got = %got, "ignoring completion for another tag");
                }
                Ok(Response::Untagged(response)) => untagged.push(response),
                Ok(Response::Continuation { .. }) => {
                    debug!("ignoring unexpected continuation request");
                }
                Err(e) if raw.starts_with(b"* ") => {
                    debug!(error = %e, "skipping unparsable untagged response");
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn read_line(&mut self) -> Result<Vec<u8>> {
        let mut line = Vec::new();
        loop {
            let available = self.reader.fill_buf().await?;
            if available.is_empty() {
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed",
                )));
            }

            // A CR at the end of the previous chunk may pair with an LF here.
            if line.last() == Some(&b'\r') && available[0] == b'\n' {
                line.push(b'\n');
                self.reader.consume(1);
                return Ok(line);
            }

            if let Some(pos) = find_crlf(available) {
                line.extend_from_slice(&available[..pos + 2]);
                self.reader.consume(pos + 2);
                return Ok(line);
            }

            let len = available.len();
            line.extend_from_slice(available);
            self.reader.consume(len);
            if line.len() > MAX_LINE_LENGTH {
                return Err(Error::Protocol("line too long".to_string()));
            }
        }
    }

    /// Writes a complete command line.
    pub async fn write_command(&mut self, data: &[u8]) -> Result<()> {
        self.write_buffer.clear();
        self.write_buffer.extend_from_slice(data);
        let stream = self.reader.get_mut();
        stream.write_all(&self.write_buffer).await?;
        stream.flush().await?;
        Ok(())
    }

    /// Writes literal data.
    pub async fn write_raw(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.reader.get_mut();
        stream.write_all(data).await?;
        stream.flush().await?;
        Ok(())
    }

    /// Returns the inner stream. Buffered unread input is dropped.
    pub fn into_inner(self) -> S {
        self.reader.into_inner()
    }
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}

/// Extracts `n` from a line ending in `{n}\r\n` or `{n+}\r\n`.
fn literal_length(line: &[u8]) -> Option<usize> {
    let body = line.strip_suffix(b"\r\n")?.strip_suffix(b"}")?;
    let body = body.strip_suffix(b"+").unwrap_or(body);
    let open = body.iter().rposition(|&b| b == b'{')?;
    let digits = &body[open + 1..];
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(digits).ok()?.parse().ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    #[test]
    fn test_literal_length() {
        assert_eq!(literal_length(b"* 1 FETCH (BODY[] {342}\r\n"), Some(342));
        assert_eq!(literal_length(b"A1 APPEND x {12+}\r\n"), Some(12));
        assert_eq!(literal_length(b"{0}\r\n"), Some(0));
        assert_eq!(literal_length(b"* OK done\r\n"), None);
        assert_eq!(literal_length(b"* OK {}\r\n"), None);
        assert_eq!(literal_length(b"* OK {x1}\r\n"), None);
        assert_eq!(literal_length(b"* OK {5}"), None);
    }

    #[tokio::test]
    async fn test_literal_spanning_reads() {
        let mock = Builder::new()
            .read(b"* 2 FETCH (UID 9 BODY[] {11}\r\nHello")
            .read(b" World)\r\n")
            .build();
        let mut framed = FramedStream::new(mock);
        let raw = framed.read_response().await.unwrap();
        assert_eq!(raw, b"* 2 FETCH (UID 9 BODY[] {11}\r\nHello World)\r\n");
    }

    #[tokio::test]
    async fn test_crlf_split_across_reads() {
        let mock = Builder::new().read(b"* OK hi\r").read(b"\n").build();
        let mut framed = FramedStream::new(mock);
        assert_eq!(framed.read_response().await.unwrap(), b"* OK hi\r\n");
    }

    #[tokio::test]
    async fn test_read_until_tagged_collects_untagged() {
        let mock = Builder::new()
            .read(b"* 4 EXISTS\r\n")
            .read(b"* ODDITY ((\r\n")
            .read(b"A0007 OK NOOP completed\r\n")
            .build();
        let mut framed = FramedStream::new(mock);
        let completion = framed.read_until_tagged("A0007").await.unwrap();
        assert_eq!(completion.status, Status::Ok);
        assert_eq!(completion.untagged.len(), 2);
        assert_eq!(completion.untagged[0], UntaggedResponse::Exists(4));
    }

    #[tokio::test]
    async fn test_completion_no_maps_to_error() {
        let mock = Builder::new().read(b"A0001 NO mailbox locked\r\n").build();
        let mut framed = FramedStream::new(mock);
        let err = framed
            .read_until_tagged("A0001")
            .await
            .unwrap()
            .into_result()
            .unwrap_err();
        assert!(matches!(err, Error::No(text) if text == "mailbox locked"));
    }

    #[tokio::test]
    async fn test_eof() {
        let mock = Builder::new().read(b"* OK partial").build();
        let mut framed = FramedStream::new(mock);
        assert!(matches!(framed.read_response().await, Err(Error::Io(_))));
    }

    #[tokio::test]
    async fn test_oversized_literal_rejected() {
        let header = format!("* 1 FETCH (BODY[] {{{}}}\r\n", MAX_LITERAL_SIZE + 1);
        let mock = Builder::new().read(header.as_bytes()).build();
        let mut framed = FramedStream::new(mock);
        let err = framed.read_response().await.unwrap_err();
        assert!(err.to_string().contains("literal too large"));
    }
}
