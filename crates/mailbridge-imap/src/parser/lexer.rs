//! Tokenizer for server responses.

#![allow(clippy::missing_errors_doc)]

use crate::{Error, Result};

/// A response token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    /// Atom, including backslash flags such as `\Seen`.
    Atom(&'a str),
    /// Quoted string, unescaped.
    QuotedString(String),
    /// Literal payload (`{n}\r\n` followed by n bytes).
    Literal(Vec<u8>),
    /// Number.
    Number(u32),
    /// `(`.
    LParen,
    /// `)`.
    RParen,
    /// `[`.
    LBracket,
    /// `]`.
    RBracket,
    /// Single space.
    Space,
    /// `*`.
    Asterisk,
    /// `+`.
    Plus,
    /// `NIL`, case-insensitive.
    Nil,
    /// CRLF.
    Crlf,
    /// End of input.
    Eof,
}

/// Cursor over one response.
pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a lexer.
    #[must_use]
    pub const fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    /// Current byte offset.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Peeks at the current byte.
    #[must_use]
    pub fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    /// Consumes one byte.
    pub fn advance(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Some(byte)
    }

    /// Consumes bytes while the predicate holds and returns them.
    pub fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> &'a [u8] {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.pos += 1;
        }
        &self.input[start..self.pos]
    }

    /// Reads the next token.
    pub fn next_token(&mut self) -> Result<Token<'a>> {
        let Some(byte) = self.peek() else {
            return Ok(Token::Eof);
        };

        let single = match byte {
            b' ' => Some(Token::Space),
            b'(' => Some(Token::LParen),
            b')' => Some(Token::RParen),
            b'[' => Some(Token::LBracket),
            b']' => Some(Token::RBracket),
            b'*' => Some(Token::Asterisk),
            b'+' => Some(Token::Plus),
            _ => None,
        };
        if let Some(token) = single {
            self.pos += 1;
            return Ok(token);
        }

        match byte {
            b'\r' if self.input.get(self.pos + 1) == Some(&b'\n') => {
                self.pos += 2;
                Ok(Token::Crlf)
            }
            b'"' => self.quoted_string(),
            b'{' => self.literal(),
            _ if is_atom_char(byte) => self.atom_or_number(),
            _ => Err(self.error(&format!("unexpected byte {byte:#04x}"))),
        }
    }

    fn quoted_string(&mut self) -> Result<Token<'a>> {
        self.pos += 1;
        let mut bytes = Vec::new();
        loop {
            match self.advance() {
                Some(b'"') => break,
                Some(b'\\') => match self.advance() {
                    Some(c @ (b'"' | b'\\')) => bytes.push(c),
                    Some(c) => return Err(self.error(&format!("invalid escape \\{}", c as char))),
                    None => return Err(self.error("unterminated quoted string")),
                },
                Some(c) => bytes.push(c),
                None => return Err(self.error("unterminated quoted string")),
            }
        }
        String::from_utf8(bytes)
            .map(Token::QuotedString)
            .map_err(|_| self.error("quoted string is not UTF-8"))
    }

    fn literal(&mut self) -> Result<Token<'a>> {
        self.pos += 1;
        let digits = self.take_while(|b| b.is_ascii_digit());
        let size: usize = std::str::from_utf8(digits)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| self.error("invalid literal size"))?;

        // LITERAL+ marker.
        if self.peek() == Some(b'+') {
            self.pos += 1;
        }
        if self.advance() != Some(b'}') {
            return Err(self.error("expected '}' after literal size"));
        }
        if self.advance() != Some(b'\r') || self.advance() != Some(b'\n') {
            return Err(self.error("expected CRLF after literal size"));
        }

        let end = self
            .pos
            .checked_add(size)
            .filter(|&end| end <= self.input.len())
            .ok_or_else(|| self.error("incomplete literal"))?;
        let data = self.input[self.pos..end].to_vec();
        self.pos = end;
        Ok(Token::Literal(data))
    }

    fn atom_or_number(&mut self) -> Result<Token<'a>> {
        let bytes = self.take_while(is_atom_char);
        let text = std::str::from_utf8(bytes).map_err(|_| self.error("atom is not UTF-8"))?;

        if bytes.iter().all(u8::is_ascii_digit) {
            return text
                .parse()
                .map(Token::Number)
                .map_err(|_| self.error("number out of range"));
        }
        if text.eq_ignore_ascii_case("NIL") {
            Ok(Token::Nil)
        } else {
            Ok(Token::Atom(text))
        }
    }

    /// Builds a parse error at the current position.
    pub fn error(&self, message: &str) -> Error {
        Error::Parse {
            position: self.pos,
            message: message.to_string(),
        }
    }

    /// Consumes a token of the same kind as `expected`.
    #[allow(clippy::needless_pass_by_value)]
    pub fn expect(&mut self, expected: Token<'_>) -> Result<()> {
        let token = self.next_token()?;
        if std::mem::discriminant(&token) == std::mem::discriminant(&expected) {
            Ok(())
        } else {
            Err(self.error(&format!("expected {expected:?}, got {token:?}")))
        }
    }

    /// Consumes a space.
    pub fn expect_space(&mut self) -> Result<()> {
        self.expect(Token::Space)
    }

    /// Reads an astring.
    pub fn read_astring(&mut self) -> Result<String> {
        match self.next_token()? {
            Token::Atom(s) => Ok(s.to_string()),
            Token::Number(n) => Ok(n.to_string()),
            Token::QuotedString(s) => Ok(s),
            Token::Literal(data) => {
                String::from_utf8(data).map_err(|_| self.error("literal is not UTF-8"))
            }
            token => Err(self.error(&format!("expected astring, got {token:?}"))),
        }
    }

    /// Reads an nstring.
    pub fn read_nstring(&mut self) -> Result<Option<String>> {
        match self.next_token()? {
            Token::Nil => Ok(None),
            Token::QuotedString(s) => Ok(Some(s)),
            Token::Literal(data) => String::from_utf8(data)
                .map(Some)
                .map_err(|_| self.error("literal is not UTF-8")),
            token => Err(self.error(&format!("expected nstring, got {token:?}"))),
        }
    }

    /// Reads a number.
    pub fn read_number(&mut self) -> Result<u32> {
        match self.next_token()? {
            Token::Number(n) => Ok(n),
            token => Err(self.error(&format!("expected number, got {token:?}"))),
        }
    }

    /// Reads an atom.
    pub fn read_atom(&mut self) -> Result<&'a str> {
        match self.next_token()? {
            Token::Atom(s) => Ok(s),
            token => Err(self.error(&format!("expected atom, got {token:?}"))),
        }
    }

    /// Returns everything up to CRLF as text and consumes the CRLF.
    pub fn rest_of_line(&mut self) -> String {
        let text = self.take_while(|b| b != b'\r' && b != b'\n');
        let text = String::from_utf8_lossy(text).into_owned();
        if self.peek() == Some(b'\r') {
            self.pos += 1;
        }
        if self.peek() == Some(b'\n') {
            self.pos += 1;
        }
        text
    }
}

/// Returns true for bytes allowed in an atom.
///
/// Backslash is accepted so that system flags lex as one atom.
#[must_use]
pub const fn is_atom_char(b: u8) -> bool {
    matches!(b, 0x21..=0x7E)
        && !matches!(b, b'(' | b')' | b'{' | b'%' | b'*' | b'"' | b'[' | b']')
}
