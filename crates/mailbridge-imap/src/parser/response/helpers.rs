//! Parsers shared by several response kinds.

use crate::parser::lexer::{Lexer, Token};
use crate::types::{Flag, Flags, ListResponse, Mailbox, MailboxAttribute, ResponseCode};
use crate::Result;

/// Parses a bracketed response code. The lexer sits on `[`.
pub fn parse_response_code(lexer: &mut Lexer<'_>) -> Result<ResponseCode> {
    lexer.expect(Token::LBracket)?;
    let atom = lexer.read_atom()?;

    let code = match atom.to_ascii_uppercase().as_str() {
        "READ-ONLY" => ResponseCode::ReadOnly,
        "READ-WRITE" => ResponseCode::ReadWrite,
        "TRYCREATE" => ResponseCode::TryCreate,
        "UIDVALIDITY" => {
            lexer.expect_space()?;
            ResponseCode::UidValidity(lexer.read_number()?)
        }
        "UIDNEXT" => {
            lexer.expect_space()?;
            ResponseCode::UidNext(lexer.read_number()?)
        }
        "UNSEEN" => {
            lexer.expect_space()?;
            ResponseCode::Unseen(lexer.read_number()?)
        }
        "CAPABILITY" => ResponseCode::Capability(parse_capabilities(lexer)?),
        _ => ResponseCode::Other(atom.to_string()),
    };

    // Skip arguments of codes we do not model, e.g. PERMANENTFLAGS (...).
    lexer.take_while(|b| b != b']' && b != b'\r');
    lexer.expect(Token::RBracket)?;
    Ok(code)
}

/// Parses space-separated capability atoms, upper-cased.
pub fn parse_capabilities(lexer: &mut Lexer<'_>) -> Result<Vec<String>> {
    let mut caps = Vec::new();
    while lexer.peek() == Some(b' ') {
        lexer.advance();
        if let Token::Atom(s) = lexer.next_token()? {
            caps.push(s.to_ascii_uppercase());
        }
    }
    Ok(caps)
}

/// Parses a parenthesized flag list.
pub fn parse_flag_list(lexer: &mut Lexer<'_>) -> Result<Flags> {
    lexer.expect(Token::LParen)?;
    let mut flags = Flags::new();
    loop {
        match lexer.next_token()? {
            Token::RParen => break,
            Token::Atom(s) => flags.insert(Flag::parse(s)),
            // `\*` in PERMANENTFLAGS lexes as `\` followed by `*`.
            Token::Space | Token::Asterisk => {}
            token => return Err(lexer.error(&format!("unexpected {token:?} in flag list"))),
        }
    }
    Ok(flags)
}

/// Parses the body of a LIST or LSUB response.
pub fn parse_list_response(lexer: &mut Lexer<'_>) -> Result<ListResponse> {
    lexer.expect(Token::LParen)?;
    let mut attributes = Vec::new();
    loop {
        match lexer.next_token()? {
            Token::RParen => break,
            Token::Atom(s) => attributes.push(MailboxAttribute::parse(s)),
            Token::Space => {}
            token => return Err(lexer.error(&format!("unexpected {token:?} in LIST attributes"))),
        }
    }
    lexer.expect_space()?;

    let delimiter = match lexer.next_token()? {
        Token::Nil => None,
        Token::QuotedString(s) => s.chars().next(),
        token => return Err(lexer.error(&format!("expected delimiter, got {token:?}"))),
    };
    lexer.expect_space()?;

    let name = lexer.read_astring()?;
    Ok(ListResponse {
        attributes,
        delimiter,
        mailbox: Mailbox::from_wire(&name),
    })
}

/// Parses the numbers of a SEARCH response.
pub fn parse_search_response(lexer: &mut Lexer<'_>) -> Result<Vec<u32>> {
    let mut numbers = Vec::new();
    while lexer.peek() == Some(b' ') {
        lexer.advance();
        match lexer.next_token()? {
            Token::Number(n) if n > 0 => numbers.push(n),
            // Trailing space before CRLF on some servers.
            Token::Crlf | Token::Eof => break,
            _ => {}
        }
    }
    Ok(numbers)
}
