//! FETCH response parsing.

use chrono::{DateTime, FixedOffset};

use crate::parser::lexer::{Lexer, Token};
use crate::types::Uid;
use crate::Result;

use super::FetchItem;
use super::helpers::parse_flag_list;

/// Parses the parenthesized data of a FETCH response.
pub fn parse_fetch_response(lexer: &mut Lexer<'_>) -> Result<Vec<FetchItem>> {
    lexer.expect(Token::LParen)?;
    let mut items = Vec::new();

    loop {
        let name = match lexer.next_token()? {
            Token::RParen => break,
            Token::Space => continue,
            Token::Atom(name) => name,
            token => return Err(lexer.error(&format!("unexpected {token:?} in FETCH"))),
        };

        match name.to_ascii_uppercase().as_str() {
            "UID" => {
                lexer.expect_space()?;
                let n = lexer.read_number()?;
                let uid = Uid::new(n).ok_or_else(|| lexer.error("UID 0"))?;
                items.push(FetchItem::Uid(uid));
            }
            "FLAGS" => {
                lexer.expect_space()?;
                items.push(FetchItem::Flags(parse_flag_list(lexer)?));
            }
            "RFC822.SIZE" => {
                lexer.expect_space()?;
                items.push(FetchItem::Rfc822Size(lexer.read_number()?));
            }
            "INTERNALDATE" => {
                lexer.expect_space()?;
                let raw = lexer.read_astring()?;
                items.push(FetchItem::InternalDate(parse_internal_date(&raw)));
            }
            "BODY" | "BODY.PEEK" | "RFC822" | "RFC822.HEADER" => {
                let section = match name.to_ascii_uppercase().as_str() {
                    "RFC822.HEADER" => Some("HEADER".to_string()),
                    "RFC822" => None,
                    _ => parse_section(lexer)?,
                };
                lexer.expect_space()?;
                let data = match lexer.next_token()? {
                    Token::Literal(data) => Some(data),
                    Token::QuotedString(s) => Some(s.into_bytes()),
                    _ => None,
                };
                items.push(FetchItem::Body { section, data });
            }
            _ => skip_value(lexer)?,
        }
    }

    Ok(items)
}

/// Parses `[section]` and skips an optional `<origin>`.
fn parse_section(lexer: &mut Lexer<'_>) -> Result<Option<String>> {
    let mut section = None;
    if lexer.peek() == Some(b'[') {
        lexer.advance();
        let raw = lexer.take_while(|b| b != b']');
        lexer.expect(Token::RBracket)?;
        if !raw.is_empty() {
            section = Some(String::from_utf8_lossy(raw).to_ascii_uppercase());
        }
    }
    if lexer.peek() == Some(b'<') {
        lexer.take_while(|b| b != b'>');
        lexer.advance();
    }
    Ok(section)
}

/// Skips the value of an unrequested item: an atom, string, literal or
/// parenthesized list.
fn skip_value(lexer: &mut Lexer<'_>) -> Result<()> {
    if lexer.peek() == Some(b'[') {
        lexer.take_while(|b| b != b']');
        lexer.advance();
    }
    lexer.expect_space()?;

    let mut depth = 0usize;
    loop {
        match lexer.next_token()? {
            Token::LParen => depth += 1,
            Token::RParen => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Ok(());
                }
            }
            Token::Eof | Token::Crlf => return Err(lexer.error("unterminated FETCH item")),
            _ if depth == 0 => return Ok(()),
            _ => {}
        }
    }
}

/// Parses `17-Jul-1996 02:44:25 -0700`. Single-digit days may be space padded.
#[must_use]
pub fn parse_internal_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_str(raw.trim(), "%d-%b-%Y %H:%M:%S %z").ok()
}
