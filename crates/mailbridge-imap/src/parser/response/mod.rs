//! Response parser.

#![allow(clippy::missing_errors_doc)]

mod fetch;
mod helpers;

use chrono::{DateTime, FixedOffset};

use crate::parser::lexer::{Lexer, Token};
use crate::types::{Flags, ListResponse, ResponseCode, SeqNum, Status, Tag, Uid};
use crate::{Error, Result};

pub use fetch::parse_internal_date;
use helpers::{
    parse_capabilities, parse_flag_list, parse_list_response, parse_response_code,
    parse_search_response,
};

/// One FETCH data item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchItem {
    /// UID.
    Uid(Uid),
    /// FLAGS.
    Flags(Flags),
    /// RFC822.SIZE.
    Rfc822Size(u32),
    /// INTERNALDATE, `None` when the server sent an unparsable value.
    InternalDate(Option<DateTime<FixedOffset>>),
    /// `BODY[section]`; `section` is `None` for the whole message.
    Body {
        /// Upper-cased section specifier.
        section: Option<String>,
        /// Payload, `None` for NIL.
        data: Option<Vec<u8>>,
    },
}

/// Untagged server data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UntaggedResponse {
    /// `* OK`.
    Ok {
        /// Response code.
        code: Option<ResponseCode>,
        /// Text.
        text: String,
    },
    /// `* NO`.
    No {
        /// Response code.
        code: Option<ResponseCode>,
        /// Text.
        text: String,
    },
    /// `* BAD`.
    Bad {
        /// Response code.
        code: Option<ResponseCode>,
        /// Text.
        text: String,
    },
    /// `* PREAUTH`.
    PreAuth {
        /// Response code.
        code: Option<ResponseCode>,
        /// Text.
        text: String,
    },
    /// `* BYE`.
    Bye {
        /// Response code.
        code: Option<ResponseCode>,
        /// Text.
        text: String,
    },
    /// `* CAPABILITY`.
    Capability(Vec<String>),
    /// `* FLAGS`.
    Flags(Flags),
    /// `* LIST`.
    List(ListResponse),
    /// `* LSUB`.
    Lsub(ListResponse),
    /// `* SEARCH`.
    Search(Vec<u32>),
    /// `* n EXISTS`.
    Exists(u32),
    /// `* n RECENT`.
    Recent(u32),
    /// `* n EXPUNGE`.
    Expunge(SeqNum),
    /// `* n FETCH (...)`.
    Fetch {
        /// Sequence number.
        seq: SeqNum,
        /// Data items.
        items: Vec<FetchItem>,
    },
    /// Anything else, kept as text.
    Other(String),
}

/// A parsed response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Command completion.
    Tagged {
        /// Command tag.
        tag: Tag,
        /// Status.
        status: Status,
        /// Response code.
        code: Option<ResponseCode>,
        /// Text.
        text: String,
    },
    /// Server data.
    Untagged(UntaggedResponse),
    /// Continuation request (`+`).
    Continuation {
        /// Optional text.
        text: Option<String>,
    },
}

/// Stateless response parser.
pub struct ResponseParser;

impl ResponseParser {
    /// Parses one complete response, literals included.
    pub fn parse(input: &[u8]) -> Result<Response> {
        let mut lexer = Lexer::new(input);
        match lexer.next_token()? {
            Token::Asterisk => {
                lexer.expect_space()?;
                Self::parse_untagged(&mut lexer).map(Response::Untagged)
            }
            Token::Plus => {
                if lexer.peek() == Some(b' ') {
                    lexer.advance();
                }
                let text = lexer.rest_of_line();
                Ok(Response::Continuation {
                    text: (!text.is_empty()).then_some(text),
                })
            }
            Token::Atom(tag) => {
                let tag = Tag::new(tag);
                lexer.expect_space()?;
                let status = Self::parse_status(lexer.read_atom()?)
                    .ok_or_else(|| lexer.error("invalid status"))?;
                let (code, text) = Self::parse_resp_text(&mut lexer)?;
                Ok(Response::Tagged {
                    tag,
                    status,
                    code,
                    text,
                })
            }
            token => Err(Error::Parse {
                position: 0,
                message: format!("expected '*', '+' or a tag, got {token:?}"),
            }),
        }
    }

    fn parse_untagged(lexer: &mut Lexer<'_>) -> Result<UntaggedResponse> {
        match lexer.next_token()? {
            Token::Number(n) => {
                lexer.expect_space()?;
                let keyword = lexer.read_atom()?.to_ascii_uppercase();
                let seq = SeqNum::new(n);
                match keyword.as_str() {
                    "EXISTS" => Ok(UntaggedResponse::Exists(n)),
                    "RECENT" => Ok(UntaggedResponse::Recent(n)),
                    "EXPUNGE" => seq
                        .map(UntaggedResponse::Expunge)
                        .ok_or_else(|| lexer.error("sequence number 0")),
                    "FETCH" => {
                        let seq = seq.ok_or_else(|| lexer.error("sequence number 0"))?;
                        lexer.expect_space()?;
                        let items = fetch::parse_fetch_response(lexer)?;
                        Ok(UntaggedResponse::Fetch { seq, items })
                    }
                    _ => Ok(UntaggedResponse::Other(format!("{n} {keyword}"))),
                }
            }
            Token::Atom(keyword) => {
                let upper = keyword.to_ascii_uppercase();
                if let Some(status) = Self::parse_status(&upper) {
                    let (code, text) = Self::parse_resp_text(lexer)?;
                    return Ok(match status {
                        Status::Ok => UntaggedResponse::Ok { code, text },
                        Status::No => UntaggedResponse::No { code, text },
                        Status::Bad => UntaggedResponse::Bad { code, text },
                        Status::PreAuth => UntaggedResponse::PreAuth { code, text },
                        Status::Bye => UntaggedResponse::Bye { code, text },
                    });
                }
                match upper.as_str() {
                    "CAPABILITY" => Ok(UntaggedResponse::Capability(parse_capabilities(lexer)?)),
                    "FLAGS" => {
                        lexer.expect_space()?;
                        Ok(UntaggedResponse::Flags(parse_flag_list(lexer)?))
                    }
                    "LIST" => {
                        lexer.expect_space()?;
                        Ok(UntaggedResponse::List(parse_list_response(lexer)?))
                    }
                    "LSUB" => {
                        lexer.expect_space()?;
                        Ok(UntaggedResponse::Lsub(parse_list_response(lexer)?))
                    }
                    "SEARCH" => Ok(UntaggedResponse::Search(parse_search_response(lexer)?)),
                    _ => Ok(UntaggedResponse::Other(format!(
                        "{keyword}{}",
                        lexer.rest_of_line()
                    ))),
                }
            }
            token => Err(lexer.error(&format!("unexpected {token:?} in untagged response"))),
        }
    }

    fn parse_status(atom: &str) -> Option<Status> {
        match atom.to_ascii_uppercase().as_str() {
            "OK" => Some(Status::Ok),
            "NO" => Some(Status::No),
            "BAD" => Some(Status::Bad),
            "PREAUTH" => Some(Status::PreAuth),
            "BYE" => Some(Status::Bye),
            _ => None,
        }
    }

    /// Parses `[code] text` after a status keyword.
    fn parse_resp_text(lexer: &mut Lexer<'_>) -> Result<(Option<ResponseCode>, String)> {
        if lexer.peek() == Some(b' ') {
            lexer.advance();
        }
        let code = if lexer.peek() == Some(b'[') {
            Some(parse_response_code(lexer)?)
        } else {
            None
        };
        if lexer.peek() == Some(b' ') {
            lexer.advance();
        }
        Ok((code, lexer.rest_of_line()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{Flag, MailboxAttribute};

    #[test]
    fn test_tagged_ok_with_code() {
        let response = ResponseParser::parse(b"A0002 OK [READ-WRITE] SELECT completed\r\n").unwrap();
        assert_eq!(
            response,
            Response::Tagged {
                tag: Tag::new("A0002"),
                status: Status::Ok,
                code: Some(ResponseCode::ReadWrite),
                text: "SELECT completed".to_string(),
            }
        );
    }

    #[test]
    fn test_tagged_no() {
        let response = ResponseParser::parse(b"A0003 NO [TRYCREATE] no such mailbox\r\n").unwrap();
        assert!(matches!(
            response,
            Response::Tagged { status: Status::No, code: Some(ResponseCode::TryCreate), .. }
        ));
    }

    #[test]
    fn test_greeting_with_capabilities() {
        let response =
            ResponseParser::parse(b"* OK [CAPABILITY IMAP4rev1 UNSELECT AUTH=PLAIN] ready\r\n").unwrap();
        match response {
            Response::Untagged(UntaggedResponse::Ok {
                code: Some(ResponseCode::Capability(caps)),
                text,
            }) => {
                assert_eq!(caps, ["IMAP4REV1", "UNSELECT", "AUTH=PLAIN"]);
                assert_eq!(text, "ready");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_select_data() {
        assert_eq!(
            ResponseParser::parse(b"* 172 EXISTS\r\n").unwrap(),
            Response::Untagged(UntaggedResponse::Exists(172))
        );
        assert_eq!(
            ResponseParser::parse(b"* OK [UIDVALIDITY 3857529045] UIDs valid\r\n").unwrap(),
            Response::Untagged(UntaggedResponse::Ok {
                code: Some(ResponseCode::UidValidity(3_857_529_045)),
                text: "UIDs valid".to_string(),
            })
        );
        let permanent = ResponseParser::parse(
            b"* OK [PERMANENTFLAGS (\\Deleted \\Seen \\*)] Limited\r\n",
        )
        .unwrap();
        assert!(matches!(
            permanent,
            Response::Untagged(UntaggedResponse::Ok { code: Some(ResponseCode::Other(_)), .. })
        ));
        match ResponseParser::parse(b"* FLAGS (\\Answered \\Seen)\r\n").unwrap() {
            Response::Untagged(UntaggedResponse::Flags(flags)) => {
                assert!(flags.contains(&Flag::Answered));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_list_and_lsub() {
        let list =
            ResponseParser::parse(b"* LIST (\\HasNoChildren) \"/\" \"Work/Q&AQE-\"\r\n").unwrap();
        match list {
            Response::Untagged(UntaggedResponse::List(entry)) => {
                assert_eq!(entry.attributes, vec![MailboxAttribute::HasNoChildren]);
                assert_eq!(entry.delimiter, Some('/'));
                assert_eq!(entry.mailbox.as_str(), "Work/Qā");
            }
            other => panic!("unexpected {other:?}"),
        }
        let lsub = ResponseParser::parse(b"* LSUB () \".\" INBOX\r\n").unwrap();
        assert!(matches!(lsub, Response::Untagged(UntaggedResponse::Lsub(_))));
    }

    #[test]
    fn test_search() {
        assert_eq!(
            ResponseParser::parse(b"* SEARCH 2 84 882\r\n").unwrap(),
            Response::Untagged(UntaggedResponse::Search(vec![2, 84, 882]))
        );
        assert_eq!(
            ResponseParser::parse(b"* SEARCH\r\n").unwrap(),
            Response::Untagged(UntaggedResponse::Search(vec![]))
        );
    }

    #[test]
    fn test_expunge_and_fetch() {
        assert_eq!(
            ResponseParser::parse(b"* 3 EXPUNGE\r\n").unwrap(),
            Response::Untagged(UntaggedResponse::Expunge(SeqNum::new(3).unwrap()))
        );
        match ResponseParser::parse(b"* 1 FETCH (UID 40 FLAGS ())\r\n").unwrap() {
            Response::Untagged(UntaggedResponse::Fetch { seq, items }) => {
                assert_eq!(seq.get(), 1);
                assert_eq!(items[0], FetchItem::Uid(Uid::new(40).unwrap()));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_continuation() {
        assert_eq!(
            ResponseParser::parse(b"+ Ready for literal data\r\n").unwrap(),
            Response::Continuation {
                text: Some("Ready for literal data".to_string())
            }
        );
        assert_eq!(
            ResponseParser::parse(b"+\r\n").unwrap(),
            Response::Continuation { text: None }
        );
    }

    #[test]
    fn test_unknown_untagged_kept() {
        let response = ResponseParser::parse(b"* ID (\"name\" \"x\")\r\n").unwrap();
        assert!(matches!(response, Response::Untagged(UntaggedResponse::Other(_))));
    }
}
