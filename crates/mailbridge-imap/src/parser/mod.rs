//! Sans-I/O response parser.
//!
//! [`ResponseParser::parse`] turns one framed response (including any
//! literals) into a [`Response`]. The lexer is exposed for tests and for
//! callers that need to inspect raw lines.

pub mod lexer;
mod response;

pub use response::{FetchItem, Response, ResponseParser, UntaggedResponse, parse_internal_date};
