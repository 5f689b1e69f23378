//! # mailbridge-imap
//!
//! Async IMAP4rev1 client used by `mailbridge` to read mailboxes.
//!
//! The [`connection::Client`] type tracks the protocol state in its type
//! parameter, so commands that need a selected mailbox cannot be issued
//! before one is selected:
//!
//! ```text
//! NotAuthenticated ── login() ──> Authenticated ── select() ──> Selected
//!                                       ^                          │
//!                                       └──────── unselect() ──────┘
//! ```
//!
//! [`connection::Session`] wraps the three states behind `&mut self`
//! methods for callers that keep the connection in a struct.
//!
//! ```ignore
//! use mailbridge_imap::{Config, Security, Session, SearchKey, Mailbox};
//!
//! let config = Config::new("imap.example.com", Security::Implicit);
//! let mut session = Session::connect(&config, "user", "password").await?;
//! session.select(&Mailbox::inbox()).await?;
//! let unseen = session.uid_search(&SearchKey::Unseen).await?;
//! session.logout().await?;
//! ```
//!
//! Responses are parsed without I/O by [`parser::ResponseParser`]; the
//! connection layer only frames lines and literals.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod types;

pub use command::{Command, FetchAttribute, SearchKey, StoreAction, StoreMode};
pub use connection::{Client, Config, FetchedMessage, ImapStream, Security, Session};
pub use error::{Error, Result};
pub use types::{
    Flag, Flags, ListResponse, Mailbox, MailboxAttribute, MailboxStatus, SeqNum, Uid, UidSet,
};
