//! # mailbridge-pop3
//!
//! Async POP3 client (RFC 1939) with implicit TLS, STLS (RFC 2595) and
//! CAPA (RFC 2449).
//!
//! ```text
//! ┌───────────────┐
//! │ Authorization │ ─── login() ───→ Transaction ─── quit() ───→ (update)
//! └───────────────┘
//! ```
//!
//! Deletions are only committed by [`connection::Client::quit`] from the
//! transaction state.
//!
//! ```ignore
//! use mailbridge_pop3::connection::{Config, Security, login};
//!
//! let config = Config::new("pop.example.com", Security::Implicit);
//! let mut client = login(&config, "user", "password").await?;
//! for entry in client.uidl().await? {
//!     let raw = client.retr(entry.number).await?;
//! }
//! client.quit().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod types;

pub use connection::{Authorization, Client, Config, Pop3Stream, Security, Transaction, login};
pub use error::{Error, Result};
pub use types::{ListEntry, Stat, UidlEntry};
