//! # mailbridge-smtp
//!
//! Async SMTP submission client (RFC 5321).
//!
//! - **Type-state client**: MAIL FROM, RCPT TO and DATA can only be issued
//!   in the order the protocol allows
//! - **TLS**: implicit TLS (port 465) or STARTTLS, with an opt-in mode that
//!   accepts any server certificate
//! - **Authentication**: AUTH PLAIN and AUTH LOGIN
//! - **Timeouts**: every command is bounded by the configured timeout
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailbridge_smtp::{Address, Config, Envelope, Security, Session};
//!
//! let config = Config::new("smtp.example.com", Security::StartTlsIfAvailable).port(587);
//! let mut session = Session::connect(&config, Some(("user", "secret"))).await?;
//! let envelope = Envelope::new(
//!     Address::new("alice@example.com")?,
//!     [Address::new("bob@example.com")?],
//! )?;
//! session.send(&envelope, b"Subject: Hi\r\n\r\nHello\r\n").await?;
//! session.quit().await?;
//! ```
//!
//! ## Connection States
//!
//! ```text
//! Connected ── login() ──→ Authenticated
//!     │                         │
//!     └──────── mail_from() ────┘
//!                   │
//!                   ▼
//!           MailTransaction ── rcpt_to() ──→ RecipientAdded ── data() ──→ Data
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

pub use connection::{
    Authenticated, Client, Config, Connected, Data, MailTransaction, Ready, RecipientAdded,
    Security, ServerInfo, Session, SmtpStream,
};
pub use error::{Error, Result};
pub use types::{Address, AuthMechanism, Envelope, Extension, Reply, ReplyCode};
