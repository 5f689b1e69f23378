//! # mailbridge
//!
//! Send and receive mail over SMTP, POP3 and IMAP through one object model.
//!
//! This crate provides:
//! - [`InternetMail`], the facade that picks a receiver and sender per protocol
//! - [`MailReceiver`] with IMAP and POP3 implementations
//! - [`SmtpSender`] and IMAP append through [`MailSender`]
//! - [`Message`] with address, text and attachment collections and MIME conversion
//! - [`SearchFilter`], translated to IMAP `SEARCH` keys
//! - [`Profile`], connection settings with protocol port defaults
//!
//! Certificate checks are off by default ([`Profile::accept_invalid_certs`]);
//! turn them on for anything but trusted networks.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod error;
pub mod filter;
mod mail;
pub mod message;
pub mod profile;
pub mod protocol;
pub mod receiver;
pub mod selector;
pub mod sender;
pub mod transport;

#[cfg(test)]
mod fakes;

pub use error::{Error, Result};
pub use filter::{FilterValue, SearchFilter};
pub use mail::InternetMail;
pub use message::{
    Address, Addresses, Attachment, AttachmentEncoding, Attachments, Importance, Message,
    NonAsciiEncoding, ParseStatus, Sender, Text, TextType, Texts,
};
pub use profile::Profile;
pub use protocol::{KnownIdPolicy, Protocol, TextProcessing};
pub use receiver::{ImapReceiver, MailReceiver, Pop3Receiver};
pub use selector::Selector;
pub use sender::{MailSender, SmtpSender};
pub use transport::{Connector, NetworkConnector};
