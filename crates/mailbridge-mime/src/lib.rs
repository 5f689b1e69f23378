//! # mailbridge-mime
//!
//! Lenient MIME parsing and message building.
//!
//! ## Features
//!
//! - **Message parsing**: recursive multipart parsing that records defects instead of failing
//! - **Message building**: single-part or `multipart/mixed` output with attachments
//! - **Encoding/Decoding**: Base64, Quoted-Printable, UUEncode, RFC 2047 header words, charsets
//! - **Addresses**: RFC 5322 address lists with quoted names, comments and groups
//! - **Dates**: RFC 2822 dates with common real-world deviations
//!
//! ## Quick Start
//!
//! ```
//! use mailbridge_mime::{Message, MessageBuilder};
//!
//! let raw = MessageBuilder::new()
//!     .header("From", "sender@example.com")
//!     .text_header("Subject", "Grüße")
//!     .text("plain", "Hello, World!")
//!     .build();
//!
//! let message = Message::parse(&raw);
//! assert_eq!(message.subject().as_deref(), Some("Grüße"));
//! assert_eq!(message.root.body_text().unwrap(), "Hello, World!");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod address;
mod builder;
mod content_type;
mod date;
mod error;
mod header;
mod message;

pub mod encoding;

pub use address::{Mailbox, format_list};
pub use builder::{AttachmentPart, BodyPart, MessageBuilder};
pub use content_type::{ContentDisposition, ContentType, OCTET_STREAM};
pub use date::{format_date, parse_date};
pub use encoding::HeaderEncoding;
pub use error::{Error, Result};
pub use header::{HeaderField, Headers};
pub use message::{Message, Part, TransferEncoding};
