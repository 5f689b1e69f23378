//! Core SMTP types.

mod address;
mod envelope;
mod extension;
mod reply;

pub use address::Address;
pub use envelope::Envelope;
pub use extension::{AuthMechanism, Extension};
pub use reply::{Reply, ReplyCode};
