//! SMTP envelope.

use super::Address;
use crate::error::{Error, Result};

/// Reverse path and forward paths of one mail transaction.
///
/// Recipients listed here receive the message whether or not they appear in
/// its headers, which is how blind copies are delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    from: Address,
    recipients: Vec<Address>,
}

impl Envelope {
    /// Creates an envelope. Duplicate recipients are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] if there are no recipients.
    pub fn new(from: Address, recipients: impl IntoIterator<Item = Address>) -> Result<Self> {
        let mut unique: Vec<Address> = Vec::new();
        for rcpt in recipients {
            if !unique.contains(&rcpt) {
                unique.push(rcpt);
            }
        }
        if unique.is_empty() {
            return Err(Error::InvalidAddress("envelope has no recipients".into()));
        }
        Ok(Self {
            from,
            recipients: unique,
        })
    }

    /// Reverse path.
    #[must_use]
    pub const fn from(&self) -> &Address {
        &self.from
    }

    /// Forward paths in insertion order.
    #[must_use]
    pub fn recipients(&self) -> &[Address] {
        &self.recipients
    }
}
