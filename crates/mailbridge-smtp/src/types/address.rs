//! Envelope addresses.

use crate::error::{Error, Result};

/// A bare `local@domain` address as used in MAIL FROM and RCPT TO.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address(String);

impl Address {
    /// Creates an address, trimming surrounding angle brackets and whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] unless the address has exactly one
    /// `@` with non-empty parts on both sides and no whitespace.
    pub fn new(addr: impl Into<String>) -> Result<Self> {
        let addr = addr.into();
        let trimmed = addr.trim().trim_start_matches('<').trim_end_matches('>');
        let Some((local, domain)) = trimmed.split_once('@') else {
            return Err(Error::InvalidAddress(format!("missing @ in {addr:?}")));
        };
        if local.is_empty() || domain.is_empty() || domain.contains('@') {
            return Err(Error::InvalidAddress(format!("malformed address {addr:?}")));
        }
        if trimmed.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(Error::InvalidAddress(format!("whitespace in {addr:?}")));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_address() {
        assert_eq!(Address::new("user@example.com").unwrap().as_str(), "user@example.com");
        assert_eq!(Address::new(" <user@example.com> ").unwrap().as_str(), "user@example.com");
    }

    #[test]
    fn test_invalid_addresses() {
        for bad in ["", "userexample.com", "@example.com", "user@", "a@b@c", "a b@c"] {
            assert!(
                matches!(Address::new(bad), Err(Error::InvalidAddress(_))),
                "{bad:?} accepted"
            );
        }
    }
}
