//! Email addresses and address lists.

use std::fmt;

use mailbridge_mime::Mailbox;

use crate::error::{Error, Result};

/// An address split into user and server parts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Address {
    user: String,
    server: String,
    /// Display name, may be empty.
    pub display_name: String,
    /// Charset label for the display name, may be empty.
    pub encoding: String,
}

impl Address {
    /// Parses `user@server` or `Name <user@server>`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgumentValue`] if there is no `@`.
    pub fn new(address: &str) -> Result<Self> {
        let mut parsed = Self::default();
        parsed.set_address(address)?;
        Ok(parsed)
    }

    /// Builds an address from a parsed header mailbox.
    #[must_use]
    pub fn from_mailbox(mailbox: &Mailbox) -> Self {
        Self {
            user: mailbox.local_part().to_string(),
            server: mailbox.domain().to_string(),
            display_name: mailbox.name.clone().unwrap_or_default(),
            encoding: String::new(),
        }
    }

    /// The composite `user@server`.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}@{}", self.user, self.server)
    }

    /// Replaces user and server from a composite address.
    ///
    /// A display name in the value replaces the current one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgumentValue`] if there is no `@`.
    pub fn set_address(&mut self, value: &str) -> Result<()> {
        let value = value.trim();
        if value.contains('<') {
            let mailbox = Mailbox::parse(value)
                .map_err(|e| Error::InvalidArgumentValue(e.to_string()))?;
            if mailbox.domain().is_empty() {
                return Err(Error::InvalidArgumentValue(format!(
                    "address {value:?} has no server part"
                )));
            }
            self.user = mailbox.local_part().to_string();
            self.server = mailbox.domain().to_string();
            if let Some(name) = mailbox.name {
                self.display_name = name;
            }
            return Ok(());
        }

        let (user, server) = value.rsplit_once('@').ok_or_else(|| {
            Error::InvalidArgumentValue(format!("address {value:?} has no server part"))
        })?;
        self.user = user.to_string();
        self.server = server.to_string();
        Ok(())
    }

    /// The part before `@`.
    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Sets the part before `@`.
    pub fn set_user(&mut self, user: impl Into<String>) {
        self.user = user.into();
    }

    /// The part after `@`.
    #[must_use]
    pub fn server(&self) -> &str {
        &self.server
    }

    /// Sets the part after `@`.
    pub fn set_server(&mut self, server: impl Into<String>) {
        self.server = server.into();
    }

    /// Converts to a header mailbox.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgumentValue`] if user or server is empty.
    pub fn to_wire(&self) -> Result<Mailbox> {
        if self.user.is_empty() || self.server.is_empty() {
            return Err(Error::InvalidArgumentValue(format!(
                "address {:?} needs both a user and a server",
                self.address()
            )));
        }
        let name = Some(self.display_name.clone()).filter(|n| !n.is_empty());
        Ok(Mailbox::new(name, self.address()))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.display_name.is_empty() {
            write!(f, "{}@{}", self.user, self.server)
        } else {
            write!(f, "{} <{}@{}>", self.display_name, self.user, self.server)
        }
    }
}

/// An ordered address list such as `To` or `Cc`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Addresses {
    items: Vec<Address>,
}

impl Addresses {
    /// Creates an empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Parses and appends one address.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgumentValue`] if the address has no `@`.
    pub fn add(&mut self, address: &str) -> Result<&mut Address> {
        let parsed = Address::new(address)?;
        Ok(self.push(parsed))
    }

    /// Appends an address.
    pub fn push(&mut self, address: Address) -> &mut Address {
        self.items.push(address);
        let last = self.items.len() - 1;
        &mut self.items[last]
    }

    /// Appends every mailbox of an address-list header value.
    ///
    /// Returns how many were added; unparsable entries are skipped.
    pub fn add_parsed(&mut self, header_value: &str) -> usize {
        let mailboxes = Mailbox::parse_list(header_value);
        let added = mailboxes.len();
        self.items
            .extend(mailboxes.iter().map(Address::from_mailbox));
        added
    }

    /// Number of addresses.
    #[must_use]
    pub fn count(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Address at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Address> {
        self.items.get(index)
    }

    /// Mutable address at `index`.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Address> {
        self.items.get_mut(index)
    }

    /// Removes and returns the address at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgumentValue`] if `index` is out of range.
    pub fn delete(&mut self, index: usize) -> Result<Address> {
        if index >= self.items.len() {
            return Err(Error::InvalidArgumentValue(format!(
                "address index {index} out of range ({} entries)",
                self.items.len()
            )));
        }
        Ok(self.items.remove(index))
    }

    /// Removes every address.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Position of the first entry whose `user@server` matches, ignoring case.
    #[must_use]
    pub fn find(&self, address: &str) -> Option<usize> {
        self.items
            .iter()
            .position(|a| a.address().eq_ignore_ascii_case(address.trim()))
    }

    /// Iterates in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Address> {
        self.items.iter()
    }

    /// Converts every entry to a header mailbox.
    pub(crate) fn to_wire(&self) -> Result<Vec<Mailbox>> {
        self.items.iter().map(Address::to_wire).collect()
    }
}

impl<'a> IntoIterator for &'a Addresses {
    type Item = &'a Address;
    type IntoIter = std::slice::Iter<'a, Address>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl FromIterator<Address> for Addresses {
    fn from_iter<T: IntoIterator<Item = Address>>(iter: T) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}
