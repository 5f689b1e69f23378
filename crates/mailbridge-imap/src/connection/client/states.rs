//! Connection states.

use crate::parser::UntaggedResponse;
use crate::types::{Mailbox, MailboxStatus};

/// Connected, greeting read, not logged in.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotAuthenticated;

/// Logged in, no mailbox selected.
#[derive(Debug, Clone, Copy, Default)]
pub struct Authenticated;

/// States in which the connection is logged in.
pub trait LoggedIn {}

impl LoggedIn for Authenticated {}

impl LoggedIn for Selected {}

/// A mailbox is selected.
#[derive(Debug, Clone)]
pub struct Selected {
    pub(crate) mailbox: Mailbox,
    pub(crate) status: MailboxStatus,
}

impl Selected {
    /// Name of the selected mailbox.
    #[must_use]
    pub const fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    /// Status as of the last server update.
    #[must_use]
    pub const fn status(&self) -> &MailboxStatus {
        &self.status
    }

    /// Applies EXISTS, RECENT and EXPUNGE updates.
    pub(crate) fn absorb(&mut self, responses: &[UntaggedResponse]) {
        for response in responses {
            match response {
                UntaggedResponse::Exists(n) => self.status.exists = *n,
                UntaggedResponse::Recent(n) => self.status.recent = *n,
                UntaggedResponse::Expunge(_) => {
                    self.status.exists = self.status.exists.saturating_sub(1);
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::SeqNum;

    #[test]
    fn test_absorb_tracks_count() {
        let mut selected = Selected {
            mailbox: Mailbox::inbox(),
            status: MailboxStatus {
                exists: 3,
                ..MailboxStatus::default()
            },
        };
        selected.absorb(&[
            UntaggedResponse::Expunge(SeqNum::new(2).unwrap()),
            UntaggedResponse::Expunge(SeqNum::new(2).unwrap()),
        ]);
        assert_eq!(selected.status().exists, 1);
        selected.absorb(&[UntaggedResponse::Exists(5), UntaggedResponse::Recent(1)]);
        assert_eq!(selected.status().exists, 5);
        assert_eq!(selected.status().recent, 1);
    }
}
