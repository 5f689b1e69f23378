//! Message selectors for batch operations.

use crate::message::Message;

/// Names one or more messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// A server id as returned in [`Message::ids`].
    Id(String),
    /// A 1-based position in the mailbox.
    Sequence(u32),
    /// The ids of a previously returned message.
    Message(Vec<String>),
    /// Any mix of selectors.
    List(Vec<Selector>),
}

impl From<&str> for Selector {
    fn from(id: &str) -> Self {
        Self::Id(id.to_string())
    }
}

impl From<String> for Selector {
    fn from(id: String) -> Self {
        Self::Id(id)
    }
}

impl From<u32> for Selector {
    fn from(sequence: u32) -> Self {
        Self::Sequence(sequence)
    }
}

impl From<&Message> for Selector {
    fn from(message: &Message) -> Self {
        Self::Message(message.ids().to_vec())
    }
}

impl<T: Into<Self>> From<Vec<T>> for Selector {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

/// One flattened selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target<'a> {
    /// A server id.
    Id(&'a str),
    /// A 1-based position.
    Sequence(u32),
}

/// Flattens nested selectors into targets, keeping order.
#[must_use]
pub fn flatten(selectors: &[Selector]) -> Vec<Target<'_>> {
    let mut targets = Vec::new();
    for selector in selectors {
        push_targets(selector, &mut targets);
    }
    targets
}

fn push_targets<'a>(selector: &'a Selector, targets: &mut Vec<Target<'a>>) {
    match selector {
        Selector::Id(id) => targets.push(Target::Id(id)),
        Selector::Sequence(n) => targets.push(Target::Sequence(*n)),
        Selector::Message(ids) => targets.extend(ids.iter().map(|id| Target::Id(id))),
        Selector::List(items) => {
            for item in items {
                push_targets(item, targets);
            }
        }
    }
}
