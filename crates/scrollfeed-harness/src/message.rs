#![forbid(unsafe_code)]

//! Chat message fixture.

use scrollfeed::{FeedItem, Links, Timestamp};

/// Milliseconds between consecutive seeded messages.
pub const SEED_SPACING_MS: u64 = 1_000;

/// A chat message with string keys and explicit neighbor links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Unique id.
    pub id: String,
    /// Body text.
    pub content: String,
    /// Creation time.
    pub timestamp: Timestamp,
    /// Id of the message before this one, if any.
    pub prev_id: Option<String>,
    /// Id of the message after this one, if any.
    pub next_id: Option<String>,
}

impl Message {
    /// A message with no declared neighbors.
    #[must_use]
    pub fn new(id: impl Into<String>, content: impl Into<String>, timestamp: Timestamp) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            timestamp,
            prev_id: None,
            next_id: None,
        }
    }

    /// Set the declared neighbors.
    #[must_use]
    pub fn with_links(mut self, prev_id: Option<String>, next_id: Option<String>) -> Self {
        self.prev_id = prev_id;
        self.next_id = next_id;
        self
    }
}

impl FeedItem for Message {
    type Key = String;

    fn key(&self) -> &String {
        &self.id
    }

    fn links(&self) -> Option<Links<String>> {
        Some(Links::new(self.prev_id.clone(), self.next_id.clone()))
    }

    fn timestamp(&self) -> Option<Timestamp> {
        Some(self.timestamp)
    }
}

/// Messages `item-0 ..= item-{count-1}` in display order, oldest first,
/// linked to each other, the last one stamped `newest`.
#[must_use]
pub fn seed_messages(count: usize, newest: Timestamp) -> Vec<Message> {
    (0..count)
        .map(|i| {
            let age = (count - 1 - i) as u64 * SEED_SPACING_MS;
            let ts = Timestamp(newest.as_millis().saturating_sub(age));
            let prev = i.checked_sub(1).map(|p| format!("item-{p}"));
            let next = (i + 1 < count).then(|| format!("item-{}", i + 1));
            Message::new(format!("item-{i}"), format!("Item {i}"), ts).with_links(prev, next)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_are_linked_and_ordered() {
        let msgs = seed_messages(3, Timestamp(10_000));
        assert_eq!(msgs[0].id, "item-0");
        assert_eq!(msgs[0].prev_id, None);
        assert_eq!(msgs[1].prev_id.as_deref(), Some("item-0"));
        assert_eq!(msgs[1].next_id.as_deref(), Some("item-2"));
        assert_eq!(msgs[2].next_id, None);
        assert_eq!(msgs[0].timestamp, Timestamp(8_000));
        assert_eq!(msgs[2].timestamp, Timestamp(10_000));
    }

    #[test]
    fn feed_item_exposes_links_and_time() {
        let m = Message::new("a", "hello", Timestamp(5)).with_links(None, Some("b".into()));
        assert_eq!(m.key(), "a");
        assert_eq!(m.links(), Some(Links::new(None, Some("b".to_string()))));
        assert_eq!(m.timestamp(), Some(Timestamp(5)));
    }
}
