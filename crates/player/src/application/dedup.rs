//! Bounded window of recently seen broadcast ids.

use std::collections::{HashSet, VecDeque};

use hearthlink_shared::MessageId;

pub const DEFAULT_HIGH_WATER: usize = 200;
pub const DEFAULT_RETAIN: usize = 150;

/// Insertion-ordered id set. Once it grows past `high_water` the oldest
/// entries are evicted until `retain` remain.
#[derive(Debug)]
pub struct DedupWindow {
    order: VecDeque<MessageId>,
    seen: HashSet<MessageId>,
    high_water: usize,
    retain: usize,
}

impl Default for DedupWindow {
    fn default() -> Self {
        Self::new(DEFAULT_HIGH_WATER, DEFAULT_RETAIN)
    }
}

impl DedupWindow {
    pub fn new(high_water: usize, retain: usize) -> Self {
        let retain = retain.min(high_water);
        Self {
            order: VecDeque::with_capacity(high_water + 1),
            seen: HashSet::with_capacity(high_water + 1),
            high_water,
            retain,
        }
    }

    pub fn contains(&self, id: &MessageId) -> bool {
        self.seen.contains(id)
    }

    /// Record `id`. Returns false if it was already in the window.
    pub fn insert(&mut self, id: MessageId) -> bool {
        if !self.seen.insert(id.clone()) {
            return false;
        }
        self.order.push_back(id);

        if self.order.len() > self.high_water {
            while self.order.len() > self.retain {
                if let Some(oldest) = self.order.pop_front() {
                    self.seen.remove(&oldest);
                }
            }
        }
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.seen.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_rejected() {
        let mut window = DedupWindow::default();
        assert!(window.insert(MessageId::Number(1)));
        assert!(!window.insert(MessageId::Number(1)));
        assert_eq!(window.len(), 1);
    }

    #[test]
    fn test_number_and_text_ids_are_distinct() {
        let mut window = DedupWindow::default();
        assert!(window.insert(MessageId::Number(7)));
        assert!(window.insert(MessageId::Text("7".into())));
    }

    #[test]
    fn test_trims_to_retain_after_high_water() {
        let mut window = DedupWindow::default();
        for n in 0..=200u64 {
            window.insert(MessageId::Number(n));
        }
        assert_eq!(window.len(), 150);
        // Oldest evicted, newest kept.
        assert!(!window.contains(&MessageId::Number(0)));
        assert!(!window.contains(&MessageId::Number(50)));
        assert!(window.contains(&MessageId::Number(51)));
        assert!(window.contains(&MessageId::Number(200)));
    }

    #[test]
    fn test_no_trim_at_high_water() {
        let mut window = DedupWindow::new(4, 2);
        for n in 0..4u64 {
            window.insert(MessageId::Number(n));
        }
        assert_eq!(window.len(), 4);
        window.insert(MessageId::Number(4));
        assert_eq!(window.len(), 2);
        assert!(window.contains(&MessageId::Number(3)));
        assert!(window.contains(&MessageId::Number(4)));
    }

    #[test]
    fn test_clear() {
        let mut window = DedupWindow::default();
        window.insert(MessageId::Number(1));
        window.clear();
        assert!(window.is_empty());
        assert!(window.insert(MessageId::Number(1)));
    }
}
