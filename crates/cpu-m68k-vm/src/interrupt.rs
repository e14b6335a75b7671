//! Pending interrupt requests.

use std::collections::VecDeque;

/// Seven FIFOs of vector numbers, one per priority level 1-7.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterruptQueue {
    levels: [VecDeque<u8>; 7],
}

impl InterruptQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `vector` at `priority`. Returns `false` (and queues nothing)
    /// for a priority outside 1-7.
    pub fn request(&mut self, priority: u8, vector: u8) -> bool {
        if !(1..=7).contains(&priority) {
            return false;
        }
        self.levels[usize::from(priority - 1)].push_back(vector);
        true
    }

    /// Highest non-empty priority.
    #[must_use]
    pub fn highest(&self) -> Option<u8> {
        (1..=7u8).rev().find(|&p| !self.levels[usize::from(p - 1)].is_empty())
    }

    /// Whether the highest pending request beats `mask`. Level 7 is
    /// non-maskable.
    #[must_use]
    pub fn is_pending(&self, mask: u8) -> bool {
        self.highest().is_some_and(|p| p == 7 || p > mask)
    }

    /// Take the oldest request at the highest priority, if it beats `mask`.
    /// Returns `(priority, vector)`.
    pub fn accept(&mut self, mask: u8) -> Option<(u8, u8)> {
        let priority = self.highest().filter(|&p| p == 7 || p > mask)?;
        let vector = self.levels[usize::from(priority - 1)].pop_front()?;
        Some((priority, vector))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.iter().all(VecDeque::is_empty)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.levels.iter().map(VecDeque::len).sum()
    }

    pub fn clear(&mut self) {
        for level in &mut self.levels {
            level.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highest_priority_first_then_fifo() {
        let mut q = InterruptQueue::new();
        q.request(2, 0x40);
        q.request(5, 0x50);
        q.request(5, 0x51);
        assert_eq!(q.accept(0), Some((5, 0x50)));
        assert_eq!(q.accept(0), Some((5, 0x51)));
        assert_eq!(q.accept(0), Some((2, 0x40)));
        assert!(q.is_empty());
    }

    #[test]
    fn mask_blocks_equal_and_lower_levels() {
        let mut q = InterruptQueue::new();
        q.request(3, 27);
        assert!(!q.is_pending(3));
        assert_eq!(q.accept(3), None);
        assert!(q.is_pending(2));
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn level_seven_ignores_mask() {
        let mut q = InterruptQueue::new();
        q.request(7, 31);
        assert!(q.is_pending(7));
        assert_eq!(q.accept(7), Some((7, 31)));
    }

    #[test]
    fn bad_priorities_rejected() {
        let mut q = InterruptQueue::new();
        assert!(!q.request(0, 1));
        assert!(!q.request(8, 1));
        assert!(q.is_empty());
    }
}
