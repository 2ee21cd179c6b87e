use serde::Serialize;
use std::collections::VecDeque;

/// Fixed-capacity FIFO log; the oldest entry is evicted on overflow
#[derive(Debug, Clone)]
pub struct BoundedLog<T> {
    items: VecDeque<T>,
    capacity: usize,
}

// Larger logs grow on demand instead of reserving everything up front
const PREALLOC_LIMIT: usize = 1024;

impl<T: Clone> BoundedLog<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity.min(PREALLOC_LIMIT)),
            capacity,
        }
    }

    /// Append, evicting the oldest item when full
    pub fn push(&mut self, item: T) {
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    /// Most recent `limit` entries, oldest first (0 or > len returns all)
    pub fn recent(&self, limit: usize) -> Vec<T> {
        let skip = if limit == 0 || limit >= self.items.len() {
            0
        } else {
            self.items.len() - limit
        };
        self.items.iter().skip(skip).cloned().collect()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl<T: Serialize> Serialize for BoundedLog<T> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.items.iter())
    }
}
