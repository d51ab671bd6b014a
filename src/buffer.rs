//! Circular buffer of serialized event records.
//!
//! Fixed-capacity FIFO holding the most recent records pushed into a channel.
//! When full, pushing overwrites the oldest entry. Serialization produces one
//! JSON array string preserving insertion order, which is what a channel
//! publishes each time its batch gate opens.

use std::collections::VecDeque;
use tracing::warn;

/// Fixed-capacity FIFO of serialized records with overwrite-oldest-on-full
/// semantics.
#[derive(Debug)]
pub struct EventBuffer {
    records: VecDeque<String>,
    capacity: usize,
}

impl EventBuffer {
    /// Create a buffer retaining at most `capacity` records.
    pub fn new(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a record, evicting the oldest one when full.
    pub fn push(&mut self, record: String) {
        if self.capacity == 0 {
            return;
        }
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    /// Number of records currently held.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when no records are held.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Serialize the current contents to a JSON array string in insertion
    /// order.
    pub fn serialize(&self) -> String {
        serde_json::to_string(&self.records).unwrap_or_else(|e| {
            warn!("failed to serialize event buffer: {}", e);
            "[]".to_string()
        })
    }

    /// Iterate records oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.records.iter()
    }
}
