// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! FIFO hand-off buffer between the producer and the worker pool.
//!
//! The queue never blocks and never rejects. Its capacity is advisory: pushing past it is
//! allowed, and [`EntryQueue::is_full`] only tells the workers when to flush. Blocking
//! backpressure lives in [`crate::backpressure`].

use bytes::Bytes;
use std::collections::VecDeque;
use std::sync::Mutex;

/// One log line tagged with its position in the input. Indices start at 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub index: i64,
    pub payload: Bytes,
}

impl Entry {
    pub fn new(index: i64, payload: impl Into<Bytes>) -> Self {
        Self {
            index,
            payload: payload.into(),
        }
    }
}

/// Queue of pending entries. A single lock guards the whole deque, so concurrent push and pop
/// are mutually exclusive.
#[derive(Debug)]
pub struct EntryQueue {
    entries: Mutex<VecDeque<Entry>>,
    capacity: usize,
}

impl EntryQueue {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Appends to the tail. Never rejects, even past capacity.
    pub fn push(&self, entry: Entry) {
        #[allow(clippy::expect_used)]
        let mut entries = self.entries.lock().expect("lock poisoned");
        entries.push_back(entry);
    }

    /// Removes the head, or returns `None` right away if nothing is queued.
    pub fn pop(&self) -> Option<Entry> {
        #[allow(clippy::expect_used)]
        let mut entries = self.entries.lock().expect("lock poisoned");
        entries.pop_front()
    }

    pub fn len(&self) -> usize {
        #[allow(clippy::expect_used)]
        let entries = self.entries.lock().expect("lock poisoned");
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// True when the number of queued entries equals the capacity exactly. Used as the
    /// word-count flush trigger, not as an admission check.
    pub fn is_full(&self) -> bool {
        self.len() == self.capacity
    }
}
