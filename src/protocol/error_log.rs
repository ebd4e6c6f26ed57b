//! Bounded log of error reports received from the boards

use super::packet::ErrorReport;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// What happens when a report arrives and the log is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    /// Drop the oldest entry to make room
    #[default]
    Wrap,
    /// Keep existing entries, drop the new report
    Reject,
}

/// One logged error report and who sent it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorEntry {
    /// Board that sent the report
    pub reporter: u8,
    pub report: ErrorReport,
}

/// Ordered, bounded sequence of error reports
#[derive(Debug, Clone)]
pub struct ErrorLog {
    entries: VecDeque<ErrorEntry>,
    capacity: usize,
    policy: OverflowPolicy,
    /// Reports dropped because of the capacity bound
    dropped: u64,
}

impl ErrorLog {
    pub fn new(capacity: usize, policy: OverflowPolicy) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            policy,
            dropped: 0,
        }
    }

    /// Append a report; returns false if it was not stored
    pub fn push(&mut self, entry: ErrorEntry) -> bool {
        if self.capacity == 0 {
            self.dropped += 1;
            return false;
        }

        if self.entries.len() == self.capacity {
            self.dropped += 1;
            match self.policy {
                OverflowPolicy::Wrap => {
                    self.entries.pop_front();
                }
                OverflowPolicy::Reject => return false,
            }
        }

        self.entries.push_back(entry);
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Entries from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &ErrorEntry> {
        self.entries.iter()
    }

    pub fn last(&self) -> Option<&ErrorEntry> {
        self.entries.back()
    }
}
