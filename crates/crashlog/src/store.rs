// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The log store contract and a bounded in-process implementation.
//!
//! The harvester never talks to a concrete log service. It issues a
//! [`LogQuery`] against anything implementing [`LogStore`] and receives each
//! matching entry as a [`LogEntry`], a bag of key/value byte strings.
//!
//! # Recognised keys
//!
//! | key       | value                      |
//! |-----------|----------------------------|
//! | `Time`    | epoch seconds, decimal     |
//! | `PID`     | process id, decimal        |
//! | `Sender`  | process name               |
//! | `Level`   | severity 0-7               |
//! | `Message` | free text                  |
//!
//! # Memory store
//!
//! [`MemoryLogStore`] keeps the most recent entries in a FIFO queue. When the
//! queue is full the oldest entry is evicted with a warning, the same policy
//! the batching aggregators use for their queues. Queries use `try_lock` so a
//! harvest that interrupts a writer holding the lock gets
//! [`LogStoreError::Busy`] rather than blocking forever.

use std::collections::VecDeque;
use std::sync::Mutex;

use crashlog_async_safe::{format_i32, format_u64, parse_i32, Severity, MAX_FORMATTED_LEN};
use tracing::warn;

use crate::error::LogStoreError;
use crate::record::{KEY_LEVEL, KEY_MESSAGE, KEY_PID, KEY_SENDER, KEY_TIME};

/// Default number of entries kept by [`MemoryLogStore::default`].
pub const DEFAULT_STORE_CAPACITY: usize = 4096;

/// Filter applied by a [`LogStore`] search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogQuery<'a> {
    /// Least severe level still returned. Entries match when `Level <= max_severity`.
    pub max_severity: Severity,
    /// Exact `Sender` to match, `None` for every sender.
    pub sender: Option<&'a [u8]>,
}

impl<'a> LogQuery<'a> {
    /// An empty sender means no sender filter.
    pub fn new(max_severity: Severity, sender: Option<&'a [u8]>) -> Self {
        Self {
            max_severity,
            sender: sender.filter(|s| !s.is_empty()),
        }
    }

    /// Applies the query to an already-decoded level and sender.
    pub fn matches(&self, level: Option<i32>, sender: Option<&[u8]>) -> bool {
        let level_ok = level.is_some_and(|l| l <= self.max_severity.level());
        let sender_ok = match self.sender {
            Some(wanted) => sender == Some(wanted),
            None => true,
        };
        level_ok && sender_ok
    }
}

/// One entry returned by a store.
pub trait LogEntry {
    /// Calls `visit` once per key/value pair of the entry.
    fn for_each_field(&self, visit: &mut dyn FnMut(&[u8], &[u8]));
}

/// A queryable source of log entries.
pub trait LogStore {
    /// Delivers every entry matching `query` to `sink`, oldest first.
    fn search(
        &self,
        query: &LogQuery<'_>,
        sink: &mut dyn FnMut(&dyn LogEntry),
    ) -> Result<(), LogStoreError>;
}

/// Owned key/value entry as kept by [`MemoryLogStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredEntry {
    fields: Vec<(Vec<u8>, Vec<u8>)>,
}

impl StoredEntry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field, replacing any earlier value under the same key.
    pub fn with_field(mut self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Self {
        let key = key.as_ref();
        let value = value.as_ref().to_vec();
        match self.fields.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value,
            None => self.fields.push((key.to_vec(), value)),
        }
        self
    }

    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_slice())
    }

    fn level(&self) -> Option<i32> {
        self.get(KEY_LEVEL).map(|v| parse_i32(Some(v)))
    }
}

impl LogEntry for StoredEntry {
    fn for_each_field(&self, visit: &mut dyn FnMut(&[u8], &[u8])) {
        for (key, value) in &self.fields {
            visit(key, value);
        }
    }
}

/// Bounded, mutex-protected in-process log store.
#[derive(Debug)]
pub struct MemoryLogStore {
    entries: Mutex<VecDeque<StoredEntry>>,
    capacity: usize,
}

impl Default for MemoryLogStore {
    fn default() -> Self {
        Self::new(DEFAULT_STORE_CAPACITY)
    }
}

impl MemoryLogStore {
    /// Creates a store holding at most `capacity` entries (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(DEFAULT_STORE_CAPACITY))),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Appends an entry, evicting the oldest one when the store is full.
    pub fn record(&self, entry: StoredEntry) -> Result<(), LogStoreError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| LogStoreError::Unavailable("store mutex poisoned"))?;
        if entries.len() >= self.capacity {
            warn!(
                "Log store is full ({} entries), dropping the oldest entry",
                self.capacity
            );
            entries.pop_front();
        }
        entries.push_back(entry);
        Ok(())
    }

    /// Records an entry carrying all five recognised keys.
    pub fn record_message(
        &self,
        time: u64,
        pid: i32,
        sender: &str,
        severity: Severity,
        message: &str,
    ) -> Result<(), LogStoreError> {
        let mut time_buf = [0u8; MAX_FORMATTED_LEN];
        let mut pid_buf = [0u8; MAX_FORMATTED_LEN];
        let mut level_buf = [0u8; MAX_FORMATTED_LEN];

        let entry = StoredEntry::new()
            .with_field(KEY_TIME, format_u64(time, Some(&mut time_buf)).unwrap_or("0"))
            .with_field(KEY_PID, format_i32(pid, Some(&mut pid_buf)).unwrap_or("0"))
            .with_field(KEY_SENDER, sender)
            .with_field(
                KEY_LEVEL,
                format_i32(severity.level(), Some(&mut level_buf)).unwrap_or("7"),
            )
            .with_field(KEY_MESSAGE, message);
        self.record(entry)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}

impl LogStore for MemoryLogStore {
    fn search(
        &self,
        query: &LogQuery<'_>,
        sink: &mut dyn FnMut(&dyn LogEntry),
    ) -> Result<(), LogStoreError> {
        let entries = self.entries.try_lock().map_err(|e| match e {
            std::sync::TryLockError::WouldBlock => LogStoreError::Busy,
            std::sync::TryLockError::Poisoned(_) => {
                LogStoreError::Unavailable("store mutex poisoned")
            }
        })?;

        for entry in entries.iter() {
            if query.matches(entry.level(), entry.get(KEY_SENDER)) {
                sink(entry);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    fn messages(store: &MemoryLogStore, query: LogQuery<'_>) -> Vec<String> {
        let mut out = Vec::new();
        store
            .search(&query, &mut |entry: &dyn LogEntry| {
                entry.for_each_field(&mut |k, v| {
                    if k == KEY_MESSAGE {
                        out.push(String::from_utf8_lossy(v).into_owned());
                    }
                })
            })
            .unwrap();
        out
    }

    fn seeded() -> MemoryLogStore {
        let store = MemoryLogStore::new(16);
        store
            .record_message(1, 10, "app", Severity::Error, "error")
            .unwrap();
        store
            .record_message(2, 11, "other", Severity::Critical, "critical")
            .unwrap();
        store
            .record_message(3, 10, "app", Severity::Info, "info")
            .unwrap();
        store
    }

    #[test]
    fn test_query_empty_sender_is_no_filter() {
        assert_eq!(LogQuery::new(Severity::Debug, Some(b"")).sender, None);
        assert_eq!(
            LogQuery::new(Severity::Debug, Some(b"app")).sender,
            Some(&b"app"[..])
        );
    }

    #[test]
    fn test_search_filters_by_level() {
        let store = seeded();
        assert_eq!(
            messages(&store, LogQuery::new(Severity::Error, None)),
            vec!["error", "critical"]
        );
        assert_eq!(
            messages(&store, LogQuery::new(Severity::Debug, None)),
            vec!["error", "critical", "info"]
        );
    }

    #[test]
    fn test_search_filters_by_sender() {
        let store = seeded();
        assert_eq!(
            messages(&store, LogQuery::new(Severity::Debug, Some(b"app"))),
            vec!["error", "info"]
        );
        assert!(messages(&store, LogQuery::new(Severity::Debug, Some(b"ap"))).is_empty());
    }

    #[test]
    fn test_entries_without_level_never_match() {
        let store = MemoryLogStore::new(4);
        store
            .record(StoredEntry::new().with_field(KEY_MESSAGE, "orphan"))
            .unwrap();
        assert!(messages(&store, LogQuery::new(Severity::Debug, None)).is_empty());
    }

    #[test]
    #[traced_test]
    fn test_full_store_evicts_oldest() {
        let store = MemoryLogStore::new(2);
        for (i, text) in ["a", "b", "c"].iter().enumerate() {
            store
                .record_message(i as u64, 1, "app", Severity::Info, text)
                .unwrap();
        }

        assert_eq!(store.len(), 2);
        assert_eq!(
            messages(&store, LogQuery::new(Severity::Debug, None)),
            vec!["b", "c"]
        );
        assert!(logs_contain("dropping the oldest entry"));
    }

    #[test]
    fn test_search_while_locked_is_busy() {
        let store = seeded();
        let _guard = store.entries.lock().unwrap();
        let result = store.search(&LogQuery::new(Severity::Debug, None), &mut |_: &dyn LogEntry| {});
        assert!(matches!(result, Err(LogStoreError::Busy)));
    }

    #[test]
    fn test_with_field_replaces() {
        let entry = StoredEntry::new()
            .with_field("Level", "3")
            .with_field("Level", "5");
        assert_eq!(entry.get(b"Level"), Some(&b"5"[..]));
        assert_eq!(entry.level(), Some(5));
    }

    #[test]
    fn test_record_message_fields() {
        let store = MemoryLogStore::new(1);
        store
            .record_message(951_840_000, -7, "svc", Severity::Warning, "hi")
            .unwrap();
        let entries = store.entries.lock().unwrap();
        let entry = &entries[0];
        assert_eq!(entry.get(KEY_TIME), Some(&b"951840000"[..]));
        assert_eq!(entry.get(KEY_PID), Some(&b"-7"[..]));
        assert_eq!(entry.get(KEY_LEVEL), Some(&b"4"[..]));
        assert_eq!(entry.get(KEY_SENDER), Some(&b"svc"[..]));
    }

    #[test]
    fn test_clear_and_capacity() {
        let store = seeded();
        assert!(!store.is_empty());
        store.clear();
        assert!(store.is_empty());
        assert_eq!(MemoryLogStore::new(0).capacity(), 1);
    }
}
