// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Collects the most recent matching log entries into caller-owned rows.
//!
//! The harvester keeps a ring of the last `limit` formatted rows. The ring
//! lives inside the output slice itself, in `out[1..=limit]`, so a harvest
//! needs neither heap allocation nor a large stack buffer. When the search
//! ends the ring is rotated into place:
//!
//! - at most `limit` rows seen: `out[0..count]` in arrival order.
//! - more than `limit` rows seen: `out[0]` is the `"..."` marker and
//!   `out[1..=limit]` holds the newest `limit` rows, oldest first.
//!
//! Harvesting runs at crash time, so it emits no diagnostics.

use crashlog_async_safe::Severity;

use crate::record::{LogLine, LogRow, WRAP_MARKER};
use crate::store::{LogEntry, LogQuery, LogStore};

/// Upper bound on the number of rows a single harvest retains.
pub const MAX_LOG_ROWS: usize = 1000;

/// Outcome of a [`harvest`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Harvest {
    /// Number of valid rows at the front of the output slice.
    pub count: usize,
    /// Older rows were dropped and `out[0]` holds the `"..."` marker.
    pub wrapped: bool,
}

/// Effective ring size for a requested `limit` and an output of `out_len` rows.
pub fn effective_limit(limit: usize, out_len: usize) -> usize {
    limit.min(MAX_LOG_ROWS).min(out_len.saturating_sub(1))
}

/// Harvests up to `limit` of the newest entries with `Level <= max_severity`
/// and, when given, a `Sender` equal to `sender`.
///
/// A failing store yields an empty harvest. Entries without a valid level
/// are skipped.
pub fn harvest<S: LogStore + ?Sized>(
    store: &S,
    max_severity: Severity,
    sender: Option<&[u8]>,
    limit: usize,
    out: &mut [LogRow],
) -> Harvest {
    let limit = effective_limit(limit, out.len());
    if limit == 0 {
        return Harvest::default();
    }

    let query = LogQuery::new(max_severity, sender);
    let ring = &mut out[1..=limit];
    let mut seen = 0usize;
    let mut next = 0usize;

    let result = store.search(&query, &mut |entry: &dyn LogEntry| {
        let line = LogLine::decode(entry);
        if line.format_into(&mut ring[next]) {
            seen += 1;
            next = (next + 1) % limit;
        }
    });
    if result.is_err() {
        return Harvest::default();
    }

    if seen > limit {
        ring.rotate_left(next);
        out[0] = LogRow::from_text(WRAP_MARKER);
        Harvest {
            count: limit + 1,
            wrapped: true,
        }
    } else {
        out[..=seen].rotate_left(1);
        out[seen].clear();
        Harvest {
            count: seen,
            wrapped: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LogStoreError;
    use crate::store::{MemoryLogStore, StoredEntry};
    use tracing_test::traced_test;

    fn store_with(messages: &[&str]) -> MemoryLogStore {
        let store = MemoryLogStore::new(64);
        for (i, message) in messages.iter().enumerate() {
            store
                .record_message(i as u64, 100, "app", Severity::Error, message)
                .unwrap();
        }
        store
    }

    fn message_of(row: &LogRow) -> String {
        let text = row.to_string_lossy();
        text.rsplit(": ").next().unwrap_or_default().to_string()
    }

    fn texts(out: &[LogRow], h: Harvest) -> Vec<String> {
        out[..h.count]
            .iter()
            .map(|row| {
                if row.is_wrap_marker() {
                    "...".to_string()
                } else {
                    message_of(row)
                }
            })
            .collect()
    }

    struct FailingStore;

    impl LogStore for FailingStore {
        fn search(
            &self,
            _query: &LogQuery<'_>,
            _sink: &mut dyn FnMut(&dyn LogEntry),
        ) -> Result<(), LogStoreError> {
            Err(LogStoreError::Unavailable("no log service"))
        }
    }

    #[test]
    fn test_fewer_than_limit() {
        let store = store_with(&["one", "two"]);
        let mut out = vec![LogRow::EMPTY; 6];
        let h = harvest(&store, Severity::Debug, None, 5, &mut out);

        assert_eq!(
            h,
            Harvest {
                count: 2,
                wrapped: false
            }
        );
        assert_eq!(texts(&out, h), vec!["one", "two"]);
        assert_eq!(out[2], LogRow::EMPTY);
    }

    #[test]
    fn test_exactly_limit_is_not_wrapped() {
        let store = store_with(&["a", "b", "c"]);
        let mut out = vec![LogRow::EMPTY; 4];
        let h = harvest(&store, Severity::Debug, None, 3, &mut out);

        assert!(!h.wrapped);
        assert_eq!(texts(&out, h), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_wrap_keeps_newest_in_order() {
        let store = store_with(&["1", "2", "3", "4", "5"]);
        let mut out = vec![LogRow::EMPTY; 4];
        let h = harvest(&store, Severity::Debug, None, 3, &mut out);

        assert_eq!(
            h,
            Harvest {
                count: 4,
                wrapped: true
            }
        );
        assert_eq!(texts(&out, h), vec!["...", "3", "4", "5"]);
    }

    #[test]
    fn test_wrap_multiple_laps() {
        let messages: Vec<String> = (0..11).map(|i| i.to_string()).collect();
        let refs: Vec<&str> = messages.iter().map(String::as_str).collect();
        let store = store_with(&refs);
        let mut out = vec![LogRow::EMPTY; 5];
        let h = harvest(&store, Severity::Debug, None, 4, &mut out);

        assert_eq!(texts(&out, h), vec!["...", "7", "8", "9", "10"]);
    }

    #[test]
    fn test_limit_clamped_to_output() {
        let store = store_with(&["a", "b", "c", "d"]);
        let mut out = vec![LogRow::EMPTY; 3];
        let h = harvest(&store, Severity::Debug, None, 100, &mut out);

        assert_eq!(texts(&out, h), vec!["...", "c", "d"]);
        assert_eq!(effective_limit(5000, 5000), MAX_LOG_ROWS);
    }

    #[test]
    fn test_zero_limit_or_tiny_output() {
        let store = store_with(&["a"]);
        let mut out = vec![LogRow::EMPTY; 4];
        assert_eq!(
            harvest(&store, Severity::Debug, None, 0, &mut out),
            Harvest::default()
        );

        let mut one = vec![LogRow::EMPTY; 1];
        assert_eq!(
            harvest(&store, Severity::Debug, None, 5, &mut one),
            Harvest::default()
        );
        assert_eq!(
            harvest(&store, Severity::Debug, None, 5, &mut []),
            Harvest::default()
        );
    }

    #[test]
    fn test_filters_are_applied() {
        let store = MemoryLogStore::new(8);
        store
            .record_message(1, 1, "app", Severity::Critical, "crit")
            .unwrap();
        store
            .record_message(2, 2, "other", Severity::Alert, "alert")
            .unwrap();
        store
            .record_message(3, 1, "app", Severity::Debug, "debug")
            .unwrap();

        let mut out = vec![LogRow::EMPTY; 8];
        let h = harvest(&store, Severity::Error, Some(b"app"), 7, &mut out);
        assert_eq!(texts(&out, h), vec!["crit"]);

        let h = harvest(&store, Severity::Error, Some(b""), 7, &mut out);
        assert_eq!(texts(&out, h), vec!["crit", "alert"]);
    }

    #[test]
    fn test_row_layout() {
        let store = MemoryLogStore::new(2);
        store
            .record_message(1_709_210_096, 4242, "MyApp", Severity::Warning, "low disk")
            .unwrap();
        let mut out = vec![LogRow::EMPTY; 2];
        let h = harvest(&store, Severity::Debug, None, 1, &mut out);

        assert_eq!(h.count, 1);
        assert_eq!(
            out[0].to_string_lossy(),
            "2024-02-29 12:34:56 MyApp[4242] <Warning>: low disk"
        );
    }

    #[test]
    fn test_invalid_levels_are_skipped() {
        let store = MemoryLogStore::new(8);
        store
            .record(
                StoredEntry::new()
                    .with_field("Level", "-2")
                    .with_field("Message", "bad"),
            )
            .unwrap();
        store
            .record_message(1, 1, "app", Severity::Info, "good")
            .unwrap();

        let mut out = vec![LogRow::EMPTY; 4];
        let h = harvest(&store, Severity::Debug, None, 3, &mut out);
        assert_eq!(texts(&out, h), vec!["good"]);
    }

    #[test]
    fn test_store_failure_is_empty() {
        let mut out = vec![LogRow::EMPTY; 4];
        let h = harvest(&FailingStore, Severity::Debug, None, 3, &mut out);
        assert_eq!(h, Harvest::default());
        assert!(out.iter().all(|row| *row == LogRow::EMPTY));
    }

    #[test]
    #[traced_test]
    fn test_harvest_emits_no_diagnostics() {
        let store = MemoryLogStore::new(8);
        store
            .record(StoredEntry::new().with_field("Message", "no level"))
            .unwrap();
        for message in ["1", "2", "3"] {
            store
                .record_message(1, 1, "app", Severity::Error, message)
                .unwrap();
        }

        let mut out = vec![LogRow::EMPTY; 3];
        assert!(harvest(&store, Severity::Debug, None, 2, &mut out).wrapped);
        assert_eq!(
            harvest(&FailingStore, Severity::Debug, None, 2, &mut out),
            Harvest::default()
        );

        logs_assert(|lines: &[&str]| match lines.len() {
            0 => Ok(()),
            n => Err(format!("{n} lines logged while harvesting")),
        });
    }
}
