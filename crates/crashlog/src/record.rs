// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Fixed-width log rows and the decoder that builds them.
//!
//! A [`LogRow`] is a 512-byte NUL-terminated text record. Rows are what the
//! harvester produces and what the persistence layer writes verbatim, so the
//! layout is part of the on-disk format:
//!
//! ```text
//! 2024-02-29 12:34:56 MyApp[4242] <Error>: something went wrong
//! └── timestamp ───┘ └sender┘└pid┘ └level┘  └── message ──────┘
//! ```
//!
//! All formatting goes through `crashlog_async_safe`, so building a row never
//! allocates.

use std::borrow::Cow;
use std::fmt;

use crashlog_async_safe::{
    epoch_to_utc, format_i32, parse_i32, parse_u64, str_bytes, str_compare, str_concat, str_copy,
    str_len, Severity, MAX_FORMATTED_LEN,
};

use crate::store::LogEntry;

/// Size of one persisted row, terminator included.
pub const LOG_ROW_LEN: usize = 512;

/// Capacity of the timestamp field, terminator included.
pub const TIMESTAMP_FIELD_LEN: usize = 64;

/// Capacity of the sender field, terminator included.
pub const SENDER_FIELD_LEN: usize = 64;

/// Capacity of the message field, terminator included.
pub const MESSAGE_FIELD_LEN: usize = 256;

/// Text of the row placed first when older rows were evicted.
pub const WRAP_MARKER: &[u8] = b"...";

pub const KEY_TIME: &[u8] = b"Time";
pub const KEY_PID: &[u8] = b"PID";
pub const KEY_SENDER: &[u8] = b"Sender";
pub const KEY_LEVEL: &[u8] = b"Level";
pub const KEY_MESSAGE: &[u8] = b"Message";

/// One formatted log line in a fixed 512-byte buffer.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct LogRow([u8; LOG_ROW_LEN]);

impl LogRow {
    pub const EMPTY: LogRow = LogRow([0; LOG_ROW_LEN]);

    /// Builds a row holding `text`, truncated to fit.
    pub fn from_text(text: &[u8]) -> Self {
        let mut row = Self::EMPTY;
        str_copy(Some(&mut row.0), Some(text));
        row
    }

    /// Bytes before the terminator.
    pub fn text(&self) -> &[u8] {
        str_bytes(&self.0)
    }

    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.text())
    }

    /// True for the `"..."` row that flags an evicting harvest.
    pub fn is_wrap_marker(&self) -> bool {
        self.text() == WRAP_MARKER
    }

    pub fn clear(&mut self) {
        self.0 = [0; LOG_ROW_LEN];
    }

    pub fn as_bytes(&self) -> &[u8; LOG_ROW_LEN] {
        &self.0
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8; LOG_ROW_LEN] {
        &mut self.0
    }
}

impl Default for LogRow {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Debug for LogRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LogRow").field(&self.to_string_lossy()).finish()
    }
}

/// Appends `text` to the NUL-terminated contents of `row`.
fn push(row: &mut [u8], text: &[u8]) {
    str_concat(Some(row), Some(text));
}

/// Decoded fields of a single log entry, each in its own fixed buffer.
///
/// Unknown keys are ignored; a repeated key overwrites the earlier value.
#[derive(Clone, Copy)]
pub struct LogLine {
    level: Option<i32>,
    pid: i32,
    timestamp: [u8; TIMESTAMP_FIELD_LEN],
    sender: [u8; SENDER_FIELD_LEN],
    message: [u8; MESSAGE_FIELD_LEN],
}

impl Default for LogLine {
    fn default() -> Self {
        Self {
            level: None,
            pid: 0,
            timestamp: [0; TIMESTAMP_FIELD_LEN],
            sender: [0; SENDER_FIELD_LEN],
            message: [0; MESSAGE_FIELD_LEN],
        }
    }
}

impl LogLine {
    /// Decodes every recognised field of `entry`.
    pub fn decode(entry: &dyn LogEntry) -> Self {
        let mut line = Self::default();
        entry.for_each_field(&mut |key, value| line.apply_field(key, value));
        line
    }

    /// Applies one key/value pair.
    pub fn apply_field(&mut self, key: &[u8], value: &[u8]) {
        let key = Some(key);
        if str_compare(key, Some(KEY_TIME)) == 0 {
            // Unrepresentable epochs leave the timestamp empty
            let secs = i64::try_from(parse_u64(Some(value))).unwrap_or(-1);
            epoch_to_utc(secs, Some(&mut self.timestamp));
        } else if str_compare(key, Some(KEY_PID)) == 0 {
            self.pid = parse_i32(Some(value));
        } else if str_compare(key, Some(KEY_SENDER)) == 0 {
            str_copy(Some(&mut self.sender), Some(value));
        } else if str_compare(key, Some(KEY_LEVEL)) == 0 {
            self.level = Some(parse_i32(Some(value)));
        } else if str_compare(key, Some(KEY_MESSAGE)) == 0 {
            self.set_message(value);
        }
    }

    fn set_message(&mut self, value: &[u8]) {
        let len = str_len(Some(value));
        str_copy(Some(&mut self.message), Some(value));
        if len > MESSAGE_FIELD_LEN - 1 {
            let end = MESSAGE_FIELD_LEN - 1;
            self.message[end - WRAP_MARKER.len()..end].copy_from_slice(WRAP_MARKER);
        }
    }

    /// Severity of the entry, `None` when the level is missing or not 0-7.
    pub fn severity(&self) -> Option<Severity> {
        self.level.and_then(Severity::from_level)
    }

    pub fn pid(&self) -> i32 {
        self.pid
    }

    pub fn timestamp(&self) -> &[u8] {
        str_bytes(&self.timestamp)
    }

    pub fn sender(&self) -> &[u8] {
        str_bytes(&self.sender)
    }

    pub fn message(&self) -> &[u8] {
        str_bytes(&self.message)
    }

    /// Renders `"<timestamp> <sender>[<pid>] <<level>>: <message>"` into `row`.
    ///
    /// Returns `false` and leaves `row` untouched when the line has no usable
    /// severity.
    pub fn format_into(&self, row: &mut LogRow) -> bool {
        let Some(severity) = self.severity() else {
            return false;
        };

        let mut pid = [0u8; MAX_FORMATTED_LEN];
        let pid = format_i32(self.pid, Some(&mut pid)).unwrap_or("0");

        row.clear();
        let row = row.as_bytes_mut();
        push(row, self.timestamp());
        push(row, b" ");
        push(row, self.sender());
        push(row, b"[");
        push(row, pid.as_bytes());
        push(row, b"] <");
        push(row, severity.name().as_bytes());
        push(row, b">: ");
        push(row, self.message());
        true
    }
}

impl fmt::Debug for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogLine")
            .field("level", &self.level)
            .field("pid", &self.pid)
            .field("timestamp", &String::from_utf8_lossy(self.timestamp()))
            .field("sender", &String::from_utf8_lossy(self.sender()))
            .field("message", &String::from_utf8_lossy(self.message()))
            .finish()
    }
}
