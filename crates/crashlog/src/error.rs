// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::io;

/// Errors from the row and watermark files.
///
/// Every variant maps to a stable negative code via [`PersistError::code`],
/// which is what the C ABI returns.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("Failed to open file: {0}")]
    Open(#[source] io::Error),

    #[error("Failed to write file: {0}")]
    Write(#[source] io::Error),

    #[error("Failed to read row count header: {0}")]
    ShortHeader(#[source] io::Error),

    #[error("Row count header holds a negative count: {0}")]
    InvalidHeader(i32),

    #[error("Failed to read payload: {0}")]
    ShortPayload(#[source] io::Error),

    #[error("File holds {count} rows but the buffer only fits {capacity}")]
    CapacityExceeded { count: usize, capacity: usize },
}

impl PersistError {
    pub const INVALID_ARGUMENT: i32 = -1;
    pub const OPEN_FAILED: i32 = -2;
    pub const WRITE_FAILED: i32 = -3;
    pub const HEADER_FAILED: i32 = -4;
    pub const PAYLOAD_FAILED: i32 = -5;
    pub const CAPACITY_EXCEEDED: i32 = -6;

    /// Negative code reported across the C boundary.
    pub fn code(&self) -> i32 {
        match self {
            PersistError::InvalidArgument(_) => Self::INVALID_ARGUMENT,
            PersistError::Open(_) => Self::OPEN_FAILED,
            PersistError::Write(_) => Self::WRITE_FAILED,
            PersistError::ShortHeader(_) | PersistError::InvalidHeader(_) => Self::HEADER_FAILED,
            PersistError::ShortPayload(_) => Self::PAYLOAD_FAILED,
            PersistError::CapacityExceeded { .. } => Self::CAPACITY_EXCEEDED,
        }
    }

    /// True when the file simply does not exist yet.
    pub fn is_not_found(&self) -> bool {
        matches!(self, PersistError::Open(e) if e.kind() == io::ErrorKind::NotFound)
    }
}

/// Errors surfaced by a [`LogStore`](crate::store::LogStore) query.
///
/// The harvester turns all of these into an empty result.
#[derive(Debug, thiserror::Error)]
pub enum LogStoreError {
    #[error("Log store unavailable: {0}")]
    Unavailable(&'static str),

    #[error("Log store is busy")]
    Busy,

    #[error("Log query failed: {0}")]
    Query(String),
}

/// Errors that can occur when loading or validating a capture configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}
