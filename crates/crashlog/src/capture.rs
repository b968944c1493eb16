// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! One-stop crash capture.
//!
//! [`Capture`] ties a validated [`CaptureConfig`] to the harvester and the
//! persistence layer. The expected life cycle is:
//!
//! 1. At startup: build a `Capture`, which also installs the diagnostics
//!    subscriber at the configured `log_level`, and allocate its row buffer
//!    with [`Capture::row_buffer`].
//! 2. At crash time: [`Capture::run`] harvests the newest matching entries and
//!    writes them to the row file. This step emits no diagnostics.
//! 3. On the next launch: [`Capture::load`] reads the rows back for upload,
//!    and [`Capture::advance_watermark`] records how far processing got.

use tracing::warn;

use crate::config::CaptureConfig;
use crate::error::{ConfigError, PersistError};
use crate::harvest::{harvest, Harvest};
use crate::logger;
use crate::persist;
use crate::record::LogRow;
use crate::store::LogStore;

#[derive(Debug, Clone)]
pub struct Capture {
    config: CaptureConfig,
}

impl Capture {
    pub fn new(config: CaptureConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        logger::init(config.log_level);
        Ok(Self { config })
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// A buffer large enough for a full harvest, wrap marker included.
    pub fn row_buffer(&self) -> Vec<LogRow> {
        vec![LogRow::EMPTY; self.config.limit + 1]
    }

    /// Harvests matching entries from `store` into `rows`.
    pub fn harvest<S: LogStore + ?Sized>(&self, store: &S, rows: &mut [LogRow]) -> Harvest {
        harvest(
            store,
            self.config.max_severity,
            self.config.sender_filter(),
            self.config.limit,
            rows,
        )
    }

    /// Writes `rows` to the configured row file.
    pub fn persist(&self, rows: &[LogRow]) -> Result<usize, PersistError> {
        persist::write_rows(&self.config.rows_path, rows)
    }

    /// Harvests and persists in one step.
    ///
    /// An empty harvest leaves any existing row file in place.
    pub fn run<S: LogStore + ?Sized>(
        &self,
        store: &S,
        rows: &mut [LogRow],
    ) -> Result<Harvest, PersistError> {
        let result = self.harvest(store, rows);
        if result.count == 0 {
            return Ok(result);
        }
        self.persist(&rows[..result.count])?;
        Ok(result)
    }

    /// Reads the configured row file into `rows`.
    pub fn load(&self, rows: &mut [LogRow]) -> Result<usize, PersistError> {
        persist::read_rows(&self.config.rows_path, rows)
    }

    /// Current watermark, `0` when none has been stored yet.
    pub fn watermark(&self) -> Result<u64, PersistError> {
        match persist::read_watermark(&self.config.watermark_path) {
            Err(e) if e.is_not_found() => Ok(0),
            other => other,
        }
    }

    /// Stores `value` if it is newer than the current watermark.
    ///
    /// Returns whether the file was written. A truncated watermark file is
    /// treated as `0` and replaced.
    pub fn advance_watermark(&self, value: u64) -> Result<bool, PersistError> {
        let current = match self.watermark() {
            Ok(current) => current,
            Err(e @ PersistError::ShortPayload(_)) => {
                warn!("Replacing unreadable watermark file: {}", e);
                0
            }
            Err(e) => return Err(e),
        };
        if value <= current {
            return Ok(false);
        }
        persist::write_watermark(&self.config.watermark_path, value)?;
        Ok(true)
    }
}
