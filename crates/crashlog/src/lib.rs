// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! # crashlog
//!
//! Captures the tail of the process log at crash time and hands it to the next
//! launch.
//!
//! ## Overview
//!
//! When a process faults, the most useful context is often what it logged
//! just before. This crate:
//!
//! 1. queries a [`store::LogStore`] for the newest entries at or above a
//!    severity, optionally from a single sender,
//! 2. renders each one into a fixed 512-byte [`record::LogRow`],
//! 3. writes the rows to a flat file that survives the crash.
//!
//! Steps 2 and 3 work in a row buffer allocated at startup, render with the
//! signal-safe primitives from `crashlog_async_safe`, and emit no
//! diagnostics. Whether searching allocates is up to the
//! [`store::LogStore`] implementation. On the next launch the rows are read
//! back and a watermark file records how far processing has got.
//!
//! ## Modules
//!
//! - [`record`]: row layout and entry decoding
//! - [`store`]: the log store contract and an in-memory store
//! - [`harvest`]: ring-buffered collection of the newest rows
//! - [`persist`]: row and watermark files
//! - [`capture`]: configuration-driven harvest and persist
//! - [`config`]: capture settings
//! - [`logger`]: formatter for the crate's own diagnostics
//! - [`ffi`]: C bindings
//!
//! ## Example
//!
//! ```no_run
//! use crashlog::capture::Capture;
//! use crashlog::config::CaptureConfig;
//! use crashlog::store::MemoryLogStore;
//! use crashlog::Severity;
//!
//! let capture = Capture::new(CaptureConfig {
//!     max_severity: Severity::Warning,
//!     limit: 200,
//!     ..Default::default()
//! })?;
//! let store = MemoryLogStore::default();
//! let mut rows = capture.row_buffer();
//!
//! // At crash time:
//! let harvested = capture.run(&store, &mut rows)?;
//! # let _ = harvested;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(clippy::all)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(unused_extern_crates)]
#![deny(unused_allocation)]
#![deny(missing_copy_implementations)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod capture;
pub mod config;
pub mod error;
pub mod ffi;
pub mod harvest;
pub mod logger;
pub mod persist;
pub mod record;
pub mod store;

pub use crashlog_async_safe::Severity;
pub use error::{ConfigError, LogStoreError, PersistError};
pub use harvest::{harvest, Harvest, MAX_LOG_ROWS};
pub use record::{LogLine, LogRow, LOG_ROW_LEN, WRAP_MARKER};
