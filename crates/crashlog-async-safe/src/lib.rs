// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Async-signal-safe building blocks for crash-time diagnostics.
//!
//! Everything in this crate may be called after a process has already faulted,
//! typically from inside a signal handler. To make that possible the crate:
//!
//! - never allocates (it is `no_std` and does not link `alloc`),
//! - never calls into libc or the Rust standard library,
//! - never panics: every slice access is bounds-checked by construction and
//!   arithmetic that could overflow wraps or saturates.
//!
//! Optional C pointers are modelled as `Option` so that a "null" argument
//! yields a documented degraded result instead of a fault.
//!
//! # Modules
//!
//! - [`mem`]: byte-wise set / copy / compare
//! - [`string`]: NUL-terminated string length, copy, concat, compare
//! - [`number`]: permissive integer parsing and decimal formatting
//! - [`time`]: epoch seconds to `YYYY-MM-DD HH:MM:SS` (UTC)
//! - [`severity`]: the fixed 0-7 severity table

#![cfg_attr(not(test), no_std)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

pub mod mem;
pub mod number;
pub mod severity;
pub mod string;
pub mod time;

pub use mem::{mem_compare, mem_copy, mem_set};
pub use number::{
    format_i32, format_i64, format_u32, format_u64, parse_i32, parse_i64, parse_u32, parse_u64,
    MAX_FORMATTED_LEN,
};
pub use severity::Severity;
pub use string::{str_bytes, str_compare, str_concat, str_copy, str_len};
pub use time::{epoch_to_utc, CivilTime, UTC_TIMESTAMP_LEN};
