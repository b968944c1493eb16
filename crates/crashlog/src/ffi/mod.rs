// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! C bindings.
//!
//! ## Signal Safety
//!
//! The memory, string, number and time functions never allocate, take locks
//! or log, and may be called from a signal handler. So may
//! [`crashlog_write_rows`] and [`crashlog_write_watermark`]: they emit no
//! diagnostics and only issue `open`, `write` and `close`. Path conversion
//! uses a stack buffer for typical path lengths; very long paths fall back to
//! the heap.
//!
//! [`crashlog_read_rows`] and [`crashlog_read_watermark`] belong to the next
//! launch and may log through the diagnostics subscriber.
//! [`crashlog_init_logging`] must only be called at startup.
//!
//! ## Null Pointers
//!
//! Every pointer argument may be NULL. A NULL never faults; each function
//! documents the degraded result it returns instead. Unlike their libc
//! namesakes, functions that write into a caller buffer also take its size,
//! and never write past it.
//!
//! ## Panic Safety
//!
//! Every body runs inside `catch_unwind` so that a panic can never unwind
//! across the `extern "C"` boundary. A caught panic returns the function's
//! failure value and is not reported, since reporting could allocate.
//!
//! ## Row Files
//!
//! Rows are `char[CRASHLOG_ROW_LEN]` (512 bytes). Negative return values are
//! [`CrashlogError`] codes:
//!
//! ```c
//! char rows[201][512];
//! int n = crashlog_read_rows("/var/tmp/app.crashlog", rows, 201);
//! if (n < 0) {
//!     fprintf(stderr, "read failed: %d\n", n);
//! }
//! ```

use std::ffi::{c_char, c_int, c_uint, c_void, CStr, OsStr};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::ptr;
use std::slice;
use std::str::FromStr;

use crashlog_async_safe as safe;

use crate::config::log_level::LogLevel;
use crate::error::PersistError;
use crate::logger;
use crate::persist;
use crate::record::LogRow;

/// Error codes returned by FFI functions
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CrashlogError {
    /// Operation succeeded
    Ok = 0,
    /// Null pointer, invalid path or inconsistent count
    InvalidArgument = -1,
    /// The file could not be opened or created
    OpenFailed = -2,
    /// A write failed or made no progress
    WriteFailed = -3,
    /// The row count header is missing, short or negative
    HeaderFailed = -4,
    /// The file ended before the expected payload
    PayloadFailed = -5,
    /// The file holds more rows than the caller's buffer
    CapacityExceeded = -6,
    /// A panic was caught at the boundary
    Panic = -99,
}

impl From<&PersistError> for CrashlogError {
    fn from(e: &PersistError) -> Self {
        match e.code() {
            PersistError::INVALID_ARGUMENT => CrashlogError::InvalidArgument,
            PersistError::OPEN_FAILED => CrashlogError::OpenFailed,
            PersistError::WRITE_FAILED => CrashlogError::WriteFailed,
            PersistError::HEADER_FAILED => CrashlogError::HeaderFailed,
            PersistError::PAYLOAD_FAILED => CrashlogError::PayloadFailed,
            PersistError::CAPACITY_EXCEEDED => CrashlogError::CapacityExceeded,
            _ => CrashlogError::InvalidArgument,
        }
    }
}

fn guard<T>(on_panic: T, f: impl FnOnce() -> T) -> T {
    catch_unwind(AssertUnwindSafe(f)).unwrap_or(on_panic)
}

/// Bytes of a NUL-terminated string, terminator excluded.
///
/// # Safety
/// `s` must be NULL or point to a NUL-terminated string that outlives `'a`.
unsafe fn c_bytes<'a>(s: *const c_char) -> Option<&'a [u8]> {
    if s.is_null() {
        return None;
    }
    let mut len = 0;
    while *s.add(len) != 0 {
        len += 1;
    }
    Some(slice::from_raw_parts(s.cast::<u8>(), len))
}

/// # Safety
/// `p` must be NULL or valid for reads of `len` bytes.
unsafe fn bytes<'a>(p: *const c_void, len: usize) -> Option<&'a [u8]> {
    (!p.is_null()).then(|| slice::from_raw_parts(p.cast::<u8>(), len))
}

/// # Safety
/// `p` must be NULL or valid for writes of `len` bytes.
unsafe fn bytes_mut<'a>(p: *mut c_void, len: usize) -> Option<&'a mut [u8]> {
    (!p.is_null()).then(|| slice::from_raw_parts_mut(p.cast::<u8>(), len))
}

/// # Safety
/// `path` must be NULL or a NUL-terminated string.
unsafe fn c_path<'a>(path: *const c_char) -> Option<&'a Path> {
    let raw = c_bytes(path).filter(|b| !b.is_empty())?;
    #[cfg(unix)]
    {
        use std::os::unix::ffi::OsStrExt;
        Some(Path::new(OsStr::from_bytes(raw)))
    }
    #[cfg(not(unix))]
    {
        std::str::from_utf8(raw).ok().map(|s| Path::new(OsStr::new(s)))
    }
}

fn out_ptr<T>(written: Option<T>, buf: *mut c_char) -> *mut c_char {
    if written.is_some() {
        buf
    } else {
        ptr::null_mut()
    }
}

fn byte_count(n: usize) -> c_int {
    c_int::try_from(n).unwrap_or(c_int::MAX)
}

// Memory

/// Fills `len` bytes of `dst` with the low byte of `value`. Returns `dst`, or
/// NULL when `dst` is NULL.
///
/// # Safety
/// `dst` must be NULL or valid for writes of `len` bytes.
#[no_mangle]
pub unsafe extern "C" fn crashlog_memset(dst: *mut c_void, value: c_int, len: usize) -> *mut c_void {
    guard(ptr::null_mut(), || {
        match safe::mem_set(bytes_mut(dst, len), value as u8, len) {
            Some(_) => dst,
            None => ptr::null_mut(),
        }
    })
}

/// Copies `len` bytes from `src` to `dst`. Returns `dst`, or NULL when either
/// pointer is NULL.
///
/// # Safety
/// `dst` and `src` must be NULL or valid for `len` bytes and must not overlap.
#[no_mangle]
pub unsafe extern "C" fn crashlog_memcpy(
    dst: *mut c_void,
    src: *const c_void,
    len: usize,
) -> *mut c_void {
    guard(ptr::null_mut(), || {
        if dst.is_null() || src.is_null() {
            return ptr::null_mut();
        }
        safe::mem_copy(bytes_mut(dst, len), bytes(src, len), len);
        dst
    })
}

/// Compares `len` bytes. A NULL operand sorts before a non-NULL one.
///
/// # Safety
/// `a` and `b` must be NULL or valid for reads of `len` bytes.
#[no_mangle]
pub unsafe extern "C" fn crashlog_memcmp(a: *const c_void, b: *const c_void, len: usize) -> c_int {
    guard(0, || safe::mem_compare(bytes(a, len), bytes(b, len), len))
}

// Strings

/// Length of `s`, `0` for NULL.
///
/// # Safety
/// `s` must be NULL or NUL-terminated.
#[no_mangle]
pub unsafe extern "C" fn crashlog_strlen(s: *const c_char) -> usize {
    guard(0, || safe::str_len(c_bytes(s)))
}

/// Copies `src` into the `dst_len`-byte buffer `dst`, truncating to fit.
///
/// A NULL `src` stores an empty string and returns NULL.
///
/// # Safety
/// `dst` must be NULL or valid for writes of `dst_len` bytes; `src` must be
/// NULL or NUL-terminated and must not overlap `dst`.
#[no_mangle]
pub unsafe extern "C" fn crashlog_strcpy(
    dst: *mut c_char,
    dst_len: usize,
    src: *const c_char,
) -> *mut c_char {
    guard(ptr::null_mut(), || {
        let written = safe::str_copy(bytes_mut(dst.cast(), dst_len), c_bytes(src));
        out_ptr(written, dst)
    })
}

/// Appends `src` to the string in the `dst_len`-byte buffer `dst`, truncating
/// to fit. A NULL `src` leaves `dst` unchanged.
///
/// # Safety
/// As for [`crashlog_strcpy`]; `dst` must hold a string terminated within
/// `dst_len` bytes.
#[no_mangle]
pub unsafe extern "C" fn crashlog_strcat(
    dst: *mut c_char,
    dst_len: usize,
    src: *const c_char,
) -> *mut c_char {
    guard(ptr::null_mut(), || {
        let written = safe::str_concat(bytes_mut(dst.cast(), dst_len), c_bytes(src));
        out_ptr(written, dst)
    })
}

/// Returns `-1`, `0` or `1`. NULL sorts first.
///
/// # Safety
/// `a` and `b` must be NULL or NUL-terminated.
#[no_mangle]
pub unsafe extern "C" fn crashlog_strcmp(a: *const c_char, b: *const c_char) -> c_int {
    guard(0, || safe::str_compare(c_bytes(a), c_bytes(b)))
}

// Numbers

/// # Safety
/// `s` must be NULL or NUL-terminated.
#[no_mangle]
pub unsafe extern "C" fn crashlog_atoi(s: *const c_char) -> c_int {
    guard(0, || safe::parse_i32(c_bytes(s)))
}

/// # Safety
/// `s` must be NULL or NUL-terminated.
#[no_mangle]
pub unsafe extern "C" fn crashlog_atou(s: *const c_char) -> c_uint {
    guard(0, || safe::parse_u32(c_bytes(s)))
}

/// # Safety
/// `s` must be NULL or NUL-terminated.
#[no_mangle]
pub unsafe extern "C" fn crashlog_atoll(s: *const c_char) -> i64 {
    guard(0, || safe::parse_i64(c_bytes(s)))
}

/// # Safety
/// `s` must be NULL or NUL-terminated.
#[no_mangle]
pub unsafe extern "C" fn crashlog_atollu(s: *const c_char) -> u64 {
    guard(0, || safe::parse_u64(c_bytes(s)))
}

/// Writes `n` in decimal. Returns `buf`, or NULL when it is NULL or too small.
///
/// # Safety
/// `buf` must be NULL or valid for writes of `len` bytes.
#[no_mangle]
pub unsafe extern "C" fn crashlog_itoa(n: c_int, buf: *mut c_char, len: usize) -> *mut c_char {
    guard(ptr::null_mut(), || {
        out_ptr(safe::format_i32(n, bytes_mut(buf.cast(), len)), buf)
    })
}

/// # Safety
/// `buf` must be NULL or valid for writes of `len` bytes.
#[no_mangle]
pub unsafe extern "C" fn crashlog_utoa(n: c_uint, buf: *mut c_char, len: usize) -> *mut c_char {
    guard(ptr::null_mut(), || {
        out_ptr(safe::format_u32(n, bytes_mut(buf.cast(), len)), buf)
    })
}

/// # Safety
/// `buf` must be NULL or valid for writes of `len` bytes.
#[no_mangle]
pub unsafe extern "C" fn crashlog_lltoa(n: i64, buf: *mut c_char, len: usize) -> *mut c_char {
    guard(ptr::null_mut(), || {
        out_ptr(safe::format_i64(n, bytes_mut(buf.cast(), len)), buf)
    })
}

/// # Safety
/// `buf` must be NULL or valid for writes of `len` bytes.
#[no_mangle]
pub unsafe extern "C" fn crashlog_llutoa(n: u64, buf: *mut c_char, len: usize) -> *mut c_char {
    guard(ptr::null_mut(), || {
        out_ptr(safe::format_u64(n, bytes_mut(buf.cast(), len)), buf)
    })
}

/// Formats epoch seconds as `YYYY-MM-DD HH:MM:SS` (UTC). Returns `buf`, or
/// NULL for a negative epoch or a NULL/too small buffer.
///
/// # Safety
/// `buf` must be NULL or valid for writes of `len` bytes.
#[no_mangle]
pub unsafe extern "C" fn crashlog_ctime(epoch: i64, buf: *mut c_char, len: usize) -> *mut c_char {
    guard(ptr::null_mut(), || {
        out_ptr(safe::epoch_to_utc(epoch, bytes_mut(buf.cast(), len)), buf)
    })
}

// Files

/// Writes the first `count` rows to `path`.
///
/// Returns the payload bytes written, `0` without touching the file when
/// `count <= 0`, or a negative [`CrashlogError`].
///
/// # Safety
/// `path` must be NULL or NUL-terminated; `rows` must be NULL or point to at
/// least `count` rows.
#[no_mangle]
pub unsafe extern "C" fn crashlog_write_rows(
    path: *const c_char,
    rows: *const LogRow,
    count: c_int,
) -> c_int {
    guard(CrashlogError::Panic as c_int, || {
        if count <= 0 {
            return 0;
        }
        let (Some(path), false) = (c_path(path), rows.is_null()) else {
            return CrashlogError::InvalidArgument as c_int;
        };
        let rows = slice::from_raw_parts(rows, count as usize);
        match persist::write_rows_counted(path, rows, count) {
            Ok(written) => byte_count(written),
            Err(e) => e.code(),
        }
    })
}

/// Reads a row file into `rows`, which has room for `capacity` rows.
///
/// Returns the row count or a negative [`CrashlogError`].
///
/// # Safety
/// `path` must be NULL or NUL-terminated; `rows` must be NULL or valid for
/// writes of `capacity` rows.
#[no_mangle]
pub unsafe extern "C" fn crashlog_read_rows(
    path: *const c_char,
    rows: *mut LogRow,
    capacity: usize,
) -> c_int {
    guard(CrashlogError::Panic as c_int, || {
        let (Some(path), false) = (c_path(path), rows.is_null()) else {
            return CrashlogError::InvalidArgument as c_int;
        };
        let rows = slice::from_raw_parts_mut(rows, capacity);
        match persist::read_rows(path, rows) {
            Ok(count) => byte_count(count),
            Err(e) => e.code(),
        }
    })
}

/// Stores `value` in `path`. Returns the bytes written (8) or a negative
/// [`CrashlogError`].
///
/// # Safety
/// `path` must be NULL or NUL-terminated.
#[no_mangle]
pub unsafe extern "C" fn crashlog_write_watermark(path: *const c_char, value: u64) -> c_int {
    guard(CrashlogError::Panic as c_int, || {
        let Some(path) = c_path(path) else {
            return CrashlogError::InvalidArgument as c_int;
        };
        match persist::write_watermark(path, value) {
            Ok(written) => byte_count(written),
            Err(e) => e.code(),
        }
    })
}

/// Loads the value stored by [`crashlog_write_watermark`] into `out`.
///
/// # Safety
/// `path` must be NULL or NUL-terminated; `out` must be NULL or valid for a
/// `uint64_t` write.
#[no_mangle]
pub unsafe extern "C" fn crashlog_read_watermark(
    path: *const c_char,
    out: *mut u64,
) -> CrashlogError {
    guard(CrashlogError::Panic, || {
        let (Some(path), false) = (c_path(path), out.is_null()) else {
            return CrashlogError::InvalidArgument;
        };
        match persist::read_watermark(path) {
            Ok(value) => {
                *out = value;
                CrashlogError::Ok
            }
            Err(e) => CrashlogError::from(&e),
        }
    })
}

// Diagnostics

/// Installs the library's stderr diagnostics at `level` ("off", "error",
/// "warn", "info", "debug" or "trace"). NULL selects "warn".
///
/// Not signal-safe: call once at startup.
///
/// # Safety
/// `level` must be NULL or a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn crashlog_init_logging(level: *const c_char) -> CrashlogError {
    guard(CrashlogError::Panic, || {
        let level = if level.is_null() {
            LogLevel::default()
        } else {
            let Ok(text) = CStr::from_ptr(level).to_str() else {
                return CrashlogError::InvalidArgument;
            };
            match LogLevel::from_str(text) {
                Ok(level) => level,
                Err(_) => return CrashlogError::InvalidArgument,
            }
        };
        logger::init(level);
        CrashlogError::Ok
    })
}
