// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! NUL-terminated string operations over fixed byte buffers.
//!
//! A string is the bytes of a buffer up to its first NUL. A buffer without a
//! NUL is treated as a string ending at the end of the buffer, so no routine
//! here ever reads past the slice it was given.
//!
//! Writers always leave the destination terminated. When the destination is
//! too small the text is truncated to `dst.len() - 1` bytes.

/// Returns the length of `s` up to (not including) its terminator.
///
/// `None` has length `0`.
pub fn str_len(s: Option<&[u8]>) -> usize {
    match s {
        Some(s) => s.iter().position(|&b| b == 0).unwrap_or(s.len()),
        None => 0,
    }
}

/// Returns the bytes of `s` before its terminator.
pub fn str_bytes(s: &[u8]) -> &[u8] {
    &s[..str_len(Some(s))]
}

/// Copies the string `src` (terminator included) into `dst`.
///
/// - `dst == None`: nothing happens, returns `None`.
/// - `src == None`: `dst` becomes the empty string and `None` is returned to
///   signal the failure.
/// - `dst` empty: there is no room for a terminator, returns `None`.
pub fn str_copy<'a>(dst: Option<&'a mut [u8]>, src: Option<&[u8]>) -> Option<&'a mut [u8]> {
    let dst = dst?;
    if dst.is_empty() {
        return None;
    }
    let Some(src) = src else {
        dst[0] = 0;
        return None;
    };

    let n = str_len(Some(src)).min(dst.len() - 1);
    dst[..n].copy_from_slice(&src[..n]);
    dst[n] = 0;
    Some(dst)
}

/// Appends the string `src` after the terminator of `dst`.
///
/// `src == None` is a no-op that still returns `dst`; `dst == None` returns
/// `None`. A `dst` with no terminator is already full and is left untouched.
pub fn str_concat<'a>(dst: Option<&'a mut [u8]>, src: Option<&[u8]>) -> Option<&'a mut [u8]> {
    let dst = dst?;
    let Some(src) = src else {
        return Some(dst);
    };

    let start = str_len(Some(&*dst));
    if start < dst.len() {
        str_copy(Some(&mut dst[start..]), Some(src));
    }
    Some(dst)
}

/// Three-way lexicographic comparison by unsigned byte value.
///
/// Returns `-1`, `0` or `1`. Two `None` compare equal and `None` sorts before
/// any string.
pub fn str_compare(a: Option<&[u8]>, b: Option<&[u8]>) -> i32 {
    let (a, b) = match (a, b) {
        (None, None) => return 0,
        (None, Some(_)) => return -1,
        (Some(_), None) => return 1,
        (Some(a), Some(b)) => (str_bytes(a), str_bytes(b)),
    };

    for (x, y) in a.iter().zip(b) {
        if x < y {
            return -1;
        } else if x > y {
            return 1;
        }
    }

    if a.len() < b.len() {
        -1
    } else if a.len() > b.len() {
        1
    } else {
        0
    }
}
