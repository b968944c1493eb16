// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Byte-wise memory operations.
//!
//! The requested length is clamped to the buffers actually supplied, so a
//! caller passing a stale or corrupted length gets a shorter operation rather
//! than an out-of-bounds access.

use core::cmp::Ordering;

/// Fills the first `len` bytes of `dst` with `value`.
///
/// Returns `dst` back, or `None` if `dst` was `None`.
pub fn mem_set(dst: Option<&mut [u8]>, value: u8, len: usize) -> Option<&mut [u8]> {
    let dst = dst?;
    let n = len.min(dst.len());
    for byte in dst[..n].iter_mut() {
        *byte = value;
    }
    Some(dst)
}

/// Copies `len` bytes from `src` into `dst`.
///
/// A `None` on either side makes the call a no-op. Returns the number of
/// bytes actually copied.
pub fn mem_copy(dst: Option<&mut [u8]>, src: Option<&[u8]>, len: usize) -> usize {
    let (Some(dst), Some(src)) = (dst, src) else {
        return 0;
    };
    let n = len.min(dst.len()).min(src.len());
    for (d, s) in dst[..n].iter_mut().zip(&src[..n]) {
        *d = *s;
    }
    n
}

/// Compares the first `len` bytes of `a` and `b`.
///
/// Returns the difference of the first pair of differing bytes, `0` when the
/// compared range is equal. Both `None` compare equal; a lone `None` sorts
/// first (`-1` when `a` is `None`, `1` when `b` is `None`).
pub fn mem_compare(a: Option<&[u8]>, b: Option<&[u8]>, len: usize) -> i32 {
    match (a, b) {
        (None, None) => 0,
        (None, Some(_)) => -1,
        (Some(_), None) => 1,
        (Some(a), Some(b)) => {
            let n = len.min(a.len()).min(b.len());
            for (x, y) in a[..n].iter().zip(&b[..n]) {
                if x != y {
                    return i32::from(*x) - i32::from(*y);
                }
            }
            // Past the shorter buffer the longer one is treated as greater.
            match (len.min(a.len())).cmp(&len.min(b.len())) {
                Ordering::Less => -1,
                Ordering::Greater => 1,
                Ordering::Equal => 0,
            }
        }
    }
}
