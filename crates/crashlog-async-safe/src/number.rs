// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Integer parsing and decimal formatting.
//!
//! # Parsing
//!
//! The parsers accept the same forms as `strtol(s, NULL, 0)`:
//!
//! ```text
//! [-]0x1f   hexadecimal (prefix needs at least one byte after it)
//! [-]017    octal (leading zero followed by anything)
//! [-]42     decimal
//! ```
//!
//! They are deliberately permissive: bytes that are not digits of the detected
//! base are skipped rather than ending the parse (`"1a2"` in base 10 is `12`).
//! Values that do not fit wrap modulo the width of the target type. Only the
//! signed variants give a leading `-` its meaning; the unsigned ones skip it
//! like any other non-digit.
//!
//! # Formatting
//!
//! Formatters write plain decimal (no padding, `-` for negatives) followed by
//! a NUL terminator and return the written text. A buffer of
//! [`MAX_FORMATTED_LEN`] bytes is always large enough.

use crate::string::str_bytes;

/// Bytes needed to format any 64-bit value: 20 digits, a sign and a terminator.
pub const MAX_FORMATTED_LEN: usize = 22;

/// Splits off a base prefix and returns the base together with the digits.
fn detect_base(s: &[u8]) -> (u64, &[u8]) {
    match s {
        [b'0', b'x' | b'X', _, ..] => (16, &s[2..]),
        [b'0', b'x' | b'X'] => (10, s),
        [b'0', _, ..] => (8, &s[1..]),
        _ => (10, s),
    }
}

fn digit_value(c: u8, base: u64) -> Option<u64> {
    let value = match c {
        b'0'..=b'9' => c - b'0',
        b'a'..=b'f' => c - b'a' + 10,
        b'A'..=b'F' => c - b'A' + 10,
        _ => return None,
    };
    let value = u64::from(value);
    (value < base).then_some(value)
}

/// Accumulates the digits of `s` (no sign) modulo 2^64.
fn accumulate(s: &[u8]) -> u64 {
    let (base, digits) = detect_base(s);
    digits.iter().fold(0u64, |acc, &c| match digit_value(c, base) {
        Some(d) => acc.wrapping_mul(base).wrapping_add(d),
        None => acc,
    })
}

fn split_sign(s: &[u8]) -> (bool, &[u8]) {
    match s.split_first() {
        Some((b'-', rest)) => (true, rest),
        _ => (false, s),
    }
}

/// Parses a signed 32-bit integer. `None` parses as `0`.
pub fn parse_i32(s: Option<&[u8]>) -> i32 {
    let Some(s) = s else { return 0 };
    let (negative, digits) = split_sign(str_bytes(s));
    let value = accumulate(digits) as u32 as i32;
    if negative {
        value.wrapping_neg()
    } else {
        value
    }
}

/// Parses an unsigned 32-bit integer. `None` parses as `0`.
pub fn parse_u32(s: Option<&[u8]>) -> u32 {
    s.map_or(0, |s| accumulate(str_bytes(s)) as u32)
}

/// Parses a signed 64-bit integer. `None` parses as `0`.
pub fn parse_i64(s: Option<&[u8]>) -> i64 {
    let Some(s) = s else { return 0 };
    let (negative, digits) = split_sign(str_bytes(s));
    let value = accumulate(digits) as i64;
    if negative {
        value.wrapping_neg()
    } else {
        value
    }
}

/// Parses an unsigned 64-bit integer. `None` parses as `0`.
pub fn parse_u64(s: Option<&[u8]>) -> u64 {
    s.map_or(0, |s| accumulate(str_bytes(s)))
}

fn format_decimal(negative: bool, mut magnitude: u64, buf: Option<&mut [u8]>) -> Option<&str> {
    let buf = buf?;

    let mut digits = [0u8; 20];
    let mut count = 0;
    loop {
        digits[count] = b'0' + (magnitude % 10) as u8;
        count += 1;
        magnitude /= 10;
        if magnitude == 0 {
            break;
        }
    }

    let len = count + usize::from(negative);
    if buf.len() < len + 1 {
        if let Some(first) = buf.first_mut() {
            *first = 0;
        }
        return None;
    }

    let mut pos = 0;
    if negative {
        buf[0] = b'-';
        pos = 1;
    }
    for &d in digits[..count].iter().rev() {
        buf[pos] = d;
        pos += 1;
    }
    buf[pos] = 0;

    core::str::from_utf8(&buf[..len]).ok()
}

/// Formats `n` in decimal into `buf`.
pub fn format_i32(n: i32, buf: Option<&mut [u8]>) -> Option<&str> {
    format_decimal(n < 0, u64::from(n.unsigned_abs()), buf)
}

/// Formats `n` in decimal into `buf`.
pub fn format_u32(n: u32, buf: Option<&mut [u8]>) -> Option<&str> {
    format_decimal(false, u64::from(n), buf)
}

/// Formats `n` in decimal into `buf`.
pub fn format_i64(n: i64, buf: Option<&mut [u8]>) -> Option<&str> {
    format_decimal(n < 0, n.unsigned_abs(), buf)
}

/// Formats `n` in decimal into `buf`.
pub fn format_u64(n: u64, buf: Option<&mut [u8]>) -> Option<&str> {
    format_decimal(false, n, buf)
}
