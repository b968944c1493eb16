// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Epoch to civil time conversion without `gmtime_r`.
//!
//! `gmtime_r` and friends may take the libc timezone lock, which is not safe
//! after a fault. This module does the Gregorian bookkeeping by hand: whole
//! 400-year cycles are skipped arithmetically, the remaining years and months
//! are walked using the leap-year rule and a fixed month-length table.
//!
//! The output is always UTC with no DST adjustment.

/// Length of `YYYY-MM-DD HH:MM:SS` for four-digit years, terminator excluded.
pub const UTC_TIMESTAMP_LEN: usize = 19;

const EPOCH_YEAR: u64 = 1970;
const SECS_PER_DAY: u64 = 24 * 60 * 60;
const DAYS_PER_400_YEARS: u64 = 146_097;

const MONTH_DAYS: [[u64; 12]; 2] = [
    [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31],
    [31, 29, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31],
];

fn is_leap_year(year: u64) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

fn year_days(year: u64) -> u64 {
    if is_leap_year(year) {
        366
    } else {
        365
    }
}

/// Broken-down UTC time. Months and days are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CivilTime {
    pub year: u64,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl CivilTime {
    /// Converts non-negative Unix epoch seconds into UTC civil time.
    ///
    /// Returns `None` for pre-epoch (negative) input.
    pub fn from_epoch(epoch_seconds: i64) -> Option<Self> {
        let secs = u64::try_from(epoch_seconds).ok()?;

        let day_clock = secs % SECS_PER_DAY;
        let mut day_number = secs / SECS_PER_DAY;

        // 1970 + 400 lands on the same point of the leap cycle, so whole
        // cycles can be removed before walking year by year.
        let mut year = EPOCH_YEAR + (day_number / DAYS_PER_400_YEARS) * 400;
        day_number %= DAYS_PER_400_YEARS;

        while day_number >= year_days(year) {
            day_number -= year_days(year);
            year += 1;
        }

        let table = &MONTH_DAYS[usize::from(is_leap_year(year))];
        let mut month = 0;
        while month < 11 && day_number >= table[month] {
            day_number -= table[month];
            month += 1;
        }

        Some(Self {
            year,
            month: month as u8 + 1,
            day: day_number as u8 + 1,
            hour: (day_clock / 3600) as u8,
            minute: ((day_clock % 3600) / 60) as u8,
            second: (day_clock % 60) as u8,
        })
    }
}

/// Writes `value` as exactly `width` zero-padded digits.
fn put_padded(buf: &mut [u8], pos: &mut usize, mut value: u64, width: usize) {
    for i in (0..width).rev() {
        buf[*pos + i] = b'0' + (value % 10) as u8;
        value /= 10;
    }
    *pos += width;
}

fn year_width(mut year: u64) -> usize {
    let mut width = 1;
    while year >= 10 {
        year /= 10;
        width += 1;
    }
    width.max(4)
}

/// Formats `epoch_seconds` as `YYYY-MM-DD HH:MM:SS` into `buf` and terminates it.
///
/// Years past 9999 simply use more digits. Returns `None`, leaving an empty
/// string in a non-empty `buf`, for negative input or when `buf` is too small.
///
/// ```
/// use crashlog_async_safe::time::epoch_to_utc;
///
/// let mut buf = [0u8; 32];
/// assert_eq!(epoch_to_utc(0, Some(&mut buf)), Some("1970-01-01 00:00:00"));
/// ```
pub fn epoch_to_utc(epoch_seconds: i64, buf: Option<&mut [u8]>) -> Option<&str> {
    let buf = buf?;

    let civil = CivilTime::from_epoch(epoch_seconds);
    let len = civil.map_or(0, |t| year_width(t.year) + UTC_TIMESTAMP_LEN - 4);
    let Some(civil) = civil.filter(|_| buf.len() > len) else {
        if let Some(first) = buf.first_mut() {
            *first = 0;
        }
        return None;
    };

    let mut pos = 0;
    put_padded(buf, &mut pos, civil.year, year_width(civil.year));
    buf[pos] = b'-';
    pos += 1;
    put_padded(buf, &mut pos, u64::from(civil.month), 2);
    buf[pos] = b'-';
    pos += 1;
    put_padded(buf, &mut pos, u64::from(civil.day), 2);
    buf[pos] = b' ';
    pos += 1;
    put_padded(buf, &mut pos, u64::from(civil.hour), 2);
    buf[pos] = b':';
    pos += 1;
    put_padded(buf, &mut pos, u64::from(civil.minute), 2);
    buf[pos] = b':';
    pos += 1;
    put_padded(buf, &mut pos, u64::from(civil.second), 2);
    buf[pos] = 0;

    core::str::from_utf8(&buf[..pos]).ok()
}
