// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Syslog severity levels.
//!
//! Lower numbers are more severe. A filter of level `L` matches every entry
//! whose level is `<= L`.

/// Display names indexed by numeric level.
static SEVERITY_NAMES: [&str; 8] = [
    "Emergency",
    "Alert",
    "Critical",
    "Error",
    "Warning",
    "Notice",
    "Info",
    "Debug",
];

/// Syslog severity, `Emergency` (0) through `Debug` (7).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Severity {
    Emergency = 0,
    Alert = 1,
    Critical = 2,
    Error = 3,
    Warning = 4,
    Notice = 5,
    Info = 6,
    #[default]
    Debug = 7,
}

impl Severity {
    pub const ALL: [Severity; 8] = [
        Severity::Emergency,
        Severity::Alert,
        Severity::Critical,
        Severity::Error,
        Severity::Warning,
        Severity::Notice,
        Severity::Info,
        Severity::Debug,
    ];

    /// Maps a numeric level to a severity. Levels outside 0-7 have no severity.
    pub fn from_level(level: i32) -> Option<Self> {
        usize::try_from(level)
            .ok()
            .and_then(|i| Self::ALL.get(i))
            .copied()
    }

    pub fn level(self) -> i32 {
        self as i32
    }

    pub fn name(self) -> &'static str {
        SEVERITY_NAMES[self as usize]
    }

    /// True when an entry of severity `self` passes a filter of `max`.
    pub fn matches(self, max: Severity) -> bool {
        self <= max
    }
}
