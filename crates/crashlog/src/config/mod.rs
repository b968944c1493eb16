// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Capture configuration.
//!
//! A [`CaptureConfig`] says which log entries to harvest and where the row
//! and watermark files live. It is normally built in code, but can also be
//! loaded from JSON, where every field is optional:
//!
//! ```json
//! {
//!   "max_severity": "error",
//!   "sender": "MyApp",
//!   "limit": 200,
//!   "rows_path": "/var/tmp/myapp.crashlog",
//!   "watermark_path": "/var/tmp/myapp.watermark",
//!   "log_level": "debug"
//! }
//! ```
//!
//! `max_severity` accepts a level number (0-7) or a severity name.

pub mod log_level;

use std::path::PathBuf;

use crashlog_async_safe::Severity;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::ConfigError;
use crate::harvest::MAX_LOG_ROWS;
use log_level::LogLevel;

pub const DEFAULT_ROWS_PATH: &str = "crashlog.rows";
pub const DEFAULT_WATERMARK_PATH: &str = "crashlog.watermark";

/// Settings for a [`Capture`](crate::capture::Capture).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Least severe level harvested.
    #[serde(deserialize_with = "deserialize_severity")]
    pub max_severity: Severity,
    /// Only harvest entries from this sender. Empty means every sender.
    pub sender: Option<String>,
    /// Number of rows kept, 1 to [`MAX_LOG_ROWS`].
    pub limit: usize,
    pub rows_path: PathBuf,
    pub watermark_path: PathBuf,
    /// Verbosity of the library's own diagnostics.
    pub log_level: LogLevel,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            max_severity: Severity::Debug,
            sender: None,
            limit: MAX_LOG_ROWS,
            rows_path: PathBuf::from(DEFAULT_ROWS_PATH),
            watermark_path: PathBuf::from(DEFAULT_WATERMARK_PATH),
            log_level: LogLevel::default(),
        }
    }
}

impl CaptureConfig {
    /// Parses and validates a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limit == 0 {
            return Err(ConfigError::Invalid(
                "limit must be greater than 0".to_string(),
            ));
        }

        if self.limit > MAX_LOG_ROWS {
            return Err(ConfigError::Invalid(format!(
                "limit {} exceeds the maximum of {}",
                self.limit, MAX_LOG_ROWS
            )));
        }

        if self.rows_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("rows_path cannot be empty".to_string()));
        }

        if self.watermark_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "watermark_path cannot be empty".to_string(),
            ));
        }

        if self.rows_path == self.watermark_path {
            return Err(ConfigError::Invalid(
                "rows_path and watermark_path must differ".to_string(),
            ));
        }

        if self.sender.as_deref().is_some_and(|s| s.contains('\0')) {
            return Err(ConfigError::Invalid(
                "sender cannot contain NUL bytes".to_string(),
            ));
        }

        Ok(())
    }

    /// Sender filter as bytes, `None` when unset or empty.
    pub fn sender_filter(&self) -> Option<&[u8]> {
        self.sender
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(str::as_bytes)
    }
}

fn severity_from_name(name: &str) -> Option<Severity> {
    let name = name.trim();
    if let Ok(level) = name.parse::<i32>() {
        return Severity::from_level(level);
    }
    Severity::ALL
        .into_iter()
        .find(|s| s.name().eq_ignore_ascii_case(name))
}

fn deserialize_severity<'de, D>(deserializer: D) -> Result<Severity, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let severity = match &value {
        Value::Number(n) => n
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .and_then(Severity::from_level),
        Value::String(s) => severity_from_name(s),
        _ => None,
    };
    severity.ok_or_else(|| {
        D::Error::custom(format!(
            "invalid severity {value}, expected 0-7 or a name such as \"error\""
        ))
    })
}
