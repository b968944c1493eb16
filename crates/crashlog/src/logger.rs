// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Tracing formatter for the library's own diagnostics.
//!
//! Every line is prefixed with `CRASHLOG` so it can be told apart from the
//! host application's output:
//!
//! ```text
//! CRASHLOG | LEVEL | [span_name{span_fields}:] message {event_fields}
//! CRASHLOG | WARN | Log store is full (4096 entries), dropping the oldest entry
//! CRASHLOG | DEBUG | Read 12 log rows from /var/tmp/rows
//! ```

use std::fmt;
use std::sync::Once;

use tracing_core::{Event, Subscriber};
use tracing_subscriber::fmt::{
    format::{self, FormatEvent, FormatFields},
    FmtContext, FormattedFields,
};
use tracing_subscriber::registry::LookupSpan;

use crate::config::log_level::LogLevel;

static INIT: Once = Once::new();

#[derive(Debug, Clone, Copy)]
pub struct Formatter;

impl<S, N> FormatEvent<S, N> for Formatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        write!(&mut writer, "CRASHLOG | {} | ", metadata.level())?;

        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                write!(writer, "{}", span.name())?;

                // Populated by the fmt layer on span creation; absent only for
                // spans it never saw.
                let ext = span.extensions();
                if let Some(fields) = ext.get::<FormattedFields<N>>() {
                    if !fields.is_empty() {
                        write!(writer, "{{{fields}}}")?;
                    }
                }
                write!(writer, ": ")?;
            }
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Installs a global stderr subscriber using [`Formatter`].
///
/// Only the first call has any effect. If the host already installed its own
/// global subscriber this does nothing and diagnostics go there instead.
pub fn init(level: LogLevel) {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_ansi(false)
            .event_format(Formatter)
            .with_writer(std::io::stderr)
            .with_max_level(level.as_level_filter())
            .try_init();
    });
}
