//! Tracing and telemetry setup.
//!
//! A `tracing_subscriber` filter layer driven by
//! [`LogLevel`](crate::config::LogLevel) plus a colorized event formatter,
//! installed once at engine construction. Every decision node in
//! [`crate::engine`] opens a span named after its node code, so a single
//! `RUST_LOG=trace` run gives a structured per-request trace without any
//! additional instrumentation.

use std::fmt;

use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format;
use tracing_subscriber::prelude::*;

use crate::config::LogLevel;

/// Returns a filtering layer based on the configured logging level.
pub fn filter_layer(level: LogLevel) -> EnvFilter {
    let filter_str = match level {
        LogLevel::Critical => "warn,truss::launch=info",
        LogLevel::Normal => "info",
        LogLevel::Debug => "trace",
        LogLevel::Off => "off",
    };

    EnvFilter::try_new(filter_str).expect("filter string must parse")
}

/// Installs the default subscriber: the engine's log formatter, filtered by
/// `level`, with colors disabled when `colors` is false or stdout is not a
/// tty. Returns `false` if a global subscriber was already installed.
pub fn try_init(level: LogLevel, colors: bool) -> bool {
    if level == LogLevel::Off {
        return false;
    }

    if !atty::is(atty::Stream::Stdout) || !colors {
        yansi::disable();
    }

    tracing::subscriber::set_global_default(
        tracing_subscriber::registry()
            .with(logging_layer())
            .with(filter_layer(level)),
    )
    .is_ok()
}

/// A `tracing_subscriber` layer with engine-style log formatting: level
/// colored, span chain printed as a breadcrumb, file:line attached to
/// `debug`/`trace` events.
pub fn logging_layer<S>() -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber,
    S: for<'span> tracing_subscriber::registry::LookupSpan<'span>,
{
    tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_level(true)
        .event_format(EventFormat)
}

struct EventFormat;

impl<S, N> format::FormatEvent<S, N> for EventFormat
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    N: for<'a> format::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> fmt::Result {
        use yansi::Paint;

        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                write!(writer, "{} ", span.name().bold())?;
            }
        }

        match *event.metadata().level() {
            tracing::Level::ERROR => write!(writer, "{} ", "error:".red().bold())?,
            tracing::Level::WARN => write!(writer, "{} ", "warn:".yellow().bold())?,
            _ => {}
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}
