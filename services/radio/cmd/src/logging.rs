//! Log line format for the radio node: `[time] [component] [LEVEL] message`.
//!
//! The component is the `component` field of `component_*!` events, or the
//! radio crate that emitted the event (`wire`, `link`).

use std::fmt;
use std::io::IsTerminal;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::{format::Writer, FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

const COMPONENT_WIDTH: usize = 6;

/// Log at info level tagged with a component name
#[macro_export]
macro_rules! component_info {
    ($component:expr, $($arg:tt)*) => {
        tracing::info!(component = $component, $($arg)*)
    };
}

#[macro_export]
macro_rules! component_warn {
    ($component:expr, $($arg:tt)*) => {
        tracing::warn!(component = $component, $($arg)*)
    };
}

#[macro_export]
macro_rules! component_debug {
    ($component:expr, $($arg:tt)*) => {
        tracing::debug!(component = $component, $($arg)*)
    };
}

/// Event formatter installed by the node binary
pub struct RadioLogFormatter {
    color: bool,
}

impl RadioLogFormatter {
    /// Colour is used only when stdout is a terminal
    pub fn new() -> Self {
        Self {
            color: std::io::stdout().is_terminal(),
        }
    }

    fn level_style(&self, level: &Level) -> (&'static str, &'static str) {
        if !self.color {
            return ("", "");
        }
        let code = match *level {
            Level::ERROR => "\x1b[91m",
            Level::WARN => "\x1b[93m",
            Level::INFO => "\x1b[32m",
            Level::DEBUG | Level::TRACE => "\x1b[90m",
        };
        (code, "\x1b[0m")
    }
}

impl Default for RadioLogFormatter {
    fn default() -> Self {
        Self::new()
    }
}

/// Component for an event from `target` without a `component` field
fn component_from_target(target: &str) -> &str {
    let krate = target.split("::").next().unwrap_or(target);
    match krate {
        "resonant_radio" => "node",
        other => other.strip_prefix("radio_").unwrap_or(other),
    }
}

impl<S, N> FormatEvent<S, N> for RadioLogFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut fields = EventFields::default();
        event.record(&mut fields);

        let level = event.metadata().level();
        let component = fields
            .component
            .as_deref()
            .unwrap_or_else(|| component_from_target(event.metadata().target()));
        let (on, off) = self.level_style(level);

        writeln!(
            writer,
            "[{}] [{:<width$}] [{}{:<5}{}] {}",
            chrono::Local::now().format("%H:%M:%S%.3f"),
            component,
            on,
            level,
            off,
            fields.message,
            width = COMPONENT_WIDTH
        )
    }
}

#[derive(Default)]
struct EventFields {
    message: String,
    component: Option<String>,
}

impl Visit for EventFields {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "message" => self.message = value.to_string(),
            "component" => self.component = Some(value.to_string()),
            _ => {}
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        }
    }
}
