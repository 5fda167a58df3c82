//! Tracing subscriber setup: console formatter, file layer, and initialisation.
use std::fmt::Write as _;
use std::fs;
use std::io::Write as _;
use std::sync::Mutex;

use super::utils::{format_utc_datetime, format_utc_time, log_file_path, strip_ansi};

/// Target for stage headers.
pub const STAGE: &str = "maziq::stage";
/// Target for dry-run previews.
pub const DRY_RUN: &str = "maziq::dry_run";

/// Collects the `message` field of a [`tracing::Event`] plus its other
/// fields rendered as `key=value`.
#[derive(Default)]
struct MessageExtractor {
    message: String,
    fields: String,
}

impl MessageExtractor {
    fn push_field(&mut self, name: &str, value: &str) {
        if !self.fields.is_empty() {
            self.fields.push(' ');
        }
        let _ = write!(self.fields, "{name}={value}");
    }

    /// The message, followed by the fields when there are any.
    fn render(&self) -> String {
        if self.fields.is_empty() {
            self.message.clone()
        } else if self.message.is_empty() {
            self.fields.clone()
        } else {
            format!("{} ({})", self.message, self.fields)
        }
    }
}

impl tracing::field::Visit for MessageExtractor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.push_field(field.name(), &format!("{value:?}"));
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.push_field(field.name(), value);
        }
    }
}

/// A [`tracing_subscriber::Layer`] that appends every event to the
/// per-command log file, timestamped and with ANSI codes stripped.
///
/// Always captures `DEBUG` and above, independent of console verbosity, so
/// a failed install can be diagnosed after the fact.
#[derive(Debug)]
pub(super) struct FileLayer {
    file: Mutex<fs::File>,
}

impl FileLayer {
    /// Truncate the log file for `command`, write a run header and return a
    /// layer appending to it.
    ///
    /// Returns `None` if the cache directory or the file is unavailable.
    pub(super) fn new(command: &str) -> Option<Self> {
        let path = log_file_path(command)?;
        let version =
            option_env!("MAZIQ_VERSION").unwrap_or(concat!("dev-", env!("CARGO_PKG_VERSION")));
        let header = format!(
            "==========================================\n\
             maziq {version} {command} {}\n\
             ==========================================\n",
            format_utc_datetime(),
        );
        fs::write(&path, header).ok()?;
        let file = fs::OpenOptions::new().append(true).open(&path).ok()?;
        Some(Self {
            file: Mutex::new(file),
        })
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for FileLayer {
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let metadata = event.metadata();
        let level = *metadata.level();
        let target = metadata.target();

        let mut extractor = MessageExtractor::default();
        event.record(&mut extractor);
        let msg = strip_ansi(&extractor.render());
        let ts = format_utc_time();

        let line = match (level, target) {
            (tracing::Level::INFO, STAGE) => format!("[{ts}] ==> {msg}"),
            (tracing::Level::INFO, DRY_RUN) => format!("[{ts}]     [dry run] {msg}"),
            (tracing::Level::ERROR, _) => format!("[{ts}]     [error] {msg}"),
            (tracing::Level::WARN, _) => format!("[{ts}]     [warn] {msg}"),
            (tracing::Level::DEBUG | tracing::Level::TRACE, _) => {
                format!("[{ts}]     [debug] {msg}")
            }
            _ => format!("[{ts}]     {msg}"),
        };

        if let Ok(mut f) = self.file.lock() {
            writeln!(f, "{line}").ok();
        }
    }
}

/// A [`tracing_subscriber::fmt::FormatEvent`] producing maziq's console style.
struct MaziqFormatter;

impl<S, N> tracing_subscriber::fmt::FormatEvent<S, N> for MaziqFormatter
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    N: for<'a> tracing_subscriber::fmt::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: tracing_subscriber::fmt::format::Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let metadata = event.metadata();
        let level = *metadata.level();
        let target = metadata.target();

        let mut extractor = MessageExtractor::default();
        event.record(&mut extractor);
        let msg = extractor.render();

        match level {
            tracing::Level::ERROR => writeln!(writer, "\x1b[31mERROR\x1b[0m {msg}"),
            tracing::Level::WARN => writeln!(writer, "\x1b[33mWARN\x1b[0m  {msg}"),
            tracing::Level::INFO if target == STAGE => {
                writeln!(writer, "\x1b[1;34m==>\x1b[0m \x1b[1m{msg}\x1b[0m")
            }
            tracing::Level::INFO if target == DRY_RUN => {
                writeln!(writer, "  \x1b[33m[DRY RUN]\x1b[0m {msg}")
            }
            tracing::Level::INFO => writeln!(writer, "  {msg}"),
            _ => writeln!(writer, "  \x1b[2m{msg}\x1b[0m"),
        }
    }
}

/// Initialise the global [`tracing`] subscriber.
///
/// Console output follows `-v` (`RUST_LOG` overrides it when set): warnings
/// and errors go to stderr, everything else to stdout. The file layer writes
/// all events down to `debug` to `$XDG_CACHE_HOME/maziq/<command>.log`.
/// Must be called once at program startup, before any logging.
pub fn init_subscriber(verbose: bool, command: &str) {
    use tracing_subscriber::fmt::writer::MakeWriterExt as _;
    use tracing_subscriber::{
        EnvFilter, Layer as _, filter::LevelFilter, fmt, layer::SubscriberExt as _,
        util::SubscriberInitExt as _,
    };

    let console_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let console_filter = EnvFilter::builder()
        .with_default_directive(console_level.into())
        .from_env_lossy();

    let make_writer = std::io::stderr
        .with_max_level(tracing::Level::WARN)
        .and(std::io::stdout.with_min_level(tracing::Level::INFO));

    let console_layer = fmt::layer()
        .event_format(MaziqFormatter)
        .with_writer(make_writer)
        .with_filter(console_filter);

    let file_layer = FileLayer::new(command).map(|l| l.with_filter(LevelFilter::DEBUG));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::logging::isolated_logger;

    #[test]
    fn fields_follow_the_message() {
        let (log, _tmp, _guard) = isolated_logger();
        tracing::debug!(id = "go", action = %"install", "nothing to do");
        let contents = fs::read_to_string(log.log_path().unwrap()).unwrap();
        assert!(contents.contains("[debug] nothing to do (id=go action=install)"));
    }

    #[test]
    fn header_names_the_command() {
        let (log, _tmp, _guard) = isolated_logger();
        let contents = fs::read_to_string(log.log_path().unwrap()).unwrap();
        assert!(contents.starts_with("=========="));
        assert!(contents.contains("maziq "));
        assert!(contents.contains(" test "));
    }
}
