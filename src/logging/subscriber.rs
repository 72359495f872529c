//! Tracing subscriber setup: console formatter, file layer, and initialisation.
use std::fs;
use std::io::Write as _;
use std::path::Path;
use std::sync::Mutex;

use super::logger::run_log_path;

/// Tracing target used for stage headers.
pub(super) const STAGE_TARGET: &str = "dotstrap::stage";

/// Drop terminal escape sequences so the log file holds plain text.
///
/// A CSI sequence (`ESC [`) runs up to its final byte in `@`..=`~`; any
/// other escape swallows the character after `ESC`.
fn plain_text(message: &str) -> String {
    let mut text = String::with_capacity(message.len());
    let mut rest = message;
    while let Some((before, after)) = rest.split_once('\x1b') {
        text.push_str(before);
        let mut tail = after.chars();
        rest = match tail.next() {
            Some('[') => tail
                .as_str()
                .split_once(|c: char| ('@'..='~').contains(&c))
                .map_or("", |(_, after)| after),
            Some(_) => tail.as_str(),
            None => "",
        };
    }
    text.push_str(rest);
    text
}

/// Extracts the `message` field from a [`tracing::Event`].
#[derive(Default)]
struct MessageExtractor {
    message: String,
}

impl tracing::field::Visit for MessageExtractor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        }
    }
}

/// A [`tracing_subscriber::Layer`] that appends all events to the persistent
/// log file with timestamps and ANSI codes stripped.
#[derive(Debug)]
pub(super) struct FileLayer {
    file: Mutex<fs::File>,
}

impl FileLayer {
    /// Open the log file for `command` under the cache directory.
    ///
    /// Returns `None` if the cache directory or file is unavailable.
    pub(super) fn new(command: &str) -> Option<Self> {
        Self::open(&run_log_path(command)?)
    }

    /// Truncate `path`, write a run header, and return a layer appending to it.
    pub(super) fn open(path: &Path) -> Option<Self> {
        let version =
            option_env!("DOTSTRAP_VERSION").unwrap_or(concat!("dev-", env!("CARGO_PKG_VERSION")));
        let header = format!(
            "==========================================\n\
             dotstrap {version} {}\n\
             ==========================================\n",
            chrono::Utc::now().format("%Y-%m-%d %H:%M:%S"),
        );
        fs::write(path, header).ok()?;
        let file = fs::OpenOptions::new().append(true).open(path).ok()?;
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

        let mut extractor = MessageExtractor::default();
        event.record(&mut extractor);
        let msg = plain_text(&extractor.message);
        let ts = chrono::Utc::now().format("%H:%M:%S");

        let line = match level {
            tracing::Level::INFO if metadata.target() == STAGE_TARGET => {
                format!("[{ts}] ==> {msg}")
            }
            tracing::Level::ERROR => format!("[{ts}]     [error] {msg}"),
            tracing::Level::WARN => format!("[{ts}]     [warn] {msg}"),
            tracing::Level::INFO => format!("[{ts}]     {msg}"),
            _ => format!("[{ts}]     [debug] {msg}"),
        };

        if let Ok(mut f) = self.file.lock() {
            writeln!(f, "{line}").ok();
        }
    }
}

/// Console formatter: `==>` stage headers, coloured warning and error tags.
struct ConsoleFormatter;

impl<S, N> tracing_subscriber::fmt::FormatEvent<S, N> for ConsoleFormatter
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

        let mut extractor = MessageExtractor::default();
        event.record(&mut extractor);
        let msg = &extractor.message;

        match level {
            tracing::Level::ERROR => writeln!(writer, "\x1b[31mERROR\x1b[0m {msg}"),
            tracing::Level::WARN => writeln!(writer, "\x1b[33mWARN\x1b[0m  {msg}"),
            tracing::Level::INFO if metadata.target() == STAGE_TARGET => {
                writeln!(writer, "\x1b[1;34m==>\x1b[0m \x1b[1m{msg}\x1b[0m")
            }
            tracing::Level::INFO => writeln!(writer, "  {msg}"),
            _ => writeln!(writer, "  \x1b[2m{msg}\x1b[0m"),
        }
    }
}

/// Initialise the global [`tracing`] subscriber.
///
/// The console shows `info` and above (`debug` when `verbose`), unless
/// `RUST_LOG` overrides it; the file layer always records `debug` to
/// `$XDG_CACHE_HOME/dotstrap/<command>.log`.  Must be called once at
/// program startup, before any logging.
pub fn init_subscriber(verbose: bool, command: &str) {
    use tracing_subscriber::fmt::writer::MakeWriterExt as _;
    use tracing_subscriber::{
        EnvFilter, Layer as _, filter::LevelFilter, fmt, layer::SubscriberExt as _,
        util::SubscriberInitExt as _,
    };

    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));

    let make_writer = std::io::stderr
        .with_max_level(tracing::Level::WARN)
        .and(std::io::stdout.with_min_level(tracing::Level::INFO));

    let console_layer = fmt::layer()
        .event_format(ConsoleFormatter)
        .with_writer(make_writer)
        .with_filter(console_filter);

    let file_layer = FileLayer::new(command).map(|l| l.with_filter(LevelFilter::DEBUG));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();
}
