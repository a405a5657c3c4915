//! Minimal stderr logger behind the `log` facade.
//!
//! Binaries call [`init`] once; libraries only emit through `log` macros. The
//! level comes from `DEVTAG_DEBUG` when set, otherwise from the caller's default.

use log::{Level, LevelFilter, Log, Metadata, Record};
use std::env;
use std::io::Write;
use std::sync::OnceLock;

pub const LOG_LEVEL_ENV: &str = "DEVTAG_DEBUG";

struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(
            stderr,
            "devtag: [{}] {}: {}",
            level_tag(record.level()),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: StderrLogger = StderrLogger;
static INSTALLED: OnceLock<bool> = OnceLock::new();

/// Install the stderr logger (once) and apply the effective level.
///
/// Returns `false` when another logger was already registered by the host
/// process; the level is still applied in that case.
pub fn init(default_level: &str) -> bool {
    let installed = *INSTALLED.get_or_init(|| log::set_logger(&LOGGER).is_ok());
    log::set_max_level(effective_level(default_level));
    installed
}

/// Raise or lower the level after [`init`], e.g. for a `--verbose` flag.
pub fn set_level(level: LevelFilter) {
    log::set_max_level(level);
}

fn effective_level(default_level: &str) -> LevelFilter {
    env::var(LOG_LEVEL_ENV)
        .ok()
        .and_then(|value| parse_level(&value))
        .or_else(|| parse_level(default_level))
        .unwrap_or(LevelFilter::Warn)
}

fn parse_level(value: &str) -> Option<LevelFilter> {
    match value.trim().to_ascii_lowercase().as_str() {
        "off" | "0" => Some(LevelFilter::Off),
        "error" => Some(LevelFilter::Error),
        "warn" | "warning" => Some(LevelFilter::Warn),
        "info" => Some(LevelFilter::Info),
        "debug" | "1" | "all" => Some(LevelFilter::Debug),
        "trace" => Some(LevelFilter::Trace),
        _ => None,
    }
}

fn level_tag(level: Level) -> &'static str {
    match level {
        Level::Error => "ERROR",
        Level::Warn => "WARN",
        Level::Info => "INFO",
        Level::Debug => "DEBUG",
        Level::Trace => "TRACE",
    }
}
