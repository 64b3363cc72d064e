//! Minimal `log` sink for the command-line surface.
//!
//! Every record becomes a single structured line on stderr prefixed with its
//! level, matching the one-line error discipline of the CLI. The planner
//! core itself never logs; only the scanner, probe, and CLI wiring do.

use log::{Level, LevelFilter, Log, Metadata, Record};

struct LineLogger {
    max_level: LevelFilter,
}

impl Log for LineLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let prefix = match record.level() {
            Level::Error => "error",
            Level::Warn => "warn",
            Level::Info => "info",
            Level::Debug => "debug",
            Level::Trace => "trace",
        };
        eprintln!("{}: {}", prefix, record.args());
    }

    fn flush(&self) {}
}

/// Install the line logger. Verbose mode unlocks debug output; otherwise
/// informational and worse. Safe to call more than once; later calls are
/// no-ops.
pub fn init(verbose: bool) {
    let max_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    if log::set_boxed_logger(Box::new(LineLogger { max_level })).is_ok() {
        log::set_max_level(max_level);
    }
}
