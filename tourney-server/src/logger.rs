use std::io::{self, Write};

use chrono::Local;
use log::{set_logger, set_max_level, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};

static LOGGER: Logger = Logger;

/// Installs the process logger. Must be called at most once.
pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    set_logger(&LOGGER)?;
    set_max_level(level);
    Ok(())
}

/// Writes one line per record. Warnings and errors go to stderr, everything else to stdout.
#[derive(Copy, Clone, Debug)]
pub struct Logger;

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let now = Local::now().format("%Y-%m-%d %H:%M:%S");

        let line = format!(
            "[{}] [{}:{}] [{}] {}\n",
            now,
            record.file().unwrap_or("???"),
            record.line().unwrap_or(0),
            record.level(),
            record.args()
        );

        // Nothing sensible to do if the standard streams are gone.
        let _ = match record.level() {
            Level::Error | Level::Warn => io::stderr().lock().write_all(line.as_bytes()),
            _ => io::stdout().lock().write_all(line.as_bytes()),
        };
    }

    fn flush(&self) {
        let _ = io::stdout().flush();
    }
}
