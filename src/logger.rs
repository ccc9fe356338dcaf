use log::{Level, LevelFilter, Log, Metadata, Record};
use std::io::{stderr, stdout, Write};
use std::sync::{Mutex, Once};

/// Log implementation for standard output streams
///
/// Errors and warnings go to stderr so they never mix with the per-reply lines on stdout.
pub struct StdLogger(Mutex<()>);

impl StdLogger {
    /// Install the logger with warnings and errors enabled
    ///
    /// Even if this function is called multiple times, installation will only be done once. If
    /// another logger has been installed before, that logger stays in place.
    pub fn init() {
        static INIT: Once = Once::new();

        // Initialization may run from more than one thread
        INIT.call_once(|| {
            if log::set_boxed_logger(Box::new(StdLogger(Mutex::new(())))).is_ok() {
                log::set_max_level(LevelFilter::Warn);
            }
        });
    }

    /// Switch per-reply diagnostics on or off
    pub fn set_debug(debug: bool) {
        if debug {
            log::set_max_level(LevelFilter::Debug);
        } else {
            log::set_max_level(LevelFilter::Warn);
        }
    }

    fn marker(level: Level) -> &'static str {
        match level {
            Level::Error | Level::Warn => "[-]",
            Level::Info => "[i]",
            Level::Debug | Level::Trace => "[+]",
        }
    }
}

impl Log for StdLogger {
    /// Filtering is left to the global max level
    fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        // Keep lines of concurrent writers apart
        let _guard = self.0.lock();
        let marker = Self::marker(record.level());
        if record.level() <= Level::Warn {
            let _ = writeln!(stderr().lock(), "{} {}", marker, record.args());
        } else {
            let _ = writeln!(stdout().lock(), "{} {}", marker, record.args());
        }
    }

    /// Flush buffered output streams
    fn flush(&self) {
        let _ = stdout().flush();
        let _ = stderr().flush();
    }
}
