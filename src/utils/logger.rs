use std::io::Write;
use std::time::SystemTime;

use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};

const RESET: &str = "\x1b[0m";
const BLUE: &str = "\x1b[34m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";

pub const LOG_TARGET: &str = "apngcodec";

#[macro_export]
macro_rules! log_info {
    ($msg:expr) => {
        $crate::__log::info!(target: $crate::utils::logger::LOG_TARGET, "{}", $msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::__log::info!(target: $crate::utils::logger::LOG_TARGET, $fmt, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_debug {
    ($msg:expr) => {
        $crate::__log::debug!(target: $crate::utils::logger::LOG_TARGET, "{}", $msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::__log::debug!(target: $crate::utils::logger::LOG_TARGET, $fmt, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_warn {
    ($msg:expr) => {
        $crate::__log::warn!(target: $crate::utils::logger::LOG_TARGET, "{}", $msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::__log::warn!(target: $crate::utils::logger::LOG_TARGET, $fmt, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_error {
    ($msg:expr) => {
        $crate::__log::error!(target: $crate::utils::logger::LOG_TARGET, "{}", $msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::__log::error!(target: $crate::utils::logger::LOG_TARGET, $fmt, $($arg)*)
    };
}

/// Terminal logger used by the command line tool.
///
/// The library only emits records through the `log` facade; embedding applications are free to
/// install any other `log` implementation instead.
pub struct Logger {
    level: LevelFilter,
}

impl Logger {
    /// Installs the logger globally with the given maximum level.
    pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger: &'static Logger = Box::leak(Box::new(Logger { level }));
        log::set_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    fn get_timestamp() -> String {
        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default();
        let (secs, millis) = (now.as_secs(), now.subsec_millis());

        let hours = (secs / 3600) % 24;
        let minutes = (secs / 60) % 60;
        let seconds = secs % 60;

        format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis)
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let (level_str, color) = match record.level() {
            Level::Trace | Level::Debug => ("DEBUG", BLUE),
            Level::Info => ("INFO", GREEN),
            Level::Warn => ("WARN", YELLOW),
            Level::Error => ("ERROR", RED),
        };

        let _ = writeln!(
            std::io::stderr().lock(),
            "{} [{}{}{}] {}",
            Self::get_timestamp(),
            color,
            level_str,
            RESET,
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_reports_a_boxable_error() {
        let _ = Logger::init(LevelFilter::Warn);

        let result: Result<(), Box<dyn std::error::Error>> = Logger::init(LevelFilter::Debug).map_err(Into::into);
        assert!(result.is_err());
        assert_eq!(log::max_level(), LevelFilter::Warn);
    }

    #[test]
    fn timestamp_format() {
        let timestamp = Logger::get_timestamp();
        assert_eq!(timestamp.len(), 12);
        assert_eq!(&timestamp[2..3], ":");
        assert_eq!(&timestamp[8..9], ".");
    }
}
