//! Bridge from the `log` facade to a host-provided logger.
//!
//! The store logs through `log`. A host that has no `log` backend of its own
//! (for example a mobile app shell) can install a [`Logger`] with
//! [`set_logger`] to receive the messages.

use std::sync::{Arc, OnceLock};

/// Receives log messages emitted by the store.
///
/// # Examples
///
/// ```rust
/// use secure_key_store::logger::{LogLevel, Logger};
///
/// struct StderrLogger;
///
/// impl Logger for StderrLogger {
///     fn log(&self, level: LogLevel, message: String) {
///         eprintln!("[{level:?}] {message}");
///     }
/// }
/// ```
pub trait Logger: Sync + Send {
    /// Logs `message` at `level`.
    fn log(&self, level: LogLevel, message: String);
}

/// Severity of a log message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Very low priority, extremely detailed messages.
    Trace,
    /// Lower priority debugging information.
    Debug,
    /// Progress of the store: key generation, resets.
    Info,
    /// Potentially harmful situations the store recovered from.
    Warn,
    /// Failed operations.
    Error,
}

struct ForeignLogger;

impl log::Log for ForeignLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        if !should_forward(record.level(), record.module_path()) {
            return;
        }

        if let Some(logger) = LOGGER_INSTANCE.get() {
            logger.log(log_level(record.level()), format!("{}", record.args()));
        } else {
            eprintln!("Logger not set: {}", record.args());
        }
    }

    fn flush(&self) {}
}

/// Debug and trace messages are only forwarded from this crate.
fn should_forward(level: log::Level, module_path: Option<&str>) -> bool {
    let is_from_store =
        module_path.is_some_and(|module_path| module_path.starts_with("secure_key_store"));
    let is_debug_or_trace = level == log::Level::Debug || level == log::Level::Trace;
    is_from_store || !is_debug_or_trace
}

const fn log_level(level: log::Level) -> LogLevel {
    match level {
        log::Level::Error => LogLevel::Error,
        log::Level::Warn => LogLevel::Warn,
        log::Level::Info => LogLevel::Info,
        log::Level::Debug => LogLevel::Debug,
        log::Level::Trace => LogLevel::Trace,
    }
}

static LOGGER_INSTANCE: OnceLock<Arc<dyn Logger>> = OnceLock::new();

/// Installs `logger` as the receiver of all store log messages.
///
/// Only the first call takes effect; later calls are reported on stderr and
/// otherwise ignored. Installation also fails if another `log` backend was
/// registered first.
pub fn set_logger(logger: Arc<dyn Logger>) {
    if LOGGER_INSTANCE.set(logger).is_err() {
        eprintln!("Logger already set");
        return;
    }

    if let Err(e) = init_logger() {
        eprintln!("Failed to set logger: {e}");
    }
}

fn init_logger() -> Result<(), log::SetLoggerError> {
    static LOGGER: ForeignLogger = ForeignLogger;
    log::set_logger(&LOGGER)?;
    log::set_max_level(log::LevelFilter::Trace);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(log::Level::Debug, Some("secure_key_store::store"), true)]
    #[test_case(log::Level::Trace, Some("secure_key_store"), true)]
    #[test_case(log::Level::Debug, Some("rustls::client"), false)]
    #[test_case(log::Level::Trace, None, false)]
    #[test_case(log::Level::Warn, Some("rustls::client"), true)]
    #[test_case(log::Level::Error, None, true)]
    fn test_forwarding_filter(level: log::Level, module_path: Option<&str>, expected: bool) {
        assert_eq!(should_forward(level, module_path), expected);
    }

    #[derive(Default)]
    struct CapturingLogger {
        records: std::sync::Mutex<Vec<(LogLevel, String)>>,
    }

    impl Logger for CapturingLogger {
        fn log(&self, level: LogLevel, message: String) {
            self.records.lock().expect("lock").push((level, message));
        }
    }

    // The only test in this binary that installs a global logger.
    #[test]
    fn test_set_logger_forwards_store_records() {
        use crate::platform::MemoryPlatform;
        use crate::{SecureKeyStore, StoreConfig};

        let logger = Arc::new(CapturingLogger::default());
        set_logger(logger.clone());

        let platform = MemoryPlatform::new();
        let store = SecureKeyStore::new(
            StoreConfig::default(),
            platform.key_service.clone(),
            platform.preferences.clone(),
        );
        store.initialize();

        let records = logger.records.lock().expect("lock");
        assert!(records
            .iter()
            .any(|(level, message)| *level == LogLevel::Info && message == "secure key store ready"));
        assert!(records
            .iter()
            .any(|(level, message)| *level == LogLevel::Debug
                && message == "initializing secure key store"));
        drop(records);

        set_logger(Arc::new(CapturingLogger::default()));
    }

    #[test]
    fn test_level_mapping() {
        assert_eq!(log_level(log::Level::Error), LogLevel::Error);
        assert_eq!(log_level(log::Level::Trace), LogLevel::Trace);
        assert!(LogLevel::Warn > LogLevel::Info);
    }
}
