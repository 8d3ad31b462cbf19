//! Forwarding of `log` records to a host-provided logger.

use std::sync::{Arc, OnceLock};

/// Receives log records from the key manager in the host application.
///
/// Implemented in Swift or Kotlin and installed once with [`set_logger`].
/// Records never contain plaintext or ciphertext; only aliases, sizes and
/// protocol phases.
///
/// ```rust
/// use biokey_core::logger::{LogLevel, Logger};
///
/// struct StderrLogger;
///
/// impl Logger for StderrLogger {
///     fn log(&self, level: LogLevel, message: String) {
///         eprintln!("[{level:?}] {message}");
///     }
/// }
/// ```
///
/// ## Kotlin
///
/// ```kotlin
/// object BioKeyLogger : Logger {
///     override fun log(level: LogLevel, message: String) {
///         when (level) {
///             LogLevel.ERROR -> Log.e("BioKey", message)
///             LogLevel.WARN -> Log.w("BioKey", message)
///             else -> Log.d("BioKey", message)
///         }
///     }
/// }
///
/// setLogger(BioKeyLogger, LogLevel.INFO) // once, in Application.onCreate
/// ```
#[uniffi::export(with_foreign)]
pub trait Logger: Sync + Send {
    /// Handles one record.
    fn log(&self, level: LogLevel, message: String);
}

/// Severity of a log record, most verbose first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, uniffi::Enum)]
pub enum LogLevel {
    /// Very detailed tracing.
    Trace,
    /// Protocol phases and decisions.
    Debug,
    /// Key lifecycle events and challenges.
    Info,
    /// Failed or canceled authentications, degraded probes.
    Warn,
    /// Store failures.
    Error,
}

impl From<log::Level> for LogLevel {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Self::Error,
            log::Level::Warn => Self::Warn,
            log::Level::Info => Self::Info,
            log::Level::Debug => Self::Debug,
            log::Level::Trace => Self::Trace,
        }
    }
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Self::Error,
            LogLevel::Warn => Self::Warn,
            LogLevel::Info => Self::Info,
            LogLevel::Debug => Self::Debug,
            LogLevel::Trace => Self::Trace,
        }
    }
}

/// Forwards `log` records to the installed foreign [`Logger`].
struct ForeignLogger;

impl log::Log for ForeignLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) || !should_forward(record) {
            return;
        }
        if let Some(logger) = LOGGER_INSTANCE.get() {
            logger.log(record.level().into(), record.args().to_string());
        }
    }

    fn flush(&self) {}
}

/// Debug and trace records from dependencies are noise on a phone console.
fn should_forward(record: &log::Record) -> bool {
    let verbose = matches!(record.level(), log::Level::Debug | log::Level::Trace);
    !verbose
        || record
            .module_path()
            .is_some_and(|module_path| module_path.starts_with("biokey"))
}

static LOGGER_INSTANCE: OnceLock<Arc<dyn Logger>> = OnceLock::new();

/// Installs the foreign logger and the maximum level forwarded to it.
///
/// Only the first call installs a logger; later calls only adjust the level.
#[uniffi::export]
pub fn set_logger(logger: Arc<dyn Logger>, max_level: LogLevel) {
    if LOGGER_INSTANCE.set(logger).is_err() {
        log::warn!("logger already set, keeping the first one");
    }

    static FORWARDER: ForeignLogger = ForeignLogger;
    // Fails when another `log` backend is already installed; records then go there.
    let _ = log::set_logger(&FORWARDER);
    log::set_max_level(max_level.into());
}
