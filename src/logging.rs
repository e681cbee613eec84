use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

/// Severity threshold, ordered from most to least severe. A record is emitted only when its
/// severity is numerically less than or equal to the configured threshold, so `Off` (0) emits
/// nothing and `Verbose` (6) emits everything.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Off = 0,
    Fatal = 1,
    Error = 2,
    Warn = 3,
    Info = 4,
    Debug = 5,
    Verbose = 6,
}

impl LogLevel {
    fn label(self) -> &'static str {
        match self {
            LogLevel::Off => "OFF",
            LogLevel::Fatal => "FATAL",
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Verbose => "VERBOSE",
        }
    }
}

/// Per-context logging facade handed out by [`LoggerSingleton::create_logger`].
///
/// The threshold that gates emission is global, not per-context, matching how the runtime was
/// originally configured: one process-wide verbosity dial, many named contexts for readability.
pub trait Logger: Send + Sync {
    fn log(&self, level: LogLevel, message: &str);

    fn fatal(&self, message: &str) {
        self.log(LogLevel::Fatal, message);
    }
    fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }
    fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }
    fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }
    fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }
    fn verbose(&self, message: &str) {
        self.log(LogLevel::Verbose, message);
    }
}

/// A context's id and description, framed as `[id: description] message` on one stdout line.
struct ContextLogger {
    ctx_id: String,
    ctx_description: String,
}

impl Logger for ContextLogger {
    fn log(&self, level: LogLevel, message: &str) {
        if level == LogLevel::Off {
            return;
        }
        if level > LoggerSingleton::get_log_level() {
            return;
        }
        println!(
            "[{}: {}] {}: {}",
            self.ctx_id,
            self.ctx_description,
            level.label(),
            message
        );
    }
}

/// Process-wide logger registry and verbosity threshold.
///
/// `CreateLogger` is idempotent per `ctx_id`: calling it twice with the same id returns the same
/// handle rather than creating a duplicate context.
pub struct LoggerSingleton;

static LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);
static REGISTRY: OnceLock<Mutex<HashMap<String, Arc<dyn Logger>>>> = OnceLock::new();

impl LoggerSingleton {
    fn registry() -> &'static Mutex<HashMap<String, Arc<dyn Logger>>> {
        REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
    }

    pub fn create_logger(ctx_id: impl Into<String>, ctx_description: impl Into<String>) -> Arc<dyn Logger> {
        let ctx_id = ctx_id.into();
        let mut registry = Self::registry().lock();
        if let Some(existing) = registry.get(&ctx_id) {
            return existing.clone();
        }
        let logger: Arc<dyn Logger> = Arc::new(ContextLogger {
            ctx_id: ctx_id.clone(),
            ctx_description: ctx_description.into(),
        });
        registry.insert(ctx_id, logger.clone());
        logger
    }

    pub fn set_log_level(level: LogLevel) {
        LEVEL.store(level as u8, Ordering::Relaxed);
    }

    pub fn get_log_level() -> LogLevel {
        match LEVEL.load(Ordering::Relaxed) {
            0 => LogLevel::Off,
            1 => LogLevel::Fatal,
            2 => LogLevel::Error,
            3 => LogLevel::Warn,
            4 => LogLevel::Info,
            5 => LogLevel::Debug,
            _ => LogLevel::Verbose,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_logger_is_idempotent_per_context() {
        let a = LoggerSingleton::create_logger("ctx.a", "first");
        let b = LoggerSingleton::create_logger("ctx.a", "second call ignored");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn level_filters_by_severity_order() {
        LoggerSingleton::set_log_level(LogLevel::Warn);
        assert!(LogLevel::Error <= LoggerSingleton::get_log_level());
        assert!(LogLevel::Debug > LoggerSingleton::get_log_level());
        LoggerSingleton::set_log_level(LogLevel::Info);
    }
}
