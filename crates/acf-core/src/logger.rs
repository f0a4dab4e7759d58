//! Hierarchical structured logging
//!
//! [`Logger`] is the sink the engine writes traffic to. A child logger
//! carries extra context that is merged into every entry it writes, so
//! nested calls keep their parent's context.
//!
//! Two strategies ship with the crate:
//! - [`TracingLogger`]: level-filtered, rendered as `message {json}` into
//!   `tracing` events under the `acf::traffic` target
//! - [`NoopLogger`]: discards everything

use crate::config::{LogLevel, LoggingConfig};
use serde_json::{Map, Value as JsonValue};
use std::fmt::Debug;
use std::sync::Arc;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Target used for every traffic entry
pub const TRAFFIC_TARGET: &str = "acf::traffic";

/// Structured context attached to a log entry
pub type LogContext = Map<String, JsonValue>;

/// Merge `overlay` over `base`; overlay keys win
#[must_use]
pub fn merge_context(base: &LogContext, overlay: &LogContext) -> LogContext {
    let mut merged = base.clone();
    for (key, value) in overlay {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Leveled, hierarchical log sink
pub trait Logger: Send + Sync + Debug {
    /// Write one entry at `level`
    fn log(&self, level: LogLevel, message: &str, context: &LogContext);

    /// Named event (always informational)
    fn event(&self, name: &str, context: &LogContext);

    /// Logger that adds `context` to every entry
    fn child(&self, context: LogContext) -> Arc<dyn Logger>;

    fn debug(&self, message: &str, context: &LogContext) {
        self.log(LogLevel::Debug, message, context);
    }

    fn info(&self, message: &str, context: &LogContext) {
        self.log(LogLevel::Info, message, context);
    }

    fn warn(&self, message: &str, context: &LogContext) {
        self.log(LogLevel::Warn, message, context);
    }

    fn error(&self, message: &str, context: &LogContext) {
        self.log(LogLevel::Error, message, context);
    }
}

/// Logger backed by `tracing`
#[derive(Debug, Clone)]
pub struct TracingLogger {
    min_level: LogLevel,
    context: LogContext,
}

impl TracingLogger {
    /// Create root logger filtered at `min_level`
    #[must_use]
    pub fn new(min_level: LogLevel) -> Self {
        Self {
            min_level,
            context: LogContext::new(),
        }
    }

    fn render(&self, message: &str, context: &LogContext) -> String {
        let merged = merge_context(&self.context, context);
        if merged.is_empty() {
            message.to_string()
        } else {
            format!("{message} {}", JsonValue::Object(merged))
        }
    }
}

impl Logger for TracingLogger {
    fn log(&self, level: LogLevel, message: &str, context: &LogContext) {
        if !self.min_level.allows(level) {
            return;
        }
        let line = self.render(message, context);
        match level {
            LogLevel::Debug => tracing::debug!(target: TRAFFIC_TARGET, "{line}"),
            LogLevel::Info => tracing::info!(target: TRAFFIC_TARGET, "{line}"),
            LogLevel::Warn => tracing::warn!(target: TRAFFIC_TARGET, "{line}"),
            LogLevel::Error => tracing::error!(target: TRAFFIC_TARGET, "{line}"),
        }
    }

    fn event(&self, name: &str, context: &LogContext) {
        if !self.min_level.allows(LogLevel::Info) {
            return;
        }
        let line = self.render(name, context);
        tracing::info!(target: TRAFFIC_TARGET, event = name, "{line}");
    }

    fn child(&self, context: LogContext) -> Arc<dyn Logger> {
        Arc::new(Self {
            min_level: self.min_level,
            context: merge_context(&self.context, &context),
        })
    }
}

/// Logger that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn log(&self, _level: LogLevel, _message: &str, _context: &LogContext) {}

    fn event(&self, _name: &str, _context: &LogContext) {}

    fn child(&self, _context: LogContext) -> Arc<dyn Logger> {
        Arc::new(Self)
    }
}

/// Logger selected by configuration
#[must_use]
pub fn logger_for(config: &LoggingConfig) -> Arc<dyn Logger> {
    if config.log_to_console {
        Arc::new(TracingLogger::new(config.level))
    } else {
        Arc::new(NoopLogger)
    }
}

/// Install a `tracing-subscriber` fmt layer
///
/// `RUST_LOG` takes precedence over `level`. Returns `false` if a global
/// subscriber was already installed.
pub fn init_tracing(level: LogLevel) -> bool {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level.to_tracing()).into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn ctx(value: JsonValue) -> LogContext {
        match value {
            JsonValue::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn child_keys_win_over_parent() {
        let parent = ctx(json!({"component": "engine", "op": "read"}));
        let child = ctx(json!({"op": "update"}));
        assert_eq!(
            JsonValue::Object(merge_context(&parent, &child)),
            json!({"component": "engine", "op": "update"})
        );
    }

    #[test]
    fn render_appends_json_context() {
        let logger = TracingLogger {
            min_level: LogLevel::Debug,
            context: ctx(json!({"engine": "acf"})),
        };
        assert_eq!(
            logger.render("done", &ctx(json!({"ms": 3}))),
            r#"done {"engine":"acf","ms":3}"#
        );
        assert_eq!(TracingLogger::new(LogLevel::Info).render("bare", &LogContext::new()), "bare");
    }

    #[test]
    fn logger_selection_follows_config() {
        let mut config = LoggingConfig::default();
        assert!(format!("{:?}", logger_for(&config)).contains("TracingLogger"));
        config.log_to_console = false;
        assert!(format!("{:?}", logger_for(&config)).contains("NoopLogger"));
    }

    #[test]
    fn init_tracing_is_idempotent() {
        let _ = init_tracing(LogLevel::Debug);
        assert!(!init_tracing(LogLevel::Debug));
    }

    #[test]
    fn noop_accepts_everything() {
        let logger = NoopLogger;
        logger.error("ignored", &LogContext::new());
        logger.child(LogContext::new()).event("ignored", &LogContext::new());
    }
}
