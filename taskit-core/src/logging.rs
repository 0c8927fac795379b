//! Logger interface (`spec.md` §1, §2): `log(level, message)` with levels
//! `DEBUG | INFO | ERROR | IMPORTANT`. Grounded in
//! `server/lib/flux/src/logging.rs`, which builds a `slog` logger via
//! `sloggers`; here that becomes a small reusable wrapper rather than a
//! one-off `init()` function.

/// The four levels TaskIt components log at. `Important` has no direct
/// `slog::Level` counterpart and is mapped to `Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug,
    Info,
    Error,
    Important,
}

impl Level {
    fn to_slog(self) -> slog::Level {
        match self {
            Level::Debug => slog::Level::Debug,
            Level::Info => slog::Level::Info,
            Level::Error => slog::Level::Error,
            Level::Important => slog::Level::Critical,
        }
    }
}

#[derive(Clone)]
enum Inner {
    Slog(slog::Logger),
    /// Fans a log event out to every child, the structural equivalent of
    /// `taskit.log.Splitter`/`LoggerNode`.
    Fanout(Vec<Logger>),
}

/// A handle to a configured logger. Cheap to clone.
#[derive(Clone)]
pub struct Logger(Inner);

impl Logger {
    /// A logger that discards everything, equivalent to `null_logger`.
    pub fn null() -> Self {
        Logger(Inner::Slog(slog::Logger::root(slog::Discard, slog::o!())))
    }

    /// Wrap an existing `slog::Logger`, for callers who already have their
    /// own `slog` drain pipeline set up.
    pub fn from_slog(logger: slog::Logger) -> Self {
        Logger(Inner::Slog(logger))
    }

    /// Build a human-readable terminal logger, filtered to `min_level` and
    /// above. Equivalent to `flux::logging::init()`.
    pub fn terminal(min_level: Level) -> Self {
        use sloggers::terminal::{Destination, TerminalLoggerBuilder};
        use sloggers::types::Severity;
        use sloggers::Build;

        let severity = match min_level {
            Level::Debug => Severity::Debug,
            Level::Info => Severity::Info,
            Level::Error => Severity::Error,
            Level::Important => Severity::Critical,
        };

        let mut builder = TerminalLoggerBuilder::new();
        builder.level(severity);
        builder.destination(Destination::Stderr);

        let logger = builder
            .build()
            .expect("terminal logger configuration is always valid");
        Logger(Inner::Slog(logger))
    }

    /// Fan a log event out to every logger in `loggers`.
    pub fn fanout(loggers: Vec<Logger>) -> Self {
        if loggers.is_empty() {
            Logger::null()
        } else {
            Logger(Inner::Fanout(loggers))
        }
    }

    /// Log `message` at `level`, matching the spec's flat `log(level, msg)`
    /// contract.
    pub fn log(&self, level: Level, message: &str) {
        match &self.0 {
            Inner::Slog(logger) => slog::log!(logger, level.to_slog(), "", "{}", message),
            Inner::Fanout(children) => {
                for child in children {
                    child.log(level, message);
                }
            }
        }
    }

    pub fn debug(&self, message: &str) {
        self.log(Level::Debug, message);
    }

    pub fn info(&self, message: &str) {
        self.log(Level::Info, message);
    }

    pub fn error(&self, message: &str) {
        self.log(Level::Error, message);
    }

    pub fn important(&self, message: &str) {
        self.log(Level::Important, message);
    }
}

impl Default for Logger {
    fn default() -> Self {
        Logger::null()
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Logger(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_logger_does_not_panic() {
        let log = Logger::null();
        log.debug("quiet");
        log.info("quiet");
        log.error("quiet");
        log.important("quiet");
    }

    #[test]
    fn fanout_of_zero_is_null() {
        let log = Logger::fanout(vec![]);
        log.info("still quiet");
    }

    #[test]
    fn fanout_reaches_every_child() {
        let log = Logger::fanout(vec![Logger::null(), Logger::null()]);
        log.error("both get it");
    }
}
