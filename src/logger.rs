//! Injected logging.
//!
//! The orchestrator and every stage that reports progress receive a
//! `&dyn Logger`. Nothing is global: callers that want output pass a
//! [`LogFacade`], everyone else gets the [`NoopLogger`].

use log::Level;
use std::cell::RefCell;

pub trait Logger {
    fn log(&self, level: Level, message: &str);

    fn debug(&self, message: &str) {
        self.log(Level::Debug, message);
    }

    fn info(&self, message: &str) {
        self.log(Level::Info, message);
    }

    fn warn(&self, message: &str) {
        self.log(Level::Warn, message);
    }

    fn error(&self, message: &str) {
        self.log(Level::Error, message);
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn log(&self, _level: Level, _message: &str) {}
}

/// Forwards to the `log` crate under the `htmlc` target, so any installed
/// `log` backend picks the messages up.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogFacade;

impl Logger for LogFacade {
    fn log(&self, level: Level, message: &str) {
        log::log!(target: "htmlc", level, "{}", message);
    }
}

/// Keeps every message in memory. Useful for embedding the compiler in tools
/// that render diagnostics themselves.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    entries: RefCell<Vec<(Level, String)>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(Level, String)> {
        self.entries.borrow().clone()
    }

    pub fn messages_at(&self, level: Level) -> Vec<String> {
        self.entries
            .borrow()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }
}

impl Logger for MemoryLogger {
    fn log(&self, level: Level, message: &str) {
        self.entries.borrow_mut().push((level, message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_logger_filters_by_level() {
        let logger = MemoryLogger::new();
        logger.info("transpiling");
        logger.warn("slot dropped");
        logger.debug("file a.html");

        assert_eq!(logger.entries().len(), 3);
        assert_eq!(logger.messages_at(Level::Warn), vec!["slot dropped".to_string()]);
    }

    #[test]
    fn test_noop_and_facade_accept_messages() {
        NoopLogger.warn("ignored");
        LogFacade.info("no backend installed, still fine");
    }
}
