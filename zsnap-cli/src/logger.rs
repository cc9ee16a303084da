//! Logging abstraction for testable output.
//!
//! Messages go through a `Logger` so commands can be tested against a
//! capturing logger instead of stderr.

use std::io::Write;
use std::sync::{Arc, RwLock};

/// Log level, from most to least severe.
///
/// A logger configured at a level shows every message at that level or
/// a more severe one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Error,
    Warn,
    Info,
    /// -v
    Verbose,
    /// -vv
    Debug,
}

impl Verbosity {
    /// Level selected by `-q` and the number of `-v` flags.
    pub fn from_flags(quiet: bool, verbose_count: u8) -> Self {
        if quiet {
            return Verbosity::Warn;
        }
        match verbose_count {
            0 => Verbosity::Info,
            1 => Verbosity::Verbose,
            _ => Verbosity::Debug,
        }
    }
}

/// Trait for logging output.
pub trait Logger: Send + Sync {
    /// Log a message at the given level.
    fn log(&self, level: Verbosity, message: &str);

    fn error(&self, message: &str) {
        self.log(Verbosity::Error, message);
    }

    fn warn(&self, message: &str) {
        self.log(Verbosity::Warn, message);
    }

    fn info(&self, message: &str) {
        self.log(Verbosity::Info, message);
    }

    fn verbose(&self, message: &str) {
        self.log(Verbosity::Verbose, message);
    }

    fn debug(&self, message: &str) {
        self.log(Verbosity::Debug, message);
    }
}

/// Logger that writes to stderr.
#[derive(Debug)]
pub struct StderrLogger {
    level: Verbosity,
}

impl StderrLogger {
    pub fn new(level: Verbosity) -> Self {
        Self { level }
    }
}

/// Render a message the way `StderrLogger` prints it.
pub fn format_line(level: Verbosity, message: &str) -> String {
    match level {
        Verbosity::Error => format!("error: {}", message),
        Verbosity::Warn => format!("warning: {}", message),
        _ => message.to_string(),
    }
}

impl Logger for StderrLogger {
    fn log(&self, level: Verbosity, message: &str) {
        if level <= self.level {
            let _ = writeln!(std::io::stderr(), "{}", format_line(level, message));
        }
    }
}

/// Mock logger for testing that captures all messages.
#[derive(Debug, Clone, Default)]
pub struct MockLogger {
    messages: Arc<RwLock<Vec<LogEntry>>>,
}

/// A captured log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: Verbosity,
    pub message: String,
}

impl MockLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all captured log entries.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.messages.read().unwrap().clone()
    }

    /// Get all captured messages (just the text).
    pub fn messages(&self) -> Vec<String> {
        self.entries().iter().map(|e| e.message.clone()).collect()
    }

    /// Get messages at a specific level.
    pub fn messages_at_level(&self, level: Verbosity) -> Vec<String> {
        self.entries()
            .iter()
            .filter(|e| e.level == level)
            .map(|e| e.message.clone())
            .collect()
    }

    /// Check if any message contains the given substring.
    pub fn contains(&self, substring: &str) -> bool {
        self.messages().iter().any(|m| m.contains(substring))
    }
}

impl Logger for MockLogger {
    fn log(&self, level: Verbosity, message: &str) {
        // Captured regardless of level so tests see everything
        self.messages.write().unwrap().push(LogEntry {
            level,
            message: message.to_string(),
        });
    }
}

/// A no-op logger that discards all messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn log(&self, _level: Verbosity, _message: &str) {}
}
