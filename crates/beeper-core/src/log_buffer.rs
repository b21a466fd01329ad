//! Log Buffer - ring of recent log lines for the status panel.
//!
//! `no_std` compatible; the host wraps it in whatever lock it has.

use heapless::Deque;

/// Maximum number of log lines kept
pub const LOG_BUFFER_CAPACITY: usize = 64;

/// Maximum length of a single log line
pub const LOG_LINE_MAX_LEN: usize = 96;

/// Severity of a captured line. Ordered so that `Error` is the most severe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
}

impl LogLevel {
    pub fn prefix(&self) -> &'static str {
        match self {
            LogLevel::Trace => "[TRACE]",
            LogLevel::Debug => "[DEBUG]",
            LogLevel::Info => "[INFO] ",
            LogLevel::Warn => "[WARN] ",
            LogLevel::Error => "[ERROR]",
        }
    }
}

impl From<log::Level> for LogLevel {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => LogLevel::Error,
            log::Level::Warn => LogLevel::Warn,
            log::Level::Info => LogLevel::Info,
            log::Level::Debug => LogLevel::Debug,
            log::Level::Trace => LogLevel::Trace,
        }
    }
}

#[derive(Clone, Debug)]
pub struct LogEntry {
    pub level: LogLevel,
    /// Wall-clock stamp supplied by the host, `HH:MM:SS`.
    pub stamp: heapless::String<8>,
    /// Message, cut at `LOG_LINE_MAX_LEN` bytes.
    pub message: heapless::String<LOG_LINE_MAX_LEN>,
}

impl LogEntry {
    pub fn new(level: LogLevel, stamp: &str, message: &str) -> Self {
        Self {
            level,
            stamp: truncated(stamp),
            message: truncated(message),
        }
    }
}

fn truncated<const N: usize>(text: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    for c in text.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

/// Fixed-size ring; the oldest line is dropped when full.
pub struct LogBuffer {
    entries: Deque<LogEntry, LOG_BUFFER_CAPACITY>,
    min_level: LogLevel,
}

impl LogBuffer {
    pub const fn new() -> Self {
        Self {
            entries: Deque::new(),
            min_level: LogLevel::Info,
        }
    }

    pub fn set_min_level(&mut self, level: LogLevel) {
        self.min_level = level;
    }

    pub fn push(&mut self, entry: LogEntry) {
        if entry.level < self.min_level {
            return;
        }
        if self.entries.is_full() {
            self.entries.pop_front();
        }
        // Room was made above.
        let _ = self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    /// The last `count` entries, oldest first, ready to render top to bottom.
    pub fn tail(&self, count: usize) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().skip(self.entries.len().saturating_sub(count))
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new()
    }
}
