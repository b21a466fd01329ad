//! Log capture module - keeps recent log lines for the status panel.
//!
//! Every record goes into a shared `LogBuffer`. While the panel owns the
//! terminal, console echo is switched off so lines don't scribble over it.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use beeper_core::log_buffer::{LogBuffer, LogEntry, LogLevel};
use log::{LevelFilter, Log, Metadata, Record};

/// Global log buffer for capturing log messages.
static LOG_BUFFER: Mutex<LogBuffer> = Mutex::new(LogBuffer::new());

static CONSOLE_ECHO: AtomicBool = AtomicBool::new(true);

pub struct CaptureLogger;

impl Log for CaptureLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let stamp = chrono::Local::now().format("%H:%M:%S").to_string();
        let message = record.args().to_string();
        let entry = LogEntry::new(LogLevel::from(record.level()), &stamp, &message);

        if CONSOLE_ECHO.load(Ordering::Relaxed) {
            eprintln!("{} {}: {}", render_line(&entry), record.target(), message);
        }

        if let Ok(mut buffer) = LOG_BUFFER.lock() {
            buffer.push(entry);
        }
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger;

/// Install the capture logger at `Info`. Safe to call more than once.
pub fn init() {
    if let Ok(mut buffer) = LOG_BUFFER.lock() {
        buffer.set_min_level(LogLevel::Trace);
    }
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Info);
    }
}

pub fn set_console_echo(enabled: bool) {
    CONSOLE_ECHO.store(enabled, Ordering::Relaxed);
}

/// The last `count` captured lines, oldest first.
pub fn recent_log_entries(count: usize) -> Vec<LogEntry> {
    LOG_BUFFER
        .lock()
        .ok()
        .map(|buffer| buffer.tail(count).cloned().collect())
        .unwrap_or_default()
}

/// `HH:MM:SS [LEVEL]` prefix shared by the console echo and the panel.
pub fn render_line(entry: &LogEntry) -> String {
    format!("{} {}", entry.stamp, entry.level.prefix())
}
