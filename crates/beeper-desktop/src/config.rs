//! Settings read from the environment. Interval and tone are fixed; only the
//! host's own behaviour can be tuned.

use std::str::FromStr;

use log::LevelFilter;

pub const LOG_LEVEL_VAR: &str = "MINUTE_BEEPER_LOG";
pub const AUTOSTART_VAR: &str = "MINUTE_BEEPER_AUTOSTART";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub log_level: LevelFilter,
    /// Start beeping as soon as the panel is up instead of waiting for `s`.
    pub autostart: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LevelFilter::Info,
            autostart: false,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Unparseable values keep their default and are reported as warnings.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Self::default();

        if let Some(raw) = lookup(LOG_LEVEL_VAR) {
            match LevelFilter::from_str(raw.trim()) {
                Ok(level) => settings.log_level = level,
                Err(_) => log::warn!("{}={:?} is not a log level, using {}", LOG_LEVEL_VAR, raw, settings.log_level),
            }
        }

        if let Some(raw) = lookup(AUTOSTART_VAR) {
            match parse_flag(&raw) {
                Some(flag) => settings.autostart = flag,
                None => log::warn!("{}={:?} is not a boolean, ignoring", AUTOSTART_VAR, raw),
            }
        }

        settings
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
