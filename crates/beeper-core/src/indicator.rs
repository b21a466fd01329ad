//! Presence indicator: the persistent status surface that keeps the task in
//! the foreground tier and carries the stop action.

use thiserror::Error;

use crate::consts;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Importance {
    Low,
    Default,
    High,
}

/// Content of the presence indicator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub channel_id: &'static str,
    pub channel_name: &'static str,
    pub importance: Importance,
    pub title: &'static str,
    pub body: &'static str,
    pub stop_label: &'static str,
}

impl Notice {
    pub const fn beeper() -> Self {
        Self {
            channel_id: consts::NOTICE_CHANNEL_ID,
            channel_name: consts::NOTICE_CHANNEL_NAME,
            importance: Importance::Low,
            title: consts::NOTICE_TITLE,
            body: consts::NOTICE_BODY,
            stop_label: consts::NOTICE_STOP_LABEL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndicatorError {
    #[error("status surface is not available")]
    Unavailable,
}

pub trait PresenceIndicator {
    fn show(&mut self, notice: &Notice) -> Result<(), IndicatorError>;
    fn dismiss(&mut self);
}
