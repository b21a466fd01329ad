//! Host capabilities that must be granted before the beeper may start.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Capability {
    #[error("exact alarm scheduling is not permitted")]
    ExactAlarms,
    #[error("posting the status notice is not permitted")]
    Notifications,
}

impl Capability {
    /// Text shown to the user while redirecting to the grant surface.
    pub fn prompt(&self) -> &'static str {
        match self {
            Capability::ExactAlarms => "Please allow Exact Alarms!",
            Capability::Notifications => "Please allow notifications!",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub exact_alarms: bool,
    pub notifications: bool,
}

impl Capabilities {
    pub const ALL: Self = Self {
        exact_alarms: true,
        notifications: true,
    };

    /// First missing capability, in the order the user has to grant them.
    pub fn missing(&self) -> Option<Capability> {
        if !self.exact_alarms {
            Some(Capability::ExactAlarms)
        } else if !self.notifications {
            Some(Capability::Notifications)
        } else {
            None
        }
    }
}

pub trait CapabilityProbe {
    fn probe(&self) -> Capabilities;
}
