//! Trigger scheduling: when the next beep is due and how it gets registered
//! with the host's wake-capable alarm service.

use chrono::{DateTime, FixedOffset, TimeDelta, Timelike};
use thiserror::Error;

use crate::consts::BEEP_TRIGGER_ID;

/// Source of the current local wall-clock time.
pub trait Clock {
    fn now(&self) -> DateTime<FixedOffset>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    /// The host refused to schedule exact, idle-bypassing alarms.
    #[error("permission missing for exact alarm")]
    PermissionDenied,
    #[error("alarm service unavailable: {0}")]
    Unavailable(&'static str),
    #[error("next trigger time is out of range")]
    OutOfRange,
}

/// A registered one-shot wake-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trigger {
    pub id: &'static str,
    /// Increases with every registration; fires carrying an older value are stale.
    pub generation: u64,
    pub due: DateTime<FixedOffset>,
}

/// Host alarm service.
pub trait AlarmScheduler {
    /// Register `trigger` so that it fires at `trigger.due` even while the host
    /// is idle. Replaces any pending registration with the same id.
    fn set_exact_and_allow_while_idle(&mut self, trigger: &Trigger) -> Result<(), ScheduleError>;

    /// Drop the pending registration for `id`, if any.
    fn cancel(&mut self, id: &'static str);
}

/// `now` plus one minute, truncated to the minute: 10:00:15 yields 10:01:00.
pub fn next_trigger_after(now: DateTime<FixedOffset>) -> Result<DateTime<FixedOffset>, ScheduleError> {
    now.checked_add_signed(TimeDelta::minutes(1))
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .ok_or(ScheduleError::OutOfRange)
}

/// Owns the single pending trigger and the host alarm service it is registered with.
pub struct TriggerScheduler<A> {
    alarms: A,
    pending: Option<Trigger>,
    generation: u64,
}

impl<A: AlarmScheduler> TriggerScheduler<A> {
    pub fn new(alarms: A) -> Self {
        Self {
            alarms,
            pending: None,
            generation: 0,
        }
    }

    /// Compute the next boundary after `now` and register it, replacing whatever
    /// was pending. On failure nothing is pending afterwards.
    pub fn arm(&mut self, now: DateTime<FixedOffset>) -> Result<Trigger, ScheduleError> {
        self.pending = None;
        let due = next_trigger_after(now)?;
        self.generation += 1;
        let trigger = Trigger {
            id: BEEP_TRIGGER_ID,
            generation: self.generation,
            due,
        };
        self.alarms.set_exact_and_allow_while_idle(&trigger)?;
        log::debug!("next beep armed for {} (#{})", trigger.due, trigger.generation);
        self.pending = Some(trigger);
        Ok(trigger)
    }

    /// Take the pending trigger if `generation` identifies it.
    pub fn claim(&mut self, generation: u64) -> Option<Trigger> {
        match self.pending {
            Some(trigger) if trigger.generation == generation => self.pending.take(),
            _ => None,
        }
    }

    pub fn cancel(&mut self) {
        if let Some(trigger) = self.pending.take() {
            self.alarms.cancel(trigger.id);
            log::debug!("cancelled pending beep #{}", trigger.generation);
        }
    }

    pub fn pending(&self) -> Option<&Trigger> {
        self.pending.as_ref()
    }

    pub fn alarms(&self) -> &A {
        &self.alarms
    }

    pub fn alarms_mut(&mut self) -> &mut A {
        &mut self.alarms
    }
}
