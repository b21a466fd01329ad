//! Host doubles for unit tests. They share a journal so tests can assert on
//! the order resources were touched in.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, TimeZone};

use crate::buzzer::{ToneError, ToneGenerator};
use crate::capability::{Capabilities, CapabilityProbe};
use crate::indicator::{IndicatorError, Notice, PresenceIndicator};
use crate::trigger::{AlarmScheduler, Clock, ScheduleError, Trigger};
use crate::wake::WakeLock;

/// 2024-01-01 at the given UTC time of day.
pub fn at(hour: u32, minute: u32, second: u32, nanos: u32) -> DateTime<FixedOffset> {
    let utc = FixedOffset::east_opt(0).unwrap();
    utc.with_ymd_and_hms(2024, 1, 1, hour, minute, second)
        .unwrap()
        + chrono::TimeDelta::nanoseconds(i64::from(nanos))
}

#[derive(Clone, Default)]
pub struct Journal(Rc<RefCell<Vec<String>>>);

impl Journal {
    pub fn record(&self, entry: &str) {
        self.0.borrow_mut().push(entry.to_string());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

pub struct FakeClock {
    now: DateTime<FixedOffset>,
}

impl FakeClock {
    pub fn new(now: DateTime<FixedOffset>) -> Self {
        Self { now }
    }

    pub fn set(&mut self, now: DateTime<FixedOffset>) {
        self.now = now;
    }
}

impl Clock for FakeClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.now
    }
}

#[derive(Default)]
pub struct FakeAlarms {
    pub registered: Vec<Trigger>,
    pub sets: usize,
    pub cancels: usize,
    pub deny: bool,
}

impl AlarmScheduler for FakeAlarms {
    fn set_exact_and_allow_while_idle(&mut self, trigger: &Trigger) -> Result<(), ScheduleError> {
        if self.deny {
            return Err(ScheduleError::PermissionDenied);
        }
        self.sets += 1;
        self.registered.retain(|t| t.id != trigger.id);
        self.registered.push(*trigger);
        Ok(())
    }

    fn cancel(&mut self, id: &'static str) {
        self.cancels += 1;
        self.registered.retain(|t| t.id != id);
    }
}

pub struct FakeTone {
    journal: Journal,
    pub beeps: Vec<(u32, u32)>,
    pub open_fails: bool,
    pub beep_fails: bool,
}

impl FakeTone {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
            beeps: Vec::new(),
            open_fails: false,
            beep_fails: false,
        }
    }
}

impl ToneGenerator for FakeTone {
    fn open(&mut self) -> Result<(), ToneError> {
        self.journal.record("tone.open");
        if self.open_fails {
            return Err(ToneError::DeviceUnavailable);
        }
        Ok(())
    }

    fn beep(&mut self, frequency_hz: u32, duration_ms: u32) -> Result<(), ToneError> {
        self.journal.record("tone.beep");
        if self.beep_fails {
            return Err(ToneError::Playback("speaker jammed"));
        }
        self.beeps.push((frequency_hz, duration_ms));
        Ok(())
    }

    fn release(&mut self) {
        self.journal.record("tone.release");
    }
}

pub struct FakeWake {
    journal: Journal,
    held: bool,
    pub last_timeout: Option<Duration>,
}

impl FakeWake {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
            held: false,
            last_timeout: None,
        }
    }

    /// Simulate the host dropping the assertion when its timeout lapses.
    pub fn expire(&mut self) {
        self.held = false;
    }
}

impl WakeLock for FakeWake {
    fn acquire(&mut self, timeout: Duration) {
        self.journal.record("wake.acquire");
        self.held = true;
        self.last_timeout = Some(timeout);
    }

    fn release(&mut self) {
        self.journal.record("wake.release");
        self.held = false;
    }

    fn is_held(&self) -> bool {
        self.held
    }
}

pub struct FakeIndicator {
    journal: Journal,
    pub shown: Option<Notice>,
    pub refuse: bool,
}

impl FakeIndicator {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
            shown: None,
            refuse: false,
        }
    }
}

impl PresenceIndicator for FakeIndicator {
    fn show(&mut self, notice: &Notice) -> Result<(), IndicatorError> {
        if self.refuse {
            return Err(IndicatorError::Unavailable);
        }
        self.journal.record("indicator.show");
        self.shown = Some(notice.clone());
        Ok(())
    }

    fn dismiss(&mut self) {
        self.journal.record("indicator.dismiss");
        self.shown = None;
    }
}

pub struct FakeProbe(pub Capabilities);

impl CapabilityProbe for FakeProbe {
    fn probe(&self) -> Capabilities {
        self.0
    }
}
