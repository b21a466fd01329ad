//! Wall-clock alarms for the desktop host.
//!
//! Each registration gets its own timer thread. The thread sleeps in short
//! slices and re-reads the wall clock after each one, so a trigger whose time
//! passed while the machine was suspended fires right after resume.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use beeper_core::trigger::{AlarmScheduler, Clock, ScheduleError, Trigger};
use chrono::{DateTime, FixedOffset, Local, Utc};

use crate::AppEvent;

const POLL_SLICE: Duration = Duration::from_secs(1);

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

struct PendingTimer {
    id: &'static str,
    generation: u64,
    shutdown: Sender<()>,
    thread: JoinHandle<()>,
}

impl PendingTimer {
    fn stop(self) {
        // A closed channel means the timer already fired.
        let _ = self.shutdown.send(());
        if self.thread.join().is_err() {
            log::warn!("alarm thread for #{} panicked", self.generation);
        }
    }
}

/// One-shot alarm service. Setting an alarm replaces the pending one.
pub struct ThreadAlarms {
    events: Sender<AppEvent>,
    pending: Option<PendingTimer>,
}

impl ThreadAlarms {
    pub fn new(events: Sender<AppEvent>) -> Self {
        Self {
            events,
            pending: None,
        }
    }
}

impl AlarmScheduler for ThreadAlarms {
    fn set_exact_and_allow_while_idle(&mut self, trigger: &Trigger) -> Result<(), ScheduleError> {
        if let Some(previous) = self.pending.take() {
            previous.stop();
        }

        let (shutdown, shutdown_rx) = mpsc::channel::<()>();
        let events = self.events.clone();
        let generation = trigger.generation;
        let due = trigger.due;

        let thread = thread::Builder::new()
            .name(format!("alarm-{}", generation))
            .spawn(move || {
                loop {
                    let remaining = due.signed_duration_since(Utc::now());
                    let Ok(remaining) = remaining.to_std() else {
                        break;
                    };
                    if remaining.is_zero() {
                        break;
                    }
                    match shutdown_rx.recv_timeout(remaining.min(POLL_SLICE)) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        // Cancelled, or the owner went away.
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
                    }
                }
                log::trace!("alarm #{} due", generation);
                let _ = events.send(AppEvent::TriggerFired(generation));
            })
            .map_err(|e| {
                log::error!("could not spawn alarm thread: {}", e);
                ScheduleError::Unavailable("could not spawn alarm thread")
            })?;

        self.pending = Some(PendingTimer {
            id: trigger.id,
            generation,
            shutdown,
            thread,
        });
        Ok(())
    }

    fn cancel(&mut self, id: &'static str) {
        match self.pending.take() {
            Some(timer) if timer.id == id => timer.stop(),
            other => self.pending = other,
        }
    }
}

impl Drop for ThreadAlarms {
    fn drop(&mut self) {
        if let Some(timer) = self.pending.take() {
            timer.stop();
        }
    }
}
