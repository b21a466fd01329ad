//! The beep service: a self-rescheduling task that beeps on every trigger and
//! keeps a presence indicator up while it runs.
//!
//! All transitions go through `&mut self`, so the service is always in exactly
//! one [`ServiceState`]. Host callbacks never call into the service directly:
//! they [`post`](BeepService::post) an [`Event`] and the host loop drives
//! [`dispatch_next`](BeepService::dispatch_next) / [`drain`](BeepService::drain),
//! which run one event to completion at a time.

use thiserror::Error;

use crate::buzzer::{ToneError, ToneGenerator};
use crate::capability::{Capability, CapabilityProbe};
use crate::consts::{TONE_DURATION_MS, TONE_FREQUENCY_HZ, WAKE_ASSERTION_TIMEOUT};
use crate::event::{Event, EventQueue, QueueFull, StopSource};
use crate::indicator::{IndicatorError, Notice, PresenceIndicator};
use crate::trigger::{AlarmScheduler, Clock, ScheduleError, Trigger, TriggerScheduler};
use crate::wake::{WakeGuard, WakeLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Stopped,
    Starting,
    Active,
    Beeping,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StartError {
    #[error("cannot start: {0}")]
    CapabilityMissing(Capability),
    #[error("cannot show presence indicator: {0}")]
    Indicator(IndicatorError),
}

/// Outcome of one beep-and-rearm cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub tone: Result<(), ToneError>,
    pub next: Result<Trigger, ScheduleError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Nothing was queued.
    Idle,
    /// The event did not apply (stale trigger, or not running).
    Ignored,
    Cycled(CycleReport),
    Stopped,
}

/// Host resources the service drives.
pub struct Peripherals<C, A, T, W, I> {
    pub clock: C,
    pub alarms: A,
    pub tone: T,
    pub wake: W,
    pub indicator: I,
}

pub struct BeepService<C, A, T, W, I>
where
    C: Clock,
    A: AlarmScheduler,
    T: ToneGenerator,
    W: WakeLock,
    I: PresenceIndicator,
{
    clock: C,
    scheduler: TriggerScheduler<A>,
    tone: T,
    wake: W,
    indicator: I,
    notice: Notice,
    inbox: EventQueue,
    state: ServiceState,
}

impl<C, A, T, W, I> BeepService<C, A, T, W, I>
where
    C: Clock,
    A: AlarmScheduler,
    T: ToneGenerator,
    W: WakeLock,
    I: PresenceIndicator,
{
    pub fn new(peripherals: Peripherals<C, A, T, W, I>) -> Self {
        Self {
            clock: peripherals.clock,
            scheduler: TriggerScheduler::new(peripherals.alarms),
            tone: peripherals.tone,
            wake: peripherals.wake,
            indicator: peripherals.indicator,
            notice: Notice::beeper(),
            inbox: EventQueue::new(),
            state: ServiceState::Stopped,
        }
    }

    pub fn state(&self) -> ServiceState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state != ServiceState::Stopped
    }

    pub fn pending_trigger(&self) -> Option<&Trigger> {
        self.scheduler.pending()
    }

    /// Start beeping. Starting a running service does nothing.
    pub fn start(&mut self, probe: &impl CapabilityProbe) -> Result<(), StartError> {
        if self.is_running() {
            log::debug!("start requested while {:?}, ignoring", self.state);
            return Ok(());
        }

        if let Some(missing) = probe.probe().missing() {
            log::warn!("start deferred: {}", missing);
            return Err(StartError::CapabilityMissing(missing));
        }

        self.state = ServiceState::Starting;

        if let Err(e) = self.tone.open() {
            log::error!("tone generator unavailable: {}", e);
        }

        if let Err(e) = self.indicator.show(&self.notice) {
            log::error!("presence indicator refused: {}", e);
            self.tone.release();
            self.state = ServiceState::Stopped;
            return Err(StartError::Indicator(e));
        }

        self.state = ServiceState::Active;
        log::info!("beeper started");
        // A failed first arm is logged; the service stays up without a pending trigger.
        let _ = self.rearm();
        Ok(())
    }

    /// Queue an event for the next dispatch.
    pub fn post(&mut self, event: Event) -> Result<(), QueueFull> {
        self.inbox.push(event).inspect_err(|e| log::warn!("{}", e))
    }

    /// Run the oldest queued event to completion.
    pub fn dispatch_next(&mut self) -> Dispatch {
        match self.inbox.pop() {
            None => Dispatch::Idle,
            Some(Event::TriggerFired(generation)) => self.on_trigger(generation),
            Some(Event::Stop(source)) => {
                if self.stop(source) {
                    Dispatch::Stopped
                } else {
                    Dispatch::Ignored
                }
            }
        }
    }

    /// Dispatch until the queue is empty; returns how many events were handled.
    pub fn drain(&mut self) -> usize {
        let mut handled = 0;
        while self.dispatch_next() != Dispatch::Idle {
            handled += 1;
        }
        handled
    }

    fn on_trigger(&mut self, generation: u64) -> Dispatch {
        if self.state != ServiceState::Active {
            log::debug!("trigger #{} while {:?}, ignoring", generation, self.state);
            return Dispatch::Ignored;
        }
        if self.scheduler.claim(generation).is_none() {
            log::debug!("stale trigger #{}, ignoring", generation);
            return Dispatch::Ignored;
        }

        let tone = self.beep();
        let next = self.rearm();
        Dispatch::Cycled(CycleReport { tone, next })
    }

    fn beep(&mut self) -> Result<(), ToneError> {
        self.state = ServiceState::Beeping;
        let result = {
            let _wake = WakeGuard::acquire(&mut self.wake, WAKE_ASSERTION_TIMEOUT);
            self.tone.beep(TONE_FREQUENCY_HZ, TONE_DURATION_MS)
        };
        self.state = ServiceState::Active;

        match &result {
            Ok(()) => log::info!("TING!"),
            Err(e) => log::error!("beep failed: {}", e),
        }
        result
    }

    fn rearm(&mut self) -> Result<Trigger, ScheduleError> {
        let now = self.clock.now();
        self.scheduler
            .arm(now)
            .inspect_err(|e| log::error!("could not schedule next beep: {}", e))
    }

    /// Tear the service down. Returns `false` if it was already stopped.
    pub fn stop(&mut self, source: StopSource) -> bool {
        if !self.is_running() {
            log::debug!("stop ({:?}) while stopped, ignoring", source);
            return false;
        }

        self.scheduler.cancel();
        if self.wake.is_held() {
            self.wake.release();
        }
        self.tone.release();
        self.indicator.dismiss();
        self.inbox.clear();
        self.state = ServiceState::Stopped;
        log::info!("beeper stopped ({:?})", source);
        true
    }

    pub fn peripherals(&self) -> (&C, &A, &T, &W, &I) {
        (
            &self.clock,
            self.scheduler.alarms(),
            &self.tone,
            &self.wake,
            &self.indicator,
        )
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    pub fn alarms_mut(&mut self) -> &mut A {
        self.scheduler.alarms_mut()
    }

    pub fn tone_mut(&mut self) -> &mut T {
        &mut self.tone
    }
}

impl<C, A, T, W, I> Drop for BeepService<C, A, T, W, I>
where
    C: Clock,
    A: AlarmScheduler,
    T: ToneGenerator,
    W: WakeLock,
    I: PresenceIndicator,
{
    fn drop(&mut self) {
        self.stop(StopSource::Host);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Capabilities;
    use crate::fakes::*;

    fn service_at(
        journal: &Journal,
        now: chrono::DateTime<chrono::FixedOffset>,
    ) -> BeepService<FakeClock, FakeAlarms, FakeTone, FakeWake, FakeIndicator> {
        BeepService::new(Peripherals {
            clock: FakeClock::new(now),
            alarms: FakeAlarms::default(),
            tone: FakeTone::new(journal),
            wake: FakeWake::new(journal),
            indicator: FakeIndicator::new(journal),
        })
    }

    fn fire_pending(
        service: &mut BeepService<FakeClock, FakeAlarms, FakeTone, FakeWake, FakeIndicator>,
    ) -> Dispatch {
        let trigger = *service.pending_trigger().expect("trigger pending");
        service.clock_mut().set(trigger.due);
        service.post(Event::TriggerFired(trigger.generation)).unwrap();
        service.dispatch_next()
    }

    #[test]
    fn test_start_arms_first_trigger() {
        let journal = Journal::default();
        let mut service = service_at(&journal, at(10, 0, 15, 0));

        service.start(&FakeProbe(Capabilities::ALL)).unwrap();

        assert_eq!(service.state(), ServiceState::Active);
        assert_eq!(service.pending_trigger().unwrap().due, at(10, 1, 0, 0));
        assert_eq!(journal.entries(), ["tone.open", "indicator.show"]);
        assert_eq!(service.peripherals().4.shown, Some(Notice::beeper()));
    }

    #[test]
    fn test_start_twice_keeps_single_trigger() {
        let journal = Journal::default();
        let mut service = service_at(&journal, at(10, 0, 15, 0));
        let probe = FakeProbe(Capabilities::ALL);

        service.start(&probe).unwrap();
        let first = *service.pending_trigger().unwrap();
        service.start(&probe).unwrap();

        assert_eq!(service.pending_trigger(), Some(&first));
        assert_eq!(service.peripherals().1.registered.len(), 1);
        assert_eq!(service.peripherals().1.sets, 1);
    }

    #[test]
    fn test_start_deferred_without_exact_alarms() {
        let journal = Journal::default();
        let mut service = service_at(&journal, at(10, 0, 15, 0));
        let probe = FakeProbe(Capabilities {
            exact_alarms: false,
            notifications: true,
        });

        let result = service.start(&probe);

        assert_eq!(result, Err(StartError::CapabilityMissing(Capability::ExactAlarms)));
        assert_eq!(service.state(), ServiceState::Stopped);
        assert!(journal.entries().is_empty());
    }

    #[test]
    fn test_start_aborts_when_indicator_refused() {
        let journal = Journal::default();
        let mut service = service_at(&journal, at(10, 0, 15, 0));
        service.indicator.refuse = true;

        let result = service.start(&FakeProbe(Capabilities::ALL));

        assert_eq!(result, Err(StartError::Indicator(IndicatorError::Unavailable)));
        assert_eq!(service.state(), ServiceState::Stopped);
        assert!(service.pending_trigger().is_none());
        assert_eq!(journal.entries(), ["tone.open", "tone.release"]);
    }

    #[test]
    fn test_start_survives_missing_audio_device() {
        let journal = Journal::default();
        let mut service = service_at(&journal, at(10, 0, 15, 0));
        service.tone_mut().open_fails = true;

        service.start(&FakeProbe(Capabilities::ALL)).unwrap();

        assert_eq!(service.state(), ServiceState::Active);
        assert!(service.pending_trigger().is_some());
    }

    #[test]
    fn test_trigger_beeps_under_wake_assertion_and_rearms() {
        let journal = Journal::default();
        let mut service = service_at(&journal, at(10, 0, 15, 0));
        service.start(&FakeProbe(Capabilities::ALL)).unwrap();
        journal.clear();

        let Dispatch::Cycled(report) = fire_pending(&mut service) else {
            panic!("expected a beep cycle");
        };

        assert_eq!(report.tone, Ok(()));
        assert_eq!(report.next.unwrap().due, at(10, 2, 0, 0));
        assert_eq!(journal.entries(), ["wake.acquire", "tone.beep", "wake.release"]);
        assert_eq!(service.state(), ServiceState::Active);
        assert!(!service.peripherals().3.is_held());
        assert_eq!(service.peripherals().3.last_timeout, Some(WAKE_ASSERTION_TIMEOUT));
        assert_eq!(
            service.peripherals().2.beeps,
            vec![(TONE_FREQUENCY_HZ, TONE_DURATION_MS)]
        );
    }

    #[test]
    fn test_one_trigger_outstanding_across_cycles() {
        let journal = Journal::default();
        let mut service = service_at(&journal, at(10, 0, 15, 0));
        service.start(&FakeProbe(Capabilities::ALL)).unwrap();

        for _ in 0..5 {
            assert!(matches!(fire_pending(&mut service), Dispatch::Cycled(_)));
            assert_eq!(service.peripherals().1.registered.len(), 1);
        }
        assert_eq!(service.pending_trigger().unwrap().due, at(10, 6, 0, 0));
    }

    #[test]
    fn test_tone_failure_still_rearms() {
        let journal = Journal::default();
        let mut service = service_at(&journal, at(10, 0, 15, 0));
        service.start(&FakeProbe(Capabilities::ALL)).unwrap();
        service.tone_mut().beep_fails = true;
        journal.clear();

        let Dispatch::Cycled(report) = fire_pending(&mut service) else {
            panic!("expected a beep cycle");
        };

        assert_eq!(report.tone, Err(ToneError::Playback("speaker jammed")));
        assert_eq!(report.next.unwrap().due, at(10, 2, 0, 0));
        assert_eq!(journal.entries(), ["wake.acquire", "tone.beep", "wake.release"]);
        assert_eq!(service.state(), ServiceState::Active);
    }

    #[test]
    fn test_schedule_denied_leaves_active_without_trigger() {
        let journal = Journal::default();
        let mut service = service_at(&journal, at(10, 0, 15, 0));
        service.start(&FakeProbe(Capabilities::ALL)).unwrap();
        service.alarms_mut().deny = true;

        let Dispatch::Cycled(report) = fire_pending(&mut service) else {
            panic!("expected a beep cycle");
        };

        assert_eq!(report.tone, Ok(()));
        assert_eq!(report.next, Err(ScheduleError::PermissionDenied));
        assert_eq!(service.state(), ServiceState::Active);
        assert!(service.pending_trigger().is_none());
    }

    #[test]
    fn test_start_with_denied_schedule_stays_active() {
        let journal = Journal::default();
        let mut service = service_at(&journal, at(10, 0, 15, 0));
        service.alarms_mut().deny = true;

        service.start(&FakeProbe(Capabilities::ALL)).unwrap();

        assert_eq!(service.state(), ServiceState::Active);
        assert!(service.pending_trigger().is_none());
        assert!(service.stop(StopSource::User));
    }

    #[test]
    fn test_stop_after_beep_releases_everything() {
        let journal = Journal::default();
        let mut service = service_at(&journal, at(10, 0, 15, 0));
        service.start(&FakeProbe(Capabilities::ALL)).unwrap();

        // The stop arrives while the beep is in flight and is seen at the
        // next dispatch boundary.
        assert!(matches!(fire_pending(&mut service), Dispatch::Cycled(_)));
        service.post(Event::Stop(StopSource::Indicator)).unwrap();
        journal.clear();

        assert_eq!(service.dispatch_next(), Dispatch::Stopped);
        assert_eq!(service.state(), ServiceState::Stopped);
        assert!(service.pending_trigger().is_none());
        assert!(service.peripherals().1.registered.is_empty());
        assert!(!service.peripherals().3.is_held());
        assert_eq!(journal.entries(), ["tone.release", "indicator.dismiss"]);
    }

    #[test]
    fn test_stop_releases_wake_still_held() {
        let journal = Journal::default();
        let mut service = service_at(&journal, at(10, 0, 15, 0));
        service.start(&FakeProbe(Capabilities::ALL)).unwrap();
        service.wake.acquire(WAKE_ASSERTION_TIMEOUT);
        journal.clear();

        assert!(service.stop(StopSource::User));
        assert_eq!(
            journal.entries(),
            ["wake.release", "tone.release", "indicator.dismiss"]
        );
    }

    #[test]
    fn test_stop_preempts_queued_trigger() {
        let journal = Journal::default();
        let mut service = service_at(&journal, at(10, 0, 15, 0));
        service.start(&FakeProbe(Capabilities::ALL)).unwrap();
        let generation = service.pending_trigger().unwrap().generation;

        service.post(Event::TriggerFired(generation)).unwrap();
        service.post(Event::Stop(StopSource::User)).unwrap();

        assert_eq!(service.drain(), 1);
        assert!(service.peripherals().2.beeps.is_empty());
        assert!(service.peripherals().1.registered.is_empty());
    }

    #[test]
    fn test_stop_accepted_on_full_queue() {
        let journal = Journal::default();
        let mut service = service_at(&journal, at(10, 0, 15, 0));
        service.start(&FakeProbe(Capabilities::ALL)).unwrap();
        let generation = service.pending_trigger().unwrap().generation;

        for _ in 0..crate::consts::EVENT_QUEUE_CAPACITY {
            service.post(Event::TriggerFired(generation)).unwrap();
        }
        assert_eq!(service.post(Event::Stop(StopSource::Indicator)), Ok(()));

        service.drain();
        assert_eq!(service.state(), ServiceState::Stopped);
        assert!(service.pending_trigger().is_none());
        assert!(service.peripherals().2.beeps.is_empty());
    }

    #[test]
    fn test_trigger_after_stop_is_ignored() {
        let journal = Journal::default();
        let mut service = service_at(&journal, at(10, 0, 15, 0));
        service.start(&FakeProbe(Capabilities::ALL)).unwrap();
        let generation = service.pending_trigger().unwrap().generation;
        service.stop(StopSource::User);

        service.post(Event::TriggerFired(generation)).unwrap();

        assert_eq!(service.dispatch_next(), Dispatch::Ignored);
        assert!(service.peripherals().2.beeps.is_empty());
        assert_eq!(service.peripherals().1.sets, 1);
    }

    #[test]
    fn test_stale_trigger_is_ignored() {
        let journal = Journal::default();
        let mut service = service_at(&journal, at(10, 0, 15, 0));
        service.start(&FakeProbe(Capabilities::ALL)).unwrap();
        let generation = service.pending_trigger().unwrap().generation;

        service.post(Event::TriggerFired(generation + 7)).unwrap();

        assert_eq!(service.dispatch_next(), Dispatch::Ignored);
        assert_eq!(service.pending_trigger().unwrap().generation, generation);
    }

    #[test]
    fn test_stop_when_stopped_is_noop() {
        let journal = Journal::default();
        let mut service = service_at(&journal, at(10, 0, 15, 0));

        assert!(!service.stop(StopSource::User));
        service.post(Event::Stop(StopSource::Indicator)).unwrap();
        assert_eq!(service.dispatch_next(), Dispatch::Ignored);
        assert!(journal.entries().is_empty());
        assert_eq!(service.peripherals().1.cancels, 0);
    }

    #[test]
    fn test_restart_after_stop() {
        let journal = Journal::default();
        let mut service = service_at(&journal, at(10, 0, 15, 0));
        let probe = FakeProbe(Capabilities::ALL);
        service.start(&probe).unwrap();
        service.stop(StopSource::User);

        service.clock_mut().set(at(10, 5, 30, 0));
        service.start(&probe).unwrap();

        assert_eq!(service.pending_trigger().unwrap().due, at(10, 6, 0, 0));
    }

    #[test]
    fn test_drop_tears_down() {
        let journal = Journal::default();
        let mut service = service_at(&journal, at(10, 0, 15, 0));
        service.start(&FakeProbe(Capabilities::ALL)).unwrap();
        journal.clear();

        drop(service);

        assert_eq!(journal.entries(), ["tone.release", "indicator.dismiss"]);
    }

    #[test]
    fn test_dispatch_on_empty_queue() {
        let journal = Journal::default();
        let mut service = service_at(&journal, at(10, 0, 15, 0));
        assert_eq!(service.dispatch_next(), Dispatch::Idle);
        assert_eq!(service.drain(), 0);
    }
}
