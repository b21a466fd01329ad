use std::sync::mpsc;

use beeper_core::event::{Event, StopSource};
use beeper_core::service::{BeepService, Peripherals, StartError};

mod alarms;
mod buzzer;
mod config;
mod log_capture;
mod probe;
mod status_panel;
mod wake_lock;

use alarms::{SystemClock, ThreadAlarms};
use buzzer::AlarmSpeaker;
use probe::TerminalProbe;
use status_panel::StatusPanel;
use wake_lock::InhibitLock;

/// Everything the main loop reacts to. Timer, panel and signal sources all
/// feed the same channel so the service sees one event at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    Start,
    Stop(StopSource),
    TriggerFired(u64),
    Quit,
}

fn main() -> anyhow::Result<()> {
    log_capture::init();
    let settings = config::Settings::from_env();
    log::set_max_level(settings.log_level);

    let (events_tx, events_rx) = mpsc::channel::<AppEvent>();

    let panel = StatusPanel::spawn(events_tx.clone())?;
    log_capture::set_console_echo(false);

    let mut service = BeepService::new(Peripherals {
        clock: SystemClock,
        alarms: ThreadAlarms::new(events_tx.clone()),
        tone: AlarmSpeaker::new(),
        wake: InhibitLock::new(),
        indicator: panel.indicator(),
    });
    let probe = TerminalProbe;

    if settings.autostart {
        events_tx.send(AppEvent::Start)?;
    }
    drop(events_tx);

    while let Ok(event) = events_rx.recv() {
        match event {
            AppEvent::Start => match service.start(&probe) {
                Ok(()) => panel.prompt(None),
                Err(StartError::CapabilityMissing(missing)) => panel.prompt(Some(missing.prompt())),
                Err(e) => {
                    log::error!("{}", e);
                    panel.prompt(Some("Could not show the status notice."));
                }
            },
            // `post` logs anything it refuses; stops are always taken.
            AppEvent::Stop(source) => {
                let _ = service.post(Event::Stop(source));
            }
            AppEvent::TriggerFired(generation) => {
                let _ = service.post(Event::TriggerFired(generation));
            }
            AppEvent::Quit => break,
        }

        service.drain();
        panel.set_status(service.is_running(), service.pending_trigger().map(|t| t.due));
    }

    service.stop(StopSource::Host);
    drop(service);
    panel.shutdown();
    log_capture::set_console_echo(true);
    log::info!("bye");

    Ok(())
}
