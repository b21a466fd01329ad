//! Fixed parameters of the beeper. Interval and tone are not configurable.

use core::time::Duration;

/// Pitch of the pip emitted on every trigger.
pub const TONE_FREQUENCY_HZ: u32 = 1480;
pub const TONE_DURATION_MS: u32 = 150;
/// Alarm stream volume, 0..=100.
pub const ALARM_VOLUME: u8 = 100;

/// Upper bound on how long the wake assertion may be held for a single beep.
pub const WAKE_ASSERTION_TIMEOUT: Duration = Duration::from_millis(2000);
pub const WAKE_ASSERTION_TAG: &str = "MinuteBeeper::BeepLock";

/// Logical identity of the repeating trigger. Registering it again replaces the
/// pending one.
pub const BEEP_TRIGGER_ID: &str = "minute-beeper.beep";

pub const EVENT_QUEUE_CAPACITY: usize = 8;

pub const NOTICE_CHANNEL_ID: &str = "BeepServiceChannel";
pub const NOTICE_CHANNEL_NAME: &str = "Beep Service Channel";
pub const NOTICE_TITLE: &str = "Minute Beeper Active";
pub const NOTICE_BODY: &str = "Running 24/7. Tap 'Stop' to kill.";
pub const NOTICE_STOP_LABEL: &str = "STOP";
