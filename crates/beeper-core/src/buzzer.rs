use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToneError {
    #[error("no audio output device available")]
    DeviceUnavailable,
    #[error("tone generator is not open")]
    NotOpen,
    #[error("tone playback failed: {0}")]
    Playback(&'static str),
}

// Platform-agnostic tone generator, routed to the alarm audio stream.
pub trait ToneGenerator {
    /// Acquire the output resource. Held until `release`.
    fn open(&mut self) -> Result<(), ToneError>;

    fn beep(&mut self, frequency_hz: u32, duration_ms: u32) -> Result<(), ToneError>;

    /// Release the output resource. Must be safe to call when not open.
    fn release(&mut self);
}
