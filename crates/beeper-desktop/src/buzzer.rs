use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use beeper_core::buzzer::{ToneError, ToneGenerator};
use beeper_core::consts::ALARM_VOLUME;
use rodio::{OutputStream, OutputStreamHandle, Sink, Source};

const SAMPLE_RATE: u32 = 48_000;
const PEAK: f32 = 0.8;
/// Attack and release ramp, keeps the pip from clicking.
const RAMP: Duration = Duration::from_millis(5);

/// Sine pip with a short linear ramp at both ends.
struct Pip {
    frequency: f32,
    sample_rate: u32,
    num_samples: usize,
    ramp_samples: usize,
    current_sample: usize,
}

impl Pip {
    fn new(frequency: f32, sample_rate: u32, duration: Duration) -> Self {
        let num_samples = samples_in(duration, sample_rate);
        let ramp_samples = samples_in(RAMP, sample_rate).min(num_samples / 2);
        Self {
            frequency,
            sample_rate,
            num_samples,
            ramp_samples,
            current_sample: 0,
        }
    }

    fn envelope(&self, n: usize) -> f32 {
        if self.ramp_samples == 0 {
            return 1.0;
        }
        let from_edge = n.min(self.num_samples - 1 - n);
        (from_edge as f32 / self.ramp_samples as f32).min(1.0)
    }
}

fn samples_in(duration: Duration, sample_rate: u32) -> usize {
    (duration.as_nanos() * u128::from(sample_rate) / 1_000_000_000) as usize
}

impl Iterator for Pip {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_sample >= self.num_samples {
            return None;
        }
        let n = self.current_sample;
        self.current_sample += 1;

        let t = n as f32 / self.sample_rate as f32;
        let phase = t * self.frequency * std::f32::consts::TAU;
        Some(phase.sin() * PEAK * self.envelope(n))
    }
}

impl Source for Pip {
    fn current_frame_len(&self) -> Option<usize> {
        Some(self.num_samples - self.current_sample)
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        let nanos = self.num_samples as u64 * 1_000_000_000 / u64::from(self.sample_rate);
        Some(Duration::from_nanos(nanos))
    }
}

struct PipCommand {
    frequency_hz: u32,
    duration_ms: u32,
    done: Sender<Result<(), ToneError>>,
}

struct AudioThread {
    commands: Sender<PipCommand>,
    thread: JoinHandle<()>,
}

/// Tone output on the default audio device at alarm volume.
///
/// `OutputStream` is not `Send`, so the stream lives on its own thread for as
/// long as the speaker is open.
pub struct AlarmSpeaker {
    audio: Option<AudioThread>,
}

impl AlarmSpeaker {
    pub fn new() -> Self {
        Self { audio: None }
    }
}

impl ToneGenerator for AlarmSpeaker {
    fn open(&mut self) -> Result<(), ToneError> {
        if self.audio.is_some() {
            return Ok(());
        }

        let (commands, rx) = mpsc::channel::<PipCommand>();
        let (ready_tx, ready_rx) = mpsc::sync_channel::<bool>(1);

        let thread = thread::Builder::new()
            .name("alarm-audio".to_string())
            .spawn(move || audio_thread(rx, ready_tx))
            .map_err(|e| {
                log::error!("could not spawn audio thread: {}", e);
                ToneError::DeviceUnavailable
            })?;

        if ready_rx.recv() != Ok(true) {
            let _ = thread.join();
            return Err(ToneError::DeviceUnavailable);
        }

        log::debug!("alarm speaker open");
        self.audio = Some(AudioThread { commands, thread });
        Ok(())
    }

    fn beep(&mut self, frequency_hz: u32, duration_ms: u32) -> Result<(), ToneError> {
        let audio = self.audio.as_ref().ok_or(ToneError::NotOpen)?;

        let (done, done_rx) = mpsc::channel();
        audio
            .commands
            .send(PipCommand {
                frequency_hz,
                duration_ms,
                done,
            })
            .map_err(|_| ToneError::Playback("audio thread exited"))?;

        done_rx
            .recv()
            .unwrap_or(Err(ToneError::Playback("audio thread exited")))
    }

    fn release(&mut self) {
        if let Some(AudioThread { commands, thread }) = self.audio.take() {
            drop(commands);
            if thread.join().is_err() {
                log::warn!("audio thread panicked");
            }
            log::debug!("alarm speaker released");
        }
    }
}

impl Drop for AlarmSpeaker {
    fn drop(&mut self) {
        self.release();
    }
}

fn audio_thread(rx: Receiver<PipCommand>, ready: mpsc::SyncSender<bool>) {
    let (_stream, handle) = match OutputStream::try_default() {
        Ok(pair) => pair,
        Err(e) => {
            log::error!("failed to initialize audio output: {}", e);
            let _ = ready.send(false);
            return;
        }
    };
    let _ = ready.send(true);

    while let Ok(cmd) = rx.recv() {
        let result = play_pip(&handle, cmd.frequency_hz, cmd.duration_ms);
        let _ = cmd.done.send(result);
    }
}

fn play_pip(handle: &OutputStreamHandle, frequency_hz: u32, duration_ms: u32) -> Result<(), ToneError> {
    let sink = Sink::try_new(handle).map_err(|e| {
        log::error!("failed to open audio sink: {}", e);
        ToneError::Playback("could not open audio sink")
    })?;
    sink.set_volume(f32::from(ALARM_VOLUME) / 100.0);
    sink.append(Pip::new(
        frequency_hz as f32,
        SAMPLE_RATE,
        Duration::from_millis(u64::from(duration_ms)),
    ));
    // Block until the pip has been played out.
    sink.sleep_until_end();
    Ok(())
}
