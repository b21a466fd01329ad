//! Wake assertion via `systemd-inhibit`.
//!
//! The inhibitor wraps a `sleep` of the requested timeout, so it lapses by
//! itself if release is never called. Without `systemd-inhibit` the lock only
//! keeps its bookkeeping.

use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use beeper_core::consts::WAKE_ASSERTION_TAG;
use beeper_core::wake::WakeLock;

const INHIBIT_PROGRAM: &str = "systemd-inhibit";

pub struct InhibitLock {
    program: &'static str,
    inhibitor: Option<Child>,
    held_until: Option<Instant>,
    unsupported: bool,
}

impl InhibitLock {
    pub fn new() -> Self {
        Self::with_program(INHIBIT_PROGRAM)
    }

    fn with_program(program: &'static str) -> Self {
        Self {
            program,
            inhibitor: None,
            held_until: None,
            unsupported: false,
        }
    }

    fn spawn_inhibitor(&mut self, timeout: Duration) -> Option<Child> {
        if self.unsupported {
            return None;
        }
        let spawned = Command::new(self.program)
            .arg("--what=idle:sleep")
            .arg("--who=minute-beeper")
            .arg(format!("--why={}", WAKE_ASSERTION_TAG))
            .arg("--mode=block")
            .arg("sleep")
            .arg(format!("{:.3}", timeout.as_secs_f64()))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        match spawned {
            Ok(child) => Some(child),
            Err(e) => {
                log::warn!("{} unavailable ({}), beeping without a wake assertion", self.program, e);
                self.unsupported = true;
                None
            }
        }
    }
}

impl WakeLock for InhibitLock {
    fn acquire(&mut self, timeout: Duration) {
        self.release();
        self.inhibitor = self.spawn_inhibitor(timeout);
        self.held_until = Some(Instant::now() + timeout);
        log::trace!("wake assertion held for {:?}", timeout);
    }

    fn release(&mut self) {
        if let Some(mut child) = self.inhibitor.take() {
            // It may have exited on its own already.
            let _ = child.kill();
            let _ = child.wait();
        }
        if self.held_until.take().is_some() {
            log::trace!("wake assertion released");
        }
    }

    /// Held until the timeout lapses, or for as long as an inhibitor child is
    /// left to reap, so the guard always ends in `release`.
    fn is_held(&self) -> bool {
        self.inhibitor.is_some() || self.held_until.is_some_and(|until| Instant::now() < until)
    }
}

impl Drop for InhibitLock {
    fn drop(&mut self) {
        self.release();
    }
}
