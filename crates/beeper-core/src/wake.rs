//! Wake assertion: keeps the host out of suspend while a beep is produced.

use core::time::Duration;

pub trait WakeLock {
    /// Assert wakefulness for at most `timeout`. The host drops the assertion
    /// by itself once the timeout lapses.
    fn acquire(&mut self, timeout: Duration);
    fn release(&mut self);
    /// True while `release` still has something to undo.
    fn is_held(&self) -> bool;
}

/// Holds a wake assertion for the guard's lifetime.
pub struct WakeGuard<'a, W: WakeLock> {
    lock: &'a mut W,
}

impl<'a, W: WakeLock> WakeGuard<'a, W> {
    pub fn acquire(lock: &'a mut W, timeout: Duration) -> Self {
        lock.acquire(timeout);
        Self { lock }
    }
}

impl<W: WakeLock> Drop for WakeGuard<'_, W> {
    fn drop(&mut self) {
        // The timeout may already have released it.
        if self.lock.is_held() {
            self.lock.release();
        }
    }
}
