//! Bounded polling primitive shared by every blocking wait.
//!
//! The condition is sampled immediately, then once per `interval` until it
//! holds or the deadline passes. The interval also throttles request rate
//! on the shared transport.

use crate::error::RigResult;
use std::thread;
use std::time::{Duration, Instant};

/// Poll `check` until it returns `true` or `timeout` expires.
///
/// Returns `Ok(true)` when the condition held, `Ok(false)` on timeout.
/// Errors from `check` abort the wait and are propagated unchanged.
/// The condition is always sampled at least once, and once more at the
/// deadline.
pub fn poll_until(
    interval: Duration,
    timeout: Duration,
    mut check: impl FnMut() -> RigResult<bool>,
) -> RigResult<bool> {
    let deadline = Instant::now() + timeout;
    loop {
        if check()? {
            return Ok(true);
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(false);
        }
        thread::sleep(interval.min(deadline - now));
    }
}
