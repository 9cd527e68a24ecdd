use std::time::{Duration, Instant};

use crate::error::{HwError, Result};

/// Wait until `triggered` becomes true, or a timeout expires.
/// Sleeps in small intervals to avoid CPU spinning.
pub fn wait_until_high_with_timeout(
    mut triggered: impl FnMut() -> bool,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<()> {
    let deadline = Instant::now() + timeout;
    while !triggered() {
        if Instant::now() >= deadline {
            return Err(HwError::Timeout);
        }
        std::thread::sleep(poll_interval);
    }
    Ok(())
}
