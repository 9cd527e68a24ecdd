//! Limit-switch homing: debounced edge detection and the monitor thread.
//!
//! The monitor thread is the host-side interrupt context. It owns the
//! `LimitSwitch`, blocks on it in short slices, and feeds every observed
//! rising edge to the `EdgeDetector`, which debounces and performs the
//! atomic home reset on the shared position record.
//!
//! Safety: each `HomeMonitor` spawns exactly one thread that is shut down
//! when the monitor is dropped, preventing thread leaks.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use carousel_traits::{Clock, LimitSwitch};

use crate::position::PositionCell;

/// Debounced edge detector. One accepted home event per physical pass of
/// the switch; trips inside the debounce window touch nothing.
pub struct EdgeDetector {
    position: Arc<PositionCell>,
    clock: Arc<dyn Clock + Send + Sync>,
    debounce: Duration,
    last_accept: Option<Instant>,
}

impl EdgeDetector {
    pub fn new(
        position: Arc<PositionCell>,
        clock: Arc<dyn Clock + Send + Sync>,
        debounce: Duration,
    ) -> Self {
        Self {
            position,
            clock,
            debounce,
            last_accept: None,
        }
    }

    /// Handle one rising edge of the switch signal. Returns whether the
    /// edge was accepted as a home event.
    pub fn on_rising_edge(&mut self) -> bool {
        let now = self.clock.now();
        if let Some(prev) = self.last_accept
            && now.saturating_duration_since(prev) < self.debounce
        {
            tracing::trace!("switch edge inside debounce window, ignored");
            return false;
        }
        self.position.accept_home();
        self.last_accept = Some(now);
        tracing::debug!("home event accepted");
        true
    }
}

/// Background thread watching the limit switch.
pub struct HomeMonitor {
    /// Shutdown flag for immediate response (atomic for lock-free check)
    shutdown: Arc<AtomicBool>,
    /// Join handle for graceful thread cleanup
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl HomeMonitor {
    /// Spawn the monitor. `poll` bounds each blocking wait on the switch so
    /// the thread notices shutdown promptly.
    pub fn spawn<W: LimitSwitch + Send + 'static>(
        mut switch: W,
        mut detector: EdgeDetector,
        poll: Duration,
    ) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();

        let join_handle = std::thread::spawn(move || {
            loop {
                if shutdown_clone.load(Ordering::Relaxed) {
                    tracing::debug!("home monitor received shutdown signal");
                    break;
                }

                match switch.wait_rising_edge(poll) {
                    Ok(true) => {
                        detector.on_rising_edge();
                    }
                    Ok(false) => {}
                    Err(e) => {
                        tracing::warn!(error = %e, "limit switch wait failed");
                        std::thread::sleep(poll);
                    }
                }
            }
            tracing::trace!("home monitor thread exiting cleanly");
        });

        Self {
            shutdown,
            join_handle: Some(join_handle),
        }
    }
}

impl Drop for HomeMonitor {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);

        // The thread exits after at most one bounded switch wait.
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => {
                    tracing::trace!("home monitor thread joined successfully");
                }
                Err(e) => {
                    tracing::warn!(?e, "home monitor thread panicked during shutdown");
                }
            }
        }
    }
}
