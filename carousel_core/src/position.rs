//! Shared position/time record.
//!
//! One record holds everything the asynchronous edge detector and the
//! synchronous motion controller exchange: the slot index, the accumulated
//! motor-on time since the last home event, and the pending-stop flag. Both
//! contexts go through the methods here and nothing else, so every update is
//! indivisible and a reader can never observe a half-written state.

use std::sync::{Mutex, MutexGuard};

/// First valid rest slot (the one the mechanism homes onto).
pub const FIRST_SLOT: u8 = 1;
/// Last valid rest slot.
pub const LAST_SLOT: u8 = 4;
/// One past the last slot: reaching it means alignment was lost.
pub const FAULT_INDEX: u8 = LAST_SLOT + 1;

/// Coherent copy of the shared record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    /// 0 = just homed (transient), 1..=4 = valid rest slot, 5 = fault value.
    pub index: u8,
    /// Motor-on milliseconds accumulated since the last home event.
    pub run_ms: u64,
    /// Set by the edge detector, consumed by the motion controller.
    pub stop_pending: bool,
}

#[derive(Debug)]
pub struct PositionCell {
    inner: Mutex<Position>,
}

impl Default for PositionCell {
    fn default() -> Self {
        Self::new()
    }
}

impl PositionCell {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Position {
                index: 0,
                run_ms: 0,
                stop_pending: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Position> {
        // A poisoned lock only means a panicking test thread; the record
        // itself is always left consistent by the methods below.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn snapshot(&self) -> Position {
        *self.lock()
    }

    pub fn index(&self) -> u8 {
        self.lock().index
    }

    /// Edge-detector side: a debounced home event was accepted.
    /// Index and accumulated time reset together with the flag set.
    pub fn accept_home(&self) {
        let mut p = self.lock();
        p.index = 0;
        p.run_ms = 0;
        p.stop_pending = true;
    }

    /// Credit elapsed motor-on time, unless a stop is already pending.
    /// Returns true when the stop was pending and nothing was credited, so
    /// time from the race window never counts past the stop signal.
    pub fn accrue_unless_stopped(&self, elapsed_ms: u64) -> bool {
        let mut p = self.lock();
        if p.stop_pending {
            return true;
        }
        p.run_ms = p.run_ms.saturating_add(elapsed_ms);
        false
    }

    /// Motion-controller side: a quarter turn finished settling.
    /// Returns the new index.
    pub fn complete_quarter(&self) -> u8 {
        let mut p = self.lock();
        p.index = p.index.saturating_add(1);
        p.stop_pending = false;
        p.index
    }

    /// Calibration finished: the mechanism is seated on the first slot.
    pub fn settle_at_origin(&self) {
        let mut p = self.lock();
        p.index = FIRST_SLOT;
        p.stop_pending = false;
    }
}
