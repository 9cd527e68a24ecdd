#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core carousel control logic (hardware-agnostic).
//!
//! This crate drives a Geneva-wheel-indexed turntable that presents one of
//! four dish slots to a fixed optical sensor. All hardware interactions go
//! through the `carousel_traits` seams.
//!
//! ## Architecture
//!
//! - **Position record**: index / motor-on time / pending-stop behind one
//!   mutex (`position` module)
//! - **Homing**: debounced edge detection plus the switch monitor thread
//!   (`homing` module)
//! - **Motion**: quarter-turn indexing against a cumulative time schedule
//!   with automatic fault recovery (`Indexer`)
//! - **Modes**: manual slot targeting vs. free-running automatic sweeps
//!   (`runner` module)
//!
//! ## Timing model
//!
//! The turntable is open-loop between home events: angular position is
//! tracked as accumulated motor-on time, and the stop target for each step
//! is `index × (quarter period − settle hold)`. The schedule is cumulative
//! on purpose; only an accepted home event re-bases it, which is what
//! corrects the drift a time-based model inevitably picks up.

// Module declarations
pub mod conversions;
pub mod error;
pub mod homing;
pub mod mocks;
pub mod position;
pub mod runner;
pub mod util;

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use carousel_traits::clock::{Clock, MonotonicClock};
use eyre::WrapErr;

use crate::error::Result;
use crate::position::{FAULT_INDEX, FIRST_SLOT, LAST_SLOT, PositionCell};

pub use crate::error::{BuildError, IndexerError};
pub use crate::position::Position;

/// Turntable motion constants.
#[derive(Debug, Clone, Copy)]
pub struct MotionCfg {
    /// Time for one full rotation of the drive wheel (ms).
    pub full_rotation_ms: u64,
    /// Hold time after a stop condition so the escapement seats (ms).
    pub settle_ms: u64,
    /// Fixed motor speed commanded before every move.
    pub motor_speed: u32,
    /// Poll period of the indexing loop (ms).
    pub poll_ms: u64,
}

impl Default for MotionCfg {
    fn default() -> Self {
        Self {
            full_rotation_ms: 19_000,
            settle_ms: 1_000,
            motor_speed: 200,
            poll_ms: 1,
        }
    }
}

/// Affine normalization from raw ADC counts to opacity.
///
/// volts = raw × full_scale_v / adc_max, opacity = (volts − offset_v) / scale_v.
/// Deliberately unclamped: values outside [0, 1] are honest readings of an
/// uncovered or saturated sensor and the operator should see them.
#[derive(Debug, Clone, Copy)]
pub struct OpacityCal {
    pub offset_v: f32,
    pub scale_v: f32,
    pub full_scale_v: f32,
    pub adc_max: i32,
}

impl Default for OpacityCal {
    fn default() -> Self {
        Self {
            offset_v: 0.33,
            scale_v: 1.65,
            full_scale_v: 5.0,
            adc_max: 1023,
        }
    }
}

impl OpacityCal {
    pub fn opacity(&self, raw: i32) -> f32 {
        let volts = (raw as f32) * self.full_scale_v / (self.adc_max.max(1) as f32);
        (volts - self.offset_v) / self.scale_v
    }
}

/// Outcome of a single indexing step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Advanced one slot; carries the new index.
    Stepped(u8),
    /// Alignment was lost and a full recalibration ran; index is back at 1.
    Recalibrated,
}

/// Motion controller: realizes "advance exactly one quarter turn, then
/// stop, settle and account for it" as a blocking operation.
pub struct Indexer<M: carousel_traits::Motor> {
    motor: M,
    motion: MotionCfg,
    position: Arc<PositionCell>,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl<M: carousel_traits::Motor> core::fmt::Debug for Indexer<M> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Indexer")
            .field("index", &self.position.index())
            .field("motion", &self.motion)
            .finish()
    }
}

impl Indexer<Box<dyn carousel_traits::Motor>> {
    /// Start building a boxed-motor Indexer.
    pub fn builder() -> IndexerBuilder<Missing> {
        IndexerBuilder::default()
    }
}

impl<M: carousel_traits::Motor> Indexer<M> {
    /// Current slot index (0 transient, 1..=4 at rest).
    pub fn index(&self) -> u8 {
        self.position.index()
    }

    /// Handle to the shared position record, for wiring the home monitor.
    pub fn position(&self) -> Arc<PositionCell> {
        self.position.clone()
    }

    /// Handle to the controller clock, for wiring the edge detector.
    pub fn clock(&self) -> Arc<dyn Clock + Send + Sync> {
        self.clock.clone()
    }

    fn motor_forward(&mut self) -> Result<()> {
        self.motor
            .set_speed(self.motion.motor_speed)
            .map_err(|e| eyre::Report::new(map_hw_error_dyn(&*e)))
            .wrap_err("set_speed")?;
        self.motor
            .forward()
            .map_err(|e| eyre::Report::new(map_hw_error_dyn(&*e)))
            .wrap_err("motor forward")
    }

    /// Stop the motor (best-effort).
    pub fn motor_release(&mut self) -> Result<()> {
        self.motor
            .release()
            .map_err(|e| eyre::Report::new(map_hw_error_dyn(&*e)))
            .wrap_err("motor release")
    }

    /// Keep the motor running through the settle hold, then release it.
    fn settle_and_release(&mut self) -> Result<()> {
        self.clock.sleep(Duration::from_millis(self.motion.settle_ms));
        self.motor_release()
    }

    /// Drive forward until the first accepted home event, settle, and
    /// establish slot 1 as the known-good origin.
    ///
    /// Blocks indefinitely if the switch never trips; an unreachable home
    /// is a hardware precondition violation, not a software timeout.
    pub fn calibrate(&mut self) -> Result<()> {
        tracing::info!("calibration start");
        self.motor_forward()?;
        let poll = Duration::from_millis(self.motion.poll_ms);
        while !self.position.snapshot().stop_pending {
            self.clock.sleep(poll);
        }
        self.settle_and_release()?;
        self.position.settle_at_origin();
        tracing::info!("calibration complete, at slot 1");
        Ok(())
    }

    /// Advance exactly one slot, or recover via recalibration if alignment
    /// was lost. On return the motor is released and no stop is pending.
    pub fn advance_one(&mut self) -> Result<Advance> {
        let start = self.position.snapshot();
        // Cumulative schedule: run_ms is never re-based here, so each call's
        // target grows by one step budget until a home event resets both.
        let target_ms = u64::from(start.index)
            * util::step_budget_ms(self.motion.full_rotation_ms, self.motion.settle_ms);
        tracing::debug!(from = start.index, target_ms, "advance start");

        self.motor_forward()?;
        let poll = Duration::from_millis(self.motion.poll_ms);
        let mut last = self.clock.now();
        loop {
            let snap = self.position.snapshot();
            if snap.stop_pending || snap.run_ms >= target_ms {
                break;
            }
            self.clock.sleep(poll);
            let now = self.clock.now();
            let elapsed_ms = now.saturating_duration_since(last).as_millis() as u64;
            last = now;
            // Credited atomically with the flag check: time from the race
            // window is never counted past a stop signal.
            self.position.accrue_unless_stopped(elapsed_ms);
        }

        self.settle_and_release()?;
        let index = self.position.complete_quarter();

        if index >= FAULT_INDEX {
            tracing::warn!(index, "alignment lost, recalibrating");
            self.calibrate()?;
            return Ok(Advance::Recalibrated);
        }
        tracing::debug!(index, "advance complete");
        Ok(Advance::Stepped(index))
    }

    /// Advance until the turntable rests at `target`. A no-op when already
    /// there. Always terminates: recalibration re-enters the 1..=4 range.
    pub fn advance_to(&mut self, target: u8) -> Result<()> {
        if !(FIRST_SLOT..=LAST_SLOT).contains(&target) {
            return Err(eyre::Report::new(IndexerError::BadSlot(target)));
        }
        while self.position.index() != target {
            self.advance_one()?;
        }
        Ok(())
    }
}

// Map any error to a typed IndexerError, with special handling for hardware errors.
pub(crate) fn map_hw_error_dyn(e: &(dyn std::error::Error + 'static)) -> IndexerError {
    #[cfg(feature = "hardware-errors")]
    {
        use carousel_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::Timeout => IndexerError::Timeout,
                other => IndexerError::HardwareFault(other.to_string()),
            };
        }
    }
    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        IndexerError::Timeout
    } else {
        IndexerError::Hardware(s)
    }
}

// Type-state markers for the builder
pub struct Missing;
pub struct Set;

/// Builder for `Indexer`. All fields are validated on `build()`.
pub struct IndexerBuilder<M> {
    motor: Option<Box<dyn carousel_traits::Motor>>,
    motion: Option<MotionCfg>,
    position: Option<Arc<PositionCell>>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    _m: PhantomData<M>,
}

impl Default for IndexerBuilder<Missing> {
    fn default() -> Self {
        Self {
            motor: None,
            motion: None,
            position: None,
            clock: None,
            _m: PhantomData,
        }
    }
}

impl<T> IndexerBuilder<T> {
    pub fn with_motion(mut self, motion: MotionCfg) -> Self {
        self.motion = Some(motion);
        self
    }

    /// Share an existing position record (the same one handed to the home
    /// monitor). A fresh record is created when not provided.
    pub fn with_position(mut self, position: Arc<PositionCell>) -> Self {
        self.position = Some(position);
        self
    }

    /// Provide a custom clock implementation; defaults to MonotonicClock.
    pub fn with_clock(mut self, clock: Box<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Fallible build available in any type-state; returns detailed
    /// BuildError for missing pieces.
    pub fn try_build(self) -> Result<Indexer<Box<dyn carousel_traits::Motor>>> {
        let IndexerBuilder {
            motor,
            motion,
            position,
            clock,
            _m: _,
        } = self;

        let motor = motor.ok_or_else(|| eyre::Report::new(BuildError::MissingMotor))?;
        let motion = motion.unwrap_or_default();

        if motion.motor_speed == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "motor_speed must be > 0",
            )));
        }
        if motion.poll_ms == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "poll_ms must be >= 1",
            )));
        }
        if util::step_budget_ms(motion.full_rotation_ms, motion.settle_ms) == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "settle_ms must be below a quarter rotation",
            )));
        }

        let clock: Arc<dyn Clock + Send + Sync> = match clock {
            Some(b) => Arc::from(b),
            None => Arc::new(MonotonicClock::new()),
        };

        Ok(Indexer {
            motor,
            motion,
            position: position.unwrap_or_default(),
            clock,
        })
    }
}

impl IndexerBuilder<Missing> {
    pub fn with_motor(self, motor: impl carousel_traits::Motor + 'static) -> IndexerBuilder<Set> {
        let IndexerBuilder {
            motor: _,
            motion,
            position,
            clock,
            _m: _,
        } = self;
        IndexerBuilder {
            motor: Some(Box::new(motor)),
            motion,
            position,
            clock,
            _m: PhantomData,
        }
    }
}

impl IndexerBuilder<Set> {
    /// Validate and build the Indexer. Only available once a motor is set.
    pub fn build(self) -> Result<Indexer<Box<dyn carousel_traits::Motor>>> {
        self.try_build()
    }
}

/// Build a generic, statically-dispatched Indexer from a concrete motor.
pub fn build_indexer<M>(
    motor: M,
    motion: MotionCfg,
    position: Arc<PositionCell>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
) -> Result<Indexer<M>>
where
    M: carousel_traits::Motor + 'static,
{
    if motion.motor_speed == 0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "motor_speed must be > 0",
        )));
    }
    if motion.poll_ms == 0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "poll_ms must be >= 1",
        )));
    }
    if util::step_budget_ms(motion.full_rotation_ms, motion.settle_ms) == 0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "settle_ms must be below a quarter rotation",
        )));
    }
    let clock: Arc<dyn Clock + Send + Sync> = match clock {
        Some(b) => Arc::from(b),
        None => Arc::new(MonotonicClock::new()),
    };
    Ok(Indexer {
        motor,
        motion,
        position,
        clock,
    })
}
