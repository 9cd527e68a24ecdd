//! Device implementations for the carousel controller.
//!
//! Simulated devices are always available and back the CLI's default mode
//! and the self-check. Real Raspberry Pi GPIO devices live behind the
//! non-default `hardware` feature.

pub mod error;
pub mod util;

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod gpio;

use std::error::Error;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use carousel_traits::{LimitSwitch, Motor, OpticalSensor};

/// Shared drive-train state for the simulated rig: how long the motor has
/// been commanded forward in total.
#[derive(Debug, Default)]
struct RigShared {
    run: Mutex<RunState>,
}

#[derive(Debug, Default)]
struct RunState {
    accum: Duration,
    started: Option<Instant>,
}

impl RigShared {
    fn run_time(&self) -> Duration {
        let run = self.run.lock().unwrap_or_else(|e| e.into_inner());
        match run.started {
            Some(t0) => run.accum + t0.elapsed(),
            None => run.accum,
        }
    }
}

/// Simulated motor + limit switch joined by a common drive train.
///
/// The switch trips once per simulated full rotation of motor-on time, so
/// calibration and indexing behave like the real mechanism, just faster if
/// a short `rotation` is configured.
pub struct SimRig {
    shared: Arc<RigShared>,
    rotation: Duration,
    first_trip: Duration,
}

impl SimRig {
    pub fn new(rotation: Duration, first_trip: Duration) -> Self {
        Self {
            shared: Arc::new(RigShared::default()),
            rotation,
            first_trip,
        }
    }

    pub fn motor(&self) -> SimMotor {
        SimMotor {
            shared: self.shared.clone(),
            speed: 0,
        }
    }

    pub fn limit_switch(&self) -> SimLimitSwitch {
        SimLimitSwitch {
            shared: self.shared.clone(),
            rotation: self.rotation,
            next_trip: self.first_trip,
        }
    }
}

pub struct SimMotor {
    shared: Arc<RigShared>,
    speed: u32,
}

impl Motor for SimMotor {
    fn set_speed(&mut self, speed: u32) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.speed = speed;
        Ok(())
    }

    fn forward(&mut self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut run = self.shared.run.lock().unwrap_or_else(|e| e.into_inner());
        if run.started.is_none() {
            run.started = Some(Instant::now());
        }
        tracing::debug!(speed = self.speed, "sim motor forward");
        Ok(())
    }

    fn release(&mut self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut run = self.shared.run.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(t0) = run.started.take() {
            run.accum += t0.elapsed();
        }
        tracing::debug!("sim motor release");
        Ok(())
    }
}

pub struct SimLimitSwitch {
    shared: Arc<RigShared>,
    rotation: Duration,
    next_trip: Duration,
}

impl LimitSwitch for SimLimitSwitch {
    fn wait_rising_edge(
        &mut self,
        timeout: Duration,
    ) -> Result<bool, Box<dyn Error + Send + Sync>> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.shared.run_time() >= self.next_trip {
                self.next_trip += self.rotation;
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            std::thread::sleep(Duration::from_millis(2));
        }
    }
}

/// Simulated photoresistor: a settable raw count with a small deterministic
/// wobble per read.
pub struct SimSensor {
    raw: i32,
    wobble: i32,
}

impl SimSensor {
    pub fn with_raw(raw: i32) -> Self {
        Self { raw, wobble: 0 }
    }

    pub fn set_raw(&mut self, raw: i32) {
        self.raw = raw;
    }
}

impl Default for SimSensor {
    fn default() -> Self {
        // Mid-scale: roughly ambient light through an empty dish.
        Self::with_raw(512)
    }
}

impl OpticalSensor for SimSensor {
    fn read_raw(&mut self, _timeout: Duration) -> Result<i32, Box<dyn Error + Send + Sync>> {
        self.wobble = (self.wobble + 1) % 3;
        Ok((self.raw + self.wobble - 1).clamp(0, 1023))
    }
}
