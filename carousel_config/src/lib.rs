#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the carousel controller.
//!
//! All sections are deserialized from TOML and validated before use. The
//! timing constants here are build-the-machine constants: they describe the
//! mechanics (rotation period, escapement settle time, switch debounce) and
//! the sensor's normalization, not runtime-tunable behavior.
use serde::Deserialize;

/// GPIO pin assignments, only consumed by `hardware` builds.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Pins {
    pub motor_en: u8,
    pub motor_in1: u8,
    pub motor_in2: u8,
    pub limit_switch: u8,
    pub sensor_adc_channel: u8,
}

impl Default for Pins {
    fn default() -> Self {
        Self {
            motor_en: 18,
            motor_in1: 23,
            motor_in2: 24,
            limit_switch: 17,
            sensor_adc_channel: 0,
        }
    }
}

/// Turntable motion constants.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct MotionCfg {
    /// Time for one full rotation of the drive wheel (ms).
    pub full_rotation_ms: u64,
    /// Hold time after a stop condition so the Geneva escapement seats (ms).
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

/// Limit-switch homing constants.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct HomingCfg {
    /// Minimum spacing between two accepted switch trips (ms).
    pub debounce_ms: u64,
    /// How long the monitor thread blocks per edge wait (ms).
    pub switch_poll_ms: u64,
}

impl Default for HomingCfg {
    fn default() -> Self {
        Self {
            debounce_ms: 1_000,
            switch_poll_ms: 50,
        }
    }
}

/// Optical sensor normalization.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct SensorCfg {
    /// Calibration offset subtracted from the sensed voltage (V).
    pub offset_v: f32,
    /// Calibration scale the offset-corrected voltage is divided by (V).
    pub scale_v: f32,
    /// ADC reference voltage (V).
    pub full_scale_v: f32,
    /// Highest raw count the converter can produce.
    pub adc_max: i32,
    /// Max wait per sensor read (ms).
    pub read_timeout_ms: u64,
}

impl Default for SensorCfg {
    fn default() -> Self {
        Self {
            offset_v: 0.33,
            scale_v: 1.65,
            full_scale_v: 5.0,
            adc_max: 1023,
            read_timeout_ms: 150,
        }
    }
}

/// Which driver owns the indexing primitive at startup.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StartMode {
    #[default]
    Manual,
    Automatic,
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct RunnerCfg {
    /// Mode the multiplexer starts in.
    pub initial_mode: StartMode,
    /// Pause between automatic advance+measure rounds (ms, 0 = back-to-back).
    pub auto_tick_ms: u64,
}

impl Default for RunnerCfg {
    fn default() -> Self {
        Self {
            initial_mode: StartMode::Manual,
            auto_tick_ms: 0,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub pins: Pins,
    pub motion: MotionCfg,
    pub homing: HomingCfg,
    pub sensor: SensorCfg,
    pub runner: RunnerCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    /// Check cross-field constraints the serde layer cannot express.
    pub fn validate(&self) -> eyre::Result<()> {
        let quarter = self.motion.full_rotation_ms / 4;
        if quarter == 0 {
            eyre::bail!("motion.full_rotation_ms must be at least 4 ms");
        }
        if self.motion.settle_ms >= quarter {
            eyre::bail!(
                "motion.settle_ms ({} ms) must be below a quarter rotation ({} ms)",
                self.motion.settle_ms,
                quarter
            );
        }
        if self.motion.motor_speed == 0 {
            eyre::bail!("motion.motor_speed must be > 0");
        }
        if self.motion.poll_ms == 0 {
            eyre::bail!("motion.poll_ms must be > 0");
        }
        if self.homing.debounce_ms == 0 {
            eyre::bail!("homing.debounce_ms must be > 0");
        }
        if self.homing.switch_poll_ms == 0 {
            eyre::bail!("homing.switch_poll_ms must be > 0");
        }
        if self.sensor.adc_max <= 0 {
            eyre::bail!("sensor.adc_max must be > 0");
        }
        if !self.sensor.full_scale_v.is_finite() || self.sensor.full_scale_v <= 0.0 {
            eyre::bail!("sensor.full_scale_v must be a positive, finite voltage");
        }
        if !self.sensor.scale_v.is_finite() || self.sensor.scale_v == 0.0 {
            eyre::bail!("sensor.scale_v must be finite and nonzero");
        }
        if !self.sensor.offset_v.is_finite() {
            eyre::bail!("sensor.offset_v must be finite");
        }
        if self.sensor.read_timeout_ms == 0 {
            eyre::bail!("sensor.read_timeout_ms must be >= 1");
        }
        Ok(())
    }
}
