//! From impls mapping the serde config schema onto core types.

use crate::runner::Mode;
use crate::{MotionCfg, OpacityCal};

impl From<&carousel_config::MotionCfg> for MotionCfg {
    fn from(c: &carousel_config::MotionCfg) -> Self {
        Self {
            full_rotation_ms: c.full_rotation_ms,
            settle_ms: c.settle_ms,
            motor_speed: c.motor_speed,
            poll_ms: c.poll_ms,
        }
    }
}

impl From<&carousel_config::SensorCfg> for OpacityCal {
    fn from(c: &carousel_config::SensorCfg) -> Self {
        Self {
            offset_v: c.offset_v,
            scale_v: c.scale_v,
            full_scale_v: c.full_scale_v,
            adc_max: c.adc_max,
        }
    }
}

impl From<carousel_config::StartMode> for Mode {
    fn from(m: carousel_config::StartMode) -> Self {
        match m {
            carousel_config::StartMode::Manual => Mode::Manual,
            carousel_config::StartMode::Automatic => Mode::Automatic,
        }
    }
}
