//! Test and helper mocks for carousel_core

/// A sensor that always errors on read; useful when wiring a motion-only
/// controller that never takes a measurement.
pub struct NoopSensor;

impl carousel_traits::OpticalSensor for NoopSensor {
    fn read_raw(
        &mut self,
        _timeout: std::time::Duration,
    ) -> Result<i32, Box<dyn std::error::Error + Send + Sync>> {
        Err(Box::new(std::io::Error::other("noop sensor")))
    }
}

/// A limit switch that never trips; useful when the home monitor must be
/// wired but the test injects home events through the detector directly.
pub struct SilentSwitch;

impl carousel_traits::LimitSwitch for SilentSwitch {
    fn wait_rising_edge(
        &mut self,
        timeout: std::time::Duration,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        std::thread::sleep(timeout);
        Ok(false)
    }
}
