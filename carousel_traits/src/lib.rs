pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// Fixed optical sensor looking at the dish currently aligned with it.
/// Returns raw ADC counts (0..=1023 on a 10-bit converter).
pub trait OpticalSensor {
    fn read_raw(
        &mut self,
        timeout: std::time::Duration,
    ) -> Result<i32, Box<dyn std::error::Error + Send + Sync>>;
}

/// Open-loop DC motor behind a motor-shield driver.
/// The controller only ever commands a fixed speed, forward, or release.
pub trait Motor {
    fn set_speed(
        &mut self,
        speed: u32,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn forward(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn release(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

impl OpticalSensor for Box<dyn OpticalSensor> {
    fn read_raw(
        &mut self,
        timeout: std::time::Duration,
    ) -> Result<i32, Box<dyn std::error::Error + Send + Sync>> {
        (**self).read_raw(timeout)
    }
}

impl Motor for Box<dyn Motor> {
    fn set_speed(
        &mut self,
        speed: u32,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).set_speed(speed)
    }
    fn forward(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).forward()
    }
    fn release(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).release()
    }
}

/// Home limit switch on the turntable rim.
///
/// `wait_rising_edge` blocks up to `timeout` for the next rising edge of the
/// switch signal: `Ok(true)` means an edge was observed, `Ok(false)` means
/// the wait timed out. The home monitor thread parks here and feeds every
/// observed edge to the debouncing detector.
pub trait LimitSwitch {
    fn wait_rising_edge(
        &mut self,
        timeout: std::time::Duration,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;
}

impl LimitSwitch for Box<dyn LimitSwitch + Send> {
    fn wait_rising_edge(
        &mut self,
        timeout: std::time::Duration,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        (**self).wait_rising_edge(timeout)
    }
}
