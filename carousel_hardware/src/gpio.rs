//! Raspberry Pi GPIO implementations (feature `hardware`, linux only).
//!
//! Motor: H-bridge style driver, software PWM on the enable pin.
//! Limit switch: pulled-up input, rising-edge interrupt polling.
//! Sensor: photoresistor behind an MCP3008 on SPI0.

use std::error::Error;
use std::time::Duration;

use carousel_traits::{LimitSwitch, Motor, OpticalSensor};
use rppal::gpio::{Gpio, InputPin, OutputPin, Trigger};
use rppal::spi::{Bus, Mode, SlaveSelect, Spi};

use crate::error::HwError;

const PWM_FREQ_HZ: f64 = 1_000.0;

fn gpio_err(e: rppal::gpio::Error) -> HwError {
    HwError::Gpio(e.to_string())
}

pub struct GpioMotor {
    en: OutputPin,
    in1: OutputPin,
    in2: OutputPin,
    duty: f64,
}

impl GpioMotor {
    pub fn new(en_pin: u8, in1_pin: u8, in2_pin: u8) -> Result<Self, HwError> {
        let gpio = Gpio::new().map_err(gpio_err)?;
        let en = gpio.get(en_pin).map_err(gpio_err)?.into_output_low();
        let in1 = gpio.get(in1_pin).map_err(gpio_err)?.into_output_low();
        let in2 = gpio.get(in2_pin).map_err(gpio_err)?.into_output_low();
        Ok(Self {
            en,
            in1,
            in2,
            duty: 0.0,
        })
    }
}

impl Motor for GpioMotor {
    fn set_speed(&mut self, speed: u32) -> Result<(), Box<dyn Error + Send + Sync>> {
        // Shield speed range is 0..=255.
        self.duty = f64::from(speed.min(255)) / 255.0;
        Ok(())
    }

    fn forward(&mut self) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.in1.set_high();
        self.in2.set_low();
        self.en
            .set_pwm_frequency(PWM_FREQ_HZ, self.duty)
            .map_err(|e| Box::new(gpio_err(e)) as Box<dyn Error + Send + Sync>)?;
        tracing::debug!(duty = self.duty, "motor forward");
        Ok(())
    }

    fn release(&mut self) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.en
            .clear_pwm()
            .map_err(|e| Box::new(gpio_err(e)) as Box<dyn Error + Send + Sync>)?;
        self.en.set_low();
        self.in1.set_low();
        self.in2.set_low();
        tracing::debug!("motor release");
        Ok(())
    }
}

pub struct GpioLimitSwitch {
    pin: InputPin,
}

impl GpioLimitSwitch {
    pub fn new(pin: u8) -> Result<Self, HwError> {
        let gpio = Gpio::new().map_err(gpio_err)?;
        let mut pin = gpio.get(pin).map_err(gpio_err)?.into_input_pullup();
        pin.set_interrupt(Trigger::RisingEdge).map_err(gpio_err)?;
        Ok(Self { pin })
    }
}

impl LimitSwitch for GpioLimitSwitch {
    fn wait_rising_edge(
        &mut self,
        timeout: Duration,
    ) -> Result<bool, Box<dyn Error + Send + Sync>> {
        match self.pin.poll_interrupt(true, Some(timeout)) {
            Ok(Some(_)) => Ok(true),
            Ok(None) => Ok(false),
            Err(e) => Err(Box::new(gpio_err(e))),
        }
    }
}

pub struct Mcp3008Sensor {
    spi: Spi,
    channel: u8,
}

impl Mcp3008Sensor {
    pub fn new(channel: u8) -> Result<Self, HwError> {
        if channel > 7 {
            return Err(HwError::Adc(format!("mcp3008 has no channel {channel}")));
        }
        let spi = Spi::new(Bus::Spi0, SlaveSelect::Ss0, 1_350_000, Mode::Mode0)
            .map_err(|e| HwError::Adc(e.to_string()))?;
        Ok(Self { spi, channel })
    }
}

impl OpticalSensor for Mcp3008Sensor {
    fn read_raw(&mut self, _timeout: Duration) -> Result<i32, Box<dyn Error + Send + Sync>> {
        let tx = [0x01, (0x08 | self.channel) << 4, 0x00];
        let mut rx = [0u8; 3];
        self.spi
            .transfer(&mut rx, &tx)
            .map_err(|e| Box::new(HwError::Adc(e.to_string())) as Box<dyn Error + Send + Sync>)?;
        let raw = (i32::from(rx[1] & 0x03) << 8) | i32::from(rx[2]);
        tracing::trace!(raw, channel = self.channel, "adc sample");
        Ok(raw)
    }
}
