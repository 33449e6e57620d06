//! Raspberry Pi GPIO and PWM adapters
//!
//! Pins use BCM numbering. Contacts use pull-ups, so an open contact reads
//! high.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rppal::gpio::{Gpio, InputPin, Level, OutputPin};
use rppal::pwm::{Channel, Polarity, Pwm};
use tracing::debug;

use super::{Actuator, ContactSensor, HardwareError, StatusIndicator};

/// 50 Hz servo frame
const SERVO_PERIOD: Duration = Duration::from_millis(20);
const SERVO_MIN_PULSE_US: u64 = 500;
const SERVO_MAX_PULSE_US: u64 = 2_500;
const SERVO_MAX_ANGLE: u16 = 180;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn gpio_error(pin: u8) -> impl FnOnce(rppal::gpio::Error) -> HardwareError {
    move |source| HardwareError::Gpio { pin, source }
}

/// Contact switch on a GPIO input line
pub struct GpioContact {
    pin: Mutex<InputPin>,
}

impl GpioContact {
    pub fn new(pin: u8) -> Result<Self, HardwareError> {
        let input = Gpio::new()
            .and_then(|gpio| gpio.get(pin))
            .map_err(gpio_error(pin))?
            .into_input_pullup();
        debug!(pin, "contact input ready");
        Ok(Self {
            pin: Mutex::new(input),
        })
    }
}

impl ContactSensor for GpioContact {
    fn is_open(&self) -> Result<bool, HardwareError> {
        Ok(level_is_open(lock(&self.pin).read()))
    }
}

fn level_is_open(level: Level) -> bool {
    level == Level::High
}

/// Single GPIO output line (status LED)
pub struct GpioOutput {
    pin: Mutex<OutputPin>,
}

impl GpioOutput {
    pub fn new(pin: u8) -> Result<Self, HardwareError> {
        let output = Gpio::new()
            .and_then(|gpio| gpio.get(pin))
            .map_err(gpio_error(pin))?
            .into_output_low();
        Ok(Self {
            pin: Mutex::new(output),
        })
    }
}

impl StatusIndicator for GpioOutput {
    fn set(&self, on: bool) -> Result<(), HardwareError> {
        lock(&self.pin).write(if on { Level::High } else { Level::Low });
        Ok(())
    }
}

/// Hobby servo on a hardware PWM channel
pub struct PwmServo {
    pwm: Mutex<Pwm>,
}

impl PwmServo {
    pub fn new(channel: u8) -> Result<Self, HardwareError> {
        let pwm = Pwm::with_period(
            pwm_channel(channel)?,
            SERVO_PERIOD,
            Duration::ZERO,
            Polarity::Normal,
            true,
        )?;
        debug!(channel, "servo PWM enabled");
        Ok(Self {
            pwm: Mutex::new(pwm),
        })
    }
}

impl Actuator for PwmServo {
    fn set_position(&self, angle: u16) -> Result<(), HardwareError> {
        let pulse = pulse_width(angle);
        debug!(angle, pulse_us = pulse.as_micros() as u64, "moving servo");
        lock(&self.pwm).set_pulse_width(pulse)?;
        Ok(())
    }
}

fn pwm_channel(channel: u8) -> Result<Channel, HardwareError> {
    match channel {
        0 => Ok(Channel::Pwm0),
        1 => Ok(Channel::Pwm1),
        other => Err(HardwareError::Unsupported(format!("PWM channel {other}"))),
    }
}

/// Linear map of 0..=180 degrees onto the servo's pulse range
fn pulse_width(angle: u16) -> Duration {
    let angle = u64::from(angle.min(SERVO_MAX_ANGLE));
    Duration::from_micros(
        SERVO_MIN_PULSE_US
            + (SERVO_MAX_PULSE_US - SERVO_MIN_PULSE_US) * angle / u64::from(SERVO_MAX_ANGLE),
    )
}
