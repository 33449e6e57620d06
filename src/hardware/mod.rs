//! Hardware collaborators consumed by the state machine
//!
//! The door logic only talks to these traits. `gpio` and `serial_rfid`
//! hold the Raspberry Pi adapters used on the device; `mock` holds in-memory
//! stand-ins for tests.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

mod gpio;
#[cfg(test)]
pub mod mock;
mod serial_rfid;

pub use gpio::{GpioContact, GpioOutput, PwmServo};
pub use serial_rfid::SerialRfidReader;

/// Errors raised by hardware adapters
///
/// These are never retried; they escalate out of the state machine.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    #[error("I/O error on {}: {source}", .device.display())]
    Io {
        device: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unexpected reading from {}: {value:?}", .device.display())]
    InvalidReading { device: PathBuf, value: String },

    #[error("GPIO {pin} unavailable: {source}")]
    Gpio {
        pin: u8,
        #[source]
        source: rppal::gpio::Error,
    },

    #[error("PWM error: {0}")]
    Pwm(#[from] rppal::pwm::Error),

    #[error("failed to open serial port {}: {source}", .device.display())]
    Serial {
        device: PathBuf,
        #[source]
        source: tokio_serial::Error,
    },

    #[error("unsupported {0}")]
    Unsupported(String),

    #[error("{0} disconnected")]
    Disconnected(String),
}

impl HardwareError {
    pub(crate) fn io(device: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            device: device.into(),
            source,
        }
    }
}

/// Rotary actuator moving the latch
pub trait Actuator: Send + Sync {
    fn set_position(&self, angle: u16) -> Result<(), HardwareError>;
}

/// Two-state contact sensor (key slot, door)
pub trait ContactSensor: Send + Sync {
    fn is_open(&self) -> Result<bool, HardwareError>;

    fn is_closed(&self) -> Result<bool, HardwareError> {
        self.is_open().map(|open| !open)
    }
}

/// RFID tag reader
#[async_trait]
pub trait RfidReader: Send + Sync {
    /// Wait up to `timeout` for a tag; `None` when nothing was scanned
    async fn poll(&self, timeout: Duration) -> Result<Option<String>, HardwareError>;
}

/// Binary status output, high while Unlocked
pub trait StatusIndicator: Send + Sync {
    fn set(&self, on: bool) -> Result<(), HardwareError>;
}
