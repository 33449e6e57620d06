//! In-memory hardware for tests

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{Actuator, ContactSensor, HardwareError, RfidReader, StatusIndicator};

/// Contact sensor replaying a script of readings (true = open)
///
/// The last reading repeats once the script runs out.
pub struct ScriptedContact {
    readings: Mutex<VecDeque<bool>>,
    last: Mutex<bool>,
    reads: Mutex<usize>,
}

impl ScriptedContact {
    pub fn new(readings: impl IntoIterator<Item = bool>) -> Self {
        Self {
            readings: Mutex::new(readings.into_iter().collect()),
            last: Mutex::new(false),
            reads: Mutex::new(0),
        }
    }

    /// Sensor that always reports closed
    pub fn closed() -> Self {
        Self::new([])
    }

    pub fn reads(&self) -> usize {
        *self.reads.lock().unwrap()
    }
}

impl ContactSensor for ScriptedContact {
    fn is_open(&self) -> Result<bool, HardwareError> {
        *self.reads.lock().unwrap() += 1;
        let mut last = self.last.lock().unwrap();
        if let Some(next) = self.readings.lock().unwrap().pop_front() {
            *last = next;
        }
        Ok(*last)
    }
}

/// Contact sensor whose every read fails
pub struct FaultyContact;

impl ContactSensor for FaultyContact {
    fn is_open(&self) -> Result<bool, HardwareError> {
        Err(HardwareError::InvalidReading {
            device: "mock-contact".into(),
            value: "?".to_string(),
        })
    }
}

/// RFID reader replaying one scripted result per poll
///
/// `None` entries, and every poll after the script runs out, behave like a
/// real miss: the call waits out its full timeout.
pub struct ScriptedReader {
    scans: Mutex<VecDeque<Option<String>>>,
    polls: Mutex<usize>,
}

impl ScriptedReader {
    pub fn new<I, S>(scans: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        Self {
            scans: Mutex::new(scans.into_iter().map(|s| s.map(Into::into)).collect()),
            polls: Mutex::new(0),
        }
    }

    /// Reader that never sees a tag
    pub fn silent() -> Self {
        Self::new(Vec::<Option<String>>::new())
    }

    pub fn polls(&self) -> usize {
        *self.polls.lock().unwrap()
    }

    pub fn remaining(&self) -> usize {
        self.scans.lock().unwrap().len()
    }
}

#[async_trait]
impl RfidReader for ScriptedReader {
    async fn poll(&self, timeout: Duration) -> Result<Option<String>, HardwareError> {
        *self.polls.lock().unwrap() += 1;
        let next = self.scans.lock().unwrap().pop_front().flatten();
        match next {
            Some(id) => Ok(Some(id)),
            None => {
                tokio::time::sleep(timeout).await;
                Ok(None)
            }
        }
    }
}

#[derive(Default)]
pub struct RecordingActuator {
    positions: Mutex<Vec<u16>>,
}

impl RecordingActuator {
    pub fn positions(&self) -> Vec<u16> {
        self.positions.lock().unwrap().clone()
    }
}

impl Actuator for RecordingActuator {
    fn set_position(&self, angle: u16) -> Result<(), HardwareError> {
        self.positions.lock().unwrap().push(angle);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingIndicator {
    levels: Mutex<Vec<bool>>,
}

impl RecordingIndicator {
    pub fn levels(&self) -> Vec<bool> {
        self.levels.lock().unwrap().clone()
    }
}

impl StatusIndicator for RecordingIndicator {
    fn set(&self, on: bool) -> Result<(), HardwareError> {
        self.levels.lock().unwrap().push(on);
        Ok(())
    }
}
