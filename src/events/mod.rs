//! Events module for door state transitions
//!
//! Provides structured event types for state entry and for the outcome of
//! each Locked race.

use serde::{Deserialize, Serialize};

/// Events emitted by the door during each cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DoorEvent {
    /// Latch moved to the locked angle
    Locked,

    /// Latch moved to the unlocked angle
    Unlocked,

    /// Key slot was opened and closed again while Locked
    KeyTaken {
        /// Time spent Locked before the key was taken
        locked_ms: u64,
    },

    /// A permitted RFID tag was scanned while Locked
    Authenticated {
        /// Time spent Locked before the scan
        locked_ms: u64,
    },

    /// The unlock window ran out and the door is about to relock
    UnlockExpired,
}

impl std::fmt::Display for DoorEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DoorEvent::Locked => write!(f, "LOCKED"),
            DoorEvent::Unlocked => write!(f, "UNLOCKED"),
            DoorEvent::KeyTaken { locked_ms } => write!(f, "KEY_TAKEN ({}ms)", locked_ms),
            DoorEvent::Authenticated { locked_ms } => {
                write!(f, "AUTHENTICATED ({}ms)", locked_ms)
            }
            DoorEvent::UnlockExpired => write!(f, "UNLOCK_EXPIRED"),
        }
    }
}
