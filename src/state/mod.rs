//! Door state machine
//!
//! Two states, each with an entry, wait and exit action:
//! - Locked: latch closed, racing key removal against RFID authentication
//! - Unlocked: latch open until the door has been left shut for a full window

mod machine;
mod timer;
mod waiters;

pub use machine::{Door, DoorContext, LockState};
