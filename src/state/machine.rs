//! Core door state machine
//!
//! The door alternates between Locked and Unlocked forever. Every cycle runs
//! the current state's entry action, waits for its exit condition, runs its
//! exit action, then switches to the state the wait returned.

use std::collections::BTreeSet;
use std::convert::Infallible;
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info};

use super::timer::Timer;
use super::waiters;
use crate::config::DoorSettings;
use crate::credentials::CredentialSet;
use crate::events::DoorEvent;
use crate::hardware::{Actuator, ContactSensor, HardwareError, RfidReader, StatusIndicator};
use crate::notify::{NotificationDispatcher, NotificationFlag};
use crate::race::{self, RaceError, RaceOutcome};

/// The two physical states of the latch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Locked,
    Unlocked,
}

impl LockState {
    /// Servo angle holding this state
    pub fn angle(self, settings: &DoorSettings) -> u16 {
        match self {
            LockState::Locked => settings.locked_angle,
            LockState::Unlocked => settings.unlocked_angle,
        }
    }
}

impl std::fmt::Display for LockState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LockState::Locked => write!(f, "Locked"),
            LockState::Unlocked => write!(f, "Unlocked"),
        }
    }
}

/// What ended a Locked wait
///
/// Both waiters can finish before either observes cancellation, so `Both`
/// is a legitimate result and each side is acted on independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    KeyTaken,
    Authenticated,
    Both,
}

impl EventOutcome {
    /// Interpret a race run as (key waiter, RFID waiter)
    fn from_race(outcome: RaceOutcome) -> Option<Self> {
        match (outcome.first, outcome.second) {
            (true, true) => Some(Self::Both),
            (true, false) => Some(Self::KeyTaken),
            (false, true) => Some(Self::Authenticated),
            (false, false) => None,
        }
    }

    pub fn key_taken(self) -> bool {
        matches!(self, Self::KeyTaken | Self::Both)
    }

    pub fn authenticated(self) -> bool {
        matches!(self, Self::Authenticated | Self::Both)
    }
}

/// Errors that stop the door
#[derive(Debug, thiserror::Error)]
pub enum DoorError {
    #[error("hardware fault: {0}")]
    Hardware(#[from] HardwareError),

    #[error("locked wait failed: {0}")]
    Race(#[from] RaceError),
}

/// Everything the door talks to, built once at startup
pub struct DoorContext {
    pub actuator: Arc<dyn Actuator>,
    pub rfid: Arc<dyn RfidReader>,
    pub key_slot: Arc<dyn ContactSensor>,
    pub door_sensor: Arc<dyn ContactSensor>,
    pub indicator: Arc<dyn StatusIndicator>,
    pub credentials: Arc<CredentialSet>,
    pub dispatcher: NotificationDispatcher,
    pub settings: DoorSettings,
    pub events: broadcast::Sender<DoorEvent>,
}

/// The door state machine
pub struct Door {
    ctx: DoorContext,
    /// Current state
    state: LockState,
    /// Reset on every entry and on each door-open reading while Unlocked
    timer: Timer,
    /// Notifications raised during the Locked wait, drained on exit
    pending: BTreeSet<NotificationFlag>,
}

impl Door {
    /// Create a new door starting in `initial`
    pub fn new(ctx: DoorContext, initial: LockState) -> Self {
        Self {
            ctx,
            state: initial,
            timer: Timer::new(),
            pending: BTreeSet::new(),
        }
    }

    /// Get the current state
    pub fn state(&self) -> LockState {
        self.state
    }

    /// Run the door until a hardware fault stops it
    ///
    /// There is no terminal state; the only way out is an error or dropping
    /// the future.
    pub async fn run(&mut self) -> Result<Infallible, DoorError> {
        info!(state = %self.state, "door started");
        loop {
            self.step().await?;
        }
    }

    /// Run one full cycle and return the state switched to
    pub async fn step(&mut self) -> Result<LockState, DoorError> {
        let current = self.state;
        self.ctx.indicator.set(current == LockState::Unlocked)?;

        self.entry()?;
        let next = self.wait().await?;
        self.exit();

        self.ctx.indicator.set(false)?;

        info!(
            from = %current,
            to = %next,
            elapsed_ms = duration_ms(self.timer.elapsed()),
            "state transition"
        );
        self.state = next;
        Ok(next)
    }

    fn entry(&mut self) -> Result<(), HardwareError> {
        let event = match self.state {
            LockState::Locked => DoorEvent::Locked,
            LockState::Unlocked => DoorEvent::Unlocked,
        };
        info!(state = %self.state, "entering");

        self.ctx
            .actuator
            .set_position(self.state.angle(&self.ctx.settings))?;
        self.timer.reset();
        self.emit(event);
        Ok(())
    }

    async fn wait(&mut self) -> Result<LockState, DoorError> {
        match self.state {
            LockState::Locked => self.wait_locked().await,
            LockState::Unlocked => self.wait_unlocked().await,
        }
    }

    fn exit(&mut self) {
        match self.state {
            LockState::Locked => {
                // Fire and forget: delivery never holds up the door.
                self.ctx.dispatcher.dispatch(&mut self.pending);
            }
            LockState::Unlocked => {}
        }
    }

    /// Race key removal against RFID authentication
    async fn wait_locked(&mut self) -> Result<LockState, DoorError> {
        let settings = self.ctx.settings;
        let key_slot = Arc::clone(&self.ctx.key_slot);
        let reader = Arc::clone(&self.ctx.rfid);
        let credentials = Arc::clone(&self.ctx.credentials);

        let raced = race::race(
            move |token| waiters::key_taken(key_slot, settings.sensor_poll_interval, token),
            move |token| {
                waiters::rfid_authenticated(reader, credentials, settings.rfid_poll_timeout, token)
            },
        )
        .await?;
        let outcome = EventOutcome::from_race(raced).ok_or(RaceError::NoWinner)?;

        let locked_for = self.timer.elapsed();
        let locked_ms = duration_ms(locked_for);
        info!(?outcome, locked_ms, "locked wait resolved");

        if outcome.key_taken() {
            self.pending.insert(NotificationFlag::GoogleHomeAnnounce);
            self.emit(DoorEvent::KeyTaken { locked_ms });
        }

        if outcome.authenticated() {
            if locked_for > settings.notify_interval {
                self.pending.insert(NotificationFlag::LineBroadcast);
            } else {
                debug!(locked_ms, "relocked recently, broadcast skipped");
            }
            self.emit(DoorEvent::Authenticated { locked_ms });
        }

        Ok(LockState::Unlocked)
    }

    /// Hold the door open until it has been left shut for a full window
    async fn wait_unlocked(&mut self) -> Result<LockState, DoorError> {
        let settings = self.ctx.settings;
        debug!(window = ?settings.unlock_duration, "unlock window started");

        while self.timer.elapsed() < settings.unlock_duration {
            if self.ctx.door_sensor.is_open()? {
                debug!("door open, unlock window restarted");
                self.timer.reset();
            }
            tokio::time::sleep(settings.unlocked_tick).await;
        }

        self.emit(DoorEvent::UnlockExpired);
        Ok(LockState::Locked)
    }

    fn emit(&self, event: DoorEvent) {
        debug!(%event, "emitting door event");
        let _ = self.ctx.events.send(event);
    }
}

fn duration_ms(duration: std::time::Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
