//! auto-lock-daemon: automatic door latch
//!
//! Runs on the door controller and provides:
//! - Locked/Unlocked state machine driving the latch servo
//! - RFID authentication raced against key-slot detection while Locked
//! - Auto relock once the door has stayed shut for the unlock window
//! - Best-effort LINE broadcast and Google Home announcement on unlock
//!
//! There is no network API and no persisted state beyond the credential file.

mod config;
mod credentials;
mod events;
mod hardware;
mod lifecycle;
mod notify;
mod race;
mod state;

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::credentials::CredentialSet;
use crate::events::DoorEvent;
use crate::hardware::{GpioContact, GpioOutput, PwmServo, SerialRfidReader, StatusIndicator};
use crate::lifecycle::ShutdownSignal;
use crate::notify::{GoogleHomeClient, LineClient, NotificationDispatcher};
use crate::state::{Door, DoorContext, LockState};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "auto-lock-daemon starting"
    );

    // Register signal handlers before touching hardware
    let shutdown = ShutdownSignal::install()?;

    // Load configuration
    let config = Config::load()?;
    info!(
        credentials = ?config.credentials_path,
        rfid = ?config.rfid_device,
        baud = config.rfid_baud_rate,
        "configuration loaded"
    );

    let credentials = CredentialSet::load(&config.credentials_path)?;
    if credentials.is_empty() {
        warn!("credential list is empty, RFID will never unlock the door");
    }
    if config.line_token.is_none() {
        warn!("AUTOLOCK_LINE_TOKEN not set, LINE broadcasts will fail");
    }

    // State machine -> event logger
    let (event_tx, mut event_rx) = broadcast::channel::<DoorEvent>(64);

    let indicator = Arc::new(GpioOutput::new(config.led_pin)?);
    let dispatcher = NotificationDispatcher::new(
        Arc::new(LineClient::new(config.line_token.clone())?),
        Arc::new(GoogleHomeClient::new()?),
        config.line_message.clone(),
        config.announce_url.clone(),
    );

    let ctx = DoorContext {
        actuator: Arc::new(PwmServo::new(config.pwm_channel)?),
        rfid: Arc::new(SerialRfidReader::open(
            &config.rfid_device,
            config.rfid_baud_rate,
        )?),
        key_slot: Arc::new(GpioContact::new(config.key_slot_pin)?),
        door_sensor: Arc::new(GpioContact::new(config.door_pin)?),
        indicator: indicator.clone(),
        credentials: Arc::new(credentials),
        dispatcher,
        settings: config.settings,
        events: event_tx.clone(),
    };

    let mut door = Door::new(ctx, LockState::Unlocked);

    info!("daemon initialized, entering main loop");

    let mut outcome = Ok(());

    tokio::select! {
        // Run the door until a hardware fault stops it
        result = door.run() => {
            match result {
                Ok(never) => match never {},
                Err(e) => {
                    error!(error = %e, "door stopped on hardware fault");
                    outcome = Err(e.into());
                }
            }
        }

        // Log every door event as JSON
        _ = async {
            loop {
                match event_rx.recv().await {
                    Ok(event) => {
                        let json = serde_json::to_string(&event)
                            .unwrap_or_else(|_| event.to_string());
                        info!(event = %json, "door event");
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "door event receiver lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        break;
                    }
                }
            }
        } => {
            info!("door event logger exited");
        }

        // Wait for shutdown signal
        _ = shutdown.wait() => {
            info!("shutdown signal received");
        }
    }

    // Cleanup
    info!("shutting down...");

    if let Err(e) = indicator.set(false) {
        warn!(error = %e, "failed to clear status indicator");
    }

    info!(state = %door.state(), "auto-lock-daemon stopped");

    outcome
}
