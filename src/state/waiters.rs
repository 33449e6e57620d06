//! The two waiters raced while Locked
//!
//! Both check their token before every hardware read and give up as soon as
//! it is cancelled. Neither touches door state; the outcome is interpreted
//! by the caller once the race has settled.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::credentials::CredentialSet;
use crate::hardware::{ContactSensor, HardwareError, RfidReader};
use crate::race::{pause, Completion};

/// Finish once the key slot has been seen open and then closed again
pub async fn key_taken(
    sensor: Arc<dyn ContactSensor>,
    interval: Duration,
    token: CancellationToken,
) -> Result<Completion, HardwareError> {
    debug!("key sensor watch started");

    if !poll_until(&token, interval, || sensor.is_open()).await? {
        return Ok(Completion::Cancelled);
    }
    debug!("key slot opened");

    if !poll_until(&token, interval, || sensor.is_closed()).await? {
        return Ok(Completion::Cancelled);
    }
    info!("key taken");
    Ok(Completion::Finished)
}

/// Finish on the first scanned tag present in `credentials`
pub async fn rfid_authenticated(
    reader: Arc<dyn RfidReader>,
    credentials: Arc<CredentialSet>,
    poll_timeout: Duration,
    token: CancellationToken,
) -> Result<Completion, HardwareError> {
    debug!("RFID authentication started");

    loop {
        let scan = tokio::select! {
            biased;
            _ = token.cancelled() => return Ok(Completion::Cancelled),
            scan = reader.poll(poll_timeout) => scan?,
        };

        match scan {
            Some(id) if credentials.contains(&id) => {
                info!(%id, "RFID authenticated");
                return Ok(Completion::Finished);
            }
            Some(id) => debug!(%id, "unknown tag ignored"),
            None => {}
        }
    }
}

/// Poll `probe` every `interval` until it reports true
///
/// Returns `Ok(false)` if `token` is cancelled first.
async fn poll_until<F>(
    token: &CancellationToken,
    interval: Duration,
    mut probe: F,
) -> Result<bool, HardwareError>
where
    F: FnMut() -> Result<bool, HardwareError>,
{
    loop {
        if token.is_cancelled() {
            return Ok(false);
        }
        if probe()? {
            return Ok(true);
        }
        if !pause(token, interval).await {
            return Ok(false);
        }
    }
}
