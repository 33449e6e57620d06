//! Signal handling for graceful shutdown

use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Cancels its token on SIGTERM or SIGINT
pub struct ShutdownSignal {
    token: CancellationToken,
}

impl ShutdownSignal {
    /// Register the signal handlers and start watching
    ///
    /// Must be called from within the runtime.
    pub fn install() -> std::io::Result<Self> {
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = sigterm.recv() => {
                    debug!("received SIGTERM");
                }
                _ = sigint.recv() => {
                    debug!("received SIGINT");
                }
                _ = trigger.cancelled() => {}
            }
            trigger.cancel();
        });

        Ok(Self { token })
    }

    /// Wait for a shutdown request
    pub async fn wait(&self) {
        self.token.cancelled().await;
    }
}
