use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{LineNotifier, VoiceAnnouncer};

/// Deferred side effect raised while Locked
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationFlag {
    /// Tell the household chat someone is home
    LineBroadcast,
    /// Have the speaker greet whoever took the key
    GoogleHomeAnnounce,
}

/// Fires one sender per pending flag
pub struct NotificationDispatcher {
    line: Arc<dyn LineNotifier>,
    voice: Arc<dyn VoiceAnnouncer>,
    line_message: String,
    announce_url: String,
}

impl NotificationDispatcher {
    pub fn new(
        line: Arc<dyn LineNotifier>,
        voice: Arc<dyn VoiceAnnouncer>,
        line_message: impl Into<String>,
        announce_url: impl Into<String>,
    ) -> Self {
        Self {
            line,
            voice,
            line_message: line_message.into(),
            announce_url: announce_url.into(),
        }
    }

    /// Spawn a sender for every flag in `pending` and empty it
    ///
    /// Sends are not awaited and never retried; the returned handles exist
    /// only so callers can wait for completion if they want to.
    pub fn dispatch(&self, pending: &mut BTreeSet<NotificationFlag>) -> Vec<JoinHandle<()>> {
        let flags = std::mem::take(pending);
        if !flags.is_empty() {
            debug!(?flags, "dispatching notifications");
        }
        flags.into_iter().map(|flag| self.spawn(flag)).collect()
    }

    fn spawn(&self, flag: NotificationFlag) -> JoinHandle<()> {
        match flag {
            NotificationFlag::LineBroadcast => {
                let line = Arc::clone(&self.line);
                let text = self.line_message.clone();
                tokio::spawn(async move {
                    match line.broadcast(&text).await {
                        Ok(()) => info!("LINE broadcast sent"),
                        Err(e) => warn!(error = %e, "LINE broadcast failed"),
                    }
                })
            }
            NotificationFlag::GoogleHomeAnnounce => {
                let voice = Arc::clone(&self.voice);
                let url = self.announce_url.clone();
                tokio::spawn(async move {
                    match voice.notify(&url).await {
                        Ok(()) => info!("Google Home announcement sent"),
                        Err(e) => warn!(error = %e, "Google Home announcement failed"),
                    }
                })
            }
        }
    }
}
