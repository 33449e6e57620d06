//! Outbound notifications fired after the door unlocks
//!
//! Senders are best effort. The dispatcher runs each one on its own task and
//! only logs failures.

use async_trait::async_trait;

mod dispatcher;
mod google_home;
mod line;

#[cfg(test)]
pub(crate) use dispatcher::mock;
pub use dispatcher::{NotificationDispatcher, NotificationFlag};
pub use google_home::GoogleHomeClient;
pub use line::LineClient;

/// Errors returned by notification senders
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server answered {status}: {body}")]
    Status { status: u16, body: String },
}

/// Chat broadcast to every follower of the household account
#[async_trait]
pub trait LineNotifier: Send + Sync {
    async fn broadcast(&self, text: &str) -> Result<(), NotifyError>;
}

/// Voice announcement through a smart speaker
#[async_trait]
pub trait VoiceAnnouncer: Send + Sync {
    async fn notify(&self, url: &str) -> Result<(), NotifyError>;
}
