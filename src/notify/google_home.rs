//! google-home-notifier client: a plain GET makes the speaker talk

use std::time::Duration;

use async_trait::async_trait;

use super::{NotifyError, VoiceAnnouncer};

const CONNECT_TIMEOUT: Duration = Duration::from_millis(500);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

pub struct GoogleHomeClient {
    http: reqwest::Client,
}

impl GoogleHomeClient {
    pub fn new() -> Result<Self, NotifyError> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .no_proxy()
            .build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl VoiceAnnouncer for GoogleHomeClient {
    async fn notify(&self, url: &str) -> Result<(), NotifyError> {
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status {
                status: status.as_u16(),
                body: String::new(),
            });
        }
        Ok(())
    }
}
