//! LINE Messaging API broadcast client

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use super::{LineNotifier, NotifyError};

const BROADCAST_URL: &str = "https://api.line.me/v2/bot/message/broadcast";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize)]
struct BroadcastRequest<'a> {
    messages: [TextMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct TextMessage<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: &'a str,
}

impl<'a> BroadcastRequest<'a> {
    fn text(text: &'a str) -> Self {
        Self {
            messages: [TextMessage { kind: "text", text }],
        }
    }
}

pub struct LineClient {
    http: reqwest::Client,
    token: Option<String>,
}

impl LineClient {
    pub fn new(token: Option<String>) -> Result<Self, NotifyError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { http, token })
    }
}

#[async_trait]
impl LineNotifier for LineClient {
    async fn broadcast(&self, text: &str) -> Result<(), NotifyError> {
        let token = self
            .token
            .as_deref()
            .ok_or(NotifyError::NotConfigured("LINE channel token"))?;

        let response = self
            .http
            .post(BROADCAST_URL)
            .bearer_auth(token)
            .json(&BroadcastRequest::text(text))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}
