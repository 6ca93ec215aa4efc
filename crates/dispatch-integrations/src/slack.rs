//! Slack notifier over `chat.postMessage`.

use std::time::Duration;

use async_trait::async_trait;
use dispatch_runtime::{CollaboratorResult, Notifier};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::error::{IntegrationError, Result};

pub const SLACK_POST_MESSAGE_URL: &str = "https://slack.com/api/chat.postMessage";

#[derive(Debug, Deserialize)]
struct SlackResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Posts plain-text messages with a bot token.
#[derive(Debug, Clone)]
pub struct SlackNotifier {
    http: Client,
    token: String,
    url: String,
}

impl SlackNotifier {
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let http = Client::builder().timeout(Duration::from_secs(15)).build()?;
        Ok(Self {
            http,
            token: token.into(),
            url: SLACK_POST_MESSAGE_URL.to_string(),
        })
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    fn post_request(&self, channel: &str, text: &str) -> RequestBuilder {
        self.http
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&json!({ "channel": channel, "text": text }))
    }

    pub async fn post(&self, channel: &str, text: &str) -> Result<()> {
        let response = self.post_request(channel, text).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(IntegrationError::api("slack", status.as_u16(), body));
        }
        check_response(&body)?;
        debug!(channel = %channel, "posted slack message");
        Ok(())
    }
}

fn check_response(body: &str) -> Result<()> {
    let parsed: SlackResponse =
        serde_json::from_str(body).map_err(|e| IntegrationError::Parse(e.to_string()))?;
    if parsed.ok {
        Ok(())
    } else {
        Err(IntegrationError::Rejected(
            parsed.error.unwrap_or_else(|| "unknown error".to_string()),
        ))
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn post_message(&self, channel: &str, content: &str) -> CollaboratorResult<()> {
        Ok(self.post(channel, content).await?)
    }
}
