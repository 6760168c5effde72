use anyhow::{Context, Result};
use reqwest::Client;

use super::{AlertPayload, AlertSink};

pub struct SlackNotifier {
    webhook_url: String,
    client: Client,
}

impl SlackNotifier {
    pub fn new(url: String) -> Self {
        Self {
            webhook_url: url,
            client: Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl AlertSink for SlackNotifier {
    async fn send_alert(&self, alert: &AlertPayload) -> Result<()> {
        let text = format!(
            "*{}:* {}\n{}\n@ {}",
            alert.severity.as_str(),
            alert.title,
            alert.body,
            alert.timestamp_iso
        );
        let body = serde_json::json!({ "text": text });

        self.client
            .post(&self.webhook_url)
            .json(&body)
            .send()
            .await
            .context("slack post")?
            .error_for_status()
            .context("slack non-2xx")?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "slack"
    }
}
