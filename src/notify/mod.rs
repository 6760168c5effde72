pub mod discord;
pub mod slack;

use anyhow::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AlertPayload {
    pub severity: Severity,
    pub title: String,
    pub body: String,
    pub timestamp_iso: String, // local wall-clock, ISO 8601
}

#[async_trait::async_trait]
pub trait AlertSink: Send + Sync {
    async fn send_alert(&self, alert: &AlertPayload) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// Fans one alert out to every configured channel, best-effort. A sink that
/// errors is logged and skipped; alerting must never take the loop down.
pub struct NotifierMux {
    sinks: Vec<Box<dyn AlertSink>>,
}

impl NotifierMux {
    /// Build from `DISCORD_WEBHOOK_URL` / `SLACK_WEBHOOK_URL`. Unset vars
    /// simply leave that channel out.
    pub fn from_env() -> Self {
        let mut sinks: Vec<Box<dyn AlertSink>> = Vec::new();
        if let Ok(url) = std::env::var("DISCORD_WEBHOOK_URL") {
            sinks.push(Box::new(discord::DiscordNotifier::new(url)));
        }
        if let Ok(url) = std::env::var("SLACK_WEBHOOK_URL") {
            sinks.push(Box::new(slack::SlackNotifier::new(url)));
        }
        Self { sinks }
    }

    pub fn with_sinks(sinks: Vec<Box<dyn AlertSink>>) -> Self {
        Self { sinks }
    }

    pub fn noop() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub async fn notify(&self, alert: &AlertPayload) {
        if self.sinks.is_empty() {
            tracing::info!(
                severity = alert.severity.as_str(),
                title = %alert.title,
                "alert (no channels configured)"
            );
            return;
        }
        for sink in &self.sinks {
            if let Err(e) = sink.send_alert(alert).await {
                tracing::warn!(error = ?e, sink = sink.name(), "alert delivery failed");
            }
        }
    }
}

// --- Test helper ---
/// Captures alerts for assertions.
pub struct MockAlertSink {
    sent: std::sync::Arc<std::sync::Mutex<Vec<AlertPayload>>>,
}

impl MockAlertSink {
    pub fn new() -> (Self, std::sync::Arc<std::sync::Mutex<Vec<AlertPayload>>>) {
        let sent = std::sync::Arc::new(std::sync::Mutex::new(vec![]));
        (Self { sent: sent.clone() }, sent)
    }
}

#[async_trait::async_trait]
impl AlertSink for MockAlertSink {
    async fn send_alert(&self, alert: &AlertPayload) -> Result<()> {
        self.sent.lock().unwrap().push(alert.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
