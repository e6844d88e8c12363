use adesao_core::ports::{NotifyError, WebhookNotifier};
use adesao_core::webhook::WebhookSummary;
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};

#[derive(Clone, Debug)]
pub struct WebhookClient {
    client: Client,
    url: String,
}

impl WebhookClient {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self { client, url: url.into() }
    }
}

#[async_trait]
impl WebhookNotifier for WebhookClient {
    async fn notify(&self, summary: &WebhookSummary) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.url)
            .json(summary)
            .send()
            .await
            .map_err(|error| NotifyError::Transport(error.to_string()))?;

        if !response.status().is_success() {
            return Err(NotifyError::Status(response.status().as_u16()));
        }

        info!(event_name = "integration.webhook.delivered", "registration webhook delivered");
        Ok(())
    }
}

/// Used when no webhook URL is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopWebhookNotifier;

#[async_trait]
impl WebhookNotifier for NoopWebhookNotifier {
    async fn notify(&self, _summary: &WebhookSummary) -> Result<(), NotifyError> {
        debug!(event_name = "integration.webhook.skipped", "no webhook configured");
        Ok(())
    }
}
