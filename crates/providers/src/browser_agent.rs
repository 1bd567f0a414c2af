use async_trait::async_trait;
use deskpilot_executor::{BrowserDriver, BrowserError, BrowserRun};
use reqwest::Client;
use serde_json::json;

/// HTTP client for the browser agent sidecar. The sidecar holds the CDP
/// connection and does the actual navigate-and-act work; this client just
/// ships it an approved URL, task, and accumulated context.
pub struct BrowserAgentClient {
    client: Client,
    base_url: String,
}

impl BrowserAgentClient {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }
}

#[async_trait]
impl BrowserDriver for BrowserAgentClient {
    async fn run(&self, url: &str, task: &str, context: &str) -> Result<BrowserRun, BrowserError> {
        let endpoint = format!("{}/run", self.base_url);
        let body = json!({
            "url": url,
            "task": task,
            "context": context,
        });

        tracing::debug!("Dispatching browser task to {}", endpoint);

        let response = self
            .client
            .post(&endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| BrowserError::Agent(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(BrowserError::Agent(format!("{}: {}", status, text)));
        }

        response
            .json::<BrowserRun>()
            .await
            .map_err(|e| BrowserError::Agent(e.to_string()))
    }
}
