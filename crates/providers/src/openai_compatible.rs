use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::traits::{ModelRequest, ModelService, ServiceError};

pub struct OpenAICompatibleService {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAICompatibleService {
    pub fn new(base_url: String, api_key: Option<String>, model: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
            api_key,
            model,
        }
    }

    fn build_body(&self, request: &ModelRequest) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": request.system},
                {"role": "user", "content": request.user},
            ],
        });

        if let Some(spec) = &request.schema {
            body["response_format"] = json!({
                "type": "json_schema",
                "json_schema": {
                    "name": spec.name,
                    "schema": spec.schema,
                    "strict": true,
                }
            });
        }

        if request.web_search {
            body["tools"] = json!([{"type": "web_search"}]);
        }

        body
    }

    fn extract_content(json: &Value) -> Result<String, ServiceError> {
        let choice = json["choices"]
            .get(0)
            .ok_or_else(|| ServiceError::Parse("No choices in response".to_string()))?;

        choice["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| ServiceError::Parse("No content in response".to_string()))
    }
}

#[async_trait]
impl ModelService for OpenAICompatibleService {
    async fn complete(&self, request: &ModelRequest) -> Result<String, ServiceError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.build_body(request);

        tracing::debug!("Sending completion request to {}", url);

        let mut http = self.client.post(&url).json(&body);

        if let Some(api_key) = &self.api_key {
            http = http.bearer_auth(api_key);
        }

        let response = http
            .send()
            .await
            .map_err(|e| ServiceError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ServiceError::Api(format!("{}: {}", status, text)));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| ServiceError::Parse(e.to_string()))?;

        Self::extract_content(&json)
    }

    fn name(&self) -> &str {
        "OpenAI Compatible"
    }
}
