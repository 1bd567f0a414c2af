use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("API error: {0}")]
    Api(String),
}

/// JSON schema the model must shape its reply to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaSpec {
    pub name: String,
    pub schema: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub system: String,
    pub user: String,
    pub schema: Option<SchemaSpec>,
    pub web_search: bool,
}

impl ModelRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            schema: None,
            web_search: false,
        }
    }

    pub fn with_schema(mut self, name: impl Into<String>, schema: serde_json::Value) -> Self {
        self.schema = Some(SchemaSpec {
            name: name.into(),
            schema,
        });
        self
    }

    pub fn with_web_search(mut self) -> Self {
        self.web_search = true;
        self
    }
}

/// Completion service the engine plans, verifies, and summarizes through.
/// Callers parse the returned text themselves; schema'd requests come back
/// as JSON matching the supplied shape.
#[async_trait]
pub trait ModelService: Send + Sync {
    async fn complete(&self, request: &ModelRequest) -> Result<String, ServiceError>;

    fn name(&self) -> &str;
}
