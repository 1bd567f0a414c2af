use std::sync::Arc;

use deskpilot_executor::ExecutionOutcome;
use deskpilot_providers::{ModelRequest, ModelService};
use serde_json::{json, Value};

use crate::types::Verification;

const VERIFY_SYSTEM: &str = "Analyze if the script execution completed the requested \
task successfully. Provide a boolean result and a rationale.";

/// Second-opinion judgment on an executed action. Never aborts a step: if
/// the service is unavailable or returns garbage, the verdict degrades to
/// the executor's own success flag.
pub struct Verifier {
    service: Arc<dyn ModelService>,
}

impl Verifier {
    pub fn new(service: Arc<dyn ModelService>) -> Self {
        Self { service }
    }

    pub async fn verify(
        &self,
        goal: &str,
        action: &str,
        outcome: &ExecutionOutcome,
    ) -> Verification {
        let user = format!(
            "Task: {}\nScript executed: {}\nExecution successful: {}\n\
             Execution output: {}\nExit code: {}\n\nBased on the task, script, and \
             execution results, determine if the task was accomplished successfully.",
            goal, action, outcome.success, outcome.output, outcome.exit_code
        );
        let request =
            ModelRequest::new(VERIFY_SYSTEM, user).with_schema("verification", verification_schema());

        match self.service.complete(&request).await {
            Ok(raw) => match serde_json::from_str::<Verification>(&raw) {
                Ok(verdict) => verdict,
                Err(e) => self.degraded(outcome, &e.to_string()),
            },
            Err(e) => self.degraded(outcome, &e.to_string()),
        }
    }

    fn degraded(&self, outcome: &ExecutionOutcome, error: &str) -> Verification {
        tracing::warn!("Verification degraded to execution result: {}", error);
        Verification {
            accomplished: outcome.success,
            rationale: format!(
                "Verification failed, using execution result: {}",
                outcome.output
            ),
        }
    }
}

fn verification_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "accomplished": {"type": "boolean"},
            "rationale": {"type": "string"}
        },
        "required": ["accomplished", "rationale"],
        "additionalProperties": false
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use deskpilot_providers::ServiceError;

    struct DownService;

    #[async_trait]
    impl ModelService for DownService {
        async fn complete(&self, _request: &ModelRequest) -> Result<String, ServiceError> {
            Err(ServiceError::Http("connection refused".to_string()))
        }

        fn name(&self) -> &str {
            "down"
        }
    }

    struct FixedService(String);

    #[async_trait]
    impl ModelService for FixedService {
        async fn complete(&self, _request: &ModelRequest) -> Result<String, ServiceError> {
            Ok(self.0.clone())
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    fn outcome(success: bool) -> ExecutionOutcome {
        ExecutionOutcome {
            success,
            output: "raw output".to_string(),
            exit_code: if success { 0 } else { 1 },
        }
    }

    #[tokio::test]
    async fn test_degrades_to_successful_execution() {
        let verifier = Verifier::new(Arc::new(DownService));
        let verdict = verifier.verify("goal", "script", &outcome(true)).await;

        assert!(verdict.accomplished);
        assert!(verdict.rationale.contains("Verification failed"));
        assert!(verdict.rationale.contains("raw output"));
    }

    #[tokio::test]
    async fn test_degrades_to_failed_execution() {
        let verifier = Verifier::new(Arc::new(DownService));
        let verdict = verifier.verify("goal", "script", &outcome(false)).await;

        assert!(!verdict.accomplished);
        assert!(verdict.rationale.contains("Verification failed"));
    }

    #[tokio::test]
    async fn test_unparseable_verdict_degrades() {
        let verifier = Verifier::new(Arc::new(FixedService("not json".to_string())));
        let verdict = verifier.verify("goal", "script", &outcome(true)).await;

        assert!(verdict.accomplished);
        assert!(verdict.rationale.contains("Verification failed"));
    }

    #[tokio::test]
    async fn test_parses_service_verdict() {
        let raw = r#"{"accomplished": false, "rationale": "the dialog never appeared"}"#;
        let verifier = Verifier::new(Arc::new(FixedService(raw.to_string())));
        let verdict = verifier.verify("goal", "script", &outcome(true)).await;

        assert!(!verdict.accomplished);
        assert_eq!(verdict.rationale, "the dialog never appeared");
    }
}
