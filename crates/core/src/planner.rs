use std::sync::Arc;

use deskpilot_providers::{ModelRequest, ModelService};
use serde_json::{json, Value};

use crate::error::EngineError;
use crate::types::{Plan, TaskClassification};

const PLAN_SYSTEM: &str = "Generate a structured execution plan for the given prompt. \
Break the task into clear steps, each with a specific instruction and task kind. \
Task kinds are: 'web_search' for research and information gathering, 'desktop_script' \
for controlling apps through desktop scripting, 'browser' for actions the user \
explicitly asks to happen in a browser, 'terminal' for command line and file system \
operations, 'generic_automation' as a last resort for unfamiliar apps. Prefer \
web_search whenever the user is asking for information, with an instruction that is \
ideally a one line question. Never place two desktop_script steps or two terminal \
steps directly after one another; fold consecutive work of the same kind into a \
single step. Each step should be atomic and actionable.";

const REVISED_PLAN_SYSTEM: &str = "Generate a revised execution plan based on the \
original prompt and user feedback. Break the task into clear steps, each with a \
specific instruction and task kind. Task kinds are: 'web_search' for research and \
information gathering, 'desktop_script' for controlling apps through desktop \
scripting, 'browser' for web interactions, 'terminal' for command line operations. \
Each step should be atomic and actionable.";

const CLASSIFY_SYSTEM: &str = "Analyze the user's request and classify it as \
'browser', 'desktop_script', or 'generic_automation', then break the task into \
clear, actionable steps with detailed instructions for each. Work that must happen \
on a web page is 'browser'. File work and well known desktop apps belong to \
'desktop_script'. Reserve 'generic_automation' for unfamiliar apps, as a last \
resort. Desktop script steps run through an inline scripting interpreter; each \
step must name the app to open and everything to do in it, and work in one app \
must never be split across steps. If a step runs shell commands, the script should \
open and activate the Terminal and run the commands in that same step. Browser \
steps must each carry one URL and everything to do on that page.";

/// Obtains structured plans from the model service. Service errors at this
/// stage are fatal to the run.
pub struct Planner {
    service: Arc<dyn ModelService>,
}

impl Planner {
    pub fn new(service: Arc<dyn ModelService>) -> Self {
        Self { service }
    }

    pub async fn generate(&self, prompt: &str) -> Result<Plan, EngineError> {
        let request =
            ModelRequest::new(PLAN_SYSTEM, prompt).with_schema("execution_plan", plan_schema());
        let raw = self
            .service
            .complete(&request)
            .await
            .map_err(|e| EngineError::Planning(e.to_string()))?;
        serde_json::from_str(&raw).map_err(|e| EngineError::Planning(e.to_string()))
    }

    /// Full plan replacement from review feedback, not a patch.
    pub async fn regenerate(&self, prompt: &str, feedback: &str) -> Result<Plan, EngineError> {
        let user = format!(
            "Original prompt: {}\n\nPrevious plan had issues. User feedback: {}\n\n\
             Please generate an improved plan.",
            prompt, feedback
        );
        let request =
            ModelRequest::new(REVISED_PLAN_SYSTEM, user).with_schema("execution_plan", plan_schema());
        let raw = self
            .service
            .complete(&request)
            .await
            .map_err(|e| EngineError::Planning(e.to_string()))?;
        serde_json::from_str(&raw).map_err(|e| EngineError::Planning(e.to_string()))
    }
}

/// Classifies a raw prompt for the single-task path: one strategy, a flat
/// list of steps.
pub struct Classifier {
    service: Arc<dyn ModelService>,
}

impl Classifier {
    pub fn new(service: Arc<dyn ModelService>) -> Self {
        Self { service }
    }

    pub async fn classify(&self, prompt: &str) -> Result<TaskClassification, EngineError> {
        let request = ModelRequest::new(CLASSIFY_SYSTEM, prompt)
            .with_schema("task_classification", classification_schema());
        let raw = self
            .service
            .complete(&request)
            .await
            .map_err(|e| EngineError::Classification(e.to_string()))?;
        serde_json::from_str(&raw).map_err(|e| EngineError::Classification(e.to_string()))
    }
}

fn kind_tokens() -> Value {
    json!(["browser", "desktop_script", "terminal", "web_search", "generic_automation"])
}

fn plan_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "steps": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "instruction": {"type": "string"},
                        "kind": {"type": "string", "enum": kind_tokens()}
                    },
                    "required": ["instruction", "kind"],
                    "additionalProperties": false
                }
            }
        },
        "required": ["steps"],
        "additionalProperties": false
    })
}

fn classification_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "kind": {"type": "string", "enum": kind_tokens()},
            "steps": {
                "type": "array",
                "items": {"type": "string"}
            }
        },
        "required": ["kind", "steps"],
        "additionalProperties": false
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::types::TaskKind;
    use async_trait::async_trait;
    use deskpilot_providers::ServiceError;
    use std::sync::Mutex;

    struct CannedService {
        responses: Mutex<Vec<Result<String, ServiceError>>>,
    }

    impl CannedService {
        fn new(responses: Vec<Result<String, ServiceError>>) -> Self {
            Self {
                responses: Mutex::new(responses),
            }
        }
    }

    #[async_trait]
    impl ModelService for CannedService {
        async fn complete(&self, _request: &ModelRequest) -> Result<String, ServiceError> {
            self.responses
                .lock()
                .unwrap()
                .remove(0)
        }

        fn name(&self) -> &str {
            "canned"
        }
    }

    #[tokio::test]
    async fn test_generate_parses_structured_plan() {
        let raw = r#"{"steps":[{"instruction":"look up the weather","kind":"web_search"}]}"#;
        let planner = Planner::new(Arc::new(CannedService::new(vec![Ok(raw.to_string())])));

        let plan = planner.generate("what's the weather").await.unwrap();
        assert_eq!(plan.steps.len(), 1);
        assert_eq!(plan.steps[0].kind, TaskKind::WebSearch);
    }

    #[tokio::test]
    async fn test_generate_service_error_is_planning_error() {
        let planner = Planner::new(Arc::new(CannedService::new(vec![Err(ServiceError::Api(
            "503".to_string(),
        ))])));

        let err = planner.generate("anything").await.unwrap_err();
        assert!(matches!(err, EngineError::Planning(_)));
    }

    #[tokio::test]
    async fn test_generate_malformed_json_is_planning_error() {
        let planner = Planner::new(Arc::new(CannedService::new(vec![Ok(
            "not json at all".to_string()
        )])));

        let err = planner.generate("anything").await.unwrap_err();
        assert!(matches!(err, EngineError::Planning(_)));
    }

    #[tokio::test]
    async fn test_classify_parses_kind_and_steps() {
        let raw = r#"{"kind":"desktop_script","steps":["open Notes and write hello"]}"#;
        let classifier = Classifier::new(Arc::new(CannedService::new(vec![Ok(raw.to_string())])));

        let classification = classifier.classify("write hello in notes").await.unwrap();
        assert_eq!(classification.kind, TaskKind::DesktopScript);
        assert_eq!(classification.steps.len(), 1);
    }
}
