use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use deskpilot_interfaces::Console;
use deskpilot_providers::{ModelRequest, ModelService};

use crate::controller::StepController;
use crate::error::EngineError;
use crate::types::{Step, StepOutcome, StepPayload, TaskKind};

const RESEARCH_SYSTEM: &str = "Answer the question using web search. Report the \
information you find, clearly and concisely.";

/// Executes one plan step of a particular kind. Implementations return a
/// resolved outcome for normal failures; `Err` is reserved for conditions
/// that must halt the plan walk.
#[async_trait]
pub trait StepHandler: Send + Sync {
    async fn handle(&self, step: &Step, context: &str) -> Result<StepOutcome, EngineError>;
}

/// Explicit kind-to-handler mapping, constructed once at wiring time and
/// handed to the orchestrator. No hidden shared state between runs.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<TaskKind, Arc<dyn StepHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: TaskKind, handler: Arc<dyn StepHandler>) {
        tracing::debug!("Registered handler for {}", kind);
        self.handlers.insert(kind, handler);
    }

    pub fn get(&self, kind: TaskKind) -> Option<Arc<dyn StepHandler>> {
        self.handlers.get(&kind).cloned()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Script steps go through the full retry controller.
pub struct ScriptStepHandler {
    controller: StepController,
}

impl ScriptStepHandler {
    pub fn new(controller: StepController) -> Self {
        Self { controller }
    }
}

#[async_trait]
impl StepHandler for ScriptStepHandler {
    async fn handle(&self, step: &Step, context: &str) -> Result<StepOutcome, EngineError> {
        self.controller.run_step(step, context).await
    }
}

/// Web research is a single model call with the search tool enabled. No
/// retry, no gate, no verification; a service error becomes a failure
/// outcome rather than halting the walk on its own.
pub struct ResearchStepHandler {
    service: Arc<dyn ModelService>,
    console: Arc<dyn Console>,
}

impl ResearchStepHandler {
    pub fn new(service: Arc<dyn ModelService>, console: Arc<dyn Console>) -> Self {
        Self { service, console }
    }
}

#[async_trait]
impl StepHandler for ResearchStepHandler {
    async fn handle(&self, step: &Step, _context: &str) -> Result<StepOutcome, EngineError> {
        self.console
            .print(&format!("🔍 Searching for: {}", step.instruction))
            .await;

        let request = ModelRequest::new(RESEARCH_SYSTEM, &step.instruction).with_web_search();

        match self.service.complete(&request).await {
            Ok(findings) => {
                self.console.print("✅ Search completed successfully").await;
                Ok(StepOutcome {
                    success: true,
                    payload: StepPayload::Search {
                        query: step.instruction.clone(),
                        findings,
                    },
                })
            }
            Err(e) => {
                self.console
                    .print(&format!("❌ Error during web search: {}", e))
                    .await;
                Ok(StepOutcome {
                    success: false,
                    payload: StepPayload::Failed {
                        instruction: step.instruction.clone(),
                        reason: format!("Error performing search: {}", e),
                    },
                })
            }
        }
    }
}
