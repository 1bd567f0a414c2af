use std::sync::Arc;

use deskpilot_executor::{BrowserConfig, BrowserDriver, BrowserSession};
use deskpilot_interfaces::{Console, Decision};
use deskpilot_providers::{ModelRequest, ModelService, ServiceError};
use serde_json::{json, Value};
use tokio::sync::Mutex;

use crate::context::ExecutionHistory;
use crate::controller::StepController;
use crate::error::EngineError;
use crate::planner::Classifier;
use crate::types::{RunReport, RunSummary, Step, StepExtraction, TaskKind};

const EXTRACT_SYSTEM: &str = "Extract the URL to navigate to and the specific task to \
execute on that page. The URL should be complete and valid. The task should be clear \
instructions for what to do on that page.";

const LEGACY_SUMMARY_SYSTEM: &str = "Generate a comprehensive summary of the agent's \
automation session. Explain any data that was collected and the results of every \
step. Be clear about what was accomplished and any issues encountered.";

/// Single-task entry point: classify the prompt into one strategy, walk
/// its steps with the legacy retry policy, and summarize from the
/// execution history.
pub struct TaskRouter {
    classifier: Classifier,
    controller: StepController,
    driver: Arc<dyn BrowserDriver>,
    service: Arc<dyn ModelService>,
    console: Arc<dyn Console>,
    history: Arc<Mutex<ExecutionHistory>>,
    browser: Option<BrowserConfig>,
}

impl TaskRouter {
    pub fn new(
        classifier: Classifier,
        controller: StepController,
        driver: Arc<dyn BrowserDriver>,
        service: Arc<dyn ModelService>,
        console: Arc<dyn Console>,
        history: Arc<Mutex<ExecutionHistory>>,
        browser: Option<BrowserConfig>,
    ) -> Self {
        Self {
            classifier,
            controller,
            driver,
            service,
            console,
            history,
            browser,
        }
    }

    pub async fn run(&self, prompt: &str) -> Result<RunReport, EngineError> {
        self.console
            .print(&format!("🤖 Agent starting with prompt: {}\n", prompt))
            .await;
        self.console
            .print("📝 Classifying task and generating steps...")
            .await;

        let classification = self.classifier.classify(prompt).await?;
        self.console
            .print(&format!("Task classified as: {}", classification.kind))
            .await;
        self.console
            .print(&format!("Steps to execute: {}", classification.steps.len()))
            .await;

        let total = classification.steps.len();
        let successful = match classification.kind {
            TaskKind::DesktopScript => self.script_walk(&classification.steps).await?,
            TaskKind::Browser => self.browser_walk(&classification.steps).await?,
            TaskKind::GenericAutomation => {
                self.automation_placeholder(&classification.steps).await
            }
            other => {
                self.console
                    .print(&format!(
                        "Unsupported task type in single-task mode: {}",
                        other
                    ))
                    .await;
                0
            }
        };

        Ok(self.summarize(prompt, successful, total).await)
    }

    async fn script_walk(&self, steps: &[String]) -> Result<usize, EngineError> {
        self.console
            .print("\n=== Starting Script Handler ===")
            .await;
        self.console
            .print(&format!(
                "Executing {} steps with user approval workflow\n",
                steps.len()
            ))
            .await;

        let mut successful = 0;
        for (i, instruction) in steps.iter().enumerate() {
            let step_num = i + 1;
            self.console
                .print(&format!(
                    "--- Step {}/{}: {} ---",
                    step_num,
                    steps.len(),
                    instruction
                ))
                .await;

            let step = Step {
                instruction: instruction.clone(),
                kind: TaskKind::DesktopScript,
            };
            let context = format!("Step {}: {}", step_num, instruction);

            let outcome = self.controller.run_step(&step, &context).await?;
            if outcome.success {
                successful += 1;
                self.console
                    .print(&format!("✅ Step {} completed successfully\n", step_num))
                    .await;
            } else {
                self.console
                    .print(&format!("❌ Step {} failed\n", step_num))
                    .await;
                self.console
                    .print("🛑 Stopping execution due to continuous errors")
                    .await;
                break;
            }
        }

        self.console.print("=== Script Handler Complete ===").await;
        self.console
            .print(&format!(
                "Successfully completed {}/{} steps",
                successful,
                steps.len()
            ))
            .await;
        Ok(successful)
    }

    /// Browser walk with a guaranteed session teardown: the local browser,
    /// when one is launched, is shut down whether the walk succeeded,
    /// failed, or was cut off by the console closing.
    async fn browser_walk(&self, steps: &[String]) -> Result<usize, EngineError> {
        self.console
            .print("\n=== Starting Browser Handler ===")
            .await;
        self.console
            .print(&format!(
                "Executing {} browser steps with user approval workflow\n",
                steps.len()
            ))
            .await;

        let session = match &self.browser {
            Some(config) => match BrowserSession::launch(config).await {
                Ok(session) => Some(session),
                Err(e) => {
                    self.console
                        .print(&format!("💥 Browser handler error: {}", e))
                        .await;
                    return Ok(0);
                }
            },
            None => None,
        };

        let walk = self.browser_steps(steps).await;

        if let Some(session) = session {
            session.shutdown().await;
            self.console.print("  🔧 Browser process terminated").await;
        }

        let successful = walk?;

        self.console
            .print("=== Browser Handler Complete ===")
            .await;
        self.console
            .print(&format!(
                "Successfully completed {}/{} steps",
                successful,
                steps.len()
            ))
            .await;
        Ok(successful)
    }

    async fn browser_steps(&self, steps: &[String]) -> Result<usize, EngineError> {
        let mut context = String::new();
        let mut successful = 0;

        for (i, step_text) in steps.iter().enumerate() {
            let step_num = i + 1;
            self.console
                .print(&format!(
                    "--- Step {}/{}: {} ---",
                    step_num,
                    steps.len(),
                    step_text
                ))
                .await;

            let extraction = match self.extract(step_text, &context, &[]).await {
                Ok(extraction) => extraction,
                Err(e) => {
                    self.console
                        .print(&format!(
                            "❌ Step {} failed: could not extract URL and task ({})",
                            step_num, e
                        ))
                        .await;
                    break;
                }
            };

            let extraction = match self.approve_extraction(extraction, step_text).await? {
                Some(extraction) => extraction,
                None => {
                    self.console
                        .print(&format!("❌ Step {} failed: user rejected extraction", step_num))
                        .await;
                    break;
                }
            };

            self.console
                .print(&format!("  🌐 Navigating to: {}", extraction.url))
                .await;
            self.console
                .print(&format!("  🤖 Executing task: {}", extraction.task))
                .await;

            let run = match self
                .driver
                .run(&extraction.url, &extraction.task, &context)
                .await
            {
                Ok(run) => run,
                Err(e) => {
                    self.history
                        .lock()
                        .await
                        .record_browser(&extraction.url, &extraction.task, false, e.to_string());
                    self.console
                        .print(&format!("  ❌ Error executing browser step: {}", e))
                        .await;
                    break;
                }
            };

            self.history
                .lock()
                .await
                .record_browser(&extraction.url, &extraction.task, run.completed, &run.message);

            if run.completed {
                successful += 1;
                context.push_str(&format!("\nStep {} completed: {}", step_num, run.message));
                self.console
                    .print(&format!("✅ Step {} completed successfully\n", step_num))
                    .await;
            } else {
                self.console
                    .print(&format!("❌ Step {} failed: {}\n", step_num, run.message))
                    .await;
                break;
            }
        }

        Ok(successful)
    }

    async fn approve_extraction(
        &self,
        extraction: StepExtraction,
        step_text: &str,
    ) -> Result<Option<StepExtraction>, EngineError> {
        let mut current = extraction;
        let mut attempted: Vec<(StepExtraction, String)> = Vec::new();

        loop {
            let bar = format!("  {}", "=".repeat(50));
            self.console
                .print(&format!("\n  Extracted from step: {}", step_text))
                .await;
            self.console.print(&bar).await;
            self.console.print(&format!("  URL: {}", current.url)).await;
            self.console
                .print(&format!("  Task: {}", current.task))
                .await;
            self.console.print(&bar).await;

            let answer = self
                .console
                .prompt("\n  Approve this URL and task? (y/n): ")
                .await
                .ok_or(EngineError::ConsoleClosed)?;

            match Decision::parse(&answer) {
                Some(Decision::Yes) => return Ok(Some(current)),
                Some(Decision::No) => {
                    let feedback = self
                        .console
                        .prompt("  What needs to be changed about the URL or task? ")
                        .await
                        .ok_or(EngineError::ConsoleClosed)?;

                    if feedback.is_empty() {
                        return Ok(None);
                    }

                    self.console
                        .print(&format!("  Re-extracting based on feedback: {}", feedback))
                        .await;
                    attempted.push((current.clone(), feedback.clone()));

                    let feedback_context = format!("User feedback: {}", feedback);
                    match self.extract(step_text, &feedback_context, &attempted).await {
                        Ok(new_extraction) => current = new_extraction,
                        Err(e) => {
                            self.console
                                .print(&format!("  Failed to re-extract: {}", e))
                                .await;
                            return Ok(None);
                        }
                    }
                }
                None => {
                    self.console
                        .print("  Please answer 'y' for yes or 'n' for no.")
                        .await;
                }
            }
        }
    }

    async fn extract(
        &self,
        step_text: &str,
        context: &str,
        attempted: &[(StepExtraction, String)],
    ) -> Result<StepExtraction, ServiceError> {
        let mut user = format!(
            "Extract the URL to navigate to and the task to execute from this browser \
             step: {}\n\nContext: {}",
            step_text, context
        );
        if !attempted.is_empty() {
            user.push_str("\n\nPrevious extraction attempts that were rejected:");
            for (i, (extraction, feedback)) in attempted.iter().enumerate() {
                user.push_str(&format!(
                    "\nAttempt {}: URL={}, Task={}, Feedback: {}",
                    i + 1,
                    extraction.url,
                    extraction.task,
                    feedback
                ));
            }
        }

        let request = ModelRequest::new(EXTRACT_SYSTEM, user)
            .with_schema("step_extraction", extraction_schema());
        let raw = self.service.complete(&request).await?;
        serde_json::from_str(&raw).map_err(|e| ServiceError::Parse(e.to_string()))
    }

    async fn automation_placeholder(&self, steps: &[String]) -> usize {
        self.console
            .print("General automation handler not yet implemented")
            .await;
        self.console
            .print(&format!("Would execute {} automation steps:", steps.len()))
            .await;
        for (i, step) in steps.iter().enumerate() {
            self.console
                .print(&format!("  {}. {}", i + 1, step))
                .await;
        }
        0
    }

    async fn summarize(&self, prompt: &str, successful: usize, total: usize) -> RunReport {
        let history = self.history.lock().await.render();
        let user = format!(
            "Original user request: {}\nTotal steps planned: {}\nSuccessfully completed \
             steps: {}\n\nExecution history:\n{}\n\nGenerate a comprehensive summary of \
             what the agent accomplished, including what worked, what didn't work, and \
             the final outcome.",
            prompt, total, successful, history
        );
        let request = ModelRequest::new(LEGACY_SUMMARY_SYSTEM, user)
            .with_schema("run_summary", summary_schema());

        let summary = match self.service.complete(&request).await {
            Ok(raw) => serde_json::from_str::<RunSummary>(&raw).ok(),
            Err(e) => {
                tracing::warn!("Summary generation failed: {}", e);
                None
            }
        };

        let bar = "=".repeat(60);
        self.console.print(&format!("\n{}", bar)).await;
        self.console.print("FINAL SUMMARY").await;
        self.console.print(&bar).await;

        let summary_text = match summary {
            Some(parsed) => {
                let status = if parsed.completed_successfully {
                    "✅ COMPLETED"
                } else {
                    "❌ INCOMPLETE"
                };
                self.console
                    .print(&format!("Task Status: {}", status))
                    .await;
                self.console
                    .print(&format!(
                        "Steps Completed: {}/{}",
                        parsed.successful_steps, parsed.total_steps
                    ))
                    .await;
                self.console.print(&format!("\n{}", parsed.summary)).await;
                parsed.summary
            }
            None => {
                let fallback = format!(
                    "completed {}/{} steps for task: {}",
                    successful, total, prompt
                );
                self.console
                    .print(&format!("Fallback summary: {}", fallback))
                    .await;
                fallback
            }
        };
        self.console.print(&bar).await;

        RunReport {
            success: successful == total,
            successful_steps: successful,
            total_steps: total,
            summary: summary_text,
        }
    }
}

fn extraction_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "url": {"type": "string"},
            "task": {"type": "string"}
        },
        "required": ["url", "task"],
        "additionalProperties": false
    })
}

fn summary_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "summary": {"type": "string"},
            "completed_successfully": {"type": "boolean"},
            "total_steps": {"type": "integer"},
            "successful_steps": {"type": "integer"}
        },
        "required": ["summary", "completed_successfully", "total_steps", "successful_steps"],
        "additionalProperties": false
    })
}
