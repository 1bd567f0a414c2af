use std::sync::Arc;

use deskpilot_interfaces::{Console, Decision};
use deskpilot_providers::{ModelRequest, ModelService};

use crate::context::ExecutionContext;
use crate::error::EngineError;
use crate::handler::HandlerRegistry;
use crate::planner::Planner;
use crate::types::{Plan, RunReport};

const SUMMARY_SYSTEM: &str = "Generate a comprehensive summary of the agent workflow. \
Highlight key information collected, actions taken, and overall outcomes. Be clear \
and concise about what was accomplished.";

/// Sequences an approved plan: generation, human review, the fail-fast
/// step walk, and a best-effort final summary.
pub struct PlanOrchestrator {
    planner: Planner,
    registry: HandlerRegistry,
    console: Arc<dyn Console>,
    service: Arc<dyn ModelService>,
}

impl PlanOrchestrator {
    pub fn new(
        planner: Planner,
        registry: HandlerRegistry,
        console: Arc<dyn Console>,
        service: Arc<dyn ModelService>,
    ) -> Self {
        Self {
            planner,
            registry,
            console,
            service,
        }
    }

    pub async fn run(&self, prompt: &str) -> Result<RunReport, EngineError> {
        self.console
            .print("\n📝 Generating execution plan...")
            .await;
        let plan = self.planner.generate(prompt).await?;

        let plan = self.review_plan(plan, prompt).await?;

        let context = self.execute_plan(&plan).await?;

        let report = self.summarize(prompt, &plan, &context).await;
        self.console.print("\n🎉 Run complete!").await;
        Ok(report)
    }

    /// Renders the plan and loops for approval. Feedback triggers a full
    /// plan regeneration; if regeneration itself fails, the current plan is
    /// re-presented rather than silently executed. Silent rejection aborts
    /// the run.
    pub async fn review_plan(&self, mut plan: Plan, prompt: &str) -> Result<Plan, EngineError> {
        loop {
            let bar = "=".repeat(60);
            self.console.print(&format!("\n{}", bar)).await;
            self.console.print("EXECUTION PLAN").await;
            self.console.print(&bar).await;
            self.console.print(&plan.to_markdown(prompt)).await;
            self.console.print(&bar).await;

            let answer = self
                .console
                .prompt("\nApprove this execution plan? (y/n): ")
                .await
                .ok_or(EngineError::ConsoleClosed)?;

            match Decision::parse(&answer) {
                Some(Decision::Yes) => return Ok(plan),
                Some(Decision::No) => {
                    let feedback = self
                        .console
                        .prompt("What's wrong with the plan? ")
                        .await
                        .ok_or(EngineError::ConsoleClosed)?;

                    if feedback.is_empty() {
                        return Err(EngineError::PlanRejected);
                    }

                    self.console
                        .print(&format!("Regenerating plan based on feedback: {}", feedback))
                        .await;

                    match self.planner.regenerate(prompt, &feedback).await {
                        Ok(new_plan) => plan = new_plan,
                        Err(e) => {
                            self.console
                                .print(&format!("Error regenerating plan: {}", e))
                                .await;
                        }
                    }
                }
                None => {
                    self.console
                        .print("Please answer 'y' for yes or 'n' for no.")
                        .await;
                }
            }
        }
    }

    /// Walks the approved plan in order. Every resolved step appends to the
    /// context exactly once; the first failure stops the walk and later
    /// steps are never attempted.
    pub async fn execute_plan(&self, plan: &Plan) -> Result<ExecutionContext, EngineError> {
        let bar = "=".repeat(60);
        self.console.print(&format!("\n{}", bar)).await;
        self.console.print("EXECUTING PLAN").await;
        self.console.print(&bar).await;

        let mut context = ExecutionContext::new();
        let total = plan.steps.len();

        for (i, step) in plan.steps.iter().enumerate() {
            let step_num = i + 1;
            self.console
                .print(&format!(
                    "\n--- Step {}/{}: {} ---",
                    step_num,
                    total,
                    step.kind.label().to_uppercase()
                ))
                .await;
            self.console
                .print(&format!("Task: {}", step.instruction))
                .await;

            let handler = match self.registry.get(step.kind) {
                Some(handler) => handler,
                None => {
                    let err = EngineError::NoHandler(step.kind);
                    self.console
                        .print(&format!("❌ Step {} failed: {}", step_num, err))
                        .await;
                    break;
                }
            };

            let outcome = match handler.handle(step, context.rendered()).await {
                Ok(outcome) => outcome,
                Err(EngineError::ConsoleClosed) => return Err(EngineError::ConsoleClosed),
                Err(e) => {
                    self.console
                        .print(&format!("❌ Step {} failed with error: {}", step_num, e))
                        .await;
                    break;
                }
            };

            let success = outcome.success;
            context.record(outcome);

            if success {
                self.console
                    .print(&format!("✅ Step {} completed successfully", step_num))
                    .await;
            } else {
                self.console
                    .print(&format!("❌ Step {} failed", step_num))
                    .await;
                break;
            }
        }

        Ok(context)
    }

    /// Best-effort: a summarization failure never fails the run.
    pub async fn summarize(
        &self,
        prompt: &str,
        plan: &Plan,
        context: &ExecutionContext,
    ) -> RunReport {
        let total = plan.steps.len();
        let successful = context.outcomes().iter().filter(|o| o.success).count();

        let user = format!(
            "Original request: {}\n\nWorkflow context:\n{}\n\nPlease summarize what \
             the agent accomplished, highlighting information collected and actions taken.",
            prompt,
            context.rendered()
        );
        let request = ModelRequest::new(SUMMARY_SYSTEM, user);

        let summary = match self.service.complete(&request).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Summary generation failed: {}", e);
                format!(
                    "completed {}/{} steps for task: {}",
                    successful, total, prompt
                )
            }
        };

        let bar = "=".repeat(60);
        self.console.print(&format!("\n{}", bar)).await;
        self.console.print("FINAL SUMMARY").await;
        self.console.print(&bar).await;
        self.console
            .print(&format!("**Original Request:** {}\n", prompt))
            .await;
        self.console
            .print(&format!("Steps Completed: {}/{}", successful, total))
            .await;
        self.console.print(&summary).await;
        self.console.print(&bar).await;

        RunReport {
            success: successful == total,
            successful_steps: successful,
            total_steps: total,
            summary,
        }
    }
}
