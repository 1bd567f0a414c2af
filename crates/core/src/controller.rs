use std::sync::Arc;

use deskpilot_executor::{CommandExecutor, ExecutionOutcome};
use deskpilot_interfaces::Console;
use tokio::sync::Mutex;

use crate::context::ExecutionHistory;
use crate::error::EngineError;
use crate::gate::{ApprovalGate, GateDecision, OutcomeConfirmation};
use crate::generator::Generator;
use crate::types::{Step, StepOutcome, StepPayload, Verification};

/// How many attempts a step gets and whether the human is asked to confirm
/// after a positive verification. The single-task path and the orchestrated
/// path deliberately carry different values.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub confirm_with_user: bool,
}

impl RetryPolicy {
    pub fn single_task() -> Self {
        Self {
            max_attempts: 3,
            confirm_with_user: false,
        }
    }

    pub fn orchestrated() -> Self {
        Self {
            max_attempts: 5,
            confirm_with_user: true,
        }
    }
}

/// One try at satisfying a step. Every record is rendered into later
/// regeneration requests, so the model sees all prior proposals, not just
/// the last.
#[derive(Debug, Clone)]
pub struct AttemptRecord {
    pub proposal: String,
    pub approved: bool,
    pub user_feedback: Option<String>,
    pub execution: Option<ExecutionOutcome>,
    pub verdict: Option<Verification>,
}

/// Drives one step through generate, approve, execute, verify, and
/// optionally human-confirm, retrying up to the policy cap.
///
/// Attempt-cap exhaustion is a normal return value, never an error: the
/// caller gets a failed `StepOutcome` to inspect.
pub struct StepController {
    generator: Arc<dyn Generator>,
    gate: ApprovalGate,
    executor: Arc<dyn CommandExecutor>,
    verifier: crate::verifier::Verifier,
    console: Arc<dyn Console>,
    history: Arc<Mutex<ExecutionHistory>>,
    policy: RetryPolicy,
}

impl StepController {
    pub fn new(
        generator: Arc<dyn Generator>,
        gate: ApprovalGate,
        executor: Arc<dyn CommandExecutor>,
        verifier: crate::verifier::Verifier,
        console: Arc<dyn Console>,
        history: Arc<Mutex<ExecutionHistory>>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            generator,
            gate,
            executor,
            verifier,
            console,
            history,
            policy,
        }
    }

    pub async fn run_step(
        &self,
        step: &Step,
        context: &str,
    ) -> Result<StepOutcome, EngineError> {
        let mut attempts: Vec<AttemptRecord> = Vec::new();

        for attempt in 1..=self.policy.max_attempts {
            self.console
                .print(&format!(
                    "\n--- Attempt {}/{} ---",
                    attempt, self.policy.max_attempts
                ))
                .await;

            // A generation failure consumes the attempt.
            let proposal = match self.generator.generate(step, context, &attempts).await {
                Ok(p) => p,
                Err(e) => {
                    self.console
                        .print(&format!("❌ Failed to generate script: {}", e))
                        .await;
                    continue;
                }
            };

            let approved = match self
                .gate
                .review_action(self.generator.as_ref(), step, proposal)
                .await?
            {
                GateDecision::Approved { proposal } => proposal,
                GateDecision::Rejected { proposal, feedback } => {
                    self.console.print("❌ User rejected script").await;
                    attempts.push(AttemptRecord {
                        proposal,
                        approved: false,
                        user_feedback: feedback,
                        execution: None,
                        verdict: None,
                    });
                    continue;
                }
            };

            let outcome = self.executor.execute(&approved).await;
            self.history
                .lock()
                .await
                .record_script(approved.clone(), outcome.clone());

            self.console
                .print(&format!("Script executed with exit code: {}", outcome.exit_code))
                .await;
            if !outcome.output.is_empty() {
                self.console
                    .print(&format!("Output: {}", outcome.output))
                    .await;
            }

            // Verification always runs, even for failed executions.
            let verdict = self.verifier.verify(&step.instruction, &approved, &outcome).await;

            if !verdict.accomplished {
                self.console
                    .print(&format!("  ❌ Task not accomplished: {}", verdict.rationale))
                    .await;
                attempts.push(AttemptRecord {
                    proposal: approved,
                    approved: true,
                    user_feedback: None,
                    execution: Some(outcome),
                    verdict: Some(verdict),
                });
                continue;
            }

            if self.policy.confirm_with_user {
                match self.gate.confirm_outcome(&step.instruction).await? {
                    OutcomeConfirmation::Confirmed => {
                        return Ok(Self::success_outcome(step, approved, outcome, verdict));
                    }
                    OutcomeConfirmation::Denied { feedback } => {
                        if let Some(f) = &feedback {
                            self.console.print(&format!("User feedback: {}", f)).await;
                        }
                        attempts.push(AttemptRecord {
                            proposal: approved,
                            approved: true,
                            user_feedback: feedback,
                            execution: Some(outcome),
                            verdict: Some(verdict),
                        });
                        continue;
                    }
                }
            }

            self.console
                .print(&format!("  ✅ {}", verdict.rationale))
                .await;
            return Ok(Self::success_outcome(step, approved, outcome, verdict));
        }

        self.console
            .print(&format!(
                "❌ Step failed after {} attempts",
                self.policy.max_attempts
            ))
            .await;

        Ok(StepOutcome {
            success: false,
            payload: StepPayload::Failed {
                instruction: step.instruction.clone(),
                reason: format!("failed after {} attempts", self.policy.max_attempts),
            },
        })
    }

    fn success_outcome(
        step: &Step,
        script: String,
        outcome: ExecutionOutcome,
        verdict: Verification,
    ) -> StepOutcome {
        StepOutcome {
            success: true,
            payload: StepPayload::Script {
                instruction: step.instruction.clone(),
                script,
                output: outcome.output,
                summary: verdict.rationale,
            },
        }
    }
}
