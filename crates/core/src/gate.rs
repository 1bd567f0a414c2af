use std::sync::Arc;

use deskpilot_interfaces::{Console, Decision};

use crate::error::EngineError;
use crate::generator::Generator;
use crate::types::Step;

/// How an approval round ended. A rejection carries the proposal that was
/// on the table so the caller can log it against the attempt.
#[derive(Debug, Clone)]
pub enum GateDecision {
    Approved {
        proposal: String,
    },
    Rejected {
        proposal: String,
        feedback: Option<String>,
    },
}

#[derive(Debug, Clone)]
pub enum OutcomeConfirmation {
    Confirmed,
    Denied { feedback: Option<String> },
}

/// Human approval checkpoint. Nothing externally visible runs without a
/// recognized yes from here.
pub struct ApprovalGate {
    console: Arc<dyn Console>,
}

impl ApprovalGate {
    pub fn new(console: Arc<dyn Console>) -> Self {
        Self { console }
    }

    /// Presents a proposal and loops until the user gives a recognized
    /// answer. Rejection with feedback asks the generator for a revision
    /// and re-presents the new proposal; that inner loop is unbounded by
    /// design, the human stays in control of content. Silent rejection
    /// abandons the attempt immediately.
    pub async fn review_action(
        &self,
        generator: &dyn Generator,
        step: &Step,
        proposal: String,
    ) -> Result<GateDecision, EngineError> {
        let mut current = proposal;

        loop {
            let bar = "=".repeat(50);
            self.console.print(&format!("\n{}", bar)).await;
            self.console
                .print(&format!("PROPOSED SCRIPT FOR: {}", step.instruction))
                .await;
            self.console.print(&bar).await;
            self.console.print(&current).await;
            self.console.print(&bar).await;

            let answer = self
                .console
                .prompt("\nApprove this script? (y/n): ")
                .await
                .ok_or(EngineError::ConsoleClosed)?;

            match Decision::parse(&answer) {
                Some(Decision::Yes) => {
                    return Ok(GateDecision::Approved { proposal: current });
                }
                Some(Decision::No) => {
                    let feedback = self
                        .console
                        .prompt("What's wrong with this script? ")
                        .await
                        .ok_or(EngineError::ConsoleClosed)?;

                    if feedback.is_empty() {
                        return Ok(GateDecision::Rejected {
                            proposal: current,
                            feedback: None,
                        });
                    }

                    self.console
                        .print(&format!("Regenerating script based on feedback: {}", feedback))
                        .await;

                    match generator.revise(step, &current, &feedback).await {
                        Ok(revised) => current = revised,
                        Err(e) => {
                            self.console
                                .print(&format!("Error regenerating script: {}", e))
                                .await;
                            return Ok(GateDecision::Rejected {
                                proposal: current,
                                feedback: Some(feedback),
                            });
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

    /// Post-verification human confirmation, used only by the policy that
    /// asks for it.
    pub async fn confirm_outcome(&self, goal: &str) -> Result<OutcomeConfirmation, EngineError> {
        loop {
            let answer = self
                .console
                .prompt(&format!("\nWas this step accomplished: '{}'? (y/n): ", goal))
                .await
                .ok_or(EngineError::ConsoleClosed)?;

            match Decision::parse(&answer) {
                Some(Decision::Yes) => return Ok(OutcomeConfirmation::Confirmed),
                Some(Decision::No) => {
                    let feedback = self
                        .console
                        .prompt("What went wrong? ")
                        .await
                        .ok_or(EngineError::ConsoleClosed)?;
                    let feedback = if feedback.is_empty() {
                        None
                    } else {
                        Some(feedback)
                    };
                    return Ok(OutcomeConfirmation::Denied { feedback });
                }
                None => {
                    self.console
                        .print("Please answer 'y' for yes or 'n' for no.")
                        .await;
                }
            }
        }
    }
}
