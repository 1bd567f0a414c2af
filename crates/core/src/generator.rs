use std::sync::Arc;

use async_trait::async_trait;
use deskpilot_providers::{ModelRequest, ModelService, ServiceError};

use crate::controller::AttemptRecord;
use crate::types::{Step, TaskKind};

const SCRIPT_SYSTEM: &str = "Generate AppleScript code to accomplish the given task. \
Consider all previous attempts and feedback. Return only the AppleScript code, \
no explanations or markdown formatting. The script must be compatible with macOS.";

const TERMINAL_SUPPLEMENT: &str = " If the task involves shell commands, have the script \
open and activate the Terminal and run the commands in the same script.";

/// Produces candidate actions for a step. `generate` starts a fresh attempt
/// conditioned on every prior attempt; `revise` reworks one proposal from
/// approval-gate feedback.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(
        &self,
        step: &Step,
        context: &str,
        attempts: &[AttemptRecord],
    ) -> Result<String, ServiceError>;

    async fn revise(
        &self,
        step: &Step,
        proposal: &str,
        feedback: &str,
    ) -> Result<String, ServiceError>;
}

pub struct ScriptGenerator {
    service: Arc<dyn ModelService>,
}

impl ScriptGenerator {
    pub fn new(service: Arc<dyn ModelService>) -> Self {
        Self { service }
    }

    fn system_prompt(kind: TaskKind) -> String {
        match kind {
            TaskKind::Terminal => format!("{}{}", SCRIPT_SYSTEM, TERMINAL_SUPPLEMENT),
            _ => SCRIPT_SYSTEM.to_string(),
        }
    }
}

#[async_trait]
impl Generator for ScriptGenerator {
    async fn generate(
        &self,
        step: &Step,
        context: &str,
        attempts: &[AttemptRecord],
    ) -> Result<String, ServiceError> {
        let mut user = format!(
            "Task prompt: {}\nExternal context: {}",
            step.instruction, context
        );
        if !attempts.is_empty() {
            user.push_str(&render_attempts(attempts));
        }

        let request = ModelRequest::new(Self::system_prompt(step.kind), user);
        let raw = self.service.complete(&request).await?;
        Ok(strip_code_fence(&raw))
    }

    async fn revise(
        &self,
        step: &Step,
        proposal: &str,
        feedback: &str,
    ) -> Result<String, ServiceError> {
        let user = format!(
            "Generate a script to accomplish: {}\n\nThe previous script was:\n{}\n\n\
             User feedback: {}\n\nPlease generate an improved script that addresses \
             this feedback. Return only the script code, no explanations and no markdown.",
            step.instruction, proposal, feedback
        );

        let request = ModelRequest::new(Self::system_prompt(step.kind), user);
        let raw = self.service.complete(&request).await?;
        Ok(strip_code_fence(&raw))
    }
}

/// Renders prior attempts into the regeneration request so the model sees
/// every earlier proposal, what the user said, and how execution went.
fn render_attempts(attempts: &[AttemptRecord]) -> String {
    let mut out = String::from("\n\nPrevious attempts that failed:");
    for (i, attempt) in attempts.iter().enumerate() {
        out.push_str(&format!("\n\nAttempt {}:", i + 1));
        if !attempt.proposal.is_empty() {
            out.push_str(&format!("\nScript: {}", attempt.proposal));
        }
        out.push_str(&format!("\nApproved by user: {}", attempt.approved));
        if let Some(feedback) = &attempt.user_feedback {
            out.push_str(&format!("\nUser feedback: {}", feedback));
        }
        if let Some(execution) = &attempt.execution {
            out.push_str(&format!("\nOutput: {}", execution.output));
            out.push_str(&format!("\nSuccess: {}", execution.success));
        }
        if let Some(verdict) = &attempt.verdict {
            out.push_str(&format!("\nAssessment: {}", verdict.rationale));
        }
    }
    out
}

/// Models sometimes wrap code in a fenced block despite instructions.
fn strip_code_fence(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.starts_with("```") {
        let lines: Vec<&str> = trimmed.lines().collect();
        if lines.len() > 2 {
            return lines[1..lines.len() - 1].join("\n");
        }
    }
    trimmed.to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use deskpilot_executor::ExecutionOutcome;
    use crate::types::Verification;

    #[test]
    fn test_strip_code_fence_removes_markers() {
        let fenced = "```applescript\ndisplay dialog \"hi\"\n```";
        assert_eq!(strip_code_fence(fenced), "display dialog \"hi\"");
    }

    #[test]
    fn test_strip_code_fence_keeps_plain_text() {
        assert_eq!(strip_code_fence("  tell app \"Finder\"  "), "tell app \"Finder\"");
    }

    #[test]
    fn test_render_attempts_includes_feedback_and_output() {
        let attempts = vec![AttemptRecord {
            proposal: "bad script".to_string(),
            approved: true,
            user_feedback: Some("wrong app".to_string()),
            execution: Some(ExecutionOutcome {
                success: false,
                output: "error -1728".to_string(),
                exit_code: 1,
            }),
            verdict: Some(Verification {
                accomplished: false,
                rationale: "nothing happened".to_string(),
            }),
        }];

        let rendered = render_attempts(&attempts);
        assert!(rendered.contains("Attempt 1:"));
        assert!(rendered.contains("bad script"));
        assert!(rendered.contains("wrong app"));
        assert!(rendered.contains("error -1728"));
        assert!(rendered.contains("nothing happened"));
    }

    #[test]
    fn test_terminal_steps_get_terminal_guidance() {
        let terminal = ScriptGenerator::system_prompt(TaskKind::Terminal);
        let desktop = ScriptGenerator::system_prompt(TaskKind::DesktopScript);
        assert!(terminal.contains("Terminal"));
        assert!(!desktop.contains("activate the Terminal"));
    }
}
