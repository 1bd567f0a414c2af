use serde::{Deserialize, Serialize};
use std::fmt;

/// Which execution strategy a step is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Browser,
    DesktopScript,
    Terminal,
    WebSearch,
    GenericAutomation,
}

impl TaskKind {
    pub fn label(&self) -> &'static str {
        match self {
            TaskKind::Browser => "browser",
            TaskKind::DesktopScript => "desktop_script",
            TaskKind::Terminal => "terminal",
            TaskKind::WebSearch => "web_search",
            TaskKind::GenericAutomation => "generic_automation",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub instruction: String,
    pub kind: TaskKind,
}

/// Ordered steps for one user prompt. Frozen once the user approves it;
/// executed strictly in array order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub steps: Vec<Step>,
}

impl Plan {
    pub fn to_markdown(&self, original_prompt: &str) -> String {
        let mut out = String::new();
        out.push_str(&format!("**Original Prompt:** {}\n\n", original_prompt));
        out.push_str(&format!("**Total Steps:** {}\n", self.steps.len()));
        for (i, step) in self.steps.iter().enumerate() {
            out.push_str(&format!(
                "\n### Step {}: {}\n",
                i + 1,
                step.kind.label().to_uppercase()
            ));
            out.push_str(&format!("**Task:** {}\n", step.instruction));
        }
        out
    }
}

/// Single-task mode classification: one strategy, a flat list of
/// natural-language steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskClassification {
    pub kind: TaskKind,
    pub steps: Vec<String>,
}

/// URL plus on-page task extracted from a browser step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepExtraction {
    pub url: String,
    pub task: String,
}

/// Model judgment of whether an executed action accomplished its goal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verification {
    pub accomplished: bool,
    pub rationale: String,
}

/// Structured end-of-run summary for the single-task path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub summary: String,
    pub completed_successfully: bool,
    pub total_steps: usize,
    pub successful_steps: usize,
}

/// Terminal result of one step, tagged by the strategy that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepOutcome {
    pub success: bool,
    pub payload: StepPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepPayload {
    Script {
        instruction: String,
        script: String,
        output: String,
        summary: String,
    },
    Browser {
        url: String,
        task: String,
        message: String,
    },
    Search {
        query: String,
        findings: String,
    },
    Failed {
        instruction: String,
        reason: String,
    },
}

impl StepOutcome {
    /// Human-readable form appended to the running context and fed to
    /// summarization.
    pub fn markdown(&self) -> String {
        match &self.payload {
            StepPayload::Script {
                instruction,
                script,
                output,
                summary,
            } => format!(
                "Prompt: {}. The following script was run: {} and produced the following output: {}. \
                 The step was deemed accomplished. The task results were summarized as: {}",
                instruction, script, output, summary
            ),
            StepPayload::Browser { url, task, message } => format!(
                "The agent navigated to {} and performed: {}. The browser agent reported: {}",
                url, task, message
            ),
            StepPayload::Search { query, findings } => format!(
                "The agent searched for the answer to \"{}\". It found the following information: \"{}\".",
                query, findings
            ),
            StepPayload::Failed {
                instruction,
                reason,
            } => format!("Prompt: {}. The step failed: {}", instruction, reason),
        }
    }
}

/// What a full run reports back to the caller.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub success: bool,
    pub successful_steps: usize,
    pub total_steps: usize,
    pub summary: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_task_kind_serde_tokens() {
        let json = serde_json::to_string(&TaskKind::DesktopScript).unwrap();
        assert_eq!(json, "\"desktop_script\"");
        let kind: TaskKind = serde_json::from_str("\"web_search\"").unwrap();
        assert_eq!(kind, TaskKind::WebSearch);
    }

    #[test]
    fn test_plan_parses_from_model_json() {
        let raw = r#"{"steps":[{"instruction":"look it up","kind":"web_search"},{"instruction":"open the notes app","kind":"desktop_script"}]}"#;
        let plan: Plan = serde_json::from_str(raw).unwrap();
        assert_eq!(plan.steps.len(), 2);
        assert_eq!(plan.steps[1].kind, TaskKind::DesktopScript);
    }

    #[test]
    fn test_plan_markdown_lists_every_step() {
        let plan = Plan {
            steps: vec![
                Step {
                    instruction: "find the weather".to_string(),
                    kind: TaskKind::WebSearch,
                },
                Step {
                    instruction: "write it into a note".to_string(),
                    kind: TaskKind::DesktopScript,
                },
            ],
        };
        let markdown = plan.to_markdown("weather note");
        assert!(markdown.contains("**Total Steps:** 2"));
        assert!(markdown.contains("### Step 1: WEB_SEARCH"));
        assert!(markdown.contains("### Step 2: DESKTOP_SCRIPT"));
        assert!(markdown.contains("write it into a note"));
    }

    #[test]
    fn test_search_outcome_markdown_quotes_query_and_findings() {
        let outcome = StepOutcome {
            success: true,
            payload: StepPayload::Search {
                query: "capital of France".to_string(),
                findings: "Paris".to_string(),
            },
        };
        let markdown = outcome.markdown();
        assert!(markdown.contains("searched for the answer to \"capital of France\""));
        assert!(markdown.contains("\"Paris\""));
    }

    #[test]
    fn test_failed_outcome_markdown_names_reason() {
        let outcome = StepOutcome {
            success: false,
            payload: StepPayload::Failed {
                instruction: "open the app".to_string(),
                reason: "failed after 5 attempts".to_string(),
            },
        };
        assert!(outcome.markdown().contains("failed after 5 attempts"));
    }
}
