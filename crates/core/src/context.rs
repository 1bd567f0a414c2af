use chrono::{DateTime, Utc};
use deskpilot_executor::ExecutionOutcome;

use crate::types::StepOutcome;

/// Accumulated knowledge threaded between plan steps.
///
/// Append-only: the orchestrator records each resolved step exactly once,
/// nothing is ever rewritten or pruned. Growth is unbounded across a long
/// plan; accepted for simplicity.
#[derive(Debug, Default)]
pub struct ExecutionContext {
    outcomes: Vec<StepOutcome>,
    rendered: String,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: StepOutcome) {
        self.rendered.push_str("\n\n");
        self.rendered.push_str(&outcome.markdown());
        self.outcomes.push(outcome);
    }

    pub fn rendered(&self) -> &str {
        &self.rendered
    }

    pub fn outcomes(&self) -> &[StepOutcome] {
        &self.outcomes
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

/// Append-only log of every executor invocation in a run, kept verbatim
/// for end-of-run summarization. Never replayed.
#[derive(Debug, Clone)]
pub enum HistoryEntry {
    Script {
        script: String,
        outcome: ExecutionOutcome,
        timestamp: DateTime<Utc>,
    },
    Browser {
        url: String,
        task: String,
        completed: bool,
        message: String,
        timestamp: DateTime<Utc>,
    },
}

impl HistoryEntry {
    fn render(&self, step_num: usize) -> String {
        match self {
            HistoryEntry::Script {
                script,
                outcome,
                timestamp,
            } => format!(
                "Step {} (Script): {}\nResult: success={}, output={}, exit_code={}\nTimestamp: {}",
                step_num,
                script,
                outcome.success,
                outcome.output,
                outcome.exit_code,
                timestamp.to_rfc3339()
            ),
            HistoryEntry::Browser {
                url,
                task,
                completed,
                message,
                timestamp,
            } => format!(
                "Step {} (Browser): URL={}, Task={}\nResult: completed={}, message={}\nTimestamp: {}",
                step_num,
                url,
                task,
                completed,
                message,
                timestamp.to_rfc3339()
            ),
        }
    }
}

#[derive(Debug, Default)]
pub struct ExecutionHistory {
    entries: Vec<HistoryEntry>,
}

impl ExecutionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_script(&mut self, script: impl Into<String>, outcome: ExecutionOutcome) {
        self.entries.push(HistoryEntry::Script {
            script: script.into(),
            outcome,
            timestamp: Utc::now(),
        });
    }

    pub fn record_browser(
        &mut self,
        url: impl Into<String>,
        task: impl Into<String>,
        completed: bool,
        message: impl Into<String>,
    ) {
        self.entries.push(HistoryEntry::Browser {
            url: url.into(),
            task: task.into(),
            completed,
            message: message.into(),
            timestamp: Utc::now(),
        });
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn render(&self) -> String {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, entry)| entry.render(i + 1))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
