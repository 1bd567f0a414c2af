use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Normalized result of running one script attempt.
///
/// Script failures are data, not errors: a nonzero exit, a timeout, or a
/// program that would not start all land here with `success == false`, so
/// callers can feed the outcome back into the retry loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub success: bool,
    pub output: String,
    pub exit_code: i32,
}

impl ExecutionOutcome {
    pub fn failure(output: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
            exit_code: -1,
        }
    }
}

#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(&self, action: &str) -> ExecutionOutcome;
}

/// Runs generated scripts through an interpreter that takes inline source,
/// typically `osascript -e`.
pub struct ScriptRunner {
    program: String,
    inline_flag: String,
    timeout: Duration,
}

impl ScriptRunner {
    pub fn new(
        program: impl Into<String>,
        inline_flag: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            program: program.into(),
            inline_flag: inline_flag.into(),
            timeout,
        }
    }
}

#[async_trait]
impl CommandExecutor for ScriptRunner {
    async fn execute(&self, action: &str) -> ExecutionOutcome {
        tracing::info!("Executing script via {} ({} bytes)", self.program, action.len());

        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.arg(&self.inline_flag).arg(action).kill_on_drop(true);

        match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => {
                let mut combined = String::from_utf8_lossy(&output.stdout).to_string();
                combined.push_str(&String::from_utf8_lossy(&output.stderr));
                ExecutionOutcome {
                    success: output.status.success(),
                    output: combined,
                    exit_code: output.status.code().unwrap_or(-1),
                }
            }
            Ok(Err(e)) => {
                ExecutionOutcome::failure(format!("failed to start {}: {}", self.program, e))
            }
            Err(_) => {
                tracing::warn!("Script timed out after {:?}", self.timeout);
                ExecutionOutcome::failure("script execution timed out")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell_runner(timeout: Duration) -> ScriptRunner {
        ScriptRunner::new("sh", "-c", timeout)
    }

    #[tokio::test]
    async fn test_successful_script_captures_output() {
        let runner = shell_runner(Duration::from_secs(5));
        let outcome = runner.execute("echo hello").await;
        assert!(outcome.success);
        assert_eq!(outcome.exit_code, 0);
        assert!(outcome.output.contains("hello"));
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_a_failure_outcome() {
        let runner = shell_runner(Duration::from_secs(5));
        let outcome = runner.execute("exit 3").await;
        assert!(!outcome.success);
        assert_eq!(outcome.exit_code, 3);
    }

    #[tokio::test]
    async fn test_stderr_is_captured_alongside_stdout() {
        let runner = shell_runner(Duration::from_secs(5));
        let outcome = runner.execute("echo first; echo oops >&2; exit 1").await;
        assert!(!outcome.success);
        assert!(outcome.output.contains("first"));
        assert!(outcome.output.contains("oops"));
    }

    #[tokio::test]
    async fn test_timeout_is_normalized() {
        let runner = shell_runner(Duration::from_millis(100));
        let outcome = runner.execute("sleep 5").await;
        assert!(!outcome.success);
        assert_eq!(outcome.output, "script execution timed out");
        assert_eq!(outcome.exit_code, -1);
    }

    #[tokio::test]
    async fn test_missing_interpreter_is_a_failure_outcome() {
        let runner = ScriptRunner::new("deskpilot-no-such-binary", "-e", Duration::from_secs(1));
        let outcome = runner.execute("return 0").await;
        assert!(!outcome.success);
        assert_eq!(outcome.exit_code, -1);
        assert!(outcome.output.contains("failed to start"));
    }
}
