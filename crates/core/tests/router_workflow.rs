//! Single-task routing tests: classification, the desktop script walk, the
//! browser walk with a stubbed driver, and the legacy summary.

#![allow(clippy::panic, clippy::unwrap_used, clippy::expect_used)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use deskpilot_core::{
    ApprovalGate, Classifier, ExecutionHistory, RetryPolicy, ScriptGenerator, StepController,
    TaskRouter, Verifier,
};
use deskpilot_executor::{
    BrowserDriver, BrowserError, BrowserRun, CommandExecutor, ExecutionOutcome,
};
use deskpilot_interfaces::Console;
use deskpilot_providers::{ModelRequest, ModelService, ServiceError};
use tokio::sync::Mutex;

// Mock implementations

struct ScriptedConsole {
    inputs: StdMutex<VecDeque<String>>,
}

impl ScriptedConsole {
    fn new(inputs: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            inputs: StdMutex::new(inputs.iter().map(|s| s.to_string()).collect()),
        })
    }
}

#[async_trait]
impl Console for ScriptedConsole {
    async fn read_line(&self) -> Option<String> {
        self.inputs.lock().unwrap().pop_front()
    }

    async fn print(&self, _line: &str) {}
}

struct OrderedService {
    responses: StdMutex<VecDeque<Result<String, ServiceError>>>,
}

impl OrderedService {
    fn new(responses: Vec<Result<String, ServiceError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: StdMutex::new(responses.into_iter().collect()),
        })
    }

    fn remaining(&self) -> usize {
        self.responses.lock().unwrap().len()
    }
}

#[async_trait]
impl ModelService for OrderedService {
    async fn complete(&self, _request: &ModelRequest) -> Result<String, ServiceError> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ServiceError::Api("no canned response left".to_string())))
    }

    fn name(&self) -> &str {
        "ordered"
    }
}

struct OkExecutor;

#[async_trait]
impl CommandExecutor for OkExecutor {
    async fn execute(&self, _action: &str) -> ExecutionOutcome {
        ExecutionOutcome {
            success: true,
            output: "done".to_string(),
            exit_code: 0,
        }
    }
}

struct RecordingDriver {
    calls: StdMutex<Vec<(String, String, String)>>,
    fail: bool,
}

impl RecordingDriver {
    fn new(fail: bool) -> Arc<Self> {
        Arc::new(Self {
            calls: StdMutex::new(Vec::new()),
            fail,
        })
    }
}

#[async_trait]
impl BrowserDriver for RecordingDriver {
    async fn run(&self, url: &str, task: &str, context: &str) -> Result<BrowserRun, BrowserError> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), task.to_string(), context.to_string()));

        if self.fail {
            return Err(BrowserError::Agent("sidecar unreachable".to_string()));
        }
        Ok(BrowserRun {
            completed: true,
            message: "done".to_string(),
        })
    }
}

struct Fixture {
    router: TaskRouter,
    service: Arc<OrderedService>,
    driver: Arc<RecordingDriver>,
    history: Arc<Mutex<ExecutionHistory>>,
}

fn fixture(
    responses: Vec<Result<String, ServiceError>>,
    console_inputs: &[&str],
    driver_fails: bool,
) -> Fixture {
    let service = OrderedService::new(responses);
    let console = ScriptedConsole::new(console_inputs);
    let history = Arc::new(Mutex::new(ExecutionHistory::new()));
    let driver = RecordingDriver::new(driver_fails);

    let controller = StepController::new(
        Arc::new(ScriptGenerator::new(service.clone())),
        ApprovalGate::new(console.clone()),
        Arc::new(OkExecutor),
        Verifier::new(service.clone()),
        console.clone(),
        history.clone(),
        RetryPolicy::single_task(),
    );

    let router = TaskRouter::new(
        Classifier::new(service.clone()),
        controller,
        driver.clone(),
        service.clone(),
        console,
        history.clone(),
        None,
    );

    Fixture {
        router,
        service,
        driver,
        history,
    }
}

fn summary_json(summary: &str, ok: bool, total: usize, successful: usize) -> String {
    format!(
        r#"{{"summary":"{}","completed_successfully":{},"total_steps":{},"successful_steps":{}}}"#,
        summary, ok, total, successful
    )
}

#[tokio::test]
async fn test_desktop_walk_runs_every_step() {
    let classify =
        r#"{"kind":"desktop_script","steps":["open Notes and write hello","open Finder"]}"#;
    let verdict = r#"{"accomplished": true, "rationale": "worked"}"#;
    let fx = fixture(
        vec![
            Ok(classify.to_string()),
            Ok("tell application \"Notes\" to activate".to_string()),
            Ok(verdict.to_string()),
            Ok("tell application \"Finder\" to activate".to_string()),
            Ok(verdict.to_string()),
            Ok(summary_json("Both steps ran.", true, 2, 2)),
        ],
        &["y", "y"],
        false,
    );

    let report = fx.router.run("write hello then open finder").await.unwrap();

    assert!(report.success);
    assert_eq!(report.successful_steps, 2);
    assert_eq!(report.total_steps, 2);
    assert_eq!(report.summary, "Both steps ran.");
    assert_eq!(fx.history.lock().await.len(), 2);
    assert_eq!(fx.service.remaining(), 0);
}

#[tokio::test]
async fn test_desktop_step_failure_stops_the_walk() {
    let classify = r#"{"kind":"desktop_script","steps":["open the vault","celebrate"]}"#;
    let bad_verdict = r#"{"accomplished": false, "rationale": "vault stayed closed"}"#;
    let script = Ok("tell application \"Vault\" to activate".to_string());
    let fx = fixture(
        vec![
            Ok(classify.to_string()),
            script.clone(),
            Ok(bad_verdict.to_string()),
            script.clone(),
            Ok(bad_verdict.to_string()),
            script,
            Ok(bad_verdict.to_string()),
            Err(ServiceError::Api("500".to_string())),
        ],
        &["y", "y", "y"],
        false,
    );

    let report = fx.router.run("open the vault then celebrate").await.unwrap();

    assert!(!report.success);
    assert_eq!(report.successful_steps, 0);
    assert_eq!(report.total_steps, 2);
    assert_eq!(
        report.summary,
        "completed 0/2 steps for task: open the vault then celebrate"
    );
    // Three executions were attempted and logged before giving up.
    assert_eq!(fx.history.lock().await.len(), 3);
}

#[tokio::test]
async fn test_browser_walk_feeds_context_forward() {
    let classify = r#"{"kind":"browser","steps":["check tomorrow's weather","read the headlines"]}"#;
    let extract_weather = r#"{"url":"https://weather.example","task":"check tomorrow's forecast"}"#;
    let extract_news = r#"{"url":"https://news.example","task":"read the top headlines"}"#;
    let fx = fixture(
        vec![
            Ok(classify.to_string()),
            Ok(extract_weather.to_string()),
            Ok(extract_news.to_string()),
            Ok(summary_json("Browsed both sites.", true, 2, 2)),
        ],
        &["y", "y"],
        false,
    );

    let report = fx.router.run("weather then news").await.unwrap();

    assert!(report.success);
    assert_eq!(report.successful_steps, 2);

    let calls = fx.driver.calls.lock().unwrap();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].0, "https://weather.example");
    // The second step sees the first step's result in its context.
    assert!(calls[1].2.contains("Step 1 completed: done"));
    drop(calls);

    assert_eq!(fx.history.lock().await.len(), 2);
    assert_eq!(fx.service.remaining(), 0);
}

#[tokio::test]
async fn test_browser_driver_failure_is_logged_and_halts() {
    let classify = r#"{"kind":"browser","steps":["check the weather","read the headlines"]}"#;
    let extract = r#"{"url":"https://weather.example","task":"check the forecast"}"#;
    let fx = fixture(
        vec![
            Ok(classify.to_string()),
            Ok(extract.to_string()),
            Ok(summary_json("The sidecar was down.", false, 2, 0)),
        ],
        &["y"],
        true,
    );

    let report = fx.router.run("weather then news").await.unwrap();

    assert!(!report.success);
    assert_eq!(report.successful_steps, 0);
    assert_eq!(fx.driver.calls.lock().unwrap().len(), 1);
    // The failed dispatch still lands in the history.
    assert_eq!(fx.history.lock().await.len(), 1);
}

#[tokio::test]
async fn test_rejected_extraction_stops_without_dispatch() {
    let classify = r#"{"kind":"browser","steps":["check the weather"]}"#;
    let extract = r#"{"url":"https://weather.example","task":"check the forecast"}"#;
    let fx = fixture(
        vec![
            Ok(classify.to_string()),
            Ok(extract.to_string()),
            Err(ServiceError::Api("500".to_string())),
        ],
        &["n", ""],
        false,
    );

    let report = fx.router.run("check the weather").await.unwrap();

    assert!(!report.success);
    assert!(fx.driver.calls.lock().unwrap().is_empty());
    assert_eq!(
        report.summary,
        "completed 0/1 steps for task: check the weather"
    );
}

#[tokio::test]
async fn test_generic_automation_is_a_placeholder() {
    let classify = r#"{"kind":"generic_automation","steps":["step a","step b","step c"]}"#;
    let fx = fixture(
        vec![
            Ok(classify.to_string()),
            Err(ServiceError::Api("500".to_string())),
        ],
        &[],
        false,
    );

    let report = fx.router.run("do something odd").await.unwrap();

    assert!(!report.success);
    assert_eq!(report.total_steps, 3);
    assert_eq!(report.successful_steps, 0);
    assert!(fx.driver.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unsupported_kind_completes_nothing() {
    let classify = r#"{"kind":"web_search","steps":["look it up"]}"#;
    let fx = fixture(
        vec![
            Ok(classify.to_string()),
            Err(ServiceError::Api("500".to_string())),
        ],
        &[],
        false,
    );

    let report = fx.router.run("look it up").await.unwrap();

    assert!(!report.success);
    assert_eq!(report.total_steps, 1);
    assert_eq!(report.successful_steps, 0);
}
