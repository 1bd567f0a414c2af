use std::sync::Arc;
use std::time::Duration;

use deskpilot_core::{
    ApprovalGate, Classifier, ExecutionHistory, HandlerRegistry, PlanOrchestrator, Planner,
    ResearchStepHandler, RetryPolicy, ScriptGenerator, ScriptStepHandler, StepController,
    TaskKind, TaskRouter, Verifier,
};
use deskpilot_executor::{BrowserConfig, ScriptRunner};
use deskpilot_interfaces::{Console, TerminalConsole};
use deskpilot_providers::{BrowserAgentClient, ModelService, OpenAICompatibleService};
use tokio::sync::Mutex;

use crate::config::Config;

fn model_service(config: &Config) -> Arc<dyn ModelService> {
    Arc::new(OpenAICompatibleService::new(
        config.service.endpoint.clone(),
        config.api_key(),
        config.service.model.clone(),
    ))
}

fn script_controller(
    config: &Config,
    service: Arc<dyn ModelService>,
    console: Arc<dyn Console>,
    history: Arc<Mutex<ExecutionHistory>>,
    policy: RetryPolicy,
) -> StepController {
    let runner = ScriptRunner::new(
        config.script.interpreter.clone(),
        config.script.inline_flag.clone(),
        Duration::from_secs(config.script.timeout_secs),
    );

    StepController::new(
        Arc::new(ScriptGenerator::new(service.clone())),
        ApprovalGate::new(console.clone()),
        Arc::new(runner),
        Verifier::new(service),
        console,
        history,
        policy,
    )
}

/// Orchestrated entry point: plan review up front, then per-step
/// verification and human confirmation during the walk.
pub fn build_orchestrator(config: &Config) -> PlanOrchestrator {
    let console: Arc<dyn Console> = Arc::new(TerminalConsole::new());
    let service = model_service(config);
    let history = Arc::new(Mutex::new(ExecutionHistory::new()));

    let script_handler = Arc::new(ScriptStepHandler::new(script_controller(
        config,
        service.clone(),
        console.clone(),
        history,
        RetryPolicy::orchestrated(),
    )));

    let mut registry = HandlerRegistry::new();
    registry.register(TaskKind::DesktopScript, script_handler.clone());
    registry.register(TaskKind::Terminal, script_handler);
    registry.register(
        TaskKind::WebSearch,
        Arc::new(ResearchStepHandler::new(service.clone(), console.clone())),
    );

    PlanOrchestrator::new(Planner::new(service.clone()), registry, console, service)
}

/// Single-task entry point: classify the prompt once and walk the steps
/// with the legacy three-attempt policy.
pub fn build_router(config: &Config) -> TaskRouter {
    let console: Arc<dyn Console> = Arc::new(TerminalConsole::new());
    let service = model_service(config);
    let history = Arc::new(Mutex::new(ExecutionHistory::new()));

    let controller = script_controller(
        config,
        service.clone(),
        console.clone(),
        history.clone(),
        RetryPolicy::single_task(),
    );

    let browser = config.browser.launch_chrome.then(|| BrowserConfig {
        binary: config.browser.chrome_path.clone(),
        debug_port: config.browser.debug_port,
        profile_dir: config.browser.profile_dir.clone(),
    });

    TaskRouter::new(
        Classifier::new(service.clone()),
        controller,
        Arc::new(BrowserAgentClient::new(
            config.browser.agent_endpoint.clone(),
        )),
        service,
        console,
        history,
        browser,
    )
}
