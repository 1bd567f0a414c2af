pub mod context;
pub mod controller;
pub mod error;
pub mod gate;
pub mod generator;
pub mod handler;
pub mod orchestrator;
pub mod planner;
pub mod router;
pub mod types;
pub mod verifier;

pub use context::{ExecutionContext, ExecutionHistory, HistoryEntry};
pub use controller::{AttemptRecord, RetryPolicy, StepController};
pub use error::EngineError;
pub use gate::{ApprovalGate, GateDecision, OutcomeConfirmation};
pub use generator::{Generator, ScriptGenerator};
pub use handler::{HandlerRegistry, ResearchStepHandler, ScriptStepHandler, StepHandler};
pub use orchestrator::PlanOrchestrator;
pub use planner::{Classifier, Planner};
pub use router::TaskRouter;
pub use types::*;
pub use verifier::Verifier;
