use crate::types::TaskKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Planning error: {0}")]
    Planning(String),
    #[error("Classification error: {0}")]
    Classification(String),
    #[error("Handler error: {0}")]
    Handler(String),
    #[error("Execution plan rejected by user")]
    PlanRejected,
    #[error("No handler available for {0}")]
    NoHandler(TaskKind),
    #[error("Console input closed")]
    ConsoleClosed,
}
