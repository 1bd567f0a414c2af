pub mod browser;
pub mod command_executor;

pub use browser::{BrowserConfig, BrowserDriver, BrowserError, BrowserRun, BrowserSession};
pub use command_executor::{CommandExecutor, ExecutionOutcome, ScriptRunner};
