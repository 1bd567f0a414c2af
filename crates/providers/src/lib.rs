pub mod browser_agent;
pub mod openai_compatible;
pub mod traits;

pub use browser_agent::BrowserAgentClient;
pub use openai_compatible::OpenAICompatibleService;
pub use traits::{ModelRequest, ModelService, SchemaSpec, ServiceError};
