pub mod artifacts;
pub mod config;
pub mod errors;
pub mod extract;
pub mod format;
pub mod history;
pub mod host;
pub mod logging;
pub mod orchestrator;
pub mod run;

pub use orchestrator::{Orchestrator, OrchestratorConfig};
