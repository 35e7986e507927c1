mod orchestrator;
mod progress;
mod report;

// Public API of the race subsystem.
pub use crate::error::RunError;
pub use orchestrator::{RoundStep, RunOrchestrator, RunStatus};
pub use progress::RunProgress;
pub use report::{FinalStats, RunReport};
