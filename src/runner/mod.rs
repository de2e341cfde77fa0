//! Execution backends. Each runner turns one request into one outcome.

use async_trait::async_trait;

use crate::error::RunnerError;
use crate::execution::{ExecutionRequest, RunOutcome};

pub mod interpreter;
pub mod markup;
pub mod script;
pub mod structure;

pub use interpreter::{InterpreterBootstrap, InterpreterRunner, InterpreterSession, RunnerPhase, SessionOutput};
pub use markup::MarkupRunner;
pub use script::ScriptRunner;
pub use structure::{StructureMetrics, StructureRunner};

/// Runner contract used by the dispatcher.
///
/// A failure of the user's source is reported inside the `RunOutcome`; `Err` is reserved
/// for the backend itself failing.
#[async_trait]
pub trait Runner: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self, request: &ExecutionRequest) -> Result<RunOutcome, RunnerError>;
}
