//! Routes each request to exactly one runner and normalizes whatever comes back.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use tracing::{debug, warn};

use super::{ErrorDetail, ExecutionRequest, ExecutionResult, ExecutionStatus, LanguageTag, RunOutcome};
use crate::error::RunnerError;
use crate::preview::PreviewRenderer;
use crate::runner::{InterpreterRunner, MarkupRunner, Runner, ScriptRunner, StructureRunner};

/// Wall-clock timing from dispatch to result.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionStats {
    started: Instant,
}

impl ExecutionStats {
    pub fn start() -> Self {
        Self { started: Instant::now() }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }
}

pub struct Dispatcher {
    script: Arc<dyn Runner>,
    interpreter: Arc<dyn Runner>,
    markup: Arc<dyn Runner>,
    structure: Arc<dyn Runner>,
}

impl Dispatcher {
    /// Default runners around the shared interpreter service.
    pub fn new(interpreter: Arc<InterpreterRunner>) -> Self {
        Self {
            script: Arc::new(ScriptRunner),
            interpreter,
            markup: Arc::new(MarkupRunner::new()),
            structure: Arc::new(StructureRunner),
        }
    }

    pub fn with_runners(
        script: Arc<dyn Runner>,
        interpreter: Arc<dyn Runner>,
        markup: Arc<dyn Runner>,
        structure: Arc<dyn Runner>,
    ) -> Self {
        Self { script, interpreter, markup, structure }
    }

    /// Markup results are also shown on `renderer`.
    pub fn with_preview(mut self, renderer: Arc<PreviewRenderer>) -> Self {
        self.markup = Arc::new(MarkupRunner::with_renderer(renderer));
        self
    }

    pub fn runner_for(&self, language: &LanguageTag) -> &Arc<dyn Runner> {
        match language {
            LanguageTag::Javascript => &self.script,
            LanguageTag::Python => &self.interpreter,
            LanguageTag::Html | LanguageTag::Css => &self.markup,
            LanguageTag::Other(_) => &self.structure,
        }
    }

    /// Runs the request. Never fails: every fault becomes a result with an error status.
    pub async fn run(&self, request: ExecutionRequest) -> ExecutionResult {
        let stats = ExecutionStats::start();
        let runner = self.runner_for(&request.language);
        debug!(language = %request.language, runner = runner.name(), "dispatching");

        let outcome = match AssertUnwindSafe(runner.run(&request)).catch_unwind().await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(err)) => fault_outcome(err),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!(runner = runner.name(), %message, "runner panicked");
                RunOutcome::failed(
                    ExecutionStatus::RuntimeError,
                    "",
                    ErrorDetail::new(format!("runner panicked: {message}")),
                )
            }
        };

        let result = ExecutionResult::from_outcome(request.language, outcome, stats.elapsed_ms());
        debug!(status = ?result.status, elapsed_ms = result.execution_time_ms, "execution finished");
        result
    }
}

fn fault_outcome(err: RunnerError) -> RunOutcome {
    match err {
        RunnerError::Setup { message, hint } => {
            let detail = ErrorDetail { message, trace: None, hint };
            RunOutcome::failed(ExecutionStatus::SetupError, "", detail)
        }
        RunnerError::Fault(message) => {
            RunOutcome::failed(ExecutionStatus::RuntimeError, "", ErrorDetail::new(message))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
