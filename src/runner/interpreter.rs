//! Runner over an externally bootstrapped interpreter.
//!
//! The interpreter session is created on first use and cached for the life of the
//! runner. Lifecycle: `Uninitialized -> Loading -> Ready`, or `Loading -> Uninitialized`
//! when the bootstrap fails so the next request retries. Requests arriving while a
//! bootstrap is in flight await that same attempt instead of starting another one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{info, warn};

use super::Runner;
use crate::error::{BootstrapError, RunnerError, SessionError};
use crate::execution::capture::OutputCapture;
use crate::execution::stdin::StdinCursor;
use crate::execution::{ErrorDetail, ExecutionRequest, RunOutcome};

pub const SETUP_HINT: &str =
    "💡 Note: Python execution requires a working Python 3 runtime (set PYTHON_BIN if it is not on PATH).";

/// Creates interpreter sessions. Called at most once per successful lifecycle.
#[async_trait]
pub trait InterpreterBootstrap: Send + Sync {
    async fn bootstrap(&self) -> Result<Arc<dyn InterpreterSession>, BootstrapError>;
}

/// A ready interpreter able to run source with intercepted stdout and input.
#[async_trait]
pub trait InterpreterSession: Send + Sync {
    /// Runs `source`, answering input requests from `stdin`.
    ///
    /// A failure of the source itself is `Ok` with `error` set; `Err` means the session
    /// is no longer usable.
    async fn execute(&self, source: &str, stdin: &mut StdinCursor) -> Result<SessionOutput, SessionError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionOutput {
    pub output: String,
    pub error: Option<ErrorDetail>,
}

/// Observable lifecycle phase.
///
/// There is no failed phase: a failed bootstrap returns straight to `Uninitialized`, so
/// the next request retries, and a broken or abandoned session does the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerPhase {
    Uninitialized,
    Loading,
    Ready,
}

type BootFuture = Shared<BoxFuture<'static, Result<Arc<dyn InterpreterSession>, BootstrapError>>>;

enum State {
    Uninitialized,
    Loading { attempt: u64, boot: BootFuture },
    Ready(Arc<dyn InterpreterSession>),
}

pub struct InterpreterRunner {
    bootstrap: Arc<dyn InterpreterBootstrap>,
    state: Mutex<State>,
    attempts: AtomicU64,
}

impl InterpreterRunner {
    pub fn new(bootstrap: Arc<dyn InterpreterBootstrap>) -> Self {
        Self {
            bootstrap,
            state: Mutex::new(State::Uninitialized),
            attempts: AtomicU64::new(0),
        }
    }

    pub fn phase(&self) -> RunnerPhase {
        match &*self.lock_state() {
            State::Uninitialized => RunnerPhase::Uninitialized,
            State::Loading { .. } => RunnerPhase::Loading,
            State::Ready(_) => RunnerPhase::Ready,
        }
    }

    /// Number of bootstraps started so far.
    pub fn bootstrap_attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Returns the ready session, bootstrapping or joining an in-flight bootstrap as needed.
    pub async fn session(&self) -> Result<Arc<dyn InterpreterSession>, BootstrapError> {
        let (attempt, boot) = {
            let mut state = self.lock_state();
            match &*state {
                State::Ready(session) => return Ok(Arc::clone(session)),
                State::Loading { attempt, boot } => (*attempt, boot.clone()),
                State::Uninitialized => {
                    let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
                    info!(attempt, "bootstrapping interpreter");
                    let bootstrap = Arc::clone(&self.bootstrap);
                    let boot = async move { bootstrap.bootstrap().await }.boxed().shared();
                    *state = State::Loading { attempt, boot: boot.clone() };
                    (attempt, boot)
                }
            }
        };

        let outcome = boot.await;

        let mut state = self.lock_state();
        if matches!(&*state, State::Loading { attempt: current, .. } if *current == attempt) {
            *state = match &outcome {
                Ok(session) => {
                    info!(attempt, "interpreter ready");
                    State::Ready(Arc::clone(session))
                }
                Err(err) => {
                    warn!(attempt, error = %err, "interpreter bootstrap failed");
                    State::Uninitialized
                }
            };
        }
        outcome
    }

    /// Drops a broken session so the next request bootstraps a fresh one.
    fn invalidate(&self, broken: &Arc<dyn InterpreterSession>) {
        let mut state = self.lock_state();
        if let State::Ready(current) = &*state {
            if same_session(current, broken) {
                *state = State::Uninitialized;
            }
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Resets the runner if a request is dropped before its session answered. The session
/// may still be running the abandoned source, so it cannot be trusted with the next one.
struct Completion<'a> {
    runner: &'a InterpreterRunner,
    session: &'a Arc<dyn InterpreterSession>,
    finished: bool,
}

impl Drop for Completion<'_> {
    fn drop(&mut self) {
        if !self.finished {
            warn!("interpreter request abandoned, resetting");
            self.runner.invalidate(self.session);
        }
    }
}

fn same_session(a: &Arc<dyn InterpreterSession>, b: &Arc<dyn InterpreterSession>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

#[async_trait]
impl Runner for InterpreterRunner {
    fn name(&self) -> &'static str {
        "interpreter"
    }

    async fn run(&self, request: &ExecutionRequest) -> Result<RunOutcome, RunnerError> {
        let session = self.session().await.map_err(|err| RunnerError::Setup {
            message: err.to_string(),
            hint: Some(SETUP_HINT.to_string()),
        })?;

        let mut cursor = StdinCursor::new(request.stdin.clone());
        let mut completion = Completion { runner: self, session: &session, finished: false };
        let executed = session.execute(&request.source, &mut cursor).await;
        completion.finished = true;
        drop(completion);

        match executed {
            Ok(SessionOutput { output, error: None }) => {
                Ok(OutputCapture::from_captured(output).success(cursor.position()))
            }
            Ok(SessionOutput { output, error: Some(detail) }) => {
                Ok(OutputCapture::from_captured(output).runtime_error(detail, cursor.position()))
            }
            Err(err) => {
                warn!(error = %err, "interpreter session broke, resetting");
                self.invalidate(&session);
                Ok(OutputCapture::new().runtime_error(ErrorDetail::new(err.to_string()), cursor.position()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::{ExecutionStatus, LanguageTag};
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    /// Echoes each stdin line back through a fake `input()` until the source says stop.
    struct EchoSession;

    #[async_trait]
    impl InterpreterSession for EchoSession {
        async fn execute(&self, source: &str, stdin: &mut StdinCursor) -> Result<SessionOutput, SessionError> {
            if source == "crash" {
                return Err(SessionError::Exited);
            }
            if source == "hang" {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            if source == "raise" {
                return Ok(SessionOutput {
                    output: "partial\n".into(),
                    error: Some(ErrorDetail::new("ValueError: nope")),
                });
            }
            let mut output = String::new();
            for _ in 0..source.matches("input").count() {
                let value = stdin.next_line().unwrap_or_default();
                output.push_str(&format!("📥 {value}\n{value}\n"));
            }
            Ok(SessionOutput { output, error: None })
        }
    }

    struct FakeBootstrap {
        calls: AtomicUsize,
        failures_left: AtomicUsize,
        delay: Duration,
    }

    impl FakeBootstrap {
        fn new(failures: usize) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                failures_left: AtomicUsize::new(failures),
                delay: Duration::from_millis(20),
            })
        }
    }

    #[async_trait]
    impl InterpreterBootstrap for FakeBootstrap {
        async fn bootstrap(&self) -> Result<Arc<dyn InterpreterSession>, BootstrapError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            let fail = self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if fail {
                return Err(BootstrapError::NotFound("offline".into()));
            }
            Ok(Arc::new(EchoSession))
        }
    }

    fn request(source: &str, stdin: &str) -> ExecutionRequest {
        ExecutionRequest::new(source, LanguageTag::Python, stdin)
    }

    #[tokio::test]
    async fn first_run_bootstraps_then_reuses_session() {
        let boot = FakeBootstrap::new(0);
        let runner = InterpreterRunner::new(boot.clone());
        assert_eq!(runner.phase(), RunnerPhase::Uninitialized);

        let out = runner.run(&request("print(input('n? '))", "Ada\n")).await.unwrap();
        assert_eq!(out.status, ExecutionStatus::Success);
        assert!(out.output.contains("Ada"));
        assert_eq!(out.stdin_consumed, 1);
        assert_eq!(runner.phase(), RunnerPhase::Ready);

        runner.run(&request("pass", "")).await.unwrap();
        assert_eq!(boot.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_first_callers_share_one_bootstrap() {
        let boot = FakeBootstrap::new(0);
        let runner = Arc::new(InterpreterRunner::new(boot.clone()));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let runner = Arc::clone(&runner);
            handles.push(tokio::spawn(async move { runner.session().await.is_ok() }));
        }
        for h in handles {
            assert!(h.await.unwrap());
        }
        assert_eq!(boot.calls.load(Ordering::SeqCst), 1);
        assert_eq!(runner.bootstrap_attempts(), 1);
    }

    #[tokio::test]
    async fn concurrent_callers_all_observe_the_same_failure() {
        let boot = FakeBootstrap::new(1);
        let runner = Arc::new(InterpreterRunner::new(boot.clone()));

        let mut handles = Vec::new();
        for _ in 0..5 {
            let runner = Arc::clone(&runner);
            handles.push(tokio::spawn(async move { runner.run(&request("pass", "")).await }));
        }
        for h in handles {
            match h.await.unwrap() {
                Err(RunnerError::Setup { hint, .. }) => assert!(hint.is_some()),
                other => panic!("expected setup error, got {other:?}"),
            }
        }
        assert_eq!(boot.calls.load(Ordering::SeqCst), 1);
        assert_eq!(runner.phase(), RunnerPhase::Uninitialized);
    }

    #[tokio::test]
    async fn failed_bootstrap_is_retried_on_next_request() {
        let boot = FakeBootstrap::new(1);
        let runner = InterpreterRunner::new(boot.clone());

        assert!(matches!(runner.run(&request("pass", "")).await, Err(RunnerError::Setup { .. })));
        let out = runner.run(&request("pass", "")).await.unwrap();
        assert_eq!(out.status, ExecutionStatus::Success);
        assert_eq!(boot.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn source_errors_are_runtime_errors_not_setup_errors() {
        let runner = InterpreterRunner::new(FakeBootstrap::new(0));
        let out = runner.run(&request("raise", "")).await.unwrap();
        assert_eq!(out.status, ExecutionStatus::RuntimeError);
        assert_eq!(out.output, "partial\n");
        assert_eq!(runner.phase(), RunnerPhase::Ready);
    }

    #[tokio::test]
    async fn broken_session_resets_the_runner() {
        let boot = FakeBootstrap::new(0);
        let runner = InterpreterRunner::new(boot.clone());

        let out = runner.run(&request("crash", "")).await.unwrap();
        assert_eq!(out.status, ExecutionStatus::RuntimeError);
        assert_eq!(runner.phase(), RunnerPhase::Uninitialized);

        runner.run(&request("pass", "")).await.unwrap();
        assert_eq!(boot.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn abandoned_request_resets_the_runner() {
        let boot = FakeBootstrap::new(0);
        let runner = InterpreterRunner::new(boot.clone());

        let cancelled = tokio::time::timeout(Duration::from_millis(100), runner.run(&request("hang", ""))).await;
        assert!(cancelled.is_err());
        assert_eq!(runner.phase(), RunnerPhase::Uninitialized);

        let out = runner.run(&request("input", "new\n")).await.unwrap();
        assert_eq!(out.output, "📥 new\nnew\n");
        assert_eq!(boot.calls.load(Ordering::SeqCst), 2);
    }
}
