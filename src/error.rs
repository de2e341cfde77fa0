//! Typed errors raised by runners and the interpreter backend.

use std::time::Duration;

use thiserror::Error;

/// A fault surfaced by a runner instead of a normal outcome.
///
/// The dispatcher never propagates these: `Setup` becomes a `SetupError` result and
/// `Fault` becomes a `RuntimeError` result.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The execution backend could not be initialized. Retrying may succeed.
    #[error("{message}")]
    Setup {
        message: String,
        hint: Option<String>,
    },

    /// The runner itself broke while handling the request.
    #[error("runner fault: {0}")]
    Fault(String),
}

impl RunnerError {
    pub fn setup(message: impl Into<String>) -> Self {
        Self::Setup { message: message.into(), hint: None }
    }
}

/// Failure to bring an external interpreter to the ready state.
#[derive(Debug, Clone, Error)]
pub enum BootstrapError {
    #[error("no Python interpreter found ({0})")]
    NotFound(String),

    #[error("failed to start interpreter {program}: {reason}")]
    Spawn { program: String, reason: String },

    #[error("interpreter did not become ready within {0:?}")]
    Timeout(Duration),

    #[error("interpreter handshake failed: {0}")]
    Handshake(String),
}

/// Failure of an already-ready interpreter session (not of the user's source).
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("interpreter exited unexpectedly")]
    Exited,

    #[error("interpreter I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed interpreter message: {0}")]
    Protocol(#[from] serde_json::Error),
}
