//! Python interpreter process bootstrap and I/O glue.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info};

use super::ProcessHandle;
use crate::config::Config;
use crate::error::{BootstrapError, SessionError};
use crate::execution::stdin::StdinCursor;
use crate::execution::ErrorDetail;
use crate::runner::{InterpreterBootstrap, InterpreterSession, SessionOutput};

const DRIVER: &str = include_str!("driver.py");

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum HostMessage<'a> {
    Exec { id: u64, code: &'a str },
    InputReply { id: u64, value: Option<String> },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum DriverMessage {
    Ready { version: String },
    Input { id: u64, prompt: String },
    Done { id: u64, output: String },
    Error { id: u64, output: String, message: String, trace: String },
}

/// Finds the interpreter: an explicit `PYTHON_BIN`, else `python3` or `python` on PATH.
pub fn resolve_python(configured: Option<&str>) -> Result<PathBuf, BootstrapError> {
    if let Some(bin) = configured.filter(|b| !b.is_empty() && *b != "auto") {
        return which::which(bin).map_err(|e| BootstrapError::NotFound(format!("{bin}: {e}")));
    }
    which::which("python3")
        .or_else(|_| which::which("python"))
        .map_err(|e| BootstrapError::NotFound(e.to_string()))
}

pub async fn start_python(program: &Path) -> std::io::Result<ProcessHandle> {
    let mut cmd = Command::new(program);
    cmd.arg("-u") // unbuffered
        .arg("-c")
        .arg(DRIVER)
        .env("PYTHONIOENCODING", "utf-8")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true);

    let mut child = cmd.spawn()?;
    let stdin = child
        .stdin
        .take()
        .ok_or_else(|| std::io::Error::other("no stdin"))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| std::io::Error::other("no stdout"))?;

    Ok(ProcessHandle {
        child,
        stdin,
        stdout: BufReader::new(stdout).lines(),
    })
}

/// Spawns a Python process running the protocol driver and waits for its handshake.
#[derive(Debug, Clone)]
pub struct ProcessBootstrap {
    program: Option<String>,
    ready_timeout: Duration,
}

impl ProcessBootstrap {
    pub fn new(program: Option<String>, ready_timeout: Duration) -> Self {
        Self { program, ready_timeout }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.get("PYTHON_BIN"), cfg.get_secs("BOOTSTRAP_TIMEOUT", 30))
    }
}

#[async_trait]
impl InterpreterBootstrap for ProcessBootstrap {
    async fn bootstrap(&self) -> Result<Arc<dyn InterpreterSession>, BootstrapError> {
        let program = resolve_python(self.program.as_deref())?;
        debug!(program = %program.display(), "starting interpreter");

        let mut handle = start_python(&program).await.map_err(|e| BootstrapError::Spawn {
            program: program.display().to_string(),
            reason: e.to_string(),
        })?;

        let ready = timeout(self.ready_timeout, handle.recv::<DriverMessage>())
            .await
            .map_err(|_| BootstrapError::Timeout(self.ready_timeout))?
            .map_err(|e| BootstrapError::Handshake(e.to_string()))?;

        match ready {
            Some(DriverMessage::Ready { version }) => {
                info!(%version, program = %program.display(), "python interpreter started");
                Ok(Arc::new(PythonProcess { handle: Mutex::new(handle), next_id: AtomicU64::new(1) }))
            }
            Some(other) => Err(BootstrapError::Handshake(format!("unexpected message {other:?}"))),
            None => Err(BootstrapError::Handshake("interpreter exited during startup".into())),
        }
    }
}

/// A live driver process. Requests are serialized through the handle lock.
///
/// Every request carries an id the driver echoes back, so frames left in the pipe by an
/// abandoned request are never taken for the current one.
pub struct PythonProcess {
    handle: Mutex<ProcessHandle>,
    next_id: AtomicU64,
}

#[async_trait]
impl InterpreterSession for PythonProcess {
    async fn execute(&self, source: &str, stdin: &mut StdinCursor) -> Result<SessionOutput, SessionError> {
        let mut handle = self.handle.lock().await;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        handle.send(&HostMessage::Exec { id, code: source }).await?;

        loop {
            let Some(message) = handle.recv::<DriverMessage>().await? else {
                return Err(SessionError::Exited);
            };
            match message {
                DriverMessage::Input { id: asked, prompt } if asked == id => {
                    debug!(%prompt, exhausted = stdin.is_exhausted(), "interpreter requested input");
                    let value = stdin.next_line();
                    handle.send(&HostMessage::InputReply { id, value }).await?;
                }
                DriverMessage::Input { id: stale, .. } => {
                    debug!(stale, "answering input for an abandoned request");
                    handle.send(&HostMessage::InputReply { id: stale, value: None }).await?;
                }
                DriverMessage::Done { id: done, output } if done == id => {
                    return Ok(SessionOutput { output, error: None });
                }
                DriverMessage::Error { id: done, output, message, trace } if done == id => {
                    let detail = ErrorDetail::new(message).with_trace(Some(trace));
                    return Ok(SessionOutput { output, error: Some(detail) });
                }
                DriverMessage::Done { id: stale, .. } | DriverMessage::Error { id: stale, .. } => {
                    debug!(stale, "discarding result of an abandoned request");
                }
                DriverMessage::Ready { .. } => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_messages_match_driver_protocol() {
        let exec = serde_json::to_string(&HostMessage::Exec { id: 3, code: "print(1)" }).unwrap();
        assert_eq!(exec, r#"{"type":"exec","id":3,"code":"print(1)"}"#);
        let reply = serde_json::to_string(&HostMessage::InputReply { id: 3, value: None }).unwrap();
        assert_eq!(reply, r#"{"type":"input_reply","id":3,"value":null}"#);
    }

    #[test]
    fn driver_messages_parse() {
        let msg: DriverMessage =
            serde_json::from_str(r#"{"type":"error","id":7,"output":"","message":"ZeroDivisionError: division by zero","trace":"Traceback"}"#)
                .unwrap();
        assert!(matches!(msg, DriverMessage::Error { id: 7, ref message, .. } if message.starts_with("ZeroDivision")));
    }

    #[test]
    fn unknown_binary_is_not_found() {
        let err = resolve_python(Some("definitely-not-a-python-binary")).unwrap_err();
        assert!(matches!(err, BootstrapError::NotFound(_)));
    }
}
