//! Interpreter process management (startup/IO/health).

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout};
use tracing::debug;

use crate::error::SessionError;

pub mod python;

/// A running interpreter speaking newline-delimited JSON on its stdin/stdout.
pub struct ProcessHandle {
    pub child: Child,
    pub stdin: ChildStdin,
    pub stdout: Lines<BufReader<ChildStdout>>,
}

impl ProcessHandle {
    pub async fn send<T: Serialize>(&mut self, message: &T) -> Result<(), SessionError> {
        let mut line = serde_json::to_string(message)?;
        line.push('\n');
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.flush().await?;
        Ok(())
    }

    /// Next protocol message, or `None` once the process closed its stdout.
    /// Lines that are not protocol JSON are skipped.
    pub async fn recv<T: DeserializeOwned>(&mut self) -> Result<Option<T>, SessionError> {
        while let Some(line) = self.stdout.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<T>(line) {
                Ok(message) => return Ok(Some(message)),
                Err(e) => debug!(error = %e, line, "skipping non-protocol interpreter output"),
            }
        }
        Ok(None)
    }
}
