//! In-memory capture sink standing in for stdout/stderr during a run.

use super::{ErrorDetail, ExecutionStatus, RunOutcome};

/// Output channel a captured line came from. Each channel has a fixed marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Info,
    Error,
    Warning,
    /// Echo of a line handed to the program by the input primitive.
    Input,
    /// Final expression value of a script.
    Return,
}

impl Channel {
    pub fn marker(self) -> &'static str {
        match self {
            Channel::Info => "📝 ",
            Channel::Error => "❌ Error: ",
            Channel::Warning => "⚠️ Warning: ",
            Channel::Input => "📥 ",
            Channel::Return => "📤 Return value: ",
        }
    }
}

/// Ordered text buffer shared by all channels of one execution.
#[derive(Debug, Default)]
pub struct OutputCapture {
    buffer: String,
}

impl OutputCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps output that was already captured on the interpreter side.
    pub fn from_captured(text: String) -> Self {
        Self { buffer: text }
    }

    pub fn push(&mut self, channel: Channel, text: &str) {
        self.buffer.push_str(channel.marker());
        self.buffer.push_str(text);
        self.buffer.push('\n');
    }

    pub fn success(self, stdin_consumed: usize) -> RunOutcome {
        RunOutcome { stdin_consumed, ..RunOutcome::success(self.buffer) }
    }

    pub fn runtime_error(self, detail: ErrorDetail, stdin_consumed: usize) -> RunOutcome {
        RunOutcome {
            stdin_consumed,
            ..RunOutcome::failed(ExecutionStatus::RuntimeError, self.buffer, detail)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_invocation_order_across_channels() {
        let mut capture = OutputCapture::new();
        capture.push(Channel::Info, "first");
        capture.push(Channel::Warning, "careful");
        capture.push(Channel::Error, "boom");
        capture.push(Channel::Info, "last");
        assert_eq!(
            capture.success(0).output,
            "📝 first\n⚠️ Warning: careful\n❌ Error: boom\n📝 last\n"
        );
    }

    #[test]
    fn runtime_error_keeps_partial_output() {
        let mut capture = OutputCapture::new();
        capture.push(Channel::Input, "n? Ada");
        let outcome = capture.runtime_error(ErrorDetail::new("ValueError: bad"), 1);
        assert_eq!(outcome.status, ExecutionStatus::RuntimeError);
        assert_eq!(outcome.output, "📥 n? Ada\n");
        assert_eq!(outcome.stdin_consumed, 1);
        assert_eq!(outcome.error.unwrap().message, "ValueError: bad");
    }
}
