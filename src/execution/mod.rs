//! Execution engine: request and result types shared by every runner.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::preview::PreviewDocument;
use crate::runner::structure::StructureMetrics;

pub mod capture;
pub mod dispatcher;
pub mod stdin;

/// Declared language of a piece of source text.
///
/// Parsing never fails: anything unrecognised is kept as `Other` and handled by the
/// structural analysis fallback.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum LanguageTag {
    Javascript,
    Python,
    Html,
    Css,
    Other(String),
}

impl LanguageTag {
    pub fn parse(tag: &str) -> Self {
        let lower = tag.trim().to_ascii_lowercase();
        match lower.as_str() {
            "javascript" | "js" | "node" => Self::Javascript,
            "python" | "py" | "python3" => Self::Python,
            "html" | "htm" => Self::Html,
            "css" => Self::Css,
            _ => Self::Other(lower),
        }
    }

    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "js" | "mjs" | "cjs" => Self::Javascript,
            "py" => Self::Python,
            "html" | "htm" => Self::Html,
            "css" => Self::Css,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Javascript => "javascript",
            Self::Python => "python",
            Self::Html => "html",
            Self::Css => "css",
            Self::Other(name) => name,
        }
    }

    /// Human-facing name used in output headers and error framing.
    pub fn display_name(&self) -> String {
        match self {
            Self::Javascript => "JavaScript".into(),
            Self::Python => "Python".into(),
            Self::Html => "HTML".into(),
            Self::Css => "CSS".into(),
            Self::Other(name) => name.to_uppercase(),
        }
    }

    /// Languages the preview renderer can turn into a document.
    pub fn is_previewable(&self) -> bool {
        matches!(self, Self::Html | Self::Css | Self::Javascript)
    }
}

impl fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for LanguageTag {
    fn from(tag: &str) -> Self {
        Self::parse(tag)
    }
}

impl From<String> for LanguageTag {
    fn from(tag: String) -> Self {
        Self::parse(&tag)
    }
}

impl From<LanguageTag> for String {
    fn from(tag: LanguageTag) -> Self {
        tag.as_str().to_string()
    }
}

/// One submission: source, language and the stdin lines it may read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    pub source: String,
    pub language: LanguageTag,
    pub stdin: Vec<String>,
}

impl ExecutionRequest {
    /// Builds a request from raw stdin text. A trailing newline does not add an empty line.
    pub fn new(source: impl Into<String>, language: LanguageTag, stdin_text: &str) -> Self {
        Self {
            source: source.into(),
            language,
            stdin: stdin_text.lines().map(str::to_string).collect(),
        }
    }

    pub fn with_lines(source: impl Into<String>, language: LanguageTag, stdin: Vec<String>) -> Self {
        Self { source: source.into(), language, stdin }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Success,
    /// The user's source raised while running.
    RuntimeError,
    /// The backend failed to initialize; the source never ran.
    SetupError,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorDetail {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), trace: None, hint: None }
    }

    pub fn with_trace(mut self, trace: Option<String>) -> Self {
        self.trace = trace.filter(|t| !t.trim().is_empty());
        self
    }
}

/// What a runner produced, before the dispatcher attaches timing.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub status: ExecutionStatus,
    pub output: String,
    pub error: Option<ErrorDetail>,
    pub return_preview: Option<String>,
    pub preview: Option<PreviewDocument>,
    pub metrics: Option<StructureMetrics>,
    pub stdin_consumed: usize,
}

impl RunOutcome {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            status: ExecutionStatus::Success,
            output: output.into(),
            error: None,
            return_preview: None,
            preview: None,
            metrics: None,
            stdin_consumed: 0,
        }
    }

    pub fn failed(status: ExecutionStatus, output: impl Into<String>, error: ErrorDetail) -> Self {
        Self { status, error: Some(error), ..Self::success(output) }
    }
}

/// Normalized outcome handed back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub language: LanguageTag,
    pub status: ExecutionStatus,
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<ErrorDetail>,
    pub execution_time_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_preview: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<PreviewDocument>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<StructureMetrics>,
    pub stdin_consumed: usize,
}

impl ExecutionResult {
    pub fn from_outcome(language: LanguageTag, outcome: RunOutcome, execution_time_ms: f64) -> Self {
        Self {
            language,
            status: outcome.status,
            output: outcome.output,
            error_detail: outcome.error,
            execution_time_ms: execution_time_ms.max(0.0),
            return_preview: outcome.return_preview,
            preview: outcome.preview,
            metrics: outcome.metrics,
            stdin_consumed: outcome.stdin_consumed,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_tags_and_aliases() {
        assert_eq!(LanguageTag::parse("JavaScript"), LanguageTag::Javascript);
        assert_eq!(LanguageTag::parse("js"), LanguageTag::Javascript);
        assert_eq!(LanguageTag::parse("py"), LanguageTag::Python);
        assert_eq!(LanguageTag::parse(" HTML "), LanguageTag::Html);
        assert_eq!(LanguageTag::parse("css"), LanguageTag::Css);
    }

    #[test]
    fn unknown_tags_fall_through_to_other() {
        assert_eq!(LanguageTag::parse("Ruby"), LanguageTag::Other("ruby".into()));
        assert_eq!(LanguageTag::from_extension("rs"), LanguageTag::Other("rs".into()));
        assert!(!LanguageTag::parse("ruby").is_previewable());
    }

    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&LanguageTag::Other("go".into())).unwrap();
        assert_eq!(json, "\"go\"");
        let back: LanguageTag = serde_json::from_str("\"python\"").unwrap();
        assert_eq!(back, LanguageTag::Python);
    }

    #[test]
    fn stdin_text_is_split_into_lines() {
        let req = ExecutionRequest::new("", LanguageTag::Python, "Ada\n");
        assert_eq!(req.stdin, vec!["Ada".to_string()]);
        let req = ExecutionRequest::new("", LanguageTag::Python, "a\n\nb");
        assert_eq!(req.stdin, vec!["a", "", "b"]);
        let req = ExecutionRequest::new("", LanguageTag::Python, "");
        assert!(req.stdin.is_empty());
    }

    #[test]
    fn negative_elapsed_time_is_clamped() {
        let result = ExecutionResult::from_outcome(LanguageTag::Css, RunOutcome::success("ok"), -1.0);
        assert_eq!(result.execution_time_ms, 0.0);
        assert!(result.is_success());
    }
}
