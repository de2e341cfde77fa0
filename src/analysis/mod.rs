//! Code analysis: a remote model's review merged with locally computed findings.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::Serialize;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::execution::LanguageTag;
use crate::runner::StructureMetrics;

pub mod insight;

pub use insight::LlmInsight;

pub const FALLBACK_INSIGHT: &str = "🤖 AI analysis temporarily unavailable. Showing local analysis only.";

const LONG_LINE: usize = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Notice,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub severity: Severity,
    pub message: String,
}

impl Finding {
    fn info(message: impl Into<String>) -> Self {
        Self { severity: Severity::Info, message: message.into() }
    }

    fn notice(message: impl Into<String>) -> Self {
        Self { severity: Severity::Notice, message: message.into() }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisBundle {
    pub ai_insight: String,
    pub local_findings: Vec<Finding>,
    pub language: LanguageTag,
    pub timestamp: DateTime<Utc>,
    pub code_length: usize,
    /// Set when `ai_insight` is the fallback text.
    pub degraded: bool,
}

/// Source of the remote review text.
#[async_trait]
pub trait InsightProvider: Send + Sync {
    async fn insight(&self, prompt: &str) -> anyhow::Result<String>;
}

pub fn analysis_prompt(language: &LanguageTag, source: &str) -> String {
    format!(
        "Please analyze this {language} code and provide:\n\
         1. Code quality assessment\n\
         2. Potential bugs or issues\n\
         3. Performance suggestions\n\
         4. Best practices recommendations\n\
         5. Security considerations (if applicable)\n\
         \n\
         Code:\n\
         ```{language}\n\
         {source}\n\
         ```"
    )
}

/// Deterministic findings computed from the text alone.
pub fn local_findings(source: &str) -> Vec<Finding> {
    let metrics = StructureMetrics::scan(source);
    let mut findings = vec![Finding::info(format!(
        "Size: {} lines ({} non-empty), {} characters",
        metrics.lines, metrics.non_blank_lines, metrics.characters
    ))];

    if source.trim().is_empty() {
        findings.push(Finding::notice("Source is empty"));
        return findings;
    }

    if metrics.has_functions {
        findings.push(Finding::info("Contains function definitions"));
    } else if metrics.non_blank_lines > 1 {
        findings.push(Finding::notice(
            "No function definitions found; consider splitting the code into functions",
        ));
    }
    if metrics.has_conditionals {
        findings.push(Finding::info("Contains conditional statements"));
    }
    if metrics.has_loops {
        findings.push(Finding::info("Contains loops"));
    }

    let long = source.lines().filter(|l| l.chars().count() > LONG_LINE).count();
    if long > 0 {
        findings.push(Finding::notice(format!(
            "{long} line(s) longer than {LONG_LINE} characters"
        )));
    }

    let markers = source
        .lines()
        .filter(|l| l.contains("TODO") || l.contains("FIXME"))
        .count();
    if markers > 0 {
        findings.push(Finding::notice(format!("{markers} TODO/FIXME marker(s)")));
    }

    findings
}

/// Runs the remote insight and local findings side by side and merges them.
pub struct AnalysisOrchestrator {
    provider: Option<Arc<dyn InsightProvider>>,
    timeout: Duration,
}

impl AnalysisOrchestrator {
    pub fn new(provider: Arc<dyn InsightProvider>, timeout: Duration) -> Self {
        Self { provider: Some(provider), timeout }
    }

    /// Local findings only; every bundle carries the fallback insight.
    pub fn offline() -> Self {
        Self { provider: None, timeout: Duration::ZERO }
    }

    pub async fn analyze(&self, source: &str, language: &LanguageTag) -> AnalysisBundle {
        let (insight, local_findings) =
            tokio::join!(self.remote_insight(source, language), async { local_findings(source) });

        let degraded = insight.is_none();
        AnalysisBundle {
            ai_insight: insight.unwrap_or_else(|| FALLBACK_INSIGHT.to_string()),
            local_findings,
            language: language.clone(),
            timestamp: Utc::now(),
            code_length: source.chars().count(),
            degraded,
        }
    }

    async fn remote_insight(&self, source: &str, language: &LanguageTag) -> Option<String> {
        let provider = self.provider.as_ref()?;
        let prompt = analysis_prompt(language, source);

        let call = AssertUnwindSafe(provider.insight(&prompt)).catch_unwind();
        match timeout(self.timeout, call).await {
            Err(_) => {
                warn!(timeout = ?self.timeout, "analysis request timed out");
                None
            }
            Ok(Err(_)) => {
                warn!("analysis provider panicked");
                None
            }
            Ok(Ok(Err(e))) => {
                warn!(error = %e, "analysis request failed");
                None
            }
            Ok(Ok(Ok(text))) if text.trim().is_empty() => {
                warn!("analysis provider returned no text");
                None
            }
            Ok(Ok(Ok(text))) => {
                debug!(chars = text.len(), "analysis insight received");
                Some(text)
            }
        }
    }
}
