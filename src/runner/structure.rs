//! Structural analysis fallback for languages without an execution backend.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::Runner;
use crate::error::RunnerError;
use crate::execution::{ExecutionRequest, LanguageTag, RunOutcome};

const FUNCTION_TOKENS: &[&str] = &["function", "def ", "void "];
const CONDITIONAL_TOKENS: &[&str] = &["if ", "if("];
const LOOP_TOKENS: &[&str] = &["for ", "while "];

/// Heuristic metrics computed from raw text. Substring matching, no parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureMetrics {
    pub lines: usize,
    pub non_blank_lines: usize,
    pub characters: usize,
    pub has_functions: bool,
    pub has_conditionals: bool,
    pub has_loops: bool,
}

impl StructureMetrics {
    pub fn scan(source: &str) -> Self {
        let contains_any = |tokens: &[&str]| tokens.iter().any(|t| source.contains(t));
        Self {
            lines: source.split('\n').count(),
            non_blank_lines: source.split('\n').filter(|l| !l.trim().is_empty()).count(),
            characters: source.chars().count(),
            has_functions: contains_any(FUNCTION_TOKENS),
            has_conditionals: contains_any(CONDITIONAL_TOKENS),
            has_loops: contains_any(LOOP_TOKENS),
        }
    }
}

/// Human-readable report in the same shape as the other runners' output.
pub fn report(language: &LanguageTag, metrics: &StructureMetrics) -> String {
    let mut out = format!("📊 {} Code Analysis:\n\n", language.display_name());
    out.push_str(&format!("📏 Lines of code: {}\n", metrics.lines));
    out.push_str(&format!("🔤 Characters: {}\n", metrics.characters));
    out.push_str(&format!("📝 Non-empty lines: {}\n\n", metrics.non_blank_lines));

    if metrics.has_functions {
        out.push_str("✅ Contains function definitions\n");
    }
    if metrics.has_conditionals {
        out.push_str("✅ Contains conditional statements\n");
    }
    if metrics.has_loops {
        out.push_str("✅ Contains loops\n");
    }

    out.push_str(&format!(
        "\n💡 Note: {} requires a specific runtime environment for execution.",
        language
    ));
    out.push_str("\n📋 This analysis shows the code structure and basic syntax validation.");
    out
}

pub struct StructureRunner;

#[async_trait]
impl Runner for StructureRunner {
    fn name(&self) -> &'static str {
        "structure"
    }

    async fn run(&self, request: &ExecutionRequest) -> Result<RunOutcome, RunnerError> {
        let metrics = StructureMetrics::scan(&request.source);
        let text = report(&request.language, &metrics);
        Ok(RunOutcome { metrics: Some(metrics), ..RunOutcome::success(text) })
    }
}
