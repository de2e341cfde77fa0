//! Printers: colored result text and markdown (termimad).

use owo_colors::OwoColorize;
use termimad::MadSkin;

use crate::analysis::{AnalysisBundle, Severity};
use crate::execution::{ExecutionResult, ExecutionStatus, LanguageTag};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Plain,
    Success,
    Error,
    Info,
    Warning,
}

pub struct TextPrinter {
    pub colored: bool,
}

impl TextPrinter {
    pub fn print(&self, text: &str, tone: Tone) {
        if !self.colored {
            println!("{}", text);
            return;
        }
        match tone {
            Tone::Success => println!("{}", text.green()),
            Tone::Error => println!("{}", text.magenta()),
            Tone::Info => println!("{}", text.cyan()),
            Tone::Warning => println!("{}", text.yellow()),
            Tone::Plain => println!("{}", text),
        }
    }

    pub fn print_result(&self, result: &ExecutionResult) {
        let tone = match result.status {
            ExecutionStatus::Success if result.metrics.is_some() => Tone::Info,
            ExecutionStatus::Success => Tone::Success,
            _ => Tone::Error,
        };
        self.print(&format_body(result), tone);
        self.print(&format_timing(result), Tone::Plain);
    }
}

pub struct MarkdownPrinter {
    pub skin: MadSkin,
}

impl Default for MarkdownPrinter {
    fn default() -> Self {
        Self { skin: MadSkin::default() }
    }
}

impl MarkdownPrinter {
    pub fn print(&self, text: &str) {
        self.skin.print_text(text);
        println!();
    }
}

/// The full single-channel rendering of a result: body, blank line, timing.
pub fn format_result(result: &ExecutionResult) -> String {
    format!("{}\n\n{}", format_body(result), format_timing(result))
}

fn format_body(result: &ExecutionResult) -> String {
    let name = result.language.display_name();
    let detail = result.error_detail.as_ref();
    let message = detail.map(|d| d.message.as_str()).unwrap_or("unknown error");

    match result.status {
        ExecutionStatus::Success if result.output.is_empty() => {
            "✅ Code executed successfully (no output)".to_string()
        }
        ExecutionStatus::Success => result.output.trim_end().to_string(),
        ExecutionStatus::RuntimeError => {
            let mut text = String::new();
            if !result.output.is_empty() {
                text.push_str(result.output.trim_end());
                text.push_str("\n\n");
            }
            text.push_str(&format!("❌ {name} Error: {message}"));
            if let Some(trace) = detail.and_then(|d| d.trace.as_deref()) {
                if result.language == LanguageTag::Javascript {
                    text.push_str(&format!("\n\n📍 Stack: {trace}"));
                } else {
                    text.push_str(&format!("\n\n{}", trace.trim_end()));
                }
            }
            text
        }
        ExecutionStatus::SetupError => {
            let mut text = format!("❌ {name} execution failed: {message}");
            if let Some(hint) = detail.and_then(|d| d.hint.as_deref()) {
                text.push_str(&format!("\n\n{hint}"));
            }
            text
        }
    }
}

fn format_timing(result: &ExecutionResult) -> String {
    format!("⏱️ Execution time: {:.2}ms", result.execution_time_ms)
}

/// Local findings as a markdown list.
pub fn format_findings(bundle: &AnalysisBundle) -> String {
    let mut out = format!(
        "## 📊 Local analysis ({}, {} characters)\n\n",
        bundle.language, bundle.code_length
    );
    for finding in &bundle.local_findings {
        let marker = match finding.severity {
            Severity::Info => "ℹ️",
            Severity::Notice => "⚠️",
        };
        out.push_str(&format!("- {marker} {}\n", finding.message));
    }
    out
}

pub fn print_bundle(bundle: &AnalysisBundle, markdown: bool) {
    let insight = format!("## 🧠 AI insight\n\n{}\n", bundle.ai_insight);
    let findings = format_findings(bundle);
    if markdown {
        let printer = MarkdownPrinter::default();
        printer.print(&insight);
        printer.print(&findings);
    } else {
        println!("{insight}");
        println!("{findings}");
    }
}
