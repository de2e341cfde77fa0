//! Markup runner: produces a preview document instead of text output.

use std::sync::Arc;

use async_trait::async_trait;

use super::Runner;
use crate::error::RunnerError;
use crate::execution::{ExecutionRequest, LanguageTag, RunOutcome};
use crate::preview::{PreviewDocument, PreviewRenderer};

#[derive(Default)]
pub struct MarkupRunner {
    renderer: Option<Arc<PreviewRenderer>>,
}

impl MarkupRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also pushes every document to `renderer`.
    pub fn with_renderer(renderer: Arc<PreviewRenderer>) -> Self {
        Self { renderer: Some(renderer) }
    }
}

fn confirmation(language: &LanguageTag) -> &'static str {
    match language {
        LanguageTag::Html => "🌐 HTML rendered in preview panel",
        LanguageTag::Css => "🎨 CSS rendered in preview panel",
        _ => "🟨 JavaScript rendered in preview panel",
    }
}

#[async_trait]
impl Runner for MarkupRunner {
    fn name(&self) -> &'static str {
        "markup"
    }

    async fn run(&self, request: &ExecutionRequest) -> Result<RunOutcome, RunnerError> {
        let document = PreviewDocument::build(&request.source, &request.language).ok_or_else(|| {
            RunnerError::Fault(format!("no preview available for {}", request.language))
        })?;

        if let Some(renderer) = &self.renderer {
            renderer.display(document.clone());
        }

        Ok(RunOutcome {
            preview: Some(document),
            ..RunOutcome::success(confirmation(&request.language))
        })
    }
}
