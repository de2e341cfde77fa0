//! Live preview: document construction and the debounced renderer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::execution::LanguageTag;

pub mod surface;

pub use surface::FileSurface;

/// A complete renderable HTML document. Always replaces whatever was shown before.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewDocument {
    pub html_content: String,
    pub source_language: LanguageTag,
    pub generated_at: DateTime<Utc>,
}

impl PreviewDocument {
    /// Builds the document for a previewable language, `None` otherwise.
    pub fn build(source: &str, language: &LanguageTag) -> Option<Self> {
        let html_content = match language {
            LanguageTag::Html => source.to_string(),
            LanguageTag::Css => format!(
                "<!DOCTYPE html><html><head><style>{source}</style></head><body><h1>CSS Preview</h1><p>Your styles are applied here.</p></body></html>"
            ),
            LanguageTag::Javascript => format!(
                "<!DOCTYPE html><html><head></head><body><h1>JavaScript Preview</h1><div id=\"output\"></div><script>{source}</script></body></html>"
            ),
            _ => return None,
        };
        Some(Self {
            html_content,
            source_language: language.clone(),
            generated_at: Utc::now(),
        })
    }
}

/// The single rendering surface the preview is shown on.
pub trait PreviewSurface: Send + Sync {
    /// Replaces all content of the surface with `document`.
    fn render(&self, document: &PreviewDocument) -> anyhow::Result<()>;

    /// Hides the surface and shows the idle placeholder.
    fn show_placeholder(&self);
}

/// Owns the current preview and the pending debounce timer.
pub struct PreviewRenderer {
    surface: Arc<dyn PreviewSurface>,
    current: Mutex<Option<PreviewDocument>>,
    pending: Mutex<Option<JoinHandle<()>>>,
    auto_preview: AtomicBool,
}

impl PreviewRenderer {
    pub fn new(surface: Arc<dyn PreviewSurface>) -> Self {
        Self {
            surface,
            current: Mutex::new(None),
            pending: Mutex::new(None),
            auto_preview: AtomicBool::new(true),
        }
    }

    /// Renders immediately. Non-previewable languages show the placeholder.
    pub fn update(&self, source: &str, language: &LanguageTag) {
        match PreviewDocument::build(source, language) {
            Some(document) => self.display(document),
            None => self.clear(),
        }
    }

    /// Shows an already built document, falling back to the placeholder if the surface fails.
    pub fn display(&self, document: PreviewDocument) {
        match self.surface.render(&document) {
            Ok(()) => {
                debug!(language = %document.source_language, bytes = document.html_content.len(), "preview rendered");
                *lock(&self.current) = Some(document);
            }
            Err(e) => {
                warn!(error = %e, "preview render failed, showing placeholder");
                self.clear();
            }
        }
    }

    fn clear(&self) {
        *lock(&self.current) = None;
        self.surface.show_placeholder();
    }

    /// Trailing-edge debounce: replaces any pending render with one firing after `delay`
    /// of quiet. Returns whether a render was scheduled.
    ///
    /// Must be called from within a tokio runtime.
    pub fn auto_schedule(self: &Arc<Self>, source: String, language: LanguageTag, delay: Duration) -> bool {
        if !self.auto_preview_enabled() || !language.is_previewable() {
            return false;
        }
        let renderer = Arc::downgrade(self);
        let mut pending = lock(&self.pending);
        if let Some(previous) = pending.take() {
            previous.abort();
        }
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(renderer) = renderer.upgrade() {
                renderer.update(&source, &language);
            }
        }));
        true
    }

    /// Drops a scheduled render that has not fired yet.
    pub fn cancel_pending(&self) {
        if let Some(handle) = lock(&self.pending).take() {
            handle.abort();
        }
    }

    pub fn current(&self) -> Option<PreviewDocument> {
        lock(&self.current).clone()
    }

    pub fn set_auto_preview(&self, enabled: bool) {
        self.auto_preview.store(enabled, Ordering::SeqCst);
        if !enabled {
            self.cancel_pending();
        }
    }

    pub fn auto_preview_enabled(&self) -> bool {
        self.auto_preview.load(Ordering::SeqCst)
    }
}

impl Drop for PreviewRenderer {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingSurface {
        renders: Mutex<Vec<String>>,
        placeholders: Mutex<usize>,
        fail: AtomicBool,
    }

    impl PreviewSurface for RecordingSurface {
        fn render(&self, document: &PreviewDocument) -> anyhow::Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                anyhow::bail!("surface gone");
            }
            self.renders.lock().unwrap().push(document.html_content.clone());
            Ok(())
        }

        fn show_placeholder(&self) {
            *self.placeholders.lock().unwrap() += 1;
        }
    }

    fn renderer() -> (Arc<RecordingSurface>, Arc<PreviewRenderer>) {
        let surface = Arc::new(RecordingSurface::default());
        let renderer = Arc::new(PreviewRenderer::new(surface.clone()));
        (surface, renderer)
    }

    #[test]
    fn html_is_used_verbatim() {
        let doc = PreviewDocument::build("<h1>Hi</h1>", &LanguageTag::Html).unwrap();
        assert_eq!(doc.html_content, "<h1>Hi</h1>");
        assert_eq!(doc.source_language, LanguageTag::Html);
    }

    #[test]
    fn css_and_script_are_wrapped() {
        let css = PreviewDocument::build("h1{color:red}", &LanguageTag::Css).unwrap();
        assert!(css.html_content.contains("<style>h1{color:red}</style>"));
        assert!(css.html_content.contains("CSS Preview"));

        let js = PreviewDocument::build("alert(1)", &LanguageTag::Javascript).unwrap();
        assert!(js.html_content.contains("<script>alert(1)</script>"));
        assert!(js.html_content.contains("<div id=\"output\"></div>"));

        assert!(PreviewDocument::build("x", &LanguageTag::Python).is_none());
    }

    #[test]
    fn update_replaces_document_wholesale() {
        let (surface, renderer) = renderer();
        renderer.update("<p>one</p>", &LanguageTag::Html);
        renderer.update("<p>two</p>", &LanguageTag::Html);
        assert_eq!(renderer.current().unwrap().html_content, "<p>two</p>");
        assert_eq!(surface.renders.lock().unwrap().len(), 2);
    }

    #[test]
    fn unsupported_language_shows_placeholder() {
        let (surface, renderer) = renderer();
        renderer.update("<p>one</p>", &LanguageTag::Html);
        renderer.update("print(1)", &LanguageTag::Python);
        assert!(renderer.current().is_none());
        assert_eq!(*surface.placeholders.lock().unwrap(), 1);
    }

    #[test]
    fn render_failure_degrades_to_placeholder() {
        let (surface, renderer) = renderer();
        surface.fail.store(true, Ordering::SeqCst);
        renderer.update("<p>x</p>", &LanguageTag::Html);
        assert!(renderer.current().is_none());
        assert_eq!(*surface.placeholders.lock().unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_edits_collapses_into_one_render() {
        let (surface, renderer) = renderer();
        let delay = Duration::from_millis(500);
        for i in 0..10 {
            assert!(renderer.auto_schedule(format!("<p>{i}</p>"), LanguageTag::Html, delay));
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(surface.renders.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(*surface.renders.lock().unwrap(), vec!["<p>9</p>".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn separated_edits_render_separately() {
        let (surface, renderer) = renderer();
        let delay = Duration::from_millis(50);
        renderer.auto_schedule("<p>a</p>".into(), LanguageTag::Html, delay);
        tokio::time::sleep(Duration::from_millis(100)).await;
        renderer.auto_schedule("<p>b</p>".into(), LanguageTag::Html, delay);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(surface.renders.lock().unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn non_previewable_and_disabled_scheduling_is_a_noop() {
        let (surface, renderer) = renderer();
        assert!(!renderer.auto_schedule("print(1)".into(), LanguageTag::Python, Duration::ZERO));

        renderer.set_auto_preview(false);
        assert!(!renderer.auto_schedule("<p/>".into(), LanguageTag::Html, Duration::ZERO));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(surface.renders.lock().unwrap().is_empty());
        assert_eq!(*surface.placeholders.lock().unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_pending_drops_scheduled_render() {
        let (surface, renderer) = renderer();
        renderer.auto_schedule("<p/>".into(), LanguageTag::Html, Duration::from_millis(100));
        renderer.cancel_pending();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(surface.renders.lock().unwrap().is_empty());
    }
}
