//! File-backed preview surface: the preview is a single HTML file rewritten on every render.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::warn;

use super::{PreviewDocument, PreviewSurface};

const PLACEHOLDER_HTML: &str = "<!DOCTYPE html><html><head><title>Preview</title></head><body style=\"display:flex;align-items:center;justify-content:center;height:100vh;font-family:sans-serif;color:#888\"><p>Live preview is available for HTML, CSS and JavaScript.</p></body></html>";

#[derive(Debug, Clone)]
pub struct FileSurface {
    path: PathBuf,
}

impl FileSurface {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes next to the target then renames, so readers never see a half-written file.
    fn replace_contents(&self, html: &str) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating preview directory {}", dir.display()))?;
        }
        let staging = self.path.with_extension("html.partial");
        fs::write(&staging, html).with_context(|| format!("writing {}", staging.display()))?;
        fs::rename(&staging, &self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }
}

impl PreviewSurface for FileSurface {
    fn render(&self, document: &PreviewDocument) -> Result<()> {
        self.replace_contents(&document.html_content)
    }

    fn show_placeholder(&self) {
        if let Err(e) = self.replace_contents(PLACEHOLDER_HTML) {
            warn!(error = %e, path = %self.path.display(), "failed to write preview placeholder");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::LanguageTag;

    #[test]
    fn render_overwrites_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let surface = FileSurface::new(dir.path().join("nested").join("preview.html"));

        let first = PreviewDocument::build("<h1>one</h1>", &LanguageTag::Html).unwrap();
        surface.render(&first).unwrap();
        let second = PreviewDocument::build("<h1>two</h1>", &LanguageTag::Html).unwrap();
        surface.render(&second).unwrap();

        assert_eq!(fs::read_to_string(surface.path()).unwrap(), "<h1>two</h1>");
    }

    #[test]
    fn placeholder_replaces_previous_document() {
        let dir = tempfile::tempdir().unwrap();
        let surface = FileSurface::new(dir.path().join("preview.html"));
        surface
            .render(&PreviewDocument::build("<h1>x</h1>", &LanguageTag::Html).unwrap())
            .unwrap();
        surface.show_placeholder();
        let text = fs::read_to_string(surface.path()).unwrap();
        assert!(text.contains("Live preview is available"));
    }
}
