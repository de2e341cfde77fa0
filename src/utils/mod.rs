//! Source loading helpers shared by the CLI commands.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use is_terminal::IsTerminal;

use crate::execution::LanguageTag;

/// Source text plus the file it came from, if any.
#[derive(Debug, Clone)]
pub struct SourceInput {
    pub text: String,
    pub path: Option<PathBuf>,
}

/// Reads `file`, or piped stdin when `file` is absent or `-`.
pub fn read_source(file: Option<&str>) -> Result<SourceInput> {
    match file {
        Some(f) if f != "-" => read_file(Path::new(f)),
        _ => {
            let stdin = io::stdin();
            if stdin.is_terminal() {
                bail!("no source given: pass a FILE or pipe code on stdin");
            }
            let mut text = String::new();
            stdin.lock().read_to_string(&mut text).context("reading source from stdin")?;
            Ok(SourceInput { text, path: None })
        }
    }
}

pub fn read_file(path: &Path) -> Result<SourceInput> {
    if !path.exists() {
        bail!("Source file '{}' does not exist", path.display());
    }
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(SourceInput { text, path: Some(path.to_path_buf()) })
}

impl SourceInput {
    /// Fails with `message` when the source is empty or only whitespace.
    pub fn require_code(&self, message: &str) -> Result<()> {
        if self.text.trim().is_empty() {
            bail!("{message}");
        }
        Ok(())
    }
}

/// `--lang` wins; otherwise the file extension decides.
pub fn resolve_language(explicit: Option<&str>, path: Option<&Path>) -> Result<LanguageTag> {
    if let Some(lang) = explicit {
        return Ok(LanguageTag::parse(lang));
    }
    let ext = path
        .and_then(|p| p.extension())
        .and_then(|e| e.to_str());
    match ext {
        Some(ext) => Ok(LanguageTag::from_extension(ext)),
        None => bail!("cannot infer the language: pass --lang"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_language_wins() {
        let lang = resolve_language(Some("py"), Some(Path::new("a.js"))).unwrap();
        assert_eq!(lang, LanguageTag::Python);
    }

    #[test]
    fn extension_decides_otherwise() {
        assert_eq!(resolve_language(None, Some(Path::new("x/index.htm"))).unwrap(), LanguageTag::Html);
        assert_eq!(
            resolve_language(None, Some(Path::new("main.go"))).unwrap(),
            LanguageTag::Other("go".into())
        );
        assert!(resolve_language(None, Some(Path::new("Makefile"))).is_err());
        assert!(resolve_language(None, None).is_err());
    }

    #[test]
    fn whitespace_only_source_is_rejected() {
        let blank = SourceInput { text: " \n\t\n".into(), path: None };
        let err = blank.require_code("No code to run").unwrap_err();
        assert_eq!(err.to_string(), "No code to run");

        let code = SourceInput { text: "print(1)".into(), path: None };
        assert!(code.require_code("No code to run").is_ok());
    }

    #[test]
    fn reads_existing_files_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.py");
        fs::write(&path, "print('hi')\n").unwrap();

        let input = read_file(&path).unwrap();
        assert_eq!(input.text, "print('hi')\n");
        assert_eq!(input.path.as_deref(), Some(path.as_path()));
        assert!(read_file(&dir.path().join("missing.py")).is_err());
    }
}
