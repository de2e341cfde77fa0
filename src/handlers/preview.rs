//! `neoncode preview`: render once, optionally keep re-rendering on file changes.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use notify::{Event, RecursiveMode, Watcher};
use owo_colors::OwoColorize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use neoncode::config::Config;
use neoncode::execution::LanguageTag;
use neoncode::preview::{FileSurface, PreviewRenderer};
use neoncode::utils::{read_source, resolve_language};

use crate::cli::PreviewArgs;

pub async fn run(args: PreviewArgs, cfg: &Config) -> Result<()> {
    if args.watch && matches!(args.file.as_deref(), None | Some("-")) {
        bail!("--watch needs a FILE to watch");
    }

    let input = read_source(args.file.as_deref())?;
    let language = resolve_language(args.lang.as_deref(), input.path.as_deref())?;
    let out = args.out.clone().unwrap_or_else(|| cfg.preview_path());

    let renderer = Arc::new(PreviewRenderer::new(Arc::new(FileSurface::new(&out))));
    renderer.set_auto_preview(cfg.get_bool("AUTO_PREVIEW"));
    renderer.update(&input.text, &language);
    report(&renderer, &language, &out);

    let Some(path) = input.path.filter(|_| args.watch) else {
        return Ok(());
    };

    let delay = args
        .delay_ms
        .map(std::time::Duration::from_millis)
        .unwrap_or_else(|| cfg.get_millis("PREVIEW_DEBOUNCE_MS", 500));
    let target = path
        .canonicalize()
        .with_context(|| format!("resolving {}", path.display()))?;
    let watch_dir = target
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let (tx, mut rx) = mpsc::unbounded_channel();
    let filter = target.clone();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        if let Ok(event) = res {
            let touches_target = event.paths.iter().any(|p| p == &filter);
            if touches_target && (event.kind.is_modify() || event.kind.is_create()) {
                let _ = tx.send(());
            }
        }
    })
    .map_err(|e| anyhow!("Failed to create file watcher: {}", e))?;
    watcher
        .watch(&watch_dir, RecursiveMode::NonRecursive)
        .map_err(|e| anyhow!("Failed to watch {}: {}", watch_dir.display(), e))?;

    println!("{}", "Watching for changes... (Ctrl+C to stop)".dimmed());
    while rx.recv().await.is_some() {
        let text = match fs::read_to_string(&target) {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, path = %target.display(), "could not re-read watched file");
                continue;
            }
        };
        debug!(bytes = text.len(), "watched file changed");
        if !renderer.auto_schedule(text.clone(), language.clone(), delay) {
            renderer.update(&text, &language);
        }
    }
    Ok(())
}

fn report(renderer: &PreviewRenderer, language: &LanguageTag, out: &Path) {
    if renderer.current().is_some() {
        println!("{} {}", "🔗 Preview written to".green(), out.display());
    } else {
        println!(
            "{} {}",
            format!("{} has no live preview; placeholder written to", language.display_name()).yellow(),
            out.display()
        );
    }
}
