//! `neoncode run`: one request through the dispatcher.

use std::fs;
use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use is_terminal::IsTerminal;
use tracing::debug;

use neoncode::config::Config;
use neoncode::execution::dispatcher::Dispatcher;
use neoncode::execution::ExecutionRequest;
use neoncode::preview::{FileSurface, PreviewRenderer};
use neoncode::printer::{TextPrinter, Tone};
use neoncode::process::python::ProcessBootstrap;
use neoncode::runner::InterpreterRunner;
use neoncode::utils::{read_source, resolve_language};

use crate::cli::RunArgs;

pub async fn run(args: RunArgs, cfg: &Config) -> Result<()> {
    let input = read_source(args.file.as_deref())?;
    let language = resolve_language(args.lang.as_deref(), input.path.as_deref())?;
    input.require_code("No code to run")?;

    let stdin_text = match (&args.stdin, &args.stdin_file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => fs::read_to_string(path)
            .with_context(|| format!("reading stdin file {}", path.display()))?,
        (None, None) => String::new(),
    };

    let interpreter = Arc::new(InterpreterRunner::new(Arc::new(ProcessBootstrap::from_config(cfg))));
    let preview_path = cfg.preview_path();
    let renderer = Arc::new(PreviewRenderer::new(Arc::new(FileSurface::new(&preview_path))));
    let dispatcher = Dispatcher::new(interpreter).with_preview(renderer.clone());

    let request = ExecutionRequest::new(input.text, language, &stdin_text);
    debug!(lines = request.stdin.len(), "stdin lines supplied");
    let result = dispatcher.run(request).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        let printer = TextPrinter { colored: io::stdout().is_terminal() };
        printer.print_result(&result);
        if renderer.current().is_some() {
            printer.print(&format!("🔗 Preview: {}", preview_path.display()), Tone::Info);
        }
    }

    if !result.is_success() {
        std::process::exit(1);
    }
    Ok(())
}
