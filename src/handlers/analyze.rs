//! `neoncode analyze`: remote review plus local findings.

use std::io;
use std::sync::Arc;

use anyhow::Result;
use is_terminal::IsTerminal;
use owo_colors::OwoColorize;
use tracing::warn;

use neoncode::analysis::{AnalysisOrchestrator, LlmInsight};
use neoncode::config::Config;
use neoncode::printer::{print_bundle, TextPrinter, Tone};
use neoncode::utils::{read_source, resolve_language};

use crate::cli::AnalyzeArgs;

pub async fn run(args: AnalyzeArgs, cfg: &Config) -> Result<()> {
    let input = read_source(args.file.as_deref())?;
    let language = resolve_language(args.lang.as_deref(), input.path.as_deref())?;
    input.require_code("Please write some code to analyze")?;

    let timeout = cfg.get_secs("ANALYSIS_TIMEOUT", 30);
    let orchestrator = match LlmInsight::from_config(cfg, args.model.clone()) {
        Ok(provider) => AnalysisOrchestrator::new(Arc::new(provider), timeout),
        Err(e) => {
            warn!(error = %e, "model client unavailable, running local analysis only");
            AnalysisOrchestrator::offline()
        }
    };

    if io::stderr().is_terminal() {
        eprintln!("{}", "🧠 Analyzing code with AI...".cyan());
    }
    let bundle = orchestrator.analyze(&input.text, &language).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&bundle)?);
        return Ok(());
    }

    let md = if args.no_md {
        false
    } else if args.md {
        true
    } else {
        cfg.get_bool("PRETTIFY_MARKDOWN")
    };
    print_bundle(&bundle, md);
    if bundle.degraded {
        let printer = TextPrinter { colored: io::stdout().is_terminal() };
        printer.print("⚠️ AI insight unavailable; showing local analysis only.", Tone::Warning);
    }
    Ok(())
}
