use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(name = "neoncode", about = "Run, preview and review code snippets", version)]
pub struct Cli {
    /// Verbose logging (debug level) on stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Execute a snippet and print its output.
    Run(RunArgs),
    /// Review a snippet with the configured model plus local checks.
    Analyze(AnalyzeArgs),
    /// Write a live HTML preview of an HTML, CSS or JavaScript file.
    Preview(PreviewArgs),
}

#[derive(Args, Debug, Clone)]
#[command(group(ArgGroup::new("stdin_source").args(["stdin", "stdin_file"]).multiple(false)))]
pub struct RunArgs {
    /// Source file, or `-` / nothing to read piped stdin.
    #[arg(value_name = "FILE")]
    pub file: Option<String>,

    /// Language tag (javascript, python, html, css, ...). Defaults to the file extension.
    #[arg(short, long = "lang")]
    pub lang: Option<String>,

    /// Text fed to `input()` / `prompt()`, one line per call.
    #[arg(long)]
    pub stdin: Option<String>,

    /// Read the program's input lines from a file.
    #[arg(long = "stdin-file")]
    pub stdin_file: Option<PathBuf>,

    /// Print the result as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
#[command(group(ArgGroup::new("md_switch").args(["md", "no_md"]).multiple(false)))]
pub struct AnalyzeArgs {
    /// Source file, or `-` / nothing to read piped stdin.
    #[arg(value_name = "FILE")]
    pub file: Option<String>,

    #[arg(short, long = "lang")]
    pub lang: Option<String>,

    /// Model used for the review. Defaults to DEFAULT_MODEL.
    #[arg(long)]
    pub model: Option<String>,

    /// Render the review as Markdown.
    #[arg(long)]
    pub md: bool,
    /// Print the review as plain text.
    #[arg(long = "no-md")]
    pub no_md: bool,

    /// Print the bundle as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct PreviewArgs {
    #[arg(value_name = "FILE")]
    pub file: Option<String>,

    #[arg(short, long = "lang")]
    pub lang: Option<String>,

    /// Output HTML file. Defaults to PREVIEW_PATH.
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Keep running and re-render whenever FILE changes.
    #[arg(short, long)]
    pub watch: bool,

    /// Quiet period before a change is rendered. Defaults to PREVIEW_DEBOUNCE_MS.
    #[arg(long = "delay-ms")]
    pub delay_ms: Option<u64>,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_accepts_inline_stdin() {
        let cli = Cli::try_parse_from(["neoncode", "run", "greet.py", "--stdin", "Ada"]).unwrap();
        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.file.as_deref(), Some("greet.py"));
                assert_eq!(args.stdin.as_deref(), Some("Ada"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn stdin_sources_are_exclusive() {
        let parsed = Cli::try_parse_from([
            "neoncode", "run", "a.py", "--stdin", "x", "--stdin-file", "in.txt",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn markdown_switches_conflict() {
        assert!(Cli::try_parse_from(["neoncode", "analyze", "a.py", "--md", "--no-md"]).is_err());
    }
}
