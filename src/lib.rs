//! neoncode: run snippets in several languages from one entry point.
//!
//! JavaScript is evaluated by an embedded engine, Python by a lazily started interpreter
//! process, HTML and CSS become preview documents, and everything else gets a structural
//! report. Code can also be sent for review to a chat completion model.

pub mod analysis;
pub mod config;
pub mod error;
pub mod execution;
pub mod llm;
pub mod preview;
pub mod printer;
pub mod process;
pub mod runner;
pub mod utils;
