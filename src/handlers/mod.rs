pub mod analyze;
pub mod preview;
pub mod run;
