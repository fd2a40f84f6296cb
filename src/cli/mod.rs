//! CLI command handling

pub mod run;

pub use run::*;
