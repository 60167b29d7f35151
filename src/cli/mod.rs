//! Command line interface module
//!
//! Argument parsing for the `layer-puller` binary and the [`Runner`] that
//! turns a parsed command into registry, download or sandbox calls.

pub mod args;
pub mod runner;

pub use args::{Args, Command};
pub use runner::Runner;
