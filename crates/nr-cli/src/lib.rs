//! NINA night report CLI library.
//!
//! This crate provides the CLI interface for summarizing NINA session logs.

mod cli;
pub mod commands;
mod config;

pub use cli::Cli;
pub use config::{Config, default_log_path};
