//! Usage analytics for a local Claude Code data folder.
//!
//! [`collect_stats`] scans a `.claude` directory once, folds every event
//! stream in parallel, reads the side files and returns one [`ClaudeStats`]
//! document. Missing or malformed inputs degrade to partial results; only a
//! missing root directory is an error.

pub mod api_errors;
pub mod config;
pub mod cost;
pub mod depth;
pub mod display;
pub mod format;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod parser;
pub mod projects;
pub mod scanner;
pub mod side_files;
pub mod stats_cache;
pub mod thinking;
pub mod tools;
pub mod turns;

pub use config::Config;
pub use metrics::{assemble_stats, collect_stats};
pub use models::ClaudeStats;
