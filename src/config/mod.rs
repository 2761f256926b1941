//! Configuration management for sizewatch.
//!
//! Supports configuration from:
//! - Command-line arguments (highest priority)
//! - Environment variables (`SIZEWATCH_*`)
//! - Built-in defaults (lowest priority)

mod settings;

pub use settings::Config;
