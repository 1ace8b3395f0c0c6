//! Configuration management module
//!
//! Provides TOML-based configuration for the resolution core, following the
//! rest of this codebase's layered-default pattern.

mod config;

pub use config::*;
