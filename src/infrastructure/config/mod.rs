//! Configuration management
//!
//! Hierarchical configuration loading with figment: programmatic defaults,
//! a YAML file, and `REPORTD_`-prefixed environment variables.

pub mod loader;

pub use loader::{ConfigError, ConfigLoader};
