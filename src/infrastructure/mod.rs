//! Infrastructure layer module
//!
//! This module contains all infrastructure adapters and external integrations:
//! - Browser driver (headless Chrome over CDP)
//! - Filesystem watch adapter
//! - Configuration management
//! - Logging infrastructure
//!
//! Infrastructure implementations satisfy the port traits defined in the
//! domain layer.

pub mod browser;
pub mod config;
pub mod logging;
pub mod watcher;
