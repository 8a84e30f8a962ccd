//! Reportd - Periodic Report Export Daemon
//!
//! Reportd drives an external, unreliable UI surface through a recurring
//! export workflow (authenticate, trigger an export, wait for the file to
//! materialize, reset) and infers the completion of asynchronous side effects
//! purely from low-level event streams: network request lifecycle events for
//! page quiescence, filesystem lifecycle events for download settlement.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Models, port traits, and error taxonomy
//! - **Service Layer** (`services`): Completion detectors and the workflow engine
//! - **Infrastructure Layer** (`infrastructure`): Browser, filesystem, config,
//!   and logging adapters
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use reportd::services::WorkflowEngine;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Wire a page driver, a filesystem watch, and run the engine
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::error::{DownloadError, WorkflowError};
pub use domain::models::{
    BrowserConfig, Config, CycleOutcome, DownloadConfig, LoggingConfig, QuiescenceConfig,
    ScriptStep, TargetConfig, WorkflowConfig, WorkflowCycle, WorkflowState,
};
pub use domain::ports::{
    ExportTrigger, FileEvent, FileWatchError, FileWatcher, NetworkEvent, PageDriver,
    PageDriverError, ScriptedTrigger,
};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{DownloadCoordinator, QuiescenceDetector, QuiescenceOutcome, WorkflowEngine};
