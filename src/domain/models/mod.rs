//! Domain models for the export workflow

pub mod config;
pub mod cycle;
pub mod script;

pub use config::{
    BrowserConfig, Config, DownloadConfig, LoggingConfig, QuiescenceConfig, TargetConfig,
    WorkflowConfig,
};
pub use cycle::{CycleOutcome, WorkflowCycle, WorkflowState};
pub use script::ScriptStep;
