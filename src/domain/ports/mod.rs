//! Port traits for external collaborators
//!
//! The workflow core never talks to a browser or the filesystem watch
//! machinery directly; it goes through these interfaces. Infrastructure
//! adapters satisfy them, and tests substitute doubles.

pub mod export_trigger;
pub mod file_watcher;
pub mod page_driver;

pub use export_trigger::{ExportTrigger, ScriptedTrigger};
pub use file_watcher::{FileEvent, FileWatchError, FileWatcher};
pub use page_driver::{NetworkEvent, PageDriver, PageDriverError};
