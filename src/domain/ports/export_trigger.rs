use std::time::Duration;

use async_trait::async_trait;

use super::page_driver::{PageDriver, PageDriverError};
use crate::domain::models::ScriptStep;

/// Surface-specific capability that requests an export.
///
/// The traversal that coaxes an export out of a given surface is opaque to
/// the workflow engine: the engine only invokes it and classifies failures.
#[async_trait]
pub trait ExportTrigger: Send + Sync {
    /// Drive the action sequence that requests an export.
    async fn trigger(&self, driver: &dyn PageDriver) -> Result<(), PageDriverError>;
}

/// Trigger that replays a configured step list against the driver.
pub struct ScriptedTrigger {
    steps: Vec<ScriptStep>,
}

impl ScriptedTrigger {
    /// Create a trigger from a configured step list.
    pub fn new(steps: Vec<ScriptStep>) -> Self {
        Self { steps }
    }
}

#[async_trait]
impl ExportTrigger for ScriptedTrigger {
    async fn trigger(&self, driver: &dyn PageDriver) -> Result<(), PageDriverError> {
        for step in &self.steps {
            match step {
                ScriptStep::Click { selector } => driver.click(selector).await?,
                ScriptStep::Eval { script } => driver.evaluate(script).await?,
                ScriptStep::Key { key, repeat } => driver.press_key(key, *repeat).await?,
                ScriptStep::Pause { ms } => tokio::time::sleep(Duration::from_millis(*ms)).await,
            }
        }
        Ok(())
    }
}
