//! The outer export workflow: authenticate once, then loop export cycles
//! until a fatal error or a shutdown signal.
//!
//! The engine sequences scripted driver actions with the two completion
//! detectors and is the single place that classifies failures into retryable
//! versus fatal. It never inspects raw events; coordination with the
//! detectors is await-and-resolve only.

use std::sync::Arc;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::error::WorkflowError;
use crate::domain::models::{Config, CycleOutcome, WorkflowCycle, WorkflowState};
use crate::domain::ports::{ExportTrigger, PageDriver, ScriptedTrigger};
use crate::services::download::DownloadCoordinator;
use crate::services::quiescence::{QuiescenceDetector, QuiescenceOutcome};

/// Drives the periodic export workflow against one page.
///
/// At most one cycle is active at a time; the loop never pipelines two export
/// attempts. A fresh quiescence detector is created per wait so no stale
/// counter leaks between cycles.
pub struct WorkflowEngine {
    driver: Arc<dyn PageDriver>,
    trigger: Arc<dyn ExportTrigger>,
    downloads: DownloadCoordinator,
    config: Config,
    shutdown: CancellationToken,
    session_id: Uuid,
    state: WorkflowState,
    cycle_ordinal: u64,
    consecutive_failures: u32,
}

impl WorkflowEngine {
    /// Create an engine over a driver, an export trigger, and a download
    /// coordinator.
    pub fn new(
        driver: Arc<dyn PageDriver>,
        trigger: Arc<dyn ExportTrigger>,
        downloads: DownloadCoordinator,
        config: Config,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            driver,
            trigger,
            downloads,
            config,
            shutdown,
            session_id: Uuid::new_v4(),
            state: WorkflowState::Init,
            cycle_ordinal: 0,
            consecutive_failures: 0,
        }
    }

    /// Run until a fatal error or the shutdown signal.
    ///
    /// Browser resources are released on every exit path; release failures
    /// are logged but never mask the original cause.
    pub async fn run(&mut self) -> Result<(), WorkflowError> {
        info!(session = %self.session_id, "starting export workflow");

        if let Err(err) = self.initialize().await {
            self.terminate().await;
            return Err(err);
        }

        let result = self.run_loop().await;
        self.terminate().await;
        result
    }

    /// Run a single cycle after initialization, then release resources.
    ///
    /// A retryable failure is reported in the log but is not an error for a
    /// one-shot run.
    pub async fn run_once(&mut self) -> Result<(), WorkflowError> {
        info!(session = %self.session_id, "starting one-shot export");

        if let Err(err) = self.initialize().await {
            self.terminate().await;
            return Err(err);
        }

        let outcome = self.run_cycle().await;
        self.terminate().await;
        match outcome {
            CycleOutcome::Success { artifact } => {
                info!(artifact = %artifact.display(), "one-shot export complete");
                Ok(())
            }
            CycleOutcome::Retryable { reason } => {
                warn!(reason = %reason, "one-shot export did not complete");
                Ok(())
            }
            CycleOutcome::Fatal(err) => Err(err),
        }
    }

    /// Acquire the surface: navigate, SSO handoff, credentials, download
    /// routing. Any failure here is fatal; authentication failure is assumed
    /// non-transient within a single run.
    pub async fn initialize(&mut self) -> Result<(), WorkflowError> {
        let target = self.config.target.clone();

        self.driver
            .navigate(&target.url)
            .await
            .map_err(WorkflowError::Authentication)?;
        self.await_quiescence().await;

        self.transition(WorkflowState::Authenticating);
        let login = ScriptedTrigger::new(target.login_script.clone());
        login
            .trigger(self.driver.as_ref())
            .await
            .map_err(WorkflowError::Authentication)?;
        self.await_quiescence().await;

        self.driver
            .type_text(&target.username_selector, &target.username)
            .await
            .map_err(WorkflowError::Authentication)?;
        self.driver
            .type_text(&target.password_selector, &target.password)
            .await
            .map_err(WorkflowError::Authentication)?;
        self.driver
            .press_key("Enter", 1)
            .await
            .map_err(WorkflowError::Authentication)?;
        info!("credentials submitted, waiting for the surface to load");
        self.pause(target.post_login_pause()).await;
        self.await_quiescence().await;

        self.driver
            .set_download_target(self.downloads.temp_dir())
            .await
            .map_err(WorkflowError::Authentication)?;

        self.transition(WorkflowState::Ready);
        Ok(())
    }

    /// One full export cycle: trigger the export, wait for settlement,
    /// classify the outcome.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        self.cycle_ordinal += 1;
        let cycle = WorkflowCycle::new(self.cycle_ordinal);
        info!(cycle = cycle.ordinal, "cycle started");

        self.transition(WorkflowState::Exporting);
        if let Err(err) = self.trigger.trigger(self.driver.as_ref()).await {
            return self.classify_retryable(format!("export sequence failed: {err}"));
        }

        self.transition(WorkflowState::AwaitingDownload);
        let timeout = self.config.download.timeout();
        match self.downloads.await_settlement(timeout).await {
            Ok(artifact) => {
                self.consecutive_failures = 0;
                info!(
                    cycle = cycle.ordinal,
                    artifact = %artifact.display(),
                    elapsed_ms = cycle.elapsed_ms(),
                    "cycle succeeded"
                );
                CycleOutcome::Success { artifact }
            }
            Err(err) if err.is_timeout() => self.classify_retryable(err.to_string()),
            Err(err) => CycleOutcome::Fatal(WorkflowError::Download(err)),
        }
    }

    /// Main loop: cycle, reset, sleep, repeat. Aborts the in-flight cycle on
    /// shutdown.
    async fn run_loop(&mut self) -> Result<(), WorkflowError> {
        let shutdown = self.shutdown.clone();
        loop {
            if shutdown.is_cancelled() {
                info!("shutdown requested, stopping workflow");
                return Ok(());
            }

            let outcome = tokio::select! {
                () = shutdown.cancelled() => {
                    info!("shutdown requested, aborting in-flight cycle");
                    return Ok(());
                }
                outcome = self.run_cycle() => outcome,
            };
            debug!(outcome = outcome.as_str(), "cycle finished");

            match outcome {
                CycleOutcome::Success { .. } | CycleOutcome::Retryable { .. } => {
                    self.transition(WorkflowState::Reloading);
                    if let Err(err) = self.driver.reload().await {
                        if let CycleOutcome::Fatal(fatal) =
                            self.classify_retryable(format!("page reload failed: {err}"))
                        {
                            return Err(fatal);
                        }
                    }
                    debug!(
                        delay_ms = self.config.workflow.cycle_interval_ms,
                        "sleeping between cycles"
                    );
                    self.pause(self.config.workflow.cycle_interval()).await;
                    self.transition(WorkflowState::Ready);
                }
                CycleOutcome::Fatal(err) => return Err(err),
            }
        }
    }

    /// Count a retryable failure against the consecutive-failure budget.
    fn classify_retryable(&mut self, reason: String) -> CycleOutcome {
        self.consecutive_failures += 1;
        warn!(
            failures = self.consecutive_failures,
            max = self.config.workflow.max_consecutive_failures,
            reason = %reason,
            "cycle failed"
        );
        if self.consecutive_failures > self.config.workflow.max_consecutive_failures {
            CycleOutcome::Fatal(WorkflowError::RetriesExhausted {
                failures: self.consecutive_failures,
            })
        } else {
            CycleOutcome::Retryable { reason }
        }
    }

    /// Bounded wait for page network traffic to settle. Both outcomes allow
    /// the workflow to proceed.
    async fn await_quiescence(&self) {
        let quiescence = &self.config.quiescence;
        let detector = QuiescenceDetector::new(self.driver.network_events());
        match detector
            .await_quiescence(
                quiescence.quiet_period(),
                quiescence.hard_timeout(),
                quiescence.max_inflight,
            )
            .await
        {
            QuiescenceOutcome::Settled => debug!("page settled"),
            QuiescenceOutcome::TimedOut => {
                debug!("page still active at hard timeout, proceeding");
            }
        }
    }

    /// Sleep that returns early on shutdown.
    async fn pause(&self, duration: std::time::Duration) {
        tokio::select! {
            () = self.shutdown.cancelled() => {}
            () = sleep(duration) => {}
        }
    }

    fn transition(&mut self, to: WorkflowState) {
        info!(from = self.state.as_str(), to = to.as_str(), "workflow state change");
        self.state = to;
    }

    /// Enter the terminal state and release browser resources.
    async fn terminate(&mut self) {
        self.transition(WorkflowState::Terminated);
        if let Err(err) = self.driver.close().await {
            warn!(error = %err, "failed to close browser cleanly");
        } else {
            info!("browser closed");
        }
    }
}
