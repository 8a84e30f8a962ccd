//! Common test utilities for integration tests
//!
//! Provides the fake page driver and config fixtures shared across the
//! integration test files.

// not every test binary exercises every helper
#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::broadcast;

use reportd::domain::models::{
    Config, DownloadConfig, QuiescenceConfig, ScriptStep, TargetConfig, WorkflowConfig,
};
use reportd::domain::ports::{NetworkEvent, PageDriver, PageDriverError};

/// In-memory page driver that records every action and always succeeds.
///
/// Its network event stream stays silent, so quiescence waits settle after
/// one quiet period.
pub struct FakePageDriver {
    calls: Mutex<Vec<String>>,
    events_tx: broadcast::Sender<NetworkEvent>,
}

impl FakePageDriver {
    pub fn new() -> Arc<Self> {
        let (events_tx, _) = broadcast::channel(64);
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            events_tx,
        })
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    /// Every recorded action, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// How many recorded actions start with `prefix`.
    pub fn count_of(&self, prefix: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }
}

#[async_trait]
impl PageDriver for FakePageDriver {
    async fn navigate(&self, url: &str) -> Result<(), PageDriverError> {
        self.record(format!("navigate:{url}"));
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<(), PageDriverError> {
        self.record(format!("click:{selector}"));
        Ok(())
    }

    async fn type_text(&self, selector: &str, _text: &str) -> Result<(), PageDriverError> {
        self.record(format!("type:{selector}"));
        Ok(())
    }

    async fn press_key(&self, key: &str, repeat: u32) -> Result<(), PageDriverError> {
        self.record(format!("key:{key}x{repeat}"));
        Ok(())
    }

    async fn evaluate(&self, _script: &str) -> Result<(), PageDriverError> {
        self.record("eval".to_string());
        Ok(())
    }

    async fn set_download_target(&self, dir: &Path) -> Result<(), PageDriverError> {
        self.record(format!("download_target:{}", dir.display()));
        Ok(())
    }

    async fn reload(&self) -> Result<(), PageDriverError> {
        self.record("reload".to_string());
        Ok(())
    }

    async fn close(&self) -> Result<(), PageDriverError> {
        self.record("close".to_string());
        Ok(())
    }

    fn network_events(&self) -> broadcast::Receiver<NetworkEvent> {
        self.events_tx.subscribe()
    }
}

/// Config tuned for fast tests: tiny quiescence windows, no post-login pause,
/// short download timeout and inter-cycle delay.
pub fn test_config(root: &Path) -> Config {
    Config {
        target: TargetConfig {
            url: "https://surface.test/report".to_string(),
            username: "user".to_string(),
            password: "secret".to_string(),
            login_script: vec![ScriptStep::Click {
                selector: "#sso".to_string(),
            }],
            post_login_pause_ms: 0,
            ..TargetConfig::default()
        },
        download: DownloadConfig {
            root_dir: root.to_path_buf(),
            tag: "test".to_string(),
            timeout_ms: 200,
            ..DownloadConfig::default()
        },
        workflow: WorkflowConfig {
            cycle_interval_ms: 10,
            max_consecutive_failures: 3,
            export_script: vec![ScriptStep::Click {
                selector: "#export".to_string(),
            }],
        },
        quiescence: QuiescenceConfig {
            quiet_period_ms: 10,
            hard_timeout_ms: 50,
            max_inflight: 0,
        },
        ..Config::default()
    }
}

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
