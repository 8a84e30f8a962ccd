use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::script::ScriptStep;

/// Main configuration structure for reportd
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Target surface and credentials
    #[serde(default)]
    pub target: TargetConfig,

    /// Download tracking configuration
    #[serde(default)]
    pub download: DownloadConfig,

    /// Outer loop configuration
    #[serde(default)]
    pub workflow: WorkflowConfig,

    /// Network quiescence detection configuration
    #[serde(default)]
    pub quiescence: QuiescenceConfig,

    /// Browser launch configuration
    #[serde(default)]
    pub browser: BrowserConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Target surface, credentials, and login choreography
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TargetConfig {
    /// URL of the report page to drive
    #[serde(default)]
    pub url: String,

    /// Login username
    #[serde(default)]
    pub username: String,

    /// Login password
    #[serde(default)]
    pub password: String,

    /// CSS selector of the username field
    #[serde(default = "default_username_selector")]
    pub username_selector: String,

    /// CSS selector of the password field
    #[serde(default = "default_password_selector")]
    pub password_selector: String,

    /// Steps that hand navigation off to the identity provider before
    /// credentials can be entered
    #[serde(default = "default_login_script")]
    pub login_script: Vec<ScriptStep>,

    /// How long to wait after submitting credentials before trusting the
    /// quiescence signal, in milliseconds
    #[serde(default = "default_post_login_pause_ms")]
    pub post_login_pause_ms: u64,
}

fn default_username_selector() -> String {
    "#username".to_string()
}

fn default_password_selector() -> String {
    "#password".to_string()
}

fn default_login_script() -> Vec<ScriptStep> {
    vec![
        ScriptStep::Pause { ms: 10_000 },
        ScriptStep::Click {
            selector: "#idp_section_buttons > button > span".to_string(),
        },
        ScriptStep::Key {
            key: "Enter".to_string(),
            repeat: 1,
        },
    ]
}

const fn default_post_login_pause_ms() -> u64 {
    28_000
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            username: String::new(),
            password: String::new(),
            username_selector: default_username_selector(),
            password_selector: default_password_selector(),
            login_script: default_login_script(),
            post_login_pause_ms: default_post_login_pause_ms(),
        }
    }
}

impl TargetConfig {
    /// Post-login settling pause as a [`Duration`].
    pub const fn post_login_pause(&self) -> Duration {
        Duration::from_millis(self.post_login_pause_ms)
    }
}

/// Download tracking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DownloadConfig {
    /// Directory finished artifacts are moved into
    #[serde(default = "default_root_dir")]
    pub root_dir: PathBuf,

    /// Session tag used to namespace the temp directory and renamed artifacts
    #[serde(default = "default_tag")]
    pub tag: String,

    /// Filename suffix the provider uses for in-progress downloads
    #[serde(default = "default_marker_suffix")]
    pub marker_suffix: String,

    /// Per-cycle settlement timeout, in milliseconds
    #[serde(default = "default_download_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_root_dir() -> PathBuf {
    PathBuf::from("/tmp/exports")
}

fn default_tag() -> String {
    "report".to_string()
}

fn default_marker_suffix() -> String {
    ".crdownload".to_string()
}

const fn default_download_timeout_ms() -> u64 {
    60_000
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
            tag: default_tag(),
            marker_suffix: default_marker_suffix(),
            timeout_ms: default_download_timeout_ms(),
        }
    }
}

impl DownloadConfig {
    /// Temp directory downloads land in before settlement.
    pub fn temp_dir(&self) -> PathBuf {
        self.root_dir.join(&self.tag)
    }

    /// Settlement timeout as a [`Duration`].
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Outer loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct WorkflowConfig {
    /// Delay between cycles, in milliseconds
    #[serde(default = "default_cycle_interval_ms")]
    pub cycle_interval_ms: u64,

    /// Consecutive failed cycles tolerated before aborting
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,

    /// Steps that request the export from the loaded report page
    #[serde(default = "default_export_script")]
    pub export_script: Vec<ScriptStep>,
}

const fn default_cycle_interval_ms() -> u64 {
    60_000
}

const fn default_max_consecutive_failures() -> u32 {
    3
}

fn default_export_script() -> Vec<ScriptStep> {
    vec![
        ScriptStep::Eval {
            script: concat!(
                "document.querySelector(\"#report > div.bFilterReport > ",
                "div.reportActions > input:nth-child(8)\").click();"
            )
            .to_string(),
        },
        ScriptStep::Pause { ms: 5_000 },
        ScriptStep::Key {
            key: "Tab".to_string(),
            repeat: 4,
        },
        ScriptStep::Key {
            key: "ArrowUp".to_string(),
            repeat: 1,
        },
        ScriptStep::Eval {
            script: "document.querySelector(\"#bottomButtonRow > input:nth-child(1)\").click();"
                .to_string(),
        },
    ]
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            cycle_interval_ms: default_cycle_interval_ms(),
            max_consecutive_failures: default_max_consecutive_failures(),
            export_script: default_export_script(),
        }
    }
}

impl WorkflowConfig {
    /// Inter-cycle delay as a [`Duration`].
    pub const fn cycle_interval(&self) -> Duration {
        Duration::from_millis(self.cycle_interval_ms)
    }
}

/// Network quiescence detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct QuiescenceConfig {
    /// How long traffic must stay at or below `max_inflight` to count as
    /// settled, in milliseconds
    #[serde(default = "default_quiet_period_ms")]
    pub quiet_period_ms: u64,

    /// Upper bound on any single quiescence wait, in milliseconds
    #[serde(default = "default_hard_timeout_ms")]
    pub hard_timeout_ms: u64,

    /// In-flight request count tolerated during the quiet window
    #[serde(default)]
    pub max_inflight: u32,
}

const fn default_quiet_period_ms() -> u64 {
    2_000
}

const fn default_hard_timeout_ms() -> u64 {
    20_000
}

impl Default for QuiescenceConfig {
    fn default() -> Self {
        Self {
            quiet_period_ms: default_quiet_period_ms(),
            hard_timeout_ms: default_hard_timeout_ms(),
            max_inflight: 0,
        }
    }
}

impl QuiescenceConfig {
    /// Quiet window as a [`Duration`].
    pub const fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.quiet_period_ms)
    }

    /// Hard timeout as a [`Duration`].
    pub const fn hard_timeout(&self) -> Duration {
        Duration::from_millis(self.hard_timeout_ms)
    }
}

/// Browser launch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BrowserConfig {
    /// Run the browser without a visible window
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Pass --no-sandbox to the browser (required in most containers)
    #[serde(default = "default_no_sandbox")]
    pub no_sandbox: bool,

    /// Additional browser command-line arguments
    #[serde(default)]
    pub extra_args: Vec<String>,
}

const fn default_headless() -> bool {
    true
}

const fn default_no_sandbox() -> bool {
    true
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            no_sandbox: default_no_sandbox(),
            extra_args: vec![],
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stderr only when unset
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            directory: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_dir_is_namespaced_by_tag() {
        let config = DownloadConfig {
            root_dir: PathBuf::from("/data/exports"),
            tag: "weekly".to_string(),
            ..DownloadConfig::default()
        };
        assert_eq!(config.temp_dir(), PathBuf::from("/data/exports/weekly"));
    }

    #[test]
    fn defaults_cover_every_section() {
        let config = Config::default();
        assert_eq!(config.quiescence.max_inflight, 0);
        assert_eq!(config.workflow.max_consecutive_failures, 3);
        assert_eq!(config.download.marker_suffix, ".crdownload");
        assert!(!config.target.login_script.is_empty());
        assert!(!config.workflow.export_script.is_empty());
    }
}
