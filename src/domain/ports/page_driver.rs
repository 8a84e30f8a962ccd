use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;

/// Network request lifecycle event emitted by the driven page.
///
/// Starts and finishes are not guaranteed to pair up: the surface may report
/// a finish for a request the subscriber never saw start, and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkEvent {
    /// A request left the page.
    RequestStarted,
    /// A request completed.
    RequestFinished,
    /// A request errored out; counts as settled for quiescence purposes.
    RequestFailed,
}

/// Error type for page driver operations
#[derive(Debug, Error)]
pub enum PageDriverError {
    #[error("element not found: {selector}")]
    ElementNotFound { selector: String },

    #[error("unsupported key: {0}")]
    UnsupportedKey(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Interface the workflow core needs from a page/browser driver
///
/// Implementations own the browser process and the page handle; the core
/// only issues actions and consumes the network event stream.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Load `url` and wait for the navigation to commit.
    ///
    /// Readiness beyond the load event is the quiescence detector's job, not
    /// the driver's.
    async fn navigate(&self, url: &str) -> Result<(), PageDriverError>;

    /// Click the element matching a CSS selector.
    async fn click(&self, selector: &str) -> Result<(), PageDriverError>;

    /// Type text into the element matching a CSS selector.
    async fn type_text(&self, selector: &str, text: &str) -> Result<(), PageDriverError>;

    /// Press a named key (`Enter`, `Tab`, `ArrowUp`, ...) `repeat` times.
    async fn press_key(&self, key: &str, repeat: u32) -> Result<(), PageDriverError>;

    /// Evaluate a JavaScript expression in the page, discarding the result.
    async fn evaluate(&self, script: &str) -> Result<(), PageDriverError>;

    /// Route subsequent downloads into `dir`.
    async fn set_download_target(&self, dir: &Path) -> Result<(), PageDriverError>;

    /// Reload the current page.
    async fn reload(&self) -> Result<(), PageDriverError>;

    /// Release the browser and all page resources.
    async fn close(&self) -> Result<(), PageDriverError>;

    /// Subscribe to the page's network lifecycle events.
    ///
    /// Each call returns an independent receiver; dropping it ends the
    /// subscription.
    fn network_events(&self) -> broadcast::Receiver<NetworkEvent>;
}
