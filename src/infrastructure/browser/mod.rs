//! chromiumoxide-backed page driver.
//!
//! Owns the headless Chrome process and one page, translates the
//! [`PageDriver`] actions into CDP commands, and forwards the page's request
//! lifecycle events into a broadcast channel the quiescence detector
//! subscribes to.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as LaunchConfig};
use chromiumoxide::cdp::browser_protocol::input::{DispatchKeyEventParams, DispatchKeyEventType};
use chromiumoxide::cdp::browser_protocol::network::{
    EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent,
};
use chromiumoxide::cdp::browser_protocol::browser::{
    SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::domain::models::BrowserConfig;
use crate::domain::ports::{NetworkEvent, PageDriver, PageDriverError};

/// Delay between repeated key presses; fast enough to feel like typing, slow
/// enough for sluggish focus handling.
const KEY_REPEAT_DELAY: Duration = Duration::from_millis(200);

/// Capacity of the network event fan-out. Bursty pages can emit hundreds of
/// requests during a reload; a lagging subscriber only degrades the
/// quiescence heuristic, it never blocks the forwarders.
const NETWORK_EVENT_CAPACITY: usize = 1024;

/// Page driver over a headless Chrome instance.
pub struct ChromiumDriver {
    browser: Mutex<Browser>,
    page: Page,
    events_tx: broadcast::Sender<NetworkEvent>,
    tasks: Vec<JoinHandle<()>>,
}

impl ChromiumDriver {
    /// Launch the browser and open a blank page.
    pub async fn launch(settings: &BrowserConfig) -> Result<Self, PageDriverError> {
        let mut builder = LaunchConfig::builder();
        if !settings.headless {
            builder = builder.with_head();
        }
        if settings.no_sandbox {
            builder = builder.arg("--no-sandbox");
        }
        for arg in &settings.extra_args {
            builder = builder.arg(arg);
        }
        let launch_config = builder.build().map_err(PageDriverError::Protocol)?;

        let (browser, mut handler) = Browser::launch(launch_config)
            .await
            .map_err(|error| PageDriverError::Protocol(error.to_string()))?;
        debug!("browser launched");

        let handler_task = tokio::spawn(async move {
            while let Some(result) = handler.next().await {
                if let Err(error) = result {
                    trace!(%error, "browser handler event");
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|error| PageDriverError::Protocol(error.to_string()))?;
        debug!("blank page opened");

        let (events_tx, _) = broadcast::channel(NETWORK_EVENT_CAPACITY);
        let mut tasks = vec![handler_task];

        let mut started = page
            .event_listener::<EventRequestWillBeSent>()
            .await
            .map_err(|error| PageDriverError::Protocol(error.to_string()))?;
        let tx = events_tx.clone();
        tasks.push(tokio::spawn(async move {
            while started.next().await.is_some() {
                let _ = tx.send(NetworkEvent::RequestStarted);
            }
        }));

        let mut finished = page
            .event_listener::<EventLoadingFinished>()
            .await
            .map_err(|error| PageDriverError::Protocol(error.to_string()))?;
        let tx = events_tx.clone();
        tasks.push(tokio::spawn(async move {
            while finished.next().await.is_some() {
                let _ = tx.send(NetworkEvent::RequestFinished);
            }
        }));

        let mut failed = page
            .event_listener::<EventLoadingFailed>()
            .await
            .map_err(|error| PageDriverError::Protocol(error.to_string()))?;
        let tx = events_tx.clone();
        tasks.push(tokio::spawn(async move {
            while failed.next().await.is_some() {
                let _ = tx.send(NetworkEvent::RequestFailed);
            }
        }));

        Ok(Self {
            browser: Mutex::new(browser),
            page,
            events_tx,
            tasks,
        })
    }
}

#[async_trait]
impl PageDriver for ChromiumDriver {
    async fn navigate(&self, url: &str) -> Result<(), PageDriverError> {
        self.page
            .goto(url)
            .await
            .map_err(|error| PageDriverError::Navigation(error.to_string()))?;
        self.page
            .wait_for_navigation()
            .await
            .map_err(|error| PageDriverError::Navigation(error.to_string()))?;
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<(), PageDriverError> {
        let element =
            self.page
                .find_element(selector)
                .await
                .map_err(|_| PageDriverError::ElementNotFound {
                    selector: selector.to_owned(),
                })?;
        element
            .click()
            .await
            .map_err(|error| PageDriverError::Protocol(error.to_string()))?;
        Ok(())
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<(), PageDriverError> {
        let element =
            self.page
                .find_element(selector)
                .await
                .map_err(|_| PageDriverError::ElementNotFound {
                    selector: selector.to_owned(),
                })?;
        element
            .click()
            .await
            .map_err(|error| PageDriverError::Protocol(error.to_string()))?;
        element
            .type_str(text)
            .await
            .map_err(|error| PageDriverError::Protocol(error.to_string()))?;
        Ok(())
    }

    async fn press_key(&self, key: &str, repeat: u32) -> Result<(), PageDriverError> {
        let spec =
            KeySpec::lookup(key).ok_or_else(|| PageDriverError::UnsupportedKey(key.to_owned()))?;
        for press in 0..repeat {
            if press > 0 {
                tokio::time::sleep(KEY_REPEAT_DELAY).await;
            }
            self.page
                .execute(spec.event(DispatchKeyEventType::KeyDown)?)
                .await
                .map_err(|error| PageDriverError::Protocol(error.to_string()))?;
            self.page
                .execute(spec.event(DispatchKeyEventType::KeyUp)?)
                .await
                .map_err(|error| PageDriverError::Protocol(error.to_string()))?;
        }
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<(), PageDriverError> {
        self.page
            .evaluate(script)
            .await
            .map_err(|error| PageDriverError::Protocol(error.to_string()))?;
        Ok(())
    }

    async fn set_download_target(&self, dir: &Path) -> Result<(), PageDriverError> {
        let params = SetDownloadBehaviorParams::builder()
            .behavior(SetDownloadBehaviorBehavior::Allow)
            .download_path(dir.to_string_lossy().to_string())
            .build()
            .map_err(PageDriverError::Protocol)?;
        self.page
            .execute(params)
            .await
            .map_err(|error| PageDriverError::Protocol(error.to_string()))?;
        Ok(())
    }

    async fn reload(&self) -> Result<(), PageDriverError> {
        self.page
            .reload()
            .await
            .map_err(|error| PageDriverError::Protocol(error.to_string()))?;
        Ok(())
    }

    async fn close(&self) -> Result<(), PageDriverError> {
        for task in &self.tasks {
            task.abort();
        }
        let mut browser = self.browser.lock().await;
        browser
            .close()
            .await
            .map_err(|error| PageDriverError::Protocol(error.to_string()))?;
        let _ = browser.wait().await;
        Ok(())
    }

    fn network_events(&self) -> broadcast::Receiver<NetworkEvent> {
        self.events_tx.subscribe()
    }
}

/// CDP key event description for the named keys the traversal scripts use.
struct KeySpec {
    key: &'static str,
    code: &'static str,
    key_code: i64,
    text: Option<&'static str>,
}

impl KeySpec {
    fn lookup(key: &str) -> Option<Self> {
        let (key, code, key_code, text) = match key {
            "Enter" => ("Enter", "Enter", 13, Some("\r")),
            "Tab" => ("Tab", "Tab", 9, None),
            "Escape" => ("Escape", "Escape", 27, None),
            "ArrowUp" => ("ArrowUp", "ArrowUp", 38, None),
            "ArrowDown" => ("ArrowDown", "ArrowDown", 40, None),
            "ArrowLeft" => ("ArrowLeft", "ArrowLeft", 37, None),
            "ArrowRight" => ("ArrowRight", "ArrowRight", 39, None),
            _ => return None,
        };
        Some(Self {
            key,
            code,
            key_code,
            text,
        })
    }

    fn event(&self, kind: DispatchKeyEventType) -> Result<DispatchKeyEventParams, PageDriverError> {
        let is_down = matches!(kind, DispatchKeyEventType::KeyDown);
        let mut builder = DispatchKeyEventParams::builder()
            .r#type(kind)
            .key(self.key)
            .code(self.code)
            .windows_virtual_key_code(self.key_code)
            .native_virtual_key_code(self.key_code);
        if is_down {
            if let Some(text) = self.text {
                builder = builder.text(text);
            }
        }
        builder.build().map_err(PageDriverError::Protocol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_keys_resolve() {
        assert!(KeySpec::lookup("Enter").is_some());
        assert!(KeySpec::lookup("Tab").is_some());
        assert!(KeySpec::lookup("ArrowUp").is_some());
        assert!(KeySpec::lookup("Meta").is_none());
    }

    #[test]
    fn enter_carries_text_on_key_down_only() {
        let spec = KeySpec::lookup("Enter").unwrap();
        let down = spec.event(DispatchKeyEventType::KeyDown).unwrap();
        assert_eq!(down.text.as_deref(), Some("\r"));
        let up = spec.event(DispatchKeyEventType::KeyUp).unwrap();
        assert!(up.text.is_none());
    }
}
