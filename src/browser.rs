//! Chrome DevTools Protocol implementation of [`BrowserHandle`].

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

use crate::error::SessionError;
use crate::session::{BrowserHandle, PageSession};

/// Interval between selector probes while waiting.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Common Chrome executable paths to check.
const CHROME_PATHS: &[&str] = &[
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/opt/google/chrome/google-chrome",
];

#[derive(Debug, Clone)]
pub struct ChromiumOptions {
    pub headless: bool,
    pub executable: Option<PathBuf>,
    /// DevTools WebSocket URL of an already running browser.
    pub remote_url: Option<String>,
}

impl Default for ChromiumOptions {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
            remote_url: None,
        }
    }
}

/// A launched (or connected) Chrome instance.
pub struct ChromiumBrowser {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl ChromiumBrowser {
    pub async fn launch(options: &ChromiumOptions) -> Result<Self, SessionError> {
        let (browser, mut handler) = match &options.remote_url {
            Some(url) => {
                info!("Connecting to remote browser at {}", url);
                Browser::connect(url.clone())
                    .await
                    .map_err(|e| SessionError::Browser(format!("failed to connect to {}: {}", url, e)))?
            }
            None => {
                let executable = match &options.executable {
                    Some(path) => path.clone(),
                    None => find_chrome()?,
                };
                info!("Launching browser {} (headless={})", executable.display(), options.headless);

                let mut builder = BrowserConfig::builder().chrome_executable(executable);
                if !options.headless {
                    builder = builder.with_head();
                }
                let config = builder
                    .arg("--disable-gpu")
                    .arg("--disable-extensions")
                    .arg("--disable-popup-blocking")
                    .arg("--disable-infobars")
                    .arg("--no-sandbox")
                    .arg("--disable-dev-shm-usage")
                    .arg("--blink-settings=imagesEnabled=false")
                    .build()
                    .map_err(|e| SessionError::Browser(format!("invalid browser config: {}", e)))?;

                Browser::launch(config)
                    .await
                    .map_err(|e| SessionError::Browser(format!("failed to launch browser: {}", e)))?
            }
        };

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        Ok(Self { browser, handler })
    }

    pub async fn shutdown(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("Failed to close browser: {}", e);
        }
        let _ = self.browser.wait().await;
        self.handler.abort();
    }
}

/// `now + limit`, or roughly thirty years out when that overflows.
fn deadline_after(now: Instant, limit: Duration) -> Instant {
    now.checked_add(limit)
        .unwrap_or_else(|| now + Duration::from_secs(86400 * 365 * 30))
}

fn find_chrome() -> Result<PathBuf, SessionError> {
    CHROME_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
        .ok_or_else(|| {
            SessionError::Browser("Chrome/Chromium not found; set CHROME_EXECUTABLE or BROWSER_URL".to_string())
        })
}

#[async_trait]
impl BrowserHandle for ChromiumBrowser {
    type Session = ChromiumSession;

    async fn open_context(&self) -> Result<ChromiumSession, SessionError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| SessionError::Browser(format!("failed to open tab: {}", e)))?;
        Ok(ChromiumSession { page })
    }
}

/// One browser tab.
pub struct ChromiumSession {
    page: Page,
}

#[async_trait]
impl PageSession for ChromiumSession {
    async fn navigate(&mut self, url: &str, limit: Duration) -> Result<String, SessionError> {
        debug!("Navigating to {}", url);
        match timeout(limit, self.page.goto(url)).await {
            Err(_) => {
                return Err(SessionError::NavigationTimeout {
                    url: url.to_string(),
                    timeout: limit,
                })
            }
            Ok(Err(e)) => {
                return Err(SessionError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                })
            }
            Ok(Ok(_)) => {}
        }
        self.markup().await
    }

    async fn wait_for(&mut self, selector: &str, limit: Duration) -> bool {
        let now = Instant::now();
        let deadline = deadline_after(now, limit);
        loop {
            if self.page.find_element(selector).await.is_ok() {
                return true;
            }
            if deadline_after(Instant::now(), POLL_INTERVAL) > deadline {
                return false;
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn markup(&mut self) -> Result<String, SessionError> {
        self.page
            .content()
            .await
            .map_err(|e| SessionError::Browser(format!("failed to read page content: {}", e)))
    }

    async fn run_script(&mut self, script: &str) -> Result<(), SessionError> {
        self.page
            .evaluate(script.to_string())
            .await
            .map(|_| ())
            .map_err(|e| SessionError::Browser(format!("script failed: {}", e)))
    }

    async fn click(&mut self, selector: &str) -> Result<(), SessionError> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|_| SessionError::ElementNotFound(selector.to_string()))?;
        element
            .click()
            .await
            .map(|_| ())
            .map_err(|e| SessionError::Browser(format!("click on {} failed: {}", selector, e)))
    }

    async fn close(self) -> Result<(), SessionError> {
        self.page
            .close()
            .await
            .map_err(|e| SessionError::Browser(format!("failed to close tab: {}", e)))
    }
}
