// SPDX-License-Identifier: MIT
//! Browser session lifecycle — one Chromium process, one page, per request.
//!
//! The spawn is the single most expensive step of a verification and is
//! never retried here; the retry policy reuses the open page instead of
//! re-spawning (see the pipeline).

use crate::config::VerifierConfig;
use crate::error::VerifyError;
use crate::model::PageSnapshot;
use crate::plate::PlateToken;
use crate::query;
use crate::runtime::ChromeLocator;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetUserAgentOverrideParams;
use chromiumoxide::Page;
use futures_util::StreamExt;
use std::path::Path;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Identification presented to the target site. A bare headless UA tends to
/// get the bot-challenge variant of the page instead of the form.
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// The site renders Spanish by default for Chilean locales.
const ACCEPT_LANGUAGE: &str = "es-CL,es;q=0.9";

/// Flag set suited to constrained server hosts: no OS sandbox, no GPU, and a
/// single process where the platform would otherwise fork helpers.
const BROWSER_ARGS: &[&str] = &[
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--no-zygote",
    "--single-process",
];

/// How long teardown waits for the browser process to exit.
const CLOSE_WAIT: Duration = Duration::from_secs(5);

/// Opens sessions for the pipeline. The seam exists so tests can count
/// acquisitions without ever touching a browser.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self, config: &VerifierConfig) -> Result<Box<dyn QuerySession>, VerifyError>;
}

/// One live session: runs query attempts against its single page, then is
/// closed exactly once.
#[async_trait]
pub trait QuerySession: Send + Sync {
    async fn run_query(&self, plate: &PlateToken) -> Result<PageSnapshot, VerifyError>;

    /// Best-effort teardown. Failures are swallowed (logged at most) so they
    /// never mask or replace the primary result.
    async fn close(self: Box<Self>);
}

/// Factory for real Chromium sessions.
pub struct ChromeSessionFactory {
    locator: ChromeLocator,
}

impl ChromeSessionFactory {
    pub fn new(locator: ChromeLocator) -> Self {
        Self { locator }
    }
}

#[async_trait]
impl SessionFactory for ChromeSessionFactory {
    async fn open(&self, config: &VerifierConfig) -> Result<Box<dyn QuerySession>, VerifyError> {
        let executable = self.locator.resolve().await?;
        let session = ChromeSession::launch(&executable, config).await?;
        Ok(Box::new(session))
    }
}

/// A live Chromium process plus its single page.
pub struct ChromeSession {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
    config: VerifierConfig,
}

impl ChromeSession {
    pub async fn launch(executable: &Path, config: &VerifierConfig) -> Result<Self, VerifyError> {
        let browser_config = BrowserConfig::builder()
            .chrome_executable(executable)
            .no_sandbox()
            .args(BROWSER_ARGS.iter().copied())
            .build()
            .map_err(VerifyError::Launch)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| VerifyError::Launch(e.to_string()))?;

        // Drain CDP events for the lifetime of the session; the stream ends
        // when the browser goes away.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| VerifyError::Launch(e.to_string()))?;

        let identity = SetUserAgentOverrideParams::builder()
            .user_agent(USER_AGENT)
            .accept_language(ACCEPT_LANGUAGE)
            .build()
            .map_err(VerifyError::Launch)?;
        page.set_user_agent(identity)
            .await
            .map_err(|e| VerifyError::Launch(e.to_string()))?;

        debug!(executable = %executable.display(), "browser session ready");

        Ok(Self {
            browser,
            page,
            handler_task,
            config: config.clone(),
        })
    }
}

#[async_trait]
impl QuerySession for ChromeSession {
    async fn run_query(&self, plate: &PlateToken) -> Result<PageSnapshot, VerifyError> {
        query::run_attempt(&self.page, plate, &self.config).await
    }

    async fn close(mut self: Box<Self>) {
        if let Err(e) = self.browser.close().await {
            debug!(err = %e, "browser close request failed");
        }
        match tokio::time::timeout(CLOSE_WAIT, self.browser.wait()).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => debug!(err = %e, "browser did not exit cleanly"),
            Err(_) => warn!("browser did not exit within {CLOSE_WAIT:?} — abandoning process"),
        }
        self.handler_task.abort();
    }
}
