use crate::surface::{Key, RenderSurface, SurfaceError};
use crate::utils::get_random_user_agent;
use anyhow::{Context, Result};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};

/// How often `wait_for` re-checks the page while waiting.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// A [`RenderSurface`] backed by a headless Chromium session.
///
/// One instance is one browser session; it is launched per crawl and
/// must be closed (or dropped) on every termination path.
pub struct BrowserSurface {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
}

impl BrowserSurface {
    /// Launch a headless session with the fingerprint-evasion flags the
    /// listing surface is known to probe for, and a rotated user agent.
    pub async fn launch() -> Result<Self> {
        let config = BrowserConfig::builder()
            .no_sandbox()
            .window_size(1920, 1080)
            .args(vec![
                "--disable-dev-shm-usage",
                "--disable-gpu",
                "--disable-blink-features=AutomationControlled",
                "--disable-extensions",
                "--disable-infobars",
            ])
            .build()
            .map_err(|e| anyhow::anyhow!(e))
            .context("invalid browser configuration")?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch browser")?;

        // The CDP handler must be polled for the session to make progress.
        let handler_task = tokio::task::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .context("failed to open page")?;
        page.set_user_agent(get_random_user_agent())
            .await
            .context("failed to set user agent")?;

        log::info!("🌐 Browser session launched");
        Ok(Self {
            browser,
            page,
            handler_task,
        })
    }

    /// Tear the session down. Safe to call on any termination path.
    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            log::warn!("Browser close failed: {}", e);
        }
        let _ = self.browser.wait().await;
        self.handler_task.abort();
        log::info!("Browser session closed");
    }
}

/// Map a CDP failure onto the surface taxonomy. The protocol reports
/// obstruction and detachment only through message text, so this match
/// is necessarily heuristic; anything unrecognized means the session
/// itself is in question.
fn map_cdp(err: CdpError) -> SurfaceError {
    let msg = err.to_string();
    let lower = msg.to_lowercase();
    if lower.contains("not clickable") || lower.contains("obscure") || lower.contains("intercept") {
        SurfaceError::Obstructed(msg)
    } else if lower.contains("detached") || lower.contains("no node") || lower.contains("stale") {
        SurfaceError::StaleHandle
    } else {
        SurfaceError::SessionLost(msg)
    }
}

impl RenderSurface for BrowserSurface {
    type Handle = Arc<Element>;

    async fn navigate(&mut self, url: &str) -> Result<(), SurfaceError> {
        self.page.goto(url).await.map_err(map_cdp)?;
        self.page.wait_for_navigation().await.map_err(map_cdp)?;
        Ok(())
    }

    async fn wait_for(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<Self::Handle, SurfaceError> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.page.find_elements(selector).await {
                Ok(elements) => {
                    if let Some(element) = elements.into_iter().next() {
                        return Ok(Arc::new(element));
                    }
                }
                // Transient protocol errors while the page is still
                // loading: keep polling. A dead connection is hopeless.
                Err(e) => {
                    if let SurfaceError::SessionLost(msg) = map_cdp(e) {
                        let lower = msg.to_lowercase();
                        if lower.contains("connection") || lower.contains("channel") {
                            return Err(SurfaceError::SessionLost(msg));
                        }
                    }
                }
            }
            if Instant::now() >= deadline {
                return Err(SurfaceError::Timeout {
                    selector: selector.to_string(),
                    waited: timeout,
                });
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn find_all(&mut self, selector: &str) -> Result<Vec<Self::Handle>, SurfaceError> {
        // No matches comes back as an empty list, not an error.
        let elements = self
            .page
            .find_elements(selector)
            .await
            .map_err(map_cdp)?;
        Ok(elements.into_iter().map(Arc::new).collect())
    }

    async fn click(&mut self, handle: &Self::Handle) -> Result<(), SurfaceError> {
        handle.scroll_into_view().await.map_err(map_cdp)?;
        handle.click().await.map_err(map_cdp)?;
        Ok(())
    }

    async fn send_keys(&mut self, handle: &Self::Handle, keys: &[Key]) -> Result<(), SurfaceError> {
        handle.focus().await.map_err(map_cdp)?;
        for key in keys {
            handle.press_key(key.dom_key()).await.map_err(map_cdp)?;
        }
        Ok(())
    }

    async fn scroll_by(&mut self, container: &Self::Handle, amount: i64) -> Result<(), SurfaceError> {
        container
            .call_js_fn(
                format!("function() {{ this.scrollBy(0, {}); }}", amount),
                false,
            )
            .await
            .map_err(map_cdp)?;
        Ok(())
    }

    async fn text_of(&mut self, handle: &Self::Handle) -> Result<String, SurfaceError> {
        let text = handle.inner_text().await.map_err(map_cdp)?;
        Ok(text.unwrap_or_default())
    }

    async fn attribute_of(
        &mut self,
        handle: &Self::Handle,
        name: &str,
    ) -> Result<Option<String>, SurfaceError> {
        handle.attribute(name).await.map_err(map_cdp)
    }
}
