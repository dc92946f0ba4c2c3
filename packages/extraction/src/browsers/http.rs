//! HTTP-backed browser.
//!
//! Fetches documents with `reqwest` and answers selector queries with
//! `scraper`. Suitable for server-rendered sites; pages that build their
//! content with JavaScript need a real rendering engine behind the
//! [`Browser`] trait instead.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::select_elements;
use crate::error::{BrowserError, BrowserResult};
use crate::traits::browser::{Browser, BrowserLauncher, Element, Page};

/// Browser-like User-Agent to avoid bot detection
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Shared HTTP client handing out [`HttpPage`]s.
pub struct HttpBrowser {
    client: reqwest::Client,
    connected: AtomicBool,
}

impl HttpBrowser {
    /// Create a browser with the default user agent and a 30s request timeout.
    pub fn new() -> BrowserResult<Self> {
        Self::with_user_agent(DEFAULT_USER_AGENT)
    }

    pub fn with_user_agent(user_agent: &str) -> BrowserResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| BrowserError::Launch(Box::new(e)))?;

        Ok(Self::with_client(client))
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            connected: AtomicBool::new(true),
        }
    }

    /// Mark the instance as gone. Further `new_page` calls fail.
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl Browser for HttpBrowser {
    async fn new_page(&self) -> BrowserResult<Box<dyn Page>> {
        if !self.is_connected() {
            return Err(BrowserError::Disconnected);
        }
        Ok(Box::new(HttpPage::new(self.client.clone())))
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

/// One fetched document.
pub struct HttpPage {
    client: reqwest::Client,
    url: Option<String>,
    html: Option<String>,
}

impl HttpPage {
    fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            url: None,
            html: None,
        }
    }

    fn document(&self) -> BrowserResult<&str> {
        self.html.as_deref().ok_or(BrowserError::NotNavigated)
    }
}

#[async_trait]
impl Page for HttpPage {
    async fn goto(&mut self, url: &str) -> BrowserResult<()> {
        debug!(url = %url, "HTTP fetch starting");
        let response = self.client.get(url).send().await.map_err(|e| {
            warn!(url = %url, error = %e, "HTTP request failed");
            BrowserError::Navigation {
                url: url.to_string(),
                source: Box::new(e),
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(BrowserError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        // Capture final URL after redirects
        let final_url = response.url().to_string();
        let html = response
            .text()
            .await
            .map_err(|e| BrowserError::Navigation {
                url: url.to_string(),
                source: Box::new(e),
            })?;

        debug!(url = %final_url, bytes = html.len(), "HTTP fetch complete");
        self.url = Some(final_url);
        self.html = Some(html);
        Ok(())
    }

    fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    async fn query_selector(&self, selector: &str) -> BrowserResult<Option<Element>> {
        Ok(select_elements(self.document()?, selector)?.into_iter().next())
    }

    async fn query_selector_all(&self, selector: &str) -> BrowserResult<Vec<Element>> {
        select_elements(self.document()?, selector)
    }

    async fn close(&mut self) -> BrowserResult<()> {
        self.html = None;
        Ok(())
    }
}

/// Launches [`HttpBrowser`]s.
#[derive(Debug, Clone)]
pub struct HttpBrowserLauncher {
    user_agent: String,
}

impl Default for HttpBrowserLauncher {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl HttpBrowserLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a custom user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

#[async_trait]
impl BrowserLauncher for HttpBrowserLauncher {
    async fn launch(&self) -> BrowserResult<Arc<dyn Browser>> {
        Ok(Arc::new(HttpBrowser::with_user_agent(&self.user_agent)?))
    }
}
