//! Browser capability: render a page, pick DOM fragments by selector.
//!
//! The pipeline never talks to a rendering engine directly. It asks a
//! [`Browser`] for fresh [`Page`]s and queries them with CSS selectors, so a
//! headless engine, a plain HTTP fetcher and the test mock are
//! interchangeable.
//!
//! # Usage
//!
//! ```rust,ignore
//! let mut page = browser.new_page().await?;
//! page.goto("https://example.com/chapter-1").await?;
//! let body = page.query_selector("#HetVerhaal").await?;
//! page.close().await?;
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::BrowserResult;

/// Snapshot of a DOM node matched by a selector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub inner_html: String,
    pub text: String,
    pub attributes: HashMap<String, String>,
}

impl Element {
    /// Look up an attribute value.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// A single browser tab.
///
/// Calls against one page must be issued serially; open more pages for
/// concurrency.
#[async_trait]
pub trait Page: Send + Sync {
    /// Navigate to `url` and wait for the document.
    async fn goto(&mut self, url: &str) -> BrowserResult<()>;

    /// URL of the loaded document, after redirects.
    fn url(&self) -> Option<&str>;

    /// First node matching `selector`, if any.
    async fn query_selector(&self, selector: &str) -> BrowserResult<Option<Element>>;

    /// Every node matching `selector`, in document order.
    async fn query_selector_all(&self, selector: &str) -> BrowserResult<Vec<Element>>;

    /// Release the tab.
    async fn close(&mut self) -> BrowserResult<()> {
        Ok(())
    }
}

/// A running browser instance that hands out pages.
#[async_trait]
pub trait Browser: Send + Sync {
    async fn new_page(&self) -> BrowserResult<Box<dyn Page>>;

    /// Whether the instance can still open pages.
    fn is_connected(&self) -> bool;
}

/// Starts browser instances. Used to relaunch after a disconnect.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> BrowserResult<Arc<dyn Browser>>;
}
