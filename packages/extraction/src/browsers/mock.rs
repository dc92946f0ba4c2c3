//! Mock browser for testing.
//!
//! Serves canned HTML by URL, can be told to fail specific URLs, and records
//! when every navigation starts and finishes so tests can check how the
//! fetch pool scheduled its work.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;

use super::select_elements;
use crate::error::{BrowserError, BrowserResult};
use crate::traits::browser::{Browser, BrowserLauncher, Element, Page};

/// Navigation lifecycle recorded by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEvent {
    Started(String),
    Finished(String),
}

#[derive(Default)]
struct MockState {
    pages: RwLock<HashMap<String, String>>,
    failures: RwLock<HashSet<String>>,
    events: Mutex<Vec<MockEvent>>,
    pages_opened: AtomicUsize,
    pages_closed: AtomicUsize,
    disconnected: AtomicBool,
    delay_ms: AtomicUsize,
}

/// Mock browser with canned responses.
///
/// # Example
///
/// ```rust
/// use extraction::browsers::MockBrowser;
///
/// let browser = MockBrowser::new()
///     .with_page("https://example.com/1", "<title>One</title>");
/// assert_eq!(browser.navigation_count(), 0);
/// ```
#[derive(Clone, Default)]
pub struct MockBrowser {
    state: Arc<MockState>,
}

impl MockBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `html` for `url`.
    pub fn add_page(&self, url: &str, html: impl Into<String>) {
        self.state
            .pages
            .write()
            .unwrap()
            .insert(url.to_string(), html.into());
    }

    pub fn with_page(self, url: &str, html: impl Into<String>) -> Self {
        self.add_page(url, html);
        self
    }

    /// Make navigation to `url` fail with a network error.
    pub fn fail_on(&self, url: &str) {
        self.state.failures.write().unwrap().insert(url.to_string());
    }

    /// Hold every navigation open for `delay` before it completes.
    pub fn with_delay(self, delay: Duration) -> Self {
        self.state
            .delay_ms
            .store(delay.as_millis() as usize, Ordering::SeqCst);
        self
    }

    pub fn disconnect(&self) {
        self.state.disconnected.store(true, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<MockEvent> {
        self.state.events.lock().unwrap().clone()
    }

    /// URLs navigated to, in start order.
    pub fn navigations(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                MockEvent::Started(url) => Some(url),
                MockEvent::Finished(_) => None,
            })
            .collect()
    }

    pub fn navigation_count(&self) -> usize {
        self.navigations().len()
    }

    pub fn pages_opened(&self) -> usize {
        self.state.pages_opened.load(Ordering::SeqCst)
    }

    pub fn pages_closed(&self) -> usize {
        self.state.pages_closed.load(Ordering::SeqCst)
    }

    /// Sizes of the navigation waves: a wave ends once every navigation
    /// started in it has finished.
    pub fn waves(&self) -> Vec<usize> {
        let mut waves = Vec::new();
        let mut in_flight = 0usize;
        let mut current = 0usize;

        for event in self.events() {
            match event {
                MockEvent::Started(_) => {
                    if in_flight == 0 && current > 0 {
                        waves.push(current);
                        current = 0;
                    }
                    in_flight += 1;
                    current += 1;
                }
                MockEvent::Finished(_) => in_flight = in_flight.saturating_sub(1),
            }
        }
        if current > 0 {
            waves.push(current);
        }
        waves
    }

    /// Highest number of navigations that were open at the same time.
    pub fn max_in_flight(&self) -> usize {
        let mut in_flight = 0usize;
        let mut max = 0usize;
        for event in self.events() {
            match event {
                MockEvent::Started(_) => {
                    in_flight += 1;
                    max = max.max(in_flight);
                }
                MockEvent::Finished(_) => in_flight = in_flight.saturating_sub(1),
            }
        }
        max
    }

    /// Clear recorded events and counters, keep pages.
    pub fn reset_calls(&self) {
        self.state.events.lock().unwrap().clear();
        self.state.pages_opened.store(0, Ordering::SeqCst);
        self.state.pages_closed.store(0, Ordering::SeqCst);
    }
}

#[async_trait]
impl Browser for MockBrowser {
    async fn new_page(&self) -> BrowserResult<Box<dyn Page>> {
        if !self.is_connected() {
            return Err(BrowserError::Disconnected);
        }
        self.state.pages_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockPage {
            state: Arc::clone(&self.state),
            url: None,
            html: None,
        }))
    }

    fn is_connected(&self) -> bool {
        !self.state.disconnected.load(Ordering::SeqCst)
    }
}

/// Page handed out by [`MockBrowser`].
pub struct MockPage {
    state: Arc<MockState>,
    url: Option<String>,
    html: Option<String>,
}

impl MockPage {
    fn record(&self, event: MockEvent) {
        self.state.events.lock().unwrap().push(event);
    }

    fn document(&self) -> BrowserResult<&str> {
        self.html.as_deref().ok_or(BrowserError::NotNavigated)
    }
}

#[async_trait]
impl Page for MockPage {
    async fn goto(&mut self, url: &str) -> BrowserResult<()> {
        self.record(MockEvent::Started(url.to_string()));

        let delay = self.state.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay as u64)).await;
        }

        let outcome = if self.state.failures.read().unwrap().contains(url) {
            Err(BrowserError::Navigation {
                url: url.to_string(),
                source: "connection reset".into(),
            })
        } else {
            match self.state.pages.read().unwrap().get(url) {
                Some(html) => Ok(html.clone()),
                None => Err(BrowserError::Status {
                    url: url.to_string(),
                    status: 404,
                }),
            }
        };

        self.record(MockEvent::Finished(url.to_string()));
        let html = outcome?;
        self.url = Some(url.to_string());
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
        self.state.pages_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Launcher that always hands out the same [`MockBrowser`], reconnected.
#[derive(Clone, Default)]
pub struct MockLauncher {
    browser: MockBrowser,
    launches: Arc<AtomicUsize>,
}

impl MockLauncher {
    pub fn new(browser: MockBrowser) -> Self {
        Self {
            browser,
            launches: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn launch_count(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrowserLauncher for MockLauncher {
    async fn launch(&self) -> BrowserResult<Arc<dyn Browser>> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        self.browser.state.disconnected.store(false, Ordering::SeqCst);
        Ok(Arc::new(self.browser.clone()))
    }
}
