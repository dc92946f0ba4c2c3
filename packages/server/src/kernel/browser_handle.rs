//! Shared browser for the whole process.
//!
//! One browser instance serves every job. It is launched lazily and
//! relaunched when it reports a lost connection. A single default page is
//! kept for listing discovery; chapter fetching opens fresh pages from
//! [`BrowserHandle::acquire`].

use std::sync::Arc;

use extraction::{Browser, BrowserLauncher, Page};
use extraction::error::BrowserResult;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

struct Launched {
    generation: u64,
    browser: Arc<dyn Browser>,
}

struct DefaultPage {
    generation: u64,
    page: Arc<Mutex<Box<dyn Page>>>,
}

pub struct BrowserHandle {
    launcher: Arc<dyn BrowserLauncher>,
    browser: Mutex<Option<Launched>>,
    // Lock order: default_page before browser
    default_page: Mutex<Option<DefaultPage>>,
}

impl BrowserHandle {
    pub fn new(launcher: Arc<dyn BrowserLauncher>) -> Self {
        Self {
            launcher,
            browser: Mutex::new(None),
            default_page: Mutex::new(None),
        }
    }

    /// Connected browser, launching or relaunching as needed.
    pub async fn acquire(&self) -> BrowserResult<Arc<dyn Browser>> {
        let (_, browser) = self.current().await?;
        Ok(browser)
    }

    /// Exclusive access to the default page. Held for the duration of one
    /// discovery; other discoveries wait.
    ///
    /// The guard owns its page, so it can be held across awaits inside
    /// spawned tasks.
    pub async fn default_page(&self) -> BrowserResult<OwnedMutexGuard<Box<dyn Page>>> {
        let page = {
            let mut slot = self.default_page.lock().await;
            let (generation, browser) = self.current().await?;

            match slot.as_ref() {
                Some(current) if current.generation == generation => current.page.clone(),
                _ => {
                    debug!(generation, "Opening default page");
                    let page = Arc::new(Mutex::new(browser.new_page().await?));
                    *slot = Some(DefaultPage {
                        generation,
                        page: page.clone(),
                    });
                    page
                }
            }
        };

        Ok(page.lock_owned().await)
    }

    async fn current(&self) -> BrowserResult<(u64, Arc<dyn Browser>)> {
        let mut slot = self.browser.lock().await;

        let generation = match slot.as_ref() {
            Some(launched) if launched.browser.is_connected() => {
                return Ok((launched.generation, launched.browser.clone()));
            }
            Some(launched) => {
                warn!(generation = launched.generation, "Browser disconnected, relaunching");
                launched.generation + 1
            }
            None => 1,
        };

        let browser = self.launcher.launch().await?;
        info!(generation, "Browser launched");
        *slot = Some(Launched {
            generation,
            browser: browser.clone(),
        });
        Ok((generation, browser))
    }
}
