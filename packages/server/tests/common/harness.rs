//! Test harness: server dependencies over a mock browser and a temp dir.

#![allow(dead_code)]

use std::sync::{Arc, Once};
use std::time::Duration;

use extraction::{MockBrowser, MockLauncher};
use server_core::kernel::ServerDeps;
use server_core::Config;
use tempfile::TempDir;

use super::fixtures::{chapter_page, chapter_url};

static TRACING: Once = Once::new();

pub struct TestHarness {
    pub deps: ServerDeps,
    pub browser: MockBrowser,
    pub launcher: MockLauncher,
    // Keeps the data dir alive for the duration of the test
    pub data_dir: TempDir,
}

impl TestHarness {
    /// Every navigation takes a few milliseconds so concurrent fetches overlap.
    pub fn new() -> Self {
        Self::with_browser(MockBrowser::new().with_delay(Duration::from_millis(10)))
    }

    pub fn with_browser(browser: MockBrowser) -> Self {
        // Run tests with: RUST_LOG=debug cargo test -- --nocapture
        TRACING.call_once(|| {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .with_test_writer()
                .try_init();
        });

        let data_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let config = Config {
            data_dir: data_dir.path().to_path_buf(),
            trace_wait_timeout: Duration::from_millis(200),
            ..Config::default()
        };
        let launcher = MockLauncher::new(browser.clone());
        let deps = ServerDeps::new(config, Arc::new(launcher.clone()));

        Self {
            deps,
            browser,
            launcher,
            data_dir,
        }
    }

    /// Serve chapters `1..=count`, chapter `n` published on day `n` of January.
    pub fn with_chapters(self, count: usize) -> Self {
        for n in 1..=count {
            self.browser.add_page(
                &chapter_url(n),
                chapter_page(
                    &format!("My Series - {n}"),
                    &format!("2024-01-{n:02}T10:00:00Z"),
                    &format!("<p>Chapter {n}</p>"),
                ),
            );
        }
        self
    }
}
