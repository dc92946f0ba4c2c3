//! Server dependencies shared by routes and job activities.
//!
//! External capabilities (browser, EPUB writer) sit behind traits so tests
//! can run the whole pipeline against mocks.

use std::sync::Arc;

use extraction::{BrowserLauncher, ContentExtractor};

use crate::config::Config;
use crate::kernel::{BaseEpubWriter, BrowserHandle, JobCache, TraceRegistry, ZipEpubWriter};

#[derive(Clone)]
pub struct ServerDeps {
    pub config: Arc<Config>,
    pub traces: TraceRegistry,
    pub cache: Arc<JobCache>,
    pub browser: Arc<BrowserHandle>,
    pub extractor: Arc<ContentExtractor>,
    pub epub_writer: Arc<dyn BaseEpubWriter>,
}

impl ServerDeps {
    /// Wire up dependencies from config. Uses the zip EPUB writer.
    pub fn new(config: Config, launcher: Arc<dyn BrowserLauncher>) -> Self {
        let cache = JobCache::new(config.cache_path());
        let extractor = ContentExtractor::new(config.extractor_config());

        Self {
            traces: TraceRegistry::new(),
            cache: Arc::new(cache),
            browser: Arc::new(BrowserHandle::new(launcher)),
            extractor: Arc::new(extractor),
            epub_writer: Arc::new(ZipEpubWriter::new()),
            config: Arc::new(config),
        }
    }

    /// Share an existing registry, e.g. the one the log layer forwards to.
    pub fn with_traces(mut self, traces: TraceRegistry) -> Self {
        self.traces = traces;
        self
    }

    pub fn with_epub_writer(mut self, writer: Arc<dyn BaseEpubWriter>) -> Self {
        self.epub_writer = writer;
        self
    }
}
