//! Batched chapter fetching.
//!
//! Runs the [`ContentExtractor`] over many chapters with at most
//! [`FETCH_BATCH_SIZE`] pages open at a time. Work proceeds in waves: a wave
//! is started, awaited as a whole, then the next one begins. The first
//! failing chapter aborts the run; a book with silently missing chapters is
//! worse than no book.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::error::{FetchError, PageResult};
use crate::extractor::ContentExtractor;
use crate::traits::browser::{Browser, Page};
use crate::types::chapter::{ChapterContent, ChapterRef, FetchedChapter};

/// Maximum number of chapter pages open at once.
pub const FETCH_BATCH_SIZE: usize = 4;

/// Fetches chapters through a shared browser, one fresh page per chapter.
pub struct FetchPool {
    browser: Arc<dyn Browser>,
    extractor: Arc<ContentExtractor>,
    batch_size: usize,
}

impl FetchPool {
    pub fn new(browser: Arc<dyn Browser>, extractor: Arc<ContentExtractor>) -> Self {
        Self {
            browser,
            extractor,
            batch_size: FETCH_BATCH_SIZE,
        }
    }

    /// Fetch every chapter. Returns one entry per input chapter; the order
    /// of the returned list carries no meaning.
    pub async fn fetch_all(
        &self,
        chapters: &[ChapterRef],
    ) -> Result<Vec<FetchedChapter>, FetchError> {
        let total = chapters.len();
        let mut fetched = Vec::with_capacity(total);

        for (wave, batch) in chapters.chunks(self.batch_size).enumerate() {
            debug!(wave = wave + 1, size = batch.len(), "Starting fetch wave");

            // Every page in the wave is closed before a failure is reported
            let results = join_all(batch.iter().map(|chapter| self.fetch_one(chapter))).await;
            for result in results {
                fetched.push(result?);
            }

            info!(fetched = fetched.len(), total, "Fetched chapters");
        }

        Ok(fetched)
    }

    async fn fetch_one(&self, chapter: &ChapterRef) -> Result<FetchedChapter, FetchError> {
        let mut page = self
            .browser
            .new_page()
            .await
            .map_err(|e| FetchError::new(chapter, e))?;

        let outcome = self.load(page.as_mut(), chapter).await;

        if let Err(e) = page.close().await {
            debug!(link = %chapter.link, error = %e, "Failed to close page");
        }

        match outcome {
            Ok(content) => {
                debug!(link = %chapter.link, title = %content.title, "Extracted chapter");
                Ok(FetchedChapter {
                    chapter: chapter.clone(),
                    content,
                })
            }
            Err(cause) => {
                warn!(link = %chapter.link, error = %cause, "Chapter fetch failed");
                Err(FetchError::new(chapter, cause))
            }
        }
    }

    async fn load(&self, page: &mut dyn Page, chapter: &ChapterRef) -> PageResult<ChapterContent> {
        page.goto(chapter.link.as_str()).await?;
        self.extractor.extract(page).await
    }
}
