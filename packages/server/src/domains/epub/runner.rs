//! EPUB job runner.
//!
//! Drives one job through `Pending → Discovering → Fetching → Assembling`
//! to `Cached` or `Failed`. Every transition is logged with a `state`
//! field; inside a traced span those lines reach the client's channel.
//!
//! A finished job is written to the cache only after its artifact is on
//! disk, so a failed job leaves nothing behind and can simply be retried.

use std::collections::HashSet;

use extraction::{
    collection_title, discover_chapters, order_chapters, ChapterRef, FetchPool, FetchedChapter,
};
use tracing::{error, info};
use url::Url;

use super::models::{JobError, JobInput, JobKey, JobOutcome, JobState};
use crate::kernel::{Book, BookChapter, JobResult, ServerDeps};

pub struct EpubJobRunner {
    deps: ServerDeps,
}

impl EpubJobRunner {
    pub fn new(deps: ServerDeps) -> Self {
        Self { deps }
    }

    /// Run the job identified by `key`. Identical keys resolve to the same
    /// artifact; a cached key returns without fetching.
    pub async fn run(&self, key: &JobKey, input: JobInput) -> Result<JobOutcome, JobError> {
        transition(key, JobState::Pending);

        if let Some(result) = self.deps.cache.lookup(key.as_str()).await {
            transition(key, JobState::Cached);
            info!(job_key = %key, title = %result.title, "Serving book from cache");
            return Ok(JobOutcome {
                key: key.clone(),
                result,
                from_cache: true,
            });
        }

        match self.build(key, input).await {
            Ok(result) => {
                transition(key, JobState::Cached);
                Ok(JobOutcome {
                    key: key.clone(),
                    result,
                    from_cache: false,
                })
            }
            Err(e) => {
                error!(job_key = %key, state = %JobState::Failed, error = %e, "Job failed");
                Err(e)
            }
        }
    }

    async fn build(&self, key: &JobKey, input: JobInput) -> Result<JobResult, JobError> {
        transition(key, JobState::Discovering);
        let chapters = match input {
            JobInput::Listing { url } => self.discover(&url).await?,
            JobInput::Chapters(chapters) => chapters,
        };
        if chapters.is_empty() {
            return Err(JobError::NoChapters);
        }

        transition(key, JobState::Fetching);
        let browser = self.deps.browser.acquire().await?;
        let pool = FetchPool::new(browser, self.deps.extractor.clone());
        let fetched = pool.fetch_all(&chapters).await?;

        transition(key, JobState::Assembling);
        let (mode, ordered) = order_chapters(fetched);
        let title = ordered
            .first()
            .map(|c| collection_title(c.display_title()))
            .unwrap_or_else(|| collection_title(""));
        info!(job_key = %key, title = %title, ordering = ?mode, chapters = ordered.len(), "Assembling book");

        let book = Book {
            title: title.clone(),
            identifier: key.to_string(),
            chapters: ordered.into_iter().map(book_chapter).collect(),
        };
        let path = self.deps.config.data_dir.join(key.artifact_file_name());
        self.deps.epub_writer.write(&book, &path).await?;

        let result = JobResult { title, path };
        self.deps.cache.store(key.as_str(), result.clone()).await?;
        Ok(result)
    }

    /// All chapters linked from the listing, unranked so they are ordered by
    /// publication date.
    async fn discover(&self, url: &Url) -> Result<Vec<ChapterRef>, JobError> {
        let mut page = self.deps.browser.default_page().await?;
        let candidates = discover_chapters(
            &mut **page,
            url,
            &self.deps.config.listing_row_selector,
        )
        .await
        .map_err(JobError::Discovery)?;

        let mut seen = HashSet::new();
        Ok(candidates
            .into_iter()
            .filter(|c| seen.insert(c.link.clone()))
            .map(|c| ChapterRef::new(c.link, c.title))
            .collect())
    }
}

fn book_chapter(fetched: FetchedChapter) -> BookChapter {
    BookChapter {
        title: fetched.display_title().to_string(),
        html: fetched.content.sanitized_html,
    }
}

fn transition(key: &JobKey, state: JobState) {
    info!(job_key = %key, state = %state, "Job state changed");
}
