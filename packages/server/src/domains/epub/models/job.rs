use std::fmt;

use extraction::{BrowserError, ChapterRef, FetchError, PageError};
use thiserror::Error;
use url::Url;

use super::JobKey;
use crate::kernel::{CacheError, JobResult, PackagingError};

/// What a job binds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobInput {
    /// Every chapter linked from a listing page, in publication order.
    Listing { url: Url },
    /// A chapter set the client already confirmed.
    Chapters(Vec<ChapterRef>),
}

/// Lifecycle of one job. `Cached` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Discovering,
    Fetching,
    Assembling,
    Cached,
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Discovering => "discovering",
            JobState::Fetching => "fetching",
            JobState::Assembling => "assembling",
            JobState::Cached => "cached",
            JobState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Cached | JobState::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum JobError {
    #[error("chapter discovery failed: {0}")]
    Discovery(#[source] PageError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("browser unavailable: {0}")]
    Browser(#[from] BrowserError),

    #[error("no chapters to bind")]
    NoChapters,

    #[error(transparent)]
    Packaging(#[from] PackagingError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// A job that reached `Cached`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutcome {
    pub key: JobKey,
    pub result: JobResult,
    /// Served from an earlier run without fetching anything.
    pub from_cache: bool,
}
