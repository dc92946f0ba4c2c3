//! Typed errors for the extraction library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so the server can
//! tell a broken page apart from a broken network.

use thiserror::Error;

use crate::types::chapter::ChapterRef;

/// Errors raised by a [`Browser`](crate::traits::browser::Browser) or one of its pages.
#[derive(Debug, Error)]
pub enum BrowserError {
    /// Navigation failed before a response arrived
    #[error("navigation to {url} failed: {source}")]
    Navigation {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The server answered with a non-success status
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    /// CSS selector could not be parsed
    #[error("invalid selector: {0}")]
    InvalidSelector(String),

    /// A query ran against a page that never navigated anywhere
    #[error("page has not been navigated")]
    NotNavigated,

    /// The browser instance is gone
    #[error("browser disconnected")]
    Disconnected,

    /// The browser could not be started
    #[error("browser launch failed: {0}")]
    Launch(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Errors raised while pulling content out of a rendered page.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// No node matched a required selector
    #[error("selector not found: {selector}")]
    MissingSelector { selector: String },

    /// A node was found but its value is missing or unparsable
    #[error("missing or unparsable field: {field}")]
    MissingField { field: &'static str },
}

/// Anything that can go wrong while working on a single page.
#[derive(Debug, Error)]
pub enum PageError {
    #[error(transparent)]
    Browser(#[from] BrowserError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}

/// A chapter could not be fetched. Fatal to the enclosing job.
#[derive(Debug, Error)]
#[error("failed to fetch chapter {}: {cause}", chapter.link)]
pub struct FetchError {
    pub chapter: ChapterRef,
    #[source]
    pub cause: PageError,
}

impl FetchError {
    pub fn new(chapter: &ChapterRef, cause: impl Into<PageError>) -> Self {
        Self {
            chapter: chapter.clone(),
            cause: cause.into(),
        }
    }
}

/// Result type alias for browser operations.
pub type BrowserResult<T> = std::result::Result<T, BrowserError>;

/// Result type alias for page-level operations.
pub type PageResult<T> = std::result::Result<T, PageError>;
