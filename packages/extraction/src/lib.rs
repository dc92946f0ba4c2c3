//! Chapter Extraction Library
//!
//! Turns a listing page of a serial into chapter content ready for
//! packaging: discovery, extraction, sanitization, batched fetching and
//! ordering.
//!
//! # Usage
//!
//! ```rust,ignore
//! use extraction::{ContentExtractor, FetchPool, HttpBrowser, order_chapters};
//!
//! let browser = Arc::new(HttpBrowser::new()?);
//! let pool = FetchPool::new(browser, Arc::new(ContentExtractor::default()));
//! let fetched = pool.fetch_all(&chapters).await?;
//! let (mode, ordered) = order_chapters(fetched);
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Browser capability (pages and selector queries)
//! - [`browsers`] - HTTP-backed and mock browsers
//! - [`extractor`] - Article body, published date and title extraction
//! - [`sanitize`] - Link and image neutralization
//! - [`pool`] - Batched chapter fetching
//! - [`ordering`] - Book order, collection title, proposed ranks
//! - [`discovery`] - Listing page parsing

pub mod browsers;
pub mod discovery;
pub mod error;
pub mod extractor;
pub mod ordering;
pub mod pool;
pub mod sanitize;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use browsers::{HttpBrowser, HttpBrowserLauncher, MockBrowser, MockLauncher};
pub use discovery::{discover_chapters, propose_chapters};
pub use error::{BrowserError, ExtractionError, FetchError, PageError};
pub use extractor::ContentExtractor;
pub use ordering::{collection_title, order_chapters, rank_candidates, OrderingMode};
pub use pool::{FetchPool, FETCH_BATCH_SIZE};
pub use sanitize::sanitize;
pub use traits::browser::{Browser, BrowserLauncher, Element, Page};
pub use types::{
    chapter::{ChapterCandidate, ChapterContent, ChapterRef, FetchedChapter},
    config::{ExtractorConfig, SanitizeMode, DEFAULT_LISTING_ROW_SELECTOR},
};
