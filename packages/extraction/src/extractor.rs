//! Content extraction from a rendered chapter page.
//!
//! Pulls the article body, the published timestamp and the chapter title,
//! then sanitizes the body.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tracing::debug;

use crate::error::{ExtractionError, PageResult};
use crate::sanitize::sanitize;
use crate::traits::browser::Page;
use crate::types::chapter::ChapterContent;
use crate::types::config::ExtractorConfig;

/// Separates the chapter title from the site name in `<title>`.
const TITLE_SEPARATOR: char = '|';

/// Extracts [`ChapterContent`] from pages already navigated to a chapter.
#[derive(Debug, Clone, Default)]
pub struct ContentExtractor {
    config: ExtractorConfig,
}

impl ContentExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    pub async fn extract(&self, page: &dyn Page) -> PageResult<ChapterContent> {
        let body = page
            .query_selector(&self.config.body_selector)
            .await?
            .ok_or_else(|| ExtractionError::MissingSelector {
                selector: self.config.body_selector.clone(),
            })?;

        let published_at = page
            .query_selector(&self.config.published_selector)
            .await?
            .and_then(|el| {
                el.attr(&self.config.published_attribute)
                    .and_then(parse_published)
            })
            .ok_or(ExtractionError::MissingField { field: "date" })?;

        let title = page
            .query_selector(&self.config.title_selector)
            .await?
            .map(|el| chapter_title(&el.text))
            .ok_or(ExtractionError::MissingField { field: "title" })?;

        debug!(title = %title, published_at = %published_at, "Extracted chapter content");

        Ok(ChapterContent {
            title,
            published_at,
            sanitized_html: sanitize(&body.inner_html, self.config.sanitize),
        })
    }
}

/// The part of a page title before the site-name separator.
pub fn chapter_title(page_title: &str) -> String {
    page_title
        .split(TITLE_SEPARATOR)
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// Parse a published timestamp. Accepts RFC 3339, plain date-times, ISO
/// dates and the `dd-mm-yy` form used on listing pages.
pub fn parse_published(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc());
    }
    ["%d-%m-%y", "%Y-%m-%d"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}
