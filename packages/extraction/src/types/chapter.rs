//! Chapter references and extracted chapter content.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// A fetchable chapter before its content is retrieved.
///
/// `order` is only present when the caller already settled the sequence
/// (for example after confirming a proposed order). Without it the chapter
/// is ordered by its published timestamp once fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterRef {
    pub link: Url,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
}

impl ChapterRef {
    pub fn new(link: Url, title: impl Into<String>) -> Self {
        Self {
            link,
            title: title.into(),
            order: None,
        }
    }

    /// Set the caller-supplied rank.
    pub fn with_order(mut self, order: i64) -> Self {
        self.order = Some(order);
        self
    }
}

/// Article content pulled from a chapter page. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterContent {
    pub title: String,
    pub published_at: DateTime<Utc>,
    pub sanitized_html: String,
}

/// A chapter paired with the content fetched for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedChapter {
    pub chapter: ChapterRef,
    pub content: ChapterContent,
}

impl FetchedChapter {
    /// Title to print in the book: the page title, or the listing title
    /// when the page carried none.
    pub fn display_title(&self) -> &str {
        if self.content.title.is_empty() {
            &self.chapter.title
        } else {
            &self.content.title
        }
    }
}

/// A chapter found on a listing page, proposed to the caller before any
/// content is fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterCandidate {
    pub link: Url,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listed_at: Option<DateTime<Utc>>,
}

impl ChapterCandidate {
    pub fn new(link: Url, title: impl Into<String>) -> Self {
        Self {
            link,
            title: title.into(),
            order: None,
            category: None,
            listed_at: None,
        }
    }

    /// Drop the listing-only metadata.
    pub fn into_ref(self) -> ChapterRef {
        ChapterRef {
            link: self.link,
            title: self.title,
            order: self.order,
        }
    }
}

impl From<ChapterCandidate> for ChapterRef {
    fn from(candidate: ChapterCandidate) -> Self {
        candidate.into_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chapter_ref_order_is_optional() {
        let unranked: ChapterRef =
            serde_json::from_str(r#"{"link":"https://serial.test/1","title":"A - 1"}"#).unwrap();
        assert_eq!(unranked.order, None);

        let ranked: ChapterRef =
            serde_json::from_str(r#"{"link":"https://serial.test/1","title":"A - 1","order":10}"#)
                .unwrap();
        assert_eq!(ranked.order, Some(10));
    }

    #[test]
    fn test_candidate_serializes_camel_case() {
        let mut candidate =
            ChapterCandidate::new(Url::parse("https://serial.test/1").unwrap(), "A - 1");
        candidate.order = Some(10);
        candidate.listed_at = Some(DateTime::parse_from_rfc3339("2024-01-05T00:00:00Z").unwrap().into());

        let json = serde_json::to_value(&candidate).unwrap();
        assert_eq!(json["order"], 10);
        assert_eq!(json["listedAt"], "2024-01-05T00:00:00Z");
        assert!(json.get("category").is_none());

        let chapter: ChapterRef = candidate.into();
        assert_eq!(chapter.order, Some(10));
    }
}
