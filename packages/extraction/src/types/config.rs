//! Selector and sanitization settings for a source site.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How many attribute occurrences [`sanitize`](crate::sanitize::sanitize) neutralizes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SanitizeMode {
    /// Only the first `href` and the first `src` of a fragment.
    #[default]
    First,
    /// Every `href` and `src` in the fragment.
    All,
}

impl FromStr for SanitizeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" => Ok(Self::First),
            "all" => Ok(Self::All),
            other => Err(format!("unknown sanitize mode: {other}")),
        }
    }
}

impl fmt::Display for SanitizeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::First => f.write_str("first"),
            Self::All => f.write_str("all"),
        }
    }
}

/// Where the extractor finds things on a chapter page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractorConfig {
    /// Article body node
    pub body_selector: String,
    /// Node holding the published timestamp
    pub published_selector: String,
    /// Attribute of the published node carrying the timestamp
    pub published_attribute: String,
    /// Page title node
    pub title_selector: String,
    pub sanitize: SanitizeMode,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            body_selector: "#HetVerhaal".to_string(),
            published_selector: "meta[property='article:published_time']".to_string(),
            published_attribute: "content".to_string(),
            title_selector: "title".to_string(),
            sanitize: SanitizeMode::First,
        }
    }
}

impl ExtractorConfig {
    pub fn with_body_selector(mut self, selector: impl Into<String>) -> Self {
        self.body_selector = selector.into();
        self
    }

    pub fn with_published_selector(mut self, selector: impl Into<String>) -> Self {
        self.published_selector = selector.into();
        self
    }

    pub fn with_sanitize(mut self, mode: SanitizeMode) -> Self {
        self.sanitize = mode;
        self
    }
}

/// Row selector of the chapter listing table.
pub const DEFAULT_LISTING_ROW_SELECTOR: &str = "div.tab.nobm .Overzicht";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_mode_parses_case_insensitively() {
        assert_eq!("First".parse::<SanitizeMode>().unwrap(), SanitizeMode::First);
        assert_eq!(" all ".parse::<SanitizeMode>().unwrap(), SanitizeMode::All);
        assert!("some".parse::<SanitizeMode>().is_err());
    }
}
