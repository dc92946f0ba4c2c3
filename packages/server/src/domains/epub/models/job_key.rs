use std::fmt;

use extraction::ChapterRef;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::common::utils::{generate_content_hash, is_content_hash};

/// Fingerprint of a job's defining input. Names both the cache entry and
/// the artifact file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct JobKey(String);

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid job key: {0:?}")]
pub struct InvalidJobKey(pub String);

impl JobKey {
    /// Key of a whole-listing job. Hashes the URL exactly as the client sent it.
    pub fn for_listing(url: &str) -> Self {
        Self(generate_content_hash(url))
    }

    /// Key of a job over a confirmed chapter set. Independent of the order
    /// the chapters were submitted in.
    pub fn for_chapters(chapters: &[ChapterRef]) -> Self {
        let mut lines: Vec<String> = chapters
            .iter()
            .map(|c| {
                let order = c.order.map(|o| o.to_string()).unwrap_or_default();
                format!("{}\t{}\t{}", c.link, c.title, order)
            })
            .collect();
        lines.sort();
        Self(generate_content_hash(&lines.join("\n")))
    }

    /// Accept a key supplied by a client.
    pub fn parse(candidate: &str) -> Result<Self, InvalidJobKey> {
        if is_content_hash(candidate) {
            Ok(Self(candidate.to_ascii_lowercase()))
        } else {
            Err(InvalidJobKey(candidate.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn artifact_file_name(&self) -> String {
        format!("{}.epub", self.0)
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for JobKey {
    type Error = InvalidJobKey;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<JobKey> for String {
    fn from(key: JobKey) -> Self {
        key.0
    }
}
