//! Chapter ordering and collection title resolution.
//!
//! Two orderings exist. When the caller confirmed a sequence every chapter
//! carries a rank and that rank wins; otherwise chapters are sorted by the
//! published timestamp found on their pages.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::types::chapter::{ChapterCandidate, ChapterRef, FetchedChapter};

/// Separates the series name from the chapter marker in chapter titles.
const SERIES_SEPARATOR: char = '-';

/// Spacing between proposed ranks, leaves room to insert chapters by hand.
pub const RANK_STEP: i64 = 10;

const FALLBACK_TITLE: &str = "Untitled";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderingMode {
    /// Ascending by published timestamp
    Timestamp,
    /// Ascending by caller-supplied rank
    Rank,
}

impl OrderingMode {
    /// Rank mode only when every chapter carries a rank.
    pub fn for_chapters<'a>(chapters: impl IntoIterator<Item = &'a ChapterRef>) -> Self {
        let mut any = false;
        for chapter in chapters {
            if chapter.order.is_none() {
                return Self::Timestamp;
            }
            any = true;
        }
        if any {
            Self::Rank
        } else {
            Self::Timestamp
        }
    }
}

/// Sort fetched chapters into book order. The sort is stable.
pub fn order_chapters(mut chapters: Vec<FetchedChapter>) -> (OrderingMode, Vec<FetchedChapter>) {
    let mode = OrderingMode::for_chapters(chapters.iter().map(|c| &c.chapter));
    match mode {
        OrderingMode::Rank => chapters.sort_by_key(|c| c.chapter.order),
        OrderingMode::Timestamp => chapters.sort_by_key(|c| c.content.published_at),
    }
    (mode, chapters)
}

/// Book title derived from a chapter title: everything before the last
/// `-`, trimmed. Falls back to the whole title when there is no usable
/// prefix.
pub fn collection_title(chapter_title: &str) -> String {
    let prefix = chapter_title
        .rfind(SERIES_SEPARATOR)
        .map(|idx| chapter_title[..idx].trim())
        .unwrap_or_default();

    if !prefix.is_empty() {
        return prefix.to_string();
    }

    let whole = chapter_title.trim();
    if whole.is_empty() {
        FALLBACK_TITLE.to_string()
    } else {
        whole.to_string()
    }
}

/// Split a listing title into the text before the last `-` and the number
/// trailing after it.
fn series_key(title: &str) -> (String, Option<u64>) {
    match title.rfind(SERIES_SEPARATOR) {
        Some(idx) => {
            let prefix = title[..idx].trim().to_string();
            (prefix, trailing_number(&title[idx + 1..]))
        }
        None => (title.trim().to_string(), None),
    }
}

fn trailing_number(text: &str) -> Option<u64> {
    let trimmed = text.trim_end();
    let digits_start = trimmed
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(idx, _)| idx)?;
    trimmed[digits_start..].parse().ok()
}

fn compare_numbers(a: Option<u64>, b: Option<u64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Propose an order for candidates found on a listing page.
///
/// Duplicate links are dropped (first occurrence wins). The rest is sorted
/// by series name, then numerically by chapter number, and given ranks
/// 10, 20, 30, ...
pub fn rank_candidates(candidates: Vec<ChapterCandidate>) -> Vec<ChapterCandidate> {
    let mut seen = HashSet::new();
    let mut unique: Vec<ChapterCandidate> = candidates
        .into_iter()
        .filter(|c| seen.insert(c.link.clone()))
        .collect();

    unique.sort_by(|a, b| {
        let (a_series, a_number) = series_key(&a.title);
        let (b_series, b_number) = series_key(&b.title);
        a_series
            .cmp(&b_series)
            .then_with(|| compare_numbers(a_number, b_number))
    });

    for (idx, candidate) in unique.iter_mut().enumerate() {
        candidate.order = Some((idx as i64 + 1) * RANK_STEP);
    }
    unique
}
