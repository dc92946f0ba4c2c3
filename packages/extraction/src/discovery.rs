//! Chapter discovery from a listing page.
//!
//! Each listing row holds a title column (with the chapter link), a category
//! column and a short `dd-mm-yy` date column. Discovery only reads the
//! listing; no chapter content is fetched.

use scraper::{Html, Selector};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{ExtractionError, PageResult};
use crate::extractor::parse_published;
use crate::ordering::rank_candidates;
use crate::traits::browser::Page;
use crate::types::chapter::ChapterCandidate;

/// Navigate `page` to the listing and collect the chapters it links to,
/// in listing order, without ranks.
pub async fn discover_chapters(
    page: &mut dyn Page,
    listing_url: &Url,
    row_selector: &str,
) -> PageResult<Vec<ChapterCandidate>> {
    page.goto(listing_url.as_str()).await?;

    // Relative links resolve against the final URL after redirects
    let base = page
        .url()
        .and_then(|u| Url::parse(u).ok())
        .unwrap_or_else(|| listing_url.clone());

    let rows = page.query_selector_all(row_selector).await?;
    if rows.is_empty() {
        return Err(ExtractionError::MissingSelector {
            selector: row_selector.to_string(),
        }
        .into());
    }

    let candidates: Vec<ChapterCandidate> = rows
        .iter()
        .filter_map(|row| {
            let candidate = parse_row(&row.inner_html, &base);
            if candidate.is_none() {
                debug!(row = %row.text.trim(), "Skipping listing row without a link");
            }
            candidate
        })
        .collect();

    if candidates.len() < rows.len() {
        warn!(
            rows = rows.len(),
            chapters = candidates.len(),
            "Some listing rows had no chapter link"
        );
    }
    info!(listing = %listing_url, chapters = candidates.len(), "Discovered chapters");

    Ok(candidates)
}

/// Discover chapters and propose a ranked order for the caller to confirm.
pub async fn propose_chapters(
    page: &mut dyn Page,
    listing_url: &Url,
    row_selector: &str,
) -> PageResult<Vec<ChapterCandidate>> {
    let candidates = discover_chapters(page, listing_url, row_selector).await?;
    Ok(rank_candidates(candidates))
}

/// Read one listing row. Columns are the row's `div` descendants.
fn parse_row(row_html: &str, base: &Url) -> Option<ChapterCandidate> {
    let fragment = Html::parse_fragment(row_html);
    let columns = Selector::parse("div").ok()?;
    let anchor = Selector::parse("a[href]").ok()?;

    let mut columns = fragment.select(&columns);

    let title_column = columns.next()?;
    let href = title_column
        .select(&anchor)
        .next()
        .and_then(|a| a.value().attr("href"))?;
    let link = base.join(href).ok()?;
    let title = title_column.text().collect::<String>().trim().to_string();

    let mut candidate = ChapterCandidate::new(link, title);

    if let Some(category) = columns.next() {
        let text = category.text().collect::<String>().trim().to_string();
        if !text.is_empty() {
            candidate.category = Some(text);
        }
    }
    if let Some(date) = columns.next() {
        candidate.listed_at = parse_published(&date.text().collect::<String>());
    }

    Some(candidate)
}
