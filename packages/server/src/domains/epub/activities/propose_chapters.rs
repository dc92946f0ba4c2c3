//! Propose a chapter order for a listing, without fetching any chapter.

use extraction::{propose_chapters, ChapterCandidate};
use tracing::{info, info_span, warn, Instrument};
use url::Url;

use crate::domains::epub::ActivityError;
use crate::kernel::ServerDeps;

/// Wait for the client's channel, then discover and rank the listing's
/// chapters with logs forwarded to it. The channel stays open for the job
/// that usually follows.
pub async fn propose_traced(
    deps: ServerDeps,
    trace_id: String,
    listing_url: Url,
) -> Result<Vec<ChapterCandidate>, ActivityError> {
    if let Err(e) = deps
        .traces
        .wait_for_channel(&trace_id, deps.config.trace_wait_timeout)
        .await
    {
        warn!(trace_id = %trace_id, listing = %listing_url, "Client channel never opened, discovery not started");
        return Err(e.into());
    }

    let span = info_span!("discovery", trace_id = %trace_id);
    propose(&deps, &listing_url).instrument(span).await
}

async fn propose(
    deps: &ServerDeps,
    listing_url: &Url,
) -> Result<Vec<ChapterCandidate>, ActivityError> {
    let mut page = deps.browser.default_page().await?;
    let proposed = propose_chapters(&mut **page, listing_url, &deps.config.listing_row_selector).await?;
    info!(listing = %listing_url, chapters = proposed.len(), "Proposed chapter order");
    Ok(proposed)
}
