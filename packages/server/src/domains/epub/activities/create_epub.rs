//! Build a book on behalf of a client watching a trace.

use tracing::{info_span, warn, Instrument};

use crate::domains::epub::models::{JobInput, JobKey, JobOutcome};
use crate::domains::epub::runner::EpubJobRunner;
use crate::domains::epub::ActivityError;
use crate::kernel::ServerDeps;

/// Wait for the client's channel, run the job with its logs forwarded to
/// that channel, then close the channel.
///
/// Returns `ChannelTimeout` without starting anything when no channel shows
/// up within the configured wait.
pub async fn run_traced_job(
    deps: ServerDeps,
    trace_id: String,
    key: JobKey,
    input: JobInput,
) -> Result<JobOutcome, ActivityError> {
    if let Err(e) = deps
        .traces
        .wait_for_channel(&trace_id, deps.config.trace_wait_timeout)
        .await
    {
        warn!(trace_id = %trace_id, job_key = %key, "Client channel never opened, job not started");
        return Err(e.into());
    }

    let span = info_span!("job", trace_id = %trace_id, job_key = %key);
    let outcome = EpubJobRunner::new(deps.clone())
        .run(&key, input)
        .instrument(span)
        .await;

    deps.traces.close(&trace_id);
    Ok(outcome?)
}
