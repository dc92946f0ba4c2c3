pub mod create_epub;
pub mod propose_chapters;

pub use create_epub::run_traced_job;
pub use propose_chapters::propose_traced;

use extraction::{BrowserError, PageError};
use thiserror::Error;

use super::models::JobError;
use crate::kernel::ChannelUnavailable;

/// Failure of a client-facing activity.
#[derive(Debug, Error)]
pub enum ActivityError {
    /// The client never opened its channel; nothing was started.
    #[error(transparent)]
    ChannelTimeout(#[from] ChannelUnavailable),

    #[error(transparent)]
    Job(#[from] JobError),

    #[error("chapter discovery failed: {0}")]
    Discovery(#[from] PageError),

    #[error("browser unavailable: {0}")]
    Browser(#[from] BrowserError),
}
