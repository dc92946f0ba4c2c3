//! EPUB domain - bind a serial's chapters into one downloadable book

pub mod activities;
pub mod models;
pub mod runner;

// Re-export activities
pub use activities::{propose_traced, run_traced_job, ActivityError};

// Re-export models
pub use models::{JobError, JobInput, JobKey, JobOutcome, JobState};

pub use runner::EpubJobRunner;
