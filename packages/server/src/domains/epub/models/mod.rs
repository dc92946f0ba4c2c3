pub mod job;
pub mod job_key;

pub use job::{JobError, JobInput, JobOutcome, JobState};
pub use job_key::{InvalidJobKey, JobKey};
