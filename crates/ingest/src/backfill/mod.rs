//! Batched backfill jobs.

mod job;
mod result;
mod runner;

pub use job::BackfillJob;
pub use result::{BackfillJobResult, JobStatus};
pub use runner::{BackfillConfig, BackfillJobRunner};
