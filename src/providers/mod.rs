pub mod github;

use crate::error::Result;
use crate::run_data::{WorkflowJob, WorkflowRun};

pub use github::GitHubProvider;

/// Where run and job records come from.
///
/// The trace builder only sees the resulting [`crate::run_data::RunData`], so
/// any implementation that can answer these two questions is interchangeable.
pub trait RunSource {
    /// Fetch the run, resolving the latest attempt when none is given.
    async fn fetch_run(&self, run_id: u64, attempt: Option<u32>) -> Result<WorkflowRun>;

    /// Fetch every job of the given run attempt, following pagination.
    async fn fetch_jobs(&self, run: &WorkflowRun) -> Result<Vec<WorkflowJob>>;
}
