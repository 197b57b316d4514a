use futures::future::join_all;
use log::{debug, info};
use serde::Deserialize;

use super::core::GitHubClient;
use crate::error::Result;
use crate::run_data::{WorkflowJob, WorkflowRun};

/// One page of `GET /repos/{owner}/{repo}/actions/runs/{id}/attempts/{n}/jobs`.
#[derive(Debug, Deserialize)]
struct WorkflowJobsPage {
    total_count: usize,
    jobs: Vec<WorkflowJob>,
}

impl GitHubClient {
    /// Fetch a workflow run, or one specific attempt of it.
    ///
    /// Without an attempt GitHub answers with the latest one; its
    /// `run_attempt` tells which.
    pub async fn fetch_workflow_run(
        &self,
        owner: &str,
        repo: &str,
        run_id: u64,
        attempt: Option<u32>,
    ) -> Result<WorkflowRun> {
        let mut path = format!("repos/{owner}/{repo}/actions/runs/{run_id}");
        if let Some(attempt) = attempt {
            path.push_str(&format!("/attempts/{attempt}"));
        }

        self.get_json(self.endpoint(&path)?).await
    }

    /// Fetch every job of a run attempt.
    ///
    /// The first page reveals `total_count`; the remaining pages are then
    /// requested concurrently and appended in page order.
    pub async fn fetch_workflow_jobs(
        &self,
        owner: &str,
        repo: &str,
        run_id: u64,
        attempt: u32,
        per_page: usize,
    ) -> Result<Vec<WorkflowJob>> {
        let per_page = per_page.clamp(1, 100);

        let first = self
            .fetch_jobs_page(owner, repo, run_id, attempt, 1, per_page)
            .await?;
        let total_count = first.total_count;
        let pages = total_count.div_ceil(per_page).max(1);

        debug!("Run {run_id} attempt {attempt} has {total_count} jobs over {pages} page(s)");

        let mut jobs = first.jobs;
        let rest = join_all(
            (2..=pages).map(|page| self.fetch_jobs_page(owner, repo, run_id, attempt, page, per_page)),
        )
        .await;

        for page in rest {
            jobs.extend(page?.jobs);
        }

        info!("Fetched {} jobs for run {run_id}", jobs.len());

        Ok(jobs)
    }

    async fn fetch_jobs_page(
        &self,
        owner: &str,
        repo: &str,
        run_id: u64,
        attempt: u32,
        page: usize,
        per_page: usize,
    ) -> Result<WorkflowJobsPage> {
        let mut url = self.endpoint(&format!(
            "repos/{owner}/{repo}/actions/runs/{run_id}/attempts/{attempt}/jobs"
        ))?;
        url.query_pairs_mut()
            .append_pair("per_page", &per_page.to_string())
            .append_pair("page", &page.to_string());

        self.get_json(url).await
    }
}
