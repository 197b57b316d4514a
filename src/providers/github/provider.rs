use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;

use crate::auth::Token;
use crate::config::{ApiKind, GitHubConfig};
use crate::error::{Result, TraceError};
use crate::output::PhaseProgress;
use crate::providers::RunSource;
use crate::run_data::{RunData, WorkflowJob, WorkflowRun};

use super::cache::RunCache;
use super::client::GitHubClient;
use super::run_url::RunUrl;

/// Reads runs and jobs from the REST API only.
pub struct RestSource {
    client: Arc<GitHubClient>,
    owner: String,
    repo: String,
    per_page: usize,
}

/// Reads the run from REST and its jobs from the run's check suite over
/// GraphQL.
pub struct GraphQlSource {
    client: Arc<GitHubClient>,
    owner: String,
    repo: String,
    per_page: usize,
}

impl RestSource {
    pub fn new(client: Arc<GitHubClient>, owner: &str, repo: &str, per_page: usize) -> Self {
        Self {
            client,
            owner: owner.to_string(),
            repo: repo.to_string(),
            per_page,
        }
    }
}

impl GraphQlSource {
    /// # Errors
    ///
    /// GitHub's GraphQL API rejects anonymous requests, so a client without a
    /// token is a configuration error.
    pub fn new(client: Arc<GitHubClient>, owner: &str, repo: &str, per_page: usize) -> Result<Self> {
        if !client.has_token() {
            return Err(TraceError::Config(
                "The GraphQL API requires a GitHub token".to_string(),
            ));
        }

        Ok(Self {
            client,
            owner: owner.to_string(),
            repo: repo.to_string(),
            per_page,
        })
    }
}

impl RunSource for RestSource {
    async fn fetch_run(&self, run_id: u64, attempt: Option<u32>) -> Result<WorkflowRun> {
        self.client
            .fetch_workflow_run(&self.owner, &self.repo, run_id, attempt)
            .await
    }

    async fn fetch_jobs(&self, run: &WorkflowRun) -> Result<Vec<WorkflowJob>> {
        self.client
            .fetch_workflow_jobs(&self.owner, &self.repo, run.id, run.run_attempt, self.per_page)
            .await
    }
}

impl RunSource for GraphQlSource {
    async fn fetch_run(&self, run_id: u64, attempt: Option<u32>) -> Result<WorkflowRun> {
        self.client
            .fetch_workflow_run(&self.owner, &self.repo, run_id, attempt)
            .await
    }

    async fn fetch_jobs(&self, run: &WorkflowRun) -> Result<Vec<WorkflowJob>> {
        let node_id = run.check_suite_node_id.as_deref().ok_or_else(|| {
            TraceError::MissingField {
                entity: "run",
                id: run.id.to_string(),
                field: "check_suite_node_id",
            }
        })?;

        warn!("GraphQL does not expose queue times; waiting intervals will be empty");

        self.client
            .fetch_check_suite_jobs(node_id, self.per_page)
            .await
    }
}

/// Fetches a run and its jobs through any [`RunSource`].
///
/// # Errors
///
/// Propagates source errors, and fails with [`TraceError::Api`] if the run
/// has no jobs at all.
pub async fn fetch_run_data<S: RunSource>(
    source: &S,
    url: &RunUrl,
    progress: PhaseProgress,
) -> Result<RunData> {
    let run = source.fetch_run(url.run_id, url.attempt).await?;
    info!(
        "Fetched run {} attempt {}: {}",
        run.id, run.run_attempt, run.display_title
    );

    let progress = progress.finish_phase_1_start_phase_2();

    let jobs = source.fetch_jobs(&run).await?;
    if jobs.is_empty() {
        return Err(TraceError::Api(format!(
            "Run {} attempt {} has no jobs",
            run.id, run.run_attempt
        )));
    }

    progress.finish_phase_2();

    Ok(RunData { run, jobs })
}

/// GitHub Actions data provider.
///
/// Picks the REST or GraphQL source from configuration and serves completed
/// run attempts from the local cache when possible.
pub struct GitHubProvider {
    client: Arc<GitHubClient>,
    api: ApiKind,
    per_page: usize,
    cache: RunCache,
}

impl GitHubProvider {
    /// Creates a provider from the `[github]` configuration section.
    ///
    /// # Errors
    ///
    /// Returns an error if the API URLs are invalid or the cache directory
    /// cannot be created.
    pub fn new(config: &GitHubConfig, token: Option<Token>) -> Result<Self> {
        let client = GitHubClient::new(&config.base_url, &config.graphql_url, token)?
            .with_retry_policy(
                config.max_retries,
                Duration::from_secs(config.retry_delay_secs),
            );
        let cache = RunCache::new(!config.no_cache)?;

        Ok(Self::with_parts(client, config.api, config.per_page, cache))
    }

    pub fn with_parts(client: GitHubClient, api: ApiKind, per_page: usize, cache: RunCache) -> Self {
        Self {
            client: Arc::new(client),
            api,
            per_page,
            cache,
        }
    }

    /// Fetches everything needed to build the trace for `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if any API request fails after retries, the run has no
    /// jobs, or the GraphQL source is selected without a token.
    pub async fn fetch_run_data(&self, url: &RunUrl) -> Result<RunData> {
        info!("Fetching data from {url}");

        if let Some(data) = self.cache.get(url) {
            info!("Using cached data for {url}");
            return Ok(data);
        }

        let data = match self.api {
            ApiKind::Rest => {
                let source =
                    RestSource::new(self.client.clone(), &url.owner, &url.repo, self.per_page);
                fetch_run_data(&source, url, PhaseProgress::start_phase_1()).await?
            }
            ApiKind::Graphql => {
                let source =
                    GraphQlSource::new(self.client.clone(), &url.owner, &url.repo, self.per_page)?;
                fetch_run_data(&source, url, PhaseProgress::start_phase_1()).await?
            }
        };

        if let Err(e) = self.cache.store(&url.owner, &url.repo, &data) {
            warn!("Failed to cache run {}: {e}", data.run.id);
        }

        Ok(data)
    }
}
