use graphql_client::QueryBody;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::core::GitHubClient;
use crate::error::{Result, TraceError};
use crate::run_data::{WorkflowJob, WorkflowStep};
use crate::timeline::parse_timestamp;

const CHECK_RUNS_OPERATION: &str = "CheckSuiteRuns";

/// Check runs of a check suite, with their steps.
///
/// Every job of a workflow run is a check run in the run's check suite.
const CHECK_RUNS_QUERY: &str = r"
query CheckSuiteRuns($id: ID!, $first: Int!, $after: String) {
  node(id: $id) {
    ... on CheckSuite {
      checkRuns(first: $first, after: $after) {
        pageInfo {
          hasNextPage
          endCursor
        }
        nodes {
          databaseId
          name
          status
          conclusion
          startedAt
          completedAt
          steps(first: 100) {
            nodes {
              name
              number
              startedAt
              completedAt
            }
          }
        }
      }
    }
  }
}
";

#[derive(Debug, Serialize)]
struct Variables {
    id: String,
    first: i64,
    after: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseData {
    node: Option<CheckSuiteNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckSuiteNode {
    check_runs: Option<CheckRunConnection>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckRunConnection {
    page_info: PageInfo,
    nodes: Option<Vec<Option<CheckRunNode>>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckRunNode {
    database_id: Option<u64>,
    name: String,
    status: String,
    conclusion: Option<String>,
    started_at: Option<String>,
    completed_at: Option<String>,
    steps: Option<CheckStepConnection>,
}

#[derive(Debug, Deserialize)]
struct CheckStepConnection {
    nodes: Option<Vec<Option<CheckStepNode>>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckStepNode {
    name: String,
    number: u32,
    started_at: Option<String>,
    completed_at: Option<String>,
}

impl CheckRunNode {
    /// GraphQL check runs carry no queue time and no runner, so the job is
    /// treated as created when it started, or when its first step started if
    /// the runner clock put that earlier.
    fn into_job(self) -> Result<WorkflowJob> {
        let id = self.database_id.ok_or_else(|| TraceError::MissingField {
            entity: "check run",
            id: self.name.clone(),
            field: "databaseId",
        })?;

        let steps = self
            .steps
            .and_then(|conn| conn.nodes)
            .into_iter()
            .flatten()
            .flatten()
            .map(|step| WorkflowStep {
                name: step.name,
                number: step.number,
                started_at: step.started_at,
                completed_at: step.completed_at,
            })
            .collect::<Vec<_>>();

        let first_step_start = steps.first().and_then(|step| step.started_at.as_deref());
        let created_at = earliest(self.started_at.as_deref(), first_step_start);

        Ok(WorkflowJob {
            id,
            name: self.name,
            status: self.status.to_lowercase(),
            conclusion: self.conclusion.map(|c| c.to_lowercase()),
            created_at,
            started_at: self.started_at,
            completed_at: self.completed_at,
            runner_name: None,
            runner_id: None,
            steps,
        })
    }
}

/// The earlier of two RFC 3339 instants, preferring `started_at` when the two
/// cannot be compared.
fn earliest(started_at: Option<&str>, first_step_start: Option<&str>) -> Option<String> {
    let earliest = match (started_at, first_step_start) {
        (Some(job), Some(step)) => match (parse_timestamp(job), parse_timestamp(step)) {
            (Some(job_ns), Some(step_ns)) if step_ns < job_ns => step,
            _ => job,
        },
        (job, step) => job.or(step)?,
    };
    Some(earliest.to_string())
}

impl GitHubClient {
    /// Fetch all check runs of a check suite using cursor-based pagination.
    ///
    /// # Errors
    ///
    /// Returns an error if the GraphQL query fails, the node is not a check
    /// suite, or a check run lacks its database id.
    pub async fn fetch_check_suite_jobs(
        &self,
        check_suite_node_id: &str,
        per_page: usize,
    ) -> Result<Vec<WorkflowJob>> {
        let mut jobs = Vec::new();
        let mut cursor: Option<String> = None;

        #[allow(clippy::cast_possible_wrap)]
        let first = per_page.clamp(1, 100) as i64;

        loop {
            let request_body = QueryBody {
                variables: Variables {
                    id: check_suite_node_id.to_string(),
                    first,
                    after: cursor.clone(),
                },
                query: CHECK_RUNS_QUERY,
                operation_name: CHECK_RUNS_OPERATION,
            };

            let data: ResponseData = self.execute_graphql_request(&request_body).await?;

            let check_runs = data
                .node
                .and_then(|node| node.check_runs)
                .ok_or_else(|| {
                    TraceError::Api(format!(
                        "Node '{check_suite_node_id}' is not a check suite with check runs"
                    ))
                })?;

            for node in check_runs.nodes.into_iter().flatten().flatten() {
                jobs.push(node.into_job()?);
            }

            debug!("Fetched {} check runs so far", jobs.len());

            if !check_runs.page_info.has_next_page {
                break;
            }

            cursor = check_runs.page_info.end_cursor;

            // hasNextPage without a cursor would loop forever
            if cursor.is_none() {
                break;
            }
        }

        info!("Fetched {} check runs via GraphQL", jobs.len());

        Ok(jobs)
    }
}
