use serde::{Deserialize, Serialize};

/// Everything the trace builder needs to know about one workflow run attempt.
///
/// This is the hand-off between the GitHub providers and the timeline code,
/// and also the on-disk format written by `fetch` and read by `convert`.
/// Timestamps stay as the raw strings GitHub sent so that the normalizer can
/// report bad values together with the job or step they belong to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunData {
    pub run: WorkflowRun,
    pub jobs: Vec<WorkflowJob>,
}

/// A GitHub Actions workflow run attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRun {
    /// Unique identifier for the workflow run
    pub id: u64,
    /// Attempt number (1 for the first run, incremented on re-run)
    pub run_attempt: u32,
    /// Sequential run number within the workflow
    pub run_number: u64,
    /// Display title for the run
    pub display_title: String,
    /// Node id of the check suite backing this run (REST only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_suite_node_id: Option<String>,
}

/// Job within a GitHub Actions workflow run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowJob {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub status: String,
    /// `None` while the job is still queued or running
    pub conclusion: Option<String>,
    /// When the job was queued
    pub created_at: Option<String>,
    /// When a runner picked the job up
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub runner_name: Option<String>,
    pub runner_id: Option<u64>,
    #[serde(default)]
    pub steps: Vec<WorkflowStep>,
}

/// Step within a GitHub Actions job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub name: String,
    #[serde(default)]
    pub number: u32,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
}

impl WorkflowJob {
    pub fn is_skipped(&self) -> bool {
        self.conclusion.as_deref() == Some("skipped")
    }

    /// Label used for the job's track, e.g. `GitHub Actions 12 (12)`.
    pub fn runner_label(&self) -> String {
        let name = self.runner_name.as_deref().unwrap_or("N/A");
        match self.runner_id {
            Some(id) => format!("{name} ({id})"),
            None => format!("{name} (N/A)"),
        }
    }
}

impl RunData {
    /// True when every job has reached a terminal state upstream.
    pub fn is_complete(&self) -> bool {
        self.jobs.iter().all(|job| job.status == "completed")
    }
}
