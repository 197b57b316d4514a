use chrono::DateTime;
use log::debug;

use crate::error::{Result, TraceError};
use crate::run_data::{WorkflowJob, WorkflowStep};

use super::types::UnixNanos;

/// A step with parsed, validated boundaries.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedStep<'a> {
    pub name: &'a str,
    pub started_at: UnixNanos,
    pub completed_at: UnixNanos,
}

/// A job ready for emission.
///
/// `effective_start` is the reconciled "runner acquired" instant: the earlier
/// of the job's own start and its first step's start.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedJob<'a> {
    pub job: &'a WorkflowJob,
    pub created_at: UnixNanos,
    pub effective_start: UnixNanos,
    pub completed_at: UnixNanos,
    pub steps: Vec<NormalizedStep<'a>>,
}

impl NormalizedJob<'_> {
    pub fn waiting_ns(&self) -> u64 {
        self.effective_start - self.created_at
    }

    pub fn running_ns(&self) -> u64 {
        self.completed_at - self.effective_start
    }
}

/// Drops skipped jobs, orders the rest by creation time and reconciles each
/// job's start time.
///
/// The sort is stable, so jobs created in the same instant keep their input
/// order. Any missing or unparsable timestamp, or any step interval that would
/// break nesting inside its job, fails the whole call.
///
/// # Errors
///
/// Returns [`TraceError::MissingField`], [`TraceError::InvalidTimestamp`] or
/// [`TraceError::InvalidInterval`] naming the offending job or step.
pub fn normalize_jobs(jobs: &[WorkflowJob]) -> Result<Vec<NormalizedJob<'_>>> {
    let mut normalized = jobs
        .iter()
        .filter(|job| {
            if job.is_skipped() {
                debug!("Skipping job {} ({}): conclusion is skipped", job.id, job.name);
            }
            !job.is_skipped()
        })
        .map(normalize_job)
        .collect::<Result<Vec<_>>>()?;

    normalized.sort_by_key(|job| job.created_at);

    Ok(normalized)
}

fn normalize_job(job: &WorkflowJob) -> Result<NormalizedJob<'_>> {
    let id = job.id.to_string();
    let field = |value: &Option<String>, name| parse_field(value, "job", &id, name);

    let created_at = field(&job.created_at, "created_at")?;
    let started_at = field(&job.started_at, "started_at")?;
    let completed_at = field(&job.completed_at, "completed_at")?;

    let steps = job
        .steps
        .iter()
        .map(|step| normalize_step(job, step))
        .collect::<Result<Vec<_>>>()?;

    let effective_start = steps
        .first()
        .map_or(started_at, |first| started_at.min(first.started_at));

    if effective_start != started_at {
        debug!(
            "Job {} reports start after its first step, using first step start",
            job.id
        );
    }

    let normalized = NormalizedJob {
        job,
        created_at,
        effective_start,
        completed_at,
        steps,
    };
    validate_job(&normalized)?;

    Ok(normalized)
}

fn normalize_step<'a>(job: &WorkflowJob, step: &'a WorkflowStep) -> Result<NormalizedStep<'a>> {
    let id = step_id(job, step);

    Ok(NormalizedStep {
        name: &step.name,
        started_at: parse_field(&step.started_at, "step", &id, "started_at")?,
        completed_at: parse_field(&step.completed_at, "step", &id, "completed_at")?,
    })
}

fn step_id(job: &WorkflowJob, step: &WorkflowStep) -> String {
    format!("'{}' (#{}) of job {}", step.name, step.number, job.id)
}

/// Checks that the job's intervals nest: waiting and running fit inside the
/// job lifetime, and steps are ordered, non-overlapping and inside running.
fn validate_job(normalized: &NormalizedJob<'_>) -> Result<()> {
    let job = normalized.job;
    let invalid = |reason: String| TraceError::InvalidInterval {
        entity: "job",
        id: job.id.to_string(),
        reason,
    };

    if normalized.effective_start < normalized.created_at {
        return Err(invalid("started before it was created".to_string()));
    }
    if normalized.completed_at < normalized.effective_start {
        return Err(invalid("completed before it started".to_string()));
    }

    let mut previous_end = normalized.effective_start;
    for (step, raw) in normalized.steps.iter().zip(&job.steps) {
        let invalid_step = |reason: &str| TraceError::InvalidInterval {
            entity: "step",
            id: step_id(job, raw),
            reason: reason.to_string(),
        };

        if step.completed_at < step.started_at {
            return Err(invalid_step("completed_at is before started_at"));
        }
        if step.started_at < previous_end {
            return Err(invalid_step("starts before the previous step completed"));
        }
        if step.completed_at > normalized.completed_at {
            return Err(invalid_step("completes after its job completed"));
        }
        previous_end = step.completed_at;
    }

    Ok(())
}

fn parse_field(
    value: &Option<String>,
    entity: &'static str,
    id: &str,
    field: &'static str,
) -> Result<UnixNanos> {
    let raw = value.as_deref().ok_or_else(|| TraceError::MissingField {
        entity,
        id: id.to_string(),
        field,
    })?;

    parse_timestamp(raw).ok_or_else(|| TraceError::InvalidTimestamp {
        entity,
        id: id.to_string(),
        field,
        value: raw.to_string(),
    })
}

/// Parses an RFC 3339 instant (second or sub-second resolution) into
/// nanoseconds since the Unix epoch.
///
/// Returns `None` for malformed input and for instants that do not fit an
/// unsigned nanosecond count (before 1970 or after 2262).
pub fn parse_timestamp(raw: &str) -> Option<UnixNanos> {
    let parsed = DateTime::parse_from_rfc3339(raw).ok()?;
    let nanos = parsed.timestamp_nanos_opt()?;
    u64::try_from(nanos).ok()
}
