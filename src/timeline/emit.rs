use log::{debug, info};

use crate::error::{Result, TraceError};
use crate::run_data::{RunData, WorkflowRun};

use super::normalize::{normalize_jobs, NormalizedJob};
use super::track_id::track_id;
use super::types::{
    Conversion, EventKind, JobTiming, Trace, TraceEntry, TraceEvent, TrackDescriptor, TrackId,
    UnixNanos,
};

pub const WAITING_FOR_RUNNER: &str = "Waiting for runner";
pub const RUNNING: &str = "Running";

const JOB_SLICE: [&str; 2] = ["job", "slice"];
const JOB_INSTANT: [&str; 2] = ["job", "instant"];
const STEP_SLICE: [&str; 2] = ["step", "slice"];

/// Events of one track, staged until every interval on it is closed.
///
/// Each push is checked against the open-interval stack and the last
/// timestamp, so a track handed back by [`JobTrack::close`] is always well
/// nested and time-ordered.
#[derive(Debug)]
pub struct JobTrack {
    track_id: TrackId,
    open: Vec<UnixNanos>,
    last_timestamp: Option<UnixNanos>,
    events: Vec<TraceEvent>,
}

impl JobTrack {
    pub fn new(track_id: TrackId) -> Self {
        Self {
            track_id,
            open: Vec::new(),
            last_timestamp: None,
            events: Vec::new(),
        }
    }

    pub fn begin(&mut self, timestamp_ns: UnixNanos, name: &str, categories: &[&str]) -> Result<()> {
        self.advance_to(timestamp_ns)?;
        self.open.push(timestamp_ns);
        self.events.push(TraceEvent {
            track_id: self.track_id,
            timestamp_ns,
            kind: EventKind::Begin,
            name: Some(name.to_string()),
            categories: categories.iter().map(ToString::to_string).collect(),
        });
        Ok(())
    }

    pub fn end(&mut self, timestamp_ns: UnixNanos) -> Result<()> {
        self.advance_to(timestamp_ns)?;
        if self.open.pop().is_none() {
            return Err(self.violation("END without a matching BEGIN".to_string()));
        }
        self.events.push(TraceEvent {
            track_id: self.track_id,
            timestamp_ns,
            kind: EventKind::End,
            name: None,
            categories: Vec::new(),
        });
        Ok(())
    }

    /// Hands back the staged events, refusing if any interval is still open.
    pub fn close(self) -> Result<Vec<TraceEvent>> {
        if !self.open.is_empty() {
            return Err(self.violation(format!("{} interval(s) left open", self.open.len())));
        }
        Ok(self.events)
    }

    fn advance_to(&mut self, timestamp_ns: UnixNanos) -> Result<()> {
        if let Some(last) = self.last_timestamp {
            if timestamp_ns < last {
                return Err(self.violation(format!(
                    "timestamp {timestamp_ns} goes back before {last}"
                )));
            }
        }
        self.last_timestamp = Some(timestamp_ns);
        Ok(())
    }

    fn violation(&self, reason: String) -> TraceError {
        TraceError::Invariant {
            track_id: self.track_id,
            reason,
        }
    }
}

/// Accumulates the trace for one conversion.
///
/// Owned by the conversion call and returned by value from
/// [`TraceBuilder::finish`]; job events only land here once their track is
/// closed.
#[derive(Debug, Default)]
pub struct TraceBuilder {
    entries: Vec<TraceEntry>,
}

impl TraceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_track(&mut self, track: TrackDescriptor) {
        self.entries.push(TraceEntry::Track(track));
    }

    pub fn commit(&mut self, track: JobTrack) -> Result<()> {
        let events = track.close()?;
        self.entries.extend(events.into_iter().map(TraceEntry::Event));
        Ok(())
    }

    pub fn finish(self) -> Trace {
        Trace {
            entries: self.entries,
        }
    }
}

/// Normalizes the run's jobs and emits the full trace for them.
///
/// Nothing is returned unless every job converted cleanly.
///
/// # Errors
///
/// Input-shape errors from normalization, or [`TraceError::Invariant`] if the
/// emitted intervals would not nest.
pub fn convert(data: &RunData) -> Result<Conversion> {
    info!(
        "Converting run {} attempt {} ({} jobs)",
        data.run.id,
        data.run.run_attempt,
        data.jobs.len()
    );

    let jobs = normalize_jobs(&data.jobs)?;
    let trace = emit_trace(&data.run, &jobs)?;

    let timings = jobs
        .iter()
        .enumerate()
        .map(|(lane_index, job)| JobTiming {
            lane_index,
            name: job.job.name.clone(),
            conclusion: job.job.conclusion.clone(),
            runner: job.job.runner_label(),
            waiting_ns: job.waiting_ns(),
            running_ns: job.running_ns(),
            steps: job.steps.len(),
        })
        .collect();

    Ok(Conversion { trace, timings })
}

/// Emits the run track and, in the given order, one track per job.
///
/// # Errors
///
/// Returns [`TraceError::Invariant`] if a job's intervals fail to nest.
pub fn emit_trace(run: &WorkflowRun, jobs: &[NormalizedJob<'_>]) -> Result<Trace> {
    let run_track = track_id(run.id, run.run_attempt, None);
    let mut builder = TraceBuilder::new();

    builder.add_track(TrackDescriptor {
        track_id: run_track,
        parent_track_id: None,
        label: format!(
            "{} run {} attempt {}",
            run.display_title, run.id, run.run_attempt
        ),
        display_group: run.run_number,
        lane_index: None,
    });

    for (lane_index, job) in jobs.iter().enumerate() {
        emit_job(&mut builder, run, run_track, lane_index, job)?;
    }

    let trace = builder.finish();
    debug!("Emitted {} trace entries", trace.entries.len());

    Ok(trace)
}

fn emit_job(
    builder: &mut TraceBuilder,
    run: &WorkflowRun,
    run_track: TrackId,
    lane_index: usize,
    job: &NormalizedJob<'_>,
) -> Result<()> {
    let job_track = track_id(run.id, run.run_attempt, Some(job.job.id));
    debug!(
        "Emitting job {} ({}) on lane {lane_index}",
        job.job.id, job.job.name
    );

    let mut track = JobTrack::new(job_track);

    track.begin(job.created_at, &job.job.name, &JOB_SLICE)?;

    track.begin(job.created_at, WAITING_FOR_RUNNER, &JOB_SLICE)?;
    track.end(job.effective_start)?;

    track.begin(job.effective_start, RUNNING, &JOB_INSTANT)?;
    for step in &job.steps {
        track.begin(step.started_at, step.name, &STEP_SLICE)?;
        track.end(step.completed_at)?;
    }
    track.end(job.completed_at)?;

    track.end(job.completed_at)?;

    builder.add_track(TrackDescriptor {
        track_id: job_track,
        parent_track_id: Some(run_track),
        label: job.job.runner_label(),
        display_group: run.run_number,
        lane_index: Some(lane_index),
    });
    builder.commit(track)
}
