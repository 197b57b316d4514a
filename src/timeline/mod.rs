//! Turns a workflow run into nested trace intervals.
//!
//! Each non-skipped job becomes one track under the run's track, holding
//! `[job [Waiting for runner] [Running [step] [step] ...]]`.

mod emit;
mod normalize;
mod track_id;
mod types;

pub use emit::convert;
pub use normalize::parse_timestamp;
pub use types::{EventKind, JobTiming, Trace, TraceEntry, TraceEvent, TrackDescriptor};
