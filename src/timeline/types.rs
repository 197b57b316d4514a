use serde::Serialize;

/// Stable 64-bit identity of a timeline lane, see [`super::track_id`].
pub type TrackId = u64;

/// Nanoseconds since the Unix epoch.
pub type UnixNanos = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventKind {
    Begin,
    End,
}

/// A named lane in the trace.
///
/// The run gets a process-level track (`lane_index` is `None`), every job a
/// thread-level track parented to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackDescriptor {
    pub track_id: TrackId,
    pub parent_track_id: Option<TrackId>,
    pub label: String,
    /// Process-level grouping shown by the viewer (the run number)
    pub display_group: u64,
    pub lane_index: Option<usize>,
}

/// One BEGIN or END marker on a track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceEvent {
    pub track_id: TrackId,
    pub timestamp_ns: UnixNanos,
    pub kind: EventKind,
    pub name: Option<String>,
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TraceEntry {
    Track(TrackDescriptor),
    Event(TraceEvent),
}

/// Ordered output of one conversion: descriptors and events interleaved in
/// emission order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Trace {
    pub entries: Vec<TraceEntry>,
}

impl Trace {
    pub fn tracks(&self) -> impl Iterator<Item = &TrackDescriptor> {
        self.entries.iter().filter_map(|entry| match entry {
            TraceEntry::Track(track) => Some(track),
            TraceEntry::Event(_) => None,
        })
    }

    pub fn events(&self) -> impl Iterator<Item = &TraceEvent> {
        self.entries.iter().filter_map(|entry| match entry {
            TraceEntry::Event(event) => Some(event),
            TraceEntry::Track(_) => None,
        })
    }

    #[cfg(test)]
    pub fn events_on(&self, track_id: TrackId) -> impl Iterator<Item = &TraceEvent> {
        self.events().filter(move |event| event.track_id == track_id)
    }
}

/// Per-job durations shown in the terminal summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobTiming {
    pub lane_index: usize,
    pub name: String,
    pub conclusion: Option<String>,
    pub runner: String,
    pub waiting_ns: u64,
    pub running_ns: u64,
    pub steps: usize,
}

/// Result of converting one run: the trace plus the timings behind it.
#[derive(Debug, Clone)]
pub struct Conversion {
    pub trace: Trace,
    pub timings: Vec<JobTiming>,
}
