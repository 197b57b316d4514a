//! Mapping of a [`Trace`] onto Perfetto's `TracePacket` protobuf.
//!
//! Only the subset of `perfetto/trace/trace.proto` needed for synthetic track
//! events is declared here; field tags follow the upstream schema.
//! See <https://perfetto.dev/docs/reference/synthetic-track-event>.

use prost::Message;
use serde::Serialize;

use crate::error::{Result, TraceError};
use crate::timeline::{EventKind, Trace, TraceEntry, TraceEvent, TrackDescriptor};

/// `TracePacket.SequenceFlags.SEQ_INCREMENTAL_STATE_CLEARED`
const SEQ_INCREMENTAL_STATE_CLEARED: u32 = 1;

#[derive(Clone, PartialEq, Message, Serialize)]
pub struct PerfettoTrace {
    #[prost(message, repeated, tag = "1")]
    pub packet: Vec<TracePacket>,
}

#[derive(Clone, PartialEq, Message, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TracePacket {
    #[prost(uint64, optional, tag = "8")]
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "as_string"
    )]
    pub timestamp: Option<u64>,
    #[prost(uint32, optional, tag = "10")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trusted_packet_sequence_id: Option<u32>,
    #[prost(message, optional, tag = "11")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track_event: Option<TrackEvent>,
    #[prost(uint32, optional, tag = "13")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence_flags: Option<u32>,
    #[prost(message, optional, tag = "60")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track_descriptor: Option<PerfettoTrackDescriptor>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum TrackEventType {
    Unspecified = 0,
    SliceBegin = 1,
    SliceEnd = 2,
}

impl TrackEventType {
    fn proto_name(self) -> &'static str {
        match self {
            Self::Unspecified => "TYPE_UNSPECIFIED",
            Self::SliceBegin => "TYPE_SLICE_BEGIN",
            Self::SliceEnd => "TYPE_SLICE_END",
        }
    }
}

#[derive(Clone, PartialEq, Message, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackEvent {
    #[prost(enumeration = "TrackEventType", optional, tag = "9")]
    #[serde(
        rename = "type",
        skip_serializing_if = "Option::is_none",
        serialize_with = "event_type_name"
    )]
    pub r#type: Option<i32>,
    #[prost(uint64, optional, tag = "11")]
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "as_string"
    )]
    pub track_uuid: Option<u64>,
    #[prost(string, repeated, tag = "22")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    #[prost(string, optional, tag = "23")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Clone, PartialEq, Message, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerfettoTrackDescriptor {
    #[prost(uint64, optional, tag = "1")]
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "as_string"
    )]
    pub uuid: Option<u64>,
    #[prost(message, optional, tag = "3")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process: Option<ProcessDescriptor>,
    #[prost(message, optional, tag = "4")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread: Option<ThreadDescriptor>,
    #[prost(uint64, optional, tag = "5")]
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "as_string"
    )]
    pub parent_uuid: Option<u64>,
}

#[derive(Clone, PartialEq, Message, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessDescriptor {
    #[prost(int32, optional, tag = "1")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<i32>,
    #[prost(string, optional, tag = "6")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_name: Option<String>,
}

#[derive(Clone, PartialEq, Message, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadDescriptor {
    #[prost(int32, optional, tag = "1")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<i32>,
    #[prost(int32, optional, tag = "2")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tid: Option<i32>,
    #[prost(string, optional, tag = "5")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_name: Option<String>,
}

// Protobuf JSON renders 64-bit integers as strings.
fn as_string<S>(value: &Option<u64>, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match value {
        Some(value) => serializer.serialize_str(&value.to_string()),
        None => serializer.serialize_none(),
    }
}

fn event_type_name<S>(value: &Option<i32>, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    let name = value
        .and_then(|value| TrackEventType::try_from(value).ok())
        .unwrap_or(TrackEventType::Unspecified)
        .proto_name();
    serializer.serialize_str(name)
}

/// Builds the Perfetto packet list for a trace.
///
/// Every packet carries `trusted_packet_sequence_id`; the first one also
/// clears incremental state, which Perfetto expects at the start of a
/// sequence.
///
/// # Errors
///
/// Returns [`TraceError::OutOfRange`] if a run number or lane index does not
/// fit Perfetto's int32 pid/tid fields.
pub fn to_perfetto(trace: &Trace, trusted_packet_sequence_id: u32) -> Result<PerfettoTrace> {
    let mut packet = trace
        .entries
        .iter()
        .map(|entry| -> Result<TracePacket> {
            let mut packet = match entry {
                TraceEntry::Track(track) => descriptor_packet(track)?,
                TraceEntry::Event(event) => event_packet(event),
            };
            packet.trusted_packet_sequence_id = Some(trusted_packet_sequence_id);
            Ok(packet)
        })
        .collect::<Result<Vec<_>>>()?;

    if let Some(first) = packet.first_mut() {
        first.sequence_flags = Some(SEQ_INCREMENTAL_STATE_CLEARED);
    }

    Ok(PerfettoTrace { packet })
}

/// Perfetto's pid and tid are int32.
fn to_int32(track: &TrackDescriptor, field: &'static str, value: u64) -> Result<i32> {
    i32::try_from(value).map_err(|_| TraceError::OutOfRange {
        track_id: track.track_id,
        field,
        value,
    })
}

fn descriptor_packet(track: &TrackDescriptor) -> Result<TracePacket> {
    let pid = to_int32(track, "pid", track.display_group)?;

    let (process, thread) = match track.lane_index {
        None => (
            Some(ProcessDescriptor {
                pid: Some(pid),
                process_name: Some(track.label.clone()),
            }),
            None,
        ),
        Some(lane_index) => (
            None,
            Some(ThreadDescriptor {
                pid: Some(pid),
                tid: Some(to_int32(track, "tid", lane_index as u64)?),
                thread_name: Some(track.label.clone()),
            }),
        ),
    };

    Ok(TracePacket {
        track_descriptor: Some(PerfettoTrackDescriptor {
            uuid: Some(track.track_id),
            parent_uuid: track.parent_track_id,
            process,
            thread,
        }),
        ..TracePacket::default()
    })
}

fn event_packet(event: &TraceEvent) -> TracePacket {
    let kind = match event.kind {
        EventKind::Begin => TrackEventType::SliceBegin,
        EventKind::End => TrackEventType::SliceEnd,
    };

    TracePacket {
        timestamp: Some(event.timestamp_ns),
        track_event: Some(TrackEvent {
            r#type: Some(kind as i32),
            track_uuid: Some(event.track_id),
            categories: event.categories.clone(),
            name: event.name.clone(),
        }),
        ..TracePacket::default()
    }
}

/// Binary protobuf encoding, as loaded by `ui.perfetto.dev`.
pub fn encode(trace: &PerfettoTrace) -> Vec<u8> {
    trace.encode_to_vec()
}

/// Human-readable rendition of the same packets, for debugging.
pub fn to_debug_json(trace: &PerfettoTrace) -> Result<String> {
    Ok(serde_json::to_string_pretty(trace)?)
}
