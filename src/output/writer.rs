use std::fs;

use log::info;

use crate::config::OutputConfig;
use crate::error::Result;
use crate::timeline::Trace;

use super::perfetto;

/// Writes the binary Perfetto trace, and the debug JSON when one is
/// configured.
///
/// # Errors
///
/// Returns an error if the trace does not fit the Perfetto format or either
/// file cannot be written.
pub fn write_trace(
    trace: &Trace,
    config: &OutputConfig,
    trusted_packet_sequence_id: u32,
) -> Result<()> {
    let packets = perfetto::to_perfetto(trace, trusted_packet_sequence_id)?;

    let bytes = perfetto::encode(&packets);
    fs::write(&config.output_file, &bytes)?;
    info!(
        "Wrote {} tracks and {} events ({} bytes) to {}",
        trace.tracks().count(),
        trace.events().count(),
        bytes.len(),
        config.output_file.display()
    );

    if let Some(debug_path) = &config.debug_json {
        fs::write(debug_path, perfetto::to_debug_json(&packets)?)?;
        info!("Wrote debug JSON to {}", debug_path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TraceError;
    use crate::output::perfetto::PerfettoTrace;
    use crate::timeline::{EventKind, TraceEntry, TraceEvent, TrackDescriptor};
    use prost::Message;
    use tempfile::TempDir;

    fn trace() -> Trace {
        Trace {
            entries: vec![
                TraceEntry::Track(TrackDescriptor {
                    track_id: 1,
                    parent_track_id: None,
                    label: "CI run 5 attempt 1".to_string(),
                    display_group: 9,
                    lane_index: None,
                }),
                TraceEntry::Event(TraceEvent {
                    track_id: 1,
                    timestamp_ns: 1_000,
                    kind: EventKind::Begin,
                    name: Some("Running".to_string()),
                    categories: vec!["job/slice".to_string()],
                }),
                TraceEntry::Event(TraceEvent {
                    track_id: 1,
                    timestamp_ns: 2_000,
                    kind: EventKind::End,
                    name: None,
                    categories: vec![],
                }),
            ],
        }
    }

    #[test]
    fn test_write_binary_only() {
        let dir = TempDir::new().unwrap();
        let config = OutputConfig {
            output_file: dir.path().join("run.perfetto-trace"),
            debug_json: None,
            summary: false,
        };

        write_trace(&trace(), &config, 42).unwrap();

        let bytes = fs::read(&config.output_file).unwrap();
        let decoded = PerfettoTrace::decode(bytes.as_slice()).unwrap();
        assert_eq!(decoded, perfetto::to_perfetto(&trace(), 42).unwrap());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_write_with_debug_json() {
        let dir = TempDir::new().unwrap();
        let config = OutputConfig {
            output_file: dir.path().join("run.perfetto-trace"),
            debug_json: Some(dir.path().join("run.json")),
            summary: false,
        };

        write_trace(&trace(), &config, 7).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("run.json")).unwrap())
                .unwrap();
        let packets = json["packet"].as_array().unwrap();
        assert_eq!(packets.len(), 3);
        assert_eq!(packets[0]["trustedPacketSequenceId"], 7);
    }

    #[test]
    fn test_write_to_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let config = OutputConfig {
            output_file: dir.path().join("missing").join("run.perfetto-trace"),
            debug_json: None,
            summary: false,
        };

        let err = write_trace(&trace(), &config, 42).unwrap_err();
        assert!(matches!(err, TraceError::Io(_)));
    }
}
