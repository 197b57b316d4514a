use std::hash::Hasher;

use super::types::TrackId;

/// Derives the track identity for a run (`job_id == None`) or one of its jobs.
///
/// FNV-1a over the key written as fixed-width little-endian integers, so the
/// result only depends on the `(run_id, attempt, job_id)` tuple: no random
/// seed, no process state, no formatting. A tag byte keeps the run-level key
/// apart from every job key.
pub fn track_id(run_id: u64, attempt: u32, job_id: Option<u64>) -> TrackId {
    let mut hasher = fnv::FnvHasher::default();

    hasher.write(&run_id.to_le_bytes());
    hasher.write(&attempt.to_le_bytes());
    match job_id {
        None => hasher.write(&[0]),
        Some(job_id) => {
            hasher.write(&[1]);
            hasher.write(&job_id.to_le_bytes());
        }
    }

    hasher.finish()
}
