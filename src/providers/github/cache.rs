use std::fs;
use std::path::PathBuf;

use log::{debug, info, warn};

use crate::error::{Result, TraceError};
use crate::run_data::RunData;

use super::run_url::RunUrl;

/// Run cache for GitHub Actions.
///
/// Once every job of a run attempt has completed, GitHub never changes its
/// records again, so the fetched [`RunData`] is stored as one JSON file per
/// attempt in the platform cache directory:
/// - Linux: `~/.cache/actions-trace/github/{owner}-{repo}-{run}-{attempt}.json`
/// - macOS: `~/Library/Caches/actions-trace/github/{owner}-{repo}-{run}-{attempt}.json`
///
/// Lookups need an explicit attempt; "latest attempt" requests always go to
/// the API since a re-run can change the answer.
pub struct RunCache {
    cache_dir: PathBuf,
    enabled: bool,
}

impl RunCache {
    /// Creates a cache in the platform cache directory.
    ///
    /// # Errors
    ///
    /// Returns error if the cache directory cannot be determined or created.
    pub fn new(enabled: bool) -> Result<Self> {
        if !enabled {
            debug!("Run cache disabled");
            return Ok(Self::disabled());
        }

        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| TraceError::Config("No cache directory found".into()))?
            .join("actions-trace")
            .join("github");

        Self::in_dir(cache_dir)
    }

    /// Creates a cache rooted at `cache_dir`.
    pub fn in_dir(cache_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&cache_dir)?;
        info!("Run cache enabled at: {}", cache_dir.display());

        Ok(Self {
            cache_dir,
            enabled: true,
        })
    }

    pub fn disabled() -> Self {
        Self {
            cache_dir: PathBuf::new(),
            enabled: false,
        }
    }

    /// Returns the cached data for the attempt named in `url`, if any.
    ///
    /// Unreadable entries are treated as misses.
    pub fn get(&self, url: &RunUrl) -> Option<RunData> {
        if !self.enabled {
            return None;
        }
        let attempt = url.attempt?;
        let path = self.entry_path(&url.owner, &url.repo, url.run_id, attempt);

        if !path.exists() {
            return None;
        }

        match fs::read_to_string(&path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
        {
            Some(data) => {
                debug!("Cache hit: {}", path.display());
                Some(data)
            }
            None => {
                warn!("Ignoring unreadable cache entry: {}", path.display());
                None
            }
        }
    }

    /// Stores `data` if all of its jobs have completed.
    pub fn store(&self, owner: &str, repo: &str, data: &RunData) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        if !data.is_complete() {
            debug!("Run {} still has unfinished jobs, not caching", data.run.id);
            return Ok(());
        }

        let path = self.entry_path(owner, repo, data.run.id, data.run.run_attempt);
        fs::write(&path, serde_json::to_string(data)?)?;
        debug!("Cached run {} at {}", data.run.id, path.display());

        Ok(())
    }

    fn entry_path(&self, owner: &str, repo: &str, run_id: u64, attempt: u32) -> PathBuf {
        let filename = format!("{owner}-{repo}-{run_id}-{attempt}.json");
        self.cache_dir.join(filename)
    }
}
