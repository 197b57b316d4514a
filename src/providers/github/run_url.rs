use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::error::{Result, TraceError};

/// Location of a workflow run, parsed from its web URL.
///
/// Accepts `https://github.com/{owner}/{repo}/actions/runs/{run_id}`, with an
/// optional `/attempts/{n}` suffix. Anything after the run id (for example a
/// `/job/{id}` link) is ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunUrl {
    pub owner: String,
    pub repo: String,
    pub run_id: u64,
    pub attempt: Option<u32>,
}

impl RunUrl {
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = |reason: &str| TraceError::InvalidRunUrl {
            url: input.to_string(),
            reason: reason.to_string(),
        };

        let url = Url::parse(input).map_err(|e| invalid(&e.to_string()))?;

        if url.host_str() != Some("github.com") {
            return Err(invalid("host must be github.com"));
        }

        let segments: Vec<&str> = url
            .path_segments()
            .map(|segments| segments.filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();

        let [owner, repo, "actions", "runs", run_id, rest @ ..] = segments.as_slice() else {
            return Err(invalid("expected /{owner}/{repo}/actions/runs/{run_id}"));
        };

        let run_id = run_id
            .parse()
            .map_err(|_| invalid("run id must be numeric"))?;

        let attempt = match rest {
            ["attempts", attempt, ..] => Some(
                attempt
                    .parse()
                    .map_err(|_| invalid("attempt must be numeric"))?,
            ),
            ["attempts"] => return Err(invalid("missing attempt number")),
            _ => None,
        };

        Ok(Self {
            owner: (*owner).to_string(),
            repo: (*repo).to_string(),
            run_id,
            attempt,
        })
    }

    /// Web URL of the run, without any trailing segments.
    pub fn web_url(&self) -> String {
        let mut url = format!(
            "https://github.com/{}/{}/actions/runs/{}",
            self.owner, self.repo, self.run_id
        );
        if let Some(attempt) = self.attempt {
            url.push_str(&format!("/attempts/{attempt}"));
        }
        url
    }
}

impl FromStr for RunUrl {
    type Err = TraceError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for RunUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.web_url())
    }
}
