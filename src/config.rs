use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration file structure for actions-trace.
///
/// Lets users keep their token, API endpoints and output preferences in a
/// file instead of repeating flags. Command line flags override these values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// GitHub API access
    #[serde(default)]
    pub github: GitHubConfig,

    /// Where and how to write the trace
    #[serde(default)]
    pub output: OutputConfig,

    /// Trace encoding parameters
    #[serde(default)]
    pub trace: TraceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GitHubConfig {
    /// GitHub personal access token
    pub token: Option<String>,

    /// GitHub REST API base URL
    #[serde(default = "default_github_base_url")]
    pub base_url: String,

    /// GitHub GraphQL endpoint
    #[serde(default = "default_github_graphql_url")]
    pub graphql_url: String,

    /// Which API to read jobs from
    #[serde(default)]
    pub api: ApiKind,

    /// Page size for paginated job listings (GitHub caps this at 100)
    #[serde(default = "default_per_page")]
    pub per_page: usize,

    /// Disable the run cache
    #[serde(default)]
    pub no_cache: bool,

    /// Retries for rate-limited or failing requests
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Seconds to wait between retries
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ApiKind {
    /// Run and jobs from the REST API
    #[default]
    Rest,
    /// Run from REST, jobs from the check suite via GraphQL
    Graphql,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Binary Perfetto trace path
    #[serde(default = "default_output_file")]
    pub output_file: PathBuf,

    /// Optional JSON rendition of the trace packets, for debugging
    pub debug_json: Option<PathBuf>,

    /// Print the per-job summary table after writing
    #[serde(default = "default_true")]
    pub summary: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TraceConfig {
    /// Perfetto needs a sequence id to attribute packets to a producer; a
    /// single converter only ever uses one.
    #[serde(default = "default_trusted_packet_sequence_id")]
    pub trusted_packet_sequence_id: u32,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            base_url: default_github_base_url(),
            graphql_url: default_github_graphql_url(),
            api: ApiKind::default(),
            per_page: default_per_page(),
            no_cache: false,
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay_secs(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_file: default_output_file(),
            debug_json: None,
            summary: true,
        }
    }
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            trusted_packet_sequence_id: default_trusted_packet_sequence_id(),
        }
    }
}

fn default_github_base_url() -> String {
    "https://api.github.com".to_string()
}

fn default_github_graphql_url() -> String {
    "https://api.github.com/graphql".to_string()
}

fn default_per_page() -> usize {
    100
}

fn default_max_retries() -> u32 {
    5
}

fn default_retry_delay_secs() -> u64 {
    10
}

fn default_output_file() -> PathBuf {
    PathBuf::from("github_actions.perfetto-trace")
}

fn default_true() -> bool {
    true
}

fn default_trusted_packet_sequence_id() -> u32 {
    42
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./actions-trace.toml
    /// 3. ./actions-trace.json
    /// 4. ./actions-trace.yaml
    /// 5. ./actions-trace.yml
    ///
    /// Returns default configuration if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        let candidates = [
            "actions-trace.toml",
            "actions-trace.json",
            "actions-trace.yaml",
            "actions-trace.yml",
        ];

        for candidate in &candidates {
            let path = Path::new(candidate);
            if path.exists() {
                log::debug!("Using config file: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => toml::from_str(&contents)
                .or_else(|_| serde_json::from_str(&contents))
                .or_else(|_| serde_yaml::from_str(&contents))
                .with_context(|| format!("Failed to parse config file: {}", path.display())),
        }
    }
}
