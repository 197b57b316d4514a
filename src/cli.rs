use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;
use std::path::{Path, PathBuf};

use crate::auth::Token;
use crate::config::{ApiKind, Config};
use crate::output;
use crate::providers::github::RunUrl;
use crate::providers::GitHubProvider;
use crate::run_data::RunData;
use crate::timeline;

#[derive(Parser)]
#[command(name = "actions-trace")]
#[command(author, version, about = "Convert GitHub Actions workflow runs into Perfetto traces", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./actions-trace.{toml,json,yaml,yml})
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a workflow run and write its Perfetto trace
    Generate {
        /// Run URL, e.g. https://github.com/owner/repo/actions/runs/123[/attempts/2]
        url: RunUrl,

        #[command(flatten)]
        github: GitHubArgs,

        #[command(flatten)]
        trace: TraceArgs,
    },
    /// Fetch a workflow run and save the raw run data as JSON
    Fetch {
        url: RunUrl,

        #[command(flatten)]
        github: GitHubArgs,

        /// Output file (prints to stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(short, long, default_value_t = false)]
        pretty: bool,
    },
    /// Convert run data saved by `fetch` into a Perfetto trace
    Convert {
        /// Run data JSON file
        data: PathBuf,

        #[command(flatten)]
        trace: TraceArgs,
    },
}

#[derive(Args)]
struct GitHubArgs {
    #[arg(short, long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// API used to list jobs
    #[arg(long, value_enum)]
    api: Option<ApiKind>,

    /// Always query GitHub, ignoring cached runs
    #[arg(long, default_value_t = false)]
    no_cache: bool,
}

#[derive(Args)]
struct TraceArgs {
    /// Perfetto trace file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also write the trace packets as JSON
    #[arg(long)]
    debug_json: Option<PathBuf>,

    /// Skip the per-job summary table
    #[arg(long, default_value_t = false)]
    no_summary: bool,
}

impl GitHubArgs {
    fn apply(&self, config: &mut Config) -> Option<Token> {
        if let Some(api) = self.api {
            config.github.api = api;
        }
        if self.no_cache {
            config.github.no_cache = true;
        }

        self.token
            .as_deref()
            .or(config.github.token.as_deref())
            .map(Token::from)
    }
}

impl TraceArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(output) = &self.output {
            config.output.output_file.clone_from(output);
        }
        if let Some(debug_json) = &self.debug_json {
            config.output.debug_json = Some(debug_json.clone());
        }
        if self.no_summary {
            config.output.summary = false;
        }
    }
}

impl Cli {
    pub async fn execute(&self) -> Result<()> {
        let mut config = Config::load(self.config.as_deref())?;

        match &self.command {
            Commands::Generate { url, github, trace } => {
                let token = github.apply(&mut config);
                trace.apply(&mut config);

                let data = fetch(&config, token, url).await?;
                write_trace(&data, &config)
            }
            Commands::Fetch {
                url,
                github,
                output,
                pretty,
            } => {
                let token = github.apply(&mut config);

                let data = fetch(&config, token, url).await?;
                let json_output = if *pretty {
                    serde_json::to_string_pretty(&data)?
                } else {
                    serde_json::to_string(&data)?
                };

                if let Some(output_path) = output {
                    std::fs::write(output_path, json_output).with_context(|| {
                        format!("Failed to write run data to {}", output_path.display())
                    })?;
                    info!("Run data written to: {}", output_path.display());
                } else {
                    println!("{json_output}");
                }

                Ok(())
            }
            Commands::Convert { data, trace } => {
                trace.apply(&mut config);

                let data = load_run_data(data)?;
                write_trace(&data, &config)
            }
        }
    }
}

async fn fetch(config: &Config, token: Option<Token>, url: &RunUrl) -> Result<RunData> {
    let provider = GitHubProvider::new(&config.github, token)?;
    provider
        .fetch_run_data(url)
        .await
        .with_context(|| format!("Failed to fetch {url}"))
}

fn load_run_data(path: &Path) -> Result<RunData> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read run data: {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse run data: {}", path.display()))
}

fn write_trace(data: &RunData, config: &Config) -> Result<()> {
    let conversion = timeline::convert(data).with_context(|| {
        format!(
            "Failed to convert run {} attempt {}",
            data.run.id, data.run.run_attempt
        )
    })?;

    output::write_trace(
        &conversion.trace,
        &config.output,
        config.trace.trusted_packet_sequence_id,
    )
    .with_context(|| {
        format!(
            "Failed to write trace to {}",
            config.output.output_file.display()
        )
    })?;

    if config.output.summary {
        output::print_summary(&data.run, &conversion.timings, &config.output.output_file);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_parse_generate_command() {
        let cli = Cli::try_parse_from([
            "actions-trace",
            "generate",
            "https://github.com/owner/repo/actions/runs/42/attempts/2",
            "--api",
            "graphql",
            "--token",
            "ghp_x",
            "-o",
            "run.perfetto-trace",
            "--debug-json",
            "run.json",
        ])
        .unwrap();

        let Commands::Generate { url, github, trace } = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(url.run_id, 42);
        assert_eq!(url.attempt, Some(2));

        let mut config = Config::default();
        let token = github.apply(&mut config);
        trace.apply(&mut config);

        assert_eq!(token, Some(Token::from("ghp_x")));
        assert_eq!(config.github.api, ApiKind::Graphql);
        assert_eq!(config.output.output_file, PathBuf::from("run.perfetto-trace"));
        assert_eq!(config.output.debug_json, Some(PathBuf::from("run.json")));
    }

    #[test]
    fn test_rejects_non_run_urls() {
        let result = Cli::try_parse_from([
            "actions-trace",
            "generate",
            "https://github.com/owner/repo/pulls/42",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_config_token_used_when_flag_missing() {
        let args = GitHubArgs {
            token: None,
            api: None,
            no_cache: true,
        };
        let mut config = Config::default();
        config.github.token = Some("from-config".to_string());

        let token = args.apply(&mut config);

        assert_eq!(token, Some(Token::from("from-config")));
        assert!(config.github.no_cache);
        assert_eq!(config.github.api, ApiKind::Rest);
    }

    #[test]
    fn test_convert_writes_trace_from_saved_run_data() {
        let mut data_file = NamedTempFile::with_suffix(".json").unwrap();
        let data = serde_json::json!({
            "run": {
                "id": 5,
                "run_attempt": 1,
                "run_number": 12,
                "display_title": "Nightly"
            },
            "jobs": [{
                "id": 1,
                "name": "build",
                "status": "completed",
                "conclusion": "success",
                "created_at": "2024-10-06T00:00:00Z",
                "started_at": "2024-10-06T00:00:05Z",
                "completed_at": "2024-10-06T00:01:00Z",
                "runner_name": "linux",
                "runner_id": 3,
                "steps": [{
                    "name": "compile",
                    "number": 1,
                    "started_at": "2024-10-06T00:00:05Z",
                    "completed_at": "2024-10-06T00:00:50Z"
                }]
            }]
        });
        write!(data_file, "{data}").unwrap();

        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        TraceArgs {
            output: Some(dir.path().join("nightly.perfetto-trace")),
            debug_json: Some(dir.path().join("nightly.json")),
            no_summary: true,
        }
        .apply(&mut config);

        let run_data = load_run_data(data_file.path()).unwrap();
        write_trace(&run_data, &config).unwrap();

        assert!(dir.path().join("nightly.perfetto-trace").exists());
        assert!(dir.path().join("nightly.json").exists());
    }

    #[test]
    fn test_load_run_data_reports_path() {
        let mut data_file = NamedTempFile::with_suffix(".json").unwrap();
        write!(data_file, "not json").unwrap();

        let err = load_run_data(data_file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse run data"));
    }
}
