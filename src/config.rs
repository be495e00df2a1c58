use std::{path::PathBuf, time::Duration};

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt::format, prelude::__tracing_subscriber_field_MakeExt, EnvFilter};

use crate::infrastructure::tool::ToolConfig;

#[derive(Debug, Parser)]
#[clap(name = "cutout-queue", version, about = "Background-removal job queue")]
pub struct Config {
    #[clap(long, default_value = "redis://127.0.0.1:6379", env)]
    pub redis_url: String,
    #[clap(long, default_value = "image-processing-queue", env)]
    pub queue_name: String,
    #[clap(long, default_value = "result:", env)]
    pub result_key_prefix: String,
    #[clap(long, default_value = "3600", env)]
    pub result_ttl_secs: u64,
    #[clap(long, default_value = "temp", env)]
    pub workspace_dir: PathBuf,
    #[clap(long, default_value = "rembg", env)]
    pub tool_program: String,
    #[clap(long, default_value = "i", env, value_delimiter = ' ', allow_hyphen_values = true)]
    pub tool_args: Vec<String>,
    #[clap(long, default_value = "1000", env)]
    pub pop_retry_delay_ms: u64,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Consume jobs until interrupted.
    Worker {
        /// Competing consumers to run in this process.
        #[clap(long, default_value = "1", env)]
        workers: usize,
    },
    /// Enqueue an image file and print its job id.
    Submit {
        file: PathBuf,
        #[clap(long, default_value = "image/png")]
        media_type: String,
    },
    /// Print the status of a job as JSON.
    Poll {
        job_id: String,
        /// Write the result image here once completed.
        #[clap(long)]
        output: Option<PathBuf>,
    },
}

/// Settings shared by the submission facade and the worker loop.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub queue_name: String,
    pub result_key_prefix: String,
    pub result_ttl: Duration,
    pub workspace_dir: PathBuf,
    pub tool: ToolConfig,
    pub pop_retry_delay: Duration,
}

impl PipelineConfig {
    pub fn result_key(&self, job_id: &str) -> String {
        format!("{}{}", self.result_key_prefix, job_id)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_name: "image-processing-queue".to_string(),
            result_key_prefix: "result:".to_string(),
            result_ttl: Duration::from_secs(3600),
            workspace_dir: PathBuf::from("temp"),
            tool: ToolConfig::default(),
            pop_retry_delay: Duration::from_secs(1),
        }
    }
}

impl Config {
    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            queue_name: self.queue_name.clone(),
            result_key_prefix: self.result_key_prefix.clone(),
            result_ttl: Duration::from_secs(self.result_ttl_secs),
            workspace_dir: self.workspace_dir.clone(),
            tool: ToolConfig {
                program: self.tool_program.clone(),
                args: self
                    .tool_args
                    .iter()
                    .filter(|arg| !arg.is_empty())
                    .cloned()
                    .collect(),
            },
            pop_retry_delay: Duration::from_millis(self.pop_retry_delay_ms),
        }
    }
}

/// Directives used when `RUST_LOG` is unset or unparsable.
const DEFAULT_LOG_DIRECTIVES: &str = "cutout_queue=info";

/// Logs go to stderr so `submit` and `poll` can print ids and JSON on stdout.
pub fn configure_tracing() {
    let filter = log_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref());
    let fields = format::debug_fn(|writer, field, value| write!(writer, "{}={:?}", field, value))
        .delimited(" ");

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .fmt_fields(fields)
        .init();
}

fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .filter(|d| !d.trim().is_empty())
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_DIRECTIVES))
}
