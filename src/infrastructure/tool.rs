use std::{path::Path, process::Stdio};

use tokio::process::Command;
use tracing::{info, warn};

use crate::domain::error::ToolExecutionError;

/// Turns the image at `input` into a background-free image at `output`.
#[async_trait::async_trait]
pub trait ToolRunner: Send + Sync {
    async fn run(&self, input: &Path, output: &Path) -> Result<(), ToolExecutionError>;
}

/// How to invoke the external tool: `<program> <args...> <input> <output>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolConfig {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            program: "rembg".to_string(),
            args: vec!["i".to_string()],
        }
    }
}

/// Runs the configured program as a child process.
#[derive(Clone, Debug)]
pub struct CommandToolRunner {
    config: ToolConfig,
}

impl CommandToolRunner {
    pub fn new(config: ToolConfig) -> Self {
        Self { config }
    }
}

#[async_trait::async_trait]
impl ToolRunner for CommandToolRunner {
    async fn run(&self, input: &Path, output: &Path) -> Result<(), ToolExecutionError> {
        let program = &self.config.program;

        if tokio::fs::metadata(input).await.is_err() {
            return Err(ToolExecutionError::MissingInput {
                program: program.clone(),
                input: input.to_owned(),
            });
        }

        info!(input = %input.display(), program = %program, "Starting background removal");

        let result = Command::new(program)
            .args(&self.config.args)
            .arg(input)
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ToolExecutionError::Launch {
                program: program.clone(),
                source,
            })?;

        let stderr = String::from_utf8_lossy(&result.stderr).trim().to_string();

        if !result.status.success() {
            let status = result
                .status
                .code()
                .map(|code| code.to_string())
                .unwrap_or_else(|| "signal".to_string());

            return Err(ToolExecutionError::Exited {
                program: program.clone(),
                status,
                stderr: if stderr.is_empty() {
                    "no diagnostic output".to_string()
                } else {
                    stderr
                },
            });
        }

        if !stderr.is_empty() {
            warn!(program = %program, stderr = %stderr, "Tool wrote to stderr");
        }

        info!(output = %output.display(), "Background removed");

        Ok(())
    }
}
