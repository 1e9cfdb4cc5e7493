use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use snapclaw_core::agent::Tool;
use snapclaw_core::confiner::Confiner;
use snapclaw_core::runner;
use snapclaw_core::truncation::{self, MAX_STDERR_CHARS, MAX_STDOUT_CHARS};

/// Workspace-confined script execution tool.
///
/// The script runs with the workspace as its working directory and a hard
/// timeout. A non-zero exit code is reported in the result text, not treated
/// as a tool failure.
pub struct RunTool {
    confiner: Arc<Confiner>,
    timeout: Duration,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RunArgs {
    file_path: String,
    #[serde(default)]
    args: Vec<String>,
}

impl RunTool {
    pub fn new(confiner: Arc<Confiner>, timeout: Duration) -> Self {
        Self { confiner, timeout }
    }
}

#[async_trait]
impl Tool for RunTool {
    fn name(&self) -> &str {
        "run_script"
    }

    fn description(&self) -> &str {
        "Execute a script inside the working directory with optional \
         command-line arguments, capturing its output."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "The script to execute, relative to the working directory."
                },
                "args": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Optional command-line arguments to pass to the script."
                }
            },
            "required": ["file_path"]
        })
    }

    async fn execute(&self, args: &serde_json::Value) -> Result<String> {
        let args: RunArgs =
            serde_json::from_value(args.clone()).context("Invalid run_script arguments")?;

        let output =
            runner::run_script(&self.confiner, &args.file_path, &args.args, self.timeout).await?;

        let mut sections = Vec::new();
        if !output.stdout.is_empty() {
            if output.stdout.chars().count() > MAX_STDOUT_CHARS {
                log::warn!("Truncating stdout of \"{}\"", args.file_path);
            }
            sections.push(format!(
                "--- stdout ---\n{}",
                truncation::truncate_process_output(&output.stdout, MAX_STDOUT_CHARS)
            ));
        }
        if !output.stderr.is_empty() {
            sections.push(format!(
                "--- stderr ---\n{}",
                truncation::truncate_process_output(&output.stderr, MAX_STDERR_CHARS)
            ));
        }
        if sections.is_empty() {
            sections.push("No output produced.".to_string());
        }

        match output.exit_code {
            Some(0) => {}
            Some(code) => sections.push(format!("Process exited with code {code}")),
            None => sections.push("Process terminated by signal".to_string()),
        }

        Ok(sections.join("\n\n"))
    }
}
