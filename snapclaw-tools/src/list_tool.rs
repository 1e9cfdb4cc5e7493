use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use snapclaw_core::agent::Tool;
use snapclaw_core::confiner::Confiner;
use snapclaw_core::fileops;

/// Workspace-confined directory listing tool.
pub struct ListTool {
    confiner: Arc<Confiner>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ListArgs {
    /// Empty means the working directory itself.
    #[serde(default)]
    directory: String,
}

impl ListTool {
    pub fn new(confiner: Arc<Confiner>) -> Self {
        Self { confiner }
    }
}

#[async_trait]
impl Tool for ListTool {
    fn name(&self) -> &str {
        "list_files"
    }

    fn description(&self) -> &str {
        "List files in the specified directory along with their sizes, \
         constrained to the working directory."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "directory": {
                    "type": "string",
                    "description": "The directory to list files from, relative to the working directory. If not provided, lists files in the working directory itself."
                }
            }
        })
    }

    async fn execute(&self, args: &serde_json::Value) -> Result<String> {
        let args: ListArgs =
            serde_json::from_value(args.clone()).context("Invalid list_files arguments")?;

        let entries = fileops::list_directory(&self.confiner, &args.directory)?;
        if entries.is_empty() {
            return Ok("Directory is empty".to_string());
        }

        Ok(entries
            .iter()
            .map(|e| {
                format!(
                    "{} {} ({} bytes)",
                    if e.is_dir { "dir" } else { "file" },
                    e.name,
                    e.size_bytes
                )
            })
            .collect::<Vec<_>>()
            .join("\n"))
    }
}
