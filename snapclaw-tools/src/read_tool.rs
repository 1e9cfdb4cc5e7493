use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use snapclaw_core::agent::Tool;
use snapclaw_core::confiner::Confiner;
use snapclaw_core::fileops;

/// Workspace-confined file reading tool.
///
/// Content beyond the fixed character cap is cut off with a marker so one
/// oversized file cannot flood the conversation.
pub struct ReadTool {
    confiner: Arc<Confiner>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ReadArgs {
    file_path: String,
}

impl ReadTool {
    pub fn new(confiner: Arc<Confiner>) -> Self {
        Self { confiner }
    }
}

#[async_trait]
impl Tool for ReadTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the contents of a file, constrained to the working directory. \
         Output is truncated after 10000 characters."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "The file to read, relative to the working directory."
                }
            },
            "required": ["file_path"]
        })
    }

    async fn execute(&self, args: &serde_json::Value) -> Result<String> {
        let args: ReadArgs =
            serde_json::from_value(args.clone()).context("Invalid read_file arguments")?;
        fileops::read_file(&self.confiner, &args.file_path)
    }
}
