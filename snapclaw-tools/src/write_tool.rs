use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use snapclaw_core::agent::Tool;
use snapclaw_core::confiner::Confiner;
use snapclaw_core::fileops;

/// Workspace-confined file writing tool.
///
/// Overwrites existing files and creates missing parent directories. No
/// delete operation is exposed.
pub struct WriteTool {
    confiner: Arc<Confiner>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct WriteArgs {
    file_path: String,
    content: String,
}

impl WriteTool {
    pub fn new(confiner: Arc<Confiner>) -> Self {
        Self { confiner }
    }
}

#[async_trait]
impl Tool for WriteTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write or overwrite a file with the given content, constrained to the \
         working directory. Missing parent directories are created."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "The file to write, relative to the working directory."
                },
                "content": {
                    "type": "string",
                    "description": "The content to write to the file."
                }
            },
            "required": ["file_path", "content"]
        })
    }

    async fn execute(&self, args: &serde_json::Value) -> Result<String> {
        let args: WriteArgs =
            serde_json::from_value(args.clone()).context("Invalid write_file arguments")?;
        fileops::write_file(&self.confiner, &args.file_path, &args.content)
    }
}
