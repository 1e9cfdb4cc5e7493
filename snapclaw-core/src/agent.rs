use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::Config;
use crate::llm::{BackendError, LlmClient, LlmResponse, ToolCall, ToolDefinition, Turn};
use crate::retry::{ErrorClass, RetryPolicy};

/// System instructions sent with every backend call.
pub const SYSTEM_INSTRUCTIONS: &str = "\
You are a helpful AI coding agent.

When the user asks a question or makes a request, make a function call plan and carry it out. You can perform the following operations:

- List files and directories
- Read file contents
- Write or overwrite files
- Run a script with optional arguments

All paths you provide should be relative to the working directory. You do not need to specify the working directory in your function calls; it is injected automatically for security reasons.";

/// Implemented by every operation exposed to the model.
///
/// Implementations hold their workspace binding at construction time; the
/// argument object they receive is exactly what the model produced, with the
/// working directory never among the parameters.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (used in LLM function calling).
    fn name(&self) -> &str;

    /// Human-readable description for the LLM.
    fn description(&self) -> &str;

    /// JSON schema for this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with the model-supplied argument object.
    async fn execute(&self, args: &serde_json::Value) -> Result<String>;
}

/// The fixed set of operations the model may call.
///
/// Immutable once built. Dispatch never lets a fault escape: every failure
/// becomes an error string the model can see and react to.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Tool declarations for LLM function calling.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .values()
            .map(|tool| ToolDefinition {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters_schema(),
            })
            .collect()
    }

    /// Dispatch one model-requested call.
    ///
    /// Unknown names and implementation failures both come back as `Err`
    /// strings; the distinction from `Ok` is the tagged result the loop
    /// folds into the conversation.
    pub async fn dispatch(&self, call: &ToolCall) -> Result<String, String> {
        let Some(tool) = self.tools.get(&call.name) else {
            return Err(format!("Unknown function: {}", call.name));
        };
        match tool.execute(&call.args).await {
            Ok(result) => Ok(result),
            Err(e) => Err(format!("Error calling {}: {:#}", call.name, e)),
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// How one agent run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The model produced a final text answer.
    Completed { text: String },
    /// The iteration budget ran out before the model finished.
    IterationsExhausted { steps: usize },
}

/// The agent loop: ask the model, dispatch its tool calls, repeat.
pub struct Agent {
    llm: Arc<dyn LlmClient>,
    tools: ToolRegistry,
    config: Config,
}

impl Agent {
    pub fn new(llm: Arc<dyn LlmClient>, tools: ToolRegistry, config: Config) -> Self {
        Self { llm, tools, config }
    }

    /// Run one task to completion.
    ///
    /// Tool-level failures are folded back into the conversation and never
    /// end the run. Backend failures that survive the retry budget (and any
    /// non-transient backend failure) propagate out and are fatal to this
    /// invocation.
    pub async fn run(&self, prompt: &str) -> Result<RunOutcome> {
        log::info!("Starting task: {}", first_chars(prompt, 100));
        if self.config.verbose {
            println!("User prompt: {prompt}");
        }

        let mut turns = vec![Turn::user(prompt)];
        let definitions = self.tools.definitions();

        for step in 0..self.config.max_steps {
            log::info!("🔄 Step {}/{}", step + 1, self.config.max_steps);

            let response = self
                .generate_with_retry(&turns, &definitions)
                .await
                .context("LLM generation failed")?;

            if self.config.verbose {
                if let Some(usage) = response.usage {
                    println!("Prompt tokens: {}", usage.prompt_tokens);
                    println!("Response tokens: {}", usage.response_tokens);
                }
            }

            // Text-only response ends the loop.
            if response.tool_calls.is_empty() {
                let text = response.text.unwrap_or_default();
                turns.push(Turn::model_text(&text));
                return Ok(RunOutcome::Completed { text });
            }

            turns.push(Turn::model_calls(
                response.text.clone().unwrap_or_default(),
                response.tool_calls.clone(),
            ));

            // Sequential, in response order: later calls may rely on the
            // filesystem effects of earlier ones in the same turn.
            for call in &response.tool_calls {
                if self.config.verbose {
                    println!("- Calling function: {}({})", call.name, call.args);
                } else {
                    println!("- Calling function: {}", call.name);
                }

                let result_text = match self.tools.dispatch(call).await {
                    Ok(result) => result,
                    Err(error) => error,
                };

                if self.config.verbose {
                    println!("-> {result_text}");
                }
                log::debug!(
                    "Tool '{}' returned {} chars",
                    call.name,
                    result_text.len()
                );

                turns.push(Turn::tool(&call.name, &result_text));
            }
        }

        log::warn!(
            "⚠️  Exceeded maximum iterations ({}), stopping agent loop",
            self.config.max_steps
        );
        Ok(RunOutcome::IterationsExhausted {
            steps: self.config.max_steps,
        })
    }

    /// One backend call wrapped in the bounded retry loop.
    ///
    /// Attempt counter and computed delay are plain loop state; after the
    /// budget is spent the last failure propagates unchanged.
    async fn generate_with_retry(
        &self,
        turns: &[Turn],
        definitions: &[ToolDefinition],
    ) -> Result<LlmResponse, BackendError> {
        let policy: &RetryPolicy = &self.config.retry;
        let mut attempt: u32 = 0;

        loop {
            match self
                .llm
                .generate(turns, definitions, SYSTEM_INSTRUCTIONS)
                .await
            {
                Ok(response) => return Ok(response),
                Err(error) => {
                    attempt += 1;
                    if RetryPolicy::classify(&error) != ErrorClass::Retryable
                        || attempt >= policy.max_attempts
                    {
                        return Err(error);
                    }
                    let delay = policy.delay_for(attempt - 1);
                    log::warn!(
                        "Transient backend failure (attempt {}/{}): {}. Retrying in {:?}",
                        attempt,
                        policy.max_attempts,
                        error,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

/// First `max` characters of `s`, never splitting a code point.
fn first_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}
