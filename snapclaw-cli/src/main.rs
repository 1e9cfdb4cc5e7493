use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use snapclaw_core::agent::{Agent, RunOutcome};
use snapclaw_core::config::{Config, DEFAULT_MAX_STEPS, DEFAULT_MODEL, DEFAULT_SCRIPT_TIMEOUT_SECS};
use snapclaw_core::confiner::Confiner;
use snapclaw_core::llm::GeminiClient;
use snapclaw_core::retry::RetryPolicy;
use snapclaw_tools::builtin_registry;

/// Snapclaw, a sandboxed AI coding agent
#[derive(Parser, Debug)]
#[command(name = "snapclaw", version, about = "Snapclaw, a sandboxed AI coding agent")]
struct Cli {
    /// Task for the agent, in natural language
    prompt: Option<String>,

    /// Echo the prompt, token usage, and full tool arguments/results
    #[arg(long)]
    verbose: bool,

    /// Working directory the agent is confined to
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Model name
    #[arg(short = 'n', long, env = "SNAPCLAW_MODEL", default_value = DEFAULT_MODEL)]
    model_name: String,

    /// Maximum agent steps per task
    #[arg(long, default_value_t = DEFAULT_MAX_STEPS)]
    max_steps: usize,

    /// Script execution timeout in seconds
    #[arg(long, default_value_t = DEFAULT_SCRIPT_TIMEOUT_SECS)]
    script_timeout: u64,
}

/// Load .env before the logger (RUST_LOG) and Cli::parse() (env = "...").
fn load_dotenv() {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: failed to load .env: {e}");
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let Some(prompt) = cli.prompt else {
        eprintln!("Error: No prompt provided.");
        eprintln!("Usage: snapclaw \"Your prompt here\" [--verbose]");
        std::process::exit(1);
    };

    // Absence is not checked here; a missing key surfaces as a backend
    // authentication error on the first call.
    let api_key = std::env::var("GEMINI_API_KEY").ok();

    let confiner = Arc::new(Confiner::new(&cli.workspace)?);
    log::info!(
        "Workspace confined to {}",
        confiner.workspace_root().display()
    );

    let config = Config {
        workspace_path: confiner.workspace_root().to_path_buf(),
        model_name: cli.model_name.clone(),
        max_steps: cli.max_steps,
        script_timeout_secs: cli.script_timeout,
        retry: RetryPolicy::default(),
        verbose: cli.verbose,
    };

    let llm = Arc::new(GeminiClient::new(&cli.model_name, api_key));
    let tools = builtin_registry(
        Arc::clone(&confiner),
        Duration::from_secs(cli.script_timeout),
    );
    let agent = Agent::new(llm, tools, config);

    match agent.run(&prompt).await? {
        RunOutcome::Completed { text } => {
            println!("Response:");
            println!("{text}");
        }
        RunOutcome::IterationsExhausted { steps } => {
            println!("Agent exceeded maximum iterations ({steps}) without a final answer.");
        }
    }

    Ok(())
}
