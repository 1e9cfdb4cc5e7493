use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

// ---------------------------------------------------------------------------
// Conversation model
// ---------------------------------------------------------------------------

/// Who produced a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Model,
    Tool,
}

/// One turn of the conversation.
///
/// The conversation is append-only: turns are pushed as the loop runs and
/// never mutated in place. Model turns that requested tool calls keep those
/// calls so they can be echoed back to the backend verbatim on the next
/// request; tool turns keep the name of the function they answer.
#[derive(Debug, Clone)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    /// Tool calls requested by the model (model turns only).
    pub tool_calls: Vec<ToolCall>,
    /// Which function this result answers (tool turns only).
    pub tool_name: Option<String>,
}

impl Turn {
    pub fn user(content: &str) -> Self {
        Self {
            role: Role::User,
            content: content.to_string(),
            tool_calls: Vec::new(),
            tool_name: None,
        }
    }

    pub fn model_text(content: &str) -> Self {
        Self {
            role: Role::Model,
            content: content.to_string(),
            tool_calls: Vec::new(),
            tool_name: None,
        }
    }

    pub fn model_calls(content: String, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Model,
            content,
            tool_calls,
            tool_name: None,
        }
    }

    pub fn tool(name: &str, result: &str) -> Self {
        Self {
            role: Role::Tool,
            content: result.to_string(),
            tool_calls: Vec::new(),
            tool_name: Some(name.to_string()),
        }
    }
}

/// A structured function call requested by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub name: String,
    /// Argument object as returned by the backend; always a JSON object.
    pub args: serde_json::Value,
}

/// Declaration of one callable operation, advertised to the model.
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema of the parameter object.
    pub parameters: serde_json::Value,
}

/// Token accounting as reported by the backend for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub response_tokens: u32,
}

/// Response from one backend call: text, tool calls, or both.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub text: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub usage: Option<TokenUsage>,
}

// ---------------------------------------------------------------------------
// Backend errors
// ---------------------------------------------------------------------------

/// Failure of one backend call.
///
/// The HTTP status is kept structurally so retry classification can inspect
/// it instead of matching on message text.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("API request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected API response: {0}")]
    InvalidResponse(String),
}

impl BackendError {
    /// The HTTP status behind this failure, when the backend supplied one.
    pub fn status(&self) -> Option<u16> {
        match self {
            BackendError::Api { status, .. } => Some(*status),
            BackendError::Transport(e) => e.status().map(|s| s.as_u16()),
            BackendError::InvalidResponse(_) => None,
        }
    }
}

/// Abstraction over a function-calling chat backend.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send the conversation plus tool declarations, get the next response.
    async fn generate(
        &self,
        turns: &[Turn],
        tools: &[ToolDefinition],
        system_instructions: &str,
    ) -> Result<LlmResponse, BackendError>;

    /// The model name this client is configured for.
    fn model_name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Gemini wire conversion helpers
// ---------------------------------------------------------------------------

/// Convert one [`Turn`] into a Gemini `contents` entry.
///
/// Conversion rules:
/// - user turn  → `{"role":"user","parts":[{"text":...}]}`
/// - model turn → text part (if any) followed by its functionCall parts,
///   echoed back exactly as the model produced them
/// - tool turn  → user-role functionResponse part (the wire format has no
///   tool role; results ride back as user content)
fn turn_to_content(turn: &Turn) -> serde_json::Value {
    match turn.role {
        Role::User => json!({"role": "user", "parts": [{"text": turn.content}]}),
        Role::Model => {
            let mut parts = Vec::new();
            if !turn.content.is_empty() {
                parts.push(json!({"text": turn.content}));
            }
            for call in &turn.tool_calls {
                parts.push(json!({"functionCall": {"name": call.name, "args": call.args}}));
            }
            if parts.is_empty() {
                parts.push(json!({"text": ""}));
            }
            json!({"role": "model", "parts": parts})
        }
        Role::Tool => json!({
            "role": "user",
            "parts": [{
                "functionResponse": {
                    "name": turn.tool_name.as_deref().unwrap_or(""),
                    "response": {"result": turn.content},
                }
            }],
        }),
    }
}

fn build_request_body(
    turns: &[Turn],
    tools: &[ToolDefinition],
    system_instructions: &str,
) -> serde_json::Value {
    let contents: Vec<serde_json::Value> = turns.iter().map(turn_to_content).collect();
    let mut body = json!({"contents": contents});

    if !system_instructions.is_empty() {
        body["systemInstruction"] = json!({"parts": [{"text": system_instructions}]});
    }
    if !tools.is_empty() {
        let declarations: Vec<serde_json::Value> = tools
            .iter()
            .map(|t| {
                json!({
                    "name": t.name,
                    "description": t.description,
                    "parameters": t.parameters,
                })
            })
            .collect();
        body["tools"] = json!([{"functionDeclarations": declarations}]);
    }

    body
}

// ---------------------------------------------------------------------------
// Gemini response types (private)
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
    #[serde(rename = "functionCall")]
    function_call: Option<WireFunctionCall>,
}

#[derive(Deserialize)]
struct WireFunctionCall {
    name: String,
    #[serde(default)]
    args: serde_json::Value,
}

#[derive(Deserialize)]
struct UsageMetadata {
    #[serde(rename = "promptTokenCount", default)]
    prompt_token_count: u32,
    #[serde(rename = "candidatesTokenCount", default)]
    candidates_token_count: u32,
}

fn parse_generate_response(body: &str) -> Result<LlmResponse, BackendError> {
    let parsed: GenerateResponse = serde_json::from_str(body).map_err(|e| {
        BackendError::InvalidResponse(format!("{} in body: {}", e, snippet(body, 300)))
    })?;

    let usage = parsed.usage_metadata.map(|u| TokenUsage {
        prompt_tokens: u.prompt_token_count,
        response_tokens: u.candidates_token_count,
    });

    let candidate = parsed
        .candidates
        .unwrap_or_default()
        .into_iter()
        .next()
        .ok_or_else(|| BackendError::InvalidResponse("no candidates returned".to_string()))?;

    let mut text = String::new();
    let mut tool_calls = Vec::new();
    for part in candidate.content.map(|c| c.parts).unwrap_or_default() {
        if let Some(t) = part.text {
            text.push_str(&t);
        }
        if let Some(call) = part.function_call {
            let args = if call.args.is_null() {
                json!({})
            } else {
                call.args
            };
            tool_calls.push(ToolCall {
                name: call.name,
                args,
            });
        }
    }

    Ok(LlmResponse {
        text: if text.is_empty() { None } else { Some(text) },
        tool_calls,
        usage,
    })
}

/// First `max` characters of `s`, never splitting a code point.
fn snippet(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}

// ---------------------------------------------------------------------------
// Client implementation
// ---------------------------------------------------------------------------

/// Gemini `generateContent` REST client.
///
/// The API key travels in the `x-goog-api-key` header. A missing key is sent
/// as-is and surfaces as a backend authentication error; it is not validated
/// client-side.
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl GeminiClient {
    pub const DEFAULT_BASE_URL: &'static str = "https://generativelanguage.googleapis.com/v1beta";

    /// Create a client for the public Gemini endpoint.
    pub fn new(model: &str, api_key: Option<String>) -> Self {
        Self::with_base_url(Self::DEFAULT_BASE_URL, model, api_key)
    }

    /// Create a client against a custom base URL (proxies, test servers).
    pub fn with_base_url(base_url: &str, model: &str, api_key: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .expect("Failed to build HTTP client");
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
        }
    }

    fn generate_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn generate(
        &self,
        turns: &[Turn],
        tools: &[ToolDefinition],
        system_instructions: &str,
    ) -> Result<LlmResponse, BackendError> {
        let body = build_request_body(turns, tools, system_instructions);

        let mut request = self
            .client
            .post(self.generate_url())
            .header("content-type", "application/json");
        if let Some(ref key) = self.api_key {
            request = request.header("x-goog-api-key", key);
        }

        let response = request.json(&body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<serde_json::Value>(&text)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(String::from))
                .unwrap_or_else(|| snippet(&text, 300).to_string());
            return Err(BackendError::Api {
                status: status.as_u16(),
                message,
            });
        }

        parse_generate_response(&text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
