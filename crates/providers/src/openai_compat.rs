//! OpenAI-compatible chat completions client.
//!
//! Works with: Gemini (through its OpenAI-compatible endpoint), OpenAI,
//! OpenRouter, Ollama, vLLM and any other `/chat/completions` endpoint
//! that supports function calling.
//!
//! The compatible endpoints disagree on details of the tool-call wire
//! format. Replies are normalized here so the agent loop always sees a
//! non-empty, unique call id and a JSON-encoded argument string:
//! - Gemini may omit `id` or send it empty, and omits `type`
//! - Ollama sends `arguments` as a JSON object instead of a string
//! - some servers send `arguments: null` for argument-less calls

use async_trait::async_trait;
use searchhop_core::error::ProviderError;
use searchhop_core::message::{Message, MessageToolCall, Role};
use searchhop_core::provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition, Usage};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// An OpenAI-compatible LLM provider.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }

    /// Gemini through its OpenAI-compatible endpoint.
    pub fn gemini(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Self::new(
            "gemini",
            "https://generativelanguage.googleapis.com/v1beta/openai",
            api_key,
        )
    }

    pub fn openrouter(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Self::new("openrouter", "https://openrouter.ai/api/v1", api_key)
    }

    pub fn openai(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Self::new("openai", "https://api.openai.com/v1", api_key)
    }

    /// A local Ollama server; it ignores the key.
    pub fn ollama(base_url: Option<&str>) -> Result<Self, ProviderError> {
        Self::new(
            "ollama",
            base_url.unwrap_or("http://localhost:11434/v1"),
            "ollama",
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the JSON body for one completion request.
    fn request_body(request: &ProviderRequest) -> serde_json::Value {
        let messages: Vec<wire::ChatMessage> =
            request.messages.iter().map(wire::ChatMessage::from_message).collect();
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": messages,
            "temperature": request.temperature,
            "stream": false,
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        if !request.tools.is_empty() {
            let tools: Vec<wire::ChatTool> =
                request.tools.iter().map(wire::ChatTool::from_definition).collect();
            body["tools"] = serde_json::json!(tools);
        }

        body
    }

    /// Map an HTTP status to an error, or `None` for success.
    fn status_error(status: u16, body: &str) -> Option<ProviderError> {
        match status {
            200..=299 => None,
            429 => Some(ProviderError::RateLimited { retry_after_secs: 5 }),
            401 | 403 => Some(ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            )),
            _ => Some(ProviderError::ApiError {
                status_code: status,
                message: body.to_string(),
            }),
        }
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = Self::request_body(&request);

        debug!(
            provider = %self.name,
            model = %request.model,
            messages = request.messages.len(),
            "Sending completion request"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if let Some(err) = Self::status_error(status, &text) {
            warn!(status, body = %text, "Provider returned error");
            return Err(err);
        }

        wire::parse_completion(&text)
    }
}

/// Chat completions wire format.
mod wire {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub(super) struct ChatMessage {
        pub role: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub content: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        pub tool_calls: Vec<ChatToolCall>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub tool_call_id: Option<String>,
    }

    impl ChatMessage {
        pub fn from_message(message: &Message) -> Self {
            let role = match message.role {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
                Role::Tool => "tool",
            };

            // Gemini rejects an empty text part next to function calls
            let content = if message.has_tool_calls() && message.content.is_empty() {
                None
            } else {
                Some(message.content.clone())
            };

            Self {
                role: role.into(),
                content,
                tool_calls: message
                    .tool_calls
                    .iter()
                    .map(|tc| ChatToolCall {
                        id: tc.id.clone(),
                        kind: "function".into(),
                        function: ChatFunctionCall {
                            name: tc.name.clone(),
                            arguments: serde_json::Value::String(tc.arguments.clone()),
                        },
                    })
                    .collect(),
                tool_call_id: message.tool_call_id.clone(),
            }
        }
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub(super) struct ChatToolCall {
        #[serde(default)]
        pub id: String,
        #[serde(rename = "type", default = "function_kind")]
        pub kind: String,
        pub function: ChatFunctionCall,
    }

    fn function_kind() -> String {
        "function".into()
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub(super) struct ChatFunctionCall {
        pub name: String,
        /// A JSON-encoded string on the wire, but tolerated as an object or null.
        #[serde(default)]
        pub arguments: serde_json::Value,
    }

    impl ChatFunctionCall {
        fn arguments_text(self) -> String {
            match self.arguments {
                serde_json::Value::String(s) => s,
                serde_json::Value::Null => "{}".into(),
                other => other.to_string(),
            }
        }
    }

    #[derive(Debug, Serialize)]
    pub(super) struct ChatTool {
        #[serde(rename = "type")]
        pub kind: &'static str,
        pub function: ChatToolFunction,
    }

    impl ChatTool {
        pub fn from_definition(def: &ToolDefinition) -> Self {
            Self {
                kind: "function",
                function: ChatToolFunction {
                    name: def.name.clone(),
                    description: def.description.clone(),
                    parameters: def.parameters.clone(),
                },
            }
        }
    }

    #[derive(Debug, Serialize)]
    pub(super) struct ChatToolFunction {
        pub name: String,
        pub description: String,
        pub parameters: serde_json::Value,
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct Completion {
        #[serde(default)]
        pub model: String,
        #[serde(default)]
        pub choices: Vec<Choice>,
        pub usage: Option<CompletionUsage>,
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct Choice {
        pub message: ChatMessage,
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct CompletionUsage {
        #[serde(default)]
        pub prompt_tokens: u32,
        #[serde(default)]
        pub completion_tokens: u32,
        #[serde(default)]
        pub total_tokens: u32,
    }

    /// Decode a completion body into the assistant's reply.
    pub(super) fn parse_completion(body: &str) -> Result<ProviderResponse, ProviderError> {
        let completion: Completion = serde_json::from_str(body)
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse response: {e}")))?;
        into_response(completion)
    }

    pub(super) fn into_response(completion: Completion) -> Result<ProviderResponse, ProviderError> {
        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("No choices in response".into()))?;

        let mut message = Message::assistant(choice.message.content.unwrap_or_default());
        message.tool_calls = choice
            .message
            .tool_calls
            .into_iter()
            .enumerate()
            .map(|(index, call)| {
                let id = if call.id.trim().is_empty() {
                    format!("call_{index}")
                } else {
                    call.id
                };
                MessageToolCall {
                    id,
                    name: call.function.name.clone(),
                    arguments: call.function.arguments_text(),
                }
            })
            .collect();

        Ok(ProviderResponse {
            message,
            usage: completion.usage.map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
            model: completion.model,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::wire::*;
    use super::*;

    fn request_with(messages: Vec<Message>, tools: Vec<ToolDefinition>) -> ProviderRequest {
        ProviderRequest {
            model: "gemini-2.5-flash".into(),
            messages,
            temperature: 0.7,
            max_tokens: Some(256),
            tools,
        }
    }

    #[test]
    fn gemini_constructor() {
        let provider = OpenAiCompatProvider::gemini("key").unwrap();
        assert_eq!(provider.name(), "gemini");
        assert!(provider.base_url().ends_with("generativelanguage.googleapis.com/v1beta/openai"));
    }

    #[test]
    fn ollama_constructor() {
        let provider = OpenAiCompatProvider::ollama(None).unwrap();
        assert_eq!(provider.name(), "ollama");
        assert!(provider.base_url().contains("localhost:11434"));
    }

    #[test]
    fn trailing_slash_trimmed() {
        let provider = OpenAiCompatProvider::new("custom", "http://localhost:8000/v1/", "").unwrap();
        assert_eq!(provider.base_url(), "http://localhost:8000/v1");
    }

    #[test]
    fn request_body_carries_transcript_and_tools() {
        let request = request_with(
            vec![Message::system("You are helpful"), Message::user("Hello")],
            vec![ToolDefinition {
                name: "tavily_search".into(),
                description: "Search the web".into(),
                parameters: serde_json::json!({"type": "object"}),
            }],
        );
        let body = OpenAiCompatProvider::request_body(&request);
        assert_eq!(body["model"], "gemini-2.5-flash");
        assert_eq!(body["max_tokens"], 256);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "Hello");
        assert!(body["messages"][1].get("tool_calls").is_none());
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "tavily_search");
    }

    #[test]
    fn request_body_omits_empty_tool_list() {
        let body = OpenAiCompatProvider::request_body(&request_with(vec![Message::user("hi")], vec![]));
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn assistant_tool_call_round_trips_to_wire() {
        let mut msg = Message::assistant("");
        msg.tool_calls = vec![MessageToolCall {
            id: "call_1".into(),
            name: "tavily_search".into(),
            arguments: r#"{"query":"rust"}"#.into(),
        }];
        let wire = serde_json::to_value(ChatMessage::from_message(&msg)).unwrap();
        // Empty text next to tool calls is left out entirely
        assert!(wire.get("content").is_none());
        assert_eq!(wire["tool_calls"][0]["type"], "function");
        assert_eq!(wire["tool_calls"][0]["function"]["arguments"], r#"{"query":"rust"}"#);
    }

    #[test]
    fn tool_result_message_references_call() {
        let wire = serde_json::to_value(ChatMessage::from_message(&Message::tool_result(
            "call_1",
            "result data",
        )))
        .unwrap();
        assert_eq!(wire["role"], "tool");
        assert_eq!(wire["tool_call_id"], "call_1");
        assert_eq!(wire["content"], "result data");
    }

    #[test]
    fn parse_text_response() {
        let response = parse_completion(
            r#"{
                "model": "gemini-2.5-flash",
                "choices": [{"message": {"role": "assistant", "content": "42"}}],
                "usage": {"prompt_tokens": 12, "completion_tokens": 1, "total_tokens": 13}
            }"#,
        )
        .unwrap();
        assert_eq!(response.message.role, Role::Assistant);
        assert_eq!(response.message.content, "42");
        assert!(response.message.tool_calls.is_empty());
        assert_eq!(response.usage.unwrap().total_tokens, 13);
    }

    #[test]
    fn parse_tool_calls_with_null_content() {
        let response = parse_completion(
            r#"{
                "model": "gpt-4o",
                "choices": [{"message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [
                        {"id": "call_a", "type": "function", "function": {"name": "tavily_search", "arguments": "{\"query\":\"a\"}"}},
                        {"id": "call_b", "type": "function", "function": {"name": "tavily_search", "arguments": "{\"query\":\"b\"}"}}
                    ]
                }}]
            }"#,
        )
        .unwrap();
        assert_eq!(response.message.content, "");
        let ids: Vec<_> = response.message.tool_calls.iter().map(|tc| tc.id.as_str()).collect();
        assert_eq!(ids, vec!["call_a", "call_b"]);
        assert!(response.usage.is_none());
    }

    #[test]
    fn missing_call_ids_are_filled_per_position() {
        let response = parse_completion(
            r#"{
                "choices": [{"message": {
                    "role": "assistant",
                    "tool_calls": [
                        {"function": {"name": "tavily_search", "arguments": "{\"query\":\"a\"}"}},
                        {"id": "", "function": {"name": "tavily_search", "arguments": "{\"query\":\"b\"}"}}
                    ]
                }}]
            }"#,
        )
        .unwrap();
        let ids: Vec<_> = response.message.tool_calls.iter().map(|tc| tc.id.as_str()).collect();
        assert_eq!(ids, vec!["call_0", "call_1"]);
        assert_eq!(response.model, "");
    }

    #[test]
    fn object_and_null_arguments_become_json_text() {
        let response = parse_completion(
            r#"{
                "choices": [{"message": {
                    "role": "assistant",
                    "tool_calls": [
                        {"id": "x", "function": {"name": "tavily_search", "arguments": {"query": "ollama"}}},
                        {"id": "y", "function": {"name": "tavily_search", "arguments": null}}
                    ]
                }}]
            }"#,
        )
        .unwrap();
        let calls = &response.message.tool_calls;
        let first: serde_json::Value = serde_json::from_str(&calls[0].arguments).unwrap();
        assert_eq!(first["query"], "ollama");
        assert_eq!(calls[1].arguments, "{}");
    }

    #[test]
    fn empty_choices_is_invalid_response() {
        let err = parse_completion(r#"{"model": "m", "choices": []}"#).unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }

    #[test]
    fn garbage_body_is_invalid_response() {
        let err = parse_completion("<html>upstream down</html>").unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }

    #[test]
    fn status_mapping() {
        assert!(OpenAiCompatProvider::status_error(200, "").is_none());
        assert!(matches!(
            OpenAiCompatProvider::status_error(429, ""),
            Some(ProviderError::RateLimited { .. })
        ));
        assert!(matches!(
            OpenAiCompatProvider::status_error(403, ""),
            Some(ProviderError::AuthenticationFailed(_))
        ));
        match OpenAiCompatProvider::status_error(500, "model overloaded") {
            Some(ProviderError::ApiError { status_code, message }) => {
                assert_eq!(status_code, 500);
                assert_eq!(message, "model overloaded");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
