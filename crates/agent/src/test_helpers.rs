//! Shared test helpers for agent loop tests.

use async_trait::async_trait;
use searchhop_core::error::{ProviderError, ToolError};
use searchhop_core::message::{Message, MessageToolCall};
use searchhop_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use searchhop_core::tool::{Tool, ToolResult};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A mock provider that returns a sequence of scripted responses.
///
/// Each call to `complete` returns the next entry in the queue and records
/// the request it was given. Panics if more calls are made than responses
/// provided.
pub struct SequentialMockProvider {
    responses: Vec<Result<ProviderResponse, ProviderError>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            responses,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a provider that returns a single text response (no tool calls).
    pub fn single_text(text: &str) -> Self {
        Self::new(vec![Ok(make_text_response(text))])
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Requests seen so far, in call order.
    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let index = requests.len();
        requests.push(request);

        match self.responses.get(index) {
            Some(response) => response.clone(),
            None => panic!(
                "SequentialMockProvider: no more responses (call #{}, have {})",
                index,
                self.responses.len()
            ),
        }
    }
}

/// A provider that cycles through the same script for every run.
///
/// The script restarts whenever a request arrives with a fresh two-message
/// transcript, so repeated runs see identical behavior.
pub struct RepeatingMockProvider {
    script: Vec<ProviderResponse>,
    position: Mutex<usize>,
}

impl RepeatingMockProvider {
    pub fn new(script: Vec<ProviderResponse>) -> Self {
        Self {
            script,
            position: Mutex::new(0),
        }
    }
}

#[async_trait]
impl Provider for RepeatingMockProvider {
    fn name(&self) -> &str {
        "repeating_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut position = self.position.lock().unwrap();
        if request.messages.len() == 2 {
            *position = 0;
        }
        let response = self.script[*position % self.script.len()].clone();
        *position += 1;
        Ok(response)
    }
}

/// Create a simple text response (no tool calls).
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// Create a response with tool calls and optional thought content.
pub fn make_tool_call_response(tool_calls: Vec<MessageToolCall>, thought: &str) -> ProviderResponse {
    let mut msg = Message::assistant(thought);
    msg.tool_calls = tool_calls;
    ProviderResponse {
        message: msg,
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// Helper to create a tool call with an explicit id.
pub fn make_tool_call(id: &str, name: &str, args: serde_json::Value) -> MessageToolCall {
    MessageToolCall {
        id: id.to_string(),
        name: name.to_string(),
        arguments: serde_json::to_string(&args).unwrap(),
    }
}

/// Tool names in the order their executions finished.
pub type CompletionLog = Arc<Mutex<Vec<&'static str>>>;

/// A tool that returns canned search entries after an optional delay.
pub struct StubSearchTool {
    pub name: &'static str,
    pub entries: serde_json::Value,
    pub delay: Duration,
    pub completions: Option<CompletionLog>,
}

impl StubSearchTool {
    pub fn new(name: &'static str, entries: serde_json::Value) -> Self {
        Self {
            name,
            entries,
            delay: Duration::ZERO,
            completions: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_completion_log(mut self, log: CompletionLog) -> Self {
        self.completions = Some(log);
        self
    }
}

#[async_trait]
impl Tool for StubSearchTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "Returns canned search results"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": { "query": { "type": "string" } },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        if arguments["query"].as_str().is_none() {
            return Err(ToolError::InvalidArguments("Missing 'query' argument".into()));
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(log) = &self.completions {
            log.lock().unwrap().push(self.name);
        }
        Ok(ToolResult::from_serializable(&self.entries))
    }
}

/// A tool that always fails with a network error.
pub struct FailingTool;

#[async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str {
        "flaky"
    }

    fn description(&self) -> &str {
        "Always fails"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({ "type": "object" })
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        Err(ToolError::Network("connection reset by peer".into()))
    }
}
