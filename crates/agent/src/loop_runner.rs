//! The agent hop loop implementation.

use std::borrow::Cow;
use std::sync::Arc;

use futures::future::join_all;
use searchhop_config::AppConfig;
use searchhop_core::error::{ProviderError, ToolError};
use searchhop_core::message::{Message, MessageToolCall, Transcript};
use searchhop_core::provider::{Provider, ProviderRequest, ToolDefinition, Usage};
use searchhop_core::tool::{ToolCall, ToolRegistry};
use tracing::{debug, error, info, warn};

use crate::prompt::{FORCED_FINAL_INSTRUCTION, system_prompt_for_today};

/// The agent loop that alternates model calls and tool dispatch.
///
/// Holds only configuration and shared handles. Everything a run mutates
/// (transcript, hop counter, usage) lives inside [`AgentLoop::execute`],
/// so one instance can serve many runs, concurrently or not.
pub struct AgentLoop {
    /// The LLM provider to use
    provider: Arc<dyn Provider>,

    /// The model to use
    model: String,

    /// Temperature setting
    temperature: f32,

    /// Default max tokens per response
    max_tokens: Option<u32>,

    /// Tool registry, fixed for the lifetime of the loop
    tools: Arc<ToolRegistry>,

    /// Model calls allowed to request tools before the forced final answer
    max_hops: u32,

    /// Dispatch the tool calls of one hop concurrently
    parallel_tool_calls: bool,

    /// Characters of each tool result shown in logs
    preview_chars: usize,
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The model answered without asking for tools.
    Concluded,
    /// The hop budget ran out and the forced final call answered.
    ForcedFinal,
    /// A model call failed; the answer is an error description.
    Failed,
}

/// The result of one run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// The final answer text (or error description when `Failed`).
    pub answer: String,
    pub outcome: RunOutcome,
    /// Completed hops.
    pub hops: u32,
    /// Model calls made, including the forced final call.
    pub model_calls: u32,
    /// The full transcript of the run.
    pub transcript: Transcript,
    /// Token usage summed over all model calls that reported it.
    pub usage: Usage,
}

/// Per-run mutable state.
struct RunState {
    transcript: Transcript,
    hops: u32,
    model_calls: u32,
    usage: Usage,
}

impl RunState {
    fn finish(self, answer: String, outcome: RunOutcome) -> RunReport {
        RunReport {
            answer,
            outcome,
            hops: self.hops,
            model_calls: self.model_calls,
            transcript: self.transcript,
            usage: self.usage,
        }
    }
}

impl AgentLoop {
    /// Create a new agent loop.
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        temperature: f32,
        tools: Arc<ToolRegistry>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature,
            max_tokens: None,
            tools,
            max_hops: 3,
            parallel_tool_calls: false,
            preview_chars: 1000,
        }
    }

    /// Create an agent loop using the model and agent settings of `config`.
    pub fn from_config(
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        config: &AppConfig,
    ) -> Self {
        Self::new(provider, &config.default_model, config.default_temperature, tools)
            .with_max_tokens(config.default_max_tokens)
            .with_max_hops(config.agent.max_hops)
            .with_parallel_tool_calls(config.agent.parallel_tool_calls)
            .with_preview_chars(config.agent.preview_chars)
    }

    /// Set the hop budget.
    pub fn with_max_hops(mut self, max: u32) -> Self {
        self.max_hops = max;
        self
    }

    /// Set the default max tokens per LLM response.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn with_parallel_tool_calls(mut self, enabled: bool) -> Self {
        self.parallel_tool_calls = enabled;
        self
    }

    pub fn with_preview_chars(mut self, chars: usize) -> Self {
        self.preview_chars = chars.max(1);
        self
    }

    pub fn max_hops(&self) -> u32 {
        self.max_hops
    }

    /// Answer `query`. Never fails: model errors come back as text
    /// starting with `Error`.
    pub async fn run(&self, query: &str) -> String {
        self.execute(query).await.answer
    }

    /// Answer `query` and return the full run record.
    ///
    /// 1. Seeds a transcript with the system prompt and the query
    /// 2. Calls the model; a reply without tool calls is the answer
    /// 3. Otherwise dispatches every requested tool call, appends the
    ///    results in request order and counts one hop
    /// 4. Once `max_hops` hops are spent, asks once more for an answer
    ///    from what has been gathered, ignoring any further tool calls
    pub async fn execute(&self, query: &str) -> RunReport {
        info!(query, max_hops = self.max_hops, "Starting agent run");

        let mut run = RunState {
            transcript: Transcript::seeded(system_prompt_for_today(), query),
            hops: 0,
            model_calls: 0,
            usage: Usage::default(),
        };
        let tool_definitions = self.tools.definitions();

        while run.hops < self.max_hops {
            info!(hop = run.hops + 1, max_hops = self.max_hops, "Starting hop");

            let message = match self.call_model(&mut run, &tool_definitions).await {
                Ok(message) => message,
                Err(e) => {
                    error!(hop = run.hops + 1, error = %e, "Model call failed");
                    return run.finish(format!("Error occurred during search: {e}"), RunOutcome::Failed);
                }
            };

            if !message.has_tool_calls() {
                info!(hop = run.hops + 1, "Model concluded");
                let answer = message.content.clone();
                run.transcript.push(message);
                return run.finish(answer, RunOutcome::Concluded);
            }

            let calls = message.tool_calls.clone();
            run.transcript.push(message);

            let results = self.dispatch(&calls).await;
            info!(count = results.len(), "Added tool result(s) to transcript");
            run.transcript.extend(results);
            run.hops += 1;
        }

        info!(max_hops = self.max_hops, "Reached max hops, generating final response");
        run.transcript.push(Message::user(FORCED_FINAL_INSTRUCTION));

        match self.call_model(&mut run, &tool_definitions).await {
            Ok(mut message) => {
                if message.has_tool_calls() {
                    warn!(
                        ignored = message.tool_calls.len(),
                        "Model requested tools after the hop budget was spent; ignoring them"
                    );
                    message.tool_calls.clear();
                }
                info!("Final response generated");
                let answer = message.content.clone();
                run.transcript.push(message);
                run.finish(answer, RunOutcome::ForcedFinal)
            }
            Err(e) => {
                error!(error = %e, "Final model call failed");
                run.finish(format!("Error generating final response: {e}"), RunOutcome::Failed)
            }
        }
    }

    /// One model call over the current transcript.
    async fn call_model(
        &self,
        run: &mut RunState,
        tool_definitions: &[ToolDefinition],
    ) -> Result<Message, ProviderError> {
        let request = ProviderRequest {
            model: self.model.clone(),
            messages: run.transcript.messages().to_vec(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            tools: tool_definitions.to_vec(),
        };

        run.model_calls += 1;
        let response = self.provider.complete(request).await?;

        if let Some(usage) = &response.usage {
            debug!(
                model = %response.model,
                tokens = usage.total_tokens,
                "Model responded"
            );
            run.usage.accumulate(usage);
        }

        Ok(response.message)
    }

    /// Run every tool call of one hop. Results come back in request order.
    async fn dispatch(&self, calls: &[MessageToolCall]) -> Vec<Message> {
        debug!(tool_count = calls.len(), parallel = self.parallel_tool_calls, "Executing tool calls");

        if self.parallel_tool_calls {
            join_all(calls.iter().enumerate().map(|(i, tc)| self.dispatch_one(i, tc))).await
        } else {
            let mut results = Vec::with_capacity(calls.len());
            for (i, tc) in calls.iter().enumerate() {
                results.push(self.dispatch_one(i, tc).await);
            }
            results
        }
    }

    /// Execute one tool call and wrap the outcome as a tool message.
    /// Failures become the message content instead of propagating.
    async fn dispatch_one(&self, index: usize, tc: &MessageToolCall) -> Message {
        info!(call = index + 1, tool = %tc.name, arguments = %tc.arguments, "Tool call");

        if !self.tools.contains(&tc.name) {
            error!(tool = %tc.name, "Tool not found in available tools");
            return Message::tool_result(&tc.id, format!("Tool {} not found", tc.name));
        }

        let outcome = match parse_arguments(&tc.arguments) {
            Ok(arguments) => {
                let call = ToolCall {
                    id: tc.id.clone(),
                    name: tc.name.clone(),
                    arguments,
                };
                self.tools.execute(&call).await
            }
            Err(e) => Err(e),
        };

        match outcome {
            Ok(result) => {
                info!(
                    tool = %tc.name,
                    result = %preview(&result.output, self.preview_chars),
                    "Tool result"
                );
                Message::tool_result(result.call_id, result.output)
            }
            Err(e) => {
                error!(tool = %tc.name, error = %e, "Tool execution failed");
                Message::tool_result(&tc.id, format!("Error executing {}: {e}", tc.name))
            }
        }
    }
}

/// Decode the model's JSON-encoded arguments. An empty string means no arguments.
fn parse_arguments(raw: &str) -> Result<serde_json::Value, ToolError> {
    if raw.trim().is_empty() {
        return Ok(serde_json::Value::Object(serde_json::Map::new()));
    }
    serde_json::from_str(raw)
        .map_err(|e| ToolError::InvalidArguments(format!("arguments are not valid JSON: {e}")))
}

/// Cut `text` to at most `limit` characters for logging.
fn preview(text: &str, limit: usize) -> Cow<'_, str> {
    match text.char_indices().nth(limit) {
        Some((end, _)) => Cow::Owned(format!("{}...", &text[..end])),
        None => Cow::Borrowed(text),
    }
}
