//! Web search tool backed by the Tavily search API.
//!
//! One invocation makes one `POST /search` call. A search that finds
//! nothing is a successful, empty result; transport, auth and decoding
//! faults surface as [`ToolError`]s for the agent loop to fold into the
//! transcript.

use std::time::Duration;

use async_trait::async_trait;
use searchhop_config::{MAX_SEARCH_RESULTS, SearchConfig};
use searchhop_core::error::ToolError;
use searchhop_core::tool::{Tool, ToolResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const TOOL_NAME: &str = "tavily_search";

/// One search hit as shown to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchEntry {
    pub title: String,
    pub url: String,
    pub content: String,
}

pub struct TavilySearchTool {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    default_max_results: u32,
    search_depth: String,
}

impl TavilySearchTool {
    pub fn new(config: &SearchConfig) -> Result<Self, ToolError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ToolError::NotConfigured(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            default_max_results: config.default_max_results,
            search_depth: config.search_depth.clone(),
        })
    }

    async fn search(&self, query: &str, max_results: u32) -> Result<Vec<SearchEntry>, ToolError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            ToolError::NotConfigured("TAVILY_API_KEY is not set".into())
        })?;

        let url = format!("{}/search", self.api_url);
        let body = serde_json::json!({
            "query": query,
            "max_results": max_results,
            "search_depth": self.search_depth,
        });

        debug!(query, max_results, "Sending Tavily search request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ToolError::Network(e.to_string()))?;

        let status = response.status().as_u16();

        if status == 401 || status == 403 {
            return Err(ToolError::AuthenticationFailed(
                "Tavily rejected the API key".into(),
            ));
        }

        let text = response
            .text()
            .await
            .map_err(|e| ToolError::Network(e.to_string()))?;

        if !(200..300).contains(&status) {
            return Err(ToolError::ExecutionFailed {
                tool_name: TOOL_NAME.into(),
                reason: format!("Tavily returned status {status}: {text}"),
            });
        }

        parse_response(&text)
    }
}

#[async_trait]
impl Tool for TavilySearchTool {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "Use Tavily Search API to search information for the given query. \
         Returns a list of search results, each with a title, url, and content."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The query to be searched."
                },
                "max_results": {
                    "type": "integer",
                    "description": format!(
                        "The maximum number of search results to return (1-{MAX_SEARCH_RESULTS})."
                    )
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let (query, max_results) = parse_arguments(&arguments, self.default_max_results)?;
        let entries = self.search(&query, max_results).await?;
        debug!(count = entries.len(), "Tavily search returned");
        Ok(ToolResult::from_serializable(&entries))
    }
}

/// Validate and coerce the model-supplied arguments.
fn parse_arguments(
    arguments: &serde_json::Value,
    default_max_results: u32,
) -> Result<(String, u32), ToolError> {
    let args = arguments
        .as_object()
        .ok_or_else(|| ToolError::InvalidArguments("Arguments must be a JSON object".into()))?;

    let query = args
        .get("query")
        .and_then(|q| q.as_str())
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".into()))?;

    let requested = match args.get("max_results") {
        None | Some(serde_json::Value::Null) => None,
        // Integers past i64::MAX are still integers; they clamp like any other
        Some(serde_json::Value::Number(n)) => Some(
            n.as_i64()
                .or_else(|| n.as_u64().map(|_| i64::MAX))
                .ok_or_else(|| {
                    ToolError::InvalidArguments(format!(
                        "'max_results' must be an integer, got {n}"
                    ))
                })?,
        ),
        // Models occasionally quote numbers.
        Some(serde_json::Value::String(s)) => Some(s.trim().parse::<i64>().map_err(|_| {
            ToolError::InvalidArguments(format!("'max_results' must be an integer, got '{s}'"))
        })?),
        Some(other) => {
            return Err(ToolError::InvalidArguments(format!(
                "'max_results' must be an integer, got {other}"
            )));
        }
    };

    let max_results = requested
        .map(|n| n.clamp(1, i64::from(MAX_SEARCH_RESULTS)) as u32)
        .unwrap_or(default_max_results);

    Ok((query.to_string(), max_results))
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

/// Decode a Tavily response body into search entries, keeping upstream order.
fn parse_response(body: &str) -> Result<Vec<SearchEntry>, ToolError> {
    let response: TavilyResponse =
        serde_json::from_str(body).map_err(|e| ToolError::ExecutionFailed {
            tool_name: TOOL_NAME.into(),
            reason: format!("Malformed Tavily response: {e}"),
        })?;

    Ok(response
        .results
        .into_iter()
        .map(|r| SearchEntry {
            title: r.title.unwrap_or_default(),
            url: r.url.unwrap_or_default(),
            content: r.content.unwrap_or_default(),
        })
        .collect())
}
