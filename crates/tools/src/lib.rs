//! Built-in tool implementations for searchhop.
//!
//! The tool set is fixed: the agent gets web search through Tavily and
//! nothing else. The registry is built once at startup.

pub mod tavily_search;

use searchhop_config::SearchConfig;
use searchhop_core::error::ToolError;
use searchhop_core::tool::ToolRegistry;

pub use tavily_search::{SearchEntry, TavilySearchTool};

/// Create the default tool registry with all built-in tools.
pub fn default_registry(search: &SearchConfig) -> Result<ToolRegistry, ToolError> {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(TavilySearchTool::new(search)?));
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_exposes_search_only() {
        let registry = default_registry(&SearchConfig::default()).unwrap();
        assert_eq!(registry.names(), vec!["tavily_search"]);
        assert_eq!(registry.definitions().len(), 1);
    }
}
