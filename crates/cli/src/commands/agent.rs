//! `searchhop [QUERY]` — research one query and print the answer.

use std::sync::Arc;

use searchhop_agent::AgentLoop;
use searchhop_config::AppConfig;
use searchhop_core::{Error, Result};
use tracing::{info, warn};

pub async fn run(query: &str, max_hops: Option<u32>) -> Result<()> {
    let mut config =
        AppConfig::load().map_err(|e| Error::config(format!("Failed to load config: {e}")))?;
    if let Some(hops) = max_hops {
        config.agent.max_hops = hops;
    }

    // Check for an API key early so the error is clear
    if let Err(e) = require_model_key(&config) {
        eprintln!();
        eprintln!("  ERROR: No model API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables (or put it in .env):");
        eprintln!("    GEMINI_API_KEY     = '...'   (default provider)");
        eprintln!("    OPENROUTER_API_KEY = 'sk-or-v1-...'");
        eprintln!("    OPENAI_API_KEY     = 'sk-...'");
        eprintln!("    SEARCHHOP_API_KEY  = '...'   (generic)");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        eprintln!("  Get a Gemini key at: https://aistudio.google.com/apikey");
        eprintln!();
        return Err(e);
    }

    if config.search.api_key.is_none() {
        warn!("TAVILY_API_KEY is not set; every search will fail and the model must answer unaided");
    }

    let provider = searchhop_providers::build_from_config(&config)?;
    let tools = Arc::new(searchhop_tools::default_registry(&config.search)?);
    let agent = AgentLoop::from_config(provider, tools, &config);

    info!(
        provider = %config.default_provider,
        model = %config.default_model,
        max_hops = config.agent.max_hops,
        "Agent ready"
    );

    let banner = "=".repeat(80);
    println!("{banner}");
    println!("Running agent with query: {query}");
    println!("{banner}");

    let answer = agent.run(query).await;

    println!();
    println!("{banner}");
    println!("Final Answer:");
    println!("{banner}");
    println!("{answer}");

    Ok(())
}

/// Local Ollama servers take no key; every other provider needs one.
fn require_model_key(config: &AppConfig) -> Result<()> {
    if config.has_api_key() || config.default_provider == "ollama" {
        Ok(())
    } else {
        Err(Error::config(
            "No API key found. See above for setup instructions.",
        ))
    }
}
