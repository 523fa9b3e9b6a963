//! Provider selection: builds the configured LLM provider.

use std::sync::Arc;
use searchhop_config::AppConfig;
use searchhop_core::error::ProviderError;
use searchhop_core::provider::Provider;
use crate::openai_compat::OpenAiCompatProvider;

/// Build the default provider named in the configuration.
///
/// A `[providers.<name>]` table can supply its own key and base URL;
/// otherwise the well-known base URL and the top-level `api_key` are used.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let name = config.default_provider.as_str();
    let provider_config = config.providers.get(name);

    let api_key = provider_config
        .and_then(|p| p.api_key.clone())
        .or_else(|| config.api_key.clone())
        .unwrap_or_default();

    let base_url = provider_config
        .and_then(|p| p.api_url.clone())
        .or_else(|| default_base_url(name).map(String::from))
        .ok_or_else(|| {
            ProviderError::NotConfigured(format!(
                "Unknown provider '{name}': set providers.{name}.api_url in the config file"
            ))
        })?;

    let provider = OpenAiCompatProvider::new(name, base_url, api_key)?;
    Ok(Arc::new(provider))
}

/// Get the default base URL for well-known providers.
pub fn default_base_url(provider_name: &str) -> Option<&'static str> {
    match provider_name {
        "gemini" | "google" => Some("https://generativelanguage.googleapis.com/v1beta/openai"),
        "openrouter" => Some("https://openrouter.ai/api/v1"),
        "openai" => Some("https://api.openai.com/v1"),
        "ollama" => Some("http://localhost:11434/v1"),
        "groq" => Some("https://api.groq.com/openai/v1"),
        "together" => Some("https://api.together.xyz/v1"),
        "vllm" => Some("http://localhost:8000/v1"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use searchhop_config::ProviderConfig;

    #[test]
    fn default_base_urls() {
        assert!(default_base_url("gemini").unwrap().contains("googleapis.com"));
        assert!(default_base_url("openrouter").unwrap().contains("openrouter.ai"));
        assert!(default_base_url("openai").unwrap().contains("api.openai.com"));
        assert!(default_base_url("ollama").unwrap().contains("localhost:11434"));
        assert!(default_base_url("mystery").is_none());
    }

    #[test]
    fn build_from_default_config() {
        let config = AppConfig::default();
        let provider = build_from_config(&config).unwrap();
        assert_eq!(provider.name(), "gemini");
    }

    #[test]
    fn custom_provider_uses_table_url() {
        let mut config = AppConfig {
            default_provider: "local".into(),
            ..AppConfig::default()
        };
        config.providers.insert(
            "local".into(),
            ProviderConfig {
                api_key: None,
                api_url: Some("http://127.0.0.1:9000/v1".into()),
            },
        );
        let provider = build_from_config(&config).unwrap();
        assert_eq!(provider.name(), "local");
    }

    #[test]
    fn unknown_provider_without_url_is_rejected() {
        let config = AppConfig {
            default_provider: "mystery".into(),
            ..AppConfig::default()
        };
        let err = build_from_config(&config).err().unwrap();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
        assert!(err.to_string().contains("mystery"));
    }
}
