//! LLM client factory.
//!
//! Centralizes provider-specific logic for creating LLM clients.

use crate::config::LlmConfig;
use crate::error::{ExplorerError, Result};
use crate::llm::{
    AnthropicClient, AnthropicConfig, LlmClient, LlmProvider, MockLlmClient, OpenAiClient,
    OpenAiConfig,
};
use tracing::debug;

/// Creates an LLM client from configuration and a resolved API key.
///
/// Providers that need a key fail with a configuration error when `api_key`
/// is `None`; key lookup itself is the caller's concern.
pub fn create_client(config: &LlmConfig, api_key: Option<String>) -> Result<Box<dyn LlmClient>> {
    let provider = config.provider()?;
    let model = config.resolved_model()?;
    debug!(%provider, %model, "Creating LLM client");

    match provider {
        LlmProvider::OpenAi => {
            let key = require_key(provider, api_key)?;
            let client_config = OpenAiConfig::new(key, model)
                .with_temperature(config.temperature)
                .with_timeout(config.timeout_secs);
            Ok(Box::new(OpenAiClient::new(client_config)?))
        }
        LlmProvider::Anthropic => {
            let key = require_key(provider, api_key)?;
            let client_config = AnthropicConfig::new(key, model)
                .with_temperature(config.temperature)
                .with_timeout(config.timeout_secs);
            Ok(Box::new(AnthropicClient::new(client_config)?))
        }
        LlmProvider::Mock => Ok(Box::new(MockLlmClient::new())),
    }
}

fn require_key(provider: LlmProvider, api_key: Option<String>) -> Result<String> {
    api_key.filter(|k| !k.trim().is_empty()).ok_or_else(|| {
        ExplorerError::config(format!(
            "No API key configured for {provider}. Set {}, add it to secrets.toml, \
             or store it in the OS keyring.",
            provider.api_key_env().unwrap_or("the provider's API key variable")
        ))
    })
}
