//! LLM client abstraction and provider selection
//!
//! - **OpenAI-compatible**: DeepSeek (default) or OpenAI chat completions
//! - **Ollama**: local inference

use crate::types::{AppError, Result};
use crate::utils::config::Config;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Generic LLM client trait for provider abstraction
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Generate a completion from a single user prompt
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Two-message exchange: system instructions, then the user turn verbatim
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String>;

    /// Multi-turn exchange of `(role, content)` pairs, oldest first.
    /// Roles are `system`, `user` and `assistant`; anything else is sent as `user`.
    async fn generate_with_history(&self, messages: &[(String, String)]) -> Result<String>;

    /// Get the model name/identifier
    fn model_name(&self) -> &str;
}

/// Provider enum for runtime selection
#[derive(Debug, Clone, PartialEq)]
pub enum Provider {
    /// Any OpenAI-compatible chat completions API (OpenAI, DeepSeek, ...)
    ///
    /// ```rust,ignore
    /// let provider = Provider::OpenAI {
    ///     api_key: "sk-...".to_string(),
    ///     api_base: "https://api.deepseek.com/v1".to_string(),
    ///     model: "deepseek-chat".to_string(),
    /// };
    /// ```
    OpenAI {
        api_key: String,
        api_base: String,
        model: String,
    },

    /// Ollama local LLM provider
    Ollama { base_url: String, model: String },
}

impl Provider {
    /// Resolves `LLM_PROVIDER`. Missing credentials are reported here rather
    /// than on the first request.
    pub fn from_config(config: &Config) -> Result<Self> {
        let llm = &config.llm;
        match llm.provider.trim().to_lowercase().as_str() {
            "deepseek" => Ok(Provider::OpenAI {
                api_key: require_key(&llm.deepseek_api_key, "DEEPSEEK_API_KEY", "deepseek")?,
                api_base: llm.deepseek_base_url.clone(),
                model: llm.deepseek_model.clone(),
            }),
            "openai" => Ok(Provider::OpenAI {
                api_key: require_key(&config.embedding.openai_api_key, "OPENAI_API_KEY", "openai")?,
                api_base: config.embedding.openai_base_url.clone(),
                model: llm.openai_model.clone(),
            }),
            "ollama" => Ok(Provider::Ollama {
                base_url: config.embedding.ollama_base_url.clone(),
                model: llm.ollama_model.clone(),
            }),
            other => Err(AppError::Config(format!(
                "Unsupported LLM_PROVIDER '{}'. Use 'deepseek', 'openai' or 'ollama'.",
                other
            ))),
        }
    }

    /// Create a client instance for this provider
    ///
    /// `temperature` applies to every request the client makes.
    pub fn create_client(
        &self,
        timeout: Duration,
        temperature: f32,
    ) -> Result<Arc<dyn LLMClient>> {
        match self {
            Provider::OpenAI {
                api_key,
                api_base,
                model,
            } => Ok(Arc::new(super::openai::OpenAIClient::new(
                api_key.clone(),
                api_base.clone(),
                model.clone(),
                timeout,
                temperature,
            ))),
            Provider::Ollama { base_url, model } => Ok(Arc::new(
                super::ollama::OllamaClient::new(base_url, model.clone(), timeout, temperature)?,
            )),
        }
    }

    /// Get a human-readable name for this provider
    pub fn name(&self) -> &'static str {
        match self {
            Provider::OpenAI { .. } => "OpenAI-compatible",
            Provider::Ollama { .. } => "Ollama",
        }
    }

    pub fn model(&self) -> &str {
        match self {
            Provider::OpenAI { model, .. } | Provider::Ollama { model, .. } => model,
        }
    }
}

fn require_key(key: &Option<String>, env: &str, provider: &str) -> Result<String> {
    key.clone()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| {
            AppError::Config(format!(
                "{} is required when LLM_PROVIDER={}",
                env, provider
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Config {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        Config::default()
            .with_overrides(|k| map.get(k).map(|v| v.to_string()))
            .unwrap()
    }

    #[test]
    fn test_deepseek_is_default_and_needs_key() {
        assert!(matches!(
            Provider::from_config(&config(&[])),
            Err(AppError::Config(msg)) if msg.contains("DEEPSEEK_API_KEY")
        ));

        let provider = Provider::from_config(&config(&[("DEEPSEEK_API_KEY", "sk-x")])).unwrap();
        assert_eq!(
            provider,
            Provider::OpenAI {
                api_key: "sk-x".into(),
                api_base: "https://api.deepseek.com/v1".into(),
                model: "deepseek-chat".into(),
            }
        );
    }

    #[test]
    fn test_ollama_needs_no_key() {
        let provider = Provider::from_config(&config(&[("LLM_PROVIDER", "Ollama")])).unwrap();
        assert_eq!(provider.name(), "Ollama");
        assert_eq!(provider.model(), "llama3.2");
    }

    #[test]
    fn test_openai_reuses_openai_key() {
        let provider = Provider::from_config(&config(&[
            ("LLM_PROVIDER", "openai"),
            ("OPENAI_API_KEY", "sk-o"),
        ]))
        .unwrap();
        assert!(matches!(provider, Provider::OpenAI { ref api_key, .. } if api_key == "sk-o"));
    }

    #[test]
    fn test_unknown_provider() {
        assert!(matches!(
            Provider::from_config(&config(&[("LLM_PROVIDER", "anthropic")])),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_create_client_reports_model() {
        let provider = Provider::Ollama {
            base_url: "http://localhost:11434".into(),
            model: "llama3.2".into(),
        };
        let client = provider.create_client(Duration::from_secs(5), 0.0).unwrap();
        assert_eq!(client.model_name(), "llama3.2");
    }
}
