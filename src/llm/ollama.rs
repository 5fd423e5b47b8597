use crate::llm::client::LLMClient;
use crate::types::{AppError, Result};
use async_trait::async_trait;
use ollama_rs::{
    Ollama,
    generation::chat::{ChatMessage, request::ChatMessageRequest},
    models::ModelOptions,
};
use std::time::Duration;

pub struct OllamaClient {
    client: Ollama,
    model: String,
    timeout: Duration,
    temperature: f32,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: String, timeout: Duration, temperature: f32) -> Result<Self> {
        let url = reqwest::Url::parse(base_url)
            .map_err(|e| AppError::Config(format!("Invalid Ollama URL '{}': {}", base_url, e)))?;

        Ok(Self {
            client: Ollama::from_url(url),
            model,
            timeout,
            temperature,
        })
    }

    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let request = ChatMessageRequest::new(self.model.clone(), messages)
            .options(ModelOptions::default().temperature(self.temperature));

        let response = tokio::time::timeout(self.timeout, self.client.send_chat_messages(request))
            .await
            .map_err(|_| {
                AppError::ModelInvocation(format!(
                    "Ollama did not answer within {}s",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| AppError::ModelInvocation(format!("Ollama error: {}", e)))?;

        Ok(response.message.content)
    }
}

#[async_trait]
impl LLMClient for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.chat(vec![ChatMessage::user(prompt.to_string())]).await
    }

    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        self.chat(vec![
            ChatMessage::system(system.to_string()),
            ChatMessage::user(prompt.to_string()),
        ])
        .await
    }

    async fn generate_with_history(&self, messages: &[(String, String)]) -> Result<String> {
        let messages = messages
            .iter()
            .map(|(role, content)| match role.as_str() {
                "system" => ChatMessage::system(content.clone()),
                "assistant" => ChatMessage::assistant(content.clone()),
                _ => ChatMessage::user(content.clone()),
            })
            .collect();
        self.chat(messages).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
