use crate::llm::client::LLMClient;
use crate::types::{AppError, Result};
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage,
        CreateChatCompletionRequestArgs,
    },
};
use async_trait::async_trait;
use std::time::Duration;

/// Client for OpenAI-compatible `/chat/completions` endpoints (OpenAI, DeepSeek, ...).
pub struct OpenAIClient {
    client: Client<OpenAIConfig>,
    model: String,
    timeout: Duration,
    temperature: f32,
}

impl OpenAIClient {
    pub fn new(
        api_key: String,
        api_base: String,
        model: String,
        timeout: Duration,
        temperature: f32,
    ) -> Self {
        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(api_base.trim_end_matches('/'));

        Self {
            client: Client::with_config(config),
            model,
            timeout,
            temperature,
        }
    }

    async fn chat(&self, messages: Vec<ChatCompletionRequestMessage>) -> Result<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .build()
            .map_err(|e| AppError::ModelInvocation(format!("Failed to build request: {}", e)))?;

        // Bounds the client's own retries as well as each attempt.
        let response = tokio::time::timeout(self.timeout, self.client.chat().create(request))
            .await
            .map_err(|_| {
                AppError::ModelInvocation(format!(
                    "{} did not answer within {}s",
                    self.model,
                    self.timeout.as_secs_f32()
                ))
            })?
            .map_err(|e| AppError::ModelInvocation(format!("OpenAI API error: {}", e)))?;

        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| AppError::ModelInvocation("No response from model".to_string()))
    }
}

fn to_message(role: &str, content: &str) -> Result<ChatCompletionRequestMessage> {
    Ok(match role {
        "system" => ChatCompletionRequestMessage::System(
            ChatCompletionRequestSystemMessage::from(content.to_string()),
        ),
        "assistant" => ChatCompletionRequestMessage::Assistant(
            ChatCompletionRequestAssistantMessageArgs::default()
                .content(content.to_string())
                .build()
                .map_err(|e| {
                    AppError::ModelInvocation(format!("Failed to build request: {}", e))
                })?,
        ),
        _ => ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage::from(
            content.to_string(),
        )),
    })
}

#[async_trait]
impl LLMClient for OpenAIClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.chat(vec![ChatCompletionRequestMessage::User(
            ChatCompletionRequestUserMessage::from(prompt.to_string()),
        )])
        .await
    }

    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        self.chat(vec![
            ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage::from(
                system.to_string(),
            )),
            ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage::from(
                prompt.to_string(),
            )),
        ])
        .await
    }

    async fn generate_with_history(&self, messages: &[(String, String)]) -> Result<String> {
        let messages = messages
            .iter()
            .map(|(role, content)| to_message(role, content))
            .collect::<Result<Vec<_>>>()?;
        self.chat(messages).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
