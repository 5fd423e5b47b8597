use std::sync::Arc;

use crate::llm::LLMClient;
use crate::types::{AnswerResponse, AppError, Result, RetrievalResult};

/// Default number of characters kept per source preview.
pub const DEFAULT_PREVIEW_CHARS: usize = 100;

/// Appended to every source preview.
pub const TRUNCATION_MARKER: &str = "...";

/// Calls the model with the composed prompt and packages the answer together
/// with previews of the chunks that grounded it.
#[derive(Clone)]
pub struct AnswerComposer {
    llm: Arc<dyn LLMClient>,
    preview_chars: usize,
}

impl AnswerComposer {
    pub fn new(llm: Arc<dyn LLMClient>) -> Self {
        Self {
            llm,
            preview_chars: DEFAULT_PREVIEW_CHARS,
        }
    }

    pub fn with_preview_chars(mut self, preview_chars: usize) -> Self {
        self.preview_chars = preview_chars;
        self
    }

    pub fn model_name(&self) -> &str {
        self.llm.model_name()
    }

    /// System turn = `system_prompt`, user turn = `question` verbatim.
    ///
    /// The answer text is returned unmodified. Model failures surface as
    /// [`AppError::ModelInvocation`].
    pub async fn answer(
        &self,
        question: &str,
        system_prompt: &str,
        retrieved: &RetrievalResult,
    ) -> Result<AnswerResponse> {
        let answer = self
            .llm
            .generate_with_system(system_prompt, question)
            .await
            .map_err(|e| match e {
                AppError::ModelInvocation(_) => e,
                other => AppError::ModelInvocation(other.to_string()),
            })?;

        Ok(AnswerResponse {
            answer,
            sources: retrieved
                .contents()
                .map(|content| preview(content, self.preview_chars))
                .collect(),
        })
    }
}

/// First `chars` characters of `content` followed by the truncation marker.
pub fn preview(content: &str, chars: usize) -> String {
    let end = content
        .char_indices()
        .nth(chars)
        .map(|(i, _)| i)
        .unwrap_or(content.len());
    format!("{}{}", &content[..end], TRUNCATION_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ScoredChunk;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    struct RecordingLlm {
        reply: Result<String>,
        calls: Mutex<Vec<(String, String)>>,
    }

    impl RecordingLlm {
        fn replying(reply: Result<String>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LLMClient for RecordingLlm {
        async fn generate(&self, prompt: &str) -> Result<String> {
            self.generate_with_system("", prompt).await
        }

        async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
            self.calls.lock().push((system.to_string(), prompt.to_string()));
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(e) => Err(AppError::Internal(e.to_string())),
            }
        }

        async fn generate_with_history(&self, _messages: &[(String, String)]) -> Result<String> {
            Err(AppError::Internal("not used by the answer composer".into()))
        }

        fn model_name(&self) -> &str {
            "recording"
        }
    }

    fn retrieved(contents: &[String]) -> RetrievalResult {
        RetrievalResult {
            chunks: contents
                .iter()
                .map(|c| ScoredChunk {
                    content: c.clone(),
                    score: 0.5,
                    metadata: None,
                })
                .collect(),
        }
    }

    #[test]
    fn test_preview_counts_characters() {
        assert_eq!(preview("short", 100), "short...");
        assert_eq!(preview("abcdef", 3), "abc...");
        assert_eq!(preview("普氏野马原产于中亚", 4), "普氏野马...");
        assert_eq!(preview(&"x".repeat(250), 100).chars().count(), 103);
    }

    #[tokio::test]
    async fn test_answer_passes_prompt_and_question_verbatim() {
        let llm = RecordingLlm::replying(Ok("  A wild horse.\n".into()));
        let composer = AnswerComposer::new(llm.clone());
        let chunks = retrieved(&["a".repeat(150), "short chunk".into()]);

        let response = composer
            .answer("What is a Przewalski's horse?", "SYSTEM", &chunks)
            .await
            .unwrap();

        assert_eq!(response.answer, "  A wild horse.\n");
        assert_eq!(response.sources.len(), 2);
        assert_eq!(response.sources[0], format!("{}...", "a".repeat(100)));
        assert_eq!(response.sources[1], "short chunk...");

        let calls = llm.calls.lock();
        assert_eq!(
            calls.as_slice(),
            &[("SYSTEM".to_string(), "What is a Przewalski's horse?".to_string())]
        );
    }

    #[tokio::test]
    async fn test_model_failure_is_model_invocation_error() {
        let llm = RecordingLlm::replying(Err(AppError::Internal("boom".into())));
        let composer = AnswerComposer::new(llm);

        let err = composer
            .answer("q", "s", &RetrievalResult::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ModelInvocation(msg) if msg.contains("boom")));
    }
}
