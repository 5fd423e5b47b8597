//! Structured (JSON) model output.
//!
//! Models asked for JSON often wrap it in prose or code fences. The first
//! `{ ... }` span of the reply (first opening brace to last closing brace) is
//! parsed; anything else is a [`AppError::ResponseParse`].

use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::llm::client::LLMClient;
use crate::types::{AppError, Result, Translation};

/// Default target language for translations.
pub const DEFAULT_TARGET_LANG: &str = "中文";

const TRANSLATOR_SYSTEM_PROMPT: &str = "你是一个翻译助手，总是返回有效的JSON。";

/// Extracts and deserializes the JSON object embedded in `reply`.
pub fn extract_json<T: DeserializeOwned>(reply: &str) -> Result<T> {
    let start = reply.find('{');
    let end = reply.rfind('}');

    let object = match (start, end) {
        (Some(start), Some(end)) if start < end => &reply[start..=end],
        _ => {
            return Err(AppError::ResponseParse(
                "model reply contains no JSON object".into(),
            ))
        }
    };

    serde_json::from_str(object)
        .map_err(|e| AppError::ResponseParse(format!("model returned invalid JSON: {}", e)))
}

/// Translation with an example sentence, produced as JSON by the model.
#[derive(Clone)]
pub struct Translator {
    llm: Arc<dyn LLMClient>,
}

impl Translator {
    pub fn new(llm: Arc<dyn LLMClient>) -> Self {
        Self { llm }
    }

    pub async fn translate(&self, text: &str, target_lang: &str) -> Result<Translation> {
        let prompt = translation_prompt(text, target_lang);

        let reply = self
            .llm
            .generate_with_system(TRANSLATOR_SYSTEM_PROMPT, &prompt)
            .await?;

        extract_json(&reply)
    }
}

fn translation_prompt(text: &str, target_lang: &str) -> String {
    format!(
        "请先识别出当前原文的语言，然后将他翻译成{lang}，并尽量符合中文语法和语境。并提供一个例句。以JSON格式返回，包含三个字段：\n\
         - original: 原文\n\
         - translation: 译文\n\
         - example: 一个包含该词的例句（用{lang}）\n\
         \n\
         原文：{text}\n\
         \n\
         请只返回JSON，不要有其他内容。",
        lang = target_lang,
        text = text
    )
}
