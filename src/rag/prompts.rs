//! System prompt templates.
//!
//! Templates are data: a fixed registry from key to text, each text holding a
//! single `{context}` slot. Lookup is case-insensitive and an unknown key
//! falls back to [`DEFAULT_TEMPLATE`] instead of failing.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::types::RetrievalResult;

pub const DEFAULT_TEMPLATE: &str = "general_qa";

pub const CONTEXT_PLACEHOLDER: &str = "{context}";

/// Separator placed between retrieved chunks inside the context slot.
pub const CHUNK_SEPARATOR: &str = "\n\n";

const GENERAL_QA: &str = "你是“马类知识助手”。请仅基于提供的上下文回答问题。
要求：
1) 优先给出直接结论，再给简短依据。
2) 如果上下文包含时间、地点、物种名，请尽量保留这些关键信息。
3) 如果上下文不足以回答，明确说“根据当前资料无法确定”，并说明缺少什么信息。
4) 不要编造，不要使用上下文之外的知识。

上下文：
{context}";

const TIMELINE_EXPERT: &str = "你是“马类演化时间线助手”。请仅依据上下文回答。
回答格式：
- 时间点/时期：
- 关键事件：
- 证据片段（简述）：

要求：
1) 优先梳理演化顺序（如始新世、物种变化、形态变化）。
2) 若用户问“最早/最晚/先后关系”，必须给清晰顺序。
3) 信息不足时写“根据当前资料无法确定”。
4) 禁止编造。

上下文：
{context}";

const COMPARE_EXPERT: &str = "你是“马属对比分析助手”。请仅依据上下文进行比较说明。
回答格式：
- 对比对象：
- 相同点：
- 不同点：
- 适用场景/结论：

要求：
1) 适合回答“冰岛马 vs 普氏野马”“古马 vs 现代马”等问题。
2) 对比维度优先：体型、步态、栖息环境、食性、驯化与保护状态。
3) 缺失维度要明确标注“资料未提及”。
4) 禁止编造。

上下文：
{context}";

const STRICT_CITATION: &str = "你是“证据优先的马类资料问答助手”。只能用上下文内容回答。
要求：
1) 每个核心结论后都附“依据：”并复述对应上下文信息。
2) 若发现上下文内部信息可能冲突，先指出冲突再给保守结论。
3) 不能确定时，输出“根据当前资料无法确定”。
4) 语言简洁，不要扩写，不要编造。

上下文：
{context}";

static TEMPLATES: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        ("general_qa", GENERAL_QA),
        ("timeline_expert", TIMELINE_EXPERT),
        ("compare_expert", COMPARE_EXPERT),
        ("strict_citation", STRICT_CITATION),
    ])
});

/// Registered template keys, sorted.
pub fn template_keys() -> Vec<&'static str> {
    let mut keys: Vec<_> = TEMPLATES.keys().copied().collect();
    keys.sort_unstable();
    keys
}

/// Resolves `key` to a registered key, falling back to the default.
pub fn resolve_key(key: &str) -> &'static str {
    let wanted = key.trim().to_lowercase();
    TEMPLATES
        .get_key_value(wanted.as_str())
        .map(|(k, _)| *k)
        .unwrap_or(DEFAULT_TEMPLATE)
}

pub fn template(key: &str) -> &'static str {
    TEMPLATES
        .get(resolve_key(key))
        .copied()
        .unwrap_or(GENERAL_QA)
}

/// Builds system prompts from the configured template.
#[derive(Debug, Clone)]
pub struct PromptComposer {
    key: &'static str,
}

impl PromptComposer {
    pub fn new(template_key: &str) -> Self {
        let key = resolve_key(template_key);
        if !key.eq_ignore_ascii_case(template_key.trim()) {
            tracing::warn!(
                requested = template_key,
                using = key,
                "Unknown PROMPT_TEMPLATE, using default"
            );
        }
        Self { key }
    }

    pub fn template_key(&self) -> &'static str {
        self.key
    }

    pub fn compose(&self, retrieved: &RetrievalResult) -> String {
        compose(self.key, retrieved)
    }
}

/// Substitutes the retrieved chunks, in retrieval order, into the template's
/// context slot.
pub fn compose(template_key: &str, retrieved: &RetrievalResult) -> String {
    let context = retrieved.contents().collect::<Vec<_>>().join(CHUNK_SEPARATOR);
    template(template_key).replacen(CONTEXT_PLACEHOLDER, &context, 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ScoredChunk;
    use rstest::rstest;

    fn retrieved(contents: &[&str]) -> RetrievalResult {
        RetrievalResult {
            chunks: contents
                .iter()
                .enumerate()
                .map(|(i, c)| ScoredChunk {
                    content: c.to_string(),
                    score: 1.0 - i as f32 * 0.1,
                    metadata: None,
                })
                .collect(),
        }
    }

    #[test]
    fn test_every_template_has_one_context_slot() {
        for key in template_keys() {
            assert_eq!(template(key).matches(CONTEXT_PLACEHOLDER).count(), 1, "{}", key);
        }
        assert_eq!(template_keys().len(), 4);
    }

    #[rstest]
    #[case("general_qa", "general_qa")]
    #[case("TIMELINE_EXPERT", "timeline_expert")]
    #[case(" compare_expert ", "compare_expert")]
    #[case("strict_citation", "strict_citation")]
    #[case("nonexistent", "general_qa")]
    #[case("", "general_qa")]
    fn test_resolve_key(#[case] requested: &str, #[case] expected: &str) {
        assert_eq!(resolve_key(requested), expected);
    }

    #[test]
    fn test_unknown_key_composes_default() {
        let chunks = retrieved(&["普氏野马原产于中亚草原。"]);
        assert_eq!(
            compose("no_such_template", &chunks),
            compose(DEFAULT_TEMPLATE, &chunks)
        );
    }

    #[test]
    fn test_context_in_retrieval_order() {
        let prompt = compose("general_qa", &retrieved(&["first", "second", "third"]));

        assert!(prompt.starts_with("你是“马类知识助手”"));
        assert!(prompt.ends_with("上下文：\nfirst\n\nsecond\n\nthird"));
        assert!(!prompt.contains(CONTEXT_PLACEHOLDER));
    }

    #[test]
    fn test_empty_retrieval_leaves_empty_context() {
        let prompt = PromptComposer::new("strict_citation").compose(&RetrievalResult::default());
        assert!(prompt.ends_with("上下文：\n"));
    }
}
