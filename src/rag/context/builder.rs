//! Context builder for RAG prompts
//!
//! Assembles retrieved passages into the system and user messages sent to the
//! generator. Output depends only on the inputs.

use crate::rag::generator::ChatMessage;
use crate::retrieval::SearchResult;

use super::templates::PromptTemplates;

/// Separator placed between passages in the context block
pub const PASSAGE_SEPARATOR: &str = "\n\n---\n\n";

/// Builds context from retrieved passages for LLM prompts
#[derive(Debug, Clone, Default)]
pub struct ContextBuilder {
    templates: PromptTemplates,
}

impl ContextBuilder {
    /// Create a new context builder with default templates
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context builder with custom templates
    pub fn with_templates(templates: PromptTemplates) -> Self {
        Self { templates }
    }

    /// Join passage texts in retrieval order
    pub fn build(&self, results: &[SearchResult]) -> String {
        results
            .iter()
            .map(|r| r.chunk.content.as_str())
            .collect::<Vec<_>>()
            .join(PASSAGE_SEPARATOR)
    }

    /// System instruction plus the user message carrying context and question
    pub fn build_messages(&self, query: &str, context: &str) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(self.templates.system.clone()),
            ChatMessage::user(self.templates.render_user(context, query)),
        ]
    }

    pub fn templates(&self) -> &PromptTemplates {
        &self.templates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::generator::Role;
    use crate::testing::chunks_from;

    fn results(texts: &[&str]) -> Vec<SearchResult> {
        chunks_from(texts)
            .into_iter()
            .enumerate()
            .map(|(i, chunk)| SearchResult {
                chunk,
                distance: i as f32 * 0.1,
                rank: i + 1,
                position: i,
            })
            .collect()
    }

    #[test]
    fn test_build_context_joins_in_order() {
        let builder = ContextBuilder::new();
        let context = builder.build(&results(&["First passage", "Second passage"]));

        assert_eq!(context, "First passage\n\n---\n\nSecond passage");
    }

    #[test]
    fn test_build_messages() {
        let builder = ContextBuilder::new();
        let context = builder.build(&results(&["Paris is the capital of France."]));
        let messages = builder.build_messages("What is the capital?", &context);

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(
            messages[1].content,
            "Document context:\nParis is the capital of France.\n\nQuestion:\nWhat is the capital?\n\nAnswer:"
        );
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let builder = ContextBuilder::new();
        let r = results(&["a", "b", "c"]);

        let first = builder.build_messages("q", &builder.build(&r));
        let second = builder.build_messages("q", &builder.build(&r));
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_results_give_empty_context() {
        let builder = ContextBuilder::new();
        assert_eq!(builder.build(&[]), "");
    }
}
