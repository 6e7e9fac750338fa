//! Prompt templates for grounded answers

/// Instruction block sent as the system message
pub const GROUNDED_SYSTEM_PROMPT: &str = concat!(
    "You are an expert assistant that answers questions using ONLY the provided context.\n\n",
    "Important rules:\n",
    "1. Answer only with information present in the context\n",
    "2. If the answer is not in the context, say: \"I cannot find that information in the document\"\n",
    "3. Be precise and concise\n",
    "4. Quote relevant passages when useful\n",
    "5. If the context answers the question only partially, say so clearly",
);

/// User message layout; `{context}` and `{query}` are substituted
pub const GROUNDED_USER_TEMPLATE: &str =
    "Document context:\n{context}\n\nQuestion:\n{query}\n\nAnswer:";

/// System and user templates for one prompt style
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplates {
    pub system: String,
    pub user: String,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            system: GROUNDED_SYSTEM_PROMPT.to_string(),
            user: GROUNDED_USER_TEMPLATE.to_string(),
        }
    }
}

impl PromptTemplates {
    pub fn new(system: &str, user: &str) -> Self {
        Self {
            system: system.to_string(),
            user: user.to_string(),
        }
    }

    /// Fill the user template
    ///
    /// The query is substituted last so braces typed by the user are never
    /// treated as placeholders.
    pub fn render_user(&self, context: &str, query: &str) -> String {
        let (before, after) = match self.user.split_once("{query}") {
            Some(parts) => parts,
            None => (self.user.as_str(), ""),
        };
        let before = before.replace("{context}", context);
        let after = after.replace("{context}", context);

        if self.user.contains("{query}") {
            format!("{}{}{}", before, query, after)
        } else {
            before
        }
    }
}
