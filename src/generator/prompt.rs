//! Prompt template applied before a prompt reaches a language model.

const PREAMBLE: &str = "You are an AI assistant. Your task is to answer the user's questions clearly and concisely in **plain text**.
- Do NOT respond with code, scripts, or formatting instructions.
- Keep your answers straightforward, informative, and conversational.
- Only provide extra explanations if they help clarify your answer.";

/// Wrap `user_prompt` in the plain-text assistant instructions.
#[must_use]
pub fn render(user_prompt: &str) -> String {
    format!("{PREAMBLE}\n\nUSER PROMPT:\n{user_prompt}\n\nYour response should be text-only:\n")
}
