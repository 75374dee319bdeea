//! Prompt assembly: fused context, history and question into one prompt.
//!
//! The template is fixed. [`assemble`] is pure: the same inputs always
//! produce the same text.

use ragchat_core::document::FusedContextItem;

const PREAMBLE: &str = "You are a helpful assistant engaging in a conversation. \
Use the following context and conversation history to provide a natural, contextual response.";

const CLOSING: &str = "Provide a detailed, conversational response that maintains \
context from the previous discussion:";

/// Build the full prompt.
pub fn assemble(context_items: &[FusedContextItem], history_text: &str, question: &str) -> String {
    format!(
        "{PREAMBLE}\n\n\
         Context: {context}\n\n\
         Conversation History:\n{history_text}\n\n\
         Current Question: {question}\n\n\
         {CLOSING}",
        context = render_context(context_items),
    )
}

/// One paragraph per item, separated by blank lines.
pub fn render_context(items: &[FusedContextItem]) -> String {
    items
        .iter()
        .map(render_item)
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn render_item(item: &FusedContextItem) -> String {
    let document_id = item.id().map(|id| id.0).unwrap_or_default();
    format!(
        "Relevance Score: {score}\n\n\
         Vector Search Content:\n{snippet}\n\n\
         Full Document:\n\
         Summary: {summary}\n\
         Keywords: {keywords}\n\
         Document ID: {document_id}",
        score = item.score,
        snippet = item.snippet,
        summary = item.document.summary(),
        keywords = item.document.keywords().join(", "),
    )
}
