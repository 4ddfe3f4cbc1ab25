//! Prompt template for LLM relevance scoring via chat completions

/// Content preview length, in characters, shown to the model per document
pub const PREVIEW_CHARS: usize = 200;

/// System prompt for relevance scoring via an LLM.
///
/// Instructs the model to output `N: score` lines for each numbered document.
pub const SYSTEM_PROMPT: &str = "\
You are a search relevance scorer. Given a query and numbered documents, \
score each document's relevance to the query from 0 to 10.

Output format (one per line, no other text):
1: <score>
2: <score>
...

Rules:
- Score 0 = completely irrelevant, 10 = perfect match
- Output ONLY numbered score lines
- Score every document listed";

/// First `PREVIEW_CHARS` characters of `content`, with "..." when cut.
pub fn preview(content: &str) -> String {
    let mut chars = content.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

/// Build the messages array for a scoring request.
///
/// The user message carries the query and the documents numbered from 1 in
/// input order; each document is previewed.
pub fn build_rerank_messages(query: &str, documents: &[&str]) -> serde_json::Value {
    let mut user_content = format!("Query: {}\n\nDocuments:", query);
    for (i, text) in documents.iter().enumerate() {
        user_content.push_str(&format!("\n{}. {}", i + 1, preview(text)));
    }

    serde_json::json!([
        {"role": "system", "content": SYSTEM_PROMPT},
        {"role": "user", "content": user_content}
    ])
}
