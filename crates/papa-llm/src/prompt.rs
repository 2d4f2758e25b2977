//! Prompt construction and response normalization.

use papa_core::LlmConfig;

/// Instructions sent as the system message unless overridden.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You translate questions about an event database into SQL.\n\
Answer with exactly one PostgreSQL SELECT statement and nothing else: no prose, no markdown.\n\
Never write statements that modify data or schema.";

/// The system message for `config`, with the schema hint appended when present.
pub fn system_prompt(config: &LlmConfig) -> String {
    let base = config
        .system_prompt
        .as_deref()
        .unwrap_or(DEFAULT_SYSTEM_PROMPT);
    match config.schema_hint.as_deref().map(str::trim) {
        Some(hint) if !hint.is_empty() => format!("{base}\n\nDatabase schema:\n{hint}"),
        _ => base.to_string(),
    }
}

/// Pull the SQL out of a model answer.
///
/// Uses the first fenced code block if there is one, otherwise the whole text.
/// Trailing semicolons are dropped. Returns `None` when nothing is left.
pub fn extract_sql(content: &str) -> Option<String> {
    let body = fenced_block(content).unwrap_or(content);
    let sql = body.trim().trim_end_matches(';').trim_end();
    (!sql.is_empty()).then(|| sql.to_string())
}

fn fenced_block(content: &str) -> Option<&str> {
    let start = content.find("```")? + 3;
    let rest = &content[start..];
    // Skip an info string such as `sql`.
    let rest = match rest.split_once('\n') {
        Some((info, body)) if info.trim().chars().all(|c| c.is_ascii_alphanumeric()) => body,
        _ => rest,
    };
    Some(match rest.find("```") {
        Some(end) => &rest[..end],
        None => rest,
    })
}
