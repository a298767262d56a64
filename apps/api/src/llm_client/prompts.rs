// Shared prompt fragments. Each feature that calls the model keeps its own
// prompts.rs alongside it and reuses these.

/// System prompt that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Repository context is cut to this many characters before prompting.
pub const MAX_CONTEXT_CHARS: usize = 30_000;

/// Cuts `text` to at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars_multibyte() {
        assert_eq!(truncate_chars("añoñ", 2), "añ");
        assert_eq!(truncate_chars("short", 100), "short");
    }
}
