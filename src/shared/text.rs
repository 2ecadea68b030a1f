//! Char-boundary-safe string helpers used by the prompt builders and parsers.

/// Hard cut at `max_chars` characters. Never splits a UTF-8 sequence.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Lowercases and replaces everything outside `[a-z0-9_]` with `_`, keeping at most `max_chars`.
pub fn slugify(text: &str, max_chars: usize) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .take(max_chars)
        .collect()
}

/// Splits text into consecutive pieces of `size` characters; the last one may be shorter.
pub fn chunk_text(text: &str, size: usize) -> Vec<String> {
    let size = size.max(1);
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(size)
        .map(|chunk| chunk.iter().collect())
        .collect()
}
