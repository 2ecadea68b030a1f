use once_cell::sync::Lazy;
use regex::Regex;

static THINK_TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<think>[\s\S]*?</think>|<think\s*/>").unwrap());

static REASONING_TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<reasoning>[\s\S]*?</reasoning>").unwrap());

static INTERNAL_TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<internal>[\s\S]*?</internal>").unwrap());

const DANGLING_THINK_CLOSE: &str = "</think>";

/// Removes reasoning blocks that some models emit ahead of the answer.
///
/// Whitespace inside the answer is left alone: Gherkin and code blocks depend on it.
pub fn strip_reasoning(response: &str) -> String {
    let mut cleaned = THINK_TAG_PATTERN.replace_all(response, "").into_owned();
    cleaned = REASONING_TAG_PATTERN.replace_all(&cleaned, "").into_owned();
    cleaned = INTERNAL_TAG_PATTERN.replace_all(&cleaned, "").into_owned();

    // Opening tag swallowed by the chat template, only the close survives.
    // Output that already opens with the answer has no leading reasoning.
    let opens_with_answer = {
        let head = cleaned.trim_start();
        head.starts_with('{') || head.starts_with("```") || head.starts_with("Feature:")
    };
    if !opens_with_answer {
        if let Some(idx) = cleaned.find(DANGLING_THINK_CLOSE) {
            cleaned = cleaned[idx + DANGLING_THINK_CLOSE.len()..].to_string();
        }
    }
    cleaned.trim().to_string()
}
