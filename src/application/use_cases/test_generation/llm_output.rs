use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

static FENCED_JSON_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").unwrap());

pub(crate) type JsonObject = Map<String, Value>;

/// Finds the JSON object in a model response.
///
/// Tries, in order: a fenced code block, the first balanced `{...}` span that
/// parses as an object (then the widest first-`{` to last-`}` span), and the
/// whole text. Chat-completion
/// envelopes are unwrapped to their message content.
pub(crate) fn extract_json_object(output: &str) -> Option<JsonObject> {
    extract(output, true)
}

fn extract(output: &str, unwrap_envelope: bool) -> Option<JsonObject> {
    let trimmed = output.trim();
    let object = fenced_object(trimmed)
        .or_else(|| balanced_object(trimmed))
        .or_else(|| greedy_span(trimmed).and_then(parse_object))
        .or_else(|| parse_object(trimmed))?;

    if unwrap_envelope {
        if let Some(content) = envelope_content(&object) {
            return extract(content, false).or(Some(object));
        }
    }
    Some(object)
}

fn parse_object(candidate: &str) -> Option<JsonObject> {
    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(object)) => Some(object),
        _ => None,
    }
}

fn fenced_object(text: &str) -> Option<JsonObject> {
    FENCED_JSON_PATTERN
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .find_map(|m| parse_object(m.as_str()))
}

/// Prose ahead of the answer may hold braces of its own (`{email}`), so every
/// `{` is tried as a start until one yields an object.
fn balanced_object(text: &str) -> Option<JsonObject> {
    text.match_indices('{')
        .filter_map(|(start, _)| balanced_span(text, start))
        .find_map(parse_object)
}

/// `{` at `start` through its matching `}`, ignoring braces inside JSON strings.
fn balanced_span(text: &str, start: usize) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

fn greedy_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn envelope_content(object: &JsonObject) -> Option<&str> {
    object
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(|content| content.as_str())
}
