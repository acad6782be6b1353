//! Locating a JSON object inside noisy agent output.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

static FENCED_BLOCK_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)```").unwrap());

/// Narrow the search text to the first fenced code block, if there is one.
fn search_text(text: &str) -> &str {
    let trimmed = text.trim();
    match FENCED_BLOCK_REGEX.captures(trimmed).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str().trim(),
        None => trimmed,
    }
}

fn parse_object(candidate: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Extract the first JSON object from text that may contain other content.
///
/// Starting at the first `{`, every point where the brace depth returns to
/// zero is tried as a candidate; the earliest one that parses as an object
/// wins. If none does, the whole remainder from the first `{` is tried.
/// Braces inside string literals are not special-cased, which the remainder
/// fallback compensates for.
pub fn extract_json_object(text: &str) -> Option<Map<String, Value>> {
    let text = search_text(text);
    if text.is_empty() {
        return None;
    }
    let start = text.find('{')?;
    let from_brace = &text[start..];

    let mut depth: i64 = 0;
    for (i, ch) in from_brace.char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0
                    && let Some(map) = parse_object(&from_brace[..i + 1])
                {
                    return Some(map);
                }
            }
            _ => {}
        }
    }

    parse_object(from_brace)
}

/// Read a string field; any other JSON type counts as absent.
pub(crate) fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Read a field that agents emit either camelCase or snake_case.
///
/// The camelCase key wins whenever it is present and non-null, even if its
/// value turns out not to be a string.
pub(crate) fn aliased_string_field(
    map: &Map<String, Value>,
    camel: &str,
    snake: &str,
) -> Option<String> {
    let value = match map.get(camel) {
        Some(v) if !v.is_null() => Some(v),
        _ => map.get(snake),
    };
    value.and_then(Value::as_str).map(str::to_string)
}
