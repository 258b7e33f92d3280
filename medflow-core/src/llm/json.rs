//! JSON extraction from model text

use regex::Regex;
use std::sync::LazyLock;

/// Extract the first JSON object from model output.
///
/// Handles bare JSON, fenced code blocks, and an object embedded in prose.
pub fn extract_json(input: &str) -> Option<String> {
    let unfenced = strip_code_fences(input);
    let trimmed = unfenced.trim();
    if trimmed.starts_with('{') && serde_json::from_str::<serde_json::Value>(trimmed).is_ok() {
        return Some(trimmed.to_string());
    }
    balanced_object(trimmed)
}

fn strip_code_fences(input: &str) -> String {
    static CODE_FENCE_RE: LazyLock<Option<Regex>> =
        LazyLock::new(|| Regex::new(r"```(?:json|JSON)?\s*\n?([\s\S]*?)\n?```").ok());

    if let Some(re) = CODE_FENCE_RE.as_ref() {
        if let Some(content) = re.captures(input).and_then(|caps| caps.get(1)) {
            return content.as_str().to_string();
        }
    }
    input.to_string()
}

fn balanced_object(input: &str) -> Option<String> {
    let start = input.find('{')?;
    let substring = &input[start..];
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, c) in substring.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match c {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(substring[..=i].to_string());
                }
            }
            _ => {}
        }
    }

    None
}
