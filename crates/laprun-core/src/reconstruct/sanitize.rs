//! Strips tool-call residue from agent messages.
//!
//! Agents in the upstream simulation sometimes echo their tool invocations
//! into chat, either as a fenced JSON block or as a bare JSON object at the
//! end of the message. Only blocks that look like tool calls are removed;
//! ordinary prose and ordinary code fences are left alone.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[ \t]*([A-Za-z_\-]*)[ \t]*\n?(.*?)```").expect("fence pattern is valid")
});

static EXCESS_BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("blank-line pattern is valid"));

const TOOL_FENCE_LANGS: &[&str] = &["tool_call", "tool_code", "tool", "function_call"];
const TOOL_KEYS: &[&str] = &["tool", "tool_name", "tool_call", "tool_calls", "function", "function_call", "action"];
const ARGUMENT_KEYS: &[&str] = &["arguments", "args", "parameters", "input"];

/// Returns true when a JSON value looks like a tool invocation.
fn is_tool_call(value: &Value) -> bool {
    match value {
        Value::Object(map) => {
            TOOL_KEYS.iter().any(|key| map.contains_key(*key))
                || (map.contains_key("name") && ARGUMENT_KEYS.iter().any(|key| map.contains_key(*key)))
        }
        Value::Array(items) => !items.is_empty() && items.iter().all(is_tool_call),
        _ => false,
    }
}

fn strip_fenced_tool_calls(text: &str) -> String {
    FENCED_BLOCK
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let lang = caps.get(1).map_or("", |m| m.as_str()).to_ascii_lowercase();
            let body = caps.get(2).map_or("", |m| m.as_str()).trim();
            let tool_fence = TOOL_FENCE_LANGS.contains(&lang.as_str());
            let tool_body = serde_json::from_str::<Value>(body).is_ok_and(|v| is_tool_call(&v));
            if tool_fence || tool_body {
                String::new()
            } else {
                caps[0].to_string()
            }
        })
        .into_owned()
}

/// Removes a bare tool-call object that runs to the end of the text.
fn strip_trailing_tool_call(text: &str) -> &str {
    let trimmed = text.trim_end();
    if !trimmed.ends_with('}') {
        return text;
    }
    // Left-to-right so the outermost object wins over nested ones.
    for (index, _) in trimmed.match_indices('{') {
        let candidate = &trimmed[index..];
        if let Ok(value) = serde_json::from_str::<Value>(candidate) {
            if value.is_object() && is_tool_call(&value) {
                return &trimmed[..index];
            }
            return text;
        }
    }
    text
}

/// Cleans one agent message for display.
pub fn sanitize_message(raw: &str) -> String {
    let without_fences = strip_fenced_tool_calls(raw);
    let without_trailing = strip_trailing_tool_call(&without_fences);
    EXCESS_BLANK_LINES
        .replace_all(without_trailing.trim(), "\n\n")
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_untouched() {
        let text = "I'll go forward {carefully} this time.";
        assert_eq!(sanitize_message(text), text);
    }

    #[test]
    fn test_strips_fenced_tool_call() {
        let text = "Moving ahead.\n```json\n{\"tool\": \"move\", \"arguments\": {\"dir\": 1}}\n```\nSee you.";
        assert_eq!(sanitize_message(text), "Moving ahead.\n\nSee you.");
    }

    #[test]
    fn test_keeps_ordinary_code_fence() {
        let text = "Here is my plan:\n```\nstep 1: run\n```";
        assert_eq!(sanitize_message(text), text);
    }

    #[test]
    fn test_keeps_fenced_data_that_is_not_a_tool_call() {
        let text = "Scores ```json\n{\"alice\": 3}\n```";
        assert_eq!(sanitize_message(text), text);
    }

    #[test]
    fn test_strips_tool_fence_by_language() {
        let text = "ok ```tool_call\nmove(3)\n```";
        assert_eq!(sanitize_message(text), "ok");
    }

    #[test]
    fn test_strips_trailing_tool_object() {
        let text = "Backing off now. {\"name\": \"move\", \"arguments\": {\"direction\": \"backward\"}}";
        assert_eq!(sanitize_message(text), "Backing off now.");
    }

    #[test]
    fn test_keeps_trailing_non_tool_object() {
        let text = "My stats: {\"hp\": 3}";
        assert_eq!(sanitize_message(text), text);
    }

    #[test]
    fn test_message_that_is_only_a_tool_call() {
        assert_eq!(sanitize_message("{\"action\": \"roll\"}"), "");
    }
}
