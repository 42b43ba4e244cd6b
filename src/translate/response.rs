//! Pull the answer out of an upstream Chat Completions response.

use super::openai_types::ChatCompletionResponse;
use crate::error::{RelayError, Result};

/// Content of the first choice. Pure function.
pub fn extract_text(resp: &ChatCompletionResponse) -> Result<String> {
    let choice = resp
        .choices
        .first()
        .ok_or_else(|| RelayError::upstream_shape("response contained no choices"))?;

    choice
        .message
        .as_ref()
        .and_then(|m| m.content.clone())
        .ok_or_else(|| RelayError::upstream_shape("first choice has no message.content"))
}

/// Content of the first choice parsed as JSON.
///
/// Shape problems are reported as `UpstreamShape`; content that is present
/// but not JSON is reported as `Parse`.
pub fn extract_json(resp: &ChatCompletionResponse) -> Result<serde_json::Value> {
    let text = extract_text(resp)?;
    serde_json::from_str(strip_code_fence(&text)).map_err(|e| {
        RelayError::parse(format!(
            "Content is not valid JSON: {e}; content: {}",
            truncate(&text, 300)
        ))
    })
}

/// Remove a surrounding Markdown code fence (```` ```json ```` or ```` ``` ````).
fn strip_code_fence(text: &str) -> &str {
    let mut s = text.trim();
    if let Some(rest) = s.strip_prefix("```json") {
        s = rest;
    } else if let Some(rest) = s.strip_prefix("```") {
        s = rest;
    }
    if let Some(rest) = s.strip_suffix("```") {
        s = rest;
    }
    s.trim()
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(body: serde_json::Value) -> ChatCompletionResponse {
        serde_json::from_value(body).unwrap()
    }

    fn with_content(content: &str) -> ChatCompletionResponse {
        response(json!({"choices": [{"message": {"content": content}}]}))
    }

    #[test]
    fn test_extract_text() {
        assert_eq!(extract_text(&with_content("hi")).unwrap(), "hi");
    }

    #[test]
    fn test_extract_text_uses_first_choice() {
        let resp = response(json!({"choices": [
            {"message": {"content": "first"}},
            {"message": {"content": "second"}}
        ]}));
        assert_eq!(extract_text(&resp).unwrap(), "first");
    }

    #[test]
    fn test_empty_choices_is_shape_error() {
        let err = extract_text(&response(json!({"choices": []}))).unwrap_err();
        assert_eq!(err.code(), "upstream_shape_error");
    }

    #[test]
    fn test_missing_content_is_shape_error() {
        for body in [
            json!({"choices": [{}]}),
            json!({"choices": [{"message": {}}]}),
            json!({"choices": [{"message": {"content": null}}]}),
        ] {
            let err = extract_text(&response(body)).unwrap_err();
            assert_eq!(err.code(), "upstream_shape_error");
        }
    }

    #[test]
    fn test_extract_json() {
        let value = extract_json(&with_content(r#"{"a":1}"#)).unwrap();
        assert_eq!(value, json!({"a": 1}));
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let err = extract_json(&with_content("not json")).unwrap_err();
        assert_eq!(err.code(), "parse_error");

        let detail = err.detail();
        assert!(detail.starts_with("Content is not valid JSON:"), "detail: {detail}");
        assert!(detail.ends_with("content: not json"), "detail: {detail}");
    }

    #[test]
    fn test_extract_json_shape_error_wins_over_parse() {
        let err = extract_json(&response(json!({"choices": []}))).unwrap_err();
        assert_eq!(err.code(), "upstream_shape_error");
    }

    #[test]
    fn test_code_fence_is_stripped() {
        let fenced = "```json\n{\"colors\": [\"red\", \"blue\"]}\n```";
        assert_eq!(
            extract_json(&with_content(fenced)).unwrap(),
            json!({"colors": ["red", "blue"]})
        );
        assert_eq!(extract_json(&with_content("```\n[1, 2]\n```")).unwrap(), json!([1, 2]));
    }
}
