//! Build upstream Chat Completions requests from frontend requests.

use super::frontend_types::{ChatRequest, StructuredRequest};
use super::openai_types::{ChatCompletionRequest, ChatMessage, JsonSchemaSpec, ResponseFormat};
use crate::error::{RelayError, Result};

/// System instruction sent ahead of every structured-output prompt.
pub const STRUCTURED_SYSTEM_PROMPT: &str =
    "You are a helpful assistant. Always respond with valid JSON only. \
     No explanations, no markdown, just pure JSON.";

/// Name attached to caller-supplied schemas in `json_schema` mode.
pub const SCHEMA_NAME: &str = "response";

/// Wrap a chat message as the single user turn of a completion request.
pub fn build_chat_payload(req: &ChatRequest, model: &str) -> Result<ChatCompletionRequest> {
    if req.message.trim().is_empty() {
        return Err(RelayError::validation("'message' must be a non-empty string"));
    }

    Ok(ChatCompletionRequest {
        model: model.to_string(),
        messages: vec![ChatMessage::user(req.message.clone())],
        response_format: None,
    })
}

/// Build a JSON-mode completion request. A schema, when given, is embedded
/// unchanged; otherwise free-form JSON is requested.
pub fn build_structured_payload(
    req: &StructuredRequest,
    model: &str,
) -> Result<ChatCompletionRequest> {
    if req.prompt.trim().is_empty() {
        return Err(RelayError::validation("'prompt' must be a non-empty string"));
    }

    let response_format = match req.schema {
        None | Some(serde_json::Value::Null) => ResponseFormat::JsonObject,
        Some(ref schema) if schema.is_object() => ResponseFormat::JsonSchema {
            json_schema: JsonSchemaSpec {
                name: SCHEMA_NAME.to_string(),
                schema: schema.clone(),
            },
        },
        Some(_) => return Err(RelayError::validation("'schema' must be a JSON object")),
    };

    let mut prompt = req.prompt.clone();
    if let Some(data) = req.data.as_deref().filter(|d| !d.trim().is_empty()) {
        prompt.push_str("\n\nData to process:\n");
        prompt.push_str(data);
    }

    Ok(ChatCompletionRequest {
        model: model.to_string(),
        messages: vec![
            ChatMessage::system(STRUCTURED_SYSTEM_PROMPT),
            ChatMessage::user(prompt),
        ],
        response_format: Some(response_format),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const MODEL: &str = "gemini/gemini-flash-lite-latest";

    fn structured(prompt: &str, schema: Option<serde_json::Value>) -> StructuredRequest {
        StructuredRequest {
            prompt: prompt.to_string(),
            schema,
            data: None,
        }
    }

    #[test]
    fn test_chat_payload_has_single_user_message() {
        let req = ChatRequest {
            message: "Hello".to_string(),
        };
        let payload = build_chat_payload(&req, MODEL).unwrap();

        assert_eq!(payload.model, MODEL);
        assert_eq!(payload.messages, vec![ChatMessage::user("Hello")]);
        assert!(payload.response_format.is_none());
    }

    #[test]
    fn test_chat_payload_omits_response_format_on_wire() {
        let req = ChatRequest {
            message: "Hello".to_string(),
        };
        let wire = serde_json::to_value(build_chat_payload(&req, MODEL).unwrap()).unwrap();
        assert!(wire.get("response_format").is_none());
        assert_eq!(wire["messages"][0]["role"], "user");
    }

    #[test]
    fn test_empty_message_is_rejected() {
        for message in ["", "   \n"] {
            let req = ChatRequest {
                message: message.to_string(),
            };
            let err = build_chat_payload(&req, MODEL).unwrap_err();
            assert_eq!(err.code(), "validation_error");
        }
    }

    #[test]
    fn test_structured_payload_embeds_schema_unchanged() {
        let schema = json!({
            "type": "object",
            "properties": {"colors": {"type": "array", "items": {"type": "string"}}},
            "required": ["colors"]
        });
        let payload = build_structured_payload(&structured("List colors", Some(schema.clone())), MODEL)
            .unwrap();

        let wire = serde_json::to_value(&payload).unwrap();
        assert_eq!(wire["response_format"]["type"], "json_schema");
        assert_eq!(wire["response_format"]["json_schema"]["name"], SCHEMA_NAME);
        assert_eq!(wire["response_format"]["json_schema"]["schema"], schema);
    }

    #[test]
    fn test_structured_payload_without_schema_requests_json_object() {
        for schema in [None, Some(serde_json::Value::Null)] {
            let payload =
                build_structured_payload(&structured("List 2 colors", schema), MODEL).unwrap();
            let wire = serde_json::to_value(&payload).unwrap();
            assert_eq!(wire["response_format"], json!({"type": "json_object"}));
        }
    }

    #[test]
    fn test_structured_payload_has_single_user_turn() {
        let payload = build_structured_payload(&structured("List 2 colors", None), MODEL).unwrap();
        let users: Vec<_> = payload
            .messages
            .iter()
            .filter(|m| m.role == "user")
            .collect();

        assert_eq!(users.len(), 1);
        assert_eq!(users[0].content, "List 2 colors");
        assert_eq!(payload.messages[0].role, "system");
    }

    #[test]
    fn test_structured_data_is_appended_to_prompt() {
        let mut req = structured("Extract names", None);
        req.data = Some("Alice met Bob".to_string());
        let payload = build_structured_payload(&req, MODEL).unwrap();

        assert_eq!(
            payload.messages[1].content,
            "Extract names\n\nData to process:\nAlice met Bob"
        );
    }

    #[test]
    fn test_structured_rejects_bad_input() {
        let err = build_structured_payload(&structured("", None), MODEL).unwrap_err();
        assert_eq!(err.code(), "validation_error");

        let err =
            build_structured_payload(&structured("List", Some(json!(["not", "an", "object"]))), MODEL)
                .unwrap_err();
        assert_eq!(err.code(), "validation_error");

        let err = build_structured_payload(&structured("List", Some(json!("string"))), MODEL)
            .unwrap_err();
        assert_eq!(err.code(), "validation_error");
    }
}
