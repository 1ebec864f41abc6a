#[cfg(test)]
#[allow(clippy::module_inception)]
mod tests {
    use super::super::openai::*;
    use serde_json::json;

    #[test]
    fn test_user_message_serialization() {
        let message = WireMessage::user("Hello");

        let json = serde_json::to_string(&message).unwrap();
        assert!(json.contains("\"role\":\"user\""));
        assert!(json.contains("\"content\":\"Hello\""));
        assert!(!json.contains("tool_calls"));
        assert!(!json.contains("tool_call_id"));
    }

    #[test]
    fn test_tool_message_carries_call_id() {
        let message = WireMessage::tool("call_7", "list_events", "[]".to_string());
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["role"], "tool");
        assert_eq!(value["tool_call_id"], "call_7");
        assert_eq!(value["name"], "list_events");
    }

    #[test]
    fn test_assistant_without_tool_calls_omits_field() {
        let message = WireMessage::assistant(Some("hi".to_string()), vec![]);
        let value = serde_json::to_value(&message).unwrap();
        assert!(value.get("tool_calls").is_none());
    }

    #[test]
    fn test_request_omits_empty_tools() {
        let request = ChatCompletionRequest {
            model: "gemini-2.0-flash".to_string(),
            messages: vec![WireMessage::system("be brief")],
            tools: vec![],
            tool_choice: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("tools").is_none());
        assert!(value.get("tool_choice").is_none());
    }

    #[test]
    fn test_tool_definition_shape() {
        let tool = Tool::function(
            "list_sport_types",
            "List sport types",
            json!({"type": "object", "properties": {}}),
        );
        let value = serde_json::to_value(&tool).unwrap();
        assert_eq!(value["type"], "function");
        assert_eq!(value["function"]["name"], "list_sport_types");
    }

    #[test]
    fn test_response_with_tool_calls_deserialization() {
        let body = json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1700000000,
            "model": "gemini-2.0-flash",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "list_events", "arguments": "{\"event_type_ids\":[1]}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        });

        let response: ChatCompletionResponse = serde_json::from_value(body).unwrap();
        let message = &response.choices[0].message;
        assert_eq!(message.content, None);
        let calls = message.tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].function.name, "list_events");
        assert!(response.usage.is_none());
    }

    #[test]
    fn test_tool_call_type_defaults_to_function() {
        let call: ToolCall = serde_json::from_value(json!({
            "id": "c",
            "function": {"name": "x", "arguments": "{}"}
        }))
        .unwrap();
        assert_eq!(call.tool_type, "function");
    }
}
