//! Tool schema validity tests.
//!
//! Every MCP tool must carry a name, a description and an object input
//! schema whose properties use the same camelCase names as the callable
//! request body.

use serde_json::Value;

/// Validates that a JSON schema has the required structure.
fn validate_json_schema(schema: &Value) -> Result<(), String> {
    let obj = schema
        .as_object()
        .ok_or_else(|| "Schema must be an object".to_string())?;

    if let Some(type_val) = obj.get("type") {
        if type_val != "object" {
            return Err(format!("Expected type 'object', got {:?}", type_val));
        }
    }

    match obj.get("properties") {
        Some(properties) if properties.is_object() => Ok(()),
        Some(_) => Err("Properties must be an object".to_string()),
        None => Err("Schema must declare properties".to_string()),
    }
}

/// Validates that a tool has required fields.
fn validate_tool(tool: &rmcp::model::Tool) -> Result<(), String> {
    if tool.name.is_empty() {
        return Err("Tool name cannot be empty".to_string());
    }

    if tool.description.as_deref().is_none_or(str::is_empty) {
        return Err(format!("Tool '{}' must have a description", tool.name));
    }

    let schema_value = serde_json::to_value(&*tool.input_schema)
        .map_err(|e| format!("Failed to serialize schema: {}", e))?;
    validate_json_schema(&schema_value)
}

fn all_tools() -> Vec<rmcp::model::Tool> {
    let mut tools = lesson_helper_tutor::TutorServer::tools();
    tools.extend(lesson_helper_speech::SpeechServer::tools());
    tools
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;
    use std::sync::Arc;

    #[test]
    fn test_json_schema_validation() {
        let valid_schema = serde_json::json!({
            "type": "object",
            "properties": {"text": {"type": "string"}}
        });
        assert!(validate_json_schema(&valid_schema).is_ok());

        let wrong_type = serde_json::json!({"type": "string"});
        assert!(validate_json_schema(&wrong_type).is_err());

        let no_properties = serde_json::json!({"type": "object"});
        assert!(validate_json_schema(&no_properties).is_err());
    }

    #[test]
    fn test_tool_validation_rejects_missing_description() {
        let tool = rmcp::model::Tool {
            name: Cow::Borrowed("test_tool"),
            description: None,
            input_schema: Arc::new(serde_json::Map::new()),
            annotations: None,
            icons: None,
            meta: None,
            output_schema: None,
            title: None,
        };
        assert!(validate_tool(&tool).is_err());
    }

    #[test]
    fn test_every_tool_is_valid() {
        let tools = all_tools();
        assert_eq!(tools.len(), 2);

        for tool in &tools {
            let result = validate_tool(tool);
            assert!(result.is_ok(), "Tool {} should be valid: {:?}", tool.name, result.err());
        }
    }

    #[test]
    fn test_tool_names_are_unique() {
        let tools = all_tools();
        let names: Vec<&str> = tools.iter().map(|t| t.name.as_ref()).collect();
        assert_eq!(names, vec!["ask_the_tutor", "synthesize_speech"]);
    }

    #[test]
    fn test_tutor_schema_uses_wire_names() {
        let tools = lesson_helper_tutor::TutorServer::tools();
        let properties = tools[0].input_schema["properties"].as_object().unwrap();

        assert!(properties.contains_key("lessonContext"));
        assert!(properties.contains_key("userQuestion"));
        assert!(!properties.contains_key("lesson_context"));
    }

    #[test]
    fn test_speech_schema_uses_wire_names() {
        let tools = lesson_helper_speech::SpeechServer::tools();
        let properties = tools[0].input_schema["properties"].as_object().unwrap();

        assert_eq!(properties.len(), 1);
        assert!(properties.contains_key("text"));
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Tool input accepted by the schema's property names always deserializes.
        #[test]
        fn tutor_tool_arguments_deserialize(
            context in "\\PC{0,80}",
            question in "\\PC{0,80}",
        ) {
            let args = serde_json::json!({"lessonContext": context, "userQuestion": question});
            let request: lesson_helper_tutor::TutorRequest = serde_json::from_value(args).unwrap();

            prop_assert_eq!(request.lesson_context.as_deref(), Some(context.as_str()));
            prop_assert_eq!(request.user_question.as_deref(), Some(question.as_str()));
        }

        #[test]
        fn speech_tool_arguments_deserialize(text in "\\PC{0,80}") {
            let args = serde_json::json!({"text": text});
            let request: lesson_helper_speech::SpeechRequest = serde_json::from_value(args).unwrap();

            prop_assert_eq!(request.text.as_deref(), Some(text.as_str()));
        }
    }
}
