use serde_json::{Value, json};

use crate::protocol::chat::{ChatFunction, ChatTool};
use crate::types::{ResponseFormat, ToolChoice, ToolDefinition};

/// Canonical tool definitions as function tools
pub fn convert_tools(tools: &[ToolDefinition]) -> Vec<ChatTool> {
    tools
        .iter()
        .map(|tool| ChatTool {
            tool_type: "function".to_owned(),
            function: ChatFunction {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: Some(tool.input_schema.clone()),
            },
        })
        .collect()
}

/// Wire value of a tool choice
pub fn tool_choice_value(choice: &ToolChoice) -> Value {
    match choice {
        ToolChoice::Auto => json!("auto"),
        ToolChoice::None => json!("none"),
        ToolChoice::Required => json!("required"),
        ToolChoice::Tool { tool_name } => json!({"type": "function", "function": {"name": tool_name}}),
    }
}

/// Wire value of a response format
pub fn response_format_value(format: &ResponseFormat) -> Value {
    match format {
        ResponseFormat::Text => json!({"type": "text"}),
        ResponseFormat::Json { schema: None, .. } => json!({"type": "json_object"}),
        ResponseFormat::Json {
            schema: Some(schema),
            name,
            description,
        } => {
            let mut spec = json!({
                "name": name.as_deref().unwrap_or("response"),
                "schema": schema,
                "strict": true,
            });
            if let Some(description) = description {
                spec["description"] = json!(description);
            }
            json!({"type": "json_schema", "json_schema": spec})
        }
    }
}
