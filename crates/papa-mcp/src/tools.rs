//! Tool registry for MCP tools.
//!
//! The tool set is fixed: discovery always lists the same two descriptors in
//! the same order.

use crate::protocol::ToolDefinition;
use serde_json::{Value, json};

pub const GET_AGENT_OUTPUT: &str = "get_agent_output";
pub const GET_EVENT_DATA: &str = "get_event_data";

/// Registry of available MCP tools, in discovery order.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: Vec<ToolDefinition>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    /// Registry holding the built-in tools.
    pub fn new() -> Self {
        Self {
            tools: vec![
                ToolDefinition {
                    name: GET_AGENT_OUTPUT.to_string(),
                    description: "Echo the user's message together with the current time."
                        .to_string(),
                    input_schema: user_message_schema("The message to echo back."),
                },
                ToolDefinition {
                    name: GET_EVENT_DATA.to_string(),
                    description: "Answer a question about events by generating and running \
                                  a read-only SQL query. Returns the matching rows as JSON."
                        .to_string(),
                    input_schema: user_message_schema(
                        "A natural-language question about the event data.",
                    ),
                },
            ],
        }
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.iter().find(|t| t.name == name)
    }

    /// Check if a tool exists.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// List all tools.
    pub fn list(&self) -> &[ToolDefinition] {
        &self.tools
    }

    /// Get the number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Get tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }
}

fn user_message_schema(description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "user_message": {
                "type": "string",
                "description": description
            }
        },
        "required": ["user_message"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_tools_in_order() {
        let registry = ToolRegistry::new();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names(), vec![GET_AGENT_OUTPUT, GET_EVENT_DATA]);
        assert!(registry.contains(GET_EVENT_DATA));
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn test_input_schemas_require_user_message() {
        for tool in ToolRegistry::new().list() {
            let validator = jsonschema::validator_for(&tool.input_schema).unwrap();
            assert!(validator.is_valid(&json!({"user_message": "hi"})));
            assert!(!validator.is_valid(&json!({})), "{} accepted no args", tool.name);
            assert!(!validator.is_valid(&json!({"user_message": 42})));
        }
    }
}
