use serde::{Deserialize, Serialize};
use strum::Display;

/// Role of a message participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    /// System instruction
    System,
    /// User message
    User,
    /// Assistant response
    Assistant,
    /// Tool results fed back to the model
    Tool,
}

/// Message in a canonical prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message author
    pub role: Role,
    /// Ordered content parts
    pub content: Vec<Part>,
}

impl Message {
    /// System message with a single text part
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: vec![Part::text(text)],
        }
    }

    /// User message with a single text part
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![Part::text(text)],
        }
    }

    /// Assistant message with a single text part
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: vec![Part::text(text)],
        }
    }

    /// Whether any part references an image
    pub fn has_image(&self) -> bool {
        self.content.iter().any(|p| matches!(p, Part::Image { .. }))
    }
}

/// Individual part of a canonical message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Part {
    /// Plain text
    Text {
        /// The text string
        text: String,
    },
    /// Image reference by URL or data URI
    Image {
        /// `https://` URL or `data:` URI
        url: String,
        /// IANA media type when known
        #[serde(default, skip_serializing_if = "Option::is_none")]
        media_type: Option<String>,
    },
    /// Non-image file attachment
    File {
        /// `https://` URL or `data:` URI
        url: String,
        /// IANA media type
        media_type: String,
    },
    /// Tool invocation previously requested by the assistant
    ToolCall {
        /// Tool call identifier
        id: String,
        /// Tool name
        name: String,
        /// Arguments as JSON
        input: serde_json::Value,
    },
    /// Result of a tool invocation
    ToolResult {
        /// Identifier of the tool call this answers
        id: String,
        /// Tool name
        name: String,
        /// Tool output
        output: ToolOutput,
    },
    /// Model reasoning from a previous turn
    Reasoning {
        /// Reasoning text
        text: String,
    },
}

impl Part {
    /// Text part
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Tag name used in diagnostics
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Image { .. } => "image",
            Self::File { .. } => "file",
            Self::ToolCall { .. } => "tool-call",
            Self::ToolResult { .. } => "tool-result",
            Self::Reasoning { .. } => "reasoning",
        }
    }
}

/// Output payload of a tool result part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "kebab-case")]
pub enum ToolOutput {
    /// Plain text output
    Text(String),
    /// Structured output, sent to the backend serialized
    Json(serde_json::Value),
    /// Tool failed with this message
    ErrorText(String),
}

impl ToolOutput {
    /// Render the output as the string a backend tool message carries
    pub fn render(&self) -> String {
        match self {
            Self::Text(text) | Self::ErrorText(text) => text.clone(),
            Self::Json(value) => value.to_string(),
        }
    }
}
