use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};
use tandem_config::Api;

/// Block of generated content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Content {
    /// Generated text
    Text {
        /// The text string
        text: String,
    },
    /// Model reasoning
    Reasoning {
        /// Reasoning text
        text: String,
    },
    /// Tool the model wants to call
    ToolCall {
        /// Tool call identifier
        tool_call_id: String,
        /// Tool name
        tool_name: String,
        /// Parsed arguments, or the raw string when they are not valid JSON
        input: Value,
    },
}

/// Backend-neutral reason generation stopped
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum UnifiedFinishReason {
    /// Natural end or stop sequence
    Stop,
    /// Hit the token limit
    Length,
    /// Output withheld by a content filter
    ContentFilter,
    /// Model decided to call tools
    ToolCalls,
    /// Backend reported an error
    Error,
    /// Anything unrecognized
    #[default]
    Other,
}

/// Finish reason with the backend's raw value preserved
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinishReason {
    /// Unified category
    pub unified: UnifiedFinishReason,
    /// Raw string as sent by the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

/// Prompt-side token counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputTokens {
    /// All prompt tokens
    pub total: Option<u64>,
    /// Prompt tokens not served from cache
    pub no_cache: Option<u64>,
    /// Prompt tokens read from cache
    pub cache_read: Option<u64>,
    /// Prompt tokens written to cache
    pub cache_write: Option<u64>,
}

/// Completion-side token counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputTokens {
    /// All generated tokens
    pub total: Option<u64>,
    /// Generated text tokens
    pub text: Option<u64>,
    /// Generated reasoning tokens
    pub reasoning: Option<u64>,
}

/// Token usage; unreported counters stay `None`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    /// Prompt-side counts
    pub input_tokens: InputTokens,
    /// Completion-side counts
    pub output_tokens: OutputTokens,
    /// Usage object as reported by the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
}

impl Usage {
    /// Input plus output totals, when both are known
    pub fn total_tokens(&self) -> Option<u64> {
        Some(self.input_tokens.total? + self.output_tokens.total?)
    }
}

/// Non-fatal notice about how a call was adapted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Warning {
    /// A requested setting has no effect on the resolved backend
    UnsupportedFeature {
        /// Setting name
        feature: String,
        /// Extra context
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<String>,
    },
    /// A setting was honored in a degraded form
    CompatibilityMode {
        /// Setting name
        feature: String,
        /// Extra context
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<String>,
    },
    /// Free-form notice
    Other {
        /// Notice text
        message: String,
    },
}

impl Warning {
    /// Unsupported-feature warning with details
    pub fn unsupported(feature: impl Into<String>, details: impl Into<String>) -> Self {
        Self::UnsupportedFeature {
            feature: feature.into(),
            details: Some(details.into()),
        }
    }
}

/// Backend-specific details attached to a result or finish event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderMetadata {
    /// Backend that served the call
    pub api: Api,
    /// Backend request identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Backend configuration fingerprint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_fingerprint: Option<String>,
    /// Token log-probabilities
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logprobs: Option<Value>,
}

/// Request body as sent, with message content redacted
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestEcho {
    /// Redacted request body
    pub body: Value,
}

/// Response envelope details
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseEcho {
    /// Response identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Model that produced the response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    /// Creation time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<jiff::Timestamp>,
    /// Response body as received
    pub body: Value,
}

/// Canonical result of a non-streaming call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateResult {
    /// Generated content blocks in order
    pub content: Vec<Content>,
    /// Why generation stopped
    pub finish_reason: FinishReason,
    /// Token usage
    pub usage: Usage,
    /// Backend-specific details
    pub provider_metadata: ProviderMetadata,
    /// Redacted request echo
    pub request: RequestEcho,
    /// Response echo
    pub response: ResponseEcho,
    /// Adaptation notices
    pub warnings: Vec<Warning>,
}

impl GenerateResult {
    /// Concatenated text content
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|c| match c {
                Content::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_requires_both_sides() {
        let mut usage = Usage::default();
        assert_eq!(usage.total_tokens(), None);

        usage.input_tokens.total = Some(5);
        assert_eq!(usage.total_tokens(), None);

        usage.output_tokens.total = Some(2);
        assert_eq!(usage.total_tokens(), Some(7));
    }

    #[test]
    fn unified_reason_renders_kebab_case() {
        assert_eq!(UnifiedFinishReason::ContentFilter.to_string(), "content-filter");
        assert_eq!(UnifiedFinishReason::ToolCalls.to_string(), "tool-calls");
        assert_eq!(
            serde_json::to_value(UnifiedFinishReason::Stop).unwrap(),
            serde_json::json!("stop")
        );
    }

    #[test]
    fn warning_serializes_tagged() {
        let value = serde_json::to_value(Warning::unsupported("topK", "dropped")).unwrap();
        assert_eq!(value["type"], "unsupported-feature");
        assert_eq!(value["feature"], "topK");
    }
}
