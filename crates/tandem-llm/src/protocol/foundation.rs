//! Foundation-models wire format
//!
//! OpenAI-compatible chat completions against one deployment, plus the
//! foundation-only extras (`data_sources`, `logprobs`, `logit_bias`, `user`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::chat::{ChatMessage, ChatTool};
use super::embedding::{EmbeddingItem, EmbeddingUsage};

/// Foundation-models completion request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoundationRequest {
    /// Conversation messages
    pub messages: Vec<ChatMessage>,
    /// Model parameters (`max_tokens`, `temperature`, `seed`, `stop`, ...)
    #[serde(flatten)]
    pub params: Map<String, Value>,
    /// Tool definitions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ChatTool>>,
    /// Tool choice configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<Value>,
    /// Output format
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_format: Option<Value>,
    /// Whether to stream the response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    /// Stream options (e.g. `include_usage`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_options: Option<StreamOptions>,
    /// External data sources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_sources: Option<Vec<Value>>,
    /// Return token log-probabilities
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logprobs: Option<bool>,
    /// Alternatives per position
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_logprobs: Option<u32>,
    /// Token bias
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logit_bias: Option<BTreeMap<String, i32>>,
    /// End-user identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

/// Stream options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamOptions {
    /// Include usage statistics in stream
    #[serde(default)]
    pub include_usage: bool,
}

/// Foundation-models embedding request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoundationEmbeddingRequest {
    /// Texts to embed
    pub input: Vec<String>,
    /// Output dimensionality
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<u32>,
    /// Vector encoding
    pub encoding_format: String,
}

/// Foundation-models embedding response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FoundationEmbeddingResponse {
    /// Model used
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Vectors with their input positions
    #[serde(default)]
    pub data: Vec<EmbeddingItem>,
    /// Token usage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<EmbeddingUsage>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn params_flatten_into_body() {
        let mut params = Map::new();
        params.insert("max_tokens".to_owned(), json!(50));
        params.insert("seed".to_owned(), json!(3));
        let request = FoundationRequest {
            messages: vec![],
            params,
            tools: None,
            tool_choice: None,
            response_format: None,
            stream: Some(true),
            stream_options: Some(StreamOptions { include_usage: true }),
            data_sources: None,
            logprobs: None,
            top_logprobs: None,
            logit_bias: None,
            user: None,
        };
        assert_eq!(
            serde_json::to_value(request).unwrap(),
            json!({
                "messages": [],
                "max_tokens": 50,
                "seed": 3,
                "stream": true,
                "stream_options": {"include_usage": true}
            })
        );
    }
}
