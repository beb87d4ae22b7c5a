//! Orchestration service wire format
//!
//! The model call sits inside `config.modules.prompt_templating`; optional
//! filtering, masking, grounding and translation modules wrap it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::chat::{ChatCompletion, ChatCompletionChunk, ChatMessage, ChatTool};
use super::embedding::{EmbeddingItem, EmbeddingUsage};
use crate::types::TemplateRef;

// -- Completion request --

/// Orchestration completion request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestrationRequest {
    /// Module pipeline configuration
    pub config: OrchestrationConfig,
    /// Values for template placeholders
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder_values: Option<BTreeMap<String, String>>,
    /// Conversation preceding a referenced template
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages_history: Option<Vec<ChatMessage>>,
}

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestrationConfig {
    /// Enabled modules
    pub modules: ModuleConfig,
    /// Streaming switch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<StreamConfig>,
}

/// Modules applied around the model call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleConfig {
    /// Template and model
    pub prompt_templating: PromptTemplating,
    /// Content filtering
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filtering: Option<Value>,
    /// Data masking
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub masking: Option<Value>,
    /// Document grounding
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grounding: Option<Value>,
    /// Input/output translation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<Value>,
}

/// Prompt and model selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptTemplating {
    /// Inline template or stored template reference
    pub prompt: Prompt,
    /// Model to call
    pub model: ModelSpec,
}

/// Prompt source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Prompt {
    /// Inline message template
    Template {
        /// Templated messages
        template: Vec<ChatMessage>,
        /// Tool definitions
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tools: Option<Vec<ChatTool>>,
        /// Output format
        #[serde(default, skip_serializing_if = "Option::is_none")]
        response_format: Option<Value>,
    },
    /// Template stored on the service
    Reference {
        /// Template reference
        template_ref: TemplateRef,
    },
}

/// Model name, version and parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Model name
    pub name: String,
    /// Model version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Model parameters
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub params: Map<String, Value>,
}

/// Streaming switch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Stream the response
    pub enabled: bool,
}

// -- Completion response --

/// Orchestration completion response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrchestrationResponse {
    /// Service request identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Per-module outputs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intermediate_results: Option<Value>,
    /// Model result after output modules
    #[serde(default)]
    pub final_result: ChatCompletion,
}

/// Orchestration streaming chunk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrchestrationStreamChunk {
    /// Service request identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Per-module outputs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intermediate_results: Option<Value>,
    /// Model delta; absent on module-only chunks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_result: Option<ChatCompletionChunk>,
}

// -- Embeddings --

/// Orchestration embedding request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestrationEmbeddingRequest {
    /// Module configuration
    pub config: EmbeddingConfig,
    /// Texts to embed
    pub input: EmbeddingInput,
}

/// Embedding module configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Enabled modules
    pub modules: EmbeddingModules,
}

/// Modules for an embedding call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingModules {
    /// Embedding model module
    pub embeddings: EmbeddingModule,
}

/// Embedding model selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingModule {
    /// Model to call
    pub model: ModelSpec,
}

/// Embedding input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingInput {
    /// Texts to embed
    pub text: Vec<String>,
    /// Input kind (`text`, `document`, `query`)
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// Orchestration embedding response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrchestrationEmbeddingResponse {
    /// Service request identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Embedding result
    #[serde(default)]
    pub final_result: EmbeddingResult,
}

/// Embedding result body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingResult {
    /// Vectors with their input positions
    #[serde(default)]
    pub data: Vec<EmbeddingItem>,
    /// Token usage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<EmbeddingUsage>,
}
