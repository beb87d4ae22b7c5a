use std::pin::Pin;

use futures_util::Stream;
use serde_json::Value;

use super::message::ToolOutput;
use super::result::{FinishReason, ProviderMetadata, RequestEcho, Usage, Warning};
use crate::error::LlmError;

/// Canonical event produced while streaming
///
/// A call's sequence starts with `StreamStart` and ends with exactly one
/// `Finish` or `Error`, unless the call is aborted.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// First event, carrying adaptation warnings
    StreamStart {
        /// Adaptation notices
        warnings: Vec<Warning>,
    },
    /// Response identity, synthesized from the first chunk
    ResponseMetadata {
        /// Response identifier, generated when the backend sends none
        id: String,
        /// Model that produced the response
        model_id: Option<String>,
        /// Creation time
        timestamp: Option<jiff::Timestamp>,
    },
    /// Text block opened
    TextStart {
        /// Block identifier
        id: String,
    },
    /// Text appended to the open block
    TextDelta {
        /// Block identifier
        id: String,
        /// Text fragment
        delta: String,
    },
    /// Text block closed
    TextEnd {
        /// Block identifier
        id: String,
    },
    /// Reasoning block opened
    ReasoningStart {
        /// Block identifier
        id: String,
    },
    /// Reasoning appended to the open block
    ReasoningDelta {
        /// Block identifier
        id: String,
        /// Reasoning fragment
        delta: String,
    },
    /// Reasoning block closed
    ReasoningEnd {
        /// Block identifier
        id: String,
    },
    /// Tool call arguments begin streaming
    ToolInputStart {
        /// Tool call identifier
        id: String,
        /// Tool name
        tool_name: String,
    },
    /// Fragment of serialized tool arguments
    ToolInputDelta {
        /// Tool call identifier
        id: String,
        /// Argument fragment
        delta: String,
    },
    /// Tool call arguments complete
    ToolInputEnd {
        /// Tool call identifier
        id: String,
    },
    /// Fully assembled tool call
    ToolCall {
        /// Tool call identifier
        tool_call_id: String,
        /// Tool name
        tool_name: String,
        /// Parsed arguments, or the raw buffer when not valid JSON
        input: Value,
    },
    /// Result of a tool the backend executed
    ToolResult {
        /// Tool call identifier
        tool_call_id: String,
        /// Tool name
        tool_name: String,
        /// Tool output
        output: ToolOutput,
    },
    /// Terminal success event
    Finish {
        /// Why generation stopped
        finish_reason: FinishReason,
        /// Accumulated token usage
        usage: Usage,
        /// Backend-specific details
        provider_metadata: ProviderMetadata,
    },
    /// Terminal failure event
    Error {
        /// Classified failure
        error: LlmError,
    },
    /// Unmodified backend chunk, only when requested
    Raw {
        /// Chunk as received
        raw_value: Value,
    },
}

impl StreamEvent {
    /// Whether this event ends the sequence
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Finish { .. } | Self::Error { .. })
    }

    /// Event name in kebab-case
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::StreamStart { .. } => "stream-start",
            Self::ResponseMetadata { .. } => "response-metadata",
            Self::TextStart { .. } => "text-start",
            Self::TextDelta { .. } => "text-delta",
            Self::TextEnd { .. } => "text-end",
            Self::ReasoningStart { .. } => "reasoning-start",
            Self::ReasoningDelta { .. } => "reasoning-delta",
            Self::ReasoningEnd { .. } => "reasoning-end",
            Self::ToolInputStart { .. } => "tool-input-start",
            Self::ToolInputDelta { .. } => "tool-input-delta",
            Self::ToolInputEnd { .. } => "tool-input-end",
            Self::ToolCall { .. } => "tool-call",
            Self::ToolResult { .. } => "tool-result",
            Self::Finish { .. } => "finish",
            Self::Error { .. } => "error",
            Self::Raw { .. } => "raw",
        }
    }
}

/// Ordered canonical event stream
pub type EventStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

/// Handle returned by a streaming call
pub struct StreamResult {
    /// Canonical events
    pub events: EventStream,
    /// Redacted request echo
    pub request: RequestEcho,
}

impl std::fmt::Debug for StreamResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamResult").field("request", &self.request).finish_non_exhaustive()
    }
}
