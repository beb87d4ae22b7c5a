use http::{HeaderMap, StatusCode};
use serde::Serialize;
use strum::Display;
use tandem_config::Api;
use thiserror::Error;

use crate::types::{Message, ToolDefinition};

/// Longest response body kept in diagnostics, in characters
pub const MAX_BODY_CHARS: usize = 2000;

/// Errors surfaced to callers of this crate
#[derive(Debug, Clone, Error)]
pub enum LlmError {
    /// Classified backend, transport, or conversion failure
    #[error(transparent)]
    Unified(#[from] UnifiedError),

    /// Feature requested that only the other backend supports
    #[error("'{feature}' is not supported by the {api} API; it requires the {suggested_api} API")]
    UnsupportedFeature {
        /// Feature name
        feature: String,
        /// Backend resolved for the call
        api: Api,
        /// Backend that supports the feature
        suggested_api: Api,
    },

    /// Per-call API override would discard a model-level feature
    #[error(
        "cannot switch from the {from_api} API to the {to_api} API: '{feature}' is configured for {from_api} on the model"
    )]
    ApiSwitch {
        /// API configured on the model
        from_api: Api,
        /// API requested for the call
        to_api: Api,
        /// Model-level feature that would be lost
        feature: String,
    },

    /// Embedding call exceeds the per-call value limit
    #[error("too many values for one embedding call: {count} (max {max})")]
    TooManyEmbeddingValues {
        /// Maximum accepted values
        max: usize,
        /// Values supplied
        count: usize,
    },

    /// Caller cancelled the call
    #[error("call aborted")]
    Aborted,
}

impl LlmError {
    /// Whether a caller-side retry may succeed
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Unified(e) => e.retryable,
            _ => false,
        }
    }

    /// Classified error, if this is one
    pub const fn as_unified(&self) -> Option<&UnifiedError> {
        match self {
            Self::Unified(e) => Some(e),
            _ => None,
        }
    }
}

/// Category of a classified failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
pub enum ErrorKind {
    /// Throttling, overload, timeouts, and dropped connections
    RateLimitOrTransient,
    /// Credentials, permissions, or local configuration
    AuthenticationOrConfig,
    /// Unknown model or deployment
    ModelOrDeploymentNotFound,
    /// Anything else
    Generic,
}

/// Failure in the closed taxonomy exposed to callers
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct UnifiedError {
    /// Category
    pub kind: ErrorKind,
    /// Human-readable description
    pub message: String,
    /// Whether a caller-side retry may succeed
    pub retryable: bool,
    /// HTTP-style status when known
    pub status: Option<StatusCode>,
    /// Model the failure concerns
    pub model_id: Option<String>,
    /// Context for debugging; never contains prompt content
    pub diagnostics: Option<Box<Diagnostics>>,
}

impl UnifiedError {
    /// Non-retryable error of `kind`
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable: false,
            status: None,
            model_id: None,
            diagnostics: None,
        }
    }

    /// Local configuration problem detected before any network call
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AuthenticationOrConfig, message)
    }

    /// Set the retry hint
    #[must_use]
    pub fn retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    /// Attach a status
    #[must_use]
    pub fn with_status(mut self, status: Option<StatusCode>) -> Self {
        self.status = status;
        self
    }

    /// Attach the model identifier
    #[must_use]
    pub fn with_model(mut self, model_id: Option<String>) -> Self {
        self.model_id = model_id;
        self
    }

    /// Attach diagnostics
    #[must_use]
    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = Some(Box::new(diagnostics));
        self
    }
}

/// Debugging context captured at classification time
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    /// Operation that failed (`generate`, `stream`, `embed`)
    pub operation: &'static str,
    /// Request URL when the transport reported one
    pub url: Option<String>,
    /// Response body, truncated to [`MAX_BODY_CHARS`]
    pub response_body: Option<String>,
    /// Response headers
    pub headers: Option<HeaderMap>,
    /// Shape of the request
    pub request_summary: Option<RequestSummary>,
}

/// Redacted shape of a request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RequestSummary {
    /// Number of prompt messages
    pub message_count: usize,
    /// Number of tool definitions
    pub tool_count: usize,
    /// Whether any message carries an image
    pub has_image_parts: bool,
}

impl RequestSummary {
    /// Summarize a prompt and its tools
    pub fn of(messages: &[Message], tools: &[ToolDefinition]) -> Self {
        Self {
            message_count: messages.len(),
            tool_count: tools.len(),
            has_image_parts: messages.iter().any(Message::has_image),
        }
    }
}

/// Cut `body` to at most [`MAX_BODY_CHARS`] characters
pub fn truncate_body(body: &str) -> String {
    match body.char_indices().nth(MAX_BODY_CHARS) {
        Some((cut, _)) => body[..cut].to_owned(),
        None => body.to_owned(),
    }
}
