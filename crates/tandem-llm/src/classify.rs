//! Failure classification
//!
//! Every failure leaving a call passes through [`classify`] exactly once.
//! The order is fixed: already-classified errors pass through (errors built
//! locally, such as conversion failures, first gain diagnostics); a transport
//! [`ResponseError`] or native [`ErrorEnvelope`] at the root of the chain
//! is mapped by status; an envelope embedded in the message text is parsed;
//! then the phrase [`RULES`] apply; then a `status code NNN` mention; and
//! finally a generic, non-retryable error naming the operation.
//!
//! Phrase rules run before status-code extraction, so a message such as
//! "timeout (status code 400)" is classified as transient.

use std::sync::OnceLock;

use http::StatusCode;
use regex::Regex;
use tandem_config::Api;

use crate::client::ResponseError;
use crate::error::{Diagnostics, ErrorKind, LlmError, RequestSummary, UnifiedError, truncate_body};
use crate::protocol::ErrorEnvelope;

/// Where a failure happened
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// Operation name (`generate`, `stream`, `embed`)
    pub operation: &'static str,
    /// Backend the call targeted
    pub api: Api,
    /// Model the call was for
    pub model_id: Option<String>,
    /// Request URL, when known ahead of the transport
    pub url: Option<String>,
    /// Redacted request shape
    pub summary: Option<RequestSummary>,
}

impl ErrorContext {
    /// Context for `operation` on `model_id`
    pub fn new(operation: &'static str, api: Api, model_id: impl Into<String>) -> Self {
        Self {
            operation,
            api,
            model_id: Some(model_id.into()),
            url: None,
            summary: None,
        }
    }
}

/// Phrase rule applied to the lowercased error message
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    /// Any of these substrings matches
    pub patterns: &'static [&'static str],
    /// Resulting category
    pub kind: ErrorKind,
    /// Retry hint
    pub retryable: bool,
    /// Status attached to the result
    pub status: Option<u16>,
}

/// Phrase rules, first match wins
pub static RULES: &[Rule] = &[
    Rule {
        patterns: &[
            "failed to resolve destination",
            "could not resolve destination",
            "destination not found",
            "unable to fetch destination",
        ],
        kind: ErrorKind::AuthenticationOrConfig,
        retryable: false,
        status: Some(400),
    },
    Rule {
        patterns: &[
            "deployment not found",
            "failed to resolve deployment",
            "could not resolve deployment",
            "no deployment",
        ],
        kind: ErrorKind::ModelOrDeploymentNotFound,
        retryable: false,
        status: Some(404),
    },
    Rule {
        patterns: &[
            "unauthorized",
            "authentication",
            "invalid api key",
            "invalid token",
            "access denied",
            "forbidden",
            "credentials",
        ],
        kind: ErrorKind::AuthenticationOrConfig,
        retryable: false,
        status: Some(401),
    },
    Rule {
        patterns: &["content filter", "content_filter", "content management policy"],
        kind: ErrorKind::Generic,
        retryable: false,
        status: Some(400),
    },
    Rule {
        patterns: &["rate limit", "too many requests", "quota exceeded"],
        kind: ErrorKind::RateLimitOrTransient,
        retryable: true,
        status: Some(429),
    },
    Rule {
        patterns: &["timed out", "timeout", "deadline exceeded"],
        kind: ErrorKind::RateLimitOrTransient,
        retryable: true,
        status: Some(408),
    },
    Rule {
        patterns: &[
            "econnreset",
            "econnrefused",
            "enotfound",
            "connection reset",
            "connection refused",
            "connection closed",
            "network error",
            "socket hang up",
            "broken pipe",
        ],
        kind: ErrorKind::RateLimitOrTransient,
        retryable: true,
        status: Some(503),
    },
    Rule {
        patterns: &[
            "stream interrupted",
            "unexpected end of stream",
            "stream closed",
            "premature close",
        ],
        kind: ErrorKind::RateLimitOrTransient,
        retryable: true,
        status: None,
    },
    Rule {
        patterns: &["malformed", "invalid json", "failed to parse"],
        kind: ErrorKind::Generic,
        retryable: false,
        status: None,
    },
    Rule {
        patterns: &["invalid configuration", "not configured", "missing required", "configuration"],
        kind: ErrorKind::AuthenticationOrConfig,
        retryable: false,
        status: Some(400),
    },
    Rule {
        patterns: &["validation", "invalid request", "bad request"],
        kind: ErrorKind::Generic,
        retryable: false,
        status: Some(400),
    },
];

fn status_code_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)status(?:\s+code)?:?\s*(\d{3})\b").expect("valid regex"))
}

fn model_id_patterns() -> &'static [Regex; 2] {
    static PATTERNS: OnceLock<[Regex; 2]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            Regex::new(r#"(?i)\b(?:model|deployment)\s+['"`]([^'"`]+)['"`]"#).expect("valid regex"),
            Regex::new(r"(?i)\b(?:model|deployment)\s+([\w.:/-]+)\s+(?:was\s+)?(?:not found|does not exist|is not available)")
                .expect("valid regex"),
        ]
    })
}

/// Classify a failure into the caller-facing taxonomy
pub fn classify(err: anyhow::Error, context: &ErrorContext) -> LlmError {
    if let Some(llm) = err.chain().find_map(|e| e.downcast_ref::<LlmError>()) {
        return match llm {
            LlmError::Unified(unified) => LlmError::Unified(complete(unified.clone(), context)),
            other => other.clone(),
        };
    }
    if let Some(unified) = err.chain().find_map(|e| e.downcast_ref::<UnifiedError>()) {
        return LlmError::Unified(complete(unified.clone(), context));
    }

    let unified = classify_fresh(&err, context);
    log_classified(&unified, context);
    LlmError::Unified(unified)
}

/// Fill in what a locally built error lacks. Errors that already carry
/// diagnostics were classified before and pass through untouched.
fn complete(unified: UnifiedError, context: &ErrorContext) -> UnifiedError {
    if unified.diagnostics.is_some() {
        return unified;
    }
    let model_id = unified.model_id.clone().or_else(|| context.model_id.clone());
    let unified = unified.with_model(model_id).with_diagnostics(diagnostics(context));
    log_classified(&unified, context);
    unified
}

fn classify_fresh(err: &anyhow::Error, context: &ErrorContext) -> UnifiedError {
    let root = err.root_cause();

    if let Some(response) = root.downcast_ref::<ResponseError>() {
        let envelope = response.body.as_deref().and_then(ErrorEnvelope::parse_embedded);
        let status = envelope
            .as_ref()
            .filter(|e| e.error.code.is_some())
            .map_or(response.status, ErrorEnvelope::status);
        let message = envelope
            .as_ref()
            .map_or_else(|| response.to_string(), |e| e.error.message.clone());

        let diagnostics = Diagnostics {
            url: response.url.clone().or_else(|| context.url.clone()),
            response_body: response.body.as_deref().map(truncate_body),
            headers: (!response.headers.is_empty()).then(|| response.headers.clone()),
            ..diagnostics(context)
        };
        return from_status(status, message, context).with_diagnostics(diagnostics);
    }

    if let Some(envelope) = root.downcast_ref::<ErrorEnvelope>() {
        return from_envelope(envelope, context);
    }

    let text = format!("{err:#}");

    if let Some(envelope) = ErrorEnvelope::parse_embedded(&text) {
        return from_envelope(&envelope, context);
    }

    let lowered = text.to_lowercase();
    if let Some(rule) = RULES
        .iter()
        .find(|rule| rule.patterns.iter().any(|p| lowered.contains(p)))
    {
        return UnifiedError::new(rule.kind, text)
            .retryable(rule.retryable)
            .with_status(rule.status.and_then(|s| StatusCode::from_u16(s).ok()))
            .with_model(context.model_id.clone())
            .with_diagnostics(diagnostics(context));
    }

    if let Some(status) = status_code_pattern()
        .captures(&text)
        .and_then(|c| c[1].parse::<u16>().ok())
    {
        return from_status(normalize_status(status), text, context).with_diagnostics(diagnostics(context));
    }

    UnifiedError::new(ErrorKind::Generic, format!("{} failed: {text}", context.operation))
        .with_model(context.model_id.clone())
        .with_diagnostics(diagnostics(context))
}

fn from_envelope(envelope: &ErrorEnvelope, context: &ErrorContext) -> UnifiedError {
    let diagnostics = Diagnostics {
        response_body: serde_json::to_string(envelope).ok().as_deref().map(truncate_body),
        ..diagnostics(context)
    };
    from_status(envelope.status(), envelope.error.message.clone(), context).with_diagnostics(diagnostics)
}

/// Map a status to a kind and retry hint
pub fn from_status(status: StatusCode, message: String, context: &ErrorContext) -> UnifiedError {
    let code = status.as_u16();

    let (kind, retryable) = match code {
        401 | 403 => (ErrorKind::AuthenticationOrConfig, false),
        404 => (ErrorKind::ModelOrDeploymentNotFound, false),
        429 => (ErrorKind::RateLimitOrTransient, true),
        500.. => (ErrorKind::RateLimitOrTransient, true),
        408 | 409 => (ErrorKind::Generic, true),
        _ => (ErrorKind::Generic, false),
    };

    let model_id = if code == 404 {
        extract_model_id(&message).or_else(|| context.model_id.clone())
    } else {
        context.model_id.clone()
    };

    UnifiedError::new(kind, message)
        .retryable(retryable)
        .with_status(Some(status))
        .with_model(model_id)
}

fn normalize_status(code: u16) -> StatusCode {
    if (100..=599).contains(&code) {
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

fn extract_model_id(message: &str) -> Option<String> {
    model_id_patterns()
        .iter()
        .find_map(|pattern| pattern.captures(message))
        .map(|c| c[1].to_owned())
}

fn diagnostics(context: &ErrorContext) -> Diagnostics {
    Diagnostics {
        operation: context.operation,
        url: context.url.clone(),
        response_body: None,
        headers: None,
        request_summary: context.summary,
    }
}

fn log_classified(error: &UnifiedError, context: &ErrorContext) {
    let status = error.status.map(|s| s.as_u16());
    if error.retryable {
        tracing::warn!(
            operation = context.operation,
            api = %context.api,
            kind = %error.kind,
            retryable = error.retryable,
            status,
            "backend call failed: {}",
            error.message
        );
    } else {
        tracing::error!(
            operation = context.operation,
            api = %context.api,
            kind = %error.kind,
            retryable = error.retryable,
            status,
            "backend call failed: {}",
            error.message
        );
    }
}
