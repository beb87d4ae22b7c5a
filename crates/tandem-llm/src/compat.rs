//! Legacy-shaped results
//!
//! Reshapes canonical results and streams one-to-one: nested usage is
//! flattened, finish reasons become bare strings, and warnings are either
//! kept in legacy form or written to a [`WarningSink`]. Event order is
//! never changed.

use std::sync::Arc;

use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use serde::Serialize;

use crate::error::LlmError;
use crate::provider::ChatModel;
use crate::types::{
    CallOptions, Content, GenerateResult, ProviderMetadata, RequestEcho, ResponseEcho, StreamEvent, Usage, Warning,
};

/// Flat token totals; a field is `None` when none of its sources were reported
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyUsage {
    /// Prompt tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_tokens: Option<u64>,
    /// Generated tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_tokens: Option<u64>,
    /// Prompt plus generated tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
    /// Generated reasoning tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_tokens: Option<u64>,
    /// Prompt tokens served from cache
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached_input_tokens: Option<u64>,
}

impl From<&Usage> for LegacyUsage {
    fn from(usage: &Usage) -> Self {
        let input = &usage.input_tokens;
        let output = &usage.output_tokens;

        let input_tokens = input.total.or_else(|| sum(&[input.no_cache, input.cache_read]));
        let output_tokens = output.total.or_else(|| sum(&[output.text, output.reasoning]));
        let total_tokens = match (input_tokens, output_tokens) {
            (Some(i), Some(o)) => Some(i + o),
            _ => None,
        };

        Self {
            input_tokens,
            output_tokens,
            total_tokens,
            reasoning_tokens: output.reasoning,
            cached_input_tokens: input.cache_read,
        }
    }
}

fn sum(parts: &[Option<u64>]) -> Option<u64> {
    parts.iter().flatten().copied().reduce(|a, b| a + b)
}

/// Warning in the legacy shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum LegacyWarning {
    /// Setting ignored by the backend
    UnsupportedSetting {
        /// Setting name
        setting: String,
        /// Extra context
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<String>,
    },
    /// Free-form notice
    Other {
        /// Notice text
        message: String,
    },
}

/// Receives warnings the legacy shape does not carry
pub trait WarningSink: Send + Sync {
    /// Record one formatted warning line
    fn warn(&self, line: &str);
}

/// Sink writing to `tracing` at WARN level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingWarningSink;

impl WarningSink for TracingWarningSink {
    fn warn(&self, line: &str) {
        tracing::warn!(warning = %line, "call adapted");
    }
}

/// `"<Kind>: <feature>[. <details>]"`
pub fn format_warning(warning: &Warning) -> String {
    let (kind, feature, details) = match warning {
        Warning::UnsupportedFeature { feature, details } => ("UnsupportedFeature", feature, details),
        Warning::CompatibilityMode { feature, details } => ("CompatibilityMode", feature, details),
        Warning::Other { message } => return format!("Other: {message}"),
    };

    match details {
        Some(details) => format!("{kind}: {feature}. {details}"),
        None => format!("{kind}: {feature}"),
    }
}

/// How canonical warnings are surfaced
#[derive(Clone)]
pub struct CompatOptions {
    /// Keep warnings in the legacy result instead of logging all of them
    pub legacy_warnings: bool,
    /// Destination for warnings not kept
    pub sink: Arc<dyn WarningSink>,
}

impl Default for CompatOptions {
    fn default() -> Self {
        Self {
            legacy_warnings: true,
            sink: Arc::new(TracingWarningSink),
        }
    }
}

impl std::fmt::Debug for CompatOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompatOptions")
            .field("legacy_warnings", &self.legacy_warnings)
            .finish_non_exhaustive()
    }
}

impl CompatOptions {
    /// Legacy warnings kept; the rest go to the sink
    pub fn convert_warnings(&self, warnings: Vec<Warning>) -> Vec<LegacyWarning> {
        let mut kept = Vec::new();

        for warning in warnings {
            let legacy = match &warning {
                Warning::UnsupportedFeature { feature, details } if self.legacy_warnings => {
                    Some(LegacyWarning::UnsupportedSetting {
                        setting: feature.clone(),
                        details: details.clone(),
                    })
                }
                Warning::Other { message } if self.legacy_warnings => Some(LegacyWarning::Other {
                    message: message.clone(),
                }),
                _ => None,
            };

            match legacy {
                Some(legacy) => kept.push(legacy),
                None => self.sink.warn(&format_warning(&warning)),
            }
        }

        kept
    }
}

/// Non-streaming result in the legacy shape
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyResult {
    /// Concatenated text
    pub text: String,
    /// Content blocks
    pub content: Vec<Content>,
    /// Bare unified finish reason
    pub finish_reason: String,
    /// Raw finish reason from the backend
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_finish_reason: Option<String>,
    /// Flat usage
    pub usage: LegacyUsage,
    /// Backend details
    pub provider_metadata: ProviderMetadata,
    /// Redacted request echo
    pub request: RequestEcho,
    /// Response echo
    pub response: ResponseEcho,
    /// Kept warnings
    pub warnings: Vec<LegacyWarning>,
}

/// Reshape a canonical result
pub fn to_legacy(result: GenerateResult, options: &CompatOptions) -> LegacyResult {
    LegacyResult {
        text: result.text(),
        finish_reason: result.finish_reason.unified.to_string(),
        raw_finish_reason: result.finish_reason.raw,
        usage: LegacyUsage::from(&result.usage),
        warnings: options.convert_warnings(result.warnings),
        content: result.content,
        provider_metadata: result.provider_metadata,
        request: result.request,
        response: result.response,
    }
}

/// Stream event in the legacy shape
#[derive(Debug, Clone)]
pub enum LegacyStreamEvent {
    /// First event with kept warnings
    StreamStart {
        /// Kept warnings
        warnings: Vec<LegacyWarning>,
    },
    /// Terminal success event
    Finish {
        /// Bare unified finish reason
        finish_reason: String,
        /// Flat usage
        usage: LegacyUsage,
        /// Backend details
        provider_metadata: ProviderMetadata,
    },
    /// Any other canonical event, unchanged
    Event(StreamEvent),
}

/// Reshape one stream event
pub fn to_legacy_event(event: StreamEvent, options: &CompatOptions) -> LegacyStreamEvent {
    match event {
        StreamEvent::StreamStart { warnings } => LegacyStreamEvent::StreamStart {
            warnings: options.convert_warnings(warnings),
        },
        StreamEvent::Finish {
            finish_reason,
            usage,
            provider_metadata,
        } => LegacyStreamEvent::Finish {
            finish_reason: finish_reason.unified.to_string(),
            usage: LegacyUsage::from(&usage),
            provider_metadata,
        },
        other => LegacyStreamEvent::Event(other),
    }
}

/// [`ChatModel::generate`] reshaped
pub async fn generate_legacy(
    model: &ChatModel,
    call: CallOptions,
    options: &CompatOptions,
) -> Result<LegacyResult, LlmError> {
    let result = model.generate(call).await?;
    Ok(to_legacy(result, options))
}

/// [`ChatModel::stream`] reshaped
pub async fn stream_legacy(
    model: &ChatModel,
    call: CallOptions,
    options: CompatOptions,
) -> Result<BoxStream<'static, LegacyStreamEvent>, LlmError> {
    let result = model.stream(call).await?;
    Ok(result
        .events
        .map(move |event| to_legacy_event(event, &options))
        .boxed())
}
