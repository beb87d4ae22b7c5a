//! Request/response cycle for each backend
//!
//! The shared steps (backend resolution, feature validation, message
//! conversion, parameter mapping) are free functions. A [`Strategy`] only
//! assembles the backend body and interprets what comes back, so both
//! implementations are stateless and cached per model.

pub mod finish;
pub mod foundation;
pub mod orchestration;
pub(crate) mod run;

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::{Map, Value};
use tandem_config::Api;

use crate::client::{BackendChunk, BackendRequest, BackendResponse};
use crate::convert::{ConvertOptions, convert_messages, convert_usage};
use crate::error::LlmError;
use crate::params::{ParamTable, build_model_params};
use crate::protocol::chat::{ChatCompletion, ChatCompletionChunk, ChatMessage, ChatStreamToolCall, ChatUsage};
use crate::types::{
    CallOptions, CallOverrides, Content, FinishReason, FoundationFeatures, ModelSettings, OrchestrationFeatures,
    RequestEcho, ResponseEcho, ResponseFormat, ToolChoice, ToolDefinition, Usage, Warning,
};
pub use finish::{FinishTable, map_finish_reason};
pub use foundation::FoundationModelsStrategy;
pub use orchestration::OrchestrationStrategy;

/// Placeholder written over message content in request echoes
pub const REDACTED: &str = "[redacted]";

/// Effective backend: invocation, then model, then provider, then orchestration
pub fn resolve_api(provider: Option<Api>, model: Option<Api>, invocation: Option<Api>) -> Api {
    invocation.or(model).or(provider).unwrap_or_default()
}

/// Reject settings the resolved backend cannot honor
///
/// # Errors
///
/// Returns [`LlmError::ApiSwitch`] when a per-call API override would drop a
/// feature configured on the model for `model_api`, the backend the model
/// resolves to without the override, and [`LlmError::UnsupportedFeature`]
/// when any feature exclusive to the other backend is set
pub fn validate_settings(
    api: Api,
    model_api: Api,
    model: &ModelSettings,
    overrides: Option<&CallOverrides>,
) -> Result<(), LlmError> {
    if let Some(to_api) = overrides.and_then(|o| o.api)
        && model_api != to_api
        && let Some(feature) = model.features_for(model_api).first()
    {
        return Err(LlmError::ApiSwitch {
            from_api: model_api,
            to_api,
            feature: (*feature).to_owned(),
        });
    }

    let other = api.other();
    let mut foreign = model.features_for(other);
    if let Some(overrides) = overrides {
        foreign.extend(overrides.features_for(other));
    }

    match foreign.first() {
        Some(feature) => Err(LlmError::UnsupportedFeature {
            feature: (*feature).to_owned(),
            api,
            suggested_api: other,
        }),
        None => Ok(()),
    }
}

/// Everything a strategy needs to build one request
#[derive(Debug, Clone)]
pub struct PreparedCall {
    /// Model identifier
    pub model_id: String,
    /// Model version
    pub model_version: Option<String>,
    /// Converted prompt
    pub messages: Vec<ChatMessage>,
    /// Flat backend model params
    pub params: Map<String, Value>,
    /// Tool definitions
    pub tools: Vec<ToolDefinition>,
    /// Tool choice after backend adjustment
    pub tool_choice: Option<ToolChoice>,
    /// Output format
    pub response_format: Option<ResponseFormat>,
    /// Orchestration-only features, call over model
    pub orchestration: OrchestrationFeatures,
    /// Foundation-only features, call over model
    pub foundation: FoundationFeatures,
    /// Adaptation notices
    pub warnings: Vec<Warning>,
}

/// Merge overrides, convert messages, map params and resolve tool choice
///
/// # Errors
///
/// Returns a configuration error when the prompt holds parts the backend
/// cannot carry
pub fn prepare_call(
    strategy: &dyn Strategy,
    model_id: &str,
    settings: &ModelSettings,
    options: &CallOptions,
) -> Result<PreparedCall, LlmError> {
    let overrides = options.provider_options.clone().unwrap_or_default();

    let convert = ConvertOptions {
        include_reasoning: overrides
            .include_reasoning
            .or(settings.include_reasoning)
            .unwrap_or(false),
        escape_template_delimiters: overrides
            .escape_template_placeholders
            .or(settings.escape_template_placeholders)
            .unwrap_or_else(|| strategy.escapes_by_default()),
    };
    let messages = convert_messages(&options.prompt, convert)?;

    let (params, mut warnings) = build_model_params(
        options,
        &overrides.model_params,
        &settings.model_params,
        strategy.param_table(),
    );
    let tool_choice = strategy.resolve_tool_choice(options.tool_choice.as_ref(), &mut warnings);

    let mut call = PreparedCall {
        model_id: model_id.to_owned(),
        model_version: settings.model_version.clone(),
        messages,
        params,
        tools: options.tools.clone(),
        tool_choice,
        response_format: options
            .response_format
            .clone()
            .or_else(|| settings.response_format.clone()),
        orchestration: overrides.orchestration.or(&settings.orchestration),
        foundation: overrides.foundation.or(&settings.foundation),
        warnings,
    };
    let ignored = strategy.ignored_inputs(&call);
    call.warnings.extend(ignored);
    Ok(call)
}

/// Backend-neutral view of one streaming chunk
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedChunk {
    /// Response identifier
    pub id: Option<String>,
    /// Model that produced the chunk
    pub model: Option<String>,
    /// Creation timestamp in Unix seconds
    pub created: Option<i64>,
    /// Text fragment
    pub text: Option<String>,
    /// Reasoning fragment
    pub reasoning: Option<String>,
    /// Tool call fragments
    pub tool_calls: Vec<ChatStreamToolCall>,
    /// Raw finish reason
    pub finish_reason: Option<String>,
    /// Usage reported so far
    pub usage: Option<ChatUsage>,
    /// Service request identifier
    pub request_id: Option<String>,
    /// Backend configuration fingerprint
    pub system_fingerprint: Option<String>,
    /// Token log-probabilities
    pub logprobs: Option<Value>,
}

impl NormalizedChunk {
    /// Flatten the first choice of a chat chunk
    pub fn from_chat(chunk: ChatCompletionChunk) -> Self {
        let mut normalized = Self {
            id: chunk.id,
            model: chunk.model,
            created: chunk.created,
            usage: chunk.usage,
            system_fingerprint: chunk.system_fingerprint,
            ..Self::default()
        };

        if let Some(choice) = chunk.choices.into_iter().next() {
            normalized.text = choice.delta.content;
            normalized.reasoning = choice.delta.reasoning_content;
            normalized.tool_calls = choice.delta.tool_calls.unwrap_or_default();
            normalized.finish_reason = choice.finish_reason;
            normalized.logprobs = choice.logprobs;
        }

        normalized
    }
}

/// Request/response handling for one backend
pub trait Strategy: Send + Sync + std::fmt::Debug {
    /// Backend this strategy targets
    fn api(&self) -> Api;

    /// Parameter mapping table
    fn param_table(&self) -> &'static ParamTable;

    /// Finish reason table
    fn finish_reasons(&self) -> FinishTable;

    /// Whether prompt text is escaped unless settings say otherwise
    fn escapes_by_default(&self) -> bool {
        false
    }

    /// Adjust the caller's tool choice, warning about anything dropped
    fn resolve_tool_choice(&self, choice: Option<&ToolChoice>, _warnings: &mut Vec<Warning>) -> Option<ToolChoice> {
        choice.cloned()
    }

    /// Warnings for prepared inputs the request body will not carry
    fn ignored_inputs(&self, _call: &PreparedCall) -> Vec<Warning> {
        Vec::new()
    }

    /// Assemble the backend body
    fn build_request(&self, call: &PreparedCall, stream: bool) -> BackendRequest;

    /// Map a full response into canonical content
    ///
    /// # Errors
    ///
    /// Returns an error when the response belongs to another backend
    fn map_response(&self, response: BackendResponse) -> anyhow::Result<MappedResponse>;

    /// Flatten a native chunk
    ///
    /// # Errors
    ///
    /// Returns an error when the chunk belongs to another backend
    fn normalize_chunk(&self, chunk: BackendChunk) -> anyhow::Result<NormalizedChunk>;
}

/// Canonical parts of a full response
#[derive(Debug, Clone)]
pub struct MappedResponse {
    /// Content blocks in order
    pub content: Vec<Content>,
    /// Unified finish reason
    pub finish_reason: FinishReason,
    /// Token usage
    pub usage: Usage,
    /// Service request identifier
    pub request_id: Option<String>,
    /// Backend configuration fingerprint
    pub system_fingerprint: Option<String>,
    /// Token log-probabilities
    pub logprobs: Option<Value>,
    /// Response echo
    pub response: ResponseEcho,
}

/// Map a chat completion shared by both backends
pub fn map_completion(
    completion: &ChatCompletion,
    body: Value,
    request_id: Option<String>,
    table: FinishTable,
) -> MappedResponse {
    let choice = completion.choices.first();
    let mut content = Vec::new();

    if let Some(message) = choice.map(|c| &c.message) {
        if let Some(reasoning) = message.reasoning_content.as_ref().filter(|r| !r.is_empty()) {
            content.push(Content::Reasoning {
                text: reasoning.clone(),
            });
        }
        if let Some(text) = message.content.as_ref().filter(|t| !t.is_empty()) {
            content.push(Content::Text { text: text.clone() });
        }
        for call in message.tool_calls.iter().flatten() {
            content.push(Content::ToolCall {
                tool_call_id: call.id.clone(),
                tool_name: call.function.name.clone(),
                input: parse_arguments(&call.function.arguments),
            });
        }
    }

    MappedResponse {
        content,
        finish_reason: map_finish_reason(choice.and_then(|c| c.finish_reason.as_deref()), table),
        usage: completion.usage.as_ref().map(convert_usage).unwrap_or_default(),
        request_id,
        system_fingerprint: completion.system_fingerprint.clone(),
        logprobs: choice.and_then(|c| c.logprobs.clone()),
        response: ResponseEcho {
            id: completion.id.clone(),
            model_id: completion.model.clone(),
            timestamp: completion.created.and_then(timestamp),
            body,
        },
    }
}

/// Parse tool arguments, keeping the raw string when they are not JSON
pub fn parse_arguments(arguments: &str) -> Value {
    if arguments.trim().is_empty() {
        return Value::Object(Map::new());
    }
    serde_json::from_str(arguments).unwrap_or_else(|_| Value::String(arguments.to_owned()))
}

/// Unix seconds as a timestamp
pub fn timestamp(seconds: i64) -> Option<jiff::Timestamp> {
    jiff::Timestamp::from_second(seconds).ok()
}

/// Request body with every message `content` replaced by [`REDACTED`]
pub fn redacted_echo(request: &BackendRequest) -> RequestEcho {
    let mut body = serde_json::to_value(request).unwrap_or(Value::Null);
    redact(&mut body);
    RequestEcho { body }
}

fn redact(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, child) in map.iter_mut() {
                match key.as_str() {
                    "messages" | "template" | "messages_history" => {
                        for message in child.as_array_mut().into_iter().flatten() {
                            if let Some(content) = message.get_mut("content") {
                                *content = Value::String(REDACTED.to_owned());
                            }
                        }
                    }
                    "placeholder_values" => *child = Value::String(REDACTED.to_owned()),
                    _ => redact(child),
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact),
        _ => {}
    }
}

/// Strategy for a backend
pub fn strategy_for(api: Api) -> Arc<dyn Strategy> {
    match api {
        Api::Orchestration => Arc::new(OrchestrationStrategy),
        Api::FoundationModels => Arc::new(FoundationModelsStrategy),
    }
}

/// Strategy instances keyed by model and backend
#[derive(Debug, Default)]
pub struct StrategyCache {
    entries: DashMap<(String, Api), Arc<dyn Strategy>>,
}

impl StrategyCache {
    /// Cached strategy for `model_id` on `api`, created on first use
    pub fn get(&self, model_id: &str, api: Api) -> Arc<dyn Strategy> {
        self.entries
            .entry((model_id.to_owned(), api))
            .or_insert_with(|| strategy_for(api))
            .clone()
    }

    /// Number of cached strategies
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is cached yet
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
