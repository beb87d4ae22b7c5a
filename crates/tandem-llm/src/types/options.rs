use serde_json::Value;
use strum::{EnumIter, IntoStaticStr};
use tokio_util::sync::CancellationToken;

use super::message::Message;
use super::settings::CallOverrides;
use super::tool::{ResponseFormat, ToolChoice, ToolDefinition};

/// Canonical options for one generate or stream call
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Conversation to complete
    pub prompt: Vec<Message>,
    /// Maximum tokens to generate
    pub max_output_tokens: Option<u32>,
    /// Sampling temperature
    pub temperature: Option<f64>,
    /// Nucleus sampling threshold
    pub top_p: Option<f64>,
    /// Top-k sampling
    pub top_k: Option<u32>,
    /// Presence penalty
    pub presence_penalty: Option<f64>,
    /// Frequency penalty
    pub frequency_penalty: Option<f64>,
    /// Stop sequences
    pub stop_sequences: Option<Vec<String>>,
    /// Random seed for deterministic generation
    pub seed: Option<u64>,
    /// Requested output format
    pub response_format: Option<ResponseFormat>,
    /// Tools the model may call
    pub tools: Vec<ToolDefinition>,
    /// Tool selection mode
    pub tool_choice: Option<ToolChoice>,
    /// Emit a `raw` event carrying every backend chunk
    pub include_raw_chunks: bool,
    /// Cancels the call and its stream
    pub abort: Option<CancellationToken>,
    /// Backend-scoped options for this call only
    pub provider_options: Option<CallOverrides>,
}

impl CallOptions {
    /// Options with only a prompt set
    pub fn with_prompt(prompt: Vec<Message>) -> Self {
        Self {
            prompt,
            ..Self::default()
        }
    }

    /// Value of a canonical generation knob, if the caller set it
    pub fn knob(&self, key: OptionKey) -> Option<Value> {
        match key {
            OptionKey::MaxOutputTokens => self.max_output_tokens.map(Value::from),
            OptionKey::Temperature => self.temperature.map(Value::from),
            OptionKey::TopP => self.top_p.map(Value::from),
            OptionKey::TopK => self.top_k.map(Value::from),
            OptionKey::FrequencyPenalty => self.frequency_penalty.map(Value::from),
            OptionKey::PresencePenalty => self.presence_penalty.map(Value::from),
            OptionKey::StopSequences => self.stop_sequences.clone().map(Value::from),
            OptionKey::Seed => self.seed.map(Value::from),
        }
    }

    /// Cancellation token for this call, detached if none was given
    pub fn abort_token(&self) -> CancellationToken {
        self.abort.clone().unwrap_or_default()
    }
}

/// Canonical generation knob that maps onto a backend parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "camelCase")]
pub enum OptionKey {
    /// `maxOutputTokens`
    MaxOutputTokens,
    /// `temperature`
    Temperature,
    /// `topP`
    TopP,
    /// `topK`
    TopK,
    /// `frequencyPenalty`
    FrequencyPenalty,
    /// `presencePenalty`
    PresencePenalty,
    /// `stopSequences`
    StopSequences,
    /// `seed`
    Seed,
}

impl OptionKey {
    /// Canonical option name
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}
