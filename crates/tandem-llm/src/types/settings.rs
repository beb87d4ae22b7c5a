//! Model-level settings and per-call overrides
//!
//! Each backend has an exclusive feature set. Orchestration-only features
//! live in [`OrchestrationFeatures`], foundation-only features in
//! [`FoundationFeatures`]; both may be set at model construction or per call.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tandem_config::Api;

use super::tool::ResponseFormat;

/// Settings fixed when a chat model is constructed
#[derive(Debug, Clone, Default)]
pub struct ModelSettings {
    /// Backend for this model, overriding the provider default
    pub api: Option<Api>,
    /// Model version requested from the backend
    pub model_version: Option<String>,
    /// Free-form model parameters keyed by camelCase name
    pub model_params: Map<String, Value>,
    /// Forward reasoning parts of the prompt
    pub include_reasoning: Option<bool>,
    /// Escape template delimiters in prompt text
    pub escape_template_placeholders: Option<bool>,
    /// Output format applied when the call sets none
    pub response_format: Option<ResponseFormat>,
    /// Orchestration-only features
    pub orchestration: OrchestrationFeatures,
    /// Foundation-only features
    pub foundation: FoundationFeatures,
}

impl ModelSettings {
    /// Exclusive features configured for `api`
    pub fn features_for(&self, api: Api) -> Vec<&'static str> {
        match api {
            Api::Orchestration => self.orchestration.configured(),
            Api::FoundationModels => self.foundation.configured(),
        }
    }

    /// Overlay `self` on provider defaults; `self` wins field by field
    #[must_use]
    pub fn over(mut self, defaults: &Self) -> Self {
        let mut params = defaults.model_params.clone();
        params.extend(std::mem::take(&mut self.model_params));

        Self {
            api: self.api.or(defaults.api),
            model_version: self.model_version.or_else(|| defaults.model_version.clone()),
            model_params: params,
            include_reasoning: self.include_reasoning.or(defaults.include_reasoning),
            escape_template_placeholders: self
                .escape_template_placeholders
                .or(defaults.escape_template_placeholders),
            response_format: self.response_format.or_else(|| defaults.response_format.clone()),
            orchestration: self.orchestration.or(&defaults.orchestration),
            foundation: self.foundation.or(&defaults.foundation),
        }
    }
}

/// Backend-scoped options for a single call
#[derive(Debug, Clone, Default)]
pub struct CallOverrides {
    /// Backend for this call only
    pub api: Option<Api>,
    /// Model parameters layered over the model-level ones
    pub model_params: Map<String, Value>,
    /// Forward reasoning parts of the prompt
    pub include_reasoning: Option<bool>,
    /// Escape template delimiters in prompt text
    pub escape_template_placeholders: Option<bool>,
    /// Orchestration-only features for this call
    pub orchestration: OrchestrationFeatures,
    /// Foundation-only features for this call
    pub foundation: FoundationFeatures,
}

impl CallOverrides {
    /// Exclusive features configured for `api`
    pub fn features_for(&self, api: Api) -> Vec<&'static str> {
        match api {
            Api::Orchestration => self.orchestration.configured(),
            Api::FoundationModels => self.foundation.configured(),
        }
    }
}

/// Features only the orchestration backend supports
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrchestrationFeatures {
    /// Input/output content filtering module configuration
    pub filtering: Option<Value>,
    /// Data masking (anonymization) module configuration
    pub masking: Option<Value>,
    /// Document grounding module configuration
    pub grounding: Option<Value>,
    /// Input/output translation module configuration
    pub translation: Option<Value>,
    /// Stored prompt template used instead of an inline template
    pub prompt_template_ref: Option<TemplateRef>,
    /// Values substituted into template placeholders
    pub placeholder_values: Option<BTreeMap<String, String>>,
}

impl OrchestrationFeatures {
    /// Names of the configured features
    pub fn configured(&self) -> Vec<&'static str> {
        [
            ("filtering", self.filtering.is_some()),
            ("masking", self.masking.is_some()),
            ("grounding", self.grounding.is_some()),
            ("translation", self.translation.is_some()),
            ("promptTemplateRef", self.prompt_template_ref.is_some()),
            ("placeholderValues", self.placeholder_values.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, set)| set.then_some(name))
        .collect()
    }

    /// Field-wise overlay; `self` wins
    #[must_use]
    pub fn or(self, fallback: &Self) -> Self {
        Self {
            filtering: self.filtering.or_else(|| fallback.filtering.clone()),
            masking: self.masking.or_else(|| fallback.masking.clone()),
            grounding: self.grounding.or_else(|| fallback.grounding.clone()),
            translation: self.translation.or_else(|| fallback.translation.clone()),
            prompt_template_ref: self.prompt_template_ref.or_else(|| fallback.prompt_template_ref.clone()),
            placeholder_values: self.placeholder_values.or_else(|| fallback.placeholder_values.clone()),
        }
    }
}

/// Features only the foundation-models backend supports
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FoundationFeatures {
    /// External data sources used to augment the completion
    pub data_sources: Option<Vec<Value>>,
    /// Return log-probabilities of output tokens
    pub logprobs: Option<bool>,
    /// Number of most likely tokens to return per position
    pub top_logprobs: Option<u32>,
    /// Seed for deterministic sampling
    pub seed: Option<u64>,
    /// Stop sequences
    pub stop: Option<Vec<String>>,
    /// Token id to bias
    pub logit_bias: Option<BTreeMap<String, i32>>,
    /// End-user identifier for abuse monitoring
    pub user: Option<String>,
}

impl FoundationFeatures {
    /// Names of the configured features
    pub fn configured(&self) -> Vec<&'static str> {
        [
            ("dataSources", self.data_sources.is_some()),
            ("logprobs", self.logprobs.is_some()),
            ("topLogprobs", self.top_logprobs.is_some()),
            ("seed", self.seed.is_some()),
            ("stop", self.stop.is_some()),
            ("logitBias", self.logit_bias.is_some()),
            ("user", self.user.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, set)| set.then_some(name))
        .collect()
    }

    /// Field-wise overlay; `self` wins
    #[must_use]
    pub fn or(self, fallback: &Self) -> Self {
        Self {
            data_sources: self.data_sources.or_else(|| fallback.data_sources.clone()),
            logprobs: self.logprobs.or(fallback.logprobs),
            top_logprobs: self.top_logprobs.or(fallback.top_logprobs),
            seed: self.seed.or(fallback.seed),
            stop: self.stop.or_else(|| fallback.stop.clone()),
            logit_bias: self.logit_bias.or_else(|| fallback.logit_bias.clone()),
            user: self.user.or_else(|| fallback.user.clone()),
        }
    }
}

/// Reference to a prompt template stored on the orchestration service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TemplateRef {
    /// By template identifier
    Id {
        /// Template identifier
        id: String,
    },
    /// By scenario, name and version
    Name {
        /// Scenario the template belongs to
        scenario: String,
        /// Template name
        name: String,
        /// Template version
        version: String,
    },
}
