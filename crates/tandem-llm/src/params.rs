//! Canonical options to backend model parameters
//!
//! Each backend has a static table of [`ParamMapping`]s. For every mapping
//! the value comes from the canonical call option, then the per-call
//! override, then the model default; the camelCase source key never
//! survives next to its backend name.

use serde_json::{Map, Value};
use strum::IntoEnumIterator;
use tandem_config::Api;

use crate::types::{CallOptions, OptionKey, Warning};

/// One canonical option and where it lands in the backend body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamMapping {
    /// Key accepted in free-form model params
    pub source_key: &'static str,
    /// Canonical call option
    pub option: OptionKey,
    /// Key sent to the backend
    pub output_key: &'static str,
}

/// Mapping table for one backend
#[derive(Debug, Clone, Copy)]
pub struct ParamTable {
    /// Backend the table serves
    pub api: Api,
    /// Supported mappings
    pub mappings: &'static [ParamMapping],
}

impl ParamTable {
    /// Mapping for a canonical option, if the backend supports it
    pub fn get(&self, option: OptionKey) -> Option<&ParamMapping> {
        self.mappings.iter().find(|m| m.option == option)
    }
}

const fn mapping(source_key: &'static str, option: OptionKey, output_key: &'static str) -> ParamMapping {
    ParamMapping {
        source_key,
        option,
        output_key,
    }
}

/// Orchestration model params
pub static ORCHESTRATION_PARAMS: ParamTable = ParamTable {
    api: Api::Orchestration,
    mappings: &[
        mapping("maxTokens", OptionKey::MaxOutputTokens, "max_tokens"),
        mapping("temperature", OptionKey::Temperature, "temperature"),
        mapping("topP", OptionKey::TopP, "top_p"),
        mapping("topK", OptionKey::TopK, "top_k"),
        mapping("frequencyPenalty", OptionKey::FrequencyPenalty, "frequency_penalty"),
        mapping("presencePenalty", OptionKey::PresencePenalty, "presence_penalty"),
    ],
};

/// Foundation-models params
pub static FOUNDATION_PARAMS: ParamTable = ParamTable {
    api: Api::FoundationModels,
    mappings: &[
        mapping("maxTokens", OptionKey::MaxOutputTokens, "max_tokens"),
        mapping("temperature", OptionKey::Temperature, "temperature"),
        mapping("topP", OptionKey::TopP, "top_p"),
        mapping("frequencyPenalty", OptionKey::FrequencyPenalty, "frequency_penalty"),
        mapping("presencePenalty", OptionKey::PresencePenalty, "presence_penalty"),
        mapping("stopSequences", OptionKey::StopSequences, "stop"),
        mapping("seed", OptionKey::Seed, "seed"),
    ],
};

/// Build the flat backend parameter map
///
/// `overrides` are the per-call model params, `defaults` the model-level
/// ones. Keys without a mapping pass through untouched. Canonical options
/// the table cannot express produce a warning and are dropped.
pub fn build_model_params(
    options: &CallOptions,
    overrides: &Map<String, Value>,
    defaults: &Map<String, Value>,
    table: &ParamTable,
) -> (Map<String, Value>, Vec<Warning>) {
    let mut params = defaults.clone();
    params.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));

    for m in table.mappings {
        let value = options
            .knob(m.option)
            .or_else(|| overrides.get(m.source_key).cloned())
            .or_else(|| defaults.get(m.source_key).cloned());

        if m.source_key != m.output_key {
            params.remove(m.source_key);
        }
        if let Some(value) = value.filter(|v| !v.is_null()) {
            params.insert(m.output_key.to_owned(), value);
        }
    }

    let warnings = OptionKey::iter()
        .filter(|key| table.get(*key).is_none() && options.knob(*key).is_some())
        .map(|key| {
            Warning::unsupported(
                key.as_str(),
                format!("not supported by the {} API; the value was ignored", table.api),
            )
        })
        .collect();

    (params, warnings)
}
