//! Text embeddings on either backend
//!
//! Embedding calls share backend resolution, abort handling and failure
//! classification with chat calls. The input kind (`text`, `document`,
//! `query`) is exclusive to the orchestration backend.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString};
use tandem_config::Api;
use tokio_util::sync::CancellationToken;

use crate::classify::{ErrorContext, classify};
use crate::client::{BackendRequest, BackendResponse};
use crate::error::LlmError;
use crate::protocol::embedding::{EmbeddingItem, EmbeddingUsage};
use crate::protocol::foundation::FoundationEmbeddingRequest;
use crate::protocol::orchestration::{
    EmbeddingConfig, EmbeddingInput, EmbeddingModule, EmbeddingModules, ModelSpec, OrchestrationEmbeddingRequest,
};
use crate::provider::ProviderInner;
use crate::strategy::resolve_api;
use crate::types::{ProviderMetadata, Warning};

/// Most values accepted by one embedding call
pub const MAX_EMBEDDINGS_PER_CALL: usize = 2048;

const EMBEDDING_TYPE_FEATURE: &str = "embeddingType";

/// Kind of text being embedded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EmbeddingType {
    /// General text
    Text,
    /// Document to be retrieved
    Document,
    /// Search query
    Query,
}

/// Settings fixed when an embedding model is constructed
#[derive(Debug, Clone, Default)]
pub struct EmbeddingSettings {
    /// Backend for this model, overriding the provider default
    pub api: Option<Api>,
    /// Model version
    pub model_version: Option<String>,
    /// Output dimensionality
    pub dimensions: Option<u32>,
    /// Input kind, orchestration only
    pub embedding_type: Option<EmbeddingType>,
    /// Extra model parameters
    pub model_params: Map<String, Value>,
}

/// Per-call overrides for an embedding call
#[derive(Debug, Clone, Default)]
pub struct EmbedOverrides {
    /// Backend for this call only
    pub api: Option<Api>,
    /// Input kind, orchestration only
    pub embedding_type: Option<EmbeddingType>,
    /// Output dimensionality
    pub dimensions: Option<u32>,
}

/// Options for one embedding call
#[derive(Debug, Clone, Default)]
pub struct EmbedOptions {
    /// Texts to embed
    pub values: Vec<String>,
    /// Cancels the call
    pub abort: Option<CancellationToken>,
    /// Backend-scoped overrides
    pub provider_options: Option<EmbedOverrides>,
}

/// Canonical embedding result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbeddingResult {
    /// Vectors in input order
    pub embeddings: Vec<Vec<f32>>,
    /// Tokens consumed
    pub usage: Option<EmbeddingTokens>,
    /// Backend details
    pub provider_metadata: ProviderMetadata,
    /// Adaptation notices
    pub warnings: Vec<Warning>,
}

/// Token count of an embedding call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EmbeddingTokens {
    /// Tokens consumed
    pub tokens: u64,
}

/// Embedding model bound to a provider
#[derive(Clone)]
pub struct EmbeddingModel {
    pub(crate) model_id: String,
    pub(crate) settings: EmbeddingSettings,
    pub(crate) provider: Arc<ProviderInner>,
}

impl std::fmt::Debug for EmbeddingModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingModel")
            .field("model_id", &self.model_id)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl EmbeddingModel {
    /// Model identifier
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Embed every value in one backend call
    ///
    /// An empty value list returns an empty result without a backend call.
    pub async fn embed(&self, options: EmbedOptions) -> Result<EmbeddingResult, LlmError> {
        let count = options.values.len();
        if count > MAX_EMBEDDINGS_PER_CALL {
            return Err(LlmError::TooManyEmbeddingValues {
                max: MAX_EMBEDDINGS_PER_CALL,
                count,
            });
        }

        let overrides = options.provider_options.clone().unwrap_or_default();
        let model_api = resolve_api(self.provider.config.api, self.settings.api, None);
        let api = resolve_api(self.provider.config.api, self.settings.api, overrides.api);
        validate_embedding(api, model_api, &self.settings, &overrides)?;

        if count == 0 {
            return Ok(EmbeddingResult {
                embeddings: Vec::new(),
                usage: None,
                provider_metadata: ProviderMetadata {
                    api,
                    ..ProviderMetadata::default()
                },
                warnings: Vec::new(),
            });
        }

        let abort = options.abort.clone().unwrap_or_default();
        if abort.is_cancelled() {
            return Err(LlmError::Aborted);
        }

        let mut context = ErrorContext::new("embed", api, self.model_id.as_str());
        context.url = self.provider.config.destination.as_ref().map(ToString::to_string);

        let request = build_request(api, &self.model_id, &self.settings, &overrides, options.values);
        let target = self
            .provider
            .target(api, &self.model_id, self.settings.model_version.clone());
        let client = self
            .provider
            .factory
            .create(&target)
            .map_err(|e| classify(e, &context))?;

        tracing::debug!(api = %api, model = %self.model_id, values = count, "dispatching embedding call");

        let response = tokio::select! {
            biased;
            () = abort.cancelled() => return Err(LlmError::Aborted),
            response = client.execute(request, abort.clone()) => response,
        };

        response
            .and_then(|response| map_response(api, response))
            .map_err(|e| classify(e, &context))
    }
}

/// `model_api` is the backend the model resolves to without the call override
fn validate_embedding(
    api: Api,
    model_api: Api,
    settings: &EmbeddingSettings,
    overrides: &EmbedOverrides,
) -> Result<(), LlmError> {
    if let Some(to_api) = overrides.api
        && model_api == Api::Orchestration
        && to_api != model_api
        && settings.embedding_type.is_some()
    {
        return Err(LlmError::ApiSwitch {
            from_api: model_api,
            to_api,
            feature: EMBEDDING_TYPE_FEATURE.to_owned(),
        });
    }

    let wants_type = settings.embedding_type.is_some() || overrides.embedding_type.is_some();
    if api == Api::FoundationModels && wants_type {
        return Err(LlmError::UnsupportedFeature {
            feature: EMBEDDING_TYPE_FEATURE.to_owned(),
            api,
            suggested_api: Api::Orchestration,
        });
    }

    Ok(())
}

fn build_request(
    api: Api,
    model_id: &str,
    settings: &EmbeddingSettings,
    overrides: &EmbedOverrides,
    values: Vec<String>,
) -> BackendRequest {
    let dimensions = overrides.dimensions.or(settings.dimensions);

    match api {
        Api::Orchestration => {
            let mut params = settings.model_params.clone();
            if let Some(dimensions) = dimensions {
                params.insert("dimensions".to_owned(), Value::from(dimensions));
            }

            BackendRequest::OrchestrationEmbedding(OrchestrationEmbeddingRequest {
                config: EmbeddingConfig {
                    modules: EmbeddingModules {
                        embeddings: EmbeddingModule {
                            model: ModelSpec {
                                name: model_id.to_owned(),
                                version: settings.model_version.clone(),
                                params,
                            },
                        },
                    },
                },
                input: EmbeddingInput {
                    text: values,
                    kind: overrides
                        .embedding_type
                        .or(settings.embedding_type)
                        .as_ref()
                        .map(ToString::to_string),
                },
            })
        }
        Api::FoundationModels => BackendRequest::FoundationEmbedding(FoundationEmbeddingRequest {
            input: values,
            dimensions,
            encoding_format: "float".to_owned(),
        }),
    }
}

fn map_response(api: Api, response: BackendResponse) -> anyhow::Result<EmbeddingResult> {
    let (data, usage, request_id) = match (api, response) {
        (Api::Orchestration, BackendResponse::OrchestrationEmbedding(r)) => {
            (r.final_result.data, r.final_result.usage, r.request_id)
        }
        (Api::FoundationModels, BackendResponse::FoundationEmbedding(r)) => (r.data, r.usage, None),
        _ => anyhow::bail!("malformed response: expected a {api} embedding"),
    };

    Ok(EmbeddingResult {
        embeddings: ordered(data),
        usage: usage.and_then(tokens),
        provider_metadata: ProviderMetadata {
            api,
            request_id,
            ..ProviderMetadata::default()
        },
        warnings: Vec::new(),
    })
}

fn ordered(mut data: Vec<EmbeddingItem>) -> Vec<Vec<f32>> {
    data.sort_by_key(|item| item.index);
    data.into_iter().map(|item| item.embedding).collect()
}

fn tokens(usage: EmbeddingUsage) -> Option<EmbeddingTokens> {
    usage
        .total_tokens
        .or(usage.prompt_tokens)
        .map(|tokens| EmbeddingTokens { tokens })
}
