//! Public entry point: one provider, many models

use std::sync::Arc;

use tandem_config::{Api, DefaultSettingsConfig, ProviderConfig};

use crate::client::{ClientFactory, DeploymentTarget};
use crate::embedding::{EmbeddingModel, EmbeddingSettings};
use crate::error::LlmError;
use crate::strategy::{StrategyCache, run};
use crate::types::{CallOptions, GenerateResult, ModelSettings, StreamResult};

pub(crate) struct ProviderInner {
    pub(crate) config: ProviderConfig,
    pub(crate) defaults: ModelSettings,
    pub(crate) factory: Arc<dyn ClientFactory>,
    pub(crate) strategies: StrategyCache,
}

impl ProviderInner {
    /// Client target for `model_id` on `api`
    pub(crate) fn target(&self, api: Api, model_id: &str, model_version: Option<String>) -> DeploymentTarget {
        DeploymentTarget {
            api,
            model_id: model_id.to_owned(),
            model_version,
            deployment_id: self.config.deployment_for(model_id).map(str::to_owned),
            resource_group: self.config.resource_group.clone(),
            destination: self.config.destination.clone(),
        }
    }
}

/// Factory for chat and embedding models sharing one backend client factory
#[derive(Clone)]
pub struct Provider {
    inner: Arc<ProviderInner>,
}

impl std::fmt::Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider")
            .field("name", &self.inner.config.name)
            .field("api", &self.inner.config.api)
            .field("cached_strategies", &self.inner.strategies.len())
            .finish_non_exhaustive()
    }
}

impl Provider {
    /// Provider with default configuration
    pub fn new(factory: Arc<dyn ClientFactory>) -> Self {
        Self::from_config(&ProviderConfig::default(), factory)
    }

    /// Provider from a loaded `[provider]` section
    pub fn from_config(config: &ProviderConfig, factory: Arc<dyn ClientFactory>) -> Self {
        tracing::debug!(
            name = %config.name,
            api = ?config.api,
            deployments = config.deployments.len(),
            "provider configured"
        );

        Self {
            inner: Arc::new(ProviderInner {
                defaults: default_settings(&config.defaults),
                config: config.clone(),
                factory,
                strategies: StrategyCache::default(),
            }),
        }
    }

    /// Provider name
    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    /// Chat model `model_id`; `settings` win over the provider defaults
    pub fn chat_model(&self, model_id: impl Into<String>, settings: ModelSettings) -> ChatModel {
        ChatModel {
            model_id: model_id.into(),
            settings: settings.over(&self.inner.defaults),
            provider: Arc::clone(&self.inner),
        }
    }

    /// Embedding model `model_id`
    pub fn embedding_model(&self, model_id: impl Into<String>, settings: EmbeddingSettings) -> EmbeddingModel {
        EmbeddingModel {
            model_id: model_id.into(),
            settings,
            provider: Arc::clone(&self.inner),
        }
    }
}

fn default_settings(config: &DefaultSettingsConfig) -> ModelSettings {
    ModelSettings {
        model_version: config.model_version.clone(),
        model_params: config.model_params.clone(),
        include_reasoning: config.include_reasoning,
        escape_template_placeholders: config.escape_template_placeholders,
        ..ModelSettings::default()
    }
}

/// Chat model bound to a provider
#[derive(Clone)]
pub struct ChatModel {
    pub(crate) model_id: String,
    pub(crate) settings: ModelSettings,
    pub(crate) provider: Arc<ProviderInner>,
}

impl std::fmt::Debug for ChatModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatModel")
            .field("model_id", &self.model_id)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl ChatModel {
    /// Model identifier
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Effective settings after merging provider defaults
    pub const fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    /// Single round trip
    pub async fn generate(&self, options: CallOptions) -> Result<GenerateResult, LlmError> {
        run::generate(self, options).await
    }

    /// Streaming round trip
    pub async fn stream(&self, options: CallOptions) -> Result<StreamResult, LlmError> {
        run::stream(self, options).await
    }
}
