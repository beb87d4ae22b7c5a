use indexmap::IndexMap;
use serde::Deserialize;
use url::Url;

use crate::Api;

/// Backend provider configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Provider name reported in logs and result metadata
    #[serde(default = "default_name")]
    pub name: String,
    /// Default API for every model of this provider
    #[serde(default)]
    pub api: Option<Api>,
    /// Resource group the deployments live in
    #[serde(default)]
    pub resource_group: Option<String>,
    /// Deployment used when a model has no dedicated entry in `deployments`
    #[serde(default)]
    pub deployment_id: Option<String>,
    /// Model identifier to deployment identifier
    #[serde(default)]
    pub deployments: IndexMap<String, String>,
    /// Destination the backend client resolves its endpoint from
    #[serde(default)]
    pub destination: Option<Url>,
    /// Default model settings applied beneath per-model settings
    #[serde(default)]
    pub defaults: DefaultSettingsConfig,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            api: None,
            resource_group: None,
            deployment_id: None,
            deployments: IndexMap::new(),
            destination: None,
            defaults: DefaultSettingsConfig::default(),
        }
    }
}

impl ProviderConfig {
    /// Deployment for a model, falling back to the provider-wide deployment
    pub fn deployment_for(&self, model_id: &str) -> Option<&str> {
        self.deployments
            .get(model_id)
            .or(self.deployment_id.as_ref())
            .map(String::as_str)
    }
}

/// Default model settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DefaultSettingsConfig {
    /// Model version requested from the backend
    #[serde(default)]
    pub model_version: Option<String>,
    /// Free-form model parameters (`maxTokens`, `temperature`, `n`, ...)
    #[serde(default)]
    pub model_params: serde_json::Map<String, serde_json::Value>,
    /// Forward reasoning parts of the prompt to the backend
    #[serde(default)]
    pub include_reasoning: Option<bool>,
    /// Escape template delimiters in prompt text on templating backends
    #[serde(default)]
    pub escape_template_placeholders: Option<bool>,
}

fn default_name() -> String {
    "tandem".to_owned()
}
