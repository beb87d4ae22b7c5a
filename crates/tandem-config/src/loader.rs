use std::path::Path;

use crate::Config;

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, environment variable
    /// expansion fails, TOML parsing fails, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        let config = Self::parse(&raw)?;
        tracing::debug!(config_path = %path.display(), provider = %config.provider.name, "configuration loaded");

        Ok(config)
    }

    /// Parse and validate configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if expansion, parsing, or validation fails
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let expanded = crate::env::expand_env(raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self = toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error if a deployment identifier is blank or the
    /// destination uses an unsupported scheme
    pub fn validate(&self) -> anyhow::Result<()> {
        self.validate_deployments()?;
        self.validate_destination()?;
        Ok(())
    }

    fn validate_deployments(&self) -> anyhow::Result<()> {
        if self.provider.deployment_id.as_deref().is_some_and(|id| id.trim().is_empty()) {
            anyhow::bail!("provider '{}' has an empty deployment_id", self.provider.name);
        }

        for (model, deployment) in &self.provider.deployments {
            if deployment.trim().is_empty() {
                anyhow::bail!("deployment for model '{model}' must not be empty");
            }
        }

        Ok(())
    }

    fn validate_destination(&self) -> anyhow::Result<()> {
        if let Some(destination) = &self.provider.destination
            && !matches!(destination.scheme(), "http" | "https")
        {
            anyhow::bail!(
                "destination for provider '{}' must be an http(s) URL, got scheme '{}'",
                self.provider.name,
                destination.scheme()
            );
        }

        Ok(())
    }
}
