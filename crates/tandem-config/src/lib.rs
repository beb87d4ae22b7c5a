#![allow(clippy::must_use_candidate)]

mod api;
mod env;
mod loader;
pub mod logging;
pub mod provider;

use serde::Deserialize;

pub use api::Api;
pub use env::ExpandError;
pub use logging::*;
pub use provider::*;

/// Top-level Tandem configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Backend provider configuration
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Log output configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}
