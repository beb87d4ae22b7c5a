use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Backend completion service a call is routed to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Api {
    /// Orchestration pipeline (templating, filtering, masking, grounding, translation)
    #[default]
    Orchestration,
    /// Direct OpenAI-compatible chat completions against one deployment
    FoundationModels,
}

impl Api {
    /// The backend that is not `self`
    pub const fn other(self) -> Self {
        match self {
            Self::Orchestration => Self::FoundationModels,
            Self::FoundationModels => Self::Orchestration,
        }
    }
}
