//! Canonical, backend-agnostic types
//!
//! Callers build requests from these and receive results in them; the
//! wire formats in [`crate::protocol`] convert to and from this layer.

pub mod message;
pub mod options;
pub mod result;
pub mod settings;
pub mod stream;
pub mod tool;

pub use message::{Message, Part, Role, ToolOutput};
pub use options::{CallOptions, OptionKey};
pub use result::{
    Content, FinishReason, GenerateResult, InputTokens, OutputTokens, ProviderMetadata, RequestEcho, ResponseEcho,
    UnifiedFinishReason, Usage, Warning,
};
pub use settings::{CallOverrides, FoundationFeatures, ModelSettings, OrchestrationFeatures, TemplateRef};
pub use stream::{EventStream, StreamEvent, StreamResult};
pub use tool::{ResponseFormat, ToolChoice, ToolDefinition};
