//! Protocol adaptation core for Tandem
//!
//! One canonical generate/stream/embed interface over two backends: the
//! orchestration pipeline service and direct foundation-model chat
//! completions. Requests are converted per backend, native responses and
//! chunks are mapped back to canonical results and events, and every
//! failure is classified into one error taxonomy with retry hints.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod classify;
pub mod client;
pub mod compat;
pub mod convert;
pub mod embedding;
pub mod error;
pub mod params;
pub mod protocol;
pub mod provider;
pub mod strategy;
pub mod stream;
pub mod types;

pub use client::{
    BackendChunk, BackendClient, BackendRequest, BackendResponse, ChunkStream, ClientFactory, DeploymentTarget,
    ResponseError,
};
pub use embedding::{EmbedOptions, EmbeddingModel, EmbeddingResult, EmbeddingSettings, EmbeddingType};
pub use error::{ErrorKind, LlmError, UnifiedError};
pub use provider::{ChatModel, Provider};
pub use tandem_config::Api;
pub use types::{
    CallOptions, CallOverrides, Content, FinishReason, GenerateResult, Message, ModelSettings, Part, StreamEvent,
    StreamResult, UnifiedFinishReason, Usage, Warning,
};
