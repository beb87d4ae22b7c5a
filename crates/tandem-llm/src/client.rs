//! Seam to the backend transport
//!
//! The transport itself lives outside this crate. A [`ClientFactory`] hands
//! out pre-authenticated [`BackendClient`]s scoped to one deployment; the
//! strategies only build request bodies and interpret what comes back.

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::Stream;
use http::{HeaderMap, StatusCode};
use serde::Serialize;
use tandem_config::Api;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::protocol::chat::{ChatCompletion, ChatCompletionChunk};
use crate::protocol::foundation::{FoundationEmbeddingRequest, FoundationEmbeddingResponse, FoundationRequest};
use crate::protocol::orchestration::{
    OrchestrationEmbeddingRequest, OrchestrationEmbeddingResponse, OrchestrationRequest, OrchestrationResponse,
    OrchestrationStreamChunk,
};

/// Body of a backend call, built fresh per call
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BackendRequest {
    /// Orchestration completion
    Orchestration(OrchestrationRequest),
    /// Foundation-models completion
    FoundationModels(FoundationRequest),
    /// Orchestration embedding
    OrchestrationEmbedding(OrchestrationEmbeddingRequest),
    /// Foundation-models embedding
    FoundationEmbedding(FoundationEmbeddingRequest),
}

impl BackendRequest {
    /// Backend this body targets
    pub const fn api(&self) -> Api {
        match self {
            Self::Orchestration(_) | Self::OrchestrationEmbedding(_) => Api::Orchestration,
            Self::FoundationModels(_) | Self::FoundationEmbedding(_) => Api::FoundationModels,
        }
    }
}

/// Body of a backend response
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BackendResponse {
    /// Orchestration completion
    Orchestration(OrchestrationResponse),
    /// Foundation-models completion
    FoundationModels(ChatCompletion),
    /// Orchestration embedding
    OrchestrationEmbedding(OrchestrationEmbeddingResponse),
    /// Foundation-models embedding
    FoundationEmbedding(FoundationEmbeddingResponse),
}

/// One native streaming chunk
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BackendChunk {
    /// Orchestration chunk
    Orchestration(OrchestrationStreamChunk),
    /// Foundation-models chunk
    FoundationModels(ChatCompletionChunk),
}

/// Native chunk sequence
pub type ChunkStream = Pin<Box<dyn Stream<Item = anyhow::Result<BackendChunk>> + Send>>;

/// Where a client should send its requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentTarget {
    /// Backend
    pub api: Api,
    /// Model the call is for
    pub model_id: String,
    /// Model version
    pub model_version: Option<String>,
    /// Explicit deployment, when configured
    pub deployment_id: Option<String>,
    /// Resource group used to resolve deployments
    pub resource_group: Option<String>,
    /// Destination base URL, when configured
    pub destination: Option<Url>,
}

/// Executes requests against one deployment
#[async_trait]
pub trait BackendClient: Send + Sync {
    /// Send a request and wait for the full response
    async fn execute(&self, request: BackendRequest, abort: CancellationToken) -> anyhow::Result<BackendResponse>;

    /// Send a request and return its native chunk sequence
    async fn execute_stream(&self, request: BackendRequest, abort: CancellationToken) -> anyhow::Result<ChunkStream>;
}

/// Builds clients scoped to a deployment
pub trait ClientFactory: Send + Sync {
    /// Client for `target`
    fn create(&self, target: &DeploymentTarget) -> anyhow::Result<Arc<dyn BackendClient>>;
}

/// HTTP failure reported by a transport
#[derive(Debug, Clone, Error)]
#[error("request failed with status code {}", status.as_u16())]
pub struct ResponseError {
    /// Response status
    pub status: StatusCode,
    /// Response body, if any was read
    pub body: Option<String>,
    /// Response headers
    pub headers: HeaderMap,
    /// Request URL
    pub url: Option<String>,
}

impl ResponseError {
    /// Error with only a status and body
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: Some(body.into()),
            headers: HeaderMap::new(),
            url: None,
        }
    }
}
