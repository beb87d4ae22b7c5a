//! Scripted in-process backend for integration tests
//!
//! Each call pops the next [`Reply`] from the script. Every created client
//! and every request body is recorded so tests can assert what reached
//! the transport, or that nothing did.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;
use tandem_llm::{
    BackendChunk, BackendClient, BackendRequest, BackendResponse, ChunkStream, ClientFactory, DeploymentTarget,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Scripted outcome of one backend call
pub enum Reply {
    /// Full response
    Response(BackendResponse),
    /// Transport or backend failure
    Fail(anyhow::Error),
    /// Chunk sequence played back in order
    Stream(Vec<Step>),
    /// Chunks pushed by the test through a channel
    Channel(mpsc::UnboundedReceiver<anyhow::Result<BackendChunk>>),
    /// Never answers until the call is aborted
    Hang,
}

/// One step of a scripted chunk sequence
pub enum Step {
    /// Yield a chunk
    Chunk(BackendChunk),
    /// Yield an error
    Fail(anyhow::Error),
    /// Stop producing without ending the stream
    Hang,
}

#[derive(Default)]
struct State {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<BackendRequest>>,
    targets: Mutex<Vec<DeploymentTarget>>,
}

/// Client factory and backend in one
#[derive(Clone, Default)]
pub struct MockBackend {
    state: Arc<State>,
}

impl MockBackend {
    /// Empty script
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a reply to the script
    pub fn push(&self, reply: Reply) -> &Self {
        self.state.replies.lock().unwrap().push_back(reply);
        self
    }

    /// Script a channel-fed stream and return its sender
    pub fn push_channel(&self) -> mpsc::UnboundedSender<anyhow::Result<BackendChunk>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.push(Reply::Channel(rx));
        tx
    }

    /// Number of clients the factory created
    pub fn clients_created(&self) -> usize {
        self.state.targets.lock().unwrap().len()
    }

    /// Targets the factory was asked for
    pub fn targets(&self) -> Vec<DeploymentTarget> {
        self.state.targets.lock().unwrap().clone()
    }

    /// Request bodies received
    pub fn requests(&self) -> Vec<BackendRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    /// Last request body as JSON
    pub fn last_body(&self) -> serde_json::Value {
        let requests = self.requests();
        let last = requests.last().expect("no request was sent");
        serde_json::to_value(last).unwrap()
    }

    fn next_reply(&self, request: BackendRequest) -> anyhow::Result<Reply> {
        self.state.requests.lock().unwrap().push(request);
        self.state
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("mock backend has no scripted reply"))
    }
}

impl ClientFactory for MockBackend {
    fn create(&self, target: &DeploymentTarget) -> anyhow::Result<Arc<dyn BackendClient>> {
        self.state.targets.lock().unwrap().push(target.clone());
        Ok(Arc::new(self.clone()))
    }
}

#[async_trait]
impl BackendClient for MockBackend {
    async fn execute(&self, request: BackendRequest, abort: CancellationToken) -> anyhow::Result<BackendResponse> {
        match self.next_reply(request)? {
            Reply::Response(response) => Ok(response),
            Reply::Fail(err) => Err(err),
            Reply::Hang => {
                abort.cancelled().await;
                anyhow::bail!("request cancelled")
            }
            Reply::Stream(_) | Reply::Channel(_) => anyhow::bail!("scripted a stream for a non-streaming call"),
        }
    }

    async fn execute_stream(&self, request: BackendRequest, abort: CancellationToken) -> anyhow::Result<ChunkStream> {
        match self.next_reply(request)? {
            Reply::Stream(steps) => Ok(play(steps)),
            Reply::Channel(rx) => {
                Ok(stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|item| (item, rx)) }).boxed())
            }
            Reply::Fail(err) => Err(err),
            Reply::Hang => {
                abort.cancelled().await;
                anyhow::bail!("request cancelled")
            }
            Reply::Response(_) => anyhow::bail!("scripted a response for a streaming call"),
        }
    }
}

fn play(steps: Vec<Step>) -> ChunkStream {
    stream::unfold(steps.into_iter(), |mut steps| async move {
        match steps.next()? {
            Step::Chunk(chunk) => Some((Ok(chunk), steps)),
            Step::Fail(err) => Some((Err(err), steps)),
            Step::Hang => {
                std::future::pending::<()>().await;
                None
            }
        }
    })
    .boxed()
}
