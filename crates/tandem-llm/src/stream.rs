//! Native chunk sequence to canonical stream events
//!
//! A [`StreamTransformer`] owns all per-call state and turns one chunk at a
//! time into events. [`transform_stream`] drives it as a pull-based stream:
//! each poll awaits the next chunk, racing the abort token.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use futures_util::StreamExt;
use futures_util::stream;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::classify::{ErrorContext, classify};
use crate::client::{BackendChunk, ChunkStream};
use crate::convert::{convert_usage, merge_usage};
use crate::strategy::{NormalizedChunk, Strategy, map_finish_reason, parse_arguments, timestamp};
use crate::types::{EventStream, FinishReason, ProviderMetadata, StreamEvent, Usage, Warning};

/// Per-call stream accumulator
#[derive(Debug, Default)]
struct StreamState {
    finish_reason: Option<FinishReason>,
    usage: Usage,
    metadata: ProviderMetadata,
    saw_first_chunk: bool,
    text_block: Option<String>,
    reasoning_block: Option<String>,
    tools: BTreeMap<u32, ToolCallBuffer>,
}

#[derive(Debug)]
struct ToolCallBuffer {
    id: String,
    name: String,
    arguments: String,
    finished: bool,
}

/// Converts one call's chunks into canonical events
#[derive(Debug)]
pub struct StreamTransformer {
    strategy: Arc<dyn Strategy>,
    warnings: Vec<Warning>,
    include_raw: bool,
    context: ErrorContext,
    state: StreamState,
    unsent_raw: Option<StreamEvent>,
}

impl StreamTransformer {
    /// Transformer for a call served by `strategy`
    pub fn new(
        strategy: Arc<dyn Strategy>,
        warnings: Vec<Warning>,
        include_raw: bool,
        context: ErrorContext,
    ) -> Self {
        let state = StreamState {
            metadata: ProviderMetadata {
                api: strategy.api(),
                ..ProviderMetadata::default()
            },
            ..StreamState::default()
        };

        Self {
            strategy,
            warnings,
            include_raw,
            context,
            state,
            unsent_raw: None,
        }
    }

    /// Opening events
    pub fn start(&mut self) -> Vec<StreamEvent> {
        vec![StreamEvent::StreamStart {
            warnings: std::mem::take(&mut self.warnings),
        }]
    }

    /// Events derived from one native chunk
    ///
    /// # Errors
    ///
    /// Returns an error when the chunk belongs to another backend or starts
    /// a tool call without a name. The chunk's raw event is then held back
    /// for [`fail`](Self::fail).
    pub fn push(&mut self, chunk: BackendChunk) -> anyhow::Result<Vec<StreamEvent>> {
        let raw = if self.include_raw {
            Some(StreamEvent::Raw {
                raw_value: serde_json::to_value(&chunk)?,
            })
        } else {
            None
        };

        match self.convert(chunk) {
            Ok(events) => Ok(raw.into_iter().chain(events).collect()),
            Err(err) => {
                self.unsent_raw = raw;
                Err(err)
            }
        }
    }

    fn convert(&mut self, chunk: BackendChunk) -> anyhow::Result<Vec<StreamEvent>> {
        let mut events = Vec::new();
        let chunk = self.strategy.normalize_chunk(chunk)?;

        if !self.state.saw_first_chunk {
            self.state.saw_first_chunk = true;
            events.push(StreamEvent::ResponseMetadata {
                id: chunk.id.clone().unwrap_or_else(|| Uuid::new_v4().to_string()),
                model_id: chunk.model.clone(),
                timestamp: chunk.created.and_then(timestamp),
            });
        }

        self.absorb_metadata(&chunk);

        if let Some(reasoning) = chunk.reasoning.filter(|r| !r.is_empty()) {
            self.close_text(&mut events);
            let id = open_block(&mut self.state.reasoning_block, &mut events, |id| {
                StreamEvent::ReasoningStart { id }
            });
            events.push(StreamEvent::ReasoningDelta { id, delta: reasoning });
        }

        if let Some(text) = chunk.text.filter(|t| !t.is_empty()) {
            self.close_reasoning(&mut events);
            let id = open_block(&mut self.state.text_block, &mut events, |id| StreamEvent::TextStart { id });
            events.push(StreamEvent::TextDelta { id, delta: text });
        }

        for delta in chunk.tool_calls {
            self.close_text(&mut events);
            self.close_reasoning(&mut events);

            let function = delta.function.unwrap_or_default();
            let fragment = function.arguments.unwrap_or_default();

            match self.state.tools.get_mut(&delta.index) {
                Some(tool) if tool.finished => {
                    tracing::debug!(index = delta.index, "skipping fragment for a finished tool call");
                }
                Some(tool) => {
                    if !fragment.is_empty() {
                        tool.arguments.push_str(&fragment);
                        events.push(StreamEvent::ToolInputDelta {
                            id: tool.id.clone(),
                            delta: fragment,
                        });
                    }
                }
                None => {
                    let Some(name) = function.name else {
                        anyhow::bail!("malformed stream: tool call {} started without a name", delta.index);
                    };
                    let id = delta.id.unwrap_or_else(|| Uuid::new_v4().to_string());

                    events.push(StreamEvent::ToolInputStart {
                        id: id.clone(),
                        tool_name: name.clone(),
                    });
                    if !fragment.is_empty() {
                        events.push(StreamEvent::ToolInputDelta {
                            id: id.clone(),
                            delta: fragment.clone(),
                        });
                    }
                    self.state.tools.insert(
                        delta.index,
                        ToolCallBuffer {
                            id,
                            name,
                            arguments: fragment,
                            finished: false,
                        },
                    );
                }
            }
        }

        if let Some(raw) = chunk.finish_reason.as_deref() {
            self.state.finish_reason = Some(map_finish_reason(Some(raw), self.strategy.finish_reasons()));
            self.flush_tools(&mut events);
        }

        Ok(events)
    }

    /// Closing events after the last chunk
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        self.close_text(&mut events);
        self.close_reasoning(&mut events);
        self.flush_tools(&mut events);

        events.push(StreamEvent::Finish {
            finish_reason: self.state.finish_reason.take().unwrap_or_default(),
            usage: std::mem::take(&mut self.state.usage),
            provider_metadata: self.state.metadata.clone(),
        });
        events
    }

    /// Closing events for a failure: the failed chunk's raw event, if any,
    /// then the terminal error
    pub fn fail(&mut self, err: anyhow::Error) -> Vec<StreamEvent> {
        let error = StreamEvent::Error {
            error: classify(err, &self.context),
        };
        self.unsent_raw.take().into_iter().chain([error]).collect()
    }

    fn absorb_metadata(&mut self, chunk: &NormalizedChunk) {
        let metadata = &mut self.state.metadata;
        if chunk.request_id.is_some() {
            metadata.request_id.clone_from(&chunk.request_id);
        }
        if chunk.system_fingerprint.is_some() {
            metadata.system_fingerprint.clone_from(&chunk.system_fingerprint);
        }
        if chunk.logprobs.is_some() {
            metadata.logprobs.clone_from(&chunk.logprobs);
        }
        if let Some(usage) = &chunk.usage {
            merge_usage(&mut self.state.usage, convert_usage(usage));
        }
    }

    fn close_text(&mut self, events: &mut Vec<StreamEvent>) {
        if let Some(id) = self.state.text_block.take() {
            events.push(StreamEvent::TextEnd { id });
        }
    }

    fn close_reasoning(&mut self, events: &mut Vec<StreamEvent>) {
        if let Some(id) = self.state.reasoning_block.take() {
            events.push(StreamEvent::ReasoningEnd { id });
        }
    }

    fn flush_tools(&mut self, events: &mut Vec<StreamEvent>) {
        for tool in self.state.tools.values_mut().filter(|t| !t.finished) {
            tool.finished = true;
            events.push(StreamEvent::ToolInputEnd { id: tool.id.clone() });
            events.push(StreamEvent::ToolCall {
                tool_call_id: tool.id.clone(),
                tool_name: tool.name.clone(),
                input: parse_arguments(&tool.arguments),
            });
        }
    }
}

fn open_block(
    slot: &mut Option<String>,
    events: &mut Vec<StreamEvent>,
    start: impl FnOnce(String) -> StreamEvent,
) -> String {
    if let Some(id) = slot {
        return id.clone();
    }
    let id = Uuid::new_v4().to_string();
    events.push(start(id.clone()));
    *slot = Some(id.clone());
    id
}

enum Phase {
    Start,
    Running,
    Done,
}

struct Pipeline {
    chunks: ChunkStream,
    transformer: StreamTransformer,
    abort: CancellationToken,
    pending: VecDeque<StreamEvent>,
    phase: Phase,
}

/// Drive `transformer` over `chunks` until a terminal event or abort
///
/// Once `abort` is cancelled no further event is yielded and the chunk
/// stream is dropped.
pub fn transform_stream(chunks: ChunkStream, transformer: StreamTransformer, abort: CancellationToken) -> EventStream {
    let pipeline = Pipeline {
        chunks,
        transformer,
        abort,
        pending: VecDeque::new(),
        phase: Phase::Start,
    };

    Box::pin(stream::unfold(pipeline, |mut p| async move {
        loop {
            if p.abort.is_cancelled() {
                return None;
            }
            if let Some(event) = p.pending.pop_front() {
                return Some((event, p));
            }

            match p.phase {
                Phase::Done => return None,
                Phase::Start => {
                    p.pending.extend(p.transformer.start());
                    p.phase = Phase::Running;
                }
                Phase::Running => {
                    let next = tokio::select! {
                        biased;
                        () = p.abort.cancelled() => return None,
                        next = p.chunks.next() => next,
                    };

                    match next {
                        Some(Ok(chunk)) => match p.transformer.push(chunk) {
                            Ok(events) => p.pending.extend(events),
                            Err(err) => {
                                let events = p.transformer.fail(err);
                                p.pending.extend(events);
                                p.phase = Phase::Done;
                            }
                        },
                        Some(Err(err)) => {
                            let events = p.transformer.fail(err);
                            p.pending.extend(events);
                            p.phase = Phase::Done;
                        }
                        None => {
                            p.pending.extend(p.transformer.finish());
                            p.phase = Phase::Done;
                        }
                    }
                }
            }
        }
    }))
}
