//! Native payload builders and provider setup

use std::sync::Arc;

use tandem_config::Config;
use tandem_llm::protocol::chat::{
    ChatChoice, ChatCompletion, ChatCompletionChunk, ChatFunctionCall, ChatResponseMessage, ChatStreamChoice,
    ChatStreamDelta, ChatStreamFunction, ChatStreamToolCall, ChatToolCall, ChatUsage,
};
use tandem_llm::protocol::orchestration::{OrchestrationResponse, OrchestrationStreamChunk};
use tandem_llm::{Api, BackendChunk, BackendResponse, Provider};

use super::mock_backend::MockBackend;

/// Provider whose default API is `api`, backed by `backend`
pub fn provider(api: Api, backend: &MockBackend) -> Provider {
    let toml = format!(
        r#"
        [provider]
        name = "test"
        api = "{api}"
        resource_group = "rg-test"
        deployment_id = "d-default"

        [provider.deployments]
        "gpt-4o" = "d-gpt"
        "#
    );
    let config = Config::parse(&toml).unwrap();
    Provider::from_config(&config.provider, Arc::new(backend.clone()))
}

/// Usage with prompt and completion totals
pub fn usage(prompt: u64, completion: u64) -> ChatUsage {
    ChatUsage {
        prompt_tokens: Some(prompt),
        completion_tokens: Some(completion),
        total_tokens: Some(prompt + completion),
        ..ChatUsage::default()
    }
}

/// Completion with one text choice
pub fn completion(text: &str, finish_reason: &str, usage: Option<ChatUsage>) -> ChatCompletion {
    ChatCompletion {
        id: Some("chatcmpl-1".to_owned()),
        object: Some("chat.completion".to_owned()),
        created: Some(1_700_000_000),
        model: Some("gpt-4o".to_owned()),
        choices: vec![ChatChoice {
            message: ChatResponseMessage {
                role: Some("assistant".to_owned()),
                content: Some(text.to_owned()),
                ..ChatResponseMessage::default()
            },
            finish_reason: Some(finish_reason.to_owned()),
            ..ChatChoice::default()
        }],
        usage,
        ..ChatCompletion::default()
    }
}

/// Completion asking for one tool call
pub fn tool_completion(id: &str, name: &str, arguments: &str) -> ChatCompletion {
    let mut completion = completion("", "tool_calls", None);
    completion.choices[0].message.content = None;
    completion.choices[0].message.tool_calls = Some(vec![ChatToolCall {
        id: id.to_owned(),
        tool_type: "function".to_owned(),
        function: ChatFunctionCall {
            name: name.to_owned(),
            arguments: arguments.to_owned(),
        },
    }]);
    completion
}

/// Response wrapper for `api`
pub fn response(api: Api, completion: ChatCompletion) -> BackendResponse {
    match api {
        Api::Orchestration => BackendResponse::Orchestration(OrchestrationResponse {
            request_id: Some("req-1".to_owned()),
            intermediate_results: None,
            final_result: completion,
        }),
        Api::FoundationModels => BackendResponse::FoundationModels(completion),
    }
}

/// Chunk wrapper for `api`
pub fn chunk(api: Api, chunk: ChatCompletionChunk) -> BackendChunk {
    match api {
        Api::Orchestration => BackendChunk::Orchestration(OrchestrationStreamChunk {
            request_id: Some("req-1".to_owned()),
            intermediate_results: None,
            final_result: Some(chunk),
        }),
        Api::FoundationModels => BackendChunk::FoundationModels(chunk),
    }
}

fn delta_chunk(delta: ChatStreamDelta, finish_reason: Option<&str>) -> ChatCompletionChunk {
    ChatCompletionChunk {
        id: Some("chatcmpl-1".to_owned()),
        model: Some("gpt-4o".to_owned()),
        created: Some(1_700_000_000),
        choices: vec![ChatStreamChoice {
            delta,
            finish_reason: finish_reason.map(str::to_owned),
            ..ChatStreamChoice::default()
        }],
        ..ChatCompletionChunk::default()
    }
}

/// Chunk carrying a text fragment
pub fn text_chunk(api: Api, text: &str) -> BackendChunk {
    chunk(
        api,
        delta_chunk(
            ChatStreamDelta {
                content: Some(text.to_owned()),
                ..ChatStreamDelta::default()
            },
            None,
        ),
    )
}

/// Chunk carrying a tool call fragment
pub fn tool_chunk(api: Api, index: u32, id: Option<&str>, name: Option<&str>, arguments: &str) -> BackendChunk {
    chunk(
        api,
        delta_chunk(
            ChatStreamDelta {
                tool_calls: Some(vec![ChatStreamToolCall {
                    index,
                    id: id.map(str::to_owned),
                    function: Some(ChatStreamFunction {
                        name: name.map(str::to_owned),
                        arguments: Some(arguments.to_owned()),
                    }),
                }]),
                ..ChatStreamDelta::default()
            },
            None,
        ),
    )
}

/// Chunk carrying only a finish reason and optional usage
pub fn finish_chunk(api: Api, finish_reason: &str, usage: Option<ChatUsage>) -> BackendChunk {
    let mut native = delta_chunk(ChatStreamDelta::default(), Some(finish_reason));
    native.usage = usage;
    chunk(api, native)
}
