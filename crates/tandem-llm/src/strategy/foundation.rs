use anyhow::bail;
use serde_json::Value;
use tandem_config::Api;

use super::finish::{FOUNDATION_FINISH, FinishTable};
use super::{MappedResponse, NormalizedChunk, PreparedCall, Strategy, map_completion};
use crate::client::{BackendChunk, BackendRequest, BackendResponse};
use crate::convert::{convert_tools, response_format_value, tool_choice_value};
use crate::params::{FOUNDATION_PARAMS, ParamTable};
use crate::protocol::foundation::{FoundationRequest, StreamOptions};

/// Direct chat completions backend
#[derive(Debug, Clone, Copy, Default)]
pub struct FoundationModelsStrategy;

impl Strategy for FoundationModelsStrategy {
    fn api(&self) -> Api {
        Api::FoundationModels
    }

    fn param_table(&self) -> &'static ParamTable {
        &FOUNDATION_PARAMS
    }

    fn finish_reasons(&self) -> FinishTable {
        FOUNDATION_FINISH
    }

    fn build_request(&self, call: &PreparedCall, stream: bool) -> BackendRequest {
        let features = &call.foundation;
        let mut params = call.params.clone();

        // canonical options already mapped win over the feature values
        if let Some(seed) = features.seed {
            params.entry("seed").or_insert_with(|| Value::from(seed));
        }
        if let Some(stop) = &features.stop {
            params.entry("stop").or_insert_with(|| Value::from(stop.clone()));
        }

        tracing::debug!(
            api = %Api::FoundationModels,
            model = %call.model_id,
            messages = call.messages.len(),
            stream,
            "building foundation-models request"
        );

        BackendRequest::FoundationModels(FoundationRequest {
            messages: call.messages.clone(),
            params,
            tools: (!call.tools.is_empty()).then(|| convert_tools(&call.tools)),
            tool_choice: call.tool_choice.as_ref().map(tool_choice_value),
            response_format: call.response_format.as_ref().map(response_format_value),
            stream: stream.then_some(true),
            stream_options: stream.then_some(StreamOptions { include_usage: true }),
            data_sources: features.data_sources.clone(),
            logprobs: features.logprobs,
            top_logprobs: features.top_logprobs,
            logit_bias: features.logit_bias.clone(),
            user: features.user.clone(),
        })
    }

    fn map_response(&self, response: BackendResponse) -> anyhow::Result<MappedResponse> {
        let BackendResponse::FoundationModels(completion) = response else {
            bail!("malformed response: expected a foundation-models completion");
        };

        let body = serde_json::to_value(&completion)?;
        Ok(map_completion(&completion, body, None, FOUNDATION_FINISH))
    }

    fn normalize_chunk(&self, chunk: BackendChunk) -> anyhow::Result<NormalizedChunk> {
        let BackendChunk::FoundationModels(chunk) = chunk else {
            bail!("malformed stream chunk: expected a foundation-models chunk");
        };

        Ok(NormalizedChunk::from_chat(chunk))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::protocol::chat::{ChatChoice, ChatCompletion, ChatFunctionCall, ChatResponseMessage, ChatToolCall};
    use crate::strategy::prepare_call;
    use crate::types::{
        CallOptions, CallOverrides, Content, FoundationFeatures, Message, ModelSettings, ToolChoice,
        UnifiedFinishReason,
    };

    fn body(options: &CallOptions, stream: bool) -> Value {
        let call = prepare_call(&FoundationModelsStrategy, "gpt-4o", &ModelSettings::default(), options).unwrap();
        serde_json::to_value(FoundationModelsStrategy.build_request(&call, stream)).unwrap()
    }

    #[test]
    fn exclusive_features_reach_the_body() {
        let options = CallOptions {
            tool_choice: Some(ToolChoice::Required),
            provider_options: Some(CallOverrides {
                foundation: FoundationFeatures {
                    logprobs: Some(true),
                    top_logprobs: Some(3),
                    user: Some("u-1".to_owned()),
                    data_sources: Some(vec![json!({"type": "search"})]),
                    ..FoundationFeatures::default()
                },
                ..CallOverrides::default()
            }),
            ..CallOptions::with_prompt(vec![Message::user("hi")])
        };

        let body = body(&options, true);
        assert_eq!(body["logprobs"], true);
        assert_eq!(body["top_logprobs"], 3);
        assert_eq!(body["user"], "u-1");
        assert_eq!(body["data_sources"][0]["type"], "search");
        assert_eq!(body["tool_choice"], "required");
        assert_eq!(body["stream"], true);
        assert_eq!(body["stream_options"]["include_usage"], true);
    }

    #[test]
    fn feature_seed_and_stop_fill_gaps_only() {
        let overrides = CallOverrides {
            foundation: FoundationFeatures {
                seed: Some(1),
                stop: Some(vec!["A".to_owned()]),
                ..FoundationFeatures::default()
            },
            ..CallOverrides::default()
        };

        let options = CallOptions {
            seed: Some(99),
            provider_options: Some(overrides),
            ..CallOptions::with_prompt(vec![Message::user("hi")])
        };
        let body = body(&options, false);
        assert_eq!(body["seed"], 99);
        assert_eq!(body["stop"], json!(["A"]));
        assert!(body.get("stream").is_none());
    }

    #[test]
    fn tool_calls_parse_arguments() {
        let completion = ChatCompletion {
            choices: vec![ChatChoice {
                message: ChatResponseMessage {
                    reasoning_content: Some("thinking".to_owned()),
                    tool_calls: Some(vec![
                        ChatToolCall {
                            id: "call_1".to_owned(),
                            tool_type: "function".to_owned(),
                            function: ChatFunctionCall {
                                name: "weather".to_owned(),
                                arguments: r#"{"city":"Oslo"}"#.to_owned(),
                            },
                        },
                        ChatToolCall {
                            id: "call_2".to_owned(),
                            tool_type: "function".to_owned(),
                            function: ChatFunctionCall {
                                name: "echo".to_owned(),
                                arguments: "not json".to_owned(),
                            },
                        },
                    ]),
                    ..ChatResponseMessage::default()
                },
                finish_reason: Some("tool_calls".to_owned()),
                logprobs: Some(json!({"content": []})),
                ..ChatChoice::default()
            }],
            system_fingerprint: Some("fp_1".to_owned()),
            ..ChatCompletion::default()
        };

        let mapped = FoundationModelsStrategy
            .map_response(BackendResponse::FoundationModels(completion))
            .unwrap();

        assert_eq!(
            mapped.content,
            vec![
                Content::Reasoning {
                    text: "thinking".to_owned()
                },
                Content::ToolCall {
                    tool_call_id: "call_1".to_owned(),
                    tool_name: "weather".to_owned(),
                    input: json!({"city": "Oslo"}),
                },
                Content::ToolCall {
                    tool_call_id: "call_2".to_owned(),
                    tool_name: "echo".to_owned(),
                    input: json!("not json"),
                },
            ]
        );
        assert_eq!(mapped.finish_reason.unified, UnifiedFinishReason::ToolCalls);
        assert_eq!(mapped.system_fingerprint.as_deref(), Some("fp_1"));
        assert!(mapped.logprobs.is_some());
        assert_eq!(mapped.usage.total_tokens(), None);
    }
}
