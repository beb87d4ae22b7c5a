use anyhow::bail;
use tandem_config::Api;

use super::finish::{FinishTable, ORCHESTRATION_FINISH};
use super::{MappedResponse, NormalizedChunk, PreparedCall, Strategy, map_completion};
use crate::client::{BackendChunk, BackendRequest, BackendResponse};
use crate::convert::{convert_tools, response_format_value};
use crate::params::{ORCHESTRATION_PARAMS, ParamTable};
use crate::protocol::orchestration::{
    ModelSpec, ModuleConfig, OrchestrationConfig, OrchestrationRequest, Prompt, PromptTemplating, StreamConfig,
};
use crate::types::{ToolChoice, Warning};

/// Orchestration pipeline backend
#[derive(Debug, Clone, Copy, Default)]
pub struct OrchestrationStrategy;

impl Strategy for OrchestrationStrategy {
    fn api(&self) -> Api {
        Api::Orchestration
    }

    fn param_table(&self) -> &'static ParamTable {
        &ORCHESTRATION_PARAMS
    }

    fn finish_reasons(&self) -> FinishTable {
        ORCHESTRATION_FINISH
    }

    fn escapes_by_default(&self) -> bool {
        true
    }

    fn resolve_tool_choice(&self, choice: Option<&ToolChoice>, warnings: &mut Vec<Warning>) -> Option<ToolChoice> {
        match choice {
            None | Some(ToolChoice::Auto) => None,
            Some(other) => {
                warnings.push(Warning::unsupported(
                    "toolChoice",
                    format!("the orchestration API only honors 'auto'; {other:?} was ignored"),
                ));
                None
            }
        }
    }

    fn ignored_inputs(&self, call: &PreparedCall) -> Vec<Warning> {
        if call.orchestration.prompt_template_ref.is_none() {
            return Vec::new();
        }

        let mut warnings = Vec::new();
        if !call.tools.is_empty() {
            warnings.push(Warning::unsupported(
                "tools",
                "tools are ignored when a prompt template reference is used; define them in the template",
            ));
        }
        if call.response_format.is_some() {
            warnings.push(Warning::unsupported(
                "responseFormat",
                "the response format is ignored when a prompt template reference is used; define it in the template",
            ));
        }
        warnings
    }

    fn build_request(&self, call: &PreparedCall, stream: bool) -> BackendRequest {
        let features = &call.orchestration;

        let (prompt, messages_history) = match &features.prompt_template_ref {
            Some(template_ref) => (
                Prompt::Reference {
                    template_ref: template_ref.clone(),
                },
                (!call.messages.is_empty()).then(|| call.messages.clone()),
            ),
            None => (
                Prompt::Template {
                    template: call.messages.clone(),
                    tools: (!call.tools.is_empty()).then(|| convert_tools(&call.tools)),
                    response_format: call.response_format.as_ref().map(response_format_value),
                },
                None,
            ),
        };

        tracing::debug!(
            api = %Api::Orchestration,
            model = %call.model_id,
            messages = call.messages.len(),
            stream,
            "building orchestration request"
        );

        BackendRequest::Orchestration(OrchestrationRequest {
            config: OrchestrationConfig {
                modules: ModuleConfig {
                    prompt_templating: PromptTemplating {
                        prompt,
                        model: ModelSpec {
                            name: call.model_id.clone(),
                            version: call.model_version.clone(),
                            params: call.params.clone(),
                        },
                    },
                    filtering: features.filtering.clone(),
                    masking: features.masking.clone(),
                    grounding: features.grounding.clone(),
                    translation: features.translation.clone(),
                },
                stream: stream.then_some(StreamConfig { enabled: true }),
            },
            placeholder_values: features.placeholder_values.clone(),
            messages_history,
        })
    }

    fn map_response(&self, response: BackendResponse) -> anyhow::Result<MappedResponse> {
        let BackendResponse::Orchestration(response) = response else {
            bail!("malformed response: expected an orchestration completion");
        };

        let body = serde_json::to_value(&response)?;
        Ok(map_completion(
            &response.final_result,
            body,
            response.request_id.clone(),
            ORCHESTRATION_FINISH,
        ))
    }

    fn normalize_chunk(&self, chunk: BackendChunk) -> anyhow::Result<NormalizedChunk> {
        let BackendChunk::Orchestration(chunk) = chunk else {
            bail!("malformed stream chunk: expected an orchestration chunk");
        };

        let mut normalized = chunk.final_result.map(NormalizedChunk::from_chat).unwrap_or_default();
        normalized.request_id = chunk.request_id;
        Ok(normalized)
    }
}
