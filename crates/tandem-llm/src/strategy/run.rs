//! Shared call skeleton for both backends
//!
//! resolve api, validate, prepare, check abort, build, create client,
//! execute, map. Failures after validation pass the classifier once.

use std::sync::Arc;

use tandem_config::Api;
use tokio_util::sync::CancellationToken;

use super::{PreparedCall, Strategy, prepare_call, redacted_echo, resolve_api, validate_settings};
use crate::classify::{ErrorContext, classify};
use crate::client::{BackendClient, BackendRequest};
use crate::error::{LlmError, RequestSummary};
use crate::provider::ChatModel;
use crate::stream::{StreamTransformer, transform_stream};
use crate::types::{CallOptions, GenerateResult, ProviderMetadata, RequestEcho, StreamResult};

struct Dispatch {
    api: Api,
    strategy: Arc<dyn Strategy>,
    call: PreparedCall,
    request: BackendRequest,
    echo: RequestEcho,
    client: Arc<dyn BackendClient>,
    abort: CancellationToken,
    context: ErrorContext,
}

fn dispatch(
    model: &ChatModel,
    options: &CallOptions,
    operation: &'static str,
    stream: bool,
) -> Result<Dispatch, LlmError> {
    let provider = &model.provider;
    let overrides = options.provider_options.as_ref();

    let model_api = resolve_api(provider.config.api, model.settings.api, None);
    let api = resolve_api(provider.config.api, model.settings.api, overrides.and_then(|o| o.api));
    validate_settings(api, model_api, &model.settings, overrides)?;

    let mut context = ErrorContext::new(operation, api, model.model_id.as_str());
    context.summary = Some(RequestSummary::of(&options.prompt, &options.tools));
    context.url = provider.config.destination.as_ref().map(ToString::to_string);

    let strategy = provider.strategies.get(&model.model_id, api);
    let call = prepare_call(strategy.as_ref(), &model.model_id, &model.settings, options)
        .map_err(|e| classify(anyhow::Error::new(e), &context))?;

    let abort = options.abort_token();
    if abort.is_cancelled() {
        tracing::debug!(operation, model = %model.model_id, "call aborted before dispatch");
        return Err(LlmError::Aborted);
    }

    let request = strategy.build_request(&call, stream);
    let echo = redacted_echo(&request);

    let target = provider.target(api, &model.model_id, call.model_version.clone());
    let client = provider.factory.create(&target).map_err(|e| classify(e, &context))?;

    tracing::debug!(
        operation,
        api = %api,
        model = %model.model_id,
        deployment = ?target.deployment_id,
        warnings = call.warnings.len(),
        "dispatching backend call"
    );

    Ok(Dispatch {
        api,
        strategy,
        call,
        request,
        echo,
        client,
        abort,
        context,
    })
}

pub(crate) async fn generate(model: &ChatModel, options: CallOptions) -> Result<GenerateResult, LlmError> {
    let Dispatch {
        api,
        strategy,
        call,
        request,
        echo,
        client,
        abort,
        context,
    } = dispatch(model, &options, "generate", false)?;

    let response = tokio::select! {
        biased;
        () = abort.cancelled() => return Err(LlmError::Aborted),
        response = client.execute(request, abort.clone()) => response,
    };

    let mapped = response
        .and_then(|response| strategy.map_response(response))
        .map_err(|e| classify(e, &context))?;

    Ok(GenerateResult {
        content: mapped.content,
        finish_reason: mapped.finish_reason,
        usage: mapped.usage,
        provider_metadata: ProviderMetadata {
            api,
            request_id: mapped.request_id,
            system_fingerprint: mapped.system_fingerprint,
            logprobs: mapped.logprobs,
        },
        request: echo,
        response: mapped.response,
        warnings: call.warnings,
    })
}

pub(crate) async fn stream(model: &ChatModel, options: CallOptions) -> Result<StreamResult, LlmError> {
    let Dispatch {
        strategy,
        call,
        request,
        echo,
        client,
        abort,
        context,
        ..
    } = dispatch(model, &options, "stream", true)?;

    let chunks = tokio::select! {
        biased;
        () = abort.cancelled() => return Err(LlmError::Aborted),
        chunks = client.execute_stream(request, abort.clone()) => chunks,
    }
    .map_err(|e| classify(e, &context))?;

    let transformer = StreamTransformer::new(strategy, call.warnings, options.include_raw_chunks, context);

    Ok(StreamResult {
        events: transform_stream(chunks, transformer, abort),
        request: echo,
    })
}
