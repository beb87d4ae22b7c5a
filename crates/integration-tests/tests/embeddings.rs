mod harness;

use harness::fixtures::provider;
use harness::mock_backend::{MockBackend, Reply};
use tandem_llm::embedding::{EmbedOverrides, MAX_EMBEDDINGS_PER_CALL};
use tandem_llm::protocol::embedding::{EmbeddingItem, EmbeddingUsage};
use tandem_llm::protocol::foundation::FoundationEmbeddingResponse;
use tandem_llm::protocol::orchestration::{EmbeddingResult as NativeEmbeddingResult, OrchestrationEmbeddingResponse};
use tandem_llm::{Api, BackendResponse, EmbedOptions, EmbeddingSettings, EmbeddingType, LlmError};

fn values(texts: &[&str]) -> EmbedOptions {
    EmbedOptions {
        values: texts.iter().map(ToString::to_string).collect(),
        ..EmbedOptions::default()
    }
}

fn item(index: usize, value: f32) -> EmbeddingItem {
    EmbeddingItem {
        embedding: vec![value, value],
        index,
    }
}

#[tokio::test]
async fn vectors_come_back_in_input_order() {
    let backend = MockBackend::new();
    backend.push(Reply::Response(BackendResponse::FoundationEmbedding(
        FoundationEmbeddingResponse {
            model: Some("text-embedding-3-small".to_owned()),
            data: vec![item(1, 1.0), item(0, 0.0)],
            usage: Some(EmbeddingUsage {
                prompt_tokens: Some(6),
                total_tokens: Some(6),
            }),
        },
    )));

    let model = provider(Api::FoundationModels, &backend).embedding_model(
        "text-embedding-3-small",
        EmbeddingSettings {
            dimensions: Some(2),
            ..EmbeddingSettings::default()
        },
    );
    let result = model.embed(values(&["first", "second"])).await.unwrap();

    assert_eq!(result.embeddings, vec![vec![0.0, 0.0], vec![1.0, 1.0]]);
    assert_eq!(result.usage.map(|u| u.tokens), Some(6));
    assert_eq!(result.provider_metadata.api, Api::FoundationModels);

    let body = backend.last_body();
    assert_eq!(body["input"][1], "second");
    assert_eq!(body["dimensions"], 2);
    assert_eq!(body["encoding_format"], "float");
}

#[tokio::test]
async fn orchestration_embedding_carries_type() {
    let backend = MockBackend::new();
    backend.push(Reply::Response(BackendResponse::OrchestrationEmbedding(
        OrchestrationEmbeddingResponse {
            request_id: Some("req-e".to_owned()),
            final_result: NativeEmbeddingResult {
                data: vec![item(0, 0.5)],
                usage: None,
            },
        },
    )));

    let model = provider(Api::Orchestration, &backend).embedding_model(
        "text-embedding-3-small",
        EmbeddingSettings {
            embedding_type: Some(EmbeddingType::Document),
            ..EmbeddingSettings::default()
        },
    );
    let options = EmbedOptions {
        provider_options: Some(EmbedOverrides {
            embedding_type: Some(EmbeddingType::Query),
            ..EmbedOverrides::default()
        }),
        ..values(&["where is it"])
    };
    let result = model.embed(options).await.unwrap();

    assert_eq!(result.embeddings.len(), 1);
    assert_eq!(result.provider_metadata.request_id.as_deref(), Some("req-e"));

    let body = backend.last_body();
    assert_eq!(body["input"]["type"], "query");
    assert_eq!(body["input"]["text"][0], "where is it");
    assert_eq!(body["config"]["modules"]["embeddings"]["model"]["name"], "text-embedding-3-small");
}

#[tokio::test]
async fn embedding_type_is_rejected_on_foundation_models() {
    let backend = MockBackend::new();
    let model = provider(Api::FoundationModels, &backend).embedding_model(
        "text-embedding-3-small",
        EmbeddingSettings {
            embedding_type: Some(EmbeddingType::Text),
            ..EmbeddingSettings::default()
        },
    );

    let err = model.embed(values(&["a"])).await.unwrap_err();
    assert!(matches!(err, LlmError::UnsupportedFeature { ref feature, .. } if feature == "embeddingType"));
    assert_eq!(backend.clients_created(), 0);
}

#[tokio::test]
async fn switching_away_from_provider_api_with_type_is_rejected() {
    let backend = MockBackend::new();
    let model = provider(Api::Orchestration, &backend).embedding_model(
        "text-embedding-3-small",
        EmbeddingSettings {
            embedding_type: Some(EmbeddingType::Query),
            ..EmbeddingSettings::default()
        },
    );
    let options = EmbedOptions {
        provider_options: Some(EmbedOverrides {
            api: Some(Api::FoundationModels),
            ..EmbedOverrides::default()
        }),
        ..values(&["a"])
    };

    let err = model.embed(options).await.unwrap_err();
    assert!(matches!(
        err,
        LlmError::ApiSwitch { from_api: Api::Orchestration, to_api: Api::FoundationModels, ref feature }
            if feature == "embeddingType"
    ));
    assert_eq!(backend.clients_created(), 0);
}

#[tokio::test]
async fn oversized_batch_fails_before_any_client() {
    let backend = MockBackend::new();
    let model = provider(Api::Orchestration, &backend)
        .embedding_model("text-embedding-3-small", EmbeddingSettings::default());

    let texts = vec!["x"; MAX_EMBEDDINGS_PER_CALL + 1];
    let err = model.embed(values(&texts)).await.unwrap_err();

    assert!(matches!(
        err,
        LlmError::TooManyEmbeddingValues { max: MAX_EMBEDDINGS_PER_CALL, count } if count == MAX_EMBEDDINGS_PER_CALL + 1
    ));
    assert_eq!(backend.clients_created(), 0);
}

#[tokio::test]
async fn empty_input_skips_the_backend() {
    let backend = MockBackend::new();
    let model = provider(Api::Orchestration, &backend)
        .embedding_model("text-embedding-3-small", EmbeddingSettings::default());

    let result = model.embed(values(&[])).await.unwrap();
    assert!(result.embeddings.is_empty());
    assert_eq!(backend.clients_created(), 0);
}
