mod harness;

use harness::fixtures::provider;
use harness::mock_backend::MockBackend;
use serde_json::json;
use tandem_llm::types::{FoundationFeatures, OrchestrationFeatures, Role};
use tandem_llm::{Api, CallOptions, CallOverrides, ErrorKind, LlmError, Message, ModelSettings, Part};

fn hello() -> CallOptions {
    CallOptions::with_prompt(vec![Message::user("Hello")])
}

#[tokio::test]
async fn foreign_feature_fails_before_any_client() {
    let backend = MockBackend::new();
    let model = provider(Api::FoundationModels, &backend).chat_model(
        "gpt-4o",
        ModelSettings {
            orchestration: OrchestrationFeatures {
                masking: Some(json!({"masking_providers": []})),
                ..OrchestrationFeatures::default()
            },
            ..ModelSettings::default()
        },
    );

    let err = model.generate(hello()).await.unwrap_err();
    match err {
        LlmError::UnsupportedFeature {
            feature,
            api,
            suggested_api,
        } => {
            assert_eq!(feature, "masking");
            assert_eq!(api, Api::FoundationModels);
            assert_eq!(suggested_api, Api::Orchestration);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(backend.clients_created(), 0);

    let err = model.stream(hello()).await.unwrap_err();
    assert!(matches!(err, LlmError::UnsupportedFeature { .. }));
    assert_eq!(backend.clients_created(), 0);
}

#[tokio::test]
async fn call_level_foreign_feature_is_rejected() {
    let backend = MockBackend::new();
    let model = provider(Api::Orchestration, &backend).chat_model("gpt-4o", ModelSettings::default());

    let options = CallOptions {
        provider_options: Some(CallOverrides {
            foundation: FoundationFeatures {
                logprobs: Some(true),
                ..FoundationFeatures::default()
            },
            ..CallOverrides::default()
        }),
        ..hello()
    };

    let err = model.generate(options).await.unwrap_err();
    assert!(matches!(
        err,
        LlmError::UnsupportedFeature { ref feature, api: Api::Orchestration, suggested_api: Api::FoundationModels }
            if feature == "logprobs"
    ));
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn switching_api_away_from_model_features_is_rejected() {
    let backend = MockBackend::new();
    let model = provider(Api::Orchestration, &backend).chat_model(
        "gpt-4o",
        ModelSettings {
            api: Some(Api::Orchestration),
            orchestration: OrchestrationFeatures {
                filtering: Some(json!({})),
                ..OrchestrationFeatures::default()
            },
            ..ModelSettings::default()
        },
    );

    let options = CallOptions {
        provider_options: Some(CallOverrides {
            api: Some(Api::FoundationModels),
            ..CallOverrides::default()
        }),
        ..hello()
    };

    let err = model.generate(options).await.unwrap_err();
    assert!(matches!(
        err,
        LlmError::ApiSwitch { from_api: Api::Orchestration, to_api: Api::FoundationModels, ref feature }
            if feature == "filtering"
    ));
    assert!(err.to_string().contains("filtering"));
    assert_eq!(backend.clients_created(), 0);
}

#[tokio::test]
async fn switching_away_from_the_provider_api_is_rejected() {
    let backend = MockBackend::new();
    let model = provider(Api::Orchestration, &backend).chat_model(
        "gpt-4o",
        ModelSettings {
            orchestration: OrchestrationFeatures {
                filtering: Some(json!({})),
                ..OrchestrationFeatures::default()
            },
            ..ModelSettings::default()
        },
    );

    let options = CallOptions {
        provider_options: Some(CallOverrides {
            api: Some(Api::FoundationModels),
            ..CallOverrides::default()
        }),
        ..hello()
    };

    let err = model.stream(options).await.unwrap_err();
    assert!(matches!(
        err,
        LlmError::ApiSwitch { from_api: Api::Orchestration, to_api: Api::FoundationModels, ref feature }
            if feature == "filtering"
    ));
    assert_eq!(backend.clients_created(), 0);
}

#[tokio::test]
async fn file_parts_are_configuration_errors() {
    let backend = MockBackend::new();
    let model = provider(Api::FoundationModels, &backend).chat_model("gpt-4o", ModelSettings::default());

    let options = CallOptions::with_prompt(vec![Message {
        role: Role::User,
        content: vec![Part::File {
            url: "https://example.com/report.pdf".to_owned(),
            media_type: "application/pdf".to_owned(),
        }],
    }]);

    let err = model.generate(options).await.unwrap_err();
    let unified = err.as_unified().unwrap();
    assert_eq!(unified.kind, ErrorKind::AuthenticationOrConfig);
    assert!(!unified.retryable);
    assert_eq!(unified.model_id.as_deref(), Some("gpt-4o"));

    let diagnostics = unified.diagnostics.as_deref().unwrap();
    assert_eq!(diagnostics.operation, "generate");
    assert_eq!(diagnostics.request_summary.unwrap().message_count, 1);
    assert_eq!(backend.clients_created(), 0);
}
