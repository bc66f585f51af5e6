//! Tests for deadline-bounded execution, output sanitizing and error
//! classification.

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::json;

use common::{descriptor, Behavior, Invoke, StubRuntime};
use lingua_core::engine::{
    ErrorKind, ExecutorConfig, FormattedRequest, RuntimeError, TranslationError,
    TranslationExecutor, TranslationRequest,
};
use lingua_core::{
    CapacityTier, InferenceRuntime, ModelFamily, ModelRegistry, PipelineHandle, ProgressSink,
};

fn registry() -> Arc<ModelRegistry> {
    let mut descriptors: Vec<_> = ModelRegistry::builtin().iter().cloned().collect();
    descriptors.push(descriptor(
        "chatty",
        "org/chatty",
        ModelFamily::Other("causal-lm".into()),
        CapacityTier::Premium,
    ));
    Arc::new(ModelRegistry::from_descriptors(descriptors).unwrap())
}

fn executor() -> TranslationExecutor {
    TranslationExecutor::new(registry(), ExecutorConfig::default())
}

async fn handle_with(runtime: &StubRuntime, model_id: &str, invoke: Invoke) -> Arc<dyn PipelineHandle> {
    runtime.set(
        model_id,
        Behavior {
            invoke,
            ..Behavior::default()
        },
    );
    runtime
        .load(model_id, &ProgressSink::silent(model_id))
        .await
        .unwrap()
}

fn basic_request(text: &str) -> TranslationRequest {
    TranslationRequest::new(text, "fr", "en", "basic")
}

const BASIC_ID: &str = "Xenova/flan-t5-small";
const PREMIUM_ID: &str = "Xenova/nllb-200-distilled-600M";

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_timeout_returns_promptly_and_does_not_block_others() {
    let runtime = StubRuntime::new();
    let hung = handle_with(&runtime, BASIC_ID, Invoke::Hang).await;
    let healthy = handle_with(
        &runtime,
        PREMIUM_ID,
        Invoke::Reply(json!([{ "translation_text": "Good morning" }])),
    )
    .await;
    let executor = Arc::new(executor());

    let hung_exec = executor.clone();
    let started = Instant::now();
    let timed_out = tokio::spawn(async move {
        hung_exec
            .execute(hung, &basic_request("Bonjour"), Duration::from_millis(100))
            .await
    });

    let other = executor
        .execute(
            healthy,
            &TranslationRequest::new("Bonjour", "fr", "en", "premium"),
            Duration::from_secs(5),
        )
        .await
        .unwrap();
    assert_eq!(other.translated_text, "Good morning");
    assert!(started.elapsed() < Duration::from_millis(100));

    let err = timed_out.await.unwrap().unwrap_err();
    let elapsed = started.elapsed();
    assert!(matches!(err, TranslationError::Timeout(100)));
    assert!(err.is_retryable());
    assert!(elapsed >= Duration::from_millis(100));
    assert!(elapsed <= Duration::from_millis(150), "took {elapsed:?}");
}

#[tokio::test]
async fn test_slow_reply_within_deadline_succeeds() {
    let runtime = StubRuntime::new();
    let handle = handle_with(
        &runtime,
        BASIC_ID,
        Invoke::DelayedReply(Duration::from_millis(20), json!("Hello")),
    )
    .await;
    let result = executor()
        .execute(handle, &basic_request("Bonjour"), Duration::from_millis(500))
        .await
        .unwrap();
    assert_eq!(result.translated_text, "Hello");
    assert_eq!(result.model_used, "basic");
}

#[tokio::test]
async fn test_control_tokens_are_stripped() {
    let runtime = StubRuntime::new();
    let handle = handle_with(
        &runtime,
        BASIC_ID,
        Invoke::Reply(json!([{ "generated_text": "<pad> Hello   world </s>" }])),
    )
    .await;
    let result = executor()
        .execute(handle, &basic_request("Bonjour le monde"), Duration::from_secs(1))
        .await
        .unwrap();
    assert_eq!(result.translated_text, "Hello world");
}

#[tokio::test]
async fn test_corrupted_outputs_are_rejected() {
    let executor = executor();
    let runtime = StubRuntime::new();
    for raw in [
        json!(""),
        json!("   "),
        json!("---"),
        json!("n n n"),
        json!([{ "generated_text": "<pad> </s> <unk>" }]),
        json!([]),
        json!({ "label": "POSITIVE" }),
    ] {
        let handle = handle_with(&runtime, BASIC_ID, Invoke::Reply(raw.clone())).await;
        let err = executor
            .execute(handle, &basic_request("Bonjour"), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptedOutput, "raw output {raw}");
    }
}

#[tokio::test]
async fn test_runtime_failures_are_classified() {
    let executor = executor();
    let runtime = StubRuntime::new();
    let cases = [
        (RuntimeError::Encoding("invalid byte".into()), ErrorKind::Tokenization),
        (RuntimeError::OutOfMemory("4GB".into()), ErrorKind::ResourceExhausted),
        (
            RuntimeError::Failed("CUDA error: out of memory".into()),
            ErrorKind::ResourceExhausted,
        ),
        (
            RuntimeError::Failed("tokenizer failed on input".into()),
            ErrorKind::Tokenization,
        ),
        (RuntimeError::Failed("kernel crashed".into()), ErrorKind::Runtime),
    ];
    for (runtime_err, expected) in cases {
        let handle = handle_with(&runtime, BASIC_ID, Invoke::Fail(runtime_err)).await;
        let err = executor
            .execute(handle, &basic_request("Bonjour"), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), expected);
    }
}

#[tokio::test]
async fn test_unsupported_family_never_invokes_runtime() {
    let runtime = StubRuntime::new();
    let handle = handle_with(&runtime, "org/chatty", Invoke::Reply(json!("Hi"))).await;
    let err = executor()
        .execute(
            handle,
            &TranslationRequest::new("Bonjour", "fr", "en", "chatty"),
            Duration::from_secs(1),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, TranslationError::UnsupportedFamily(ref tag) if tag == "causal-lm"));
    assert!(runtime.requests().is_empty());
}

#[tokio::test]
async fn test_oversized_input_never_invokes_runtime() {
    let runtime = StubRuntime::new();
    let handle = handle_with(&runtime, BASIC_ID, Invoke::Reply(json!("Hi"))).await;
    let err = executor()
        .execute(handle, &basic_request(&"a".repeat(513)), Duration::from_secs(1))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(runtime.requests().is_empty());
}

#[tokio::test]
async fn test_language_pair_request_and_confidence() {
    let runtime = StubRuntime::new();
    let handle = handle_with(
        &runtime,
        PREMIUM_ID,
        Invoke::Reply(json!([{ "translation_text": "Guten Morgen", "score": 0.75 }])),
    )
    .await;
    let result = executor()
        .execute(
            handle,
            &TranslationRequest::new("Good morning", "en", "de", "premium"),
            Duration::from_secs(1),
        )
        .await
        .unwrap();
    assert_eq!(result.translated_text, "Guten Morgen");
    assert_eq!(result.confidence, Some(0.75));

    match &runtime.requests()[0] {
        FormattedRequest::LanguagePair { src_lang, tgt_lang, options, .. } => {
            assert_eq!(src_lang, "eng_Latn");
            assert_eq!(tgt_lang, "deu_Latn");
            assert!(!options.do_sample);
            assert_eq!(options.max_new_tokens, 24);
        }
        other => panic!("unexpected request: {other:?}"),
    }
}
