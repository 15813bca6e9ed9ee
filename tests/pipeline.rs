#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// End-to-end tests of load -> chunk -> index -> answer with deterministic
// capabilities standing in for Ollama

mod common;

use std::fs;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use common::{HashingEmbedder, ScriptedModel};
use doc_qa::batch::{ERROR_PREFIX, QuestionOutcome};
use doc_qa::config::LimitsConfig;
use doc_qa::embeddings::ChunkingConfig;
use doc_qa::loader::{load_document_file, load_questions_file};
use doc_qa::{DocQaError, NOT_FOUND_SENTINEL, QaSession, SessionSettings};
use tempfile::TempDir;
use tracing::info;

const GEOGRAPHY: &str = "Paris is the capital of France. \
                         Berlin is the capital of Germany. \
                         Mount Everest is the highest mountain on Earth.";

fn init_test_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init()
        .ok();
}

fn geography_model() -> ScriptedModel {
    ScriptedModel::new(vec![("France", "Paris"), ("Germany", "Berlin")])
}

fn session(settings: SessionSettings) -> (QaSession, Arc<HashingEmbedder>, Arc<ScriptedModel>) {
    let embedder = Arc::new(HashingEmbedder::default());
    let model = Arc::new(geography_model());
    let session = QaSession::new(embedder.clone(), model.clone(), settings);
    (session, embedder, model)
}

fn questions(items: &[&str]) -> Vec<String> {
    items.iter().map(|q| (*q).to_string()).collect()
}

#[tokio::test]
async fn answers_grounded_and_unanswerable_questions() {
    init_test_tracing();
    let (mut session, embedder, _) = session(SessionSettings::default());

    let stats = session
        .load_document(GEOGRAPHY)
        .await
        .expect("document should load");
    assert_eq!(stats.num_chunks, 1);
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);

    let answers = session
        .answer_questions(&questions(&[
            "What is the capital of France?",
            "What is the population of Mars?",
        ]))
        .await
        .expect("answering should succeed");

    info!("Answers: {:?}", answers);
    assert_eq!(answers["What is the capital of France?"], "Paris");
    assert_eq!(answers["What is the population of Mars?"], NOT_FOUND_SENTINEL);

    let result = session.last_result().expect("result should be kept");
    let found: Vec<bool> = result
        .outcomes()
        .map(|(_, outcome)| match outcome {
            QuestionOutcome::Answered(record) => record.found,
            QuestionOutcome::Failed(_) => panic!("no question should fail"),
        })
        .collect();
    assert_eq!(found, vec![true, false]);
    assert_eq!(session.last_token_usage().total_tokens, 110);
}

#[tokio::test]
async fn retrieval_picks_the_relevant_chunk() {
    init_test_tracing();
    let settings = SessionSettings {
        chunking: ChunkingConfig::new(40, 5),
        top_k: 1,
        ..SessionSettings::default()
    };
    let (mut session, _, _) = session(settings);

    let stats = session
        .load_document(GEOGRAPHY)
        .await
        .expect("document should load");
    assert!(stats.num_chunks >= 3);

    let answers = session
        .answer_questions(&questions(&[
            "What is the capital of France?",
            "What is the capital of Germany?",
        ]))
        .await
        .expect("answering should succeed");

    assert_eq!(answers["What is the capital of France?"], "Paris");
    assert_eq!(answers["What is the capital of Germany?"], "Berlin");

    for (_, outcome) in session.last_result().expect("result").outcomes() {
        if let QuestionOutcome::Answered(record) = outcome {
            assert_eq!(record.source_count, 1);
        }
    }
}

#[tokio::test]
async fn partial_failure_keeps_other_answers() {
    init_test_tracing();
    let (mut session, _, model) = session(SessionSettings::default());
    session
        .load_document(GEOGRAPHY)
        .await
        .expect("document should load");

    let answers = session
        .answer_questions(&questions(&[
            "What is the capital of France?",
            "Can you explode?",
            "What is the capital of Germany?",
        ]))
        .await
        .expect("batch should complete");

    assert_eq!(answers.len(), 3);
    assert_eq!(answers["What is the capital of France?"], "Paris");
    assert_eq!(answers["What is the capital of Germany?"], "Berlin");
    assert!(answers["Can you explode?"].starts_with(ERROR_PREFIX));
    assert_eq!(model.calls.load(Ordering::SeqCst), 3);

    let metrics = session.last_metrics().expect("metrics");
    assert_eq!(metrics.total_questions, 3);
    assert_eq!(metrics.successful_answers, 2);
    assert_eq!(metrics.failed_answers, 1);
    assert_eq!(metrics.total_tokens(), 110);
}

#[tokio::test]
async fn duplicate_questions_are_all_computed() {
    let (mut session, _, model) = session(SessionSettings::default());
    session
        .load_document(GEOGRAPHY)
        .await
        .expect("document should load");

    let answers = session
        .answer_questions(&questions(&[
            "What is the capital of France?",
            "What is the capital of France?",
        ]))
        .await
        .expect("answering should succeed");

    assert_eq!(answers.len(), 1);
    assert_eq!(model.calls.load(Ordering::SeqCst), 2);
    assert_eq!(session.last_token_usage().total_tokens, 110);
}

#[tokio::test]
async fn questions_before_document_are_rejected() {
    let (mut session, _, model) = session(SessionSettings::default());

    let result = session
        .answer_questions(&questions(&["What is the capital of France?"]))
        .await;

    assert!(matches!(result, Err(DocQaError::NotReady)));
    assert_eq!(model.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn empty_document_is_rejected() {
    let (mut session, embedder, _) = session(SessionSettings::default());

    let result = session.load_document(" \n\n ").await;

    assert!(matches!(result, Err(DocQaError::EmptyDocument)));
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn files_through_the_pipeline() {
    init_test_tracing();
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let limits = LimitsConfig::default();

    let document_path = temp_dir.path().join("document.json");
    fs::write(
        &document_path,
        r#"{"title": "Atlas", "content": "Paris is the capital of France."}"#,
    )
    .expect("Failed to write document");

    let questions_path = temp_dir.path().join("questions.json");
    fs::write(
        &questions_path,
        r#"[{"question": "What is the capital of France?"}, {"question": "Who won the 1998 World Cup?"}]"#,
    )
    .expect("Failed to write questions");

    let document = load_document_file(&document_path, &limits).expect("document should load");
    let questions = load_questions_file(&questions_path, &limits).expect("questions should load");

    let (mut session, _, _) = session(SessionSettings::default());
    session
        .load_document(&document)
        .await
        .expect("document should index");
    let answers = session
        .answer_questions(&questions)
        .await
        .expect("answering should succeed");

    assert_eq!(answers["What is the capital of France?"], "Paris");
    assert_eq!(answers["Who won the 1998 World Cup?"], NOT_FOUND_SENTINEL);
}

#[tokio::test]
async fn blank_json_content_is_an_empty_document() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let document_path = temp_dir.path().join("document.json");
    fs::write(&document_path, r#"{"content": "   "}"#).expect("Failed to write document");

    let document =
        load_document_file(&document_path, &LimitsConfig::default()).expect("file should load");
    let (mut session, _, _) = session(SessionSettings::default());

    assert!(matches!(
        session.load_document(&document).await,
        Err(DocQaError::EmptyDocument)
    ));
}
