use thiserror::Error;

use crate::answer::AnswerError;

pub type Result<T> = std::result::Result<T, DocQaError>;

#[derive(Error, Debug)]
pub enum DocQaError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("No document has been indexed; load a document before asking questions")]
    NotReady,

    #[error("Document is empty or contains only whitespace")]
    EmptyDocument,

    #[error(transparent)]
    Answer(#[from] Box<AnswerError>),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod answer;
pub mod batch;
pub mod commands;
pub mod config;
pub mod embeddings;
pub mod generation;
pub mod index;
pub mod loader;
pub mod ollama;
pub mod session;

pub use answer::{AnswerRecord, Answerer, NOT_FOUND_SENTINEL};
pub use batch::{BatchCoordinator, BatchMetrics, BatchResult};
pub use session::{QaSession, SessionSettings};
