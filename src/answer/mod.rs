//! Single-question answering
//!
//! Retrieves context for one question, asks the language model for a grounded
//! answer and classifies whether the answer was found in the document.


pub mod prompt;

use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, error};

use crate::DocQaError;
use crate::generation::{LanguageModel, TokenUsage, UsageTracker};
use crate::index::{DEFAULT_TOP_K, VectorIndex};

pub use prompt::build_prompt;

/// Exact reply the model is instructed to give when the context has no answer
pub const NOT_FOUND_SENTINEL: &str = "Information not found in the provided documents.";

/// Answer text used when the model returns nothing
pub const NO_ANSWER_TEXT: &str = "Unable to generate answer";

const NOT_FOUND_PHRASE: &str = "not found in the provided documents";

/// Default bound on a single model call
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Outcome of answering one question
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerRecord {
    pub question: String,
    pub text: String,
    /// Whether the answer is grounded in the document
    pub found: bool,
    /// Number of chunks supplied as context
    pub source_count: usize,
    pub elapsed: Duration,
    pub usage: TokenUsage,
}

#[derive(Debug, Error)]
pub enum AnswerFailure {
    #[error("{0}")]
    Retrieval(DocQaError),
    #[error("{0:#}")]
    Model(anyhow::Error),
    #[error("Language model did not respond within {0:?}")]
    Timeout(Duration),
    #[error("Answer task failed: {0}")]
    Task(String),
}

/// A question that could not be answered
#[derive(Debug, Error)]
#[error("{failure}")]
pub struct AnswerError {
    pub question: String,
    pub elapsed: Duration,
    pub failure: AnswerFailure,
}

impl From<AnswerError> for DocQaError {
    #[inline]
    fn from(error: AnswerError) -> Self {
        Self::Answer(Box::new(error))
    }
}

/// Whether a model response counts as a grounded answer.
///
/// Empty responses, the exact sentinel and any response containing the
/// "not found in the provided documents" phrase (case-insensitive) are not.
#[inline]
pub fn is_found(text: &str) -> bool {
    let text = text.trim();
    if text.is_empty() || text == NOT_FOUND_SENTINEL {
        return false;
    }
    !text.to_lowercase().contains(NOT_FOUND_PHRASE)
}

pub struct Answerer {
    model: Arc<dyn LanguageModel>,
    top_k: usize,
    timeout: Duration,
}

impl Answerer {
    #[inline]
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            model,
            top_k: DEFAULT_TOP_K,
            timeout: DEFAULT_GENERATION_TIMEOUT,
        }
    }

    #[inline]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[inline]
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Answer one question against `index`.
    ///
    /// The model is called once; failures and timeouts are returned to the
    /// caller without retrying.
    #[inline]
    pub async fn answer(
        &self,
        index: &VectorIndex,
        question: &str,
    ) -> Result<AnswerRecord, AnswerError> {
        let started = Instant::now();
        let fail = |failure: AnswerFailure| {
            let elapsed = started.elapsed();
            error!(
                question,
                error = %failure,
                response_time_seconds = elapsed.as_secs_f64(),
                "Error answering question"
            );
            AnswerError {
                question: question.to_string(),
                elapsed,
                failure,
            }
        };

        let context = index
            .query(question, self.top_k)
            .await
            .map_err(|e| fail(AnswerFailure::Retrieval(e)))?;

        let prompt = build_prompt(&context, question);
        let mut tracker = UsageTracker::new();

        let generation = match tokio::time::timeout(self.timeout, self.model.generate(&prompt))
            .await
        {
            Ok(Ok(generation)) => generation,
            Ok(Err(e)) => return Err(fail(AnswerFailure::Model(e))),
            Err(_) => return Err(fail(AnswerFailure::Timeout(self.timeout))),
        };

        tracker.record(generation.usage);

        let found = is_found(&generation.text);
        let text = if generation.text.trim().is_empty() {
            NO_ANSWER_TEXT.to_string()
        } else {
            generation.text
        };
        let elapsed = started.elapsed();

        debug!(
            "Answered question with {} sources in {:?} (found: {}, tokens: {})",
            context.len(),
            elapsed,
            found,
            tracker.usage().total_tokens
        );

        Ok(AnswerRecord {
            question: question.to_string(),
            text,
            found,
            source_count: context.len(),
            elapsed,
            usage: tracker.usage(),
        })
    }
}
