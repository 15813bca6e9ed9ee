//! Concurrent answering of a question set
//!
//! Every question is answered on its own task. Failures stay local to their
//! question and show up in the result as an error placeholder.


use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use indexmap::IndexMap;
use tracing::{error, info};

use crate::answer::{AnswerError, AnswerFailure, AnswerRecord, Answerer};
use crate::generation::TokenUsage;
use crate::index::VectorIndex;

/// Prefix of the answer text for questions that failed
pub const ERROR_PREFIX: &str = "Error processing question: ";

/// Result of one question within a batch
#[derive(Debug)]
pub enum QuestionOutcome {
    Answered(AnswerRecord),
    Failed(AnswerError),
}

impl QuestionOutcome {
    #[inline]
    pub fn is_answered(&self) -> bool {
        matches!(self, Self::Answered(_))
    }

    /// Text shown to the caller: the answer, or an error placeholder
    #[inline]
    pub fn answer_text(&self) -> String {
        match self {
            Self::Answered(record) => record.text.clone(),
            Self::Failed(error) => format!("{ERROR_PREFIX}{error}"),
        }
    }

    #[inline]
    pub fn usage(&self) -> TokenUsage {
        match self {
            Self::Answered(record) => record.usage,
            Self::Failed(_) => TokenUsage::default(),
        }
    }
}

/// Aggregate figures for one batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchMetrics {
    /// Questions submitted, duplicates included
    pub total_questions: usize,
    /// Entries in the result mapping that hold a real answer
    pub successful_answers: usize,
    /// Entries in the result mapping that hold an error placeholder
    pub failed_answers: usize,
    /// Usage summed over every answered question, duplicates included
    pub usage: TokenUsage,
    pub total_time: Duration,
}

impl BatchMetrics {
    #[inline]
    pub fn total_tokens(&self) -> u64 {
        self.usage.total_tokens
    }

    #[inline]
    pub fn average_time_per_question(&self) -> Duration {
        match u32::try_from(self.total_questions) {
            Ok(0) | Err(_) => Duration::ZERO,
            Ok(count) => self.total_time / count,
        }
    }

    /// Questions per second
    #[inline]
    pub fn throughput(&self) -> f64 {
        let seconds = self.total_time.as_secs_f64();
        if seconds > 0.0 {
            self.total_questions as f64 / seconds
        } else {
            0.0
        }
    }
}

/// Question-to-outcome mapping produced by [`BatchCoordinator::answer_all`]
#[derive(Debug, Default)]
pub struct BatchResult {
    outcomes: IndexMap<String, QuestionOutcome>,
    metrics: BatchMetrics,
}

impl BatchResult {
    /// Final question-to-answer text mapping
    #[inline]
    pub fn answers(&self) -> IndexMap<String, String> {
        self.outcomes
            .iter()
            .map(|(question, outcome)| (question.clone(), outcome.answer_text()))
            .collect()
    }

    #[inline]
    pub fn get(&self, question: &str) -> Option<&QuestionOutcome> {
        self.outcomes.get(question)
    }

    #[inline]
    pub fn outcomes(&self) -> impl Iterator<Item = (&String, &QuestionOutcome)> {
        self.outcomes.iter()
    }

    #[inline]
    pub fn metrics(&self) -> &BatchMetrics {
        &self.metrics
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

pub struct BatchCoordinator {
    answerer: Arc<Answerer>,
}

impl BatchCoordinator {
    #[inline]
    pub fn new(answerer: Arc<Answerer>) -> Self {
        Self { answerer }
    }

    /// Answer every question concurrently against `index`.
    ///
    /// Always returns an entry for each distinct question. When a question
    /// appears more than once it is answered each time and the last answer
    /// wins.
    #[inline]
    pub async fn answer_all(&self, index: Arc<VectorIndex>, questions: &[String]) -> BatchResult {
        if questions.is_empty() {
            return BatchResult::default();
        }

        let started = Instant::now();

        let handles: Vec<_> = questions
            .iter()
            .map(|question| {
                let answerer = Arc::clone(&self.answerer);
                let index = Arc::clone(&index);
                let question = question.clone();
                tokio::spawn(async move { answerer.answer(&index, &question).await })
            })
            .collect();

        let joined = join_all(handles).await;

        let mut usage = TokenUsage::default();
        let mut outcomes = IndexMap::with_capacity(questions.len());
        for (question, result) in questions.iter().zip(joined) {
            let outcome = match result {
                Ok(Ok(record)) => QuestionOutcome::Answered(record),
                Ok(Err(answer_error)) => QuestionOutcome::Failed(answer_error),
                Err(join_error) => {
                    error!("Answer task for {:?} did not complete: {}", question, join_error);
                    QuestionOutcome::Failed(AnswerError {
                        question: question.clone(),
                        elapsed: started.elapsed(),
                        failure: AnswerFailure::Task(join_error.to_string()),
                    })
                }
            };
            usage += outcome.usage();
            outcomes.insert(question.clone(), outcome);
        }

        let successful_answers = outcomes.values().filter(|o| o.is_answered()).count();
        let metrics = BatchMetrics {
            total_questions: questions.len(),
            successful_answers,
            failed_answers: outcomes.len() - successful_answers,
            usage,
            total_time: started.elapsed(),
        };

        info!(
            total_questions = metrics.total_questions,
            successful_answers = metrics.successful_answers,
            total_time_seconds = metrics.total_time.as_secs_f64(),
            average_time_per_question = metrics.average_time_per_question().as_secs_f64(),
            throughput_questions_per_second = metrics.throughput(),
            total_tokens_used = metrics.total_tokens(),
            "Batch processing completed"
        );

        BatchResult { outcomes, metrics }
    }
}
