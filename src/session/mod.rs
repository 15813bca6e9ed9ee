//! Question-answering session
//!
//! A [`QaSession`] owns at most one loaded document and its index at a time.
//! Loading a new document replaces both wholesale.


use std::sync::Arc;
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use tracing::{info, warn};

use crate::answer::Answerer;
use crate::batch::{BatchCoordinator, BatchMetrics, BatchResult};
use crate::config::Config;
use crate::embeddings::{ChunkingConfig, Embedder, split_text};
use crate::generation::{LanguageModel, TokenUsage};
use crate::index::{DEFAULT_TOP_K, VectorIndex};
use crate::ollama::OllamaClient;
use crate::{DocQaError, Result};

const DEFAULT_EMBEDDING_CONCURRENCY: usize = 8;

/// Tunables a session needs from the configuration file
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub chunking: ChunkingConfig,
    pub top_k: usize,
    pub generation_timeout: Duration,
    pub embedding_concurrency: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            chunking: ChunkingConfig::default(),
            top_k: DEFAULT_TOP_K,
            generation_timeout: crate::answer::DEFAULT_GENERATION_TIMEOUT,
            embedding_concurrency: DEFAULT_EMBEDDING_CONCURRENCY,
        }
    }
}

impl SessionSettings {
    #[inline]
    pub fn from_config(config: &Config) -> Self {
        Self {
            chunking: config.chunking.clone(),
            top_k: config.retrieval.top_k,
            generation_timeout: config.ollama.timeout(),
            embedding_concurrency: config.retrieval.embedding_concurrency,
        }
    }
}

/// Summary of a successful [`QaSession::load_document`]
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentStats {
    pub num_chunks: usize,
    /// Document length in characters
    pub document_length: usize,
    pub indexing_time: Duration,
}

struct LoadedDocument {
    text: String,
    index: Arc<VectorIndex>,
}

pub struct QaSession {
    embedder: Arc<dyn Embedder>,
    coordinator: BatchCoordinator,
    settings: SessionSettings,
    document: Option<LoadedDocument>,
    last_result: Option<BatchResult>,
}

impl QaSession {
    #[inline]
    pub fn new(
        embedder: Arc<dyn Embedder>,
        model: Arc<dyn LanguageModel>,
        settings: SessionSettings,
    ) -> Self {
        let answerer = Answerer::new(model)
            .with_top_k(settings.top_k)
            .with_timeout(settings.generation_timeout);

        Self {
            embedder,
            coordinator: BatchCoordinator::new(Arc::new(answerer)),
            settings,
            document: None,
            last_result: None,
        }
    }

    /// Session backed by the Ollama server described in `config`
    #[inline]
    pub fn from_config(config: &Config) -> Result<Self> {
        config
            .validate()
            .map_err(|e| DocQaError::Configuration(e.to_string()))?;

        let client = Arc::new(OllamaClient::new(&config.ollama)?);
        Ok(Self::new(
            Arc::clone(&client) as Arc<dyn Embedder>,
            client,
            SessionSettings::from_config(config),
        ))
    }

    /// Chunk and index `text`, replacing any previously loaded document.
    ///
    /// On failure the session is left without a document.
    #[inline]
    pub async fn load_document(&mut self, text: &str) -> Result<DocumentStats> {
        let started = Instant::now();
        self.document = None;

        if text.trim().is_empty() {
            return Err(DocQaError::EmptyDocument);
        }

        let chunks = split_text(text, &self.settings.chunking)?;
        if chunks.is_empty() {
            return Err(DocQaError::EmptyDocument);
        }

        let index = VectorIndex::build(
            chunks,
            Arc::clone(&self.embedder),
            self.settings.embedding_concurrency,
        )
        .await?;

        let stats = DocumentStats {
            num_chunks: index.len(),
            document_length: text.chars().count(),
            indexing_time: started.elapsed(),
        };

        info!(
            num_chunks = stats.num_chunks,
            document_length = stats.document_length,
            indexing_time_seconds = stats.indexing_time.as_secs_f64(),
            "Document loaded and indexed"
        );

        self.document = Some(LoadedDocument {
            text: text.to_string(),
            index: Arc::new(index),
        });
        Ok(stats)
    }

    /// Answer `questions` against the loaded document.
    ///
    /// Individual failures become error placeholders in the returned mapping;
    /// only a missing document fails the whole call.
    #[inline]
    pub async fn answer_questions(
        &mut self,
        questions: &[String],
    ) -> Result<IndexMap<String, String>> {
        let Some(document) = &self.document else {
            warn!("Questions submitted before a document was loaded");
            return Err(DocQaError::NotReady);
        };

        let result = self
            .coordinator
            .answer_all(Arc::clone(&document.index), questions)
            .await;
        let answers = result.answers();
        self.last_result = Some(result);

        Ok(answers)
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.document.is_some()
    }

    #[inline]
    pub fn document_text(&self) -> Option<&str> {
        self.document.as_ref().map(|doc| doc.text.as_str())
    }

    #[inline]
    pub fn chunk_count(&self) -> usize {
        self.document.as_ref().map_or(0, |doc| doc.index.len())
    }

    /// Token usage of the most recent batch, zero before the first one
    #[inline]
    pub fn last_token_usage(&self) -> TokenUsage {
        self.last_metrics()
            .map(|metrics| metrics.usage)
            .unwrap_or_default()
    }

    #[inline]
    pub fn last_metrics(&self) -> Option<&BatchMetrics> {
        self.last_result.as_ref().map(BatchResult::metrics)
    }

    #[inline]
    pub fn last_result(&self) -> Option<&BatchResult> {
        self.last_result.as_ref()
    }

    #[inline]
    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }
}
