// Deterministic capabilities shared by the pipeline tests

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::anyhow;
use async_trait::async_trait;
use doc_qa::NOT_FOUND_SENTINEL;
use doc_qa::embeddings::Embedder;
use doc_qa::generation::{Generation, LanguageModel, TokenUsage};

const DIMENSION: usize = 1024;

/// Bag-of-words embedder hashing each lowercase word into a fixed bucket
#[derive(Default)]
pub struct HashingEmbedder {
    pub calls: AtomicUsize,
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let mut vector = vec![0.0; DIMENSION];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|word| !word.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            let bucket = (hasher.finish() % DIMENSION as u64) as usize;
            vector[bucket] += 1.0;
        }
        Ok(vector)
    }
}

/// Answers with `answer` when the question mentions `topic` and the
/// retrieved context contains `answer`; otherwise replies with the sentinel.
/// Questions containing "explode" fail.
pub struct ScriptedModel {
    facts: Vec<(&'static str, &'static str)>,
    pub usage: TokenUsage,
    pub calls: AtomicUsize,
}

impl ScriptedModel {
    pub fn new(facts: Vec<(&'static str, &'static str)>) -> Self {
        Self {
            facts,
            usage: TokenUsage::new(50, 5),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, prompt: &str) -> anyhow::Result<Generation> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let (context, question) = prompt.split_once("Question: ").unwrap_or((prompt, ""));
        if question.contains("explode") {
            return Err(anyhow!("model crashed while generating"));
        }

        let text = self
            .facts
            .iter()
            .find(|(topic, answer)| question.contains(topic) && context.contains(answer))
            .map_or(NOT_FOUND_SENTINEL, |&(_, answer)| answer);

        Ok(Generation::new(text).with_usage(self.usage))
    }
}
