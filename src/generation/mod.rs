//! Language-model capability
//!
//! The core only ever sees the normalized [`Generation`] shape; adapters are
//! responsible for mapping provider responses (and their usage counters) into it.

#[cfg(test)]
mod tests;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::ops::AddAssign;
use tracing::debug;

/// Token counts reported by the model for one call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    #[inline]
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

impl AddAssign for TokenUsage {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        self.prompt_tokens += rhs.prompt_tokens;
        self.completion_tokens += rhs.completion_tokens;
        self.total_tokens += rhs.total_tokens;
    }
}

/// A completed model call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Generation {
    pub text: String,
    /// `None` when the provider did not report usage
    pub usage: Option<TokenUsage>,
}

impl Generation {
    #[inline]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: None,
        }
    }

    #[inline]
    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<Generation>;
}

/// Accumulates usage for exactly one answer invocation.
///
/// A tracker is created per question and dropped with it, so concurrent
/// questions never share counters.
#[derive(Debug, Default)]
pub struct UsageTracker {
    usage: TokenUsage,
    calls: u32,
    missing: u32,
}

impl UsageTracker {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the usage reported by one model call.
    ///
    /// Missing usage counts as zero.
    #[inline]
    pub fn record(&mut self, usage: Option<TokenUsage>) {
        self.calls += 1;
        match usage {
            Some(usage) => self.usage += usage,
            None => {
                self.missing += 1;
                debug!("Model response carried no usage metadata; counting 0 tokens");
            }
        }
    }

    #[inline]
    pub fn usage(&self) -> TokenUsage {
        self.usage
    }

    #[inline]
    pub fn calls(&self) -> u32 {
        self.calls
    }

    #[inline]
    pub fn calls_without_usage(&self) -> u32 {
        self.missing
    }
}
