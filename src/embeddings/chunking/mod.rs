
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::DocQaError;
use crate::config::ConfigError;

/// A contiguous window of the source document, ready for embedding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// The chunk text, a verbatim substring of the document
    pub content: String,
    /// The index of this chunk within the document
    pub chunk_index: usize,
    /// Offset of the first character in the document, in chars
    pub offset: usize,
    /// Length of `content` in chars
    pub char_count: usize,
    /// Chunk size the document was split with
    pub chunk_size: usize,
    /// Overlap shared with the previous chunk
    pub overlap: usize,
}

impl Chunk {
    /// Offset one past the last character of this chunk, in chars
    #[inline]
    pub fn end_offset(&self) -> usize {
        self.offset + self.char_count
    }
}

/// Configuration for document chunking, measured in characters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk length
    pub chunk_size: usize,
    /// Characters shared by consecutive chunks
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

impl ChunkingConfig {
    #[inline]
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
        }
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidChunkSize(self.chunk_size));
        }

        if self.chunk_overlap >= self.chunk_size {
            return Err(ConfigError::OverlapTooLarge {
                chunk_size: self.chunk_size,
                overlap: self.chunk_overlap,
            });
        }

        Ok(())
    }
}

/// Preferred split points, strongest first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Boundary {
    Paragraph,
    Line,
    Sentence,
    Word,
}

const BOUNDARY_PREFERENCE: [Boundary; 4] = [
    Boundary::Paragraph,
    Boundary::Line,
    Boundary::Sentence,
    Boundary::Word,
];

/// Split document text into overlapping chunks.
///
/// Every chunk holds at most `chunk_size` characters and every chunk after the
/// first starts with the last `chunk_overlap` characters of its predecessor, so
/// the document is recovered by concatenating the chunks with the overlap
/// removed. Splits land after a paragraph break, line break, sentence end or
/// whitespace when one exists in the back half of the window; otherwise the
/// window is cut at `chunk_size`.
///
/// Whitespace-only input yields no chunks.
#[inline]
pub fn split_text(text: &str, config: &ChunkingConfig) -> crate::Result<Vec<Chunk>> {
    config
        .validate()
        .map_err(|e| DocQaError::Configuration(e.to_string()))?;

    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let chars: Vec<char> = text.chars().collect();
    let total = chars.len();
    let mut chunks = Vec::new();
    let mut start = 0;

    loop {
        let end = if total - start <= config.chunk_size {
            total
        } else {
            find_split_point(&chars, start, config)
        };

        chunks.push(Chunk {
            content: chars[start..end].iter().collect(),
            chunk_index: chunks.len(),
            offset: start,
            char_count: end - start,
            chunk_size: config.chunk_size,
            overlap: if start == 0 { 0 } else { config.chunk_overlap },
        });

        if end == total {
            break;
        }

        start = end - config.chunk_overlap;
    }

    debug!(
        "Split {} chars into {} chunks (size {}, overlap {})",
        total,
        chunks.len(),
        config.chunk_size,
        config.chunk_overlap
    );

    Ok(chunks)
}

/// Pick the end of the chunk starting at `start`.
///
/// The search window is bounded below so that the next chunk always starts
/// after `start`.
fn find_split_point(chars: &[char], start: usize, config: &ChunkingConfig) -> usize {
    let max_end = start + config.chunk_size;
    let min_end = start + (config.chunk_overlap + 1).max(config.chunk_size / 2);

    for boundary in BOUNDARY_PREFERENCE {
        if let Some(end) = (min_end..=max_end)
            .rev()
            .find(|&end| is_boundary(chars, end, boundary))
        {
            return end;
        }
    }

    max_end
}

/// Whether a split before `chars[end]` falls right after `boundary`
fn is_boundary(chars: &[char], end: usize, boundary: Boundary) -> bool {
    if end == 0 || end > chars.len() {
        return false;
    }

    let last = chars[end - 1];
    match boundary {
        Boundary::Paragraph => end >= 2 && last == '\n' && chars[end - 2] == '\n',
        Boundary::Line => last == '\n',
        Boundary::Sentence => {
            end >= 2 && last.is_whitespace() && matches!(chars[end - 2], '.' | '!' | '?')
        }
        Boundary::Word => last.is_whitespace(),
    }
}

/// Reassemble the source text from an ordered chunk sequence
#[inline]
pub fn reconstruct_text(chunks: &[Chunk]) -> String {
    let mut text = String::new();
    for chunk in chunks {
        text.extend(chunk.content.chars().skip(chunk.overlap));
    }
    text
}
