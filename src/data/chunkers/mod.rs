//! Text chunking
//!
//! Implements recursive, boundary-aware chunking with overlap. Text is first
//! cut into pieces along the coarsest separator that occurs (paragraph, line,
//! sentence, comma, word, and finally single characters), then pieces are merged
//! greedily into passages of at most `chunk_size` characters. Positions are
//! measured in characters of the input text, and every passage is an exact slice
//! of it, so the original text can always be rebuilt from the passages.

use crate::data::Chunk;
use crate::error::{RagError, Result};

/// Separators tried from coarsest to finest; `""` means a hard character cut
pub const DEFAULT_SEPARATORS: &[&str] = &["\n\n", "\n", ". ", ".", "?", "!", ",", " ", ""];

/// Trait for text chunking strategies
pub trait Chunker: Send + Sync {
    /// Split text into ordered passages
    fn chunk(&self, text: &str) -> Result<Vec<Chunk>>;
}

/// Configuration for chunking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    /// Maximum size of each chunk in characters
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters
    pub chunk_overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: crate::config::DEFAULT_CHUNK_SIZE,
            chunk_overlap: crate::config::DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl ChunkConfig {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(RagError::invalid_input("chunk size must be greater than zero"));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::invalid_input(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// Recursive chunker that prefers natural boundaries over hard cuts
pub struct RecursiveChunker {
    config: ChunkConfig,
    separators: Vec<Vec<char>>,
}

impl RecursiveChunker {
    /// Create a new recursive chunker with the default separators
    pub fn new(config: ChunkConfig) -> Self {
        Self::with_separators(config, DEFAULT_SEPARATORS)
    }

    /// Create a chunker with a custom separator list, coarsest first
    pub fn with_separators(config: ChunkConfig, separators: &[&str]) -> Self {
        Self {
            config,
            separators: separators.iter().map(|s| s.chars().collect()).collect(),
        }
    }

    /// Split `text` into passages of at most `max_size` characters
    pub fn split(text: &str, max_size: usize, overlap: usize) -> Result<Vec<Chunk>> {
        Self::new(ChunkConfig::new(max_size, overlap)).chunk(text)
    }

    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    /// Cut `chars[start..end]` into pieces no longer than the chunk size
    fn segment(
        &self,
        chars: &[char],
        start: usize,
        end: usize,
        separators: &[Vec<char>],
        pieces: &mut Vec<(usize, usize)>,
    ) {
        let max = self.config.chunk_size;
        if end - start <= max {
            pieces.push((start, end));
            return;
        }

        for (i, sep) in separators.iter().enumerate() {
            if sep.is_empty() {
                break;
            }

            let cuts = split_points(chars, start, end, sep);
            if cuts.is_empty() {
                continue;
            }

            let mut piece_start = start;
            for cut in cuts.into_iter().chain(std::iter::once(end)) {
                if cut > piece_start {
                    self.segment(chars, piece_start, cut, &separators[i + 1..], pieces);
                }
                piece_start = cut;
            }
            return;
        }

        // No softer boundary left
        let mut pos = start;
        while pos < end {
            let next = (pos + max).min(end);
            pieces.push((pos, next));
            pos = next;
        }
    }

    /// Merge contiguous pieces into overlapping spans
    fn merge(&self, chars: &[char], pieces: &[(usize, usize)]) -> Vec<(usize, usize)> {
        let max = self.config.chunk_size;
        let mut spans = Vec::new();
        let mut start = 0;
        let mut i = 0;

        while i < pieces.len() {
            let (_, first_end) = pieces[i];
            // Give up part of the carried-over overlap when the next piece would not fit
            if first_end - start > max {
                start = first_end - max;
            }

            let mut end = first_end;
            i += 1;
            while i < pieces.len() && pieces[i].1 - start <= max {
                end = pieces[i].1;
                i += 1;
            }

            spans.push((start, end));

            if i < pieces.len() {
                start = overlap_start(chars, start, end, self.config.chunk_overlap);
            }
        }

        spans
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, text: &str) -> Result<Vec<Chunk>> {
        self.config.validate()?;
        if text.trim().is_empty() {
            return Err(RagError::invalid_input("cannot chunk empty or whitespace-only text"));
        }

        let chars: Vec<char> = text.chars().collect();
        let mut pieces = Vec::new();
        self.segment(&chars, 0, chars.len(), &self.separators, &mut pieces);

        let chunks: Vec<Chunk> = self
            .merge(&chars, &pieces)
            .into_iter()
            .enumerate()
            .map(|(chunk_index, (start, end))| {
                let content: String = chars[start..end].iter().collect();
                Chunk::new(content, start, end, chunk_index)
            })
            .collect();

        tracing::info!("Text split into {} chunks", chunks.len());
        Ok(chunks)
    }
}

/// Positions right after each occurrence of `sep` inside `chars[start..end]`,
/// excluding `end` itself
fn split_points(chars: &[char], start: usize, end: usize, sep: &[char]) -> Vec<usize> {
    let mut cuts = Vec::new();
    let mut pos = start;

    while pos + sep.len() <= end {
        if chars[pos..pos + sep.len()] == *sep {
            let cut = pos + sep.len();
            if cut < end {
                cuts.push(cut);
            }
            pos = cut;
        } else {
            pos += 1;
        }
    }

    cuts
}

/// Where the next chunk starts: `overlap` characters before `end`, moved
/// forward to the first word start in that window if there is one
fn overlap_start(chars: &[char], start: usize, end: usize, overlap: usize) -> usize {
    if overlap == 0 {
        return end;
    }

    let window_start = end.saturating_sub(overlap).max(start + 1);
    (window_start..end)
        .find(|&p| chars[p - 1].is_whitespace() && !chars[p].is_whitespace())
        .unwrap_or(window_start)
}

/// Rebuild the original text from ordered chunks by dropping each overlap
pub fn reconstruct(chunks: &[Chunk]) -> String {
    let mut text = String::new();
    let mut covered: usize = 0;

    for chunk in chunks {
        let skip = covered.saturating_sub(chunk.start_pos);
        text.extend(chunk.content.chars().skip(skip));
        covered = covered.max(chunk.end_pos);
    }

    text
}
