//! Line-range chunking
//!
//! Splits file text into contiguous, non-overlapping line-ranged chunks.
//! Chunking is deterministic and pure: identical input always yields the
//! same boundaries, so re-indexed content can be diffed against prior
//! chunks and embeddings.

use blake3::Hasher;

/// A contiguous line range of a file, the unit of indexing and retrieval.
/// Line numbers are 1-indexed and inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub start_line: usize,
    pub end_line: usize,
    pub content: String,
}

/// Split text into line groups of at most `max_lines`; the last chunk may
/// be shorter. Concatenating the chunks in order reproduces the input lines.
pub fn chunk_lines(text: &str, max_lines: usize) -> Vec<TextChunk> {
    assert!(max_lines > 0, "max_lines must be positive");

    let lines: Vec<&str> = text.lines().collect();
    if lines.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::with_capacity(lines.len().div_ceil(max_lines));
    for (i, group) in lines.chunks(max_lines).enumerate() {
        let start_line = i * max_lines + 1;
        let end_line = start_line + group.len() - 1;
        chunks.push(TextChunk {
            start_line,
            end_line,
            content: group.join("\n"),
        });
    }

    chunks
}

/// blake3 hex digest of content, used for files and chunks alike
pub fn compute_content_hash(content: &[u8]) -> String {
    let mut hasher = Hasher::new();
    hasher.update(content);
    hasher.finalize().to_hex().to_string()
}
