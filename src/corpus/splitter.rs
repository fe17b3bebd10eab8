//! Overlapping-window text splitter.
//!
//! Documents are cut into windows of at most `chunk_size` characters. The
//! end of each window prefers a paragraph break, then a sentence break,
//! then a word break inside the tail of the window, before falling back to
//! a hard character cut. The next window always starts `chunk_overlap`
//! characters before the previous window's end, so consecutive chunks
//! overlap by exactly `chunk_overlap` characters (except possibly the last).

use serde::{Deserialize, Serialize};

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Fraction of the window (from the end) searched for a natural break.
const BOUNDARY_SEARCH_TAIL: usize = 5;

/// A chunk of a source document, ordered within that document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextChunk {
    pub document_id: String,
    pub text: String,
    pub seq: usize,
}

#[derive(Debug, Clone)]
pub struct ChunkSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl ChunkSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        assert!(chunk_overlap < chunk_size, "overlap must be smaller than chunk size");
        Self {
            chunk_size,
            chunk_overlap,
        }
    }

    /// Splits `text` into overlapping chunks attributed to `document_id`.
    /// Empty input yields an empty vec. Counts are in chars, not bytes.
    pub fn split(&self, document_id: &str, text: &str) -> Vec<TextChunk> {
        let chars: Vec<char> = text.chars().collect();
        let total = chars.len();
        let mut chunks = Vec::new();

        if total == 0 {
            return chunks;
        }

        let mut start = 0;
        let mut seq = 0;

        while start < total {
            let hard_end = (start + self.chunk_size).min(total);
            let end = if hard_end < total {
                self.natural_break(&chars, start, hard_end)
            } else {
                hard_end
            };

            chunks.push(TextChunk {
                document_id: document_id.to_string(),
                text: chars[start..end].iter().collect(),
                seq,
            });
            seq += 1;

            if end >= total {
                break;
            }
            // Overlap the previous window by exactly chunk_overlap chars.
            start = end.saturating_sub(self.chunk_overlap).max(start + 1);
        }

        chunks
    }

    /// Picks a cut position in `(start, hard_end]`, preferring paragraph,
    /// then sentence, then word boundaries inside the window's tail.
    fn natural_break(&self, chars: &[char], start: usize, hard_end: usize) -> usize {
        let window_len = hard_end - start;
        let tail_start = hard_end - (window_len / BOUNDARY_SEARCH_TAIL).max(1);
        // The cut must leave room to advance past the overlap, or the next
        // window would not make progress.
        let min_cut = (start + self.chunk_overlap + 1).min(hard_end);

        if let Some(pos) = Self::rfind_paragraph(chars, tail_start, hard_end) {
            if pos >= min_cut {
                return pos;
            }
        }
        if let Some(pos) = Self::rfind_sentence(chars, tail_start, hard_end) {
            if pos >= min_cut {
                return pos;
            }
        }
        if let Some(pos) = Self::rfind_word(chars, tail_start, hard_end) {
            if pos >= min_cut {
                return pos;
            }
        }
        hard_end
    }

    fn rfind_paragraph(chars: &[char], from: usize, to: usize) -> Option<usize> {
        (from..to.saturating_sub(1))
            .rev()
            .find(|&i| chars[i] == '\n' && chars[i + 1] == '\n')
            .map(|i| i + 2)
    }

    fn rfind_sentence(chars: &[char], from: usize, to: usize) -> Option<usize> {
        (from..to.saturating_sub(1))
            .rev()
            .find(|&i| {
                matches!(chars[i], '.' | '!' | '?') && chars[i + 1].is_whitespace()
            })
            .map(|i| i + 2)
    }

    fn rfind_word(chars: &[char], from: usize, to: usize) -> Option<usize> {
        (from..to).rev().find(|&i| chars[i].is_whitespace()).map(|i| i + 1)
    }
}

impl Default for ChunkSplitter {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_no_chunks() {
        let splitter = ChunkSplitter::default();
        assert!(splitter.split("doc", "").is_empty());
    }

    #[test]
    fn short_input_is_one_chunk() {
        let splitter = ChunkSplitter::default();
        let chunks = splitter.split("doc", "hello world");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "hello world");
        assert_eq!(chunks[0].seq, 0);
    }

    #[test]
    fn chunks_respect_size_and_overlap() {
        let splitter = ChunkSplitter::default();
        let text = "word ".repeat(1000);
        let chunks = splitter.split("doc", &text);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.text.chars().count() <= DEFAULT_CHUNK_SIZE);
        }
        // Consecutive chunks overlap by exactly the configured amount.
        for pair in chunks.windows(2) {
            let prev: Vec<char> = pair[0].text.chars().collect();
            let next: Vec<char> = pair[1].text.chars().collect();
            let tail: String = prev[prev.len() - DEFAULT_CHUNK_OVERLAP..].iter().collect();
            let head: String = next[..DEFAULT_CHUNK_OVERLAP].iter().collect();
            assert_eq!(tail, head);
        }
    }

    #[test]
    fn prefers_paragraph_break() {
        let splitter = ChunkSplitter::new(100, 20);
        let mut text = "a".repeat(90);
        text.push_str("\n\n");
        text.push_str(&"b".repeat(120));
        let chunks = splitter.split("doc", &text);
        assert!(chunks[0].text.ends_with("\n\n"));
    }

    #[test]
    fn split_is_deterministic() {
        let splitter = ChunkSplitter::default();
        let text = "The quick brown fox. ".repeat(200);
        let a = splitter.split("doc", &text);
        let b = splitter.split("doc", &text);
        let texts_a: Vec<&str> = a.iter().map(|c| c.text.as_str()).collect();
        let texts_b: Vec<&str> = b.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts_a, texts_b);
    }

    #[test]
    fn sequence_numbers_are_ordered() {
        let splitter = ChunkSplitter::default();
        let text = "sentence one. ".repeat(300);
        let chunks = splitter.split("doc", &text);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.seq, i);
        }
    }

    #[test]
    fn multibyte_text_counts_chars_not_bytes() {
        let splitter = ChunkSplitter::new(50, 10);
        let text = "日本語のテキスト。".repeat(40);
        let chunks = splitter.split("doc", &text);
        for chunk in &chunks {
            assert!(chunk.text.chars().count() <= 50);
        }
    }
}
