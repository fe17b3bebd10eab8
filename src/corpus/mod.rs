//! Corpus handling: document discovery and chunking.

mod ingest;
mod splitter;

pub use ingest::{ingest_corpus, Document};
pub use splitter::{ChunkSplitter, TextChunk};
