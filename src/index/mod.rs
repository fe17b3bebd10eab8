//! Persistent vector index.
//!
//! `store` holds the entry/result types and the search trait; `sqlite` is
//! the SQLite-backed implementation that owns the on-disk representation.

mod sqlite;
mod store;

pub use sqlite::{delete_index, SqliteVectorIndex};
pub use store::{IndexEntry, SearchHit, VectorStore};
