//! Knowledge-base question answering over a local markdown corpus.
//!
//! Documents are chunked, embedded locally and persisted into a SQLite
//! vector index; questions retrieve the top-k passages, which are folded
//! into a fixed prompt for a hosted generative model. The HTTP layer in
//! `server` is thin glue over `state::AppState`.

pub mod config;
pub mod corpus;
pub mod embedding;
pub mod errors;
pub mod index;
pub mod llm;
pub mod logging;
pub mod pipeline;
pub mod resources;
pub mod retriever;
pub mod server;
pub mod session;
pub mod state;
