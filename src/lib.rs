//! quarry: local source-tree indexing and hybrid retrieval
//!
//! Quarry scans source trees, chunks file content into line ranges, keeps a
//! per-project SQLite index with a lockstep full-text table and embedding
//! vectors, and answers lexical, semantic, and hybrid queries federated
//! across project stores and a shared global store.

pub mod chunk;
pub mod commands;
pub mod config;
pub mod embed;
pub mod error;
pub mod federation;
pub mod index;
pub mod progress;
pub mod scan;
pub mod search;
pub mod store;
