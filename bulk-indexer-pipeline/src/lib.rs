//! # Bulk Indexer Pipeline
//!
//! This crate loads a dataset into a search engine behind an alias with a
//! blue/green swap: the non-live index is rebuilt and loaded, and the alias
//! only moves once the load has finished.
//!
//! ## Architecture
//!
//! 1. **Source**: Reads NDJSON records lazily and applies a document transform
//! 2. **Batcher**: Groups documents into bounded batches
//! 3. **Loader**: Bulk-writes each batch with `create` semantics
//! 4. **Builder**: Ensures both indices exist and rebuilds the target
//! 5. **Alias**: Resolves live/backup roles, commits or rolls back the alias
//! 6. **Orchestrator**: Runs the state machine composing the above

pub mod alias;
pub mod batcher;
pub mod builder;
pub mod errors;
pub mod loader;
pub mod orchestrator;
pub mod source;
pub mod transform;

#[cfg(test)]
mod testing;

pub use errors::LoadError;
pub use orchestrator::{LoadConfig, LoadOrchestrator, LoadState};
