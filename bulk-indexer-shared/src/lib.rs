//! # Bulk Indexer Shared
//!
//! Types shared by the repository, pipeline and binary crates: the document
//! record handed to the loader, the pair of physical index names behind an
//! alias, and the report produced by a load run.

pub mod document;
pub mod index;
pub mod report;

pub use document::Document;
pub use index::{IndexPair, IndexRoles, IndexSchema};
pub use report::{BatchReport, DocumentRejection, LoadReport, RunStatus};
