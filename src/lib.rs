//! Slydb - deterministic content extraction from Apple Keynote archives
//!
//! This library decodes the IWA object graph of a single-file Keynote `.key`
//! package and flattens it into records suitable for a search index: slide
//! text, presenter notes, skip flags, stable slide identifiers and thumbnail
//! digests.
//!
//! # Features
//!
//! - **Container access**: ZIP entries read on demand, legacy entry names repaired
//! - **IWA decoding**: Snappy framing, archive segments, schema-driven protobuf
//! - **Reference graph**: per-document arena of archive segments
//! - **Slide model**: tree-ordered slides with memoized text, notes and thumbnails
//! - **Stable identifiers**: revision-aware slide ids and path-safe digests
//! - **Batch indexing**: parallel extraction of directory trees with rayon
//!
//! # Example - Extracting one document
//!
//! ```no_run
//! use slydb::iwa::keynote::KeynoteFile;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let doc = KeynoteFile::open("talk.key")?;
//! let record = doc.record()?;
//! println!("{} ({} slides)", record.id, record.slides.len());
//!
//! // Export deduplicated thumbnails as <digest>.jpg
//! doc.export_thumbnails("thumbnails".as_ref())?;
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Indexing a directory
//!
//! ```no_run
//! use slydb::config::IndexOptions;
//! use slydb::index::{self, ExtractionOutcome};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let options = IndexOptions::new().with_workers(4);
//! let outcomes = index::index_path("/Users/me/Talks".as_ref(), &options);
//! for outcome in &outcomes {
//!     if let ExtractionOutcome::Failed { path, cause } = outcome {
//!         eprintln!("{}: {}", path.display(), cause);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

/// Option types for extraction and indexing
pub mod config;

/// Batch indexing and search-document arrangement
pub mod index;

/// iWork Archive decoding and the Keynote slide model
pub mod iwa;

/// Records handed to indexing collaborators
pub mod record;

pub use iwa::keynote::KeynoteFile;
pub use iwa::{Error, Result};
pub use record::{DocumentRecord, SlideRecord};

#[cfg(test)]
mod tests;
