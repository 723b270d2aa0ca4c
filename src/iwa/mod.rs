//! iWork Archive Format Support
//!
//! This module decodes the IWA (iWork Archive) object graph stored inside an
//! Apple Keynote `.key` package and builds the slide model on top of it.
//!
//! ## Keynote File Structure
//!
//! A single-file Keynote package is a ZIP container holding:
//! - `Index/Document.iwa`: the document root, show and slide tree
//! - `Index/Metadata.iwa`: package metadata (component and data tables)
//! - `Index/<locator>.iwa`: one entry per slide
//! - `Data/`: media assets such as slide thumbnails
//! - `Metadata/`: document identifier and property lists
//!
//! ## IWA Format
//!
//! Each `.iwa` entry contains:
//! - Snappy-compressed data (custom framing without stream identifier)
//! - A sequence of archive segments, each a varint-prefixed `ArchiveInfo`
//!   header followed by the payloads it declares
//! - Protobuf-encoded payloads, decoded against a small schema registry

pub mod archive;
pub mod container;
pub mod keynote;
pub mod object;
pub mod protobuf;
pub mod ref_graph;
pub mod registry;
pub mod snappy;
pub mod typed;
pub mod varint;

/// Re-export commonly used types
pub use archive::{ArchiveId, ArchiveInfo, ArchiveSegment, Chunk, MessageInfo};
pub use container::Container;
pub use ref_graph::{ObjectGraph, RegisterReport};
pub use snappy::SnappyStream;
pub use typed::{ObjectVariant, TypedObject};

/// Error types for Keynote archive decoding
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid container: {0}")]
    Container(String),

    #[error("Entry not found: {0}")]
    NotFound(String),

    #[error("Malformed chunk: {0}")]
    MalformedChunk(String),

    #[error("Malformed protobuf payload: {0}")]
    Wire(#[from] protobuf::WireError),

    #[error("Schema mismatch in {tag}.{field}: {reason}")]
    SchemaMismatch {
        tag: &'static str,
        field: &'static str,
        reason: String,
    },

    #[error("Dangling reference to archive {0}")]
    DanglingReference(ArchiveId),

    #[error("No {tag} object in archive {archive}")]
    TypeNotFound { archive: ArchiveId, tag: &'static str },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
