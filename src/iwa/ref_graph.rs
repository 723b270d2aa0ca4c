//! Object Graph for Keynote Documents
//!
//! Objects in an iWork document reference each other by archive identifier
//! through `TSP.Reference` fields. References may point forward, backward or
//! form cycles, so segments are never linked by ownership. Instead one
//! [`ObjectGraph`] owns every decoded [`ArchiveSegment`] of a document (or of
//! one slide entry) and resolves identifiers on demand.
//!
//! # Example
//!
//! ```rust,ignore
//! use slydb::iwa::{Chunk, ObjectGraph};
//! use slydb::iwa::typed::{DocumentArchive, ShowArchive};
//!
//! let mut graph = ObjectGraph::new();
//! graph.register_chunk(Chunk::from_entry(&raw)?);
//!
//! let (_, document) = graph.find_first::<DocumentArchive>()?;
//! let show = graph.next_object_of_type::<ShowArchive>(document.show)?;
//! ```
//!
//! # Registration order
//!
//! Segments are registered as their chunk is decoded and remember that
//! order; [`ObjectGraph::segments`] yields them in it. Registration never
//! resolves anything, so a reference may name a segment registered later.

use std::collections::HashMap;

use log::debug;

use crate::iwa::archive::{ArchiveId, ArchiveSegment, Chunk};
use crate::iwa::typed::ObjectVariant;
use crate::iwa::{Error, Result};

/// Outcome of registering one chunk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterReport {
    pub registered: usize,
    /// Segments left out of the graph, with the reason
    pub skipped: Vec<String>,
}

/// Registry of archive identifier to decoded segment
///
/// # Performance Characteristics
///
/// - Register: O(1) amortized
/// - Resolve: O(1) HashMap lookup
/// - Ordered iteration: O(n) over the decode-order index
#[derive(Debug, Clone, Default)]
pub struct ObjectGraph {
    /// Segments keyed by identifier
    segments: HashMap<ArchiveId, ArchiveSegment>,
    /// Identifiers in decode order
    order: Vec<ArchiveId>,
}

impl ObjectGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode and register every segment of a chunk
    ///
    /// Segments without an identifier cannot be referenced and are skipped,
    /// as are later duplicates of an identifier. The report lists each
    /// skipped segment with its reason.
    pub fn register_chunk(&mut self, chunk: Chunk) -> RegisterReport {
        let mut report = RegisterReport::default();
        for (index, raw) in chunk.into_segments().into_iter().enumerate() {
            match ArchiveSegment::decode(raw) {
                Ok(segment) => {
                    let identifier = segment.identifier;
                    if self.register(segment) {
                        report.registered += 1;
                    } else {
                        report
                            .skipped
                            .push(format!("segment {}: duplicate archive identifier {}", index, identifier));
                    }
                },
                Err(e) => {
                    debug!("Skipping segment {}: {}", index, e);
                    report.skipped.push(format!("segment {}: {}", index, e));
                },
            }
        }
        report
    }

    /// Register one segment
    ///
    /// The first segment registered under an identifier wins; a later
    /// duplicate is dropped and `false` is returned.
    pub fn register(&mut self, segment: ArchiveSegment) -> bool {
        let identifier = segment.identifier;
        if self.segments.contains_key(&identifier) {
            debug!("Duplicate archive identifier {}, keeping the first", identifier);
            return false;
        }
        self.segments.insert(identifier, segment);
        self.order.push(identifier);
        true
    }

    /// Look up a segment by identifier
    pub fn resolve(&self, identifier: ArchiveId) -> Result<&ArchiveSegment> {
        self.segments
            .get(&identifier)
            .ok_or(Error::DanglingReference(identifier))
    }

    pub fn contains(&self, identifier: ArchiveId) -> bool {
        self.segments.contains_key(&identifier)
    }

    /// Resolve a reference and select the first object of a variant in it
    pub fn next_object_of_type<T: ObjectVariant>(&self, identifier: ArchiveId) -> Result<&T> {
        self.resolve(identifier)?.next_object_of_type::<T>()
    }

    /// Segments in decode order
    pub fn segments(&self) -> impl Iterator<Item = &ArchiveSegment> {
        self.order.iter().filter_map(|id| self.segments.get(id))
    }

    /// Every object of a variant with its archive identifier, in decode order
    pub fn objects_of_type<T: ObjectVariant>(&self) -> impl Iterator<Item = (ArchiveId, &T)> {
        self.segments()
            .flat_map(|segment| segment.objects_of_type::<T>().map(move |object| (segment.identifier, object)))
    }

    /// First object of a variant anywhere in the graph
    ///
    /// Fails with `TypeNotFound` naming the first registered archive, or
    /// archive 0 when the graph is empty.
    pub fn find_first<T: ObjectVariant>(&self) -> Result<(ArchiveId, &T)> {
        self.objects_of_type::<T>().next().ok_or(Error::TypeNotFound {
            archive: self.order.first().copied().unwrap_or(0),
            tag: T::TAG,
        })
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
