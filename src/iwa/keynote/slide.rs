//! Keynote Slide Structure
//!
//! A [`Slide`] owns the object graph decoded from its own container entry
//! together with the slide-tree node that placed it. Text, notes and
//! thumbnail bytes are computed on first access and kept for the lifetime
//! of the instance.

use std::collections::HashSet;
use std::io::{Read, Seek};

use once_cell::sync::OnceCell;

use crate::iwa::Result;
use crate::iwa::archive::ArchiveId;
use crate::iwa::container::Container;
use crate::iwa::keynote::ident;
use crate::iwa::keynote::metadata::{DocumentIdentity, data_entry_name};
use crate::iwa::ref_graph::ObjectGraph;
use crate::iwa::typed::{DataInfo, NoteArchive, SlideArchive, SlideNodeArchive, StorageArchive};
use crate::record::SlideRecord;

/// Characters trimmed from both ends of a text block
const TRIMMED: [char; 3] = ['\n', '\u{FFFC}', ' '];

/// Join the text runs of a storage and trim placeholder characters
///
/// Returns `None` when nothing but placeholders and whitespace remain.
pub fn clean_text<S: AsRef<str>>(lines: &[S]) -> Option<String> {
    let joined = lines.iter().map(AsRef::as_ref).collect::<Vec<&str>>().join("\n");
    let trimmed = joined.trim_matches(TRIMMED.as_slice());
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// One materialized slide
#[derive(Debug)]
pub struct Slide {
    ordinal: usize,
    identifier: ArchiveId,
    node: SlideNodeArchive,
    graph: ObjectGraph,
    thumbnail: Option<DataInfo>,
    text: OnceCell<(Vec<String>, Vec<String>)>,
    thumbnail_bytes: OnceCell<Option<Vec<u8>>>,
}

impl Slide {
    pub fn new(
        ordinal: usize,
        identifier: ArchiveId,
        node: SlideNodeArchive,
        graph: ObjectGraph,
        thumbnail: Option<DataInfo>,
    ) -> Self {
        Self {
            ordinal,
            identifier,
            node,
            graph,
            thumbnail,
            text: OnceCell::new(),
            thumbnail_bytes: OnceCell::new(),
        }
    }

    /// Position in the slide tree, from 0
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Native slide identifier
    pub fn identifier(&self) -> ArchiveId {
        self.identifier
    }

    pub fn node(&self) -> &SlideNodeArchive {
        &self.node
    }

    pub fn graph(&self) -> &ObjectGraph {
        &self.graph
    }

    pub fn is_skipped(&self) -> bool {
        self.node.is_skipped
    }

    /// Slide name, when the slide archive carries one
    pub fn name(&self) -> Option<&str> {
        self.graph
            .objects_of_type::<SlideArchive>()
            .find_map(|(_, slide)| slide.name.as_deref())
    }

    /// Text blocks in decode order, presenter notes excluded
    pub fn text_blocks(&self) -> &[String] {
        &self.split_text().0
    }

    /// Presenter notes joined with newlines
    pub fn presenter_notes(&self) -> String {
        self.split_text().1.join("\n")
    }

    /// Storages count as notes when their kind is NOTE or a note archive
    /// contains them.
    fn split_text(&self) -> &(Vec<String>, Vec<String>) {
        self.text.get_or_init(|| {
            let note_storages: HashSet<ArchiveId> = self
                .graph
                .objects_of_type::<NoteArchive>()
                .map(|(_, note)| note.contained_storage)
                .collect();

            let mut blocks = Vec::new();
            let mut notes = Vec::new();
            for (archive, storage) in self.graph.objects_of_type::<StorageArchive>() {
                let Some(text) = clean_text(storage.text.as_slice()) else {
                    continue;
                };
                if storage.is_note() || note_storages.contains(&archive) {
                    notes.push(text);
                } else {
                    blocks.push(text);
                }
            }
            (blocks, notes)
        })
    }

    /// Data item of the first thumbnail, if the package lists one
    pub fn thumbnail(&self) -> Option<&DataInfo> {
        self.thumbnail.as_ref()
    }

    /// Stored thumbnail digest as base64
    pub fn content_digest(&self) -> Option<String> {
        self.thumbnail.as_ref().map(|data| ident::encode_digest(&data.digest))
    }

    /// Path-safe thumbnail digest
    pub fn safe_thumb_hash(&self) -> Option<String> {
        self.content_digest().map(|digest| ident::safe_hash(&digest))
    }

    /// Raw thumbnail bytes, read from the container once
    ///
    /// `Ok(None)` when the slide has no thumbnail. A listed thumbnail whose
    /// entry is missing is a `NotFound` error.
    pub fn thumbnail_bytes<R: Read + Seek>(&self, container: &Container<R>) -> Result<Option<&[u8]>> {
        let bytes = self.thumbnail_bytes.get_or_try_init(|| match &self.thumbnail {
            Some(data) => container
                .read_entry(&data_entry_name(data.stored_file_name()))
                .map(Some),
            None => Ok(None),
        })?;
        Ok(bytes.as_deref())
    }

    /// Flattened record of this slide
    pub fn record(&self, identity: &DocumentIdentity) -> SlideRecord {
        SlideRecord {
            slide_number: self.ordinal,
            text_blocks: self.text_blocks().join("\n"),
            presenter_notes: self.presenter_notes(),
            is_skipped: self.is_skipped(),
            id: identity.stable_slide_id(self.identifier),
            content_digest: self.content_digest(),
            thumb_digest: self.safe_thumb_hash(),
            slide_ident: self.identifier,
        }
    }
}
