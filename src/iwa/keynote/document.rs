//! Keynote Document Implementation
//!
//! Provides the document-level extraction pipeline: open the container,
//! decode the document and metadata graphs, walk the slide tree and
//! materialize each slide from its own entry.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};

use log::{debug, warn};
use once_cell::sync::OnceCell;

use super::metadata::{self, DocumentIdentity, PackageIndex};
use super::show::{KeynoteShow, SlideNodeEntry};
use super::slide::Slide;
use crate::config::ExtractOptions;
use crate::iwa::archive::Chunk;
use crate::iwa::container::Container;
use crate::iwa::ref_graph::ObjectGraph;
use crate::iwa::{Error, Result};
use crate::record::DocumentRecord;

/// Result of materializing one slide-tree entry
#[derive(Debug)]
pub enum SlideOutcome {
    Loaded(Slide),
    /// The entry could not be materialized and is left out of the slide list
    Omitted { ordinal: usize, reason: String },
}

impl SlideOutcome {
    pub fn ordinal(&self) -> usize {
        match self {
            SlideOutcome::Loaded(slide) => slide.ordinal(),
            SlideOutcome::Omitted { ordinal, .. } => *ordinal,
        }
    }

    pub fn slide(&self) -> Option<&Slide> {
        match self {
            SlideOutcome::Loaded(slide) => Some(slide),
            SlideOutcome::Omitted { .. } => None,
        }
    }
}

/// High-level interface for Keynote documents
///
/// Decoded state is computed on first use and cached; a `KeynoteFile` is
/// `Send + Sync` and may be shared, but each instance owns its own graphs.
pub struct KeynoteFile<R = File> {
    path: PathBuf,
    container: Container<R>,
    options: ExtractOptions,
    document: OnceCell<ObjectGraph>,
    package: OnceCell<PackageIndex>,
    identity: OnceCell<DocumentIdentity>,
    slides: OnceCell<Vec<SlideOutcome>>,
}

impl KeynoteFile<File> {
    /// Open a Keynote document from a path
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use slydb::iwa::keynote::KeynoteFile;
    ///
    /// let doc = KeynoteFile::open("presentation.key")?;
    /// for slide in doc.slides()? {
    ///     println!("{}: {:?}", slide.ordinal(), slide.text_blocks());
    /// }
    /// # Ok::<(), slydb::Error>(())
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, ExtractOptions::default())
    }

    /// Open a Keynote document with extraction options
    pub fn open_with<P: AsRef<Path>>(path: P, options: ExtractOptions) -> Result<Self> {
        let path = std::path::absolute(path.as_ref())?;
        let container = Container::open(&path)?;
        Ok(Self::with_container(path, container, options))
    }
}

impl<R: Read + Seek> KeynoteFile<R> {
    /// Open a Keynote document from any seekable reader
    ///
    /// `path` is only used for logging and the record's `path` field.
    pub fn from_reader(reader: R, path: impl Into<PathBuf>, options: ExtractOptions) -> Result<Self> {
        let container = Container::from_reader(reader)?;
        Ok(Self::with_container(path.into(), container, options))
    }

    fn with_container(path: PathBuf, container: Container<R>, options: ExtractOptions) -> Self {
        Self {
            path,
            container,
            options,
            document: OnceCell::new(),
            package: OnceCell::new(),
            identity: OnceCell::new(),
            slides: OnceCell::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn container(&self) -> &Container<R> {
        &self.container
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Object graph of `Index/Document.iwa`
    pub fn document_graph(&self) -> Result<&ObjectGraph> {
        self.document
            .get_or_try_init(|| self.read_graph(metadata::DOCUMENT_ENTRY, None))
    }

    /// Component and data tables of `Index/Metadata.iwa`
    pub fn package_index(&self) -> Result<&PackageIndex> {
        self.package.get_or_try_init(|| {
            let graph = self.read_graph(metadata::METADATA_ENTRY, None)?;
            PackageIndex::from_graph(&graph)
        })
    }

    /// Document UUID, revision and format version
    pub fn identity(&self) -> Result<&DocumentIdentity> {
        self.identity.get_or_try_init(|| {
            let document_id = metadata::read_document_id(&self.container)?;
            Ok(DocumentIdentity::new(document_id, self.package_index()?))
        })
    }

    /// Every slide-tree entry, loaded or omitted, in tree order
    ///
    /// Fails only when the document root, its show or the package metadata
    /// cannot be read.
    pub fn slide_outcomes(&self) -> Result<&[SlideOutcome]> {
        let outcomes = self.slides.get_or_try_init(|| {
            let graph = self.document_graph()?;
            let package = self.package_index()?;
            let show = KeynoteShow::from_graph(graph)?;
            debug!("{}: {} slide tree entries", self.path.display(), show.slide_count());

            let outcomes = show
                .slide_nodes()
                .map(|entry| {
                    let ordinal = entry.ordinal;
                    match self.load_slide(package, entry) {
                        Ok(slide) => SlideOutcome::Loaded(slide),
                        Err(e) => {
                            warn!("Omitting slide {} of {}: {}", ordinal, self.path.display(), e);
                            SlideOutcome::Omitted {
                                ordinal,
                                reason: e.to_string(),
                            }
                        },
                    }
                })
                .collect();
            Ok::<_, Error>(outcomes)
        })?;
        Ok(outcomes)
    }

    /// Loaded slides in tree order
    pub fn slides(&self) -> Result<Vec<&Slide>> {
        Ok(self
            .slide_outcomes()?
            .iter()
            .filter_map(SlideOutcome::slide)
            .collect())
    }

    /// Raw thumbnail bytes of a slide
    pub fn thumbnail_bytes<'s>(&self, slide: &'s Slide) -> Result<Option<&'s [u8]>> {
        slide.thumbnail_bytes(&self.container)
    }

    /// Write every distinct slide thumbnail to `dest/<safe hash>.jpg`
    ///
    /// Slides without a thumbnail are skipped. A thumbnail that cannot be
    /// read or written is logged and skipped; only failing to create `dest`
    /// is an error. Returns the written paths in slide order.
    pub fn export_thumbnails(&self, dest: &Path) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(dest)?;

        let mut seen = HashSet::new();
        let mut written = Vec::new();
        for slide in self.slides()? {
            let Some(hash) = slide.safe_thumb_hash() else {
                continue;
            };
            if seen.contains(&hash) {
                continue;
            }

            let bytes = match self.thumbnail_bytes(slide) {
                Ok(Some(bytes)) => bytes,
                Ok(None) => continue,
                Err(e) => {
                    warn!(
                        "Skipping thumbnail of slide {} of {}: {}",
                        slide.ordinal(),
                        self.path.display(),
                        e
                    );
                    continue;
                },
            };

            let target = dest.join(format!("{}.jpg", hash));
            if let Err(e) = fs::write(&target, bytes) {
                warn!(
                    "Could not write thumbnail of slide {} of {} to {}: {}",
                    slide.ordinal(),
                    self.path.display(),
                    target.display(),
                    e
                );
                continue;
            }
            seen.insert(hash);
            written.push(target);
        }
        Ok(written)
    }

    /// Flattened record of the document and its loaded slides
    pub fn record(&self) -> Result<DocumentRecord> {
        let identity = self.identity()?;
        let slides = self
            .slides()?
            .into_iter()
            .map(|slide| slide.record(identity))
            .collect();

        Ok(DocumentRecord {
            path: self.options.relative_path(&self.path),
            id: identity.document_id.clone(),
            revision: identity.revision.clone(),
            file_format_version: identity.file_format_version.clone(),
            slides,
        })
    }

    /// Decode one entry into a graph
    ///
    /// Skipped segments and rejected payloads are logged with the document
    /// path, and the slide ordinal when the entry backs a slide.
    fn read_graph(&self, entry: &str, ordinal: Option<usize>) -> Result<ObjectGraph> {
        let raw = self.container.read_entry(entry)?;
        let mut graph = ObjectGraph::new();
        let report = graph.register_chunk(Chunk::from_entry(&raw)?);

        let location = match ordinal {
            Some(ordinal) => format!("slide {} ({})", ordinal, entry),
            None => entry.to_string(),
        };
        for reason in &report.skipped {
            warn!("{}: skipped {} of {}", self.path.display(), reason, location);
        }
        for segment in graph.segments() {
            for rejected in &segment.rejected {
                warn!(
                    "{}: rejected message of type {} in archive {} of {}: {}",
                    self.path.display(),
                    rejected.type_,
                    segment.identifier,
                    location,
                    rejected.reason
                );
            }
        }

        debug!("{}: {} archives in {}", self.path.display(), report.registered, entry);
        Ok(graph)
    }

    fn load_slide(&self, package: &PackageIndex, entry: SlideNodeEntry<'_>) -> Result<Slide> {
        let node = entry.node?;
        let identifier = node.slide.ok_or_else(|| Error::SchemaMismatch {
            tag: crate::iwa::registry::tags::SLIDE_NODE,
            field: "slide",
            reason: format!("slide node {} has no slide", entry.node_id),
        })?;

        let slide_entry = package.component_entry(identifier).ok_or_else(|| {
            Error::NotFound(format!("component {} in {}", identifier, metadata::METADATA_ENTRY))
        })?;
        let graph = self.read_graph(&slide_entry, Some(entry.ordinal))?;

        let thumbnail = node.thumbnails.first().and_then(|&data_id| {
            let data = package.data(data_id).cloned();
            if data.is_none() {
                debug!(
                    "Slide {} of {}: thumbnail data {} not listed",
                    entry.ordinal,
                    self.path.display(),
                    data_id
                );
            }
            data
        });

        Ok(Slide::new(entry.ordinal, identifier, node.clone(), graph, thumbnail))
    }
}

impl<R> std::fmt::Debug for KeynoteFile<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeynoteFile")
            .field("path", &self.path)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
