//! Keynote Presentation Support
//!
//! This module extracts slide text, presenter notes, thumbnails and stable
//! identifiers from Keynote `.key` archives.
//!
//! ## Layout
//!
//! - `Index/Document.iwa` holds the document root, the show and its slide tree
//! - `Index/Metadata.iwa` maps slide identifiers to their own entries and
//!   thumbnail data identifiers to files under `Data/`
//! - `Index/<locator>.iwa` holds one slide's drawables and text storages
//!
//! ## Example
//!
//! ```rust,no_run
//! use slydb::iwa::keynote::KeynoteFile;
//!
//! let doc = KeynoteFile::open("presentation.key")?;
//! let record = doc.record()?;
//!
//! for slide in &record.slides {
//!     println!("Slide {} [{}]: {}", slide.slide_number, slide.id, slide.text_blocks);
//!     if !slide.presenter_notes.is_empty() {
//!         println!("  notes: {}", slide.presenter_notes);
//!     }
//! }
//! # Ok::<(), slydb::Error>(())
//! ```

pub mod document;
pub mod ident;
pub mod metadata;
pub mod show;
pub mod slide;

pub use document::{KeynoteFile, SlideOutcome};
pub use metadata::{DocumentIdentity, PackageIndex};
pub use show::{KeynoteShow, SlideNodeEntry};
pub use slide::Slide;
