//! Extraction records
//!
//! These are the only structures handed to indexing collaborators. Field
//! names are part of the JSON contract.

use serde::{Deserialize, Serialize};

/// One slide of an extracted document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideRecord {
    /// Position in the slide tree, from 0
    pub slide_number: usize,
    /// Text blocks joined with newlines
    pub text_blocks: String,
    pub presenter_notes: String,
    pub is_skipped: bool,
    /// Stable slide id
    pub id: String,
    /// Stored thumbnail digest, base64
    pub content_digest: Option<String>,
    /// Path-safe form of `content_digest`
    pub thumb_digest: Option<String>,
    /// Native slide identifier inside the document
    pub slide_ident: u64,
}

/// One extracted document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Container path with the configured root prefix removed
    pub path: String,
    pub id: String,
    pub revision: Option<String>,
    pub file_format_version: Option<String>,
    pub slides: Vec<SlideRecord>,
}
