//! Batch extraction over directory trees.
//!
//! Every document is extracted independently, so a worker pool can process
//! many of them at once. A document that cannot be extracted yields a
//! [`ExtractionOutcome::Failed`] entry instead of halting the batch.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use rayon::prelude::*;
use serde_json::{Map, Value};
use walkdir::WalkDir;

use crate::config::{ExtractOptions, IndexOptions};
use crate::iwa::Result;
use crate::iwa::keynote::KeynoteFile;
use crate::record::DocumentRecord;

/// File extension of single-file Keynote packages
pub const KEYNOTE_EXTENSION: &str = "key";

/// Result of extracting one file
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionOutcome {
    Extracted { path: PathBuf, record: DocumentRecord },
    /// No records were produced for the file
    Failed { path: PathBuf, cause: String },
}

impl ExtractionOutcome {
    pub fn path(&self) -> &Path {
        match self {
            ExtractionOutcome::Extracted { path, .. } | ExtractionOutcome::Failed { path, .. } => path,
        }
    }

    pub fn record(&self) -> Option<&DocumentRecord> {
        match self {
            ExtractionOutcome::Extracted { record, .. } => Some(record),
            ExtractionOutcome::Failed { .. } => None,
        }
    }
}

/// Extract one document, exporting its thumbnails when a directory is set
///
/// Thumbnail export failures are logged and never fail the document.
pub fn extract_file(path: &Path, options: &ExtractOptions) -> Result<DocumentRecord> {
    let doc = KeynoteFile::open_with(path, options.clone())?;
    let record = doc.record()?;
    if let Some(dir) = &options.thumbnail_dir {
        match doc.export_thumbnails(dir) {
            Ok(written) => debug!("{}: exported {} thumbnails", path.display(), written.len()),
            Err(e) => warn!(
                "{}: thumbnail export to {} failed: {}",
                path.display(),
                dir.display(),
                e
            ),
        }
    }
    Ok(record)
}

/// Keynote files under `root` in sorted path order
///
/// Empty files and paths matching an exclude pattern are skipped.
pub fn find_documents(root: &Path, options: &IndexOptions) -> Vec<PathBuf> {
    let mut found = Vec::new();
    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable path under {}: {}", root.display(), e);
                continue;
            },
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some(KEYNOTE_EXTENSION) {
            continue;
        }
        if options.is_excluded(path) {
            debug!("Excluded {}", path.display());
            continue;
        }
        match entry.metadata() {
            Ok(metadata) if metadata.len() > 0 => found.push(path.to_path_buf()),
            Ok(_) => debug!("Skipping empty file {}", path.display()),
            Err(e) => warn!("Skipping {}: {}", path.display(), e),
        }
    }
    found
}

/// Extract every Keynote file under `root`
///
/// Returns one outcome per file, in path order. Runs on a dedicated pool
/// when `options.workers` is set, otherwise on the global rayon pool.
pub fn index_path(root: &Path, options: &IndexOptions) -> Vec<ExtractionOutcome> {
    let paths = find_documents(root, options);
    info!("Indexing {} documents under {}", paths.len(), root.display());

    let run = || -> Vec<ExtractionOutcome> {
        paths
            .par_iter()
            .map(|path| match extract_file(path, &options.extract) {
                Ok(record) => {
                    info!("{}: {} slides", path.display(), record.slides.len());
                    ExtractionOutcome::Extracted {
                        path: path.clone(),
                        record,
                    }
                },
                Err(e) => {
                    warn!("{}: 0 records produced: {}", path.display(), e);
                    ExtractionOutcome::Failed {
                        path: path.clone(),
                        cause: format!("0 records produced: {}", e),
                    }
                },
            })
            .collect()
    };

    match options.workers {
        Some(workers) => match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
            Ok(pool) => pool.install(run),
            Err(e) => {
                warn!("Could not build a pool of {} workers, using the global pool: {}", workers, e);
                run()
            },
        },
        None => run(),
    }
}

/// Write the successful records of a batch as pretty JSON
pub fn write_records(path: &Path, outcomes: &[ExtractionOutcome]) -> Result<usize> {
    let records: Vec<&DocumentRecord> = outcomes.iter().filter_map(ExtractionOutcome::record).collect();
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, &records)?;
    writer.flush()?;
    Ok(records.len())
}

/// Flatten document records into one search document per slide
///
/// Slide fields win over document fields of the same name. With a
/// `thumb_url`, a slide's `thumb_digest` becomes a `thumbnail` URL; with
/// `skip_dupes`, slides repeating an earlier thumbnail are dropped.
pub fn arrange_records(
    records: &[DocumentRecord],
    thumb_url: Option<&str>,
    skip_dupes: bool,
) -> Result<Vec<Map<String, Value>>> {
    let mut seen = HashSet::new();
    let mut arranged = Vec::new();

    for record in records {
        let Value::Object(mut document) = serde_json::to_value(record)? else {
            continue;
        };
        let slides = document.remove("slides");

        for slide in slides.iter().filter_map(Value::as_array).flatten() {
            let Some(fields) = slide.as_object() else {
                continue;
            };
            let mut merged = document.clone();
            merged.extend(fields.iter().map(|(key, value)| (key.clone(), value.clone())));

            if let Some(url) = thumb_url {
                let digest = merged
                    .get("thumb_digest")
                    .and_then(Value::as_str)
                    .filter(|digest| !digest.is_empty())
                    .map(str::to_string);
                if let Some(digest) = digest {
                    merged.remove("thumb_digest");
                    if skip_dupes && seen.contains(&digest) {
                        continue;
                    }
                    merged.insert(
                        "thumbnail".to_string(),
                        Value::String(format!("{}/{}.jpg", url.trim_end_matches('/'), digest)),
                    );
                    seen.insert(digest);
                }
            }
            arranged.push(merged);
        }
    }
    Ok(arranged)
}
