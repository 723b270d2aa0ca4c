//! ZIP container access for single-file iWork packages
//!
//! Entry names are corrected once, when the container is opened. Names
//! stored without the UTF-8 flag are decoded as CP437 by the ZIP reader, but
//! macOS writes UTF-8 bytes regardless; the raw bytes are therefore tried as
//! UTF-8 first and the CP437 reading is the fallback.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use parking_lot::Mutex;
use zip::ZipArchive;
use zip::result::ZipError;

use crate::iwa::{Error, Result};

/// A read-only archive of named byte entries
#[derive(Debug)]
pub struct Container<R = File> {
    archive: Mutex<ZipArchive<R>>,
    /// Corrected entry name to index in the archive
    entries: BTreeMap<String, usize>,
}

impl Container<File> {
    /// Open a container on disk
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use slydb::iwa::Container;
    ///
    /// let container = Container::open("presentation.key")?;
    /// for name in container.list_entries() {
    ///     println!("{}", name);
    /// }
    /// # Ok::<(), slydb::Error>(())
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| Error::Container(format!("Could not open {}: {}", path.display(), e)))?;
        Self::from_reader(file).map_err(|e| match e {
            Error::Container(msg) => Error::Container(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }
}

impl<R: Read + Seek> Container<R> {
    /// Read the central directory and correct entry names
    pub fn from_reader(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader).map_err(container_error)?;
        let mut entries = BTreeMap::new();

        for index in 0..archive.len() {
            let entry = archive.by_index_raw(index).map_err(container_error)?;
            if entry.is_dir() {
                continue;
            }
            let name = corrected_name(entry.name_raw(), entry.name());
            entries.entry(name).or_insert(index);
        }

        Ok(Self {
            archive: Mutex::new(archive),
            entries,
        })
    }

    /// Read the full contents of an entry
    pub fn read_entry(&self, name: &str) -> Result<Vec<u8>> {
        let index = *self
            .entries
            .get(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))?;

        let mut archive = self.archive.lock();
        let mut entry = archive.by_index(index).map_err(container_error)?;
        let mut data = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut data)?;
        Ok(data)
    }

    /// Entry names in lexicographic order
    pub fn list_entries(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn container_error(err: ZipError) -> Error {
    match err {
        ZipError::Io(e) => Error::Io(e),
        other => Error::Container(other.to_string()),
    }
}

fn corrected_name(raw: &[u8], decoded: &str) -> String {
    match std::str::from_utf8(raw) {
        Ok(name) => name.to_string(),
        Err(_) => decoded.to_string(),
    }
}
