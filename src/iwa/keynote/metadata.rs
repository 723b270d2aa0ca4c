//! Package metadata: component and data tables, document identity

use std::collections::HashMap;
use std::io::{Cursor, Read, Seek};

use crate::iwa::archive::ArchiveId;
use crate::iwa::container::Container;
use crate::iwa::keynote::ident;
use crate::iwa::ref_graph::ObjectGraph;
use crate::iwa::typed::{ComponentInfo, DataInfo, PackageMetadata};
use crate::iwa::{Error, Result};

/// Entry holding the document root and slide tree
pub const DOCUMENT_ENTRY: &str = "Index/Document.iwa";
/// Entry holding the package metadata
pub const METADATA_ENTRY: &str = "Index/Metadata.iwa";
/// Plain-text document UUID
pub const DOCUMENT_IDENTIFIER_ENTRY: &str = "Metadata/DocumentIdentifier";
/// Property list with a `documentUUID` key, used when the identifier entry is absent
pub const PROPERTIES_ENTRY: &str = "Metadata/Properties.plist";
/// Directory of stored assets
pub const DATA_PREFIX: &str = "Data/";

/// Container entry of a component locator
pub fn component_entry_name(locator: &str) -> String {
    format!("Index/{}.iwa", locator)
}

/// Container entry of a stored asset
pub fn data_entry_name(file_name: &str) -> String {
    format!("{}{}", DATA_PREFIX, file_name)
}

/// Lookup tables built from `TSP.PackageMetadata`
#[derive(Debug, Clone, Default)]
pub struct PackageIndex {
    components: HashMap<u64, ComponentInfo>,
    datas: HashMap<u64, DataInfo>,
    revision: Option<String>,
    file_format_version: Option<String>,
}

impl PackageIndex {
    /// Build the index from the first package metadata object of a graph
    pub fn from_graph(graph: &ObjectGraph) -> Result<Self> {
        let (_, metadata) = graph.find_first::<PackageMetadata>()?;
        Ok(Self::from_metadata(metadata))
    }

    pub fn from_metadata(metadata: &PackageMetadata) -> Self {
        let components = metadata
            .components
            .iter()
            .map(|component| (component.identifier, component.clone()))
            .collect();
        let datas = metadata
            .datas
            .iter()
            .map(|data| (data.identifier, data.clone()))
            .collect();

        let revision = metadata
            .revision
            .as_ref()
            .and_then(|revision| revision.identifier.as_deref())
            .map(ident::normalize_uuid);

        let file_format_version = (!metadata.file_format_version.is_empty()).then(|| {
            metadata
                .file_format_version
                .iter()
                .map(u64::to_string)
                .collect::<Vec<_>>()
                .join(".")
        });

        Self {
            components,
            datas,
            revision,
            file_format_version,
        }
    }

    pub fn component(&self, identifier: ArchiveId) -> Option<&ComponentInfo> {
        self.components.get(&identifier)
    }

    /// Container entry backing a component
    pub fn component_entry(&self, identifier: ArchiveId) -> Option<String> {
        self.component(identifier)
            .map(|component| component_entry_name(component.entry_locator()))
    }

    pub fn data(&self, identifier: u64) -> Option<&DataInfo> {
        self.datas.get(&identifier)
    }

    /// Revision identifier, normalised when it is a UUID
    pub fn revision(&self) -> Option<&str> {
        self.revision.as_deref()
    }

    /// Dotted file format version, e.g. `14.1.0`
    pub fn file_format_version(&self) -> Option<&str> {
        self.file_format_version.as_deref()
    }
}

/// Identity of one document revision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentIdentity {
    pub document_id: String,
    pub revision: Option<String>,
    pub file_format_version: Option<String>,
}

impl DocumentIdentity {
    pub fn new(document_id: String, index: &PackageIndex) -> Self {
        Self {
            document_id,
            revision: index.revision().map(str::to_string),
            file_format_version: index.file_format_version().map(str::to_string),
        }
    }

    /// Stable id of a slide in this revision
    pub fn stable_slide_id(&self, slide_id: ArchiveId) -> String {
        ident::stable_slide_id(&self.document_id, self.revision.as_deref(), slide_id)
    }
}

/// Read the document UUID from the package
///
/// Prefers `Metadata/DocumentIdentifier`; falls back to the `documentUUID`
/// key of `Metadata/Properties.plist`.
pub fn read_document_id<R: Read + Seek>(container: &Container<R>) -> Result<String> {
    match container.read_entry(DOCUMENT_IDENTIFIER_ENTRY) {
        Ok(bytes) => return Ok(ident::normalize_uuid(&String::from_utf8_lossy(&bytes))),
        Err(Error::NotFound(_)) => {},
        Err(e) => return Err(e),
    }

    let properties = match container.read_entry(PROPERTIES_ENTRY) {
        Ok(bytes) => bytes,
        Err(Error::NotFound(_)) => return Err(Error::NotFound(DOCUMENT_IDENTIFIER_ENTRY.to_string())),
        Err(e) => return Err(e),
    };

    let value = plist::Value::from_reader(Cursor::new(properties))
        .map_err(|e| Error::Container(format!("Invalid {}: {}", PROPERTIES_ENTRY, e)))?;
    value
        .as_dictionary()
        .and_then(|dict| dict.get("documentUUID"))
        .and_then(plist::Value::as_string)
        .map(ident::normalize_uuid)
        .ok_or_else(|| Error::NotFound(format!("{}:documentUUID", PROPERTIES_ENTRY)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iwa::typed::DocumentRevision;
    use crate::iwa::protobuf::FieldSet;
    use bytes::Bytes;

    fn metadata() -> PackageMetadata {
        PackageMetadata {
            last_object_identifier: 900,
            revision: Some(DocumentRevision {
                sequence32: Some(3),
                identifier: Some("2B7E1516-28AE-4D2A-A6D2-ABF7158809CF".to_string()),
                sequence64: None,
            }),
            components: vec![
                ComponentInfo {
                    identifier: 40,
                    preferred_locator: "Slide-40".to_string(),
                    locator: Some("Slide-40-2".to_string()),
                },
                ComponentInfo {
                    identifier: 50,
                    preferred_locator: "Slide-50".to_string(),
                    locator: None,
                },
            ],
            datas: vec![DataInfo {
                identifier: 7,
                digest: Bytes::from_static(&[1, 2, 3]),
                preferred_file_name: "st-1.jpg".to_string(),
                file_name: None,
            }],
            read_version: vec![14, 0],
            write_version: vec![14, 1],
            file_format_version: vec![14, 1, 0],
            extras: FieldSet::new(),
        }
    }

    #[test]
    fn test_index_lookups() {
        let index = PackageIndex::from_metadata(&metadata());
        assert_eq!(index.component_entry(40).as_deref(), Some("Index/Slide-40-2.iwa"));
        assert_eq!(index.component_entry(50).as_deref(), Some("Index/Slide-50.iwa"));
        assert_eq!(index.component_entry(60), None);
        assert_eq!(index.data(7).map(DataInfo::stored_file_name), Some("st-1.jpg"));
        assert_eq!(index.revision(), Some("2b7e1516-28ae-4d2a-a6d2-abf7158809cf"));
        assert_eq!(index.file_format_version(), Some("14.1.0"));
    }

    #[test]
    fn test_identity_without_revision() {
        let mut metadata = metadata();
        metadata.revision = None;
        metadata.file_format_version.clear();
        let index = PackageIndex::from_metadata(&metadata);
        let identity = DocumentIdentity::new("doc".to_string(), &index);
        assert_eq!(identity.revision, None);
        assert_eq!(identity.file_format_version, None);
        assert_eq!(
            identity.stable_slide_id(1),
            ident::stable_slide_id("doc", Some(ident::MISSING_REVISION), 1)
        );
    }

    #[test]
    fn test_entry_names() {
        assert_eq!(data_entry_name("a.jpg"), "Data/a.jpg");
        assert_eq!(component_entry_name("Slide"), "Index/Slide.iwa");
    }
}
