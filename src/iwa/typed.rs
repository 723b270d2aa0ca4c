//! Typed Keynote objects
//!
//! [`TypedObject`] is the closed set of payload variants the extractor works
//! with. Each variant is built from a schema-decoded [`Message`] and keeps the
//! message's undeclared fields. Payloads whose type id has no registered tag
//! become [`TypedObject::Opaque`].

use bytes::Bytes;

use crate::iwa::archive::ArchiveId;
use crate::iwa::object::{Message, Value};
use crate::iwa::protobuf::{FieldSet, WireError};
use crate::iwa::registry::{self, tags};
use crate::iwa::{Error, Result};

/// Kind of a text storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKind {
    Body,
    Header,
    Footnote,
    TextBox,
    Note,
    Cell,
    Unclassified,
    TableOfContents,
    /// Value written by a newer application version
    Other(i32),
}

impl StorageKind {
    pub fn from_i32(value: i32) -> Self {
        match value {
            0 => Self::Body,
            1 => Self::Header,
            2 => Self::Footnote,
            3 => Self::TextBox,
            4 => Self::Note,
            5 => Self::Cell,
            6 => Self::Unclassified,
            7 => Self::TableOfContents,
            other => Self::Other(other),
        }
    }
}

/// `KN.DocumentArchive`
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentArchive {
    pub show: ArchiveId,
    pub extras: FieldSet,
}

/// `KN.SlideTreeArchive`, embedded in the show
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlideTree {
    /// Slide nodes in presentation order
    pub slides: Vec<ArchiveId>,
    pub root_slide_node: Option<ArchiveId>,
}

/// `KN.ShowArchive`
#[derive(Debug, Clone, PartialEq)]
pub struct ShowArchive {
    pub theme: Option<ArchiveId>,
    pub slide_tree: SlideTree,
    pub stylesheet: Option<ArchiveId>,
    pub loop_presentation: bool,
    pub extras: FieldSet,
}

/// `KN.SlideNodeArchive`
#[derive(Debug, Clone, PartialEq)]
pub struct SlideNodeArchive {
    pub children: Vec<ArchiveId>,
    pub slide: Option<ArchiveId>,
    /// Data item identifiers of the rendered thumbnails
    pub thumbnails: Vec<u64>,
    pub is_skipped: bool,
    pub has_transition: bool,
    pub has_note: bool,
    pub thumbnails_are_dirty: bool,
    pub unique_identifier: Option<String>,
    pub extras: FieldSet,
}

/// `KN.SlideArchive`
#[derive(Debug, Clone, PartialEq)]
pub struct SlideArchive {
    pub name: Option<String>,
    pub note: Option<ArchiveId>,
    pub extras: FieldSet,
}

/// `KN.NoteArchive`
#[derive(Debug, Clone, PartialEq)]
pub struct NoteArchive {
    pub contained_storage: ArchiveId,
    pub extras: FieldSet,
}

/// `TSWP.StorageArchive`
#[derive(Debug, Clone, PartialEq)]
pub struct StorageArchive {
    pub kind: StorageKind,
    pub style_sheet: Option<ArchiveId>,
    /// Text runs as stored; usually a single string
    pub text: Vec<String>,
    pub has_itext: bool,
    pub in_document: bool,
    pub extras: FieldSet,
}

impl StorageArchive {
    pub fn is_note(&self) -> bool {
        self.kind == StorageKind::Note
    }
}

/// `TSP.DocumentRevision`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentRevision {
    pub sequence32: Option<i64>,
    pub identifier: Option<String>,
    pub sequence64: Option<i64>,
}

/// `TSP.ComponentInfo`: where an archive component is stored
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentInfo {
    pub identifier: u64,
    pub preferred_locator: String,
    pub locator: Option<String>,
}

impl ComponentInfo {
    /// Locator of the backing `.iwa` entry
    pub fn entry_locator(&self) -> &str {
        self.locator.as_deref().unwrap_or(&self.preferred_locator)
    }
}

/// `TSP.DataInfo`: one asset stored under `Data/`
#[derive(Debug, Clone, PartialEq)]
pub struct DataInfo {
    pub identifier: u64,
    pub digest: Bytes,
    pub preferred_file_name: String,
    pub file_name: Option<String>,
}

impl DataInfo {
    /// File name of the asset inside the package
    pub fn stored_file_name(&self) -> &str {
        self.file_name.as_deref().unwrap_or(&self.preferred_file_name)
    }
}

/// `TSP.PackageMetadata`
#[derive(Debug, Clone, PartialEq)]
pub struct PackageMetadata {
    pub last_object_identifier: u64,
    pub revision: Option<DocumentRevision>,
    pub components: Vec<ComponentInfo>,
    pub datas: Vec<DataInfo>,
    pub read_version: Vec<u64>,
    pub write_version: Vec<u64>,
    pub file_format_version: Vec<u64>,
    pub extras: FieldSet,
}

/// A payload whose type is not decoded by this crate
#[derive(Debug, Clone, PartialEq)]
pub struct OpaqueObject {
    pub type_id: u32,
    /// Registered tag, when the id is known but has no typed variant
    pub tag: Option<&'static str>,
    pub data: Bytes,
}

impl OpaqueObject {
    /// Raw wire fields of the payload
    pub fn fields(&self) -> std::result::Result<FieldSet, WireError> {
        FieldSet::parse(&self.data)
    }
}

/// One decoded payload of an archive segment
#[derive(Debug, Clone, PartialEq)]
pub enum TypedObject {
    Document(DocumentArchive),
    Show(ShowArchive),
    SlideNode(SlideNodeArchive),
    Slide(SlideArchive),
    Note(NoteArchive),
    Storage(StorageArchive),
    PackageMetadata(PackageMetadata),
    Opaque(OpaqueObject),
}

impl TypedObject {
    /// Decode a payload by its numeric type id
    ///
    /// Unknown ids never fail; payloads of known ids fail only when they do
    /// not fit their schema.
    pub fn decode(type_id: u32, data: Bytes) -> Result<Self> {
        let Some(schema) = registry::tag_for_type(type_id).and_then(registry::schema) else {
            return Ok(TypedObject::Opaque(OpaqueObject {
                type_id,
                tag: registry::tag_for_type(type_id),
                data,
            }));
        };

        let message = Message::decode(schema, &data)?;
        Ok(match schema.tag {
            tags::DOCUMENT => TypedObject::Document(DocumentArchive::from_message(message)?),
            tags::SHOW => TypedObject::Show(ShowArchive::from_message(message)?),
            tags::SLIDE_NODE => TypedObject::SlideNode(SlideNodeArchive::from_message(message)),
            tags::SLIDE => TypedObject::Slide(SlideArchive::from_message(message)),
            tags::NOTE => TypedObject::Note(NoteArchive::from_message(message)?),
            tags::STORAGE => TypedObject::Storage(StorageArchive::from_message(message)),
            tags::PACKAGE_METADATA => TypedObject::PackageMetadata(PackageMetadata::from_message(message)?),
            tag => TypedObject::Opaque(OpaqueObject {
                type_id,
                tag: Some(tag),
                data,
            }),
        })
    }

    /// Tag of the payload, if registered
    pub fn tag(&self) -> Option<&'static str> {
        match self {
            TypedObject::Document(_) => Some(tags::DOCUMENT),
            TypedObject::Show(_) => Some(tags::SHOW),
            TypedObject::SlideNode(_) => Some(tags::SLIDE_NODE),
            TypedObject::Slide(_) => Some(tags::SLIDE),
            TypedObject::Note(_) => Some(tags::NOTE),
            TypedObject::Storage(_) => Some(tags::STORAGE),
            TypedObject::PackageMetadata(_) => Some(tags::PACKAGE_METADATA),
            TypedObject::Opaque(opaque) => opaque.tag,
        }
    }
}

/// A typed variant that can be selected out of a [`TypedObject`]
pub trait ObjectVariant: Sized + 'static {
    const TAG: &'static str;

    fn from_object(object: &TypedObject) -> Option<&Self>;
}

macro_rules! object_variants {
    ($($variant:ident($ty:ty) => $tag:path),* $(,)?) => {
        $(
            impl ObjectVariant for $ty {
                const TAG: &'static str = $tag;

                fn from_object(object: &TypedObject) -> Option<&Self> {
                    match object {
                        TypedObject::$variant(inner) => Some(inner),
                        _ => None,
                    }
                }
            }
        )*
    };
}

object_variants! {
    Document(DocumentArchive) => tags::DOCUMENT,
    Show(ShowArchive) => tags::SHOW,
    SlideNode(SlideNodeArchive) => tags::SLIDE_NODE,
    Slide(SlideArchive) => tags::SLIDE,
    Note(NoteArchive) => tags::NOTE,
    Storage(StorageArchive) => tags::STORAGE,
    PackageMetadata(PackageMetadata) => tags::PACKAGE_METADATA,
}

fn missing(tag: &'static str, field: &'static str) -> Error {
    Error::SchemaMismatch {
        tag,
        field,
        reason: "required field missing".to_string(),
    }
}

fn references(message: &Message, name: &str) -> Vec<ArchiveId> {
    message.list(name).iter().filter_map(Value::as_reference).collect()
}

fn uints(message: &Message, name: &str) -> Vec<u64> {
    message.list(name).iter().filter_map(Value::as_u64).collect()
}

impl DocumentArchive {
    fn from_message(message: Message) -> Result<Self> {
        Ok(Self {
            show: message.reference("show").ok_or_else(|| missing(tags::DOCUMENT, "show"))?,
            extras: message.extras,
        })
    }
}

impl ShowArchive {
    fn from_message(message: Message) -> Result<Self> {
        let tree = message
            .message("slideTree")
            .ok_or_else(|| missing(tags::SHOW, "slideTree"))?;
        let slide_tree = SlideTree {
            slides: references(tree, "slides"),
            root_slide_node: tree.reference("rootSlideNode"),
        };

        Ok(Self {
            theme: message.reference("theme"),
            slide_tree,
            stylesheet: message.reference("stylesheet"),
            loop_presentation: message.bool("loopPresentation"),
            extras: message.extras,
        })
    }
}

impl SlideNodeArchive {
    fn from_message(message: Message) -> Self {
        Self {
            children: references(&message, "children"),
            slide: message.reference("slide"),
            thumbnails: message
                .list("thumbnails")
                .iter()
                .filter_map(Value::as_data_reference)
                .collect(),
            is_skipped: message.bool("isSkipped"),
            has_transition: message.bool("hasTransition"),
            has_note: message.bool("hasNote"),
            thumbnails_are_dirty: message.bool("thumbnailsAreDirty"),
            unique_identifier: message.string("uniqueIdentifier").map(str::to_string),
            extras: message.extras,
        }
    }
}

impl SlideArchive {
    fn from_message(message: Message) -> Self {
        Self {
            name: message.string("name").map(str::to_string),
            note: message.reference("note"),
            extras: message.extras,
        }
    }
}

impl NoteArchive {
    fn from_message(message: Message) -> Result<Self> {
        Ok(Self {
            contained_storage: message
                .reference("containedStorage")
                .ok_or_else(|| missing(tags::NOTE, "containedStorage"))?,
            extras: message.extras,
        })
    }
}

impl StorageArchive {
    fn from_message(message: Message) -> Self {
        let kind = message
            .enum_value("kind")
            .map_or(StorageKind::TextBox, |kind| StorageKind::from_i32(kind.number));

        Self {
            kind,
            style_sheet: message.reference("styleSheet"),
            text: message
                .list("text")
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            has_itext: message.bool("hasItext"),
            in_document: message.bool("inDocument"),
            extras: message.extras,
        }
    }
}

impl PackageMetadata {
    fn from_message(message: Message) -> Result<Self> {
        let revision = message.message("revision").map(|revision| DocumentRevision {
            sequence32: revision.int("sequence32"),
            identifier: revision.string("identifier").map(str::to_string),
            sequence64: revision.int("sequence64"),
        });

        let components = message
            .list("components")
            .iter()
            .filter_map(Value::as_message)
            .map(|component| {
                Ok(ComponentInfo {
                    identifier: component
                        .uint("identifier")
                        .ok_or_else(|| missing(tags::COMPONENT_INFO, "identifier"))?,
                    preferred_locator: component
                        .string("preferredLocator")
                        .ok_or_else(|| missing(tags::COMPONENT_INFO, "preferredLocator"))?
                        .to_string(),
                    locator: component.string("locator").map(str::to_string),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let datas = message
            .list("datas")
            .iter()
            .filter_map(Value::as_message)
            .map(|data| {
                Ok(DataInfo {
                    identifier: data
                        .uint("identifier")
                        .ok_or_else(|| missing(tags::DATA_INFO, "identifier"))?,
                    digest: data
                        .bytes("digest")
                        .cloned()
                        .ok_or_else(|| missing(tags::DATA_INFO, "digest"))?,
                    preferred_file_name: data
                        .string("preferredFileName")
                        .ok_or_else(|| missing(tags::DATA_INFO, "preferredFileName"))?
                        .to_string(),
                    file_name: data.string("fileName").map(str::to_string),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            last_object_identifier: message
                .uint("lastObjectIdentifier")
                .ok_or_else(|| missing(tags::PACKAGE_METADATA, "lastObjectIdentifier"))?,
            revision,
            components,
            datas,
            read_version: uints(&message, "readVersion"),
            write_version: uints(&message, "writeVersion"),
            file_format_version: uints(&message, "fileFormatVersion"),
            extras: message.extras,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_type_is_opaque() {
        let data = Bytes::from_static(&[0x08, 0x01, 0x12, 0x00]);
        let object = TypedObject::decode(424242, data.clone()).unwrap();
        match &object {
            TypedObject::Opaque(opaque) => {
                assert_eq!(opaque.type_id, 424242);
                assert_eq!(opaque.tag, None);
                assert_eq!(opaque.data, data);
                assert_eq!(opaque.fields().unwrap().len(), 2);
            },
            other => panic!("Expected opaque object, got {:?}", other),
        }
        assert_eq!(object.tag(), None);
    }

    #[test]
    fn test_unknown_type_with_garbage_payload() {
        let object = TypedObject::decode(77, Bytes::from_static(&[0xFF])).unwrap();
        assert!(matches!(object, TypedObject::Opaque(_)));
    }

    #[test]
    fn test_show_slide_tree() {
        // slideTree { slides: [ {4}, {0}, {5} ] }, loopPresentation: true
        let data = Bytes::from_static(&[
            0x12, 0x0C, 0x0A, 0x02, 0x08, 0x04, 0x0A, 0x02, 0x08, 0x00, 0x0A, 0x02, 0x08, 0x05, 0x30, 0x01,
        ]);
        let object = TypedObject::decode(2, data).unwrap();
        let show = ShowArchive::from_object(&object).unwrap();
        assert_eq!(show.slide_tree.slides, vec![4, 5]);
        assert!(show.loop_presentation);
        assert_eq!(show.theme, None);
        assert!(SlideNodeArchive::from_object(&object).is_none());
    }

    #[test]
    fn test_storage_kind_and_text() {
        let data = Bytes::from_static(&[0x08, 0x04, 0x1A, 0x03, b'a', b'b', b'c']);
        let object = TypedObject::decode(2001, data).unwrap();
        let storage = StorageArchive::from_object(&object).unwrap();
        assert!(storage.is_note());
        assert_eq!(storage.text, vec!["abc".to_string()]);

        let body = TypedObject::decode(2005, Bytes::from_static(&[0x1A, 0x00])).unwrap();
        let storage = StorageArchive::from_object(&body).unwrap();
        assert_eq!(storage.kind, StorageKind::TextBox);
    }

    #[test]
    fn test_future_storage_kind() {
        let object = TypedObject::decode(2001, Bytes::from_static(&[0x08, 0x0B])).unwrap();
        let storage = StorageArchive::from_object(&object).unwrap();
        assert_eq!(storage.kind, StorageKind::Other(11));
        assert!(!storage.is_note());
    }

    #[test]
    fn test_slide_variants_share_tag() {
        let five = TypedObject::decode(5, Bytes::new()).unwrap();
        let six = TypedObject::decode(6, Bytes::new()).unwrap();
        assert_eq!(five.tag(), Some(tags::SLIDE));
        assert_eq!(five, six);
    }

    #[test]
    fn test_component_locator_fallback() {
        let component = ComponentInfo {
            identifier: 1,
            preferred_locator: "Slide-1".to_string(),
            locator: None,
        };
        assert_eq!(component.entry_locator(), "Slide-1");

        let data = DataInfo {
            identifier: 2,
            digest: Bytes::from_static(b"\x01"),
            preferred_file_name: "thumb.jpg".to_string(),
            file_name: Some("thumb-2.jpg".to_string()),
        };
        assert_eq!(data.stored_file_name(), "thumb-2.jpg");
    }
}
