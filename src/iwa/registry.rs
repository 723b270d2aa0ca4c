//! Message Type and Schema Registry for Keynote Archives
//!
//! Keynote identifies each payload by an integer type id. This registry maps
//! the ids the extractor understands to their protobuf tag names, and each
//! tag to the subset of its schema needed for text, notes, thumbnails and
//! document identity. Anything else decodes as an opaque object.

use phf::phf_map;

/// Tag names of the registered message types
pub mod tags {
    pub const DOCUMENT: &str = "KN.DocumentArchive";
    pub const SHOW: &str = "KN.ShowArchive";
    pub const SLIDE_TREE: &str = "KN.SlideTreeArchive";
    pub const SLIDE_NODE: &str = "KN.SlideNodeArchive";
    pub const SLIDE: &str = "KN.SlideArchive";
    pub const NOTE: &str = "KN.NoteArchive";
    pub const STORAGE: &str = "TSWP.StorageArchive";
    pub const PACKAGE_METADATA: &str = "TSP.PackageMetadata";
    pub const DOCUMENT_REVISION: &str = "TSP.DocumentRevision";
    pub const COMPONENT_INFO: &str = "TSP.ComponentInfo";
    pub const DATA_INFO: &str = "TSP.DataInfo";
}

/// Value names of an enum field
#[derive(Debug, PartialEq)]
pub struct EnumSpec {
    pub name: &'static str,
    pub values: &'static [(i32, &'static str)],
}

impl EnumSpec {
    /// Name of a numeric enum value, if known
    pub fn name_of(&self, number: i32) -> Option<&'static str> {
        self.values
            .iter()
            .find(|(value, _)| *value == number)
            .map(|(_, name)| *name)
    }
}

/// Expected kind of a schema field
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    Bool,
    UInt,
    Int,
    Double,
    String,
    Bytes,
    Enum(&'static EnumSpec),
    /// `TSP.Reference` to another archive
    Reference,
    /// `TSP.DataReference` to a package data item
    DataReference,
    /// Embedded message decoded with the schema of the given tag
    Message(&'static str),
}

/// Default applied when an optional field is absent
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldDefault {
    /// Leave the field absent
    None,
    Bool(bool),
    UInt(u64),
    Int(i64),
    Double(f64),
    Str(&'static str),
    Enum(i32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cardinality {
    Required,
    Optional(FieldDefault),
    Repeated,
}

/// One field of a message schema
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub number: u32,
    pub kind: FieldKind,
    pub cardinality: Cardinality,
}

const fn required(name: &'static str, number: u32, kind: FieldKind) -> FieldSpec {
    FieldSpec {
        name,
        number,
        kind,
        cardinality: Cardinality::Required,
    }
}

const fn optional(name: &'static str, number: u32, kind: FieldKind, default: FieldDefault) -> FieldSpec {
    FieldSpec {
        name,
        number,
        kind,
        cardinality: Cardinality::Optional(default),
    }
}

const fn repeated(name: &'static str, number: u32, kind: FieldKind) -> FieldSpec {
    FieldSpec {
        name,
        number,
        kind,
        cardinality: Cardinality::Repeated,
    }
}

/// Field layout of one message tag
#[derive(Debug, PartialEq)]
pub struct Schema {
    pub tag: &'static str,
    pub fields: &'static [FieldSpec],
}

impl Schema {
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|spec| spec.name == name)
    }

    pub fn field_by_number(&self, number: u32) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|spec| spec.number == number)
    }
}

pub const STORAGE_KIND: EnumSpec = EnumSpec {
    name: "TSWP.StorageArchive.KIND",
    values: &[
        (0, "BODY"),
        (1, "HEADER"),
        (2, "FOOTNOTE"),
        (3, "TEXTBOX"),
        (4, "NOTE"),
        (5, "CELL"),
        (6, "UNCLASSIFIED"),
        (7, "TABLOFCONTENTS"),
    ],
};

const DOCUMENT_ARCHIVE: Schema = Schema {
    tag: tags::DOCUMENT,
    fields: &[required("show", 2, FieldKind::Reference)],
};

const SHOW_ARCHIVE: Schema = Schema {
    tag: tags::SHOW,
    fields: &[
        optional("theme", 1, FieldKind::Reference, FieldDefault::None),
        required("slideTree", 2, FieldKind::Message(tags::SLIDE_TREE)),
        optional("stylesheet", 3, FieldKind::Reference, FieldDefault::None),
        optional("loopPresentation", 6, FieldKind::Bool, FieldDefault::Bool(false)),
    ],
};

const SLIDE_TREE_ARCHIVE: Schema = Schema {
    tag: tags::SLIDE_TREE,
    fields: &[
        repeated("slides", 1, FieldKind::Reference),
        optional("rootSlideNode", 2, FieldKind::Reference, FieldDefault::None),
    ],
};

const SLIDE_NODE_ARCHIVE: Schema = Schema {
    tag: tags::SLIDE_NODE,
    fields: &[
        repeated("children", 1, FieldKind::Reference),
        optional("slide", 2, FieldKind::Reference, FieldDefault::None),
        repeated("thumbnails", 3, FieldKind::DataReference),
        optional("isSkipped", 4, FieldKind::Bool, FieldDefault::Bool(false)),
        optional("hasTransition", 6, FieldKind::Bool, FieldDefault::Bool(false)),
        optional("hasNote", 7, FieldKind::Bool, FieldDefault::Bool(false)),
        optional("thumbnailsAreDirty", 8, FieldKind::Bool, FieldDefault::Bool(false)),
        optional("uniqueIdentifier", 13, FieldKind::String, FieldDefault::None),
    ],
};

const SLIDE_ARCHIVE: Schema = Schema {
    tag: tags::SLIDE,
    fields: &[
        optional("name", 7, FieldKind::String, FieldDefault::None),
        optional("note", 27, FieldKind::Reference, FieldDefault::None),
    ],
};

const NOTE_ARCHIVE: Schema = Schema {
    tag: tags::NOTE,
    fields: &[required("containedStorage", 1, FieldKind::Reference)],
};

const STORAGE_ARCHIVE: Schema = Schema {
    tag: tags::STORAGE,
    fields: &[
        optional("kind", 1, FieldKind::Enum(&STORAGE_KIND), FieldDefault::Enum(3)),
        optional("styleSheet", 2, FieldKind::Reference, FieldDefault::None),
        repeated("text", 3, FieldKind::String),
        optional("hasItext", 4, FieldKind::Bool, FieldDefault::Bool(false)),
        optional("inDocument", 10, FieldKind::Bool, FieldDefault::Bool(false)),
    ],
};

const PACKAGE_METADATA: Schema = Schema {
    tag: tags::PACKAGE_METADATA,
    fields: &[
        required("lastObjectIdentifier", 1, FieldKind::UInt),
        optional("revision", 2, FieldKind::Message(tags::DOCUMENT_REVISION), FieldDefault::None),
        repeated("components", 3, FieldKind::Message(tags::COMPONENT_INFO)),
        repeated("datas", 4, FieldKind::Message(tags::DATA_INFO)),
        repeated("readVersion", 6, FieldKind::UInt),
        repeated("writeVersion", 7, FieldKind::UInt),
        repeated("fileFormatVersion", 8, FieldKind::UInt),
    ],
};

const DOCUMENT_REVISION: Schema = Schema {
    tag: tags::DOCUMENT_REVISION,
    fields: &[
        optional("sequence32", 1, FieldKind::Int, FieldDefault::None),
        optional("identifier", 2, FieldKind::String, FieldDefault::None),
        optional("sequence64", 3, FieldKind::Int, FieldDefault::None),
    ],
};

const COMPONENT_INFO: Schema = Schema {
    tag: tags::COMPONENT_INFO,
    fields: &[
        required("identifier", 1, FieldKind::UInt),
        required("preferredLocator", 2, FieldKind::String),
        optional("locator", 3, FieldKind::String, FieldDefault::None),
    ],
};

const DATA_INFO: Schema = Schema {
    tag: tags::DATA_INFO,
    fields: &[
        required("identifier", 1, FieldKind::UInt),
        required("digest", 2, FieldKind::Bytes),
        required("preferredFileName", 3, FieldKind::String),
        optional("fileName", 4, FieldKind::String, FieldDefault::None),
    ],
};

/// Numeric type id to tag name
static TYPE_TAGS: phf::Map<u32, &'static str> = phf_map! {
    1u32 => "KN.DocumentArchive",
    2u32 => "KN.ShowArchive",
    4u32 => "KN.SlideNodeArchive",
    5u32 => "KN.SlideArchive",
    6u32 => "KN.SlideArchive",
    15u32 => "KN.NoteArchive",
    2001u32 => "TSWP.StorageArchive",
    2005u32 => "TSWP.StorageArchive",
    11006u32 => "TSP.PackageMetadata",
};

/// Tag name to schema, including tags only used as embedded messages
static SCHEMAS: phf::Map<&'static str, &'static Schema> = phf_map! {
    "KN.DocumentArchive" => &DOCUMENT_ARCHIVE,
    "KN.ShowArchive" => &SHOW_ARCHIVE,
    "KN.SlideTreeArchive" => &SLIDE_TREE_ARCHIVE,
    "KN.SlideNodeArchive" => &SLIDE_NODE_ARCHIVE,
    "KN.SlideArchive" => &SLIDE_ARCHIVE,
    "KN.NoteArchive" => &NOTE_ARCHIVE,
    "TSWP.StorageArchive" => &STORAGE_ARCHIVE,
    "TSP.PackageMetadata" => &PACKAGE_METADATA,
    "TSP.DocumentRevision" => &DOCUMENT_REVISION,
    "TSP.ComponentInfo" => &COMPONENT_INFO,
    "TSP.DataInfo" => &DATA_INFO,
};

/// Look up the tag of a numeric type id
pub fn tag_for_type(type_id: u32) -> Option<&'static str> {
    TYPE_TAGS.get(&type_id).copied()
}

/// Look up the schema of a tag
pub fn schema(tag: &str) -> Option<&'static Schema> {
    SCHEMAS.get(tag).copied()
}
