//! Synthetic Keynote packages for end-to-end tests

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::iwa::snappy::SnappyStream;
use crate::iwa::varint;

pub const DOCUMENT_ID: &str = "9f1c2f0e-7d1a-4e6b-8c55-3b2a1d0e9f10";
pub const REVISION: &str = "2b7e1516-28ae-4d2a-a6d2-abf7158809cf";

pub const TYPE_DOCUMENT: u32 = 1;
pub const TYPE_SHOW: u32 = 2;
pub const TYPE_SLIDE_NODE: u32 = 4;
pub const TYPE_SLIDE: u32 = 5;
pub const TYPE_NOTE: u32 = 15;
pub const TYPE_STORAGE: u32 = 2001;
pub const TYPE_PACKAGE_METADATA: u32 = 11006;
/// A type id the registry does not know
pub const TYPE_DRAWABLE: u32 = 3005;

pub const KIND_BODY: u64 = 0;
pub const KIND_NOTE: u64 = 4;

/// Minimal protobuf encoder
#[derive(Debug, Clone, Default)]
pub struct MessageWriter {
    buf: Vec<u8>,
}

impl MessageWriter {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(&mut self, field: u32, wire_type: u8) {
        varint::encode_varint_into((u64::from(field) << 3) | u64::from(wire_type), &mut self.buf);
    }

    pub fn varint(mut self, field: u32, value: u64) -> Self {
        self.key(field, 0);
        varint::encode_varint_into(value, &mut self.buf);
        self
    }

    pub fn bool(self, field: u32, value: bool) -> Self {
        self.varint(field, u64::from(value))
    }

    pub fn bytes(mut self, field: u32, value: &[u8]) -> Self {
        self.key(field, 2);
        varint::encode_varint_into(value.len() as u64, &mut self.buf);
        self.buf.extend_from_slice(value);
        self
    }

    pub fn string(self, field: u32, value: &str) -> Self {
        self.bytes(field, value.as_bytes())
    }

    pub fn message(self, field: u32, message: MessageWriter) -> Self {
        self.bytes(field, &message.finish())
    }

    /// `TSP.Reference` or `TSP.DataReference`
    pub fn reference(self, field: u32, identifier: u64) -> Self {
        self.message(field, MessageWriter::new().varint(1, identifier))
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// One archive segment: header followed by its payloads
pub fn segment(identifier: u64, payloads: &[(u32, Vec<u8>)]) -> Vec<u8> {
    let mut header = MessageWriter::new().varint(1, identifier);
    for (type_, payload) in payloads {
        header = header.message(
            2,
            MessageWriter::new()
                .varint(1, u64::from(*type_))
                .varint(3, payload.len() as u64),
        );
    }
    let header = header.finish();

    let mut framed = varint::encode_varint(header.len() as u64);
    framed.extend(header);
    for (_, payload) in payloads {
        framed.extend_from_slice(payload);
    }
    framed
}

/// Snappy-framed `.iwa` entry built from segments
pub fn iwa_entry(segments: &[Vec<u8>]) -> Vec<u8> {
    SnappyStream::compress(&segments.concat()).unwrap()
}

/// ZIP container holding the given entries, written in the given order
pub fn zip_entries(entries: &[(String, Vec<u8>)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    for (name, data) in entries {
        writer.start_file(name.as_str(), options).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Thumbnail attached to a fixture slide
#[derive(Debug, Clone)]
pub struct FixtureThumbnail {
    pub data_id: u64,
    pub digest: Vec<u8>,
    pub file_name: String,
    pub contents: Vec<u8>,
    /// Whether the `Data/` entry is written
    pub stored: bool,
}

/// One slide of a [`KeynoteFixture`]
#[derive(Debug, Clone)]
pub struct FixtureSlide {
    pub node_id: u64,
    pub slide_id: u64,
    pub locator: String,
    pub storages: Vec<(u64, Vec<String>)>,
    /// Text held in a storage reached through a note archive
    pub note_archive: Option<String>,
    pub thumbnail: Option<FixtureThumbnail>,
    pub skipped: bool,
    /// Extra unregistered field on the slide node
    pub unknown_field: bool,
    /// Note archive without its required storage reference
    pub broken_note: bool,
    /// Whether the slide node segment is written to the document
    pub node_present: bool,
    /// Whether the slide's `Index/<locator>.iwa` entry is written
    pub entry_present: bool,
}

impl FixtureSlide {
    pub fn new(node_id: u64, slide_id: u64, locator: &str) -> Self {
        Self {
            node_id,
            slide_id,
            locator: locator.to_string(),
            storages: Vec::new(),
            note_archive: None,
            thumbnail: None,
            skipped: false,
            unknown_field: false,
            broken_note: false,
            node_present: true,
            entry_present: true,
        }
    }

    pub fn text(mut self, kind: u64, lines: &[&str]) -> Self {
        self.storages
            .push((kind, lines.iter().map(|line| line.to_string()).collect()));
        self
    }

    pub fn note_archive(mut self, text: &str) -> Self {
        self.note_archive = Some(text.to_string());
        self
    }

    pub fn thumbnail(mut self, data_id: u64, digest: &[u8], file_name: &str) -> Self {
        self.thumbnail = Some(FixtureThumbnail {
            data_id,
            digest: digest.to_vec(),
            file_name: file_name.to_string(),
            contents: format!("jpeg:{}", file_name).into_bytes(),
            stored: true,
        });
        self
    }

    pub fn unstored_thumbnail(mut self) -> Self {
        if let Some(thumbnail) = self.thumbnail.as_mut() {
            thumbnail.stored = false;
        }
        self
    }

    pub fn skipped(mut self) -> Self {
        self.skipped = true;
        self
    }

    pub fn unknown_field(mut self) -> Self {
        self.unknown_field = true;
        self
    }

    pub fn broken_note(mut self) -> Self {
        self.broken_note = true;
        self
    }

    pub fn without_node(mut self) -> Self {
        self.node_present = false;
        self
    }

    pub fn without_entry(mut self) -> Self {
        self.entry_present = false;
        self
    }

    fn node_payload(&self) -> Vec<u8> {
        let mut node = MessageWriter::new().reference(2, self.slide_id);
        if let Some(thumbnail) = &self.thumbnail {
            node = node.reference(3, thumbnail.data_id);
        }
        node = node.bool(4, self.skipped).bool(7, self.note_archive.is_some());
        if self.unknown_field {
            node = node.varint(99, 7).string(100, "from a newer version");
        }
        node.finish()
    }

    fn entry(&self) -> Vec<u8> {
        let mut segments = vec![segment(
            self.slide_id,
            &[(
                TYPE_SLIDE,
                MessageWriter::new()
                    .string(7, &format!("Slide {}", self.slide_id))
                    .finish(),
            )],
        )];

        let mut next_id = self.slide_id * 100;
        for (kind, lines) in &self.storages {
            next_id += 1;
            let mut storage = MessageWriter::new().varint(1, *kind);
            for line in lines {
                storage = storage.string(3, line);
            }
            segments.push(segment(
                next_id,
                &[
                    (TYPE_STORAGE, storage.finish()),
                    (TYPE_DRAWABLE, MessageWriter::new().varint(1, 1).finish()),
                ],
            ));
        }

        if let Some(text) = &self.note_archive {
            let storage_id = next_id + 50;
            segments.push(segment(
                next_id + 51,
                &[(TYPE_NOTE, MessageWriter::new().reference(1, storage_id).finish())],
            ));
            // Body kind: only the note archive marks it as notes
            segments.push(segment(
                storage_id,
                &[(
                    TYPE_STORAGE,
                    MessageWriter::new()
                        .varint(1, KIND_BODY)
                        .string(3, text)
                        .finish(),
                )],
            ));
        }

        if self.broken_note {
            segments.push(segment(
                next_id + 60,
                &[(TYPE_NOTE, MessageWriter::new().varint(9, 1).finish())],
            ));
        }

        iwa_entry(&segments)
    }
}

/// Builder of complete single-file Keynote packages
#[derive(Debug, Clone)]
pub struct KeynoteFixture {
    pub document_id: String,
    pub revision: Option<String>,
    pub identifier_entry: bool,
    pub slides: Vec<FixtureSlide>,
}

impl KeynoteFixture {
    pub fn new() -> Self {
        Self {
            document_id: DOCUMENT_ID.to_string(),
            revision: Some(REVISION.to_string()),
            identifier_entry: true,
            slides: Vec::new(),
        }
    }

    pub fn revision(mut self, revision: Option<&str>) -> Self {
        self.revision = revision.map(str::to_string);
        self
    }

    /// Store the document UUID in `Metadata/Properties.plist` only
    pub fn plist_identifier(mut self) -> Self {
        self.identifier_entry = false;
        self
    }

    pub fn slide(mut self, slide: FixtureSlide) -> Self {
        self.slides.push(slide);
        self
    }

    fn document_entry(&self) -> Vec<u8> {
        let mut tree = MessageWriter::new();
        for slide in &self.slides {
            tree = tree.reference(1, slide.node_id);
        }

        let mut segments = vec![
            segment(1, &[(TYPE_DOCUMENT, MessageWriter::new().reference(2, 2).finish())]),
            segment(
                2,
                &[(
                    TYPE_SHOW,
                    MessageWriter::new()
                        .reference(1, 3)
                        .message(2, tree)
                        .bool(6, false)
                        .finish(),
                )],
            ),
        ];
        for slide in self.slides.iter().filter(|slide| slide.node_present) {
            segments.push(segment(slide.node_id, &[(TYPE_SLIDE_NODE, slide.node_payload())]));
        }
        iwa_entry(&segments)
    }

    pub fn metadata_entry(&self) -> Vec<u8> {
        let mut metadata = MessageWriter::new().varint(1, 9000);
        if let Some(revision) = &self.revision {
            metadata = metadata.message(
                2,
                MessageWriter::new().varint(1, 3).string(2, &revision.to_uppercase()),
            );
        }
        for slide in &self.slides {
            metadata = metadata.message(
                3,
                MessageWriter::new()
                    .varint(1, slide.slide_id)
                    .string(2, &slide.locator),
            );
        }
        for thumbnail in self.slides.iter().filter_map(|slide| slide.thumbnail.as_ref()) {
            metadata = metadata.message(
                4,
                MessageWriter::new()
                    .varint(1, thumbnail.data_id)
                    .bytes(2, &thumbnail.digest)
                    .string(3, &thumbnail.file_name),
            );
        }
        for part in [14, 1, 0] {
            metadata = metadata.varint(8, part);
        }

        iwa_entry(&[segment(
            1,
            &[(TYPE_PACKAGE_METADATA, metadata.finish())],
        )])
    }

    fn properties_plist(&self) -> Vec<u8> {
        format!(
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8"?>"#,
                r#"<plist version="1.0"><dict>"#,
                r#"<key>documentUUID</key><string>{}</string>"#,
                r#"</dict></plist>"#
            ),
            self.document_id.to_uppercase()
        )
        .into_bytes()
    }

    /// Container bytes; entries are written in reverse name order
    pub fn build(&self) -> Vec<u8> {
        let mut entries = vec![
            ("Index/Document.iwa".to_string(), self.document_entry()),
            ("Index/Metadata.iwa".to_string(), self.metadata_entry()),
            ("Metadata/Properties.plist".to_string(), self.properties_plist()),
        ];
        if self.identifier_entry {
            entries.push((
                "Metadata/DocumentIdentifier".to_string(),
                self.document_id.clone().into_bytes(),
            ));
        }
        for slide in &self.slides {
            if slide.entry_present {
                entries.push((format!("Index/{}.iwa", slide.locator), slide.entry()));
            }
            if let Some(thumbnail) = slide.thumbnail.as_ref().filter(|thumbnail| thumbnail.stored) {
                let name = format!("Data/{}", thumbnail.file_name);
                if !entries.iter().any(|(existing, _)| existing == &name) {
                    entries.push((name, thumbnail.contents.clone()));
                }
            }
        }

        entries.sort_by(|a, b| b.0.cmp(&a.0));
        zip_entries(&entries)
    }

    /// Write the container to `dir/name`
    pub fn write_to(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, self.build()).unwrap();
        path
    }
}
