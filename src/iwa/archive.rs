//! IWA Archive Format Parser
//!
//! This module handles parsing of IWA (iWork Archive) chunks, which contain
//! Protocol Buffers-encoded messages with ArchiveInfo and MessageInfo headers.

use bytes::{Buf, Bytes};
use log::debug;

use crate::iwa::protobuf::{self, FieldSet, WireValue};
use crate::iwa::snappy::SnappyStream;
use crate::iwa::typed::{ObjectVariant, TypedObject};
use crate::iwa::varint;
use crate::iwa::{Error, Result};

/// Document-wide identifier of an archive segment
pub type ArchiveId = u64;

/// Archive information header for each segment in an IWA chunk
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveInfo {
    /// Unique identifier for this archive across the document
    pub identifier: Option<ArchiveId>,
    /// Information about the messages contained in this archive
    pub message_infos: Vec<MessageInfo>,
}

impl ArchiveInfo {
    /// Parse ArchiveInfo from its encoded header bytes
    pub fn parse(data: &Bytes) -> Result<Self> {
        let fields = FieldSet::parse(data).map_err(|e| malformed_header(&e))?;

        let identifier = fields.last(1).and_then(WireValue::as_u64);
        let message_infos = fields
            .get(2)
            .iter()
            .map(|value| match value {
                WireValue::Bytes(info) => MessageInfo::parse(info),
                _ => Err(Error::MalformedChunk(
                    "ArchiveInfo.message_infos is not length-delimited".to_string(),
                )),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ArchiveInfo {
            identifier,
            message_infos,
        })
    }
}

/// Information about a specific message within an archive
#[derive(Debug, Clone, PartialEq)]
pub struct MessageInfo {
    /// Message type identifier (maps to a tag in the registry)
    pub type_: u32,
    /// Version information for the message format
    pub versions: Vec<u32>,
    /// Length of the message data in bytes
    pub length: u32,
    /// Archives referenced by this message
    pub object_references: Vec<ArchiveId>,
    /// Data items referenced by this message
    pub data_references: Vec<u64>,
}

impl MessageInfo {
    /// Parse MessageInfo from its encoded bytes
    pub fn parse(data: &Bytes) -> Result<Self> {
        let fields = FieldSet::parse(data).map_err(|e| malformed_header(&e))?;
        let unpack = |field| protobuf::unpack_varints(fields.get(field)).map_err(|e| malformed_header(&e));

        let narrow = |value: u64, name: &str| {
            u32::try_from(value)
                .map_err(|_| Error::MalformedChunk(format!("MessageInfo.{} {} exceeds 32 bits", name, value)))
        };

        Ok(MessageInfo {
            type_: narrow(fields.last(1).and_then(WireValue::as_u64).unwrap_or(0), "type")?,
            versions: unpack(2)?
                .into_iter()
                .map(|v| narrow(v, "version"))
                .collect::<Result<Vec<_>>>()?,
            length: narrow(fields.last(3).and_then(WireValue::as_u64).unwrap_or(0), "length")?,
            object_references: unpack(5)?,
            data_references: unpack(6)?,
        })
    }
}

fn malformed_header(err: &protobuf::WireError) -> Error {
    Error::MalformedChunk(format!("Invalid archive header: {}", err))
}

/// A raw, still untyped message payload
#[derive(Debug, Clone)]
pub struct RawMessage {
    /// Message type identifier from the MessageInfo
    pub type_: u32,
    /// Encoded protobuf payload
    pub data: Bytes,
}

/// One archive header with the payloads it declares
#[derive(Debug, Clone)]
pub struct RawSegment {
    pub info: ArchiveInfo,
    pub messages: Vec<RawMessage>,
}

/// Decompressed contents of one container entry
#[derive(Debug, Clone, Default)]
pub struct Chunk {
    segments: Vec<RawSegment>,
}

impl Chunk {
    /// Decompress and frame a raw `.iwa` entry
    pub fn from_entry(raw: &[u8]) -> Result<Self> {
        let stream = SnappyStream::decompress(raw)?;
        Self::parse(stream.into_bytes())
    }

    /// Split decompressed bytes into archive segments
    ///
    /// Each segment is `varint(header_len) header payload*`, where the
    /// header's message infos give the payload lengths in order.
    pub fn parse(data: Bytes) -> Result<Self> {
        let mut buf = data;
        let mut segments = Vec::new();

        while buf.has_remaining() {
            let offset = segments.len();
            let header_len = varint::read_varint(&mut buf).map_err(|e| {
                Error::MalformedChunk(format!("Segment {}: bad header length: {}", offset, e))
            })? as usize;
            if header_len > buf.remaining() {
                return Err(Error::MalformedChunk(format!(
                    "Segment {}: header declares {} bytes but only {} remain",
                    offset,
                    header_len,
                    buf.remaining()
                )));
            }

            let info = ArchiveInfo::parse(&buf.split_to(header_len))?;

            let mut messages = Vec::with_capacity(info.message_infos.len());
            for message_info in &info.message_infos {
                let length = message_info.length as usize;
                if length > buf.remaining() {
                    return Err(Error::MalformedChunk(format!(
                        "Segment {}: message of type {} declares {} bytes but only {} remain",
                        offset,
                        message_info.type_,
                        length,
                        buf.remaining()
                    )));
                }
                messages.push(RawMessage {
                    type_: message_info.type_,
                    data: buf.split_to(length),
                });
            }

            segments.push(RawSegment { info, messages });
        }

        Ok(Chunk { segments })
    }

    pub fn segments(&self) -> &[RawSegment] {
        &self.segments
    }

    pub fn into_segments(self) -> Vec<RawSegment> {
        self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// A payload that could not be decoded against its schema
#[derive(Debug, Clone)]
pub struct RejectedObject {
    pub type_: u32,
    pub reason: String,
}

/// A decoded archive: header plus typed objects
#[derive(Debug, Clone)]
pub struct ArchiveSegment {
    pub identifier: ArchiveId,
    pub info: ArchiveInfo,
    pub objects: Vec<TypedObject>,
    /// Payloads that failed to decode; the rest of the segment is kept
    pub rejected: Vec<RejectedObject>,
}

impl ArchiveSegment {
    /// Type every payload of a raw segment
    ///
    /// A payload that fails its schema is recorded in `rejected` and does
    /// not affect its siblings. A header without an identifier is an error.
    pub fn decode(raw: RawSegment) -> Result<Self> {
        let identifier = raw.info.identifier.ok_or_else(|| {
            Error::MalformedChunk("ArchiveInfo without identifier".to_string())
        })?;

        let mut objects = Vec::with_capacity(raw.messages.len());
        let mut rejected = Vec::new();
        for message in raw.messages {
            match TypedObject::decode(message.type_, message.data) {
                Ok(object) => objects.push(object),
                Err(e) => {
                    debug!(
                        "Archive {}: rejected message of type {}: {}",
                        identifier, message.type_, e
                    );
                    rejected.push(RejectedObject {
                        type_: message.type_,
                        reason: e.to_string(),
                    });
                },
            }
        }

        Ok(ArchiveSegment {
            identifier,
            info: raw.info,
            objects,
            rejected,
        })
    }

    /// All objects of one variant, in payload order
    pub fn objects_of_type<T: ObjectVariant>(&self) -> impl Iterator<Item = &T> {
        self.objects.iter().filter_map(T::from_object)
    }

    /// First object of a variant, or `TypeNotFound`
    pub fn next_object_of_type<T: ObjectVariant>(&self) -> Result<&T> {
        self.objects_of_type::<T>().next().ok_or(Error::TypeNotFound {
            archive: self.identifier,
            tag: T::TAG,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iwa::typed::{DocumentArchive, ShowArchive};

    fn header(identifier: u64, infos: &[(u32, usize)]) -> Vec<u8> {
        let mut header = vec![0x08];
        varint::encode_varint_into(identifier, &mut header);
        for &(type_, length) in infos {
            let mut info = vec![0x08];
            varint::encode_varint_into(u64::from(type_), &mut info);
            info.push(0x18);
            varint::encode_varint_into(length as u64, &mut info);
            header.push(0x12);
            varint::encode_varint_into(info.len() as u64, &mut header);
            header.extend(info);
        }
        let mut framed = varint::encode_varint(header.len() as u64);
        framed.extend(header);
        framed
    }

    #[test]
    fn test_chunk_splits_segments() {
        // Document { show: Reference { identifier: 2 } }
        let document = [0x12, 0x02, 0x08, 0x02];
        let mut data = header(1, &[(1, document.len())]);
        data.extend_from_slice(&document);
        data.extend(header(7, &[(9999, 2)]));
        data.extend_from_slice(&[0x08, 0x01]);

        let chunk = Chunk::parse(Bytes::from(data)).unwrap();
        assert_eq!(chunk.len(), 2);
        assert_eq!(chunk.segments()[0].info.identifier, Some(1));
        assert_eq!(chunk.segments()[1].info.message_infos[0].type_, 9999);

        let segment = ArchiveSegment::decode(chunk.segments()[0].clone()).unwrap();
        assert_eq!(segment.next_object_of_type::<DocumentArchive>().unwrap().show, 2);
        assert!(matches!(
            segment.next_object_of_type::<ShowArchive>(),
            Err(Error::TypeNotFound { archive: 1, .. })
        ));
    }

    #[test]
    fn test_payload_overrun_is_malformed() {
        let mut data = header(1, &[(1, 10)]);
        data.extend_from_slice(&[0x12, 0x02]);
        assert!(matches!(
            Chunk::parse(Bytes::from(data)),
            Err(Error::MalformedChunk(_))
        ));
    }

    #[test]
    fn test_header_overrun_is_malformed() {
        let data = vec![0x05, 0x08];
        assert!(matches!(
            Chunk::parse(Bytes::from(data)),
            Err(Error::MalformedChunk(_))
        ));
    }

    #[test]
    fn test_packed_versions() {
        let info = Bytes::from(vec![0x08, 0x02, 0x12, 0x03, 0x01, 0x00, 0x05, 0x18, 0x04, 0x2A, 0x02, 0x03, 0x04]);
        let parsed = MessageInfo::parse(&info).unwrap();
        assert_eq!(parsed.type_, 2);
        assert_eq!(parsed.versions, vec![1, 0, 5]);
        assert_eq!(parsed.length, 4);
        assert_eq!(parsed.object_references, vec![3, 4]);
    }

    #[test]
    fn test_oversized_type_is_malformed() {
        // type 2^32 + 1 would truncate to the document type id
        let mut info = vec![0x08];
        varint::encode_varint_into((1u64 << 32) + 1, &mut info);
        info.extend_from_slice(&[0x18, 0x04]);
        assert!(matches!(
            MessageInfo::parse(&Bytes::from(info)),
            Err(Error::MalformedChunk(reason)) if reason.contains("type")
        ));

        let mut info = vec![0x08, 0x01, 0x18];
        varint::encode_varint_into(u64::from(u32::MAX) + 4, &mut info);
        assert!(matches!(MessageInfo::parse(&Bytes::from(info)), Err(Error::MalformedChunk(_))));
    }

    #[test]
    fn test_rejected_payload_keeps_siblings() {
        // A document without its required show reference, then a valid one.
        let valid = [0x12, 0x02, 0x08, 0x02];
        let mut data = header(1, &[(1, 0), (1, valid.len())]);
        data.extend_from_slice(&valid);

        let mut segments = Chunk::parse(Bytes::from(data)).unwrap().into_segments();
        let segment = ArchiveSegment::decode(segments.remove(0)).unwrap();
        assert_eq!(segment.rejected.len(), 1);
        assert!(segment.rejected[0].reason.contains("show"));
        assert_eq!(segment.objects_of_type::<DocumentArchive>().count(), 1);
    }

    #[test]
    fn test_segment_without_identifier() {
        let raw = RawSegment {
            info: ArchiveInfo {
                identifier: None,
                message_infos: Vec::new(),
            },
            messages: Vec::new(),
        };
        assert!(matches!(ArchiveSegment::decode(raw), Err(Error::MalformedChunk(_))));
    }
}
