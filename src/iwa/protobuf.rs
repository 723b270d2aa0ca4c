//! Protobuf Wire Format Support for iWork IWA Files
//!
//! Payloads are read into a [`FieldSet`] of raw wire values keyed by field
//! number. Schema-aware interpretation happens in [`crate::iwa::object`];
//! this layer only knows the four wire types iWork writes.

use std::collections::BTreeMap;

use bytes::{Buf, Bytes};
use smallvec::SmallVec;

use crate::iwa::varint::{self, VarintError};

/// Wire type of a varint field
pub const WIRE_VARINT: u8 = 0;
/// Wire type of a 64-bit field
pub const WIRE_FIXED64: u8 = 1;
/// Wire type of a length-delimited field
pub const WIRE_LEN: u8 = 2;
/// Wire type of a 32-bit field
pub const WIRE_FIXED32: u8 = 5;

/// Errors raised while splitting a payload into wire values
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error(transparent)]
    Varint(#[from] VarintError),

    #[error("field {field} declares {needed} bytes but only {available} remain")]
    Truncated {
        field: u32,
        needed: u64,
        available: usize,
    },

    #[error("field {field} uses unsupported wire type {wire_type}")]
    UnsupportedWireType { field: u32, wire_type: u8 },

    #[error("field number 0 is invalid")]
    ZeroField,
}

/// One raw value as it appears on the wire
#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    Varint(u64),
    Fixed64(u64),
    Bytes(Bytes),
    Fixed32(u32),
}

impl WireValue {
    /// Wire type number of this value
    pub fn wire_type(&self) -> u8 {
        match self {
            WireValue::Varint(_) => WIRE_VARINT,
            WireValue::Fixed64(_) => WIRE_FIXED64,
            WireValue::Bytes(_) => WIRE_LEN,
            WireValue::Fixed32(_) => WIRE_FIXED32,
        }
    }

    /// Numeric value of a scalar wire value
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            WireValue::Varint(v) | WireValue::Fixed64(v) => Some(*v),
            WireValue::Fixed32(v) => Some(u64::from(*v)),
            WireValue::Bytes(_) => None,
        }
    }

    /// Payload of a length-delimited value
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            WireValue::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

/// Values of a single field; almost every field occurs once
pub type FieldValues = SmallVec<[WireValue; 1]>;

/// All fields of one protobuf message, in field-number order
///
/// Repeated occurrences of a field keep their wire order. Slicing the
/// payload is zero-copy: length-delimited values share the input buffer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldSet {
    fields: BTreeMap<u32, FieldValues>,
}

impl FieldSet {
    /// Create an empty field set
    pub fn new() -> Self {
        Self::default()
    }

    /// Split a protobuf payload into wire values
    pub fn parse(data: &Bytes) -> Result<Self, WireError> {
        let mut buf = data.clone();
        let mut fields: BTreeMap<u32, FieldValues> = BTreeMap::new();

        while buf.has_remaining() {
            let key = varint::read_varint(&mut buf)?;
            let field = (key >> 3) as u32;
            let wire_type = (key & 0x07) as u8;
            if field == 0 {
                return Err(WireError::ZeroField);
            }

            let value = match wire_type {
                WIRE_VARINT => WireValue::Varint(varint::read_varint(&mut buf)?),
                WIRE_FIXED64 => {
                    ensure_remaining(&buf, field, 8)?;
                    WireValue::Fixed64(buf.get_u64_le())
                },
                WIRE_LEN => {
                    let length = varint::read_varint(&mut buf)?;
                    ensure_remaining(&buf, field, length)?;
                    WireValue::Bytes(buf.split_to(length as usize))
                },
                WIRE_FIXED32 => {
                    ensure_remaining(&buf, field, 4)?;
                    WireValue::Fixed32(buf.get_u32_le())
                },
                _ => return Err(WireError::UnsupportedWireType { field, wire_type }),
            };

            fields.entry(field).or_default().push(value);
        }

        Ok(FieldSet { fields })
    }

    /// All values recorded for a field number
    pub fn get(&self, field: u32) -> &[WireValue] {
        self.fields.get(&field).map(|values| values.as_slice()).unwrap_or_default()
    }

    /// Last value of a field, which wins for non-repeated fields
    pub fn last(&self, field: u32) -> Option<&WireValue> {
        self.get(field).last()
    }

    /// Remove and return every value of a field
    pub fn remove(&mut self, field: u32) -> Option<FieldValues> {
        self.fields.remove(&field)
    }

    /// Append a value to a field
    pub fn insert(&mut self, field: u32, value: WireValue) {
        self.fields.entry(field).or_default().push(value);
    }

    pub fn contains(&self, field: u32) -> bool {
        self.fields.contains_key(&field)
    }

    /// Field numbers present, ascending
    pub fn field_numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.fields.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

fn ensure_remaining(buf: &Bytes, field: u32, needed: u64) -> Result<(), WireError> {
    if needed > buf.remaining() as u64 {
        return Err(WireError::Truncated {
            field,
            needed,
            available: buf.remaining(),
        });
    }
    Ok(())
}

/// Flatten varint values of a repeated field, accepting packed encoding
pub fn unpack_varints(values: &[WireValue]) -> Result<Vec<u64>, WireError> {
    let mut out = Vec::with_capacity(values.len());
    for value in values {
        match value {
            WireValue::Bytes(packed) => {
                let mut buf = packed.clone();
                while buf.has_remaining() {
                    out.push(varint::read_varint(&mut buf)?);
                }
            },
            scalar => out.extend(scalar.as_u64()),
        }
    }
    Ok(out)
}

/// Flatten 64-bit values of a repeated field, accepting packed encoding
pub fn unpack_fixed64(values: &[WireValue], field: u32) -> Result<Vec<u64>, WireError> {
    let mut out = Vec::with_capacity(values.len());
    for value in values {
        match value {
            WireValue::Bytes(packed) => {
                if packed.len() % 8 != 0 {
                    return Err(WireError::Truncated {
                        field,
                        needed: packed.len().next_multiple_of(8) as u64,
                        available: packed.len(),
                    });
                }
                let mut buf = packed.clone();
                while buf.has_remaining() {
                    out.push(buf.get_u64_le());
                }
            },
            scalar => out.extend(scalar.as_u64()),
        }
    }
    Ok(out)
}
