//! Schema-driven message decoding
//!
//! [`Message::decode`] interprets a payload's wire values through a
//! [`Schema`]. Declared fields are type-checked and defaulted; undeclared
//! fields are kept untouched in [`Message::extras`] so documents written by
//! newer application versions still decode.

use std::collections::BTreeMap;

use bytes::Bytes;

use crate::iwa::archive::ArchiveId;
use crate::iwa::protobuf::{self, FieldSet, WireValue};
use crate::iwa::registry::{self, Cardinality, EnumSpec, FieldDefault, FieldKind, FieldSpec, Schema};
use crate::iwa::{Error, Result};

/// A decoded enum value, named when the schema knows it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumValue {
    pub number: i32,
    pub name: Option<&'static str>,
}

/// A decoded field value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    UInt(u64),
    Int(i64),
    Double(f64),
    String(String),
    Bytes(Bytes),
    Enum(EnumValue),
    /// Unresolved reference to another archive
    Reference(ArchiveId),
    /// Unresolved reference to a package data item
    DataReference(u64),
    Message(Message),
    List(Vec<Value>),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::UInt(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Value::Bytes(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<EnumValue> {
        match self {
            Value::Enum(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<ArchiveId> {
        match self {
            Value::Reference(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_data_reference(&self) -> Option<u64> {
        match self {
            Value::DataReference(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_message(&self) -> Option<&Message> {
        match self {
            Value::Message(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> &[Value] {
        match self {
            Value::List(items) => items,
            _ => &[],
        }
    }
}

/// A payload decoded against its schema
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub tag: &'static str,
    pub fields: BTreeMap<&'static str, Value>,
    /// Fields the schema does not declare, as raw wire values
    pub extras: FieldSet,
}

impl Message {
    /// Decode a payload with the given schema
    ///
    /// Missing optional fields take the schema default, if any. A missing
    /// required field, or a declared field with an incompatible wire type,
    /// fails with `SchemaMismatch`.
    pub fn decode(schema: &'static Schema, data: &Bytes) -> Result<Self> {
        let mut wire = FieldSet::parse(data)?;
        let mut fields = BTreeMap::new();

        for spec in schema.fields {
            let raw = wire.remove(spec.number).unwrap_or_default();

            match spec.cardinality {
                Cardinality::Repeated => {
                    let mut items = Vec::with_capacity(raw.len());
                    for value in &raw {
                        decode_repeated(schema, spec, value, &mut items)?;
                    }
                    fields.insert(spec.name, Value::List(items));
                },
                Cardinality::Required => {
                    let value = match raw.last() {
                        Some(value) => decode_single(schema, spec, value)?,
                        None => None,
                    };
                    let value = value.ok_or_else(|| mismatch(schema, spec, "required field missing".to_string()))?;
                    fields.insert(spec.name, value);
                },
                Cardinality::Optional(default) => {
                    let value = match raw.last() {
                        Some(value) => decode_single(schema, spec, value)?,
                        None => default_value(spec.kind, default),
                    };
                    if let Some(value) = value {
                        fields.insert(spec.name, value);
                    }
                },
            }
        }

        Ok(Message {
            tag: schema.tag,
            fields,
            extras: wire,
        })
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Boolean field, `false` when absent
    pub fn bool(&self, name: &str) -> bool {
        self.get(name).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn uint(&self, name: &str) -> Option<u64> {
        self.get(name).and_then(Value::as_u64)
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    pub fn string(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn bytes(&self, name: &str) -> Option<&Bytes> {
        self.get(name).and_then(Value::as_bytes)
    }

    pub fn enum_value(&self, name: &str) -> Option<EnumValue> {
        self.get(name).and_then(Value::as_enum)
    }

    pub fn reference(&self, name: &str) -> Option<ArchiveId> {
        self.get(name).and_then(Value::as_reference)
    }

    pub fn message(&self, name: &str) -> Option<&Message> {
        self.get(name).and_then(Value::as_message)
    }

    /// Items of a repeated field, empty when absent
    pub fn list(&self, name: &str) -> &[Value] {
        self.get(name).map(Value::as_list).unwrap_or_default()
    }
}

fn mismatch(schema: &Schema, spec: &FieldSpec, reason: String) -> Error {
    Error::SchemaMismatch {
        tag: schema.tag,
        field: spec.name,
        reason,
    }
}

fn wrong_wire_type(schema: &Schema, spec: &FieldSpec, value: &WireValue) -> Error {
    mismatch(
        schema,
        spec,
        format!("expected {:?}, found wire type {}", spec.kind, value.wire_type()),
    )
}

fn default_value(kind: FieldKind, default: FieldDefault) -> Option<Value> {
    match default {
        FieldDefault::None => None,
        FieldDefault::Bool(v) => Some(Value::Bool(v)),
        FieldDefault::UInt(v) => Some(Value::UInt(v)),
        FieldDefault::Int(v) => Some(Value::Int(v)),
        FieldDefault::Double(v) => Some(Value::Double(v)),
        FieldDefault::Str(v) => Some(Value::String(v.to_string())),
        FieldDefault::Enum(number) => Some(Value::Enum(match kind {
            FieldKind::Enum(spec) => enum_value(spec, number),
            _ => EnumValue { number, name: None },
        })),
    }
}

fn enum_value(spec: &EnumSpec, number: i32) -> EnumValue {
    EnumValue {
        number,
        name: spec.name_of(number),
    }
}

/// Decode one occurrence of a non-repeated field
///
/// A reference naming archive 0 is treated as absent.
fn decode_single(schema: &Schema, spec: &FieldSpec, value: &WireValue) -> Result<Option<Value>> {
    let decoded = match (spec.kind, value) {
        (FieldKind::Bool, WireValue::Varint(v)) => Value::Bool(*v != 0),
        (FieldKind::UInt, WireValue::Varint(v) | WireValue::Fixed64(v)) => Value::UInt(*v),
        (FieldKind::UInt, WireValue::Fixed32(v)) => Value::UInt(u64::from(*v)),
        (FieldKind::Int, WireValue::Varint(v) | WireValue::Fixed64(v)) => Value::Int(*v as i64),
        (FieldKind::Int, WireValue::Fixed32(v)) => Value::Int(i64::from(*v as i32)),
        (FieldKind::Double, WireValue::Fixed64(v)) => Value::Double(f64::from_bits(*v)),
        (FieldKind::Double, WireValue::Fixed32(v)) => Value::Double(f64::from(f32::from_bits(*v))),
        (FieldKind::String, WireValue::Bytes(b)) => {
            let text = std::str::from_utf8(b).map_err(|e| mismatch(schema, spec, format!("invalid UTF-8: {}", e)))?;
            Value::String(text.to_string())
        },
        (FieldKind::Bytes, WireValue::Bytes(b)) => Value::Bytes(b.clone()),
        (FieldKind::Enum(enum_spec), WireValue::Varint(v)) => Value::Enum(enum_value(enum_spec, *v as i32)),
        (FieldKind::Reference, WireValue::Bytes(b)) => match reference_target(schema, spec, b)? {
            Some(id) => Value::Reference(id),
            None => return Ok(None),
        },
        (FieldKind::DataReference, WireValue::Bytes(b)) => match reference_target(schema, spec, b)? {
            Some(id) => Value::DataReference(id),
            None => return Ok(None),
        },
        (FieldKind::Message(tag), WireValue::Bytes(b)) => {
            let nested = registry::schema(tag)
                .ok_or_else(|| mismatch(schema, spec, format!("no schema registered for {}", tag)))?;
            Value::Message(Message::decode(nested, b)?)
        },
        _ => return Err(wrong_wire_type(schema, spec, value)),
    };
    Ok(Some(decoded))
}

/// Decode one occurrence of a repeated field, expanding packed scalars
fn decode_repeated(schema: &Schema, spec: &FieldSpec, value: &WireValue, out: &mut Vec<Value>) -> Result<()> {
    let packed = match (spec.kind, value) {
        (FieldKind::Bool | FieldKind::UInt | FieldKind::Int | FieldKind::Enum(_), WireValue::Bytes(_)) => {
            protobuf::unpack_varints(std::slice::from_ref(value))?
                .into_iter()
                .map(WireValue::Varint)
                .collect()
        },
        (FieldKind::Double, WireValue::Bytes(_)) => protobuf::unpack_fixed64(std::slice::from_ref(value), spec.number)?
            .into_iter()
            .map(WireValue::Fixed64)
            .collect(),
        _ => vec![value.clone()],
    };

    for item in &packed {
        if let Some(decoded) = decode_single(schema, spec, item)? {
            out.push(decoded);
        }
    }
    Ok(())
}

/// Target identifier of an encoded `TSP.Reference` / `TSP.DataReference`
fn reference_target(schema: &Schema, spec: &FieldSpec, data: &Bytes) -> Result<Option<u64>> {
    let fields = FieldSet::parse(data)?;
    match fields.last(1) {
        Some(WireValue::Varint(0)) | None => Ok(None),
        Some(WireValue::Varint(id)) => Ok(Some(*id)),
        Some(other) => Err(wrong_wire_type(schema, spec, other)),
    }
}
