//! Variant: the self-describing polymorphic value carrier, with optional
//! flat arrays reshaped into multi-dimensional nested lists on decode.

use time::OffsetDateTime;
use uuid::Uuid;

use crate::builtins::{
    decode_byte_string, decode_date_time, decode_guid, decode_string, encode_byte_string,
    encode_date_time, encode_guid, encode_string,
};
use crate::buffer::Buffer;
use crate::error::{Error, Result};
use crate::extension_object::{ExtensionObject, ExtensionObjectRegistry};
use crate::primitives::Primitive;
use crate::schema::{StructValue, TypeRegistry};
use crate::struct_codec::{decode_struct, encode_struct};
use crate::node_id::NodeId;

const IS_ARRAY: u8 = 1 << 7;
const HAS_DIMENSIONS: u8 = 1 << 6;
const TAG_MASK: u8 = 0b0011_1111;

/// One of the 26 standard builtin type codes (0..25). Tags above 25 are
/// preserved verbatim as [`VariantTag::Other`] and treated as a
/// byte-string-shaped blob, per spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum VariantType {
    Null = 0,
    Boolean = 1,
    SByte = 2,
    Byte = 3,
    Int16 = 4,
    UInt16 = 5,
    Int32 = 6,
    UInt32 = 7,
    Int64 = 8,
    UInt64 = 9,
    Float = 10,
    Double = 11,
    String = 12,
    DateTime = 13,
    Guid = 14,
    ByteString = 15,
    XmlElement = 16,
    NodeId = 17,
    ExpandedNodeId = 18,
    StatusCode = 19,
    QualifiedName = 20,
    LocalizedText = 21,
    ExtensionObject = 22,
    DataValue = 23,
    Variant = 24,
    DiagnosticInfo = 25,
}

impl VariantType {
    pub fn from_tag(tag: u8) -> Option<Self> {
        use VariantType::*;
        Some(match tag {
            0 => Null,
            1 => Boolean,
            2 => SByte,
            3 => Byte,
            4 => Int16,
            5 => UInt16,
            6 => Int32,
            7 => UInt32,
            8 => Int64,
            9 => UInt64,
            10 => Float,
            11 => Double,
            12 => String,
            13 => DateTime,
            14 => Guid,
            15 => ByteString,
            16 => XmlElement,
            17 => NodeId,
            18 => ExpandedNodeId,
            19 => StatusCode,
            20 => QualifiedName,
            21 => LocalizedText,
            22 => ExtensionObject,
            23 => DataValue,
            24 => Variant,
            25 => DiagnosticInfo,
            _ => return None,
        })
    }

    pub fn tag(self) -> u8 {
        self as u8
    }

    /// The registered struct/enum type name used to resolve builtin
    /// "structured" types that have no codec of their own here (XmlElement,
    /// StatusCode, QualifiedName, LocalizedText, DataValue,
    /// DiagnosticInfo) -- these are generated by the out-of-scope code
    /// generator from the UA type dictionary and are dispatched through the
    /// same `TypeRegistry` as any user structure.
    pub fn type_name(self) -> &'static str {
        use VariantType::*;
        match self {
            Null => "Null",
            Boolean => "Boolean",
            SByte => "SByte",
            Byte => "Byte",
            Int16 => "Int16",
            UInt16 => "UInt16",
            Int32 => "Int32",
            UInt32 => "UInt32",
            Int64 => "Int64",
            UInt64 => "UInt64",
            Float => "Float",
            Double => "Double",
            String => "String",
            DateTime => "DateTime",
            Guid => "Guid",
            ByteString => "ByteString",
            XmlElement => "XmlElement",
            NodeId => "NodeId",
            ExpandedNodeId => "ExpandedNodeId",
            StatusCode => "StatusCode",
            QualifiedName => "QualifiedName",
            LocalizedText => "LocalizedText",
            ExtensionObject => "ExtensionObject",
            DataValue => "DataValue",
            Variant => "Variant",
            DiagnosticInfo => "DiagnosticInfo",
        }
    }

    fn dispatches_to_generic_struct(self) -> bool {
        matches!(
            self,
            VariantType::XmlElement
                | VariantType::StatusCode
                | VariantType::QualifiedName
                | VariantType::LocalizedText
                | VariantType::DataValue
                | VariantType::DiagnosticInfo
        )
    }
}

/// The tag actually carried on the wire: a known builtin, or a raw tag
/// above 25 whose content this codec treats as an opaque byte string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantTag {
    Known(VariantType),
    Other(u8),
}

impl VariantTag {
    fn wire_tag(self) -> u8 {
        match self {
            VariantTag::Known(vt) => vt.tag(),
            VariantTag::Other(tag) => tag,
        }
    }
}

/// A single value of whatever type `VariantTag` names.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Null,
    Boolean(bool),
    SByte(i8),
    Byte(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Float(f32),
    Double(f64),
    String(Option<std::string::String>),
    DateTime(OffsetDateTime),
    Guid(Uuid),
    ByteString(Option<Vec<u8>>),
    NodeId(NodeId),
    ExtensionObject(Box<ExtensionObject>),
    Variant(Box<Variant>),
    /// XmlElement, StatusCode, QualifiedName, LocalizedText, DataValue and
    /// DiagnosticInfo: dispatched generically via the type registry.
    Struct(Box<StructValue>),
    /// A tag above 25, preserved as an opaque byte-string-shaped blob.
    Other { tag: u8, bytes: Option<Vec<u8>> },
}

/// A reconstructed multi-dimensional element: either a leaf value or a
/// group of further elements along one axis.
#[derive(Debug, Clone, PartialEq)]
pub enum Nested {
    Leaf(ScalarValue),
    Group(Vec<Nested>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum VariantValue {
    Scalar(ScalarValue),
    /// `is_array` true, `dimensions` absent: a flat sequence.
    Array(Vec<ScalarValue>),
    /// `is_array` true, `dimensions` present: the flat sequence folded into
    /// nested groups from the last axis outward.
    Nested(Vec<Nested>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
    pub variant_type: VariantTag,
    pub value: VariantValue,
    pub is_array: bool,
    pub dimensions: Option<Vec<i32>>,
}

impl Variant {
    pub fn scalar(variant_type: VariantType, value: ScalarValue) -> Self {
        Variant {
            variant_type: VariantTag::Known(variant_type),
            value: VariantValue::Scalar(value),
            is_array: false,
            dimensions: None,
        }
    }

    pub fn array(variant_type: VariantType, values: Vec<ScalarValue>) -> Self {
        Variant {
            variant_type: VariantTag::Known(variant_type),
            value: VariantValue::Array(values),
            is_array: true,
            dimensions: None,
        }
    }

    /// The flat sequence backing this Variant's value, regardless of
    /// whether it is currently stored flat or already folded into nested
    /// groups.
    pub fn flatten(&self) -> Vec<ScalarValue> {
        match &self.value {
            VariantValue::Scalar(v) => vec![v.clone()],
            VariantValue::Array(values) => values.clone(),
            VariantValue::Nested(groups) => flatten_groups(groups),
        }
    }

    pub fn encode(
        &self,
        registry: &TypeRegistry,
        ext_registry: &ExtensionObjectRegistry,
        out: &mut Vec<u8>,
    ) -> Result<()> {
        let mut encoding = self.variant_type.wire_tag() & TAG_MASK;
        if self.is_array {
            encoding |= IS_ARRAY;
            if self.dimensions.is_some() {
                encoding |= HAS_DIMENSIONS;
            }
        }
        encoding.encode(out);

        if self.is_array {
            let flat = self.flatten();
            let len = i32::try_from(flat.len()).map_err(|_| Error::ArrayTooLong(flat.len()))?;
            len.encode(out);
            for value in &flat {
                self.encode_element(value, registry, ext_registry, out)?;
            }
            if let Some(dims) = &self.dimensions {
                i32::encode_array(Some(dims), out)?;
            }
        } else if let VariantValue::Scalar(value) = &self.value {
            self.encode_element(value, registry, ext_registry, out)?;
        }
        Ok(())
    }

    fn encode_element(
        &self,
        value: &ScalarValue,
        registry: &TypeRegistry,
        ext_registry: &ExtensionObjectRegistry,
        out: &mut Vec<u8>,
    ) -> Result<()> {
        match self.variant_type {
            VariantTag::Known(vt) => encode_scalar(vt, value, registry, ext_registry, out),
            VariantTag::Other(_) => match value {
                ScalarValue::Other { bytes, .. } => encode_byte_string(bytes.as_deref(), out),
                _ => Err(Error::BadTag {
                    kind: "Variant element for tag > 25",
                    tag: self.variant_type.wire_tag(),
                }),
            },
        }
    }

    pub fn decode(
        buf: &mut Buffer,
        registry: &TypeRegistry,
        ext_registry: &ExtensionObjectRegistry,
    ) -> Result<Self> {
        let encoding = u8::decode(buf)?;
        let tag = encoding & TAG_MASK;
        let variant_type = match VariantType::from_tag(tag) {
            Some(vt) => VariantTag::Known(vt),
            None => VariantTag::Other(tag),
        };
        let is_array = encoding & IS_ARRAY != 0;
        let has_dimensions = encoding & HAS_DIMENSIONS != 0;

        if !is_array {
            let value = Self::decode_element(variant_type, buf, registry, ext_registry)?;
            return Ok(Variant {
                variant_type,
                value: VariantValue::Scalar(value),
                is_array: false,
                dimensions: None,
            });
        }

        let flat = Self::decode_flat_array(variant_type, buf, registry, ext_registry)?;

        if has_dimensions {
            let dims = i32::decode_array(buf)?.unwrap_or_default();
            let leaves: Vec<Nested> = flat.into_iter().map(Nested::Leaf).collect();
            let nested = reshape(leaves, &dims);
            Ok(Variant {
                variant_type,
                value: VariantValue::Nested(nested),
                is_array: true,
                dimensions: Some(dims),
            })
        } else {
            Ok(Variant {
                variant_type,
                value: VariantValue::Array(flat),
                is_array: true,
                dimensions: None,
            })
        }
    }

    fn decode_element(
        variant_type: VariantTag,
        buf: &mut Buffer,
        registry: &TypeRegistry,
        ext_registry: &ExtensionObjectRegistry,
    ) -> Result<ScalarValue> {
        match variant_type {
            VariantTag::Known(vt) => decode_scalar(vt, buf, registry, ext_registry),
            VariantTag::Other(tag) => Ok(ScalarValue::Other {
                tag,
                bytes: decode_byte_string(buf)?,
            }),
        }
    }

    fn decode_flat_array(
        variant_type: VariantTag,
        buf: &mut Buffer,
        registry: &TypeRegistry,
        ext_registry: &ExtensionObjectRegistry,
    ) -> Result<Vec<ScalarValue>> {
        let len = i32::decode(buf)?;
        if len == -1 {
            return Ok(Vec::new());
        }
        if len < 0 {
            return Err(Error::BadLength { length: len });
        }
        if len as usize > buf.limits().max_array_length {
            return Err(Error::BadLength { length: len });
        }
        let mut values = Vec::with_capacity(len as usize);
        for _ in 0..len {
            values.push(Self::decode_element(variant_type, buf, registry, ext_registry)?);
        }
        Ok(values)
    }
}

fn flatten_groups(groups: &[Nested]) -> Vec<ScalarValue> {
    let mut out = Vec::new();
    for g in groups {
        match g {
            Nested::Leaf(v) => out.push(v.clone()),
            Nested::Group(inner) => out.extend(flatten_groups(inner)),
        }
    }
    out
}

/// Folds a flat sequence into nested groups matching `dims`, from the last
/// axis outward. Dimensions containing zero are treated as one for stride
/// computation but the original `dims` are preserved by the caller. If the
/// flat length is short of `prod(dims)`, the missing inner groups are
/// padded with empty groups; if it is longer, the extras land in the
/// trailing outer group. This tolerant padding matches the reference
/// implementation and is preserved for compatibility, not "fixed" -- see
/// the open question in DESIGN.md.
pub fn reshape(flat: Vec<Nested>, dims: &[i32]) -> Vec<Nested> {
    if dims.is_empty() {
        return flat;
    }
    let subdims = &dims[1..];
    let subsize: i64 = subdims
        .iter()
        .map(|&d| if d == 0 { 1 } else { d as i64 })
        .product();
    let subsize = subsize.max(1) as usize;

    let mut flat = flat;
    while (dims[0] as i64) * (subsize as i64) > flat.len() as i64 {
        flat.push(Nested::Group(Vec::new()));
    }

    if subdims.is_empty() || subdims == [0] {
        return flat;
    }

    let mut groups = Vec::new();
    let mut i = 0;
    while i < flat.len() {
        let end = (i + subsize).min(flat.len());
        let chunk = flat[i..end].to_vec();
        groups.push(Nested::Group(reshape(chunk, subdims)));
        i += subsize;
    }
    groups
}

pub fn encode_scalar(
    vt: VariantType,
    value: &ScalarValue,
    registry: &TypeRegistry,
    ext_registry: &ExtensionObjectRegistry,
    out: &mut Vec<u8>,
) -> Result<()> {
    match (vt, value) {
        (VariantType::Null, ScalarValue::Null) => {}
        (VariantType::Boolean, ScalarValue::Boolean(v)) => v.encode(out),
        (VariantType::SByte, ScalarValue::SByte(v)) => v.encode(out),
        (VariantType::Byte, ScalarValue::Byte(v)) => v.encode(out),
        (VariantType::Int16, ScalarValue::Int16(v)) => v.encode(out),
        (VariantType::UInt16, ScalarValue::UInt16(v)) => v.encode(out),
        (VariantType::Int32, ScalarValue::Int32(v)) => v.encode(out),
        (VariantType::UInt32, ScalarValue::UInt32(v)) => v.encode(out),
        (VariantType::Int64, ScalarValue::Int64(v)) => v.encode(out),
        (VariantType::UInt64, ScalarValue::UInt64(v)) => v.encode(out),
        (VariantType::Float, ScalarValue::Float(v)) => v.encode(out),
        (VariantType::Double, ScalarValue::Double(v)) => v.encode(out),
        (VariantType::String, ScalarValue::String(v)) => encode_string(v.as_deref(), out)?,
        (VariantType::DateTime, ScalarValue::DateTime(v)) => encode_date_time(*v, out)?,
        (VariantType::Guid, ScalarValue::Guid(v)) => encode_guid(*v, out),
        (VariantType::ByteString, ScalarValue::ByteString(v)) => {
            encode_byte_string(v.as_deref(), out)?
        }
        (VariantType::NodeId, ScalarValue::NodeId(v)) => v.encode(out)?,
        (VariantType::ExpandedNodeId, ScalarValue::NodeId(v)) => v.encode(out)?,
        (VariantType::ExtensionObject, ScalarValue::ExtensionObject(v)) => {
            v.encode(registry, ext_registry, out)?
        }
        (VariantType::Variant, ScalarValue::Variant(v)) => v.encode(registry, ext_registry, out)?,
        (vt, ScalarValue::Struct(v)) if vt.dispatches_to_generic_struct() => {
            let schema = registry.schema(vt.type_name())?;
            encode_struct(schema, v, registry, ext_registry, out)?;
        }
        _ => {
            return Err(Error::BadTag {
                kind: "Variant value does not match its declared type",
                tag: vt.tag(),
            })
        }
    }
    Ok(())
}

pub fn decode_scalar(
    vt: VariantType,
    buf: &mut Buffer,
    registry: &TypeRegistry,
    ext_registry: &ExtensionObjectRegistry,
) -> Result<ScalarValue> {
    Ok(match vt {
        VariantType::Null => ScalarValue::Null,
        VariantType::Boolean => ScalarValue::Boolean(bool::decode(buf)?),
        VariantType::SByte => ScalarValue::SByte(i8::decode(buf)?),
        VariantType::Byte => ScalarValue::Byte(u8::decode(buf)?),
        VariantType::Int16 => ScalarValue::Int16(i16::decode(buf)?),
        VariantType::UInt16 => ScalarValue::UInt16(u16::decode(buf)?),
        VariantType::Int32 => ScalarValue::Int32(i32::decode(buf)?),
        VariantType::UInt32 => ScalarValue::UInt32(u32::decode(buf)?),
        VariantType::Int64 => ScalarValue::Int64(i64::decode(buf)?),
        VariantType::UInt64 => ScalarValue::UInt64(u64::decode(buf)?),
        VariantType::Float => ScalarValue::Float(f32::decode(buf)?),
        VariantType::Double => ScalarValue::Double(f64::decode(buf)?),
        VariantType::String => ScalarValue::String(decode_string(buf)?),
        VariantType::DateTime => ScalarValue::DateTime(decode_date_time(buf)?),
        VariantType::Guid => ScalarValue::Guid(decode_guid(buf)?),
        VariantType::ByteString => ScalarValue::ByteString(decode_byte_string(buf)?),
        VariantType::NodeId | VariantType::ExpandedNodeId => {
            ScalarValue::NodeId(NodeId::decode(buf)?)
        }
        VariantType::ExtensionObject => {
            ScalarValue::ExtensionObject(Box::new(ExtensionObject::decode(buf, registry, ext_registry)?))
        }
        VariantType::Variant => {
            ScalarValue::Variant(Box::new(Variant::decode(buf, registry, ext_registry)?))
        }
        vt if vt.dispatches_to_generic_struct() => {
            let schema = registry.schema(vt.type_name())?;
            ScalarValue::Struct(Box::new(decode_struct(schema, buf, registry, ext_registry)?))
        }
        _ => unreachable!("every VariantType is handled above"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_registries() -> (TypeRegistry, ExtensionObjectRegistry) {
        (TypeRegistry::new(), ExtensionObjectRegistry::new())
    }

    #[test]
    fn int32_array_matches_concrete_wire_bytes() {
        let (registry, ext_registry) = empty_registries();
        let variant = Variant::array(
            VariantType::Int32,
            vec![ScalarValue::Int32(1), ScalarValue::Int32(2), ScalarValue::Int32(3)],
        );
        let mut out = Vec::new();
        variant.encode(&registry, &ext_registry, &mut out).unwrap();

        assert_eq!(out[0], 0b1000_0110); // is_array | tag 6 (Int32)
        assert_eq!(&out[1..5], &[0x03, 0x00, 0x00, 0x00]);
        assert_eq!(
            &out[5..],
            &[0x01, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x03, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn scalar_round_trips() {
        let (registry, ext_registry) = empty_registries();
        let variant = Variant::scalar(VariantType::Double, ScalarValue::Double(3.5));
        let mut out = Vec::new();
        variant.encode(&registry, &ext_registry, &mut out).unwrap();

        let mut buf = Buffer::new(&out);
        let back = Variant::decode(&mut buf, &registry, &ext_registry).unwrap();
        assert_eq!(back, variant);
    }

    #[test]
    fn array_round_trips_without_dimensions() {
        let (registry, ext_registry) = empty_registries();
        let variant = Variant::array(
            VariantType::UInt16,
            vec![ScalarValue::UInt16(1), ScalarValue::UInt16(2)],
        );
        let mut out = Vec::new();
        variant.encode(&registry, &ext_registry, &mut out).unwrap();

        let mut buf = Buffer::new(&out);
        let back = Variant::decode(&mut buf, &registry, &ext_registry).unwrap();
        assert_eq!(back, variant);
    }

    #[test]
    fn nd_array_reshapes_and_round_trips_dimensions() {
        let (registry, ext_registry) = empty_registries();
        let mut variant = Variant::array(
            VariantType::Byte,
            (0..6).map(ScalarValue::Byte).collect(),
        );
        variant.dimensions = Some(vec![2, 3]);

        let mut out = Vec::new();
        variant.encode(&registry, &ext_registry, &mut out).unwrap();

        let mut buf = Buffer::new(&out);
        let back = Variant::decode(&mut buf, &registry, &ext_registry).unwrap();
        assert_eq!(back.dimensions, Some(vec![2, 3]));
        match &back.value {
            VariantValue::Nested(groups) => {
                assert_eq!(groups.len(), 2);
                for group in groups {
                    match group {
                        Nested::Group(inner) => assert_eq!(inner.len(), 3),
                        _ => panic!("expected a group"),
                    }
                }
            }
            other => panic!("expected nested value, got {other:?}"),
        }
        assert_eq!(back.flatten(), variant.flatten());
    }

    #[test]
    fn reshape_pads_short_flat_lists_with_empty_groups() {
        let flat = vec![Nested::Leaf(ScalarValue::Byte(1)), Nested::Leaf(ScalarValue::Byte(2))];
        let nested = reshape(flat, &[2, 2]);
        assert_eq!(nested.len(), 2);
        match &nested[1] {
            Nested::Group(inner) => {
                assert_eq!(inner.len(), 2);
                assert_eq!(inner[1], Nested::Group(Vec::new()));
            }
            _ => panic!("expected a group"),
        }
    }

    #[test]
    fn tag_above_25_is_preserved_as_byte_string_blob() {
        let (registry, ext_registry) = empty_registries();
        let variant = Variant {
            variant_type: VariantTag::Other(40),
            value: VariantValue::Scalar(ScalarValue::Other {
                tag: 40,
                bytes: Some(vec![1, 2, 3]),
            }),
            is_array: false,
            dimensions: None,
        };
        let mut out = Vec::new();
        variant.encode(&registry, &ext_registry, &mut out).unwrap();
        assert_eq!(out[0], 40);

        let mut buf = Buffer::new(&out);
        let back = Variant::decode(&mut buf, &registry, &ext_registry).unwrap();
        assert_eq!(back, variant);
    }
}
