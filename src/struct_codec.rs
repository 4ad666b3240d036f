//! Schema-driven encoding of named-field records, including optional
//! fields gated by a bitmask ("switch") field.
//!
//! For any schema `S`, the concatenation of its fields' encodings in
//! schema order equals the record's encoding -- there is no struct-level
//! framing beyond that.

use crate::buffer::Buffer;
use crate::error::{Error, Result};
use crate::extension_object::ExtensionObjectRegistry;
use crate::primitives::Primitive;
use crate::schema::{FieldValue, StructSchema, StructValue, TypeRegistry, UaType};
use crate::variant::{decode_scalar, encode_scalar, ScalarValue};

/// Before emitting any fields, sets each switch's bit in its bitmask field
/// iff the gated field's value is present. The bitmask field is then
/// emitted normally when its turn comes in schema order; the gated field
/// itself is skipped entirely when absent.
pub fn encode_struct(
    schema: &StructSchema,
    value: &StructValue,
    registry: &TypeRegistry,
    ext_registry: &ExtensionObjectRegistry,
    out: &mut Vec<u8>,
) -> Result<()> {
    let mut value = value.clone();
    for (field, (bitmask_field, bit)) in &schema.switches {
        let present = !matches!(value.get(field), None | Some(FieldValue::Absent));
        value.apply_switch(bitmask_field, *bit, present)?;
    }

    for field_def in &schema.fields {
        if schema.switches.contains_key(&field_def.name) {
            match value.get(&field_def.name) {
                None | Some(FieldValue::Absent) => continue,
                _ => {}
            }
        }
        let field_value = value.get(&field_def.name).ok_or_else(|| Error::UnknownType {
            type_name: format!("missing field {}", field_def.name),
        })?;
        encode_field(&field_def.ua_type, field_value, registry, ext_registry, out)?;
    }
    Ok(())
}

/// Mirrors `encode_struct`: when a field is gated by a switch, the
/// already-decoded bitmask field is consulted and the field is skipped
/// (left absent) if its bit is clear.
pub fn decode_struct(
    schema: &StructSchema,
    buf: &mut Buffer,
    registry: &TypeRegistry,
    ext_registry: &ExtensionObjectRegistry,
) -> Result<StructValue> {
    let mut value = StructValue::new();
    for field_def in &schema.fields {
        if let Some((bitmask_field, bit)) = schema.switches.get(&field_def.name) {
            if !value.switch_bit_set(bitmask_field, *bit)? {
                value.set(field_def.name.clone(), FieldValue::Absent);
                continue;
            }
        }
        let field_value = decode_field(&field_def.ua_type, buf, registry, ext_registry)?;
        value.set(field_def.name.clone(), field_value);
    }
    Ok(value)
}

fn encode_field(
    ua_type: &UaType,
    value: &FieldValue,
    registry: &TypeRegistry,
    ext_registry: &ExtensionObjectRegistry,
    out: &mut Vec<u8>,
) -> Result<()> {
    match (ua_type, value) {
        (UaType::ListOf(inner), FieldValue::List(values)) => match values {
            None => (-1i32).encode(out),
            Some(values) => {
                let len = i32::try_from(values.len()).map_err(|_| Error::ArrayTooLong(values.len()))?;
                len.encode(out);
                for v in values {
                    encode_field(inner, v, registry, ext_registry, out)?;
                }
            }
        },
        (UaType::Builtin(vt), FieldValue::Scalar(scalar)) => {
            encode_scalar(*vt, scalar, registry, ext_registry, out)?
        }
        (UaType::Struct(name), FieldValue::Struct(inner)) => {
            let schema = registry.schema(name)?;
            encode_struct(schema, inner, registry, ext_registry, out)?;
        }
        (UaType::Enum(_), FieldValue::EnumOrdinal(ordinal)) => ordinal.encode(out),
        (_, FieldValue::Absent) => {}
        _ => {
            return Err(Error::UnknownType {
                type_name: format!("field value does not match declared type {ua_type:?}"),
            })
        }
    }
    Ok(())
}

fn decode_field(
    ua_type: &UaType,
    buf: &mut Buffer,
    registry: &TypeRegistry,
    ext_registry: &ExtensionObjectRegistry,
) -> Result<FieldValue> {
    Ok(match ua_type {
        UaType::ListOf(inner) => {
            let len = i32::decode(buf)?;
            let limit = match inner.as_ref() {
                UaType::Struct(_) => buf.limits().max_struct_length,
                _ => buf.limits().max_array_length,
            };
            if len == -1 {
                FieldValue::List(None)
            } else if len < 0 {
                return Err(Error::BadLength { length: len });
            } else if len as usize > limit {
                return Err(Error::BadLength { length: len });
            } else {
                let mut values = Vec::with_capacity(len as usize);
                for _ in 0..len {
                    values.push(decode_field(inner, buf, registry, ext_registry)?);
                }
                FieldValue::List(Some(values))
            }
        }
        UaType::Builtin(vt) => FieldValue::Scalar(decode_scalar(*vt, buf, registry, ext_registry)?),
        UaType::Struct(name) => {
            let schema = registry.schema(name)?;
            FieldValue::Struct(Box::new(decode_struct(schema, buf, registry, ext_registry)?))
        }
        UaType::Enum(name) => {
            let ordinal = u32::decode(buf)?;
            let ordinals = registry.enum_ordinals(name)?;
            if ordinal as usize >= ordinals.len() {
                return Err(Error::BadTag {
                    kind: "enum ordinal",
                    tag: ordinal as u8,
                });
            }
            FieldValue::EnumOrdinal(ordinal)
        }
    })
}
