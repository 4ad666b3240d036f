//! Schema-driven dispatch: the runtime realization of a UA type dictionary.
//!
//! `StructSchema` and `TypeRegistry` are the Rust shape of spec's "type
//! registry mapping type names to schema descriptors" external
//! collaborator. They are built once (by the out-of-scope code-generation
//! layer) and never mutated again; every encode/decode call only reads
//! them.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::variant::{ScalarValue, VariantType};

/// A field's declared type, resolved once at registration time instead of
/// re-parsed from a string on every decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UaType {
    /// Dispatches to the builtin codec (primitive, string/guid/datetime,
    /// NodeId, ExtensionObject or nested Variant, depending on the tag).
    Builtin(VariantType),
    /// `Int32` count (`-1` => absent) followed by that many elements of the
    /// inner type.
    ListOf(Box<UaType>),
    /// Dispatches recursively to another registered `StructSchema`.
    Struct(String),
    /// Encoded as `UInt32` of its ordinal.
    Enum(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub ua_type: UaType,
}

/// An ordered list of `(field, ua_type)` plus an optional `switches` map
/// gating which fields are present, exactly as spec's data model describes
/// a `StructSchema`.
#[derive(Debug, Clone, Default)]
pub struct StructSchema {
    pub fields: Vec<FieldDef>,
    /// `field -> (bitmask_field, bit_index)`.
    pub switches: HashMap<String, (String, u8)>,
}

impl StructSchema {
    pub fn new() -> Self {
        StructSchema::default()
    }

    pub fn field(mut self, name: impl Into<String>, ua_type: UaType) -> Self {
        self.fields.push(FieldDef {
            name: name.into(),
            ua_type,
        });
        self
    }

    pub fn switch(mut self, field: impl Into<String>, bitmask_field: impl Into<String>, bit: u8) -> Self {
        self.switches.insert(field.into(), (bitmask_field.into(), bit));
        self
    }
}

/// A dynamic value conforming to some `StructSchema`, keyed by field name.
/// Real per-type Rust structs would be produced by the out-of-scope code
/// generator; this crate's job ends at the generic schema walk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructValue {
    pub fields: HashMap<String, FieldValue>,
}

impl StructValue {
    pub fn new() -> Self {
        StructValue::default()
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: FieldValue) {
        self.fields.insert(name.into(), value);
    }

    fn bitmask_value(&self, name: &str) -> Result<u32> {
        match self.fields.get(name) {
            Some(FieldValue::Scalar(scalar)) => scalar_as_u32(scalar),
            Some(_) | None => Err(Error::UnknownType {
                type_name: format!("switch bitmask field {name}"),
            }),
        }
    }

    /// Sets `bit` in the stored bitmask field iff `present`, implementing
    /// the optional-field switch law from spec's structure codec.
    pub(crate) fn apply_switch(&mut self, bitmask_field: &str, bit: u8, present: bool) -> Result<()> {
        let current = self.bitmask_value(bitmask_field).unwrap_or(0);
        let updated = if present { current | (1 << bit) } else { current };
        if let Some(FieldValue::Scalar(scalar)) = self.fields.get_mut(bitmask_field) {
            set_scalar_u32(scalar, updated)?;
        }
        Ok(())
    }

    pub(crate) fn switch_bit_set(&self, bitmask_field: &str, bit: u8) -> Result<bool> {
        Ok(self.bitmask_value(bitmask_field)? & (1 << bit) != 0)
    }
}

fn scalar_as_u32(scalar: &ScalarValue) -> Result<u32> {
    match scalar {
        ScalarValue::Byte(v) => Ok(*v as u32),
        ScalarValue::UInt16(v) => Ok(*v as u32),
        ScalarValue::UInt32(v) => Ok(*v),
        ScalarValue::Int32(v) => Ok(*v as u32),
        other => Err(Error::UnknownType {
            type_name: format!("{other:?} cannot be used as a switch bitmask"),
        }),
    }
}

fn set_scalar_u32(scalar: &mut ScalarValue, value: u32) -> Result<()> {
    match scalar {
        ScalarValue::Byte(v) => *v = value as u8,
        ScalarValue::UInt16(v) => *v = value as u16,
        ScalarValue::UInt32(v) => *v = value,
        ScalarValue::Int32(v) => *v = value as i32,
        other => {
            return Err(Error::UnknownType {
                type_name: format!("{other:?} cannot be used as a switch bitmask"),
            })
        }
    }
    Ok(())
}

/// A field's runtime value, shaped to mirror `UaType`.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Scalar(ScalarValue),
    List(Option<Vec<FieldValue>>),
    Struct(Box<StructValue>),
    EnumOrdinal(u32),
    /// An optional field gated by a switch bit that is clear.
    Absent,
}

/// `type_name -> StructSchema` and `type_name -> enum_ordinals`, populated
/// at startup and read-only for the lifetime of the process.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    structs: HashMap<String, StructSchema>,
    enums: HashMap<String, Vec<String>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        TypeRegistry::default()
    }

    pub fn register_struct(&mut self, type_name: impl Into<String>, schema: StructSchema) {
        self.structs.insert(type_name.into(), schema);
    }

    pub fn register_enum(&mut self, type_name: impl Into<String>, ordinals: Vec<String>) {
        self.enums.insert(type_name.into(), ordinals);
    }

    pub fn schema(&self, type_name: &str) -> Result<&StructSchema> {
        self.structs.get(type_name).ok_or_else(|| Error::UnknownType {
            type_name: type_name.to_string(),
        })
    }

    pub fn enum_ordinals(&self, type_name: &str) -> Result<&[String]> {
        self.enums
            .get(type_name)
            .map(|v| v.as_slice())
            .ok_or_else(|| Error::UnknownType {
                type_name: type_name.to_string(),
            })
    }
}
