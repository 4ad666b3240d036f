//! ExtensionObject: a NodeId naming a user-defined structure plus that
//! structure's serialized body, the mechanism by which the wire format
//! stays open to types unknown to this codec.

use std::collections::HashMap;

use crate::builtins::encode_byte_string;
use crate::buffer::Buffer;
use crate::error::{Error, Result};
use crate::node_id::NodeId;
use crate::primitives::Primitive;
use crate::schema::{StructValue, TypeRegistry};
use crate::struct_codec::{decode_struct, encode_struct};

const BINARY_BODY: u8 = 1 << 0;
const XML_BODY: u8 = 1 << 1;

/// The `type_id -> registered type name` table (and its reverse), the
/// Rust realization of the "extension-object registry mapping NodeIds to
/// known structure schemas" external collaborator.
#[derive(Debug, Clone, Default)]
pub struct ExtensionObjectRegistry {
    by_type_id: HashMap<NodeId, String>,
    by_type_name: HashMap<String, NodeId>,
}

impl ExtensionObjectRegistry {
    pub fn new() -> Self {
        ExtensionObjectRegistry::default()
    }

    pub fn register(&mut self, type_name: impl Into<String>, type_id: NodeId) {
        let type_name = type_name.into();
        self.by_type_id.insert(type_id.clone(), type_name.clone());
        self.by_type_name.insert(type_name, type_id);
    }

    pub fn type_name_for(&self, type_id: &NodeId) -> Option<&str> {
        self.by_type_id.get(type_id).map(String::as_str)
    }

    pub fn type_id_for(&self, type_name: &str) -> Result<&NodeId> {
        self.by_type_name.get(type_name).ok_or_else(|| Error::UnknownType {
            type_name: type_name.to_string(),
        })
    }
}

/// Either the absent sentinel, a concrete structure whose class is
/// registered, or an opaque pass-through of an unrecognized type_id.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtensionObject {
    Null,
    Known {
        type_name: String,
        body: StructValue,
    },
    Unknown {
        type_id: NodeId,
        encoding: u8,
        body: Option<Vec<u8>>,
    },
}

impl ExtensionObject {
    pub fn encode(
        &self,
        registry: &TypeRegistry,
        ext_registry: &ExtensionObjectRegistry,
        out: &mut Vec<u8>,
    ) -> Result<()> {
        match self {
            ExtensionObject::Null => {
                NodeId::null().encode(out)?;
                0u8.encode(out);
            }
            ExtensionObject::Known { type_name, body } => {
                let type_id = ext_registry.type_id_for(type_name)?;
                type_id.encode(out)?;
                BINARY_BODY.encode(out);
                let schema = registry.schema(type_name)?;
                let mut body_bytes = Vec::new();
                encode_struct(schema, body, registry, ext_registry, &mut body_bytes)?;
                encode_byte_string(Some(&body_bytes), out)?;
            }
            ExtensionObject::Unknown {
                type_id,
                encoding,
                body,
            } => {
                type_id.encode(out)?;
                encoding.encode(out);
                if encoding & BINARY_BODY != 0 {
                    encode_byte_string(body.as_deref(), out)?;
                }
            }
        }
        Ok(())
    }

    pub fn decode(
        buf: &mut Buffer,
        registry: &TypeRegistry,
        ext_registry: &ExtensionObjectRegistry,
    ) -> Result<Self> {
        let type_id = NodeId::decode(buf)?;
        let encoding = u8::decode(buf)?;

        if encoding & XML_BODY != 0 {
            return Err(Error::UnsupportedEncoding { encoding });
        }

        let mut body: Option<Buffer> = None;
        if encoding & BINARY_BODY != 0 {
            let len = i32::decode(buf)?;
            body = Some(if len < 1 {
                Buffer::new(&[])
            } else {
                let sub = buf.copy(len as usize)?;
                buf.skip(len as usize)?;
                sub
            });
        }

        if type_id.is_null() {
            log::trace!("decoded null ExtensionObject");
            return Ok(ExtensionObject::Null);
        }

        if let Some(type_name) = ext_registry.type_name_for(&type_id) {
            let mut body = body.ok_or_else(|| Error::MissingBody {
                type_id: format!("{type_id:?}"),
            })?;
            let schema = registry.schema(type_name)?;
            let value = decode_struct(schema, &mut body, registry, ext_registry)?;
            Ok(ExtensionObject::Known {
                type_name: type_name.to_string(),
                body: value,
            })
        } else {
            log::warn!("ExtensionObject type_id {type_id:?} is not registered; preserving opaquely");
            let raw = match body {
                Some(mut b) => {
                    let remaining = b.remaining();
                    Some(b.read(remaining)?.to_vec())
                }
                None => None,
            };
            Ok(ExtensionObject::Unknown {
                type_id,
                encoding,
                body: raw,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldValue, StructSchema, UaType};
    use crate::variant::{ScalarValue, VariantType};

    #[test]
    fn null_extension_object_encodes_to_three_zero_bytes() {
        let registry = TypeRegistry::new();
        let ext_registry = ExtensionObjectRegistry::new();
        let mut out = Vec::new();
        ExtensionObject::Null.encode(&registry, &ext_registry, &mut out).unwrap();
        assert_eq!(out, vec![0x00, 0x00, 0x00]);

        let mut buf = Buffer::new(&out);
        assert_eq!(
            ExtensionObject::decode(&mut buf, &registry, &ext_registry).unwrap(),
            ExtensionObject::Null
        );
    }

    #[test]
    fn unknown_type_id_round_trips_opaquely() {
        let registry = TypeRegistry::new();
        let ext_registry = ExtensionObjectRegistry::new();
        let original = ExtensionObject::Unknown {
            type_id: NodeId::minimal_numeric(1, 999),
            encoding: 0x01,
            body: Some(vec![0xde, 0xad, 0xbe, 0xef]),
        };

        let mut out = Vec::new();
        original.encode(&registry, &ext_registry, &mut out).unwrap();

        let mut buf = Buffer::new(&out);
        let back = ExtensionObject::decode(&mut buf, &registry, &ext_registry).unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn known_type_round_trips_through_struct_schema() {
        let mut registry = TypeRegistry::new();
        registry.register_struct(
            "Point",
            StructSchema::new()
                .field("X", UaType::Builtin(VariantType::Double))
                .field("Y", UaType::Builtin(VariantType::Double)),
        );
        let mut ext_registry = ExtensionObjectRegistry::new();
        ext_registry.register("Point", NodeId::minimal_numeric(1, 42));

        let mut body = StructValue::new();
        body.set("X", FieldValue::Scalar(ScalarValue::Double(1.0)));
        body.set("Y", FieldValue::Scalar(ScalarValue::Double(2.0)));
        let original = ExtensionObject::Known {
            type_name: "Point".to_string(),
            body,
        };

        let mut out = Vec::new();
        original.encode(&registry, &ext_registry, &mut out).unwrap();

        let mut buf = Buffer::new(&out);
        let back = ExtensionObject::decode(&mut buf, &registry, &ext_registry).unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn known_type_with_missing_body_is_decode_error() {
        let mut registry = TypeRegistry::new();
        registry.register_struct("Point", StructSchema::new());
        let mut ext_registry = ExtensionObjectRegistry::new();
        ext_registry.register("Point", NodeId::minimal_numeric(1, 42));

        let mut out = Vec::new();
        NodeId::minimal_numeric(1, 42).encode(&mut out).unwrap();
        0u8.encode(&mut out); // encoding byte 0: no body bytes follow

        let mut buf = Buffer::new(&out);
        assert!(matches!(
            ExtensionObject::decode(&mut buf, &registry, &ext_registry),
            Err(Error::MissingBody { .. })
        ));
    }

    #[test]
    fn xml_encoding_bit_is_unsupported() {
        let registry = TypeRegistry::new();
        let ext_registry = ExtensionObjectRegistry::new();

        let mut out = Vec::new();
        NodeId::null().encode(&mut out).unwrap();
        0x02u8.encode(&mut out);

        let mut buf = Buffer::new(&out);
        assert!(matches!(
            ExtensionObject::decode(&mut buf, &registry, &ext_registry),
            Err(Error::UnsupportedEncoding { encoding: 0x02 })
        ));
    }
}
