//! Binary wire codec for OPC UA (IEC 62541) Part 6: the layer that turns
//! typed values into bytes and back, sitting underneath the secure channel,
//! session and service layers of a full client/server stack.
//!
//! The five layers are leaves first: [`primitives`] (fixed-width scalars),
//! [`builtins`] (string/byte string/GUID/DateTime), [`node_id`] (NodeId /
//! ExpandedNodeId), [`variant`] and [`extension_object`] (the polymorphic
//! value carrier and the open-type wrapper it can hold), and
//! [`struct_codec`] plus [`header`] (schema-driven records and TCP framing).
//!
//! Encoding and decoding of user-defined structures is schema-driven
//! ([`schema`]) rather than generated into per-type Rust structs; the
//! out-of-scope code generator that would read a UA type dictionary and
//! emit such structs is not part of this crate.

pub mod buffer;
pub mod builtins;
pub mod error;
pub mod extension_object;
pub mod header;
pub mod limits;
pub mod node_id;
pub mod primitives;
pub mod schema;
pub mod struct_codec;
pub mod variant;

pub use buffer::Buffer;
pub use error::{Error, Result};
pub use extension_object::{ExtensionObject, ExtensionObjectRegistry};
pub use header::{ChunkType, Header, MessageType};
pub use limits::Limits;
pub use node_id::{Identifier, NodeId, NodeIdType};
pub use primitives::Primitive;
pub use schema::{FieldDef, FieldValue, StructSchema, StructValue, TypeRegistry, UaType};
pub use struct_codec::{decode_struct, encode_struct};
pub use variant::{reshape, ScalarValue, Variant, VariantTag, VariantType};
