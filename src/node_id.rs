//! NodeId / ExpandedNodeId: a compact multi-form address into the OPC UA
//! address space, discriminated by a 6-bit type tag plus two optional flag
//! bits (`NamespaceUri`, `ServerIndex`).

use uuid::Uuid;

use crate::builtins::{decode_byte_string, decode_guid, decode_string, encode_byte_string, encode_guid, encode_string};
use crate::buffer::Buffer;
use crate::error::{Error, Result};
use crate::primitives::Primitive;

const HAS_NAMESPACE_URI: u8 = 1 << 7;
const HAS_SERVER_INDEX: u8 = 1 << 6;
const TYPE_TAG_MASK: u8 = 0b0011_1111;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeIdType {
    TwoByte = 0,
    FourByte = 1,
    Numeric = 2,
    String = 3,
    Guid = 4,
    ByteString = 5,
}

impl NodeIdType {
    fn from_tag(tag: u8) -> Result<Self> {
        Ok(match tag {
            0 => NodeIdType::TwoByte,
            1 => NodeIdType::FourByte,
            2 => NodeIdType::Numeric,
            3 => NodeIdType::String,
            4 => NodeIdType::Guid,
            5 => NodeIdType::ByteString,
            other => return Err(Error::BadTag { kind: "NodeId", tag: other }),
        })
    }
}

/// The identifier, whose shape always matches `NodeIdType`: a `TwoByte`,
/// `FourByte` or `Numeric` NodeId can never hold a `String` identifier at
/// the type level.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identifier {
    Numeric(u32),
    String(String),
    Guid(Uuid),
    ByteString(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeId {
    pub node_id_type: NodeIdType,
    pub namespace_index: u16,
    pub identifier: Identifier,
    pub namespace_uri: Option<String>,
    pub server_index: Option<u32>,
}

impl NodeId {
    pub fn null() -> Self {
        NodeId {
            node_id_type: NodeIdType::TwoByte,
            namespace_index: 0,
            identifier: Identifier::Numeric(0),
            namespace_uri: None,
            server_index: None,
        }
    }

    /// Per spec, a `NodeId` is the null sentinel when its identifier value
    /// is 0, regardless of namespace -- matching `ua_binary.py`'s
    /// `if typeid.Identifier == 0: return None`, which never checks the
    /// namespace either.
    pub fn is_null(&self) -> bool {
        matches!(self.identifier, Identifier::Numeric(0))
    }

    /// Picks the smallest numeric form admitting `namespace`/`identifier`,
    /// per the encode-minimality rule: `TwoByte` when the namespace is 0 and
    /// the identifier fits a byte, `FourByte` when both namespace and
    /// identifier fit their narrower fields, else `Numeric`.
    pub fn minimal_numeric(namespace: u16, identifier: u32) -> Self {
        let node_id_type = if namespace == 0 && identifier <= u8::MAX as u32 {
            NodeIdType::TwoByte
        } else if namespace <= u8::MAX as u16 && identifier <= u16::MAX as u32 {
            NodeIdType::FourByte
        } else {
            NodeIdType::Numeric
        };
        NodeId {
            node_id_type,
            namespace_index: namespace,
            identifier: Identifier::Numeric(identifier),
            namespace_uri: None,
            server_index: None,
        }
    }

    pub fn new_string(namespace: u16, identifier: impl Into<String>) -> Self {
        NodeId {
            node_id_type: NodeIdType::String,
            namespace_index: namespace,
            identifier: Identifier::String(identifier.into()),
            namespace_uri: None,
            server_index: None,
        }
    }

    pub fn new_guid(namespace: u16, identifier: Uuid) -> Self {
        NodeId {
            node_id_type: NodeIdType::Guid,
            namespace_index: namespace,
            identifier: Identifier::Guid(identifier),
            namespace_uri: None,
            server_index: None,
        }
    }

    pub fn new_byte_string(namespace: u16, identifier: Vec<u8>) -> Self {
        NodeId {
            node_id_type: NodeIdType::ByteString,
            namespace_index: namespace,
            identifier: Identifier::ByteString(identifier),
            namespace_uri: None,
            server_index: None,
        }
    }

    pub fn encode(&self, out: &mut Vec<u8>) -> Result<()> {
        let mut flags = self.node_id_type as u8;
        if self.namespace_uri.is_some() {
            flags |= HAS_NAMESPACE_URI;
        }
        if self.server_index.is_some() {
            flags |= HAS_SERVER_INDEX;
        }
        out.push(flags);

        match self.node_id_type {
            NodeIdType::TwoByte => {
                let Identifier::Numeric(id) = &self.identifier else {
                    return Err(Error::BadTag { kind: "NodeId identifier", tag: 0 });
                };
                (*id as u8).encode(out);
            }
            NodeIdType::FourByte => {
                let Identifier::Numeric(id) = &self.identifier else {
                    return Err(Error::BadTag { kind: "NodeId identifier", tag: 1 });
                };
                (self.namespace_index as u8).encode(out);
                (*id as u16).encode(out);
            }
            NodeIdType::Numeric => {
                let Identifier::Numeric(id) = &self.identifier else {
                    return Err(Error::BadTag { kind: "NodeId identifier", tag: 2 });
                };
                self.namespace_index.encode(out);
                id.encode(out);
            }
            NodeIdType::String => {
                let Identifier::String(id) = &self.identifier else {
                    return Err(Error::BadTag { kind: "NodeId identifier", tag: 3 });
                };
                self.namespace_index.encode(out);
                encode_string(Some(id), out)?;
            }
            NodeIdType::Guid => {
                let Identifier::Guid(id) = &self.identifier else {
                    return Err(Error::BadTag { kind: "NodeId identifier", tag: 4 });
                };
                self.namespace_index.encode(out);
                encode_guid(*id, out);
            }
            NodeIdType::ByteString => {
                let Identifier::ByteString(id) = &self.identifier else {
                    return Err(Error::BadTag { kind: "NodeId identifier", tag: 5 });
                };
                self.namespace_index.encode(out);
                encode_byte_string(Some(id), out)?;
            }
        }

        if let Some(uri) = &self.namespace_uri {
            encode_string(Some(uri), out)?;
        }
        if let Some(server_index) = self.server_index {
            server_index.encode(out);
        }
        Ok(())
    }

    pub fn decode(buf: &mut Buffer) -> Result<Self> {
        let encoding = u8::decode(buf)?;
        let node_id_type = NodeIdType::from_tag(encoding & TYPE_TAG_MASK)?;

        let (namespace_index, identifier) = match node_id_type {
            NodeIdType::TwoByte => (0u16, Identifier::Numeric(u8::decode(buf)? as u32)),
            NodeIdType::FourByte => {
                let ns = u8::decode(buf)? as u16;
                let id = u16::decode(buf)? as u32;
                (ns, Identifier::Numeric(id))
            }
            NodeIdType::Numeric => {
                let ns = u16::decode(buf)?;
                let id = u32::decode(buf)?;
                (ns, Identifier::Numeric(id))
            }
            NodeIdType::String => {
                let ns = u16::decode(buf)?;
                let id = decode_string(buf)?.unwrap_or_default();
                (ns, Identifier::String(id))
            }
            NodeIdType::Guid => {
                let ns = u16::decode(buf)?;
                let id = decode_guid(buf)?;
                (ns, Identifier::Guid(id))
            }
            NodeIdType::ByteString => {
                let ns = u16::decode(buf)?;
                let id = decode_byte_string(buf)?.unwrap_or_default();
                (ns, Identifier::ByteString(id))
            }
        };

        let namespace_uri = if encoding & HAS_NAMESPACE_URI != 0 {
            decode_string(buf)?
        } else {
            None
        };
        let server_index = if encoding & HAS_SERVER_INDEX != 0 {
            Some(u32::decode(buf)?)
        } else {
            None
        };

        Ok(NodeId {
            node_id_type,
            namespace_index,
            identifier,
            namespace_uri,
            server_index,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_byte_round_trips() {
        let nid = NodeId::minimal_numeric(0, 72);
        let mut out = Vec::new();
        nid.encode(&mut out).unwrap();
        assert_eq!(out, vec![0x00, 0x48]);

        let mut buf = Buffer::new(&out);
        let back = NodeId::decode(&mut buf).unwrap();
        assert_eq!(back.node_id_type, NodeIdType::TwoByte);
        assert_eq!(back.namespace_index, 0);
        assert_eq!(back.identifier, Identifier::Numeric(72));
    }

    #[test]
    fn minimal_numeric_picks_smallest_form() {
        assert_eq!(NodeId::minimal_numeric(0, 10).node_id_type, NodeIdType::TwoByte);
        assert_eq!(NodeId::minimal_numeric(1, 10).node_id_type, NodeIdType::FourByte);
        assert_eq!(NodeId::minimal_numeric(0, 1000).node_id_type, NodeIdType::FourByte);
        assert_eq!(NodeId::minimal_numeric(300, 10).node_id_type, NodeIdType::Numeric);
        assert_eq!(NodeId::minimal_numeric(0, 100_000).node_id_type, NodeIdType::Numeric);
    }

    #[test]
    fn null_node_id_is_two_byte_zero() {
        let mut out = Vec::new();
        NodeId::null().encode(&mut out).unwrap();
        assert_eq!(out, vec![0x00, 0x00]);
        assert!(NodeId::null().is_null());
    }

    #[test]
    fn string_form_with_namespace_uri_and_server_index_round_trips() {
        let mut nid = NodeId::new_string(3, "my-node");
        nid.namespace_uri = Some("urn:example".to_string());
        nid.server_index = Some(7);

        let mut out = Vec::new();
        nid.encode(&mut out).unwrap();
        assert_eq!(out[0] & 0xc0, 0b1100_0000);

        let mut buf = Buffer::new(&out);
        let back = NodeId::decode(&mut buf).unwrap();
        assert_eq!(back, nid);
    }

    #[test]
    fn unknown_tag_is_bad_tag() {
        let mut buf = Buffer::new(&[0b0011_1111]);
        assert!(matches!(NodeId::decode(&mut buf), Err(Error::BadTag { kind: "NodeId", .. })));
    }
}
