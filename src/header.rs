//! The TCP transport message header: three ASCII `MessageType` bytes, one
//! `ChunkType` byte, a total packet size, and (for the secure-channel
//! message types) a channel id.

use crate::buffer::Buffer;
use crate::error::{Error, Result};
use crate::primitives::Primitive;

/// The fixed set of transport messages this codec frames. `Hello`/`Ack`/
/// `Error` never carry a channel id; `Open`/`Close`/`Message` always do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    Hello,
    Acknowledge,
    Error,
    OpenSecureChannel,
    CloseSecureChannel,
    Message,
}

impl MessageType {
    fn ascii(self) -> &'static [u8; 3] {
        match self {
            MessageType::Hello => b"HEL",
            MessageType::Acknowledge => b"ACK",
            MessageType::Error => b"ERR",
            MessageType::OpenSecureChannel => b"OPN",
            MessageType::CloseSecureChannel => b"CLO",
            MessageType::Message => b"MSG",
        }
    }

    fn from_ascii(bytes: &[u8]) -> Result<Self> {
        Ok(match bytes {
            b"HEL" => MessageType::Hello,
            b"ACK" => MessageType::Acknowledge,
            b"ERR" => MessageType::Error,
            b"OPN" => MessageType::OpenSecureChannel,
            b"CLO" => MessageType::CloseSecureChannel,
            b"MSG" => MessageType::Message,
            _ => {
                return Err(Error::BadTag {
                    kind: "MessageType",
                    tag: bytes.first().copied().unwrap_or(0),
                })
            }
        })
    }

    /// Whether this message type carries a `ChannelId` and so accounts its
    /// body size as `packet_size - 12` rather than `packet_size - 8`.
    fn has_channel_id(self) -> bool {
        matches!(
            self,
            MessageType::OpenSecureChannel | MessageType::CloseSecureChannel | MessageType::Message
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChunkType {
    Single,
    Intermediate,
    Abort,
}

impl ChunkType {
    fn ascii(self) -> u8 {
        match self {
            ChunkType::Single => b'F',
            ChunkType::Intermediate => b'C',
            ChunkType::Abort => b'A',
        }
    }

    fn from_ascii(byte: u8) -> Result<Self> {
        Ok(match byte {
            b'F' => ChunkType::Single,
            b'C' => ChunkType::Intermediate,
            b'A' => ChunkType::Abort,
            other => return Err(Error::BadTag { kind: "ChunkType", tag: other }),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub message_type: MessageType,
    pub chunk_type: ChunkType,
    pub packet_size: u32,
    pub channel_id: Option<u32>,
}

impl Header {
    /// Builds a header for a body of `body_size` bytes, computing
    /// `packet_size` and deciding whether a `ChannelId` is carried from
    /// `message_type` alone.
    pub fn for_body(message_type: MessageType, chunk_type: ChunkType, body_size: u32, channel_id: Option<u32>) -> Result<Self> {
        let overhead = if message_type.has_channel_id() { 12 } else { 8 };
        if message_type.has_channel_id() != channel_id.is_some() {
            return Err(Error::UnknownType {
                type_name: "channel_id presence does not match message_type".to_string(),
            });
        }
        Ok(Header {
            message_type,
            chunk_type,
            packet_size: overhead + body_size,
            channel_id,
        })
    }

    /// The body length implied by `packet_size`, accounting for the 8- or
    /// 12-byte header overhead depending on whether this message type
    /// carries a `ChannelId`.
    pub fn body_size(&self) -> u32 {
        let overhead = if self.message_type.has_channel_id() { 12 } else { 8 };
        self.packet_size.saturating_sub(overhead)
    }

    pub fn encode(&self, out: &mut Vec<u8>) -> Result<()> {
        out.extend_from_slice(self.message_type.ascii());
        out.push(self.chunk_type.ascii());
        self.packet_size.encode(out);
        if let Some(channel_id) = self.channel_id {
            channel_id.encode(out);
        }
        Ok(())
    }

    pub fn decode(buf: &mut Buffer) -> Result<Self> {
        let message_type = MessageType::from_ascii(buf.read(3)?)?;
        let chunk_type = ChunkType::from_ascii(u8::decode(buf)?)?;
        let packet_size = u32::decode(buf)?;
        let channel_id = if message_type.has_channel_id() {
            Some(u32::decode(buf)?)
        } else {
            None
        };
        Ok(Header {
            message_type,
            chunk_type,
            packet_size,
            channel_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hello_header_round_trips_with_eight_byte_overhead() {
        let header = Header::for_body(MessageType::Hello, ChunkType::Single, 20, None).unwrap();
        assert_eq!(header.packet_size, 28);
        assert_eq!(header.body_size(), 20);

        let mut out = Vec::new();
        header.encode(&mut out).unwrap();
        assert_eq!(&out[0..4], b"HELF");

        let mut buf = Buffer::new(&out);
        assert_eq!(Header::decode(&mut buf).unwrap(), header);
    }

    #[test]
    fn message_header_carries_channel_id_with_twelve_byte_overhead() {
        let header = Header::for_body(MessageType::Message, ChunkType::Intermediate, 100, Some(7)).unwrap();
        assert_eq!(header.packet_size, 112);
        assert_eq!(header.body_size(), 100);

        let mut out = Vec::new();
        header.encode(&mut out).unwrap();
        assert_eq!(&out[0..4], b"MSGC");

        let mut buf = Buffer::new(&out);
        let back = Header::decode(&mut buf).unwrap();
        assert_eq!(back, header);
        assert_eq!(back.channel_id, Some(7));
    }

    #[test]
    fn missing_channel_id_for_secure_message_type_is_an_error() {
        assert!(Header::for_body(MessageType::OpenSecureChannel, ChunkType::Single, 10, None).is_err());
    }

    #[test]
    fn unknown_message_type_is_bad_tag() {
        let mut buf = Buffer::new(b"XXXF\x00\x00\x00\x00");
        assert!(matches!(
            Header::decode(&mut buf),
            Err(Error::BadTag { kind: "MessageType", .. })
        ));
    }
}
