//! Variable-length builtins that sit directly on top of the primitive
//! codec: String, ByteString, Guid, DateTime and Null.

use time::{Date, Duration, Month, OffsetDateTime, Time, UtcOffset};
use uuid::Uuid;

use crate::buffer::Buffer;
use crate::error::{Error, Result};
use crate::primitives::Primitive;

/// `Int32` length prefix then that many raw bytes. `-1` means absent,
/// `0` means empty. No charset is imposed.
pub fn encode_byte_string(value: Option<&[u8]>, out: &mut Vec<u8>) -> Result<()> {
    match value {
        None => (-1i32).encode(out),
        Some(bytes) => {
            let len = i32::try_from(bytes.len()).map_err(|_| Error::ArrayTooLong(bytes.len()))?;
            len.encode(out);
            out.extend_from_slice(bytes);
        }
    }
    Ok(())
}

pub fn decode_byte_string(buf: &mut Buffer) -> Result<Option<Vec<u8>>> {
    let len = i32::decode(buf)?;
    if len == -1 {
        return Ok(None);
    }
    if len < 0 {
        return Err(Error::BadLength { length: len });
    }
    if len as usize > buf.limits().max_binary_length {
        return Err(Error::BadLength { length: len });
    }
    Ok(Some(buf.read(len as usize)?.to_vec()))
}

/// Strings are UTF-8 on the wire; ill-formed UTF-8 is a decode error, unlike
/// `ByteString` which imposes no charset.
pub fn encode_string(value: Option<&str>, out: &mut Vec<u8>) -> Result<()> {
    encode_byte_string(value.map(|s| s.as_bytes()), out)
}

pub fn decode_string(buf: &mut Buffer) -> Result<Option<String>> {
    match decode_byte_string(buf)? {
        None => Ok(None),
        Some(bytes) => Ok(Some(String::from_utf8(bytes).map_err(|e| e.utf8_error())?)),
    }
}

/// 16 bytes, mixed endianness: `UInt32` time_low, `UInt16` time_mid,
/// `UInt16` time_hi_and_version (all little-endian), then 8 raw bytes
/// (`clock_seq_hi`, `clock_seq_low`, six bytes of `node`) in big-endian
/// order. The canonical in-memory representation is the RFC 4122 form.
pub fn encode_guid(value: Uuid, out: &mut Vec<u8>) {
    let fields = value.as_fields();
    fields.0.encode(out);
    fields.1.encode(out);
    fields.2.encode(out);
    out.extend_from_slice(fields.3);
}

pub fn decode_guid(buf: &mut Buffer) -> Result<Uuid> {
    let time_low = u32::decode(buf)?;
    let time_mid = u16::decode(buf)?;
    let time_hi_and_version = u16::decode(buf)?;
    let rest = buf.read(8)?;
    let mut node = [0u8; 8];
    node.copy_from_slice(rest);
    Ok(Uuid::from_fields(time_low, time_mid, time_hi_and_version, &node))
}

/// `Int64` count of 100-nanosecond intervals since 1601-01-01T00:00:00 UTC.
fn windows_epoch() -> OffsetDateTime {
    OffsetDateTime::new_in_offset(
        Date::from_calendar_date(1601, Month::January, 1).expect("1601-01-01 is a valid date"),
        Time::MIDNIGHT,
        UtcOffset::UTC,
    )
}

pub fn encode_date_time(value: OffsetDateTime, out: &mut Vec<u8>) -> Result<()> {
    let ticks = datetime_to_ticks(value)?;
    ticks.encode(out);
    Ok(())
}

pub fn decode_date_time(buf: &mut Buffer) -> Result<OffsetDateTime> {
    let ticks = i64::decode(buf)?;
    ticks_to_datetime(ticks)
}

pub fn datetime_to_ticks(value: OffsetDateTime) -> Result<i64> {
    let delta = value - windows_epoch();
    let ticks_per_sec = 10_000_000i128;
    let ticks = delta.whole_seconds() as i128 * ticks_per_sec
        + (delta.subsec_nanoseconds() as i128) / 100;
    i64::try_from(ticks).map_err(|_| Error::DateTimeRange)
}

pub fn ticks_to_datetime(ticks: i64) -> Result<OffsetDateTime> {
    // split into whole seconds + a sub-second remainder rather than a single
    // `Duration::nanoseconds(ticks * 100)`, which would overflow i64 nanos
    // for ticks anywhere near the representable range.
    let whole_seconds = ticks.div_euclid(10_000_000);
    let remainder_ticks = ticks.rem_euclid(10_000_000);
    let delta = Duration::seconds(whole_seconds) + Duration::nanoseconds(remainder_ticks * 100);
    windows_epoch()
        .checked_add(delta)
        .ok_or(Error::DateTimeRange)
}

/// Encodes to zero bytes; decodes as absence. Used only as a sentinel.
pub fn encode_null(_out: &mut Vec<u8>) {}

pub fn decode_null(_buf: &mut Buffer) -> Option<()> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_absent_vs_empty_vs_value() {
        let mut out = Vec::new();
        encode_string(None, &mut out).unwrap();
        assert_eq!(out, vec![0xff, 0xff, 0xff, 0xff]);

        let mut out = Vec::new();
        encode_string(Some(""), &mut out).unwrap();
        assert_eq!(out, vec![0x00, 0x00, 0x00, 0x00]);

        let mut out = Vec::new();
        encode_string(Some("OPC"), &mut out).unwrap();
        assert_eq!(out, vec![0x03, 0x00, 0x00, 0x00, 0x4f, 0x50, 0x43]);
    }

    #[test]
    fn string_round_trips() {
        let mut out = Vec::new();
        encode_string(Some("hello"), &mut out).unwrap();
        let mut buf = Buffer::new(&out);
        assert_eq!(decode_string(&mut buf).unwrap(), Some("hello".to_string()));
    }

    #[test]
    fn string_rejects_ill_formed_utf8() {
        let mut out = Vec::new();
        2i32.encode(&mut out);
        out.extend_from_slice(&[0xff, 0xfe]);
        let mut buf = Buffer::new(&out);
        assert!(matches!(decode_string(&mut buf), Err(Error::BadUtf8(_))));
    }

    #[test]
    fn guid_wire_bytes() {
        let guid = Uuid::parse_str("72962B91-FA75-4AE6-8D28-B404DC7DAF63").unwrap();
        let mut out = Vec::new();
        encode_guid(guid, &mut out);
        assert_eq!(
            out,
            vec![
                0x91, 0x2b, 0x96, 0x72, 0x75, 0xfa, 0xe6, 0x4a, 0x8d, 0x28, 0xb4, 0x04, 0xdc, 0x7d,
                0xaf, 0x63
            ]
        );

        let mut buf = Buffer::new(&out);
        assert_eq!(decode_guid(&mut buf).unwrap(), guid);
    }

    #[test]
    fn date_time_round_trips() {
        let dt = windows_epoch() + Duration::days(400) + Duration::seconds(12345);
        let ticks = datetime_to_ticks(dt).unwrap();
        let back = ticks_to_datetime(ticks).unwrap();
        assert_eq!(dt, back);
    }

    #[test]
    fn date_time_at_epoch_is_zero_ticks() {
        assert_eq!(datetime_to_ticks(windows_epoch()).unwrap(), 0);
    }
}
