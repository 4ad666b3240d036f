//! Fixed-width little-endian scalars and the array-length convention.
//!
//! Every scalar type encodes to exactly `size_of::<T>()` bytes and decodes
//! from exactly that many. Arrays are a leading `Int32` length (`-1` means
//! absent, distinct from an empty array) followed by that many elements.

use byteorder::{ByteOrder, LittleEndian};

use crate::buffer::Buffer;
use crate::error::{Error, Result};

/// A fixed-width scalar with a little-endian wire encoding.
pub trait Primitive: Sized + Copy {
    const SIZE: usize;

    fn encode(self, out: &mut Vec<u8>);
    fn decode(buf: &mut Buffer) -> Result<Self>;

    /// `None` encodes to the absent marker `FF FF FF FF`; `Some(&[])`
    /// encodes to the empty marker `00 00 00 00`.
    fn encode_array(values: Option<&[Self]>, out: &mut Vec<u8>) -> Result<()> {
        match values {
            None => i32::encode(-1, out),
            Some(values) => {
                let len = i32::try_from_len(values.len())?;
                i32::encode(len, out);
                for v in values {
                    v.encode(out);
                }
            }
        }
        Ok(())
    }

    fn decode_array(buf: &mut Buffer) -> Result<Option<Vec<Self>>> {
        let len = i32::decode(buf)?;
        if len == -1 {
            return Ok(None);
        }
        if len < 0 {
            return Err(Error::BadLength { length: len });
        }
        if len as usize > buf.limits().max_array_length {
            return Err(Error::BadLength { length: len });
        }
        let mut values = Vec::with_capacity(len as usize);
        for _ in 0..len {
            values.push(Self::decode(buf)?);
        }
        Ok(Some(values))
    }
}

impl i32 {
    /// Shared by every length-prefixed encoding (strings, byte strings,
    /// arrays): fails rather than silently truncating a length that does
    /// not fit in an `Int32`.
    fn try_from_len(len: usize) -> Result<i32> {
        i32::try_from(len).map_err(|_| Error::ArrayTooLong(len))
    }
}

macro_rules! impl_primitive_int {
    ($t:ty, $size:expr, $read:path, $write:path) => {
        impl Primitive for $t {
            const SIZE: usize = $size;

            fn encode(self, out: &mut Vec<u8>) {
                let mut tmp = [0u8; $size];
                $write(&mut tmp, self);
                out.extend_from_slice(&tmp);
            }

            fn decode(buf: &mut Buffer) -> Result<Self> {
                let bytes = buf.read($size)?;
                Ok($read(bytes))
            }
        }
    };
}

impl Primitive for u8 {
    const SIZE: usize = 1;

    fn encode(self, out: &mut Vec<u8>) {
        out.push(self);
    }

    fn decode(buf: &mut Buffer) -> Result<Self> {
        Ok(buf.read(1)?[0])
    }
}

impl Primitive for i8 {
    const SIZE: usize = 1;

    fn encode(self, out: &mut Vec<u8>) {
        out.push(self as u8);
    }

    fn decode(buf: &mut Buffer) -> Result<Self> {
        Ok(buf.read(1)?[0] as i8)
    }
}

impl_primitive_int!(u16, 2, LittleEndian::read_u16, LittleEndian::write_u16);
impl_primitive_int!(i16, 2, LittleEndian::read_i16, LittleEndian::write_i16);
impl_primitive_int!(u32, 4, LittleEndian::read_u32, LittleEndian::write_u32);
impl_primitive_int!(i32, 4, LittleEndian::read_i32, LittleEndian::write_i32);
impl_primitive_int!(u64, 8, LittleEndian::read_u64, LittleEndian::write_u64);
impl_primitive_int!(i64, 8, LittleEndian::read_i64, LittleEndian::write_i64);
impl_primitive_int!(f32, 4, LittleEndian::read_f32, LittleEndian::write_f32);
impl_primitive_int!(f64, 8, LittleEndian::read_f64, LittleEndian::write_f64);

impl Primitive for bool {
    const SIZE: usize = 1;

    fn encode(self, out: &mut Vec<u8>) {
        out.push(if self { 0x01 } else { 0x00 });
    }

    /// Any non-zero byte decodes as `true`; only `0x00` is `false`. This
    /// tolerance of non-canonical boolean bytes is deliberate -- it matches
    /// the reference implementation and callers must not treat it as an
    /// error.
    fn decode(buf: &mut Buffer) -> Result<Self> {
        Ok(buf.read(1)?[0] != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uint32_scalar_round_trips_and_matches_wire_bytes() {
        let mut out = Vec::new();
        0x0102_0304u32.encode(&mut out);
        assert_eq!(out, vec![0x04, 0x03, 0x02, 0x01]);

        let mut buf = Buffer::new(&out);
        assert_eq!(u32::decode(&mut buf).unwrap(), 0x0102_0304);
    }

    #[test]
    fn bool_tolerates_non_canonical_true_bytes() {
        let mut buf = Buffer::new(&[0x7f]);
        assert!(bool::decode(&mut buf).unwrap());

        let mut buf = Buffer::new(&[0x00]);
        assert!(!bool::decode(&mut buf).unwrap());

        let mut out = Vec::new();
        true.encode(&mut out);
        assert_eq!(out, vec![0x01]);
    }

    #[test]
    fn array_absent_is_canonical_ff_and_empty_is_canonical_zero() {
        let mut out = Vec::new();
        i32::encode_array(None, &mut out).unwrap();
        assert_eq!(out, vec![0xff, 0xff, 0xff, 0xff]);

        let mut out = Vec::new();
        i32::encode_array(Some(&[]), &mut out).unwrap();
        assert_eq!(out, vec![0x00, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn array_round_trips() {
        let values = vec![1i32, 2, 3];
        let mut out = Vec::new();
        i32::encode_array(Some(&values), &mut out).unwrap();

        let mut buf = Buffer::new(&out);
        assert_eq!(i32::decode_array(&mut buf).unwrap(), Some(values));

        let mut out = Vec::new();
        i32::encode_array(None, &mut out).unwrap();
        let mut buf = Buffer::new(&out);
        assert_eq!(i32::decode_array(&mut buf).unwrap(), None::<Vec<i32>>);
    }

    #[test]
    fn negative_length_other_than_absent_marker_is_bad_length() {
        let mut out = Vec::new();
        (-2i32).encode(&mut out);
        let mut buf = Buffer::new(&out);
        assert!(matches!(
            i32::decode_array(&mut buf),
            Err(Error::BadLength { length: -2 })
        ));
    }
}
