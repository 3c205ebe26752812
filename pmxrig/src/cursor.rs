//! Bounds-checked little-endian reader and writer used by the PMX codec.
//!
//! Every read checks the requested length against the remaining input and reports
//! [`Defect::Truncated`] instead of reading past the end of the buffer.

use crate::{Defect, IndexWidth, TextEncoding};
use byteorder::{ByteOrder, LittleEndian};
use glam::{Quat, Vec2, Vec3, Vec4};

/// A value with a fixed little-endian encoding.
pub trait Fixed: Sized {
    const SIZE: usize;

    /// Decodes from exactly `Self::SIZE` bytes.
    fn decode(bytes: &[u8]) -> Self;

    fn encode(&self, out: &mut Vec<u8>);
}

impl Fixed for u8 {
    const SIZE: usize = 1;

    fn decode(bytes: &[u8]) -> Self {
        bytes[0]
    }

    fn encode(&self, out: &mut Vec<u8>) {
        out.push(*self);
    }
}

impl Fixed for i8 {
    const SIZE: usize = 1;

    fn decode(bytes: &[u8]) -> Self {
        bytes[0] as i8
    }

    fn encode(&self, out: &mut Vec<u8>) {
        out.push(*self as u8);
    }
}

macro_rules! fixed_number {
    ($ty:ty, $size:expr, $read:ident, $write:ident) => {
        impl Fixed for $ty {
            const SIZE: usize = $size;

            fn decode(bytes: &[u8]) -> Self {
                LittleEndian::$read(bytes)
            }

            fn encode(&self, out: &mut Vec<u8>) {
                let mut buf = [0u8; $size];
                LittleEndian::$write(&mut buf, *self);
                out.extend_from_slice(&buf);
            }
        }
    };
}

fixed_number!(u16, 2, read_u16, write_u16);
fixed_number!(i16, 2, read_i16, write_i16);
fixed_number!(u32, 4, read_u32, write_u32);
fixed_number!(i32, 4, read_i32, write_i32);
fixed_number!(f32, 4, read_f32, write_f32);

impl Fixed for Vec2 {
    const SIZE: usize = 8;

    fn decode(bytes: &[u8]) -> Self {
        Vec2::new(f32::decode(&bytes[0..4]), f32::decode(&bytes[4..8]))
    }

    fn encode(&self, out: &mut Vec<u8>) {
        self.x.encode(out);
        self.y.encode(out);
    }
}

impl Fixed for Vec3 {
    const SIZE: usize = 12;

    fn decode(bytes: &[u8]) -> Self {
        Vec3::new(
            f32::decode(&bytes[0..4]),
            f32::decode(&bytes[4..8]),
            f32::decode(&bytes[8..12]),
        )
    }

    fn encode(&self, out: &mut Vec<u8>) {
        self.x.encode(out);
        self.y.encode(out);
        self.z.encode(out);
    }
}

impl Fixed for Vec4 {
    const SIZE: usize = 16;

    fn decode(bytes: &[u8]) -> Self {
        Vec4::new(
            f32::decode(&bytes[0..4]),
            f32::decode(&bytes[4..8]),
            f32::decode(&bytes[8..12]),
            f32::decode(&bytes[12..16]),
        )
    }

    fn encode(&self, out: &mut Vec<u8>) {
        self.x.encode(out);
        self.y.encode(out);
        self.z.encode(out);
        self.w.encode(out);
    }
}

// Stored as raw x, y, z, w; no normalization so the bytes survive a round trip.
impl Fixed for Quat {
    const SIZE: usize = 16;

    fn decode(bytes: &[u8]) -> Self {
        let v = Vec4::decode(bytes);
        Quat::from_xyzw(v.x, v.y, v.z, v.w)
    }

    fn encode(&self, out: &mut Vec<u8>) {
        Vec4::from(*self).encode(out);
    }
}

#[derive(Clone, Debug)]
pub struct BinaryInput<'a> {
    bytes: &'a [u8],
    cursor: usize,
}

impl<'a> BinaryInput<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, cursor: 0 }
    }

    /// Starts reading at `offset`; an offset past the end leaves nothing to read.
    pub fn at(bytes: &'a [u8], offset: usize) -> Self {
        Self {
            bytes,
            cursor: offset.min(bytes.len()),
        }
    }

    pub fn offset(&self) -> usize {
        self.cursor
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.cursor)
    }

    pub fn rest(&self) -> &'a [u8] {
        &self.bytes[self.cursor..]
    }

    fn take(&mut self, requested: usize) -> Result<&'a [u8], Defect> {
        let remaining = self.remaining();
        if remaining < requested {
            return Err(Defect::Truncated {
                offset: self.cursor,
                requested,
                remaining,
            });
        }
        let slice = &self.bytes[self.cursor..self.cursor + requested];
        self.cursor += requested;
        Ok(slice)
    }

    pub fn read_fixed<T: Fixed>(&mut self) -> Result<T, Defect> {
        Ok(T::decode(self.take(T::SIZE)?))
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], Defect> {
        self.take(len)
    }

    /// A strict 0/1 byte. Other values are rejected so the byte survives a rewrite.
    pub fn read_bool(&mut self) -> Result<bool, Defect> {
        let offset = self.cursor;
        match self.read_fixed::<u8>()? {
            0 => Ok(false),
            1 => Ok(true),
            value => Err(Defect::InvalidBool { offset, value }),
        }
    }

    /// Reads an i32 length or record count.
    pub fn read_count(&mut self) -> Result<usize, Defect> {
        let offset = self.cursor;
        let value = self.read_fixed::<i32>()?;
        usize::try_from(value).map_err(|_| Defect::NegativeLength { offset, value })
    }

    pub fn read_text(&mut self, encoding: TextEncoding) -> Result<String, Defect> {
        let len = self.read_count()?;
        let offset = self.cursor;
        let bytes = self.take(len)?;
        encoding
            .decode(bytes)
            .ok_or(Defect::InvalidText { offset })
    }

    /// Sign-extends a 1, 2 or 4 byte index.
    pub fn read_signed_index(&mut self, width: IndexWidth) -> Result<i32, Defect> {
        Ok(match width {
            IndexWidth::One => i32::from(self.read_fixed::<i8>()?),
            IndexWidth::Two => i32::from(self.read_fixed::<i16>()?),
            IndexWidth::Four => self.read_fixed::<i32>()?,
        })
    }

    /// Vertex indices are unsigned at widths 1 and 2 and a non-negative i32 at width 4.
    pub fn read_unsigned_index(&mut self, width: IndexWidth) -> Result<u32, Defect> {
        match width {
            IndexWidth::One => Ok(u32::from(self.read_fixed::<u8>()?)),
            IndexWidth::Two => Ok(u32::from(self.read_fixed::<u16>()?)),
            IndexWidth::Four => {
                let offset = self.cursor;
                let value = self.read_fixed::<i32>()?;
                u32::try_from(value).map_err(|_| Defect::NegativeIndex { offset, value })
            }
        }
    }

    /// A signed reference where -1 means "none".
    pub fn read_ref(&mut self, width: IndexWidth) -> Result<Option<usize>, Defect> {
        let offset = self.cursor;
        match self.read_signed_index(width)? {
            -1 => Ok(None),
            value if value < -1 => Err(Defect::NegativeIndex { offset, value }),
            value => Ok(Some(value as usize)),
        }
    }

    pub fn read_vertex_ref(&mut self, width: IndexWidth) -> Result<usize, Defect> {
        Ok(self.read_unsigned_index(width)? as usize)
    }

    pub fn skip(&mut self, len: usize) -> Result<(), Defect> {
        self.take(len).map(|_| ())
    }

    pub fn skip_text(&mut self) -> Result<(), Defect> {
        let len = self.read_count()?;
        self.skip(len)
    }

    pub fn skip_index(&mut self, width: IndexWidth) -> Result<(), Defect> {
        self.skip(width.bytes())
    }
}

#[derive(Clone, Debug, Default)]
pub struct BinaryOutput {
    bytes: Vec<u8>,
}

impl BinaryOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn write_fixed<T: Fixed>(&mut self, value: T) {
        value.encode(&mut self.bytes);
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.bytes.push(u8::from(value));
    }

    pub fn write_count(&mut self, count: usize) -> Result<(), Defect> {
        let value = i32::try_from(count).map_err(|_| Defect::IndexOverflow {
            value: count as i64,
            width: 4,
        })?;
        self.write_fixed(value);
        Ok(())
    }

    pub fn write_text(&mut self, text: &str, encoding: TextEncoding) -> Result<(), Defect> {
        match encoding {
            TextEncoding::Utf8 => {
                self.write_count(text.len())?;
                self.bytes.extend_from_slice(text.as_bytes());
            }
            TextEncoding::Utf16Le => {
                self.write_count(encoding.encoded_len(text))?;
                for unit in text.encode_utf16() {
                    self.write_fixed(unit);
                }
            }
        }
        Ok(())
    }

    pub fn write_signed_index(&mut self, value: i32, width: IndexWidth) -> Result<(), Defect> {
        let overflow = || Defect::IndexOverflow {
            value: i64::from(value),
            width: width.bytes() as u8,
        };
        match width {
            IndexWidth::One => self.write_fixed(i8::try_from(value).map_err(|_| overflow())?),
            IndexWidth::Two => self.write_fixed(i16::try_from(value).map_err(|_| overflow())?),
            IndexWidth::Four => self.write_fixed(value),
        }
        Ok(())
    }

    pub fn write_unsigned_index(&mut self, value: u32, width: IndexWidth) -> Result<(), Defect> {
        let overflow = || Defect::IndexOverflow {
            value: i64::from(value),
            width: width.bytes() as u8,
        };
        match width {
            IndexWidth::One => self.write_fixed(u8::try_from(value).map_err(|_| overflow())?),
            IndexWidth::Two => self.write_fixed(u16::try_from(value).map_err(|_| overflow())?),
            IndexWidth::Four => self.write_fixed(i32::try_from(value).map_err(|_| overflow())?),
        }
        Ok(())
    }

    pub fn write_ref(&mut self, value: Option<usize>, width: IndexWidth) -> Result<(), Defect> {
        let raw = match value {
            None => -1,
            Some(index) => i32::try_from(index).map_err(|_| Defect::IndexOverflow {
                value: index as i64,
                width: width.bytes() as u8,
            })?,
        };
        self.write_signed_index(raw, width)
    }

    pub fn write_vertex_ref(&mut self, value: usize, width: IndexWidth) -> Result<(), Defect> {
        let raw = u32::try_from(value).map_err(|_| Defect::IndexOverflow {
            value: value as i64,
            width: width.bytes() as u8,
        })?;
        self.write_unsigned_index(raw, width)
    }
}

/// Encoded size of a length-prefixed text.
pub fn text_size(text: &str, encoding: TextEncoding) -> usize {
    4 + encoding.encoded_len(text)
}
