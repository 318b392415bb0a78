//! Primitive encoders and decoders for the Kafka wire format.
//!
//! All integers are big-endian. Strings carry an int16 length prefix, byte
//! fields an int32 prefix; in both cases -1 encodes null. Arrays carry an
//! int32 element count.

use crate::error::{DecodeError, EncodeError};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Cursor over a received frame.
pub struct Decoder<'a> {
    buf: &'a [u8],
}

impl<'a> Decoder<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    fn ensure(&self, n: usize) -> Result<(), DecodeError> {
        if self.buf.len() < n {
            Err(DecodeError::Truncated)
        } else {
            Ok(())
        }
    }

    pub fn i8(&mut self) -> Result<i8, DecodeError> {
        self.ensure(1)?;
        Ok(self.buf.get_i8())
    }

    pub fn i16(&mut self) -> Result<i16, DecodeError> {
        self.ensure(2)?;
        Ok(self.buf.get_i16())
    }

    pub fn i32(&mut self) -> Result<i32, DecodeError> {
        self.ensure(4)?;
        Ok(self.buf.get_i32())
    }

    pub fn u32(&mut self) -> Result<u32, DecodeError> {
        self.ensure(4)?;
        Ok(self.buf.get_u32())
    }

    pub fn i64(&mut self) -> Result<i64, DecodeError> {
        self.ensure(8)?;
        Ok(self.buf.get_i64())
    }

    /// Take `n` raw bytes.
    pub fn raw(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        self.ensure(n)?;
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    pub fn nullable_string(&mut self) -> Result<Option<String>, DecodeError> {
        let len = self.i16()?;
        if len == -1 {
            return Ok(None);
        }
        if len < -1 {
            return Err(DecodeError::InvalidLength(len as i32));
        }
        let raw = self.raw(len as usize)?;
        let s = std::str::from_utf8(raw).map_err(|_| DecodeError::InvalidString)?;
        Ok(Some(s.to_string()))
    }

    pub fn string(&mut self) -> Result<String, DecodeError> {
        self.nullable_string()?.ok_or(DecodeError::NullString)
    }

    pub fn bytes(&mut self) -> Result<Option<Bytes>, DecodeError> {
        let len = self.i32()?;
        if len == -1 {
            return Ok(None);
        }
        if len < -1 {
            return Err(DecodeError::InvalidLength(len));
        }
        let raw = self.raw(len as usize)?;
        Ok(Some(Bytes::copy_from_slice(raw)))
    }

    /// Decode an int32-counted array, one element per call to `f`.
    pub fn array<T, F>(&mut self, mut f: F) -> Result<Vec<T>, DecodeError>
    where
        F: FnMut(&mut Self) -> Result<T, DecodeError>,
    {
        let count = self.i32()?;
        if count < 0 {
            return Err(DecodeError::InvalidLength(count));
        }
        // A hostile count must not drive the allocation.
        let mut items = Vec::with_capacity((count as usize).min(self.remaining()));
        for _ in 0..count {
            items.push(f(self)?);
        }
        Ok(items)
    }

    /// Check that the whole buffer was consumed.
    pub fn finish(self) -> Result<(), DecodeError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(DecodeError::TrailingBytes(n)),
        }
    }
}

/// Builder for a size-prefixed frame.
///
/// The first four bytes are reserved for the int32 size, which `finish`
/// fills in.
pub struct Encoder {
    buf: BytesMut,
}

impl Encoder {
    pub fn new() -> Self {
        let mut buf = BytesMut::with_capacity(64);
        buf.put_i32(0);
        Self { buf }
    }

    /// Encoder without the size prefix, for nested length-delimited blocks.
    pub fn unframed() -> Self {
        Self {
            buf: BytesMut::new(),
        }
    }

    pub fn i8(&mut self, v: i8) {
        self.buf.put_i8(v);
    }

    pub fn i16(&mut self, v: i16) {
        self.buf.put_i16(v);
    }

    pub fn i32(&mut self, v: i32) {
        self.buf.put_i32(v);
    }

    pub fn u32(&mut self, v: u32) {
        self.buf.put_u32(v);
    }

    pub fn i64(&mut self, v: i64) {
        self.buf.put_i64(v);
    }

    pub fn string(&mut self, v: &str) -> Result<(), EncodeError> {
        let len = i16::try_from(v.len()).map_err(|_| EncodeError::StringTooLong(v.len()))?;
        self.buf.put_i16(len);
        self.buf.put_slice(v.as_bytes());
        Ok(())
    }

    pub fn bytes(&mut self, v: Option<&[u8]>) -> Result<(), EncodeError> {
        match v {
            Some(b) => {
                let len = i32::try_from(b.len()).map_err(|_| EncodeError::BytesTooLong(b.len()))?;
                self.buf.put_i32(len);
                self.buf.put_slice(b);
            }
            None => self.buf.put_i32(-1),
        }
        Ok(())
    }

    /// Encode an int32-counted array, one element per call to `f`.
    pub fn array<T, F>(&mut self, items: &[T], mut f: F) -> Result<(), EncodeError>
    where
        F: FnMut(&mut Self, &T) -> Result<(), EncodeError>,
    {
        let count = i32::try_from(items.len()).map_err(|_| EncodeError::ArrayTooLong(items.len()))?;
        self.buf.put_i32(count);
        for item in items {
            f(self, item)?;
        }
        Ok(())
    }

    /// Bytes written so far, without touching the size prefix.
    pub fn into_inner(self) -> BytesMut {
        self.buf
    }

    /// Patch the size prefix and return the complete frame.
    pub fn finish(mut self) -> Result<Bytes, EncodeError> {
        let body = self.buf.len() - 4;
        let size = i32::try_from(body).map_err(|_| EncodeError::BytesTooLong(body))?;
        self.buf[..4].copy_from_slice(&size.to_be_bytes());
        Ok(self.buf.freeze())
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}
