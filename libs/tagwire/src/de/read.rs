use super::Error;
use crate::varint::{self, Varint};

/// A read position within a byte slice.
///
/// The cursor never reads past the end of its slice. Nested messages are read
/// through a child cursor that only sees the nested region, but still counts
/// offsets from the start of the whole payload.
#[derive(Debug, Clone)]
pub struct Cursor<'de> {
    buf: &'de [u8],
    pos: usize,
    base: usize,
}

impl<'de> Cursor<'de> {
    /// Creates a cursor at the start of `buf`.
    pub fn new(buf: &'de [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            base: 0,
        }
    }

    /// The position of the next byte to read, from the start of the payload
    /// the outermost cursor was created for.
    pub fn offset(&self) -> usize {
        self.base + self.pos
    }

    /// The amount of bytes left.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Whether every byte was read.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    /// Gets the unread part of the slice.
    pub fn remainder(&self) -> &'de [u8] {
        &self.buf[self.pos..]
    }

    /// Reads a varint without advancing.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the varint is unterminated or overflows `T`.
    pub fn peek_varint<T: Varint>(&self) -> Result<T, Error> {
        self.varint_at().map(|(value, _)| value)
    }

    /// Reads a varint.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the varint is unterminated or overflows `T`.
    pub fn read_varint<T: Varint>(&mut self) -> Result<T, Error> {
        let (value, len) = self.varint_at()?;
        self.pos += len;
        Ok(value)
    }

    fn varint_at<T: Varint>(&self) -> Result<(T, usize), Error> {
        let bytes = varint::scan(self.buf, self.pos);
        if !varint::is_terminated(bytes) {
            return Err(Error::UnexpectedEof);
        }

        Ok((varint::decode(bytes)?, bytes.len()))
    }

    /// Reads a constant size chunk of bytes.
    ///
    /// # Errors
    ///
    /// Returns `Err` if fewer than `N` bytes are left.
    pub fn read_bytes<const N: usize>(&mut self) -> Result<[u8; N], Error> {
        let (out, _) = self
            .remainder()
            .split_first_chunk::<N>()
            .ok_or(Error::UnexpectedEof)?;
        self.pos += N;
        Ok(*out)
    }

    /// Reads a chunk of bytes.
    ///
    /// # Errors
    ///
    /// Returns `Err` if fewer than `len` bytes are left.
    pub fn read_slice(&mut self, len: usize) -> Result<&'de [u8], Error> {
        let (out, _) = self
            .remainder()
            .split_at_checked(len)
            .ok_or(Error::UnexpectedEof)?;
        self.pos += len;
        Ok(out)
    }

    /// Splits off the next `len` bytes as their own cursor.
    ///
    /// The child's offsets continue from this cursor's.
    ///
    /// # Errors
    ///
    /// Returns `Err` if fewer than `len` bytes are left.
    pub fn split(&mut self, len: usize) -> Result<Self, Error> {
        let base = self.offset();
        let buf = self.read_slice(len)?;
        Ok(Self { buf, pos: 0, base })
    }

    /// Advances past `len` bytes.
    ///
    /// # Errors
    ///
    /// Returns `Err` if fewer than `len` bytes are left.
    pub fn skip(&mut self, len: usize) -> Result<(), Error> {
        self.read_slice(len).map(|_| ())
    }
}
