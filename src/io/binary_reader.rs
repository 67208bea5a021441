//! Position-tracking reader over an immutable byte buffer

use crate::error::{Error, Result};

/// Byte order used for multi-byte reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    /// Least significant byte first
    Little,
    /// Most significant byte first
    Big,
}

/// Random-access reader with typed reads at a fixed endianness
///
/// Every read checks the remaining length first; running out of data is
/// reported as [`Error::TruncatedInput`] and leaves the cursor untouched.
#[derive(Debug, Clone)]
pub struct BinaryReader<'a> {
    data: &'a [u8],
    position: usize,
    endianness: Endianness,
}

macro_rules! read_number {
    ($(#[$doc:meta])* $name:ident, $ty:ty) => {
        $(#[$doc])*
        pub fn $name(&mut self) -> Result<$ty> {
            const SIZE: usize = std::mem::size_of::<$ty>();
            let bytes: [u8; SIZE] = self.take_array()?;
            Ok(match self.endianness {
                Endianness::Little => <$ty>::from_le_bytes(bytes),
                Endianness::Big => <$ty>::from_be_bytes(bytes),
            })
        }
    };
}

impl<'a> BinaryReader<'a> {
    /// Create a reader positioned at the start of `data`
    pub fn new(data: &'a [u8], endianness: Endianness) -> Self {
        Self {
            data,
            position: 0,
            endianness,
        }
    }

    /// Create a little-endian reader
    pub fn little_endian(data: &'a [u8]) -> Self {
        Self::new(data, Endianness::Little)
    }

    /// Current cursor position
    pub fn position(&self) -> usize {
        self.position
    }

    /// Move the cursor to an absolute position
    ///
    /// Positioning exactly at the end is allowed; beyond it is an error.
    pub fn set_position(&mut self, position: usize) -> Result<()> {
        if position > self.data.len() {
            return Err(Error::truncated(
                position.saturating_sub(self.position),
                self.position,
                self.data.len(),
            ));
        }
        self.position = position;
        Ok(())
    }

    /// Total buffer length
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes left after the cursor
    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    /// Returns true when the cursor has reached the end of the buffer
    pub fn at_end(&self) -> bool {
        self.position >= self.data.len()
    }

    /// Advance the cursor by `count` bytes
    pub fn skip(&mut self, count: usize) -> Result<()> {
        self.check(count)?;
        self.position += count;
        Ok(())
    }

    /// Borrow the next `count` bytes and advance
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        self.check(count)?;
        let slice = &self.data[self.position..self.position + count];
        self.position += count;
        Ok(slice)
    }

    /// Copy the next `count` bytes into a new buffer and advance
    pub fn read_slice(&mut self, count: usize) -> Result<Vec<u8>> {
        self.read_bytes(count).map(<[u8]>::to_vec)
    }

    /// Read one byte as a boolean (non-zero is true)
    pub fn read_bool8(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    read_number!(
        /// Read a signed 8-bit integer
        read_i8, i8
    );
    read_number!(
        /// Read an unsigned 8-bit integer
        read_u8, u8
    );
    read_number!(
        /// Read a signed 16-bit integer
        read_i16, i16
    );
    read_number!(
        /// Read an unsigned 16-bit integer
        read_u16, u16
    );
    read_number!(
        /// Read a signed 32-bit integer
        read_i32, i32
    );
    read_number!(
        /// Read an unsigned 32-bit integer
        read_u32, u32
    );
    read_number!(
        /// Read a 32-bit float
        read_f32, f32
    );
    read_number!(
        /// Read a 64-bit float
        read_f64, f64
    );

    /// Read three consecutive 32-bit floats as `f64` values
    pub fn read_f32_triple(&mut self) -> Result<[f64; 3]> {
        Ok([
            self.read_f32()? as f64,
            self.read_f32()? as f64,
            self.read_f32()? as f64,
        ])
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let bytes = self.read_bytes(N)?;
        let mut array = [0u8; N];
        array.copy_from_slice(bytes);
        Ok(array)
    }

    fn check(&self, count: usize) -> Result<()> {
        if count > self.remaining() {
            return Err(Error::truncated(count, self.position, self.data.len()));
        }
        Ok(())
    }
}
