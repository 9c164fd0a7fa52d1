use crate::{
    file::io::{read_le_at, ImageIO},
    nativeformat::codec,
    Result,
};

/// Read-only access to an image buffer.
///
/// `NativeReader` is a thin, `Copy` view over an immutable byte slice. Every read takes an
/// explicit image offset and returns the decoded value together with the offset just past it,
/// so the reader itself never changes. Any number of [`crate::NativeParser`]s, hash tables and
/// filters can share one reader, on any number of threads.
///
/// # Examples
///
/// ```rust
/// use nativeformat::NativeReader;
///
/// let data = [0x34, 0x12, 0x0C];
/// let reader = NativeReader::new(&data);
///
/// let (value, next) = reader.read_u16(0)?;
/// assert_eq!((value, next), (0x1234, 2));
///
/// let (value, next) = reader.decode_unsigned(next)?;
/// assert_eq!((value, next), (6, 3));
/// # Ok::<(), nativeformat::Error>(())
/// ```
#[derive(Clone, Copy, Debug)]
pub struct NativeReader<'a> {
    data: &'a [u8],
}

impl<'a> NativeReader<'a> {
    /// Creates a reader over `data`.
    ///
    /// Offsets are 32 bit, so only the first `u32::MAX` bytes of `data` are addressable; a
    /// longer slice is cut to that length.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        NativeReader {
            data: &data[..addressable_len(data.len())],
        }
    }

    /// Returns the underlying image bytes.
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Returns the image size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the image is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the raw byte at `offset`, if there is one.
    #[must_use]
    pub fn byte_at(&self, offset: u32) -> Option<u8> {
        self.data.get(offset as usize).copied()
    }

    fn read<T: ImageIO>(&self, offset: u32) -> Result<(T, u32)> {
        let mut position = offset as usize;
        let value = read_le_at::<T>(self.data, &mut position)?;
        Ok((value, to_offset(position)))
    }

    fn decode<T>(
        &self,
        offset: u32,
        decoder: fn(&[u8], &mut usize) -> Result<T>,
    ) -> Result<(T, u32)> {
        let mut position = offset as usize;
        let value = decoder(self.data, &mut position)?;
        Ok((value, to_offset(position)))
    }

    /// Reads one byte.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `offset` is past the end of the image.
    pub fn read_byte(&self, offset: u32) -> Result<(u8, u32)> {
        self.read::<u8>(offset)
    }

    /// Reads a little-endian `u16`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the value extends past the end of the image.
    pub fn read_u16(&self, offset: u32) -> Result<(u16, u32)> {
        self.read::<u16>(offset)
    }

    /// Reads a little-endian `u32`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the value extends past the end of the image.
    pub fn read_u32(&self, offset: u32) -> Result<(u32, u32)> {
        self.read::<u32>(offset)
    }

    /// Reads a little-endian `u64`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the value extends past the end of the image.
    pub fn read_u64(&self, offset: u32) -> Result<(u64, u32)> {
        self.read::<u64>(offset)
    }

    /// Decodes a compressed unsigned integer, see [`codec::decode_unsigned`].
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for a truncated or invalid encoding.
    pub fn decode_unsigned(&self, offset: u32) -> Result<(u32, u32)> {
        self.decode(offset, codec::decode_unsigned)
    }

    /// Decodes a compressed signed integer, see [`codec::decode_signed`].
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for a truncated or invalid encoding.
    pub fn decode_signed(&self, offset: u32) -> Result<(i32, u32)> {
        self.decode(offset, codec::decode_signed)
    }

    /// Decodes a compressed unsigned 64-bit integer, see [`codec::decode_unsigned64`].
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for a truncated or invalid encoding.
    pub fn decode_unsigned64(&self, offset: u32) -> Result<(u64, u32)> {
        self.decode(offset, codec::decode_unsigned64)
    }

    /// Decodes a compressed signed 64-bit integer, see [`codec::decode_signed64`].
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for a truncated or invalid encoding.
    pub fn decode_signed64(&self, offset: u32) -> Result<(i64, u32)> {
        self.decode(offset, codec::decode_signed64)
    }

    /// Decodes an ECMA-335 compressed unsigned integer, see [`codec::read_compressed_data`].
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for a truncated or invalid encoding.
    pub fn read_compressed_data(&self, offset: u32) -> Result<(u32, u32)> {
        self.decode(offset, codec::read_compressed_data)
    }

    /// Returns the offset just past the compressed integer at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for a truncated or invalid encoding.
    pub fn skip_integer(&self, offset: u32) -> Result<u32> {
        let mut position = offset as usize;
        codec::skip_integer(self.data, &mut position)?;
        Ok(to_offset(position))
    }
}

fn addressable_len(len: usize) -> usize {
    len.min(u32::MAX as usize)
}

/// Positions handed out by the codec never exceed the buffer, which `NativeReader::new` limits
/// to 32-bit offsets.
#[allow(clippy::cast_possible_truncation)]
fn to_offset(position: usize) -> u32 {
    position as u32
}
