use crate::{nativeformat::NativeReader, Result};

/// A decode cursor positioned inside an image.
///
/// `NativeParser` pairs a [`NativeReader`] with a current offset and reads structured values
/// from it, advancing past each one. It is a small `Copy` value: copying a parser yields an
/// independent cursor, so handing one to a helper never moves the caller's position.
///
/// Parsers produced by [`NativeParser::get_parser_from_relative_offset`] additionally carry
/// the fast-reject byte stored in front of the link (see [`NativeParser::low_hashcode`]).
///
/// # Examples
///
/// ```rust
/// use nativeformat::{NativeParser, NativeReader};
///
/// // [hash byte 0x5A] [relative offset +3] [padding] [payload: unsigned 7]
/// let data = [0x5A, 0x06, 0x00, 0x00, 0x0E];
/// let reader = NativeReader::new(&data);
///
/// let mut parser = NativeParser::new(reader, 0);
/// let mut entry = parser.get_parser_from_relative_offset()?;
///
/// assert_eq!(entry.low_hashcode(), 0x5A);
/// assert_eq!(entry.offset(), 4);
/// assert_eq!(entry.get_unsigned()?, 7);
/// assert_eq!(parser.offset(), 2);
/// # Ok::<(), nativeformat::Error>(())
/// ```
#[derive(Clone, Copy, Debug)]
pub struct NativeParser<'a> {
    reader: NativeReader<'a>,
    offset: u32,
    low_hashcode: u8,
}

impl<'a> NativeParser<'a> {
    /// Creates a parser positioned at `offset`.
    #[must_use]
    pub fn new(reader: NativeReader<'a>, offset: u32) -> Self {
        NativeParser::with_low_hashcode(reader, offset, 0)
    }

    /// Creates a parser positioned at `offset` that carries a fast-reject hash byte.
    #[must_use]
    pub fn with_low_hashcode(reader: NativeReader<'a>, offset: u32, low_hashcode: u8) -> Self {
        NativeParser {
            reader,
            offset,
            low_hashcode,
        }
    }

    /// Current image offset.
    #[must_use]
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// The fast-reject byte this parser was created with.
    ///
    /// For hash table entries this is the low 8 bits of the entry's hash code. Two entries
    /// with the same byte may still have different keys.
    #[must_use]
    pub fn low_hashcode(&self) -> u8 {
        self.low_hashcode
    }

    /// The reader this parser decodes from.
    #[must_use]
    pub fn reader(&self) -> NativeReader<'a> {
        self.reader
    }

    /// Moves the parser to `offset`. No bounds check happens until the next read.
    pub fn seek(&mut self, offset: u32) {
        self.offset = offset;
    }

    /// Reads one byte.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] at the end of the image.
    pub fn get_byte(&mut self) -> Result<u8> {
        let (value, next) = self.reader.read_byte(self.offset)?;
        self.offset = next;
        Ok(value)
    }

    /// Reads an ECMA-335 compressed unsigned integer.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for a truncated or invalid value.
    pub fn get_compressed_data(&mut self) -> Result<u32> {
        let (value, next) = self.reader.read_compressed_data(self.offset)?;
        self.offset = next;
        Ok(value)
    }

    /// Reads a NativeFormat compressed unsigned integer.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for a truncated or invalid value.
    pub fn get_unsigned(&mut self) -> Result<u32> {
        let (value, next) = self.reader.decode_unsigned(self.offset)?;
        self.offset = next;
        Ok(value)
    }

    /// Reads a NativeFormat compressed signed integer.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for a truncated or invalid value.
    pub fn get_signed(&mut self) -> Result<i32> {
        let (value, next) = self.reader.decode_signed(self.offset)?;
        self.offset = next;
        Ok(value)
    }

    /// Reads a NativeFormat compressed unsigned 64-bit integer.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for a truncated or invalid value.
    pub fn get_unsigned64(&mut self) -> Result<u64> {
        let (value, next) = self.reader.decode_unsigned64(self.offset)?;
        self.offset = next;
        Ok(value)
    }

    /// Reads a NativeFormat compressed signed 64-bit integer.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for a truncated or invalid value.
    pub fn get_signed64(&mut self) -> Result<i64> {
        let (value, next) = self.reader.decode_signed64(self.offset)?;
        self.offset = next;
        Ok(value)
    }

    /// Skips one compressed integer of any width.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for a truncated or invalid value.
    pub fn skip_integer(&mut self) -> Result<()> {
        self.offset = self.reader.skip_integer(self.offset)?;
        Ok(())
    }

    /// Reads a relative offset field and resolves it.
    ///
    /// The field is a signed compressed delta measured from the field's own position. Returns
    /// that position plus the delta; the parser itself ends up just past the field. Negative
    /// deltas (backward links) are legal.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for an invalid delta or a target outside of the
    /// 32-bit image address space.
    pub fn get_relative_offset(&mut self) -> Result<u32> {
        let position = self.offset;
        let delta = self.get_signed()?;

        resolve_relative(position, delta)
    }

    /// Follows a hash table link: reads the fast-reject byte and a relative offset, and
    /// returns a parser at the link target that carries the byte.
    ///
    /// # Errors
    /// Returns an error if either field can't be read, see [`NativeParser::get_byte`] and
    /// [`NativeParser::get_relative_offset`].
    pub fn get_parser_from_relative_offset(&mut self) -> Result<NativeParser<'a>> {
        let low_hashcode = self.get_byte()?;
        let target = self.get_relative_offset()?;

        Ok(NativeParser::with_low_hashcode(
            self.reader,
            target,
            low_hashcode,
        ))
    }
}

/// Applies a link delta to the position of its field.
fn resolve_relative(position: u32, delta: i32) -> Result<u32> {
    position.checked_add_signed(delta).ok_or_else(|| {
        malformed_error!(
            position,
            "Relative offset {} from {:#x} leaves the image address space",
            delta,
            position
        )
    })
}
