//! Compressed integer decoding for NativeFormat images.
//!
//! NativeFormat stores most integers in a variable-length, little-endian encoding. The low
//! bits of the first byte form a unary *width tag*: the number of consecutive `1` bits
//! starting at bit 0 tells how many additional bytes follow, and the remaining bits of the
//! first byte hold the least significant part of the value.
//!
//! | First byte  | Size    | Value bits | Payload                                   |
//! |-------------|---------|------------|-------------------------------------------|
//! | `xxxxxxx0`  | 1 byte  | 7          | `b0 >> 1`                                 |
//! | `xxxxxx01`  | 2 bytes | 14         | `b0 >> 2 \| b1 << 6`                      |
//! | `xxxxx011`  | 3 bytes | 21         | `b0 >> 3 \| b1 << 5 \| b2 << 13`          |
//! | `xxxx0111`  | 4 bytes | 28         | `b0 >> 4 \| b1 << 4 \| b2 << 12 \| b3 << 20` |
//! | `xxx01111`  | 5 bytes | 32         | little-endian 32-bit value in `b1..b5`    |
//! | `xx011111`  | 9 bytes | 64         | little-endian 64-bit value in `b1..b9`    |
//!
//! Signed values use the same layout, with the most significant payload byte sign-extended.
//! The 9-byte form is only valid for the 64-bit decoders.
//!
//! Independent of that, [`read_compressed_data`] decodes the ECMA-335 II.23.2 compressed
//! unsigned integer, which is big-endian and tagged in the high bits.
//!
//! All functions follow the [`crate::file::io::read_le_at`] convention: they read at `*offset`
//! and advance it on success. On failure `offset` is left untouched. Running past the end of
//! the buffer in the middle of an integer is reported as [`crate::Error::Malformed`].
//!
//! # Examples
//!
//! ```rust
//! use nativeformat::nativeformat::codec::{decode_signed, decode_unsigned};
//!
//! // 300 needs the 2-byte form: (300 << 2) | 0b01 = 0x04B1
//! let data = [0xB1, 0x04, 0xFE];
//! let mut offset = 0;
//!
//! assert_eq!(decode_unsigned(&data, &mut offset)?, 300);
//! assert_eq!(offset, 2);
//!
//! // 0xFE is the 1-byte form of -1, 0x7E would be 63
//! assert_eq!(decode_signed(&data, &mut offset)?, -1);
//! assert_eq!(offset, 3);
//! # Ok::<(), nativeformat::Error>(())
//! ```

use crate::{file::io::read_le, Result};

/// Width tag of the 9-byte, 64-bit form.
const TAG_MASK_64: u8 = 0x3F;
const TAG_64: u8 = 0x1F;

/// Returns the encoded size of the integer starting with `first`, or `None` for a reserved tag.
#[must_use]
pub fn encoded_size(first: u8) -> Option<usize> {
    match first.trailing_ones() {
        0 => Some(1),
        1 => Some(2),
        2 => Some(3),
        3 => Some(4),
        4 => Some(5),
        5 => Some(9),
        _ => None,
    }
}

/// Returns the `size` bytes of an encoded integer starting at `offset`.
fn encoded_bytes(data: &[u8], offset: usize, size: usize) -> Result<&[u8]> {
    offset
        .checked_add(size)
        .and_then(|end| data.get(offset..end))
        .ok_or_else(|| {
            malformed_error!(
                offset,
                "Truncated compressed integer - needs {} bytes, {} available",
                size,
                data.len().saturating_sub(offset)
            )
        })
}

fn first_byte(data: &[u8], offset: usize) -> Result<u8> {
    data.get(offset)
        .copied()
        .ok_or_else(|| malformed_error!(offset, "Compressed integer starts past the end of the image"))
}

/// Reads a single byte at `offset`.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if `offset` is at or beyond the end of `data`.
pub fn read_byte(data: &[u8], offset: &mut usize) -> Result<u8> {
    crate::file::io::read_le_at::<u8>(data, offset)
}

/// Decodes a NativeFormat unsigned 32-bit integer.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if the integer is truncated or uses the 64-bit form.
pub fn decode_unsigned(data: &[u8], offset: &mut usize) -> Result<u32> {
    let first = first_byte(data, *offset)?;
    let Some(size) = encoded_size(first).filter(|size| *size <= 5) else {
        return Err(malformed_error!(
            *offset,
            "Invalid compressed unsigned integer tag - {:#04x}",
            first
        ));
    };

    let b = encoded_bytes(data, *offset, size)?;
    let value = match size {
        1 => u32::from(b[0]) >> 1,
        2 => (u32::from(b[0]) >> 2) | (u32::from(b[1]) << 6),
        3 => (u32::from(b[0]) >> 3) | (u32::from(b[1]) << 5) | (u32::from(b[2]) << 13),
        4 => {
            (u32::from(b[0]) >> 4)
                | (u32::from(b[1]) << 4)
                | (u32::from(b[2]) << 12)
                | (u32::from(b[3]) << 20)
        }
        _ => read_le::<u32>(&b[1..])?,
    };

    *offset += size;
    Ok(value)
}

/// Decodes a NativeFormat signed 32-bit integer.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if the integer is truncated or uses the 64-bit form.
#[allow(clippy::cast_possible_wrap)]
pub fn decode_signed(data: &[u8], offset: &mut usize) -> Result<i32> {
    let first = first_byte(data, *offset)?;
    let Some(size) = encoded_size(first).filter(|size| *size <= 5) else {
        return Err(malformed_error!(
            *offset,
            "Invalid compressed signed integer tag - {:#04x}",
            first
        ));
    };

    let b = encoded_bytes(data, *offset, size)?;
    let low = |shift: u32| (u32::from(b[0]) >> shift) as i32;
    let sext = |byte: u8| i32::from(byte as i8);

    let value = match size {
        1 => sext(b[0]) >> 1,
        2 => low(2) | (sext(b[1]) << 6),
        3 => low(3) | (i32::from(b[1]) << 5) | (sext(b[2]) << 13),
        4 => low(4) | (i32::from(b[1]) << 4) | (i32::from(b[2]) << 12) | (sext(b[3]) << 20),
        _ => read_le::<i32>(&b[1..])?,
    };

    *offset += size;
    Ok(value)
}

/// Decodes a NativeFormat unsigned 64-bit integer.
///
/// Values that fit into 32 bits use the regular forms, larger ones the 9-byte form.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if the integer is truncated or the tag is reserved.
pub fn decode_unsigned64(data: &[u8], offset: &mut usize) -> Result<u64> {
    let first = first_byte(data, *offset)?;
    if first & TAG_MASK_64 != TAG_64 {
        return decode_unsigned(data, offset).map(u64::from);
    }

    let b = encoded_bytes(data, *offset, 9)?;
    let value = read_le::<u64>(&b[1..])?;

    *offset += 9;
    Ok(value)
}

/// Decodes a NativeFormat signed 64-bit integer.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if the integer is truncated or the tag is reserved.
pub fn decode_signed64(data: &[u8], offset: &mut usize) -> Result<i64> {
    let first = first_byte(data, *offset)?;
    if first & TAG_MASK_64 != TAG_64 {
        return decode_signed(data, offset).map(i64::from);
    }

    let b = encoded_bytes(data, *offset, 9)?;
    let value = read_le::<i64>(&b[1..])?;

    *offset += 9;
    Ok(value)
}

/// Advances `offset` past one encoded integer of any width without decoding it.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if the tag is reserved or the integer is truncated.
pub fn skip_integer(data: &[u8], offset: &mut usize) -> Result<()> {
    let first = first_byte(data, *offset)?;
    let Some(size) = encoded_size(first) else {
        return Err(malformed_error!(
            *offset,
            "Invalid compressed integer tag - {:#04x}",
            first
        ));
    };

    encoded_bytes(data, *offset, size)?;
    *offset += size;
    Ok(())
}

/// Reads a compressed unsigned integer as defined in ECMA-335 II.23.2.
///
/// - Values 0-127: 1 byte (`0xxxxxxx`)
/// - Values 128-16383: 2 bytes (`10xxxxxx xxxxxxxx`)
/// - Values 16384-536870911: 4 bytes (`110xxxxx xxxxxxxx xxxxxxxx xxxxxxxx`)
///
/// # Errors
/// Returns [`crate::Error::Malformed`] for a reserved first byte or a truncated value.
pub fn read_compressed_data(data: &[u8], offset: &mut usize) -> Result<u32> {
    let first = first_byte(data, *offset)?;

    let (size, value) = if (first & 0x80) == 0 {
        (1, u32::from(first))
    } else if (first & 0xC0) == 0x80 {
        let b = encoded_bytes(data, *offset, 2)?;
        (2, ((u32::from(b[0]) & 0x3F) << 8) | u32::from(b[1]))
    } else if (first & 0xE0) == 0xC0 {
        let b = encoded_bytes(data, *offset, 4)?;
        (
            4,
            ((u32::from(b[0]) & 0x1F) << 24)
                | (u32::from(b[1]) << 16)
                | (u32::from(b[2]) << 8)
                | u32::from(b[3]),
        )
    } else {
        return Err(malformed_error!(
            *offset,
            "Invalid compressed data - {:#04x}",
            first
        ));
    };

    *offset += size;
    Ok(value)
}
