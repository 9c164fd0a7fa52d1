//! Low-level, bounds-checked little-endian reads over image buffers.
//!
//! Everything stored in a NativeFormat image uses little-endian byte order, so this module
//! only carries the little-endian half of a byte-order toolkit. It is the foundational layer
//! for [`crate::NativeReader`] and the [`crate::nativeformat::codec`] functions.
//!
//! # Key Components
//!
//! - [`crate::file::io::ImageIO`] - Trait describing primitive types decodable from raw bytes
//! - [`crate::file::io::read_le`] - Read a value from the start of a buffer
//! - [`crate::file::io::read_le_at`] - Read a value at an offset and advance the offset
//!
//! # Examples
//!
//! ```rust
//! use nativeformat::file::io::read_le_at;
//!
//! let data = [0x01, 0x00, 0x02, 0x00, 0x03, 0x00, 0x00, 0x00];
//! let mut offset = 0;
//!
//! let first: u16 = read_le_at(&data, &mut offset)?;  // offset: 0 -> 2
//! let second: u16 = read_le_at(&data, &mut offset)?; // offset: 2 -> 4
//! let third: u32 = read_le_at(&data, &mut offset)?;  // offset: 4 -> 8
//!
//! assert_eq!((first, second, third), (1, 2, 3));
//! assert_eq!(offset, 8);
//! # Ok::<(), nativeformat::Error>(())
//! ```
//!
//! # Error Handling
//!
//! Reads return [`crate::Error::OutOfBounds`] carrying the requested offset and length if the
//! buffer is too short. The offset is left untouched on failure.

use crate::Result;

/// Primitive types that can be decoded from a fixed number of little-endian bytes.
///
/// Implemented for all integer types from 8 to 64 bits. The associated `Bytes` type is the
/// fixed-size array the value is decoded from (e.g. `[u8; 4]` for `u32`).
pub trait ImageIO: Sized {
    /// Byte array representation of the type.
    type Bytes: Sized + for<'a> TryFrom<&'a [u8]>;

    /// Decode `Self` from little-endian bytes
    fn from_le_bytes(bytes: Self::Bytes) -> Self;
}

macro_rules! impl_image_io {
    ($($ty:ty),*) => {
        $(
            impl ImageIO for $ty {
                type Bytes = [u8; std::mem::size_of::<$ty>()];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_le_bytes(bytes)
                }
            }
        )*
    };
}

impl_image_io!(u8, i8, u16, i16, u32, i32, u64, i64);

/// Reads a value of type `T` in little-endian byte order from the start of `data`.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if `data` is shorter than `T`.
pub fn read_le<T: ImageIO>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_le_at(data, &mut offset)
}

/// Reads a value of type `T` in little-endian byte order at `offset`, advancing `offset`
/// past it.
///
/// # Arguments
///
/// * `data` - The byte buffer to read from
/// * `offset` - Mutable reference to the position, advanced by `size_of::<T>()` on success
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes. `offset` is not
/// modified in that case.
pub fn read_le_at<T: ImageIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    let Some(end) = offset.checked_add(type_len) else {
        return Err(out_of_bounds_error!(*offset, type_len));
    };

    if end > data.len() {
        return Err(out_of_bounds_error!(*offset, type_len));
    }

    let Ok(read) = data[*offset..end].try_into() else {
        return Err(out_of_bounds_error!(*offset, type_len));
    };

    *offset = end;

    Ok(T::from_le_bytes(read))
}
