//! Image sources and low-level byte access.
//!
//! The NativeFormat readers in [`crate::nativeformat`] operate on a plain `&[u8]`; they don't
//! care where the bytes come from. This module is the place that actually obtains them, either
//! by memory-mapping a file from disk or by taking ownership of an in-memory buffer, and keeps
//! them alive for as long as readers borrow from them.
//!
//! # Key Components
//!
//! - [`crate::file::Image`] - Owned image buffer with a pluggable [`crate::file::Backend`]
//! - [`crate::file::io`] - Bounds-checked little-endian primitive reads
//!
//! # Examples
//!
//! ```rust
//! use nativeformat::{file::Image, NativeParser};
//!
//! let image = Image::from_mem(vec![0x04, 0x02, 0x00])?;
//! let reader = image.reader();
//!
//! let mut parser = NativeParser::new(reader, 0);
//! assert_eq!(parser.get_unsigned()?, 2);
//! # Ok::<(), nativeformat::Error>(())
//! ```
//!
//! # Thread Safety
//!
//! [`Backend`] requires `Send + Sync` and all access is read-only, so an [`Image`] can be shared
//! across threads and every thread can borrow its own readers from it.

pub mod io;

mod memory;
mod physical;

use std::path::Path;

use crate::{nativeformat::NativeReader, Error, Error::Empty, Result};
use memory::Owned;
use physical::Physical;

/// Backend trait for image data sources.
///
/// Abstracts over where the image bytes live, so an in-memory buffer and a memory-mapped file
/// can be used interchangeably.
pub trait Backend: Send + Sync {
    /// Returns a slice of the data at the given offset and length.
    ///
    /// # Arguments
    ///
    /// * `offset` - The starting offset within the data.
    /// * `len` - The length of the slice in bytes.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the requested range is out of bounds.
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]>;

    /// Returns the entire data buffer.
    fn data(&self) -> &[u8];

    /// Returns the total length of the data buffer.
    fn len(&self) -> usize;
}

/// An immutable image buffer containing NativeFormat encoded structures.
///
/// `Image` owns its bytes; [`NativeReader`]s borrowed from it through [`Image::reader`] are
/// cheap `Copy` views that can't outlive it.
pub struct Image {
    backend: Box<dyn Backend>,
}

impl Image {
    /// Memory-maps the image at `path`.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file can't be opened,
    /// [`crate::Error::Error`] if mapping fails or the file exceeds 32-bit offsets, and
    /// [`crate::Error::Empty`] for an empty file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Image> {
        let path = path.as_ref();
        let backend = Physical::new(path)?;
        tracing::debug!(path = %path.display(), len = backend.len(), "mapped image");

        Image::load(backend)
    }

    /// Creates an image that takes ownership of `data`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Empty`] if `data` is empty and [`crate::Error::Error`] if it
    /// exceeds 32-bit offsets.
    pub fn from_mem(data: Vec<u8>) -> Result<Image> {
        tracing::debug!(len = data.len(), "loading image from memory");

        Image::load(Owned::new(data))
    }

    fn load<T: Backend + 'static>(backend: T) -> Result<Image> {
        if backend.len() == 0 {
            return Err(Empty);
        }

        // All offsets inside an image are 32 bit
        if u32::try_from(backend.len()).is_err() {
            return Err(Error::Error(format!(
                "Image of {} bytes exceeds the 32-bit address space",
                backend.len()
            )));
        }

        Ok(Image {
            backend: Box::new(backend),
        })
    }

    /// Returns a reader over the whole image.
    #[must_use]
    pub fn reader(&self) -> NativeReader<'_> {
        NativeReader::new(self.backend.data())
    }

    /// Returns the raw image bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.backend.data()
    }

    /// Returns a bounds-checked slice of the image.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the range exceeds the image.
    pub fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        self.backend.data_slice(offset, len)
    }

    /// Returns the image size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.backend.len()
    }

    /// Returns `true` if the image holds no data. Never the case for a successfully loaded image.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.backend.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_mem_reader() {
        let image = Image::from_mem(vec![0x08, 0x01, 0x02]).unwrap();
        assert_eq!(image.len(), 3);
        assert!(!image.is_empty());
        assert_eq!(image.data_slice(1, 2).unwrap(), &[0x01, 0x02]);

        let reader = image.reader();
        assert_eq!(reader.len(), 3);
        assert_eq!(reader.decode_unsigned(0).unwrap(), (4, 1));
    }

    /// Reports a length past the 32-bit range without backing it with memory.
    #[cfg(target_pointer_width = "64")]
    struct Oversized;

    #[cfg(target_pointer_width = "64")]
    impl Backend for Oversized {
        fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
            Err(out_of_bounds_error!(offset, len))
        }

        fn data(&self) -> &[u8] {
            &[]
        }

        fn len(&self) -> usize {
            u32::MAX as usize + 1
        }
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn load_rejects_oversized() {
        match Image::load(Oversized) {
            Err(Error::Error(message)) => assert!(message.contains("32-bit address space")),
            Err(other) => panic!("unexpected error {other:?}"),
            Ok(_) => panic!("oversized image was accepted"),
        }
    }

    #[test]
    fn from_mem_empty() {
        assert!(matches!(Image::from_mem(Vec::new()), Err(Error::Empty)));
    }

    #[test]
    fn from_file() {
        let temp_path = std::env::temp_dir().join("nativeformat_image_test.bin");
        std::fs::write(&temp_path, [0x04, 0x00, 0x01, 0x03]).unwrap();

        let image = Image::from_file(&temp_path).unwrap();
        assert_eq!(image.data(), &[0x04, 0x00, 0x01, 0x03]);
        assert_eq!(image.reader().read_byte(3).unwrap(), (0x03, 4));

        drop(image);
        std::fs::remove_file(&temp_path).unwrap();
    }

    #[test]
    fn from_file_missing() {
        assert!(matches!(
            Image::from_file("/nonexistent/image.r2r"),
            Err(Error::FileError(_))
        ));
    }
}
