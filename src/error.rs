use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($offset:expr, $msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            offset: $offset as usize,
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($offset:expr, $fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            offset: $offset as usize,
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! out_of_bounds_error {
    ($offset:expr, $length:expr) => {
        crate::Error::OutOfBounds {
            offset: $offset as usize,
            length: $length as usize,
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// # Error Categories
///
/// ## Image Format Errors
/// - [`Error::Malformed`] - The image violates the NativeFormat encoding contract
/// - [`Error::OutOfBounds`] - A read would have exceeded the image buffer
///
/// Both are permanent conditions of the image: nothing in this crate retries a read. Callers
/// that don't care about the distinction can use [`Error::is_malformed`].
///
/// ## Image Loading Errors
/// - [`Error::Empty`] - Empty input provided
/// - [`Error::FileError`] - Filesystem I/O errors
/// - [`Error::Error`] - Memory mapping failures and other wrapped errors
///
/// # Examples
///
/// ```rust
/// use nativeformat::{Error, NativeHashtable, NativeParser, NativeReader};
///
/// // Header byte 0x03 selects an entry index size of 3, which is reserved
/// let data = [0x03, 0x00, 0x00];
/// let reader = NativeReader::new(&data);
///
/// match NativeHashtable::new(reader, NativeParser::new(reader, 0), 3) {
///     Err(Error::Malformed { message, offset, .. }) => {
///         println!("bad table at {offset:#x}: {message}");
///     }
///     Err(e) => println!("other error: {e}"),
///     Ok(_) => unreachable!(),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The image is damaged and could not be decoded.
    ///
    /// Raised for any violation of the encoding contract: a reserved hash table header value,
    /// a misaligned cuckoo filter, a truncated or over-wide compressed integer, or a relative
    /// offset that resolves outside of the 32-bit image address space.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `offset` - Image offset at which the violation was detected
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed image at offset {offset:#x} - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The image offset of the offending structure
        offset: usize,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while reading the image.
    ///
    /// Fixed-width reads report this variant with the exact offset and length that was
    /// requested, which is more precise than a generic [`Error::Malformed`].
    #[error("Out of Bound read would have occurred! offset {offset:#x}, length {length} - {file}:{line}")]
    OutOfBounds {
        /// The offset the read started at
        offset: usize,
        /// The number of bytes the read required
        length: usize,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// File I/O error.
    ///
    /// Wraps standard I/O errors that can occur while opening an image on disk.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Generic error for miscellaneous failures.
    ///
    /// Used for wrapping external failures, such as a failed memory mapping.
    #[error("{0}")]
    Error(String),
}

impl Error {
    /// Returns `true` if this error describes a broken image.
    ///
    /// [`Error::OutOfBounds`] is a special case of a malformed image and is included.
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        matches!(self, Error::Malformed { .. } | Error::OutOfBounds { .. })
    }

    /// Returns the image offset associated with a format error, if any.
    #[must_use]
    pub fn offset(&self) -> Option<usize> {
        match self {
            Error::Malformed { offset, .. } | Error::OutOfBounds { offset, .. } => Some(*offset),
            _ => None,
        }
    }
}
