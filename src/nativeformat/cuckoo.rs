//! Read-only NativeFormat cuckoo filters.
//!
//! A cuckoo filter answers "is this key possibly present?" before an expensive lookup. The
//! image stores only the filter's buckets: a 16-byte aligned region of consecutive 16-byte
//! buckets, each holding eight little-endian `u16` fingerprints. Which buckets a key maps to
//! and how its fingerprint is derived is defined by the producer of the filter, so this module
//! exposes storage access; picking the candidate buckets is left to the caller.

use std::fmt;

use crate::{nativeformat::NativeReader, Result};

/// Fingerprint slots per bucket.
pub const BUCKET_ENTRIES: usize = 8;
/// Size of one bucket in bytes; filter bounds must be aligned to it.
pub const BUCKET_SIZE: u32 = 16;

/// Eight fingerprints sharing one bucket.
pub type CuckooBucket = [u16; BUCKET_ENTRIES];

/// A cuckoo filter stored in a NativeFormat image.
///
/// # Examples
///
/// ```rust
/// use nativeformat::{NativeCuckooFilter, NativeReader};
///
/// let mut data = vec![0_u8; 48];
/// data[16..18].copy_from_slice(&0xBEEF_u16.to_le_bytes());
/// let reader = NativeReader::new(&data);
///
/// let filter = NativeCuckooFilter::new(reader, 16, 48)?;
/// assert_eq!(filter.bucket_count(), 2);
/// assert!(filter.bucket_contains(0, 0xBEEF)?);
///
/// let buckets = filter.buckets().collect::<Result<Vec<_>, _>>()?;
/// assert_eq!(buckets[0][0], 0xBEEF);
/// # Ok::<(), nativeformat::Error>(())
/// ```
#[derive(Clone, Copy, Debug)]
pub struct NativeCuckooFilter<'a> {
    reader: NativeReader<'a>,
    start_offset: u32,
    end_offset: u32,
}

impl<'a> NativeCuckooFilter<'a> {
    /// Wraps the filter stored in `[start_offset, end_offset)`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if either bound isn't 16-byte aligned or the range
    /// is inverted.
    pub fn new(reader: NativeReader<'a>, start_offset: u32, end_offset: u32) -> Result<Self> {
        if start_offset % BUCKET_SIZE != 0 || end_offset % BUCKET_SIZE != 0 {
            return Err(malformed_error!(
                start_offset,
                "Cuckoo filter bounds {:#x}..{:#x} are not 16-byte aligned",
                start_offset,
                end_offset
            ));
        }

        if start_offset > end_offset {
            return Err(malformed_error!(
                start_offset,
                "Cuckoo filter ends before it starts ({:#x}..{:#x})",
                start_offset,
                end_offset
            ));
        }

        tracing::debug!(start_offset, end_offset, "opened native cuckoo filter");

        Ok(NativeCuckooFilter {
            reader,
            start_offset,
            end_offset,
        })
    }

    /// Start of the filter region.
    #[must_use]
    pub fn start_offset(&self) -> u32 {
        self.start_offset
    }

    /// End of the filter region.
    #[must_use]
    pub fn end_offset(&self) -> u32 {
        self.end_offset
    }

    /// Number of buckets in the filter.
    #[must_use]
    pub fn bucket_count(&self) -> u32 {
        (self.end_offset - self.start_offset) / BUCKET_SIZE
    }

    /// Reads bucket `index`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if `index` is out of range and
    /// [`crate::Error::OutOfBounds`] if the bucket extends past the image.
    pub fn bucket(&self, index: u32) -> Result<CuckooBucket> {
        if index >= self.bucket_count() {
            return Err(malformed_error!(
                self.start_offset,
                "Cuckoo bucket {} out of range, filter has {} buckets",
                index,
                self.bucket_count()
            ));
        }

        self.read_bucket(self.start_offset + index * BUCKET_SIZE)
    }

    /// Returns `true` if bucket `index` holds `fingerprint`.
    ///
    /// # Errors
    /// See [`NativeCuckooFilter::bucket`].
    pub fn bucket_contains(&self, index: u32, fingerprint: u16) -> Result<bool> {
        Ok(self.bucket(index)?.contains(&fingerprint))
    }

    /// Returns an iterator over all buckets in storage order.
    ///
    /// Buckets are read lazily; every call starts from the first bucket again.
    #[must_use]
    pub fn buckets(&self) -> Buckets<'a> {
        Buckets {
            filter: *self,
            offset: self.start_offset,
            failed: false,
        }
    }

    fn read_bucket(&self, offset: u32) -> Result<CuckooBucket> {
        let mut bucket = [0_u16; BUCKET_ENTRIES];
        let mut offset = offset;
        for slot in &mut bucket {
            let (fingerprint, next) = self.reader.read_u16(offset)?;
            *slot = fingerprint;
            offset = next;
        }

        Ok(bucket)
    }
}

impl fmt::Display for NativeCuckooFilter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "NativeCuckooFilter Size: {}", self.bucket_count())?;

        for (index, bucket) in self.buckets().enumerate() {
            let bucket = match bucket {
                Ok(bucket) => bucket,
                Err(error) => return writeln!(f, "Bucket: {index} <malformed: {error}>"),
            };

            write!(f, "Bucket: {index} [")?;
            for fingerprint in bucket {
                write!(f, "{fingerprint:4X} ")?;
            }
            writeln!(f, "]")?;
        }

        Ok(())
    }
}

/// Lazy iterator over the buckets of a [`NativeCuckooFilter`].
///
/// Yields `Err` at most once, then stops.
#[derive(Clone, Debug)]
pub struct Buckets<'a> {
    filter: NativeCuckooFilter<'a>,
    offset: u32,
    failed: bool,
}

impl Iterator for Buckets<'_> {
    type Item = Result<CuckooBucket>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.filter.end_offset {
            return None;
        }

        let bucket = self.filter.read_bucket(self.offset);
        self.failed = bucket.is_err();
        self.offset += BUCKET_SIZE;
        Some(bucket)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.failed {
            return (0, Some(0));
        }

        let remaining = ((self.filter.end_offset - self.offset) / BUCKET_SIZE) as usize;
        (0, Some(remaining))
    }
}

impl std::iter::FusedIterator for Buckets<'_> {}
