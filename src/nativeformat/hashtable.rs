//! Read-only NativeFormat hash tables.
//!
//! A hash table is stored inline in the image and queried in place:
//!
//! ```text
//! +--------+---------------------------------+-----------------------------------+
//! | header | bucket directory                | entries                           |
//! | 1 byte | (2^shift + 1) x 1/2/4-byte offs | [hash byte][relative offset] ...  |
//! +--------+---------------------------------+-----------------------------------+
//!          ^ base_offset
//! ```
//!
//! - The header byte holds the bucket count as a power of two in bits 7..2 and the width of
//!   the directory entries in bits 1..0.
//! - The directory holds one start offset per bucket plus a trailing end offset, all relative
//!   to `base_offset`. Bucket `i` owns the entry bytes `[dir[i], dir[i + 1])`.
//! - Each entry is the low byte of its key's hash code followed by a signed relative offset to
//!   the entry payload.
//!
//! Lookups pick the bucket from hash code bits 8 and up, and hand back every entry of that
//! bucket. Comparing the stored hash byte against the low 8 bits of the hash code rejects most
//! non-matching entries cheaply; the remaining candidates must be confirmed by comparing full
//! keys decoded from the payload.

use std::{collections::BTreeMap, fmt, fmt::Write};

use strum::{EnumCount, EnumIter, IntoEnumIterator};

use crate::{
    nativeformat::{NativeParser, NativeReader},
    Result,
};

/// Bit position of the bucket count exponent inside the header byte.
const HEADER_BUCKETS_SHIFT: u8 = 2;
/// Mask selecting the directory entry width code from the header byte.
const HEADER_ENTRY_INDEX_SIZE_MASK: u8 = 0b11;
/// Largest legal bucket count exponent.
const MAX_BUCKETS_SHIFT: u8 = 31;
/// Hash code bits below this position are reserved for the fast-reject byte.
const LOW_HASHCODE_BITS: u32 = 8;

/// Width of the offsets stored in a hash table's bucket directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, EnumCount)]
pub enum EntryIndexSize {
    /// 1-byte offsets (header code 0)
    U8,
    /// 2-byte little-endian offsets (header code 1)
    U16,
    /// 4-byte little-endian offsets (header code 2)
    U32,
}

impl EntryIndexSize {
    /// Maps a header code to an entry size; code 3 is reserved and yields `None`.
    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        EntryIndexSize::iter().nth(usize::from(code))
    }

    /// The header code of this entry size.
    #[must_use]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Size of one directory entry in bytes.
    #[must_use]
    pub fn bytes(self) -> u32 {
        match self {
            EntryIndexSize::U8 => 1,
            EntryIndexSize::U16 => 2,
            EntryIndexSize::U32 => 4,
        }
    }

    fn read(self, reader: NativeReader<'_>, offset: u32) -> Result<(u32, u32)> {
        match self {
            EntryIndexSize::U8 => reader.read_byte(offset).map(|(v, n)| (u32::from(v), n)),
            EntryIndexSize::U16 => reader.read_u16(offset).map(|(v, n)| (u32::from(v), n)),
            EntryIndexSize::U32 => reader.read_u32(offset),
        }
    }
}

/// A hash table stored in a NativeFormat image.
///
/// The table is an immutable view: construction decodes the one-byte header, everything else
/// is read on demand. It is `Copy`, and any number of lookups or enumerations can run against
/// it at the same time.
///
/// # Examples
///
/// ```rust
/// use nativeformat::{NativeHashtable, NativeParser, NativeReader};
///
/// // One bucket, 1-byte directory [0x02, 0x04], one entry (hash byte 0x2A, link -5)
/// // pointing back at a payload at offset 0 holding the unsigned value 9.
/// let data = [0x12, 0x00, 0x02, 0x04, 0x2A, 0xF6];
/// let reader = NativeReader::new(&data);
///
/// let table = NativeHashtable::new(reader, NativeParser::new(reader, 1), data.len() as u32)?;
/// assert_eq!(table.bucket_count(), 1);
///
/// for entry in table.lookup(0x0000_012A)?.matching() {
///     let mut entry = entry?;
///     assert_eq!(entry.get_unsigned()?, 9);
/// }
/// # Ok::<(), nativeformat::Error>(())
/// ```
#[derive(Clone, Copy, Debug)]
pub struct NativeHashtable<'a> {
    reader: NativeReader<'a>,
    base_offset: u32,
    bucket_mask: u32,
    entry_index_size: EntryIndexSize,
    end_offset: u32,
}

impl<'a> NativeHashtable<'a> {
    /// Opens the hash table whose header byte is at the current position of `parser`.
    ///
    /// `end_offset` is the end of the table's entry region. It isn't part of the encoding; the
    /// caller knows it from the enclosing structure (e.g. the size of the image section).
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the bucket count exponent exceeds 31 or the entry
    /// index size code is the reserved value 3, and [`crate::Error::OutOfBounds`] if the
    /// header can't be read.
    pub fn new(
        reader: NativeReader<'a>,
        mut parser: NativeParser<'a>,
        end_offset: u32,
    ) -> Result<Self> {
        let header_offset = parser.offset();
        let header = parser.get_byte()?;

        let buckets_shift = header >> HEADER_BUCKETS_SHIFT;
        if buckets_shift > MAX_BUCKETS_SHIFT {
            return Err(malformed_error!(
                header_offset,
                "Invalid hash table bucket count exponent - {}",
                buckets_shift
            ));
        }

        let code = header & HEADER_ENTRY_INDEX_SIZE_MASK;
        let Some(entry_index_size) = EntryIndexSize::from_code(code) else {
            return Err(malformed_error!(
                header_offset,
                "Invalid hash table entry index size - {}",
                code
            ));
        };

        let table = NativeHashtable {
            reader,
            base_offset: parser.offset(),
            bucket_mask: (1_u32 << buckets_shift) - 1,
            entry_index_size,
            end_offset,
        };

        tracing::debug!(
            base_offset = table.base_offset,
            end_offset,
            buckets = table.bucket_count(),
            entry_index_size = ?entry_index_size,
            "opened native hashtable"
        );

        Ok(table)
    }

    /// Offset of the bucket directory, just past the header byte.
    #[must_use]
    pub fn base_offset(&self) -> u32 {
        self.base_offset
    }

    /// End of the entry region as supplied at construction.
    #[must_use]
    pub fn end_offset(&self) -> u32 {
        self.end_offset
    }

    /// `bucket_count() - 1`; applied to the shifted hash code to select a bucket.
    #[must_use]
    pub fn bucket_mask(&self) -> u32 {
        self.bucket_mask
    }

    /// Number of buckets, at most 2^31.
    #[must_use]
    pub fn bucket_count(&self) -> u32 {
        self.bucket_mask + 1
    }

    /// Width of the bucket directory entries.
    #[must_use]
    pub fn entry_index_size(&self) -> EntryIndexSize {
        self.entry_index_size
    }

    /// Reads the directory entries of `bucket`: its start and end offset relative to
    /// [`NativeHashtable::base_offset`].
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if `bucket` is out of range and
    /// [`crate::Error::OutOfBounds`] if the directory is truncated.
    pub fn bucket_range(&self, bucket: u32) -> Result<(u32, u32)> {
        if bucket > self.bucket_mask {
            return Err(malformed_error!(
                self.base_offset,
                "Bucket {} out of range, table has {} buckets",
                bucket,
                self.bucket_count()
            ));
        }

        let offset = bucket
            .checked_mul(self.entry_index_size.bytes())
            .and_then(|rel| self.base_offset.checked_add(rel))
            .ok_or_else(|| {
                malformed_error!(self.base_offset, "Bucket directory exceeds the image")
            })?;

        let (start, next) = self.entry_index_size.read(self.reader, offset)?;
        let (end, _) = self.entry_index_size.read(self.reader, next)?;

        Ok((start, end))
    }

    /// Returns a parser at the first entry of `bucket` and the absolute end of its entries.
    ///
    /// # Errors
    /// See [`NativeHashtable::bucket_range`]; also fails if the resolved offsets overflow.
    pub fn parser_for_bucket(&self, bucket: u32) -> Result<(NativeParser<'a>, u32)> {
        let (start, end) = self.bucket_range(bucket)?;

        let absolute = |relative: u32| {
            self.base_offset.checked_add(relative).ok_or_else(|| {
                malformed_error!(
                    self.base_offset,
                    "Bucket {} offset {:#x} exceeds the image address space",
                    bucket,
                    relative
                )
            })
        };

        let start = absolute(start)?;
        let end = absolute(end)?;

        Ok((NativeParser::new(self.reader, start), end))
    }

    /// Returns all candidate entries for `hashcode`.
    ///
    /// Bits 8 and up of the hash code select the bucket; the returned [`Lookup`] yields every
    /// entry of that bucket in storage order. The caller compares each entry's
    /// [`NativeParser::low_hashcode`] against the low byte of the hash code (or uses
    /// [`Lookup::matching`]) and then confirms candidates by full key comparison.
    ///
    /// # Errors
    /// Returns an error if the bucket directory can't be read.
    pub fn lookup(&self, hashcode: i32) -> Result<Lookup<'a>> {
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        let (hashcode, low_hashcode) = (hashcode as u32, hashcode as u8);

        let bucket = (hashcode >> LOW_HASHCODE_BITS) & self.bucket_mask;
        let (parser, end_offset) = self.parser_for_bucket(bucket)?;

        tracing::trace!(bucket, low_hashcode, "native hashtable lookup");

        Ok(Lookup {
            parser,
            end_offset,
            low_hashcode,
            failed: false,
        })
    }

    /// Returns an iterator over all entries, bucket by bucket.
    ///
    /// Entries come in bucket order and, within a bucket, in storage order. Every call starts
    /// a fresh enumeration.
    #[must_use]
    pub fn entries(&self) -> AllEntries<'a> {
        AllEntries {
            table: *self,
            bucket: 0,
            current: None,
            done: false,
        }
    }

    /// Renders the table as a hex dump, one line per entry.
    ///
    /// Every entry offset and the table's `end_offset` are collected in offset order; each
    /// line shows an entry's hash byte followed by the bytes up to the next collected offset.
    ///
    /// # Errors
    /// Returns an error if the table can't be enumerated.
    pub fn dump(&self) -> Result<String> {
        let mut entries = BTreeMap::new();
        for entry in self.entries() {
            let entry = entry?;
            entries.insert(entry.offset(), entry.low_hashcode());
        }
        entries.insert(self.end_offset, 0);

        let mut out = String::new();
        let _ = writeln!(out, "NativeHashtable Size: {}", entries.len() - 1);
        let _ = writeln!(out, "EntryIndexSize: {}", self.entry_index_size.code());

        let data = self.reader.data();
        let mut current: Option<u32> = None;
        for (&next, &low_hashcode) in &entries {
            if let Some(current) = current {
                let bytes = data
                    .get(current as usize..next as usize)
                    .ok_or_else(|| out_of_bounds_error!(current, next - current))?;
                for byte in bytes {
                    let _ = write!(out, "{byte:02X} ");
                }
                out.push('\n');
            }
            if next != self.end_offset {
                let _ = write!(out, "0x{low_hashcode:02X} -> ");
            }
            current = Some(next);
        }

        Ok(out)
    }
}

impl fmt::Display for NativeHashtable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.dump() {
            Ok(dump) => f.write_str(&dump),
            Err(error) => write!(f, "NativeHashtable <malformed: {error}>"),
        }
    }
}

/// Iterator over the candidate entries of one bucket, see [`NativeHashtable::lookup`].
///
/// Yields `Err` at most once, then stops.
#[derive(Clone, Debug)]
pub struct Lookup<'a> {
    parser: NativeParser<'a>,
    end_offset: u32,
    low_hashcode: u8,
    failed: bool,
}

impl<'a> Lookup<'a> {
    /// The low byte of the looked up hash code.
    #[must_use]
    pub fn low_hashcode(&self) -> u8 {
        self.low_hashcode
    }

    /// Restricts the candidates to entries whose stored hash byte matches.
    ///
    /// Errors are passed through.
    pub fn matching(self) -> impl Iterator<Item = Result<NativeParser<'a>>> {
        let low_hashcode = self.low_hashcode;
        self.filter(move |entry| {
            entry
                .as_ref()
                .map_or(true, |entry| entry.low_hashcode() == low_hashcode)
        })
    }
}

impl<'a> Iterator for Lookup<'a> {
    type Item = Result<NativeParser<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.parser.offset() >= self.end_offset {
            return None;
        }

        let entry = self.parser.get_parser_from_relative_offset();
        self.failed = entry.is_err();
        Some(entry)
    }
}

impl std::iter::FusedIterator for Lookup<'_> {}

/// Iterator over every entry of a table, see [`NativeHashtable::entries`].
///
/// Yields `Err` at most once, then stops.
#[derive(Clone, Debug)]
pub struct AllEntries<'a> {
    table: NativeHashtable<'a>,
    bucket: u32,
    current: Option<(NativeParser<'a>, u32)>,
    done: bool,
}

impl<'a> Iterator for AllEntries<'a> {
    type Item = Result<NativeParser<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let (mut parser, end_offset) = match self.current {
                Some(current) => current,
                None => match self.table.parser_for_bucket(self.bucket) {
                    Ok(current) => current,
                    Err(error) => {
                        self.done = true;
                        return Some(Err(error));
                    }
                },
            };

            if parser.offset() < end_offset {
                let entry = parser.get_parser_from_relative_offset();
                self.current = Some((parser, end_offset));
                self.done = entry.is_err();
                return Some(entry);
            }

            if self.bucket >= self.table.bucket_mask {
                self.done = true;
            } else {
                self.bucket += 1;
                self.current = None;
            }
        }

        None
    }
}

impl std::iter::FusedIterator for AllEntries<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        test::{encode_unsigned, HashtableBuilder},
        Error,
    };

    fn open(data: &[u8], table_offset: u32, end_offset: u32) -> Result<NativeHashtable<'_>> {
        let reader = NativeReader::new(data);
        NativeHashtable::new(reader, NativeParser::new(reader, table_offset), end_offset)
    }

    /// Reads the single unsigned value each test payload consists of.
    fn payload(entry: Result<NativeParser<'_>>) -> u32 {
        entry.unwrap().get_unsigned().unwrap()
    }

    #[test]
    fn header_decomposition() {
        let data = [(5 << 2) | 1, 0, 0];
        let table = open(&data, 0, 3).unwrap();

        assert_eq!(table.base_offset(), 1);
        assert_eq!(table.end_offset(), 3);
        assert_eq!(table.bucket_mask(), 31);
        assert_eq!(table.bucket_count(), 32);
        assert_eq!(table.entry_index_size(), EntryIndexSize::U16);
    }

    #[test]
    fn header_reserved_entry_index_size() {
        let data = [0b0000_0111, 0, 0];
        let error = open(&data, 0, 3).unwrap_err();
        assert!(matches!(error, Error::Malformed { offset: 0, .. }));
    }

    #[test]
    fn header_bucket_shift_limits() {
        let data = [32 << 2];
        assert!(matches!(open(&data, 0, 1), Err(Error::Malformed { .. })));

        let data = [63 << 2];
        assert!(matches!(open(&data, 0, 1), Err(Error::Malformed { .. })));

        let data = [(31 << 2) | 2];
        let table = open(&data, 0, 1).unwrap();
        assert_eq!(table.bucket_mask(), 0x7FFF_FFFF);
        assert_eq!(table.bucket_count(), 0x8000_0000);
    }

    #[test]
    fn header_past_end() {
        assert!(open(&[], 0, 0).unwrap_err().is_malformed());
    }

    #[test]
    fn entry_index_size_codes() {
        for size in EntryIndexSize::iter() {
            assert_eq!(EntryIndexSize::from_code(size.code()), Some(size));
        }
        assert_eq!(EntryIndexSize::COUNT, 3);
        assert_eq!(EntryIndexSize::U8.code(), 0);
        assert_eq!(EntryIndexSize::U16.code(), 1);
        assert_eq!(EntryIndexSize::from_code(2), Some(EntryIndexSize::U32));
        assert_eq!(EntryIndexSize::from_code(3), None);
        assert_eq!(EntryIndexSize::from_code(u8::MAX), None);
    }

    #[test]
    fn bucket_range_all_widths() {
        for size in EntryIndexSize::iter() {
            let mut builder = HashtableBuilder::new(2, size.code());
            builder
                .add(0x0000_0010, encode_unsigned(1))
                .add(0x0000_0211, encode_unsigned(2))
                .add(0x0000_0212, encode_unsigned(3));
            let built = builder.build();
            let table = open(&built.data, built.table_offset, built.end_offset).unwrap();
            assert_eq!(table.entry_index_size(), size);

            let directory = 5 * size.bytes();
            let (start0, end0) = table.bucket_range(0).unwrap();
            assert_eq!(start0, directory);
            assert!(end0 > start0);

            let (start1, end1) = table.bucket_range(1).unwrap();
            assert_eq!((start1, end1), (end0, end0));

            let (start2, end2) = table.bucket_range(2).unwrap();
            assert_eq!(start2, end1);

            let (start3, end3) = table.bucket_range(3).unwrap();
            assert_eq!((start3, end3), (end2, end2));
            assert_eq!(table.base_offset() + end3, built.end_offset);

            assert!(table.bucket_range(4).is_err());
        }
    }

    #[test]
    fn truncated_directory() {
        // 4 buckets with 4-byte entries need 20 directory bytes
        let data = [(2 << 2) | 2, 0, 0, 0, 0, 0, 0, 0];
        let table = open(&data, 0, 8).unwrap();

        assert!(matches!(
            table.bucket_range(1),
            Err(Error::OutOfBounds { .. })
        ));
        assert!(table.lookup(0x100).is_err());
    }

    #[test]
    fn enumerate_all_bucket_order() {
        let mut builder = HashtableBuilder::new(1, 0);
        builder
            .add(0x0000_0101, encode_unsigned(10))
            .add(0x0000_0002, encode_unsigned(20))
            .add(0x0000_0103, encode_unsigned(30))
            .add(0x0000_0004, encode_unsigned(40));
        let built = builder.build();
        let table = open(&built.data, built.table_offset, built.end_offset).unwrap();

        let entries: Vec<_> = table.entries().map(|e| e.unwrap()).collect();
        let hashes: Vec<u8> = entries.iter().map(|e| e.low_hashcode()).collect();
        assert_eq!(hashes, vec![0x02, 0x04, 0x01, 0x03]);

        let values: Vec<u32> = table.entries().map(payload).collect();
        assert_eq!(values, vec![20, 40, 10, 30]);

        // Restartable
        assert_eq!(table.entries().count(), 4);
    }

    #[test]
    fn enumerate_skips_empty_buckets() {
        let mut builder = HashtableBuilder::new(3, 1);
        builder
            .add(0x0000_0700, encode_unsigned(7))
            .add(0x0000_0300, encode_unsigned(3));
        let built = builder.build();
        let table = open(&built.data, built.table_offset, built.end_offset).unwrap();

        let values: Vec<u32> = table.entries().map(payload).collect();
        assert_eq!(values, vec![3, 7]);
    }

    #[test]
    fn enumerate_empty_table() {
        let built = HashtableBuilder::new(2, 0).build();
        let table = open(&built.data, built.table_offset, built.end_offset).unwrap();
        assert_eq!(table.entries().count(), 0);
    }

    #[test]
    fn lookup_yields_whole_bucket() {
        let mut builder = HashtableBuilder::new(2, 0);
        builder
            .add(0x0000_0155, encode_unsigned(1))
            .add(0x0000_0166, encode_unsigned(2))
            .add(0x0000_0255, encode_unsigned(3))
            .add(0x0000_0555, encode_unsigned(4));
        let built = builder.build();
        let table = open(&built.data, built.table_offset, built.end_offset).unwrap();

        // Bucket 1 holds 0x155, 0x166 and 0x555 (0x5 & 3 == 1)
        let lookup = table.lookup(0x0000_0155).unwrap();
        assert_eq!(lookup.low_hashcode(), 0x55);
        let values: Vec<u32> = lookup.map(payload).collect();
        assert_eq!(values, vec![1, 2, 4]);

        let values: Vec<u32> = table
            .lookup(0x0000_0155)
            .unwrap()
            .matching()
            .map(payload)
            .collect();
        assert_eq!(values, vec![1, 4]);
    }

    #[test]
    fn lookup_ignores_low_byte_for_bucket_choice() {
        let mut builder = HashtableBuilder::new(2, 0);
        builder
            .add(0x0000_0301, encode_unsigned(1))
            .add(0x0000_03FE, encode_unsigned(2));
        let built = builder.build();
        let table = open(&built.data, built.table_offset, built.end_offset).unwrap();

        let offsets = |hashcode: i32| -> Vec<u32> {
            table
                .lookup(hashcode)
                .unwrap()
                .map(|e| e.unwrap().offset())
                .collect()
        };

        let first = offsets(0x0000_0300);
        let second = offsets(0x0000_03FF);
        assert_eq!(first, second);
        assert_eq!(first, built.payloads);
    }

    #[test]
    fn lookup_negative_hashcode() {
        let mut builder = HashtableBuilder::new(4, 2);
        builder.add(-2, encode_unsigned(99));
        let built = builder.build();
        let table = open(&built.data, built.table_offset, built.end_offset).unwrap();

        // -2 == 0xFFFF_FFFE selects bucket 0xF with hash byte 0xFE
        let mut lookup = table.lookup(-2).unwrap();
        assert_eq!(lookup.low_hashcode(), 0xFE);
        let entry = lookup.next().unwrap().unwrap();
        assert_eq!(entry.low_hashcode(), 0xFE);
        assert!(lookup.next().is_none());
    }

    #[test]
    fn lookup_empty_bucket_reads_nothing() {
        // Directory [3, 3, 3] with no entry bytes at all; the entry region would be past the
        // end of the buffer, so any read attempt would fail.
        let data = [(1 << 2), 0x03, 0x03, 0x03];
        let table = open(&data, 0, 4).unwrap();

        let mut lookup = table.lookup(0x100).unwrap();
        assert!(lookup.next().is_none());
        assert!(lookup.next().is_none());
        assert_eq!(table.entries().count(), 0);
    }

    #[test]
    fn lookup_corrupt_entry_fuses() {
        // Bucket 0 claims two bytes of entries holding a truncated relative offset
        let data = [0x00, 0x02, 0x04, 0x11, 0x0F];
        let table = open(&data, 0, 5).unwrap();

        let mut lookup = table.lookup(0).unwrap();
        assert!(lookup.next().unwrap().unwrap_err().is_malformed());
        assert!(lookup.next().is_none());

        let mut entries = table.entries();
        assert!(entries.next().unwrap().is_err());
        assert!(entries.next().is_none());
    }

    #[test]
    fn dump_format() {
        let mut builder = HashtableBuilder::new(0, 0);
        builder.add(0x0000_00AB, vec![0x04]);
        let built = builder.build();
        let table = open(&built.data, built.table_offset, built.end_offset).unwrap();

        // data: [04] [00] [02 04] [AB F6]  -> entry payload at 0, end at 6
        assert_eq!(built.data, vec![0x04, 0x00, 0x02, 0x04, 0xAB, 0xF6]);

        let dump = table.dump().unwrap();
        assert_eq!(
            dump,
            "NativeHashtable Size: 1\nEntryIndexSize: 0\n0xAB -> 04 00 02 04 AB F6 \n"
        );
        assert_eq!(table.to_string(), dump);
    }

    #[test]
    fn dump_malformed() {
        let data = [0x00, 0x02, 0x04, 0x11, 0x0F];
        let table = open(&data, 0, 5).unwrap();
        assert!(table.dump().is_err());
        assert!(table.to_string().starts_with("NativeHashtable <malformed"));
    }
}
