// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
//#![deny(unsafe_code)]
// - 'file/physical.rs' uses mmap to map a file into memory

//! # nativeformat
//!
//! A zero-copy reader for the NativeFormat encoding that .NET ReadyToRun and NativeAOT images
//! use to persist their lookup tables. Built in pure Rust, `nativeformat` decodes compressed
//! integers, follows relative-offset links and queries bucketed hash tables and cuckoo filters
//! directly from an immutable image buffer, without building an in-memory object graph.
//!
//! ## Features
//!
//! - **📦 Efficient memory access** - Memory-mapped images, every reader is a borrowed `Copy` view
//! - **🔍 Hash table queries** - Bucket lookups with fast-reject bytes and full enumeration
//! - **🧮 Cuckoo filter storage** - Lazy, restartable access to fingerprint buckets
//! - **🛡️ Memory safe** - Every read is bounds checked; malformed images produce errors, never panics
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nativeformat::prelude::*;
//!
//! let image = Image::from_file("app.r2r.dll")?;
//! let reader = image.reader();
//!
//! // Offsets of the table come from the enclosing image format, e.g. a ReadyToRun section
//! let (table_offset, table_end) = (0x1000, 0x1400);
//! let table = NativeHashtable::new(reader, NativeParser::new(reader, table_offset), table_end)?;
//!
//! for entry in table.entries() {
//!     let mut entry = entry?;
//!     println!("{:#x} hash byte {:#04x}", entry.offset(), entry.low_hashcode());
//!     let _payload = entry.get_unsigned()?;
//! }
//! # Ok::<(), nativeformat::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`file`] - Obtains image bytes (memory-mapped file or owned buffer) and primitive reads
//! - [`nativeformat`] - The NativeFormat readers built on top of a byte slice
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T>`]. A damaged image surfaces as
//! [`Error::Malformed`] or [`Error::OutOfBounds`] at the read that detected it; nothing is
//! retried and nothing is silently truncated.

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types.
///
/// ```rust
/// use nativeformat::prelude::*;
///
/// let data = [0x04];
/// let mut parser = NativeParser::new(NativeReader::new(&data), 0);
/// assert_eq!(parser.get_unsigned()?, 2);
/// # Ok::<(), nativeformat::Error>(())
/// ```
pub mod prelude;

/// Image sources and bounds-checked primitive reads.
pub mod file;

/// NativeFormat decoding: compressed integers, parsers, hash tables and cuckoo filters.
pub mod nativeformat;

/// `nativeformat` Result type
///
/// A type alias for `std::result::Result<T, Error>` where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `nativeformat` Error type
///
/// See [`Error`] for the full list of variants.
pub use error::Error;

pub use file::Image;
pub use nativeformat::{
    EntryIndexSize, NativeCuckooFilter, NativeHashtable, NativeParser, NativeReader,
};
