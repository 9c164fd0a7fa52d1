//! Readers for NativeFormat encoded structures.
//!
//! NativeFormat is the compact binary encoding ReadyToRun and NativeAOT images use to persist
//! lookup structures such as available types, method entry points or exported symbols. The
//! structures are designed to be queried in place, straight from a mapped image, without ever
//! being materialised as an object graph.
//!
//! # Architecture
//!
//! Components build on each other, leaf first:
//!
//! - [`codec`] - Compressed integer decoding
//! - [`NativeReader`] - Fixed-width and compressed reads at explicit image offsets
//! - [`NativeParser`] - A `Copy` cursor that decodes values and follows relative-offset links
//! - [`NativeHashtable`] - Bucketed hash table with per-entry fast-reject bytes
//! - [`NativeCuckooFilter`] - Fingerprint buckets backing an approximate membership test
//!
//! A typical query positions a parser at a well-known offset, opens a hash table there and
//! walks the candidates of a hash code. Each candidate is a parser positioned at the entry's
//! payload, from which the caller decodes its own key to confirm the match.
//!
//! # Examples
//!
//! ```rust
//! use nativeformat::{NativeHashtable, NativeParser, NativeReader};
//!
//! fn find(data: &[u8], table: u32, end: u32, hashcode: i32, key: u32) -> nativeformat::Result<bool> {
//!     let reader = NativeReader::new(data);
//!     let table = NativeHashtable::new(reader, NativeParser::new(reader, table), end)?;
//!
//!     for entry in table.lookup(hashcode)?.matching() {
//!         if entry?.get_unsigned()? == key {
//!             return Ok(true);
//!         }
//!     }
//!     Ok(false)
//! }
//! ```
//!
//! # Thread Safety
//!
//! Everything here is a borrowed, read-only view over an immutable buffer. All types are
//! `Send + Sync` and can be copied freely between threads.

pub mod codec;

mod cuckoo;
mod hashtable;
mod parser;
mod reader;

pub use cuckoo::{Buckets, CuckooBucket, NativeCuckooFilter, BUCKET_ENTRIES, BUCKET_SIZE};
pub use hashtable::{AllEntries, EntryIndexSize, Lookup, NativeHashtable};
pub use parser::NativeParser;
pub use reader::NativeReader;
