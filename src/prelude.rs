//! # nativeformat Prelude
//!
//! The most commonly used types of the crate, for glob imports.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all nativeformat operations
pub use crate::Error;

/// The result type used throughout nativeformat
pub use crate::Result;

// ================================================================================================
// Image Access
// ================================================================================================

/// Owned image buffer, memory-mapped or in memory
pub use crate::file::Image;

/// Read-only view over image bytes
pub use crate::nativeformat::NativeReader;

/// Decode cursor
pub use crate::nativeformat::NativeParser;

// ================================================================================================
// Lookup Structures
// ================================================================================================

/// Hash table and its iterators
pub use crate::nativeformat::{AllEntries, EntryIndexSize, Lookup, NativeHashtable};

/// Cuckoo filter storage
pub use crate::nativeformat::{CuckooBucket, NativeCuckooFilter};
