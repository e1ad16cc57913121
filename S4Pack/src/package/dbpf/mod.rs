//! DBPF 2.1 package format reader/writer
//!
//! A package is a 96-byte header, a content region of (usually compressed)
//! resource payloads, and an index that maps resource ids to locators in the
//! content region.

mod reader;
mod types;
mod writer;

pub use reader::{DbpfReader, IndexEntries};
pub use types::*;
pub use writer::DbpfWriter;

/// DBPF magic bytes
pub const MAGIC: [u8; 4] = *b"DBPF";

/// The only supported file version (major, minor)
pub const VERSION: (u32, u32) = (2, 1);

/// Size of the fixed header; content starts right after it
pub const HEADER_SIZE: u64 = 96;

/// Bit of the stored entry length that announces explicit codec fields
pub const EXTENDED_COMPRESSION_BIT: u32 = 0x8000_0000;
