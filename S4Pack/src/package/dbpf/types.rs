//! Types for DBPF package handling

use serde::{Deserialize, Serialize};

use super::VERSION;
use crate::compression::{CODEC_DELETED, CODEC_NONE, CODEC_ZLIB, CompressionMethod};

/// Header of a DBPF package
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// File format version, always (2, 1) for supported packages
    pub file_version: (u32, u32),
    pub user_version: (u32, u32),
    /// Creation timestamp (zero in packages written by this crate)
    pub created: u32,
    /// Modification timestamp
    pub modified: u32,
    /// Number of entries in the index
    pub index_count: u32,
    /// Absolute offset of the index; zero means "no index"
    pub index_offset: u32,
    /// Size of the index in bytes
    pub index_size: u32,
}

impl Header {
    /// Header for a freshly written package
    #[must_use]
    pub fn new(index_count: u32, index_offset: u32, index_size: u32) -> Self {
        Self {
            file_version: VERSION,
            user_version: (0, 0),
            created: 0,
            modified: 0,
            index_count,
            index_offset,
            index_size,
        }
    }
}

/// Codec id and version pair stored with each compressed entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Compression {
    pub codec: u16,
    pub version: u16,
}

impl Compression {
    /// Implied pair for entries without explicit codec fields
    pub const NONE: Compression = Compression {
        codec: CODEC_NONE,
        version: 1,
    };

    /// What the writer uses for every entry
    pub const ZLIB: Compression = Compression {
        codec: CODEC_ZLIB,
        version: 1,
    };

    #[must_use]
    pub fn method(&self) -> CompressionMethod {
        CompressionMethod::from_codec(self.codec)
    }
}

/// Where a resource's payload lives inside its package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    /// Absolute offset of the stored bytes
    pub offset: u32,
    /// Number of stored (possibly compressed) bytes
    pub length: u32,
    pub compression: Compression,
}

impl Locator {
    /// Tombstoned entries are skipped when indexing
    #[must_use]
    pub fn deleted(&self) -> bool {
        self.compression.codec == CODEC_DELETED
    }
}

/// Flags word at the start of the index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndexFlags(pub u32);

impl IndexFlags {
    /// Every entry shares one type id
    pub const CONST_TYPE: u32 = 1;
    /// Every entry shares one group
    pub const CONST_GROUP: u32 = 2;
    /// Every entry shares the high 32 bits of its instance
    pub const CONST_INSTANCE_EX: u32 = 4;

    #[must_use]
    pub fn contains(self, bit: u32) -> bool {
        self.0 & bit != 0
    }

    #[must_use]
    pub fn bits(self) -> u32 {
        self.0
    }
}

/// Fields stored once after the flags word instead of per entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndexConstants {
    pub type_id: Option<u32>,
    pub group: Option<u32>,
    pub instance_high: Option<u32>,
}

impl IndexConstants {
    /// Flags word announcing exactly the fields that are present
    #[must_use]
    pub fn flags(&self) -> IndexFlags {
        let mut bits = 0;
        if self.type_id.is_some() {
            bits |= IndexFlags::CONST_TYPE;
        }
        if self.group.is_some() {
            bits |= IndexFlags::CONST_GROUP;
        }
        if self.instance_high.is_some() {
            bits |= IndexFlags::CONST_INSTANCE_EX;
        }
        IndexFlags(bits)
    }
}

/// How [`super::DbpfWriter::write_index`] lays out the index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexLayout {
    /// Flags word 0, every field written per entry
    #[default]
    Expanded,
    /// Fields shared by all entries are written once after the flags word
    Compacted,
}
