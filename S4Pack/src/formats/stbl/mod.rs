//! STBL string table format
//!
//! Binary key → UTF-8 string tables stored in packages under [`TYPE_STBL`].
//! Can be converted to/from XML format (see [`xml`]).
//!
//! [`TYPE_STBL`]: crate::resource::TYPE_STBL

mod reader;
mod writer;
pub mod xml;

use indexmap::IndexMap;

use crate::resource::{Locale, LocaleTable, ResourceId};

pub use reader::{parse_stbl_bytes, read_stbl};
pub use writer::write_stbl;

/// "STBL" magic bytes
pub const STBL_MAGIC: [u8; 4] = *b"STBL";

/// The only supported table version
pub const STBL_VERSION: u16 = 5;

/// Flatten line breaks so a value is stored on a single line: carriage
/// returns are dropped and newlines become the two characters `\n`.
#[must_use]
pub fn normalize_text(text: &str) -> String {
    text.replace('\r', "").replace('\n', "\\n")
}

/// A string table: numeric keys to text, in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringTable {
    /// Resource this table was read from or will be written to
    pub id: Option<ResourceId>,
    pub entries: IndexMap<u32, String>,
}

impl StringTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_id(id: ResourceId) -> Self {
        Self {
            id: Some(id),
            entries: IndexMap::new(),
        }
    }

    /// Store `value` under `key` after [`normalize_text`]. A later add with
    /// the same key replaces the text but keeps the key's position.
    pub fn add(&mut self, key: u32, value: &str) {
        self.entries.insert(key, normalize_text(value));
    }

    #[must_use]
    pub fn get(&self, key: u32) -> Option<&str> {
        self.entries.get(&key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.entries.iter().map(|(key, value)| (*key, value.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Locale of the table's resource id, if it has one and it is known
    #[must_use]
    pub fn language<'t>(&self, locales: &'t LocaleTable) -> Option<&'t Locale> {
        self.id.and_then(|id| id.language(locales))
    }
}
