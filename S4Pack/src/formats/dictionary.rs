//! `.dct` translation dictionaries
//!
//! A dictionary remembers translated strings between sessions. The file is
//! `b"DCT"`, a version byte and a length-prefixed (and, past 50 bytes,
//! zlib-compressed) JSON array of records. Current records are
//! `[id, source, translation, comment]`.
//!
//! Older files are migrated on read:
//! - version 1: `[hex_id, source, translation]`
//! - version 2: `[id, source, translation, unused]`
//! - version 3: `[id, source, translation, unused, comment]`
//!
//! Files without the `DCT` header are raw zlib-compressed version 1 JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::compression::zlib_decompress;
use crate::cursor::ByteCursor;
use crate::error::{Error, Result};
use crate::formats::stbl::normalize_text;

/// Dictionary file magic
pub const DICTIONARY_MAGIC: [u8; 3] = *b"DCT";

/// Version written by [`write_dictionary`]
pub const DICTIONARY_VERSION: u8 = 4;

/// One remembered translation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryRecord {
    /// String key inside its string table
    pub id: u32,
    pub source: String,
    pub translation: String,
    pub comment: String,
}

impl DictionaryRecord {
    /// New record with `source` and `translation` normalized the same way
    /// string tables store them.
    #[must_use]
    pub fn new(id: u32, source: &str, translation: &str, comment: &str) -> Self {
        Self {
            id,
            source: normalize_text(source),
            translation: normalize_text(translation),
            comment: comment.to_string(),
        }
    }

    /// Records with no source text or an untouched translation carry no
    /// information.
    #[must_use]
    pub fn is_useful(&self) -> bool {
        !self.source.is_empty() && self.source != self.translation
    }
}

/// A named set of records, usually one per translated package
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dictionary {
    pub name: String,
    pub records: Vec<DictionaryRecord>,
}

impl Dictionary {
    /// Load a dictionary file; the name is the lower-cased file stem.
    /// Records without a source or with an untouched translation are dropped.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let mut records = read_dictionary(path)?;
        records.retain(DictionaryRecord::is_useful);
        Ok(Self { name, records })
    }

    /// Records remembered for string `id`
    pub fn by_id(&self, id: u32) -> impl Iterator<Item = &DictionaryRecord> {
        self.records.iter().filter(move |record| record.id == id)
    }

    /// Distinct translations remembered for `source`, first seen first
    #[must_use]
    pub fn translations_of(&self, source: &str) -> Vec<&str> {
        let source = normalize_text(source);
        let mut found: Vec<&str> = Vec::new();
        for record in self.records.iter().filter(|r| r.source == source) {
            if !found.contains(&record.translation.as_str()) {
                found.push(&record.translation);
            }
        }
        found
    }
}

/// Read a dictionary file from disk
///
/// # Errors
/// Returns an error if the file cannot be read or decoded.
pub fn read_dictionary<P: AsRef<Path>>(path: P) -> Result<Vec<DictionaryRecord>> {
    let data = std::fs::read(path)?;
    parse_dictionary_bytes(&data)
}

/// Parse dictionary data, migrating older versions to the current record
/// layout.
///
/// # Errors
/// Returns [`Error::FormatMismatch`] for a version newer than this crate
/// knows, [`Error::CorruptData`] for malformed records and the JSON or zlib
/// errors of the payload.
pub fn parse_dictionary_bytes(data: &[u8]) -> Result<Vec<DictionaryRecord>> {
    let (version, items): (u8, Vec<Vec<Value>>) = if data.starts_with(&DICTIONARY_MAGIC) {
        let mut cursor = ByteCursor::from_bytes(data);
        cursor.skip(DICTIONARY_MAGIC.len() as u64)?;
        let version = cursor.get_u8()?;
        if version == 0 || version > DICTIONARY_VERSION {
            return Err(Error::mismatch(
                "dictionary",
                format!("unsupported version {version} (supported: 1-{DICTIONARY_VERSION})"),
            ));
        }
        (version, cursor.get_json()?)
    } else {
        tracing::debug!("No DCT header, reading as legacy compressed JSON");
        let json = zlib_decompress(data, None)?;
        (1, serde_json::from_slice(&json)?)
    };

    let records = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| migrate(version, item).map_err(|message| {
            Error::corrupt(format!("dictionary record {index}: {message}"))
        }))
        .collect::<Result<Vec<_>>>()?;

    tracing::debug!(
        "Read {} dictionary records (version {version})",
        records.len()
    );
    Ok(records)
}

/// Bring one raw record up to `[id, source, translation, comment]`.
fn migrate(version: u8, mut item: Vec<Value>) -> std::result::Result<DictionaryRecord, String> {
    if version == 1 {
        let id = item
            .first()
            .and_then(Value::as_str)
            .ok_or("version 1 id is not a string")?;
        let id = u64::from_str_radix(id, 16).map_err(|e| format!("bad hex id '{id}': {e}"))?;
        item[0] = Value::from(id);
        item.push(Value::from(0));
    }
    if version < 3 {
        item.push(Value::from(""));
    }
    if version < 4 {
        if item.len() <= 3 {
            return Err(format!("expected at least 4 fields, found {}", item.len()));
        }
        item.remove(3);
    }

    let [id, source, translation, comment] = <[Value; 4]>::try_from(item)
        .map_err(|item| format!("expected 4 fields, found {}", item.len()))?;

    let id = id
        .as_u64()
        .and_then(|id| u32::try_from(id).ok())
        .ok_or_else(|| format!("id {id} is not a 32-bit number"))?;

    Ok(DictionaryRecord {
        id,
        source: text_field(source),
        translation: text_field(translation),
        comment: text_field(comment),
    })
}

/// Strings as-is, `null` as empty, anything else in its JSON form
fn text_field(value: Value) -> String {
    match value {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Encode records as a current-version dictionary
pub fn dictionary_to_bytes(records: &[DictionaryRecord]) -> Result<Vec<u8>> {
    let items: Vec<(u32, &str, &str, &str)> = records
        .iter()
        .map(|r| {
            (
                r.id,
                r.source.as_str(),
                r.translation.as_str(),
                r.comment.as_str(),
            )
        })
        .collect();

    let mut cursor = ByteCursor::buffer();
    cursor.put_bytes(&DICTIONARY_MAGIC)?;
    cursor.put_u8(DICTIONARY_VERSION)?;
    cursor.put_json(&items)?;
    Ok(cursor.into_bytes())
}

/// Write records to a dictionary file
pub fn write_dictionary<P: AsRef<Path>>(path: P, records: &[DictionaryRecord]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, dictionary_to_bytes(records)?)?;
    tracing::info!("Wrote {} records to {}", records.len(), path.display());
    Ok(())
}
