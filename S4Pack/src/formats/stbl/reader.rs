//! `.stbl` reading and parsing

use std::path::Path;

use super::{STBL_MAGIC, STBL_VERSION, StringTable};
use crate::cursor::ByteCursor;
use crate::error::{Error, Result};
use crate::resource::ResourceId;

const FORMAT: &str = "STBL";

/// Read a `.stbl` file from disk
///
/// The table id is taken from the file stem when it is a resource name.
///
/// # Errors
/// Returns [`Error::Io`] if the file cannot be read and the errors of
/// [`parse_stbl_bytes`] otherwise.
pub fn read_stbl<P: AsRef<Path>>(path: P) -> Result<StringTable> {
    let path = path.as_ref();
    let data = std::fs::read(path)?;
    let mut table = parse_stbl_bytes(&data)?;

    table.id = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .and_then(|stem| stem.parse::<ResourceId>().ok());

    Ok(table)
}

/// Parse STBL data from bytes
///
/// # Errors
/// Returns [`Error::FormatMismatch`] for a wrong magic or version,
/// [`Error::CorruptData`] for truncated data and [`Error::Utf8Error`] for
/// values that are not UTF-8.
pub fn parse_stbl_bytes(data: &[u8]) -> Result<StringTable> {
    let mut cursor = ByteCursor::from_bytes(data);

    if data.len() < STBL_MAGIC.len() || data[..STBL_MAGIC.len()] != STBL_MAGIC {
        return Err(Error::mismatch(FORMAT, "bad magic"));
    }
    cursor.skip(STBL_MAGIC.len() as u64)?;

    let version = cursor.get_u16()?;
    if version != STBL_VERSION {
        return Err(Error::mismatch(
            FORMAT,
            format!("unsupported version {version} (supported: {STBL_VERSION})"),
        ));
    }

    let _compressed = cursor.get_u8()?;
    let count = cursor.get_u64()?;
    cursor.skip(2)?;
    // Total string length, not needed to decode
    let _total = cursor.get_u32()?;

    let mut table = StringTable::new();
    for _ in 0..count {
        let key = cursor.get_u32()?;
        let _flags = cursor.get_u8()?;
        let length = cursor.get_u16()?;
        // A zero length would make get_string read its own length prefix
        let value = if length == 0 {
            String::new()
        } else {
            cursor.get_string(usize::from(length), false)?
        };
        table.entries.insert(key, value);
    }

    tracing::debug!("Parsed STBL with {} entries", table.len());
    Ok(table)
}

impl StringTable {
    /// Lenient parse: data that is not a string table gives an empty table.
    ///
    /// # Errors
    /// Only structural damage inside a recognized table is an error.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        match parse_stbl_bytes(data) {
            Err(err) if err.is_format_mismatch() => {
                tracing::warn!("Not a string table, treating as empty: {err}");
                Ok(Self::new())
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_bytes(version: u16, entries: &[(u32, &str)]) -> Vec<u8> {
        let mut data = b"STBL".to_vec();
        data.extend_from_slice(&version.to_le_bytes());
        data.push(0);
        data.extend_from_slice(&(entries.len() as u64).to_le_bytes());
        data.extend_from_slice(&[0, 0]);
        data.extend_from_slice(&0u32.to_le_bytes());
        for (key, value) in entries {
            data.extend_from_slice(&key.to_le_bytes());
            data.push(0);
            data.extend_from_slice(&(value.len() as u16).to_le_bytes());
            data.extend_from_slice(value.as_bytes());
        }
        data
    }

    #[test]
    fn test_parse_entries() {
        let data = table_bytes(5, &[(0xDEAD_BEEF, "Привет"), (1, "")]);
        let table = parse_stbl_bytes(&data).unwrap();
        assert_eq!(table.get(0xDEAD_BEEF), Some("Привет"));
        assert_eq!(table.get(1), Some(""));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_wrong_version_is_empty_when_lenient() {
        let data = table_bytes(4, &[(1, "x")]);
        assert!(parse_stbl_bytes(&data).unwrap_err().is_format_mismatch());
        assert!(StringTable::from_bytes(&data).unwrap().is_empty());
    }

    #[test]
    fn test_wrong_magic_is_empty_when_lenient() {
        assert!(StringTable::from_bytes(b"NOPE").unwrap().is_empty());
        assert!(StringTable::from_bytes(b"").unwrap().is_empty());
    }

    #[test]
    fn test_truncated_entry_is_error() {
        let mut data = table_bytes(5, &[(1, "hello")]);
        data.truncate(data.len() - 2);
        assert!(matches!(
            StringTable::from_bytes(&data),
            Err(Error::CorruptData { .. })
        ));
    }
}
