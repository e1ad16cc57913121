//! `.stbl` writing

use std::path::Path;

use super::{STBL_MAGIC, STBL_VERSION, StringTable};
use crate::cursor::ByteCursor;
use crate::error::{Error, Result};

/// Write a `.stbl` file to disk
///
/// # Errors
/// Returns an error if the table cannot be encoded or the file cannot be
/// written.
pub fn write_stbl<P: AsRef<Path>>(path: P, table: &StringTable) -> Result<()> {
    let bytes = table.to_bytes()?;
    std::fs::write(path, bytes)?;
    Ok(())
}

impl StringTable {
    /// Encode the table. Entries are written in insertion order.
    ///
    /// # Errors
    /// Returns [`Error::FileTooLarge`] if a value is longer than `u16::MAX`
    /// bytes or the total text length does not fit the 32-bit length field.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let count = self.entries.len() as u64;
        // One flag byte per entry plus the text
        let total = self
            .entries
            .values()
            .fold(count, |sum, value| sum + value.len() as u64);
        let total = u32::try_from(total).map_err(|_| Error::FileTooLarge { length: total })?;

        let mut cursor = ByteCursor::buffer();
        cursor.put_bytes(&STBL_MAGIC)?;
        cursor.put_u16(STBL_VERSION)?;
        cursor.put_u8(0)?;
        cursor.put_u64(count)?;
        cursor.put_bytes(&[0, 0])?;
        cursor.put_u32(total)?;

        for (key, value) in &self.entries {
            let length = u16::try_from(value.len()).map_err(|_| Error::FileTooLarge {
                length: value.len() as u64,
            })?;
            cursor.put_u32(*key)?;
            cursor.put_i8(0)?;
            cursor.put_u16(length)?;
            cursor.put_bytes(value.as_bytes())?;
        }

        Ok(cursor.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::stbl::parse_stbl_bytes;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_layout() {
        let mut table = StringTable::new();
        table.add(0x0102_0304, "héllo");
        let bytes = table.to_bytes().unwrap();

        let expected_len = 4 + 2 + 1 + 8 + 2 + 4 + (4 + 1 + 2 + 6);
        assert_eq!(bytes.len(), expected_len);
        assert_eq!(&bytes[0..4], b"STBL");
        assert_eq!(&bytes[4..6], &[5, 0]);
        assert_eq!(bytes[6], 0);
        assert_eq!(&bytes[7..15], &1u64.to_le_bytes());
        assert_eq!(&bytes[15..17], &[0, 0]);
        // count + utf-8 length
        assert_eq!(&bytes[17..21], &7u32.to_le_bytes());
        assert_eq!(&bytes[21..25], &[4, 3, 2, 1]);
        assert_eq!(bytes[25], 0);
        assert_eq!(&bytes[26..28], &6u16.to_le_bytes());
    }

    #[test]
    fn test_roundtrip_keeps_order() {
        let mut table = StringTable::new();
        table.add(30, "third\r\nline");
        table.add(10, "first");
        table.add(20, "");
        let decoded = parse_stbl_bytes(&table.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded.entries, table.entries);
        assert_eq!(decoded.get(30), Some("third\\nline"));
    }

    #[test]
    fn test_overlong_value_rejected() {
        let mut table = StringTable::new();
        table.add(1, &"x".repeat(usize::from(u16::MAX) + 1));
        assert!(matches!(
            table.to_bytes(),
            Err(Error::FileTooLarge { length: 65536 })
        ));
    }

    #[test]
    fn test_empty_table() {
        let bytes = StringTable::new().to_bytes().unwrap();
        assert_eq!(bytes.len(), 21);
        assert!(parse_stbl_bytes(&bytes).unwrap().is_empty());
    }
}
