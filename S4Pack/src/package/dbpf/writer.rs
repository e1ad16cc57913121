//! DBPF package writer

use std::io::{Seek, Write};

use super::{
    Compression, EXTENDED_COMPRESSION_BIT, HEADER_SIZE, Header, IndexConstants, IndexLayout,
    Locator, MAGIC,
};
use crate::compression::zlib_compress;
use crate::cursor::ByteCursor;
use crate::error::{Error, Result};
use crate::resource::Resource;

fn to_u32(value: u64) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::FileTooLarge { length: value })
}

/// DBPF package writer
///
/// Payloads are appended after the header as they arrive; the index and
/// then the header are written last.
#[derive(Debug)]
pub struct DbpfWriter<S> {
    cursor: ByteCursor<S>,
}

impl<S: Write + Seek> DbpfWriter<S> {
    /// Wrap a stream and position it at the start of the content region.
    pub fn new(stream: S) -> Result<Self> {
        let mut cursor = ByteCursor::writer(stream)?;
        cursor.seek(HEADER_SIZE)?;
        Ok(Self { cursor })
    }

    /// Compress `content` with zlib and append it to the content region.
    ///
    /// # Errors
    /// Returns [`Error::FileTooLarge`] if the payload would start or end
    /// beyond what a 32-bit locator can address.
    pub fn put_resource(&mut self, content: &[u8]) -> Result<Locator> {
        let offset = to_u32(self.cursor.position()?)?;
        let compressed = zlib_compress(content)?;
        let length = to_u32(compressed.len() as u64)?;

        self.cursor.put_bytes(&compressed)?;

        tracing::debug!(
            "Stored {} bytes as {} at {:#X}",
            content.len(),
            length,
            offset
        );

        Ok(Locator {
            offset,
            length,
            compression: Compression::ZLIB,
        })
    }

    /// Write the index at the current position and return the header that
    /// describes it. The cursor is left where it was.
    ///
    /// # Errors
    /// Returns [`Error::FileTooLarge`] for an entry whose stored length has
    /// the high bit set, or when the index does not fit 32-bit fields.
    pub fn write_index<'r, I>(&mut self, resources: I, layout: IndexLayout) -> Result<Header>
    where
        I: IntoIterator<Item = &'r Resource>,
    {
        let resources: Vec<&Resource> = resources.into_iter().collect();

        for resource in &resources {
            if resource.locator.length & EXTENDED_COMPRESSION_BIT != 0 {
                return Err(Error::FileTooLarge {
                    length: u64::from(resource.locator.length),
                });
            }
        }

        let constants = match layout {
            IndexLayout::Expanded => IndexConstants::default(),
            IndexLayout::Compacted => shared_fields(&resources),
        };

        self.cursor.at(None, |c| {
            let start = c.position()?;

            c.put_u32(constants.flags().bits())?;
            for value in [constants.type_id, constants.group, constants.instance_high]
                .into_iter()
                .flatten()
            {
                c.put_u32(value)?;
            }

            for resource in &resources {
                let id = resource.id;
                if constants.type_id.is_none() {
                    c.put_u32(id.type_id)?;
                }
                if constants.group.is_none() {
                    c.put_u32(id.group)?;
                }
                if constants.instance_high.is_none() {
                    c.put_u32((id.instance >> 32) as u32)?;
                }
                c.put_u32(id.instance as u32)?;
                c.put_u32(resource.locator.offset)?;
                c.put_u32(resource.locator.length | EXTENDED_COMPRESSION_BIT)?;
                c.put_u32(resource.size)?;
                c.put_u16(resource.locator.compression.codec)?;
                c.put_u16(resource.locator.compression.version)?;
            }

            let end = c.position()?;
            Ok(Header::new(
                to_u32(resources.len() as u64)?,
                to_u32(start)?,
                to_u32(end - start)?,
            ))
        })
    }

    /// Write the fixed 96-byte header at offset 0.
    pub fn write_header(&mut self, header: &Header) -> Result<()> {
        self.cursor.at(Some(0), |c| {
            c.put_bytes(&MAGIC)?;
            c.put_u32(header.file_version.0)?;
            c.put_u32(header.file_version.1)?;
            c.put_u32(header.user_version.0)?;
            c.put_u32(header.user_version.1)?;
            c.put_u32(0)?;
            c.put_u32(header.created)?;
            c.put_u32(header.modified)?;
            c.put_u32(0)?;
            c.put_u32(header.index_count)?;
            // Low offset field stays zero; readers use the one at 64
            c.put_u32(0)?;
            c.put_u32(header.index_size)?;
            for _ in 0..3 {
                c.put_u32(0)?;
            }
            // Index minor version
            c.put_u32(3)?;
            c.put_u32(header.index_offset)?;
            for _ in 0..6 {
                c.put_u32(0)?;
            }
            Ok(())
        })
    }

    pub fn flush(&mut self) -> Result<()> {
        self.cursor.flush()
    }

    pub fn into_inner(self) -> S {
        self.cursor.into_inner()
    }
}

/// Type, group and instance-high values that every resource has in common
fn shared_fields(resources: &[&Resource]) -> IndexConstants {
    fn common<T: PartialEq + Copy>(values: impl Iterator<Item = T>) -> Option<T> {
        let mut values = values.peekable();
        let first = *values.peek()?;
        values.all(|value| value == first).then_some(first)
    }

    IndexConstants {
        type_id: common(resources.iter().map(|r| r.id.type_id)),
        group: common(resources.iter().map(|r| r.id.group)),
        instance_high: common(resources.iter().map(|r| (r.id.instance >> 32) as u32)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::PackageId;
    use crate::resource::ResourceId;
    use std::io::Cursor;

    fn resource(group: u32, instance: u64, length: u32) -> Resource {
        Resource {
            id: ResourceId::new(group, instance, 0x220557DA),
            locator: Locator {
                offset: 96,
                length,
                compression: Compression::ZLIB,
            },
            size: 10,
            package: PackageId::next(),
        }
    }

    #[test]
    fn test_header_layout() {
        let mut writer = DbpfWriter::new(Cursor::new(Vec::new())).unwrap();
        writer.write_header(&Header::new(2, 0x1234, 0x40)).unwrap();
        let bytes = writer.into_inner().into_inner();

        assert_eq!(&bytes[0..4], b"DBPF");
        assert_eq!(bytes.len(), 96);
        assert_eq!(u32::from_le_bytes(bytes[36..40].try_into().unwrap()), 2);
        assert_eq!(u32::from_le_bytes(bytes[40..44].try_into().unwrap()), 0);
        assert_eq!(u32::from_le_bytes(bytes[44..48].try_into().unwrap()), 0x40);
        assert_eq!(u32::from_le_bytes(bytes[60..64].try_into().unwrap()), 3);
        assert_eq!(u32::from_le_bytes(bytes[64..68].try_into().unwrap()), 0x1234);
    }

    #[test]
    fn test_expanded_index_size() {
        let mut writer = DbpfWriter::new(Cursor::new(Vec::new())).unwrap();
        let resources = [resource(0, 1, 5), resource(0, 2, 5)];
        let header = writer
            .write_index(&resources, IndexLayout::Expanded)
            .unwrap();
        assert_eq!(header.index_offset, 96);
        assert_eq!(header.index_count, 2);
        // flags + 2 * 32-byte entries
        assert_eq!(header.index_size, 4 + 2 * 32);
    }

    #[test]
    fn test_compacted_index_size() {
        let mut writer = DbpfWriter::new(Cursor::new(Vec::new())).unwrap();
        let resources = [resource(0, 1, 5), resource(0, 2, 5)];
        let header = writer
            .write_index(&resources, IndexLayout::Compacted)
            .unwrap();
        // flags + 3 constants + 2 * 20-byte entries
        assert_eq!(header.index_size, 4 + 12 + 2 * 20);
    }

    #[test]
    fn test_high_bit_length_rejected() {
        let mut writer = DbpfWriter::new(Cursor::new(Vec::new())).unwrap();
        let resources = [resource(0, 1, 0x8000_0000)];
        assert!(matches!(
            writer.write_index(&resources, IndexLayout::Expanded),
            Err(Error::FileTooLarge { length: 0x8000_0000 })
        ));
    }

    #[test]
    fn test_put_resource_appends_after_header() {
        let mut writer = DbpfWriter::new(Cursor::new(Vec::new())).unwrap();
        let first = writer.put_resource(b"hello").unwrap();
        let second = writer.put_resource(b"world").unwrap();
        assert_eq!(first.offset, 96);
        assert_eq!(second.offset, 96 + first.length);
        assert_eq!(first.compression, Compression::ZLIB);
    }
}
