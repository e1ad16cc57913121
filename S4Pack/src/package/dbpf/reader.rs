//! DBPF package reader

use std::io::{Read, Seek};

use super::{
    Compression, EXTENDED_COMPRESSION_BIT, HEADER_SIZE, Header, IndexConstants, IndexFlags,
    Locator, MAGIC, VERSION,
};
use crate::cursor::ByteCursor;
use crate::error::{Error, Result};
use crate::package::PackageId;
use crate::resource::{Resource, ResourceId};

const FORMAT: &str = "DBPF package";

/// DBPF package reader
#[derive(Debug)]
pub struct DbpfReader<S> {
    cursor: ByteCursor<S>,
    header: Option<Header>,
}

impl<S: Read + Seek> DbpfReader<S> {
    /// Wrap a stream. Nothing is read until [`DbpfReader::read_header`].
    pub fn new(stream: S) -> Result<Self> {
        Ok(Self {
            cursor: ByteCursor::reader(stream)?,
            header: None,
        })
    }

    /// Read and validate the package header
    ///
    /// # Errors
    /// Returns [`Error::FormatMismatch`] if the stream is shorter than a
    /// header, the magic is not `DBPF` or the version is not 2.1.
    pub fn read_header(&mut self) -> Result<Header> {
        if let Some(header) = self.header {
            return Ok(header);
        }

        if self.cursor.len() < HEADER_SIZE {
            return Err(Error::mismatch(
                FORMAT,
                format!("{} bytes is shorter than the header", self.cursor.len()),
            ));
        }

        let header = self.cursor.at(Some(0), |c| {
            let magic = c.get_bytes(MAGIC.len())?;
            if magic != MAGIC {
                return Err(Error::mismatch(FORMAT, format!("bad magic {magic:02X?}")));
            }

            let file_version = (c.get_u32()?, c.get_u32()?);
            if file_version != VERSION {
                return Err(Error::mismatch(
                    FORMAT,
                    format!(
                        "unsupported version {}.{} (supported: {}.{})",
                        file_version.0, file_version.1, VERSION.0, VERSION.1
                    ),
                ));
            }

            let user_version = (c.get_u32()?, c.get_u32()?);
            c.skip(4)?;
            let created = c.get_u32()?;
            let modified = c.get_u32()?;
            c.skip(4)?;
            let index_count = c.get_u32()?;
            let index_offset_low = c.get_u32()?;
            let index_size = c.get_u32()?;
            c.skip(16)?;
            let index_offset_high = c.get_u32()?;

            let index_offset = if index_offset_high != 0 {
                index_offset_high
            } else {
                index_offset_low
            };

            Ok(Header {
                file_version,
                user_version,
                created,
                modified,
                index_count,
                index_offset,
                index_size,
            })
        })?;

        tracing::debug!(
            "DBPF header: {} entries, index at {:#X} ({} bytes)",
            header.index_count,
            header.index_offset,
            header.index_size
        );

        self.header = Some(header);
        Ok(header)
    }

    /// Lazily enumerate the index, tagging each entry with `package`.
    ///
    /// Deleted entries are yielded too; filtering them is up to the caller.
    ///
    /// # Errors
    /// Returns an error if the header is invalid or the index preamble cannot
    /// be read. Errors on individual entries are yielded by the iterator.
    pub fn entries(&mut self, package: PackageId) -> Result<IndexEntries<'_, S>> {
        let header = self.read_header()?;

        if header.index_offset == 0 {
            if header.index_count != 0 {
                tracing::warn!(
                    "Header claims {} entries but has no index, treating as empty",
                    header.index_count
                );
            }
            return Ok(IndexEntries::empty(&mut self.cursor, package));
        }

        let (flags, constants, position) =
            self.cursor.at(Some(u64::from(header.index_offset)), |c| {
                let flags = IndexFlags(c.get_u32()?);
                let mut constants = IndexConstants::default();
                if flags.contains(IndexFlags::CONST_TYPE) {
                    constants.type_id = Some(c.get_u32()?);
                }
                if flags.contains(IndexFlags::CONST_GROUP) {
                    constants.group = Some(c.get_u32()?);
                }
                if flags.contains(IndexFlags::CONST_INSTANCE_EX) {
                    constants.instance_high = Some(c.get_u32()?);
                }
                Ok((flags, constants, c.position()?))
            })?;

        tracing::debug!("Index flags {:#X}", flags.bits());

        Ok(IndexEntries {
            cursor: &mut self.cursor,
            constants,
            position,
            remaining: header.index_count,
            package,
        })
    }

    /// Raw stored bytes for `locator`, still compressed
    pub fn read_raw(&mut self, locator: &Locator) -> Result<Vec<u8>> {
        self.cursor.at(Some(u64::from(locator.offset)), |c| {
            c.get_bytes(locator.length as usize)
        })
    }

    pub fn into_inner(self) -> S {
        self.cursor.into_inner()
    }
}

/// Lazy sequence of index entries
///
/// Each step seeks to where the previous entry ended, reads one entry and
/// restores the cursor, so the underlying stream stays usable between steps.
/// The sequence ends after the first error.
pub struct IndexEntries<'a, S> {
    cursor: &'a mut ByteCursor<S>,
    constants: IndexConstants,
    position: u64,
    remaining: u32,
    package: PackageId,
}

impl<'a, S: Read + Seek> IndexEntries<'a, S> {
    fn empty(cursor: &'a mut ByteCursor<S>, package: PackageId) -> Self {
        Self {
            cursor,
            constants: IndexConstants::default(),
            position: 0,
            remaining: 0,
            package,
        }
    }

    fn read_entry(&mut self) -> Result<Resource> {
        let constants = self.constants;
        let package = self.package;

        let (resource, next) = self.cursor.at(Some(self.position), |c| {
            let type_id = match constants.type_id {
                Some(value) => value,
                None => c.get_u32()?,
            };
            let group = match constants.group {
                Some(value) => value,
                None => c.get_u32()?,
            };
            let instance_high = match constants.instance_high {
                Some(value) => value,
                None => c.get_u32()?,
            };
            let instance_low = c.get_u32()?;
            let offset = c.get_u32()?;
            let stored = c.get_u32()?;
            let size = c.get_u32()?;

            let compression = if stored & EXTENDED_COMPRESSION_BIT != 0 {
                Compression {
                    codec: c.get_u16()?,
                    version: c.get_u16()?,
                }
            } else {
                Compression::NONE
            };

            let instance = (u64::from(instance_high) << 32) | u64::from(instance_low);
            let resource = Resource {
                id: ResourceId::new(group, instance, type_id),
                locator: Locator {
                    offset,
                    length: stored & !EXTENDED_COMPRESSION_BIT,
                    compression,
                },
                size,
                package,
            };
            Ok((resource, c.position()?))
        })?;

        self.position = next;
        Ok(resource)
    }
}

impl<S: Read + Seek> Iterator for IndexEntries<'_, S> {
    type Item = Result<Resource>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        match self.read_entry() {
            Ok(resource) => {
                self.remaining -= 1;
                Some(Ok(resource))
            }
            Err(err) => {
                self.remaining = 0;
                Some(Err(err))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining as usize))
    }
}
