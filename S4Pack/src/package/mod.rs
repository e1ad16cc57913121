//! Package access: one type for reading and writing DBPF packages
//!
//! A [`Package`] opened for reading builds its id → resource index on the
//! first lookup and keeps it. A package opened for writing collects
//! resources as they are [`put`](Package::put) and writes the index and
//! header on [`commit`](Package::commit).
//!
//! ```no_run
//! use s4pack::package::Package;
//! use s4pack::resource::ResourceId;
//!
//! let id = ResourceId::new(0, 0x0012_0000_0000_0001, s4pack::resource::TYPE_STBL);
//! Package::write("out.package", |package| package.put(id, b"payload"))?;
//!
//! let content = Package::read("out.package", |package| {
//!     let Some(resource) = package.get(&id)? else {
//!         return Ok(Vec::new());
//!     };
//!     package.content(&resource)
//! })?;
//! # Ok::<(), s4pack::Error>(())
//! ```

pub mod dbpf;

use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Cursor, Read, Seek, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

use crate::compression;
use crate::error::{Error, Result};
use crate::resource::{Resource, ResourceId, TYPE_STBL};
use dbpf::{DbpfReader, DbpfWriter};

pub use dbpf::IndexLayout;

static NEXT_PACKAGE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of an open package. Resources carry the id of the package that
/// produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PackageId(u64);

impl PackageId {
    /// A fresh id, distinct from every other id handed out by this process
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_PACKAGE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Live resources keyed by id, in index order
pub type ResourceIndex = IndexMap<ResourceId, Resource>;

enum Mode<S> {
    Read {
        reader: DbpfReader<S>,
        /// `None` until the first lookup
        index: Option<ResourceIndex>,
    },
    Write {
        writer: DbpfWriter<S>,
        index: ResourceIndex,
        layout: IndexLayout,
    },
    /// Committed or closed. A committed writer keeps its stream here.
    Closed(Option<S>),
}

/// A DBPF package opened for reading or for writing
pub struct Package<S> {
    id: PackageId,
    mode: Mode<S>,
}

impl<S> Package<S> {
    #[must_use]
    pub fn id(&self) -> PackageId {
        self.id
    }

    #[must_use]
    pub fn is_writable(&self) -> bool {
        matches!(self.mode, Mode::Write { .. })
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(self.mode, Mode::Closed(_))
    }

    /// Index layout used on commit. Ignored for packages opened for reading.
    #[must_use]
    pub fn with_layout(mut self, layout: IndexLayout) -> Self {
        if let Mode::Write { layout: current, .. } = &mut self.mode {
            *current = layout;
        }
        self
    }

    /// Release the package. Uncommitted writes are discarded.
    pub fn close(self) {
        if let Mode::Write { index, .. } = &self.mode {
            if !index.is_empty() {
                tracing::warn!(
                    "Closing package with {} uncommitted resources",
                    index.len()
                );
            }
        }
    }

    /// Ids of resources put so far, for packages opened for writing
    fn written(&self, filter_type: Option<u32>) -> Option<Vec<ResourceId>> {
        match &self.mode {
            Mode::Write { index, .. } => Some(filter_ids(index, filter_type)),
            _ => None,
        }
    }
}

impl<S: Read + Seek> Package<S> {
    /// Open a package over any seekable stream.
    pub fn from_reader(stream: S) -> Result<Self> {
        Ok(Self {
            id: PackageId::next(),
            mode: Mode::Read {
                reader: DbpfReader::new(stream)?,
                index: None,
            },
        })
    }

    fn index(&mut self) -> Result<&ResourceIndex> {
        let package = self.id;
        match &mut self.mode {
            Mode::Read { reader, index } => {
                if index.is_none() {
                    *index = Some(build_index(reader, package)?);
                }
                Ok(index.get_or_insert_with(IndexMap::new))
            }
            Mode::Write { index, .. } => Ok(index),
            Mode::Closed(_) => Err(Error::ClosedPackage),
        }
    }

    /// Ids of live resources, optionally restricted to one type.
    ///
    /// The index is built on the first call and reused afterwards; the type
    /// filter is applied per call.
    pub fn search(&mut self, filter_type: Option<u32>) -> Result<Vec<ResourceId>> {
        if let Some(ids) = self.written(filter_type) {
            return Ok(ids);
        }
        Ok(filter_ids(self.index()?, filter_type))
    }

    /// Ids of every string table in the package
    pub fn search_stbl(&mut self) -> Result<Vec<ResourceId>> {
        self.search(Some(TYPE_STBL))
    }

    /// Handle for `id`, or `None` when the package has no such resource
    pub fn get(&mut self, id: &ResourceId) -> Result<Option<Resource>> {
        Ok(self.index()?.get(id).copied())
    }

    /// Every live resource in index order
    pub fn resources(&mut self) -> Result<Vec<Resource>> {
        Ok(self.index()?.values().copied().collect())
    }

    /// Read and decompress the payload of `resource`.
    ///
    /// # Errors
    /// Returns [`Error::ForeignResource`] for handles from another package,
    /// [`Error::UnsupportedCompression`] for unknown codecs and
    /// [`Error::CorruptData`] when the payload does not decode.
    pub fn content(&mut self, resource: &Resource) -> Result<Vec<u8>> {
        if resource.package != self.id {
            return Err(Error::ForeignResource(resource.id));
        }

        match &mut self.mode {
            Mode::Read { reader, .. } => {
                let raw = reader.read_raw(&resource.locator)?;
                compression::decompress(
                    resource.locator.compression.codec,
                    &raw,
                    resource.size as usize,
                )
            }
            Mode::Write { .. } => Err(Error::WrongMode {
                expected: "reading",
            }),
            Mode::Closed(_) => Err(Error::ClosedPackage),
        }
    }

    /// Payload of the resource named `id`, if present
    pub fn content_of(&mut self, id: &ResourceId) -> Result<Option<Vec<u8>>> {
        match self.get(id)? {
            Some(resource) => self.content(&resource).map(Some),
            None => Ok(None),
        }
    }
}

impl Package<BufReader<File>> {
    /// Open a package file for reading.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        tracing::info!("Opening package {}", path.display());
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Run `f` over the package at `path` and release it afterwards.
    ///
    /// A missing file yields `T::default()` without calling `f`.
    pub fn read<P, T, F>(path: P, f: F) -> Result<T>
    where
        P: AsRef<Path>,
        T: Default,
        F: FnOnce(&mut Self) -> Result<T>,
    {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("{} does not exist, nothing to read", path.display());
            return Ok(T::default());
        }

        let mut package = Self::open(path)?;
        let result = f(&mut package);
        package.close();
        result
    }
}

impl Package<Cursor<Vec<u8>>> {
    /// Open an in-memory package for reading.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Self::from_reader(Cursor::new(bytes))
    }

    /// Empty in-memory package for writing. Take the bytes with
    /// [`Package::into_inner`] after [`Package::commit`].
    pub fn buffer() -> Result<Self> {
        Self::from_writer(Cursor::new(Vec::new()))
    }
}

impl<S: Write + Seek> Package<S> {
    /// Start a new package on a seekable stream.
    pub fn from_writer(stream: S) -> Result<Self> {
        Ok(Self {
            id: PackageId::next(),
            mode: Mode::Write {
                writer: DbpfWriter::new(stream)?,
                index: IndexMap::new(),
                layout: IndexLayout::default(),
            },
        })
    }

    /// Compress and append `content` under `id`. A later put with the same
    /// id replaces the index entry but keeps its position.
    pub fn put(&mut self, id: ResourceId, content: &[u8]) -> Result<()> {
        let package = self.id;
        match &mut self.mode {
            Mode::Write { writer, index, .. } => {
                let size = u32::try_from(content.len()).map_err(|_| Error::FileTooLarge {
                    length: content.len() as u64,
                })?;
                let locator = writer.put_resource(content)?;
                index.insert(
                    id,
                    Resource {
                        id,
                        locator,
                        size,
                        package,
                    },
                );
                Ok(())
            }
            Mode::Read { .. } => Err(Error::WrongMode {
                expected: "writing",
            }),
            Mode::Closed(_) => Err(Error::ClosedPackage),
        }
    }

    /// Write the index and then the header, flush, and close the package.
    ///
    /// The package is closed afterwards even when writing fails.
    pub fn commit(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.mode, Mode::Closed(None)) {
            Mode::Write {
                mut writer,
                index,
                layout,
            } => {
                let header = writer.write_index(index.values(), layout)?;
                writer.write_header(&header)?;
                writer.flush()?;
                tracing::info!(
                    "Committed {} resources ({} byte index at {:#X})",
                    header.index_count,
                    header.index_size,
                    header.index_offset
                );
                self.mode = Mode::Closed(Some(writer.into_inner()));
                Ok(())
            }
            Mode::Closed(stream) => {
                self.mode = Mode::Closed(stream);
                Err(Error::ClosedPackage)
            }
            read => {
                self.mode = read;
                Err(Error::WrongMode {
                    expected: "writing",
                })
            }
        }
    }
}

impl<S: Read + Seek + Write> Package<S> {
    /// The underlying stream. For a writer this is only complete after
    /// [`Package::commit`].
    pub fn into_inner(self) -> Result<S> {
        match self.mode {
            Mode::Read { reader, .. } => Ok(reader.into_inner()),
            Mode::Write { writer, .. } => Ok(writer.into_inner()),
            Mode::Closed(Some(stream)) => Ok(stream),
            Mode::Closed(None) => Err(Error::ClosedPackage),
        }
    }
}

impl Package<BufWriter<File>> {
    /// Create (or truncate) a package file for writing.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        tracing::info!("Creating package {}", path.display());
        let file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(path)?;
        Self::from_writer(BufWriter::new(file))
    }

    /// Run `f` over a new package at `path` and commit it afterwards.
    ///
    /// The commit runs even when `f` fails; the error from `f` is returned in
    /// that case.
    pub fn write<P, T, F>(path: P, f: F) -> Result<T>
    where
        P: AsRef<Path>,
        F: FnOnce(&mut Self) -> Result<T>,
    {
        let mut package = Self::create(path)?;
        let result = f(&mut package);
        let committed = package.commit();

        match (result, committed) {
            (Err(err), _) | (Ok(_), Err(err)) => Err(err),
            (Ok(value), Ok(())) => Ok(value),
        }
    }
}

fn filter_ids(index: &ResourceIndex, filter_type: Option<u32>) -> Vec<ResourceId> {
    index
        .keys()
        .filter(|id| filter_type.is_none_or(|type_id| id.type_id == type_id))
        .copied()
        .collect()
}

/// Enumerate the index, dropping deleted entries. A stream that is not a
/// package at all yields an empty index.
fn build_index<S: Read + Seek>(
    reader: &mut DbpfReader<S>,
    package: PackageId,
) -> Result<ResourceIndex> {
    let entries = match reader.entries(package) {
        Ok(entries) => entries,
        Err(err) if err.is_format_mismatch() => {
            tracing::warn!("Not a package, treating as empty: {err}");
            return Ok(IndexMap::new());
        }
        Err(err) => return Err(err),
    };

    let mut index = IndexMap::new();
    let mut deleted = 0usize;
    for entry in entries {
        let resource = entry?;
        if resource.locator.deleted() {
            deleted += 1;
            continue;
        }
        index.insert(resource.id, resource);
    }

    tracing::debug!(
        "Indexed {} resources ({} deleted entries skipped)",
        index.len(),
        deleted
    );
    Ok(index)
}
