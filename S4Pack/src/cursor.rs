//! Little-endian byte cursor shared by every binary format in the crate
//!
//! Wraps either an in-memory buffer or any seekable stream and tracks the
//! total length captured when the cursor was created. Read cursors clamp
//! seeks to `[0, len]`; write cursors may seek past the end (the gap is
//! zero-filled on the next write).

use std::io::{Cursor, Read, Seek, SeekFrom, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::compression::{zlib_compress, zlib_decompress};
use crate::error::{Error, Result};

/// Strings whose UTF-8 form is longer than this are stored zlib-compressed
/// by [`ByteCursor::put_string`].
pub const STRING_COMPRESS_THRESHOLD: usize = 50;

/// Whether a cursor was opened for reading or writing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorMode {
    Read,
    Write,
}

/// Typed little-endian reads and writes over a seekable stream
#[derive(Debug)]
pub struct ByteCursor<S> {
    inner: S,
    mode: CursorMode,
    len: u64,
}

/// Turn a short read into `CorruptData`, keep every other IO error as-is.
fn short_read(err: std::io::Error, what: &str) -> Error {
    if err.kind() == std::io::ErrorKind::UnexpectedEof {
        Error::corrupt(format!("truncated read of {what}"))
    } else {
        Error::Io(err)
    }
}

impl<'a> ByteCursor<Cursor<&'a [u8]>> {
    /// Read cursor over a byte slice
    #[must_use]
    pub fn from_bytes(data: &'a [u8]) -> Self {
        Self {
            len: data.len() as u64,
            inner: Cursor::new(data),
            mode: CursorMode::Read,
        }
    }
}

impl ByteCursor<Cursor<Vec<u8>>> {
    /// Empty in-memory write cursor
    #[must_use]
    pub fn buffer() -> Self {
        Self {
            inner: Cursor::new(Vec::new()),
            mode: CursorMode::Write,
            len: 0,
        }
    }

    /// Consume the cursor and return everything written so far
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.inner.into_inner()
    }
}

impl<S: Seek> ByteCursor<S> {
    /// Read cursor over a stream. The length is taken by seeking to the end.
    pub fn reader(inner: S) -> Result<Self> {
        Self::with_mode(inner, CursorMode::Read)
    }

    /// Write cursor over a stream.
    pub fn writer(inner: S) -> Result<Self> {
        Self::with_mode(inner, CursorMode::Write)
    }

    fn with_mode(mut inner: S, mode: CursorMode) -> Result<Self> {
        let len = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(0))?;
        Ok(Self { inner, mode, len })
    }

    #[must_use]
    pub fn mode(&self) -> CursorMode {
        self.mode
    }

    /// Total length: captured at creation, grown by writes.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current absolute position
    pub fn position(&mut self) -> Result<u64> {
        Ok(self.inner.stream_position()?)
    }

    /// Bytes left between the position and the known end
    pub fn remaining(&mut self) -> Result<u64> {
        let pos = self.position()?;
        Ok(self.len.saturating_sub(pos))
    }

    /// Seek to an absolute position and return where the cursor ended up.
    pub fn seek(&mut self, pos: u64) -> Result<u64> {
        let target = match self.mode {
            CursorMode::Read => pos.min(self.len),
            CursorMode::Write => pos,
        };
        Ok(self.inner.seek(SeekFrom::Start(target))?)
    }

    /// Move forward by `count` bytes.
    pub fn skip(&mut self, count: u64) -> Result<u64> {
        let pos = self.position()?;
        self.seek(pos.saturating_add(count))
    }

    /// Run `op` at `pos` (or at the current position when `None`) and put the
    /// cursor back where it was afterwards, whether `op` succeeded or not.
    pub fn at<T, F>(&mut self, pos: Option<u64>, op: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        let saved = self.position()?;
        let result = match pos {
            Some(pos) => self.seek(pos).and_then(|_| op(self)),
            None => op(self),
        };
        let restored = self.inner.seek(SeekFrom::Start(saved));

        match (result, restored) {
            (Err(err), _) => Err(err),
            (Ok(_), Err(err)) => Err(err.into()),
            (Ok(value), Ok(_)) => Ok(value),
        }
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: Read + Seek> ByteCursor<S> {
    pub fn get_u8(&mut self) -> Result<u8> {
        self.inner.read_u8().map_err(|e| short_read(e, "u8"))
    }

    pub fn get_u16(&mut self) -> Result<u16> {
        self.inner
            .read_u16::<LittleEndian>()
            .map_err(|e| short_read(e, "u16"))
    }

    pub fn get_u32(&mut self) -> Result<u32> {
        self.inner
            .read_u32::<LittleEndian>()
            .map_err(|e| short_read(e, "u32"))
    }

    pub fn get_u64(&mut self) -> Result<u64> {
        self.inner
            .read_u64::<LittleEndian>()
            .map_err(|e| short_read(e, "u64"))
    }

    pub fn get_i8(&mut self) -> Result<i8> {
        self.inner.read_i8().map_err(|e| short_read(e, "i8"))
    }

    pub fn get_i16(&mut self) -> Result<i16> {
        self.inner
            .read_i16::<LittleEndian>()
            .map_err(|e| short_read(e, "i16"))
    }

    pub fn get_i32(&mut self) -> Result<i32> {
        self.inner
            .read_i32::<LittleEndian>()
            .map_err(|e| short_read(e, "i32"))
    }

    pub fn get_i64(&mut self) -> Result<i64> {
        self.inner
            .read_i64::<LittleEndian>()
            .map_err(|e| short_read(e, "i64"))
    }

    pub fn get_f32(&mut self) -> Result<f32> {
        self.inner
            .read_f32::<LittleEndian>()
            .map_err(|e| short_read(e, "f32"))
    }

    /// Read exactly `count` raw bytes.
    pub fn get_bytes(&mut self, count: usize) -> Result<Vec<u8>> {
        // Refuse before allocating when a bogus length field points past the end
        if self.mode == CursorMode::Read && count as u64 > self.remaining()? {
            return Err(Error::corrupt(format!(
                "truncated read of {count} bytes ({} remaining)",
                self.remaining()?
            )));
        }

        let mut buf = vec![0u8; count];
        self.inner
            .read_exact(&mut buf)
            .map_err(|e| short_read(e, "byte range"))?;
        Ok(buf)
    }

    /// Read a string.
    ///
    /// With `length == 0` the `(u32 length, u8 compressed)` prefix written by
    /// [`ByteCursor::put_string`] is read first and decides the rest; otherwise
    /// exactly `length` bytes are read and inflated when `compressed` is set.
    pub fn get_string(&mut self, length: usize, compressed: bool) -> Result<String> {
        let (length, compressed) = if length == 0 {
            let length = self.get_u32()? as usize;
            let flag = self.get_u8()?;
            (length, flag != 0)
        } else {
            (length, compressed)
        };

        let raw = self.get_bytes(length)?;
        let bytes = if compressed {
            zlib_decompress(&raw, None)?
        } else {
            raw
        };

        Ok(String::from_utf8(bytes)?)
    }

    /// Read a length-prefixed string and decode it as JSON.
    pub fn get_json<T: DeserializeOwned>(&mut self) -> Result<T> {
        let text = self.get_string(0, true)?;
        Ok(serde_json::from_str(&text)?)
    }
}

impl<S: Write + Seek> ByteCursor<S> {
    fn grow(&mut self) -> Result<()> {
        let pos = self.inner.stream_position()?;
        if pos > self.len {
            self.len = pos;
        }
        Ok(())
    }

    pub fn put_u8(&mut self, value: u8) -> Result<()> {
        self.inner.write_u8(value)?;
        self.grow()
    }

    pub fn put_u16(&mut self, value: u16) -> Result<()> {
        self.inner.write_u16::<LittleEndian>(value)?;
        self.grow()
    }

    pub fn put_u32(&mut self, value: u32) -> Result<()> {
        self.inner.write_u32::<LittleEndian>(value)?;
        self.grow()
    }

    pub fn put_u64(&mut self, value: u64) -> Result<()> {
        self.inner.write_u64::<LittleEndian>(value)?;
        self.grow()
    }

    pub fn put_i8(&mut self, value: i8) -> Result<()> {
        self.inner.write_i8(value)?;
        self.grow()
    }

    pub fn put_i16(&mut self, value: i16) -> Result<()> {
        self.inner.write_i16::<LittleEndian>(value)?;
        self.grow()
    }

    pub fn put_i32(&mut self, value: i32) -> Result<()> {
        self.inner.write_i32::<LittleEndian>(value)?;
        self.grow()
    }

    pub fn put_i64(&mut self, value: i64) -> Result<()> {
        self.inner.write_i64::<LittleEndian>(value)?;
        self.grow()
    }

    pub fn put_f32(&mut self, value: f32) -> Result<()> {
        self.inner.write_f32::<LittleEndian>(value)?;
        self.grow()
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes)?;
        self.grow()
    }

    /// Write a string with its `(u32 length, u8 compressed)` prefix.
    ///
    /// Anything longer than [`STRING_COMPRESS_THRESHOLD`] UTF-8 bytes is
    /// zlib-compressed and flagged with `1`.
    pub fn put_string(&mut self, value: &str) -> Result<()> {
        let bytes = value.as_bytes();
        let (payload, flag) = if bytes.len() > STRING_COMPRESS_THRESHOLD {
            (zlib_compress(bytes)?, 1u8)
        } else {
            (bytes.to_vec(), 0u8)
        };

        let length = u32::try_from(payload.len()).map_err(|_| Error::FileTooLarge {
            length: payload.len() as u64,
        })?;
        self.put_u32(length)?;
        self.put_u8(flag)?;
        self.put_bytes(&payload)
    }

    /// Encode `value` as JSON and write it with [`ByteCursor::put_string`].
    pub fn put_json<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        let text = serde_json::to_string(value)?;
        self.put_string(&text)
    }

    pub fn flush(&mut self) -> Result<()> {
        Ok(self.inner.flush()?)
    }
}
