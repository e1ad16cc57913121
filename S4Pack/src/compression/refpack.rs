//! RefPack (LZ77-style) decompression for package entries
//!
//! Stream layout: a flags byte, the magic `0xFB`, the decompressed size as a
//! 3-byte big-endian integer (4 bytes when flag bit `0x80` is set), then a
//! series of commands. Each command starts with one to four control bytes
//! that give a literal run length, a back-reference length and a
//! back-reference distance.

use super::MAX_PREALLOC;
use crate::error::{Error, Result};

/// Second byte of every RefPack stream
pub const MAGIC: u8 = 0xFB;

/// Flag bit selecting a 4-byte size field
const FLAG_LARGE_SIZE: u8 = 0x80;

/// One decoded control sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Command {
    literal: usize,
    copy: usize,
    offset: usize,
}

struct Input<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Input<'a> {
    fn has_more(&self) -> bool {
        self.pos < self.data.len()
    }

    fn byte(&mut self) -> Result<usize> {
        let b = *self
            .data
            .get(self.pos)
            .ok_or_else(|| Error::corrupt("RefPack: control sequence cut short"))?;
        self.pos += 1;
        Ok(usize::from(b))
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8]> {
        let end = self.pos + count;
        let slice = self
            .data
            .get(self.pos..end)
            .ok_or_else(|| Error::corrupt("RefPack: literal run past end of input"))?;
        self.pos = end;
        Ok(slice)
    }

    fn command(&mut self) -> Result<Command> {
        let cc0 = self.byte()?;

        let command = match cc0 {
            0x00..=0x7F => {
                let cc1 = self.byte()?;
                Command {
                    literal: cc0 & 0x03,
                    copy: ((cc0 & 0x1C) >> 2) + 3,
                    offset: ((cc0 & 0x60) << 3) + cc1,
                }
            }
            0x80..=0xBF => {
                let cc1 = self.byte()?;
                let cc2 = self.byte()?;
                Command {
                    literal: (cc1 & 0xC0) >> 6,
                    copy: (cc0 & 0x3F) + 4,
                    offset: ((cc1 & 0x3F) << 8) + cc2,
                }
            }
            0xC0..=0xDF => {
                let cc1 = self.byte()?;
                let cc2 = self.byte()?;
                let cc3 = self.byte()?;
                Command {
                    literal: cc0 & 0x03,
                    copy: ((cc0 & 0x0C) << 6) + cc3 + 5,
                    offset: ((cc0 & 0x10) << 12) + (cc1 << 8) + cc2,
                }
            }
            0xE0..=0xFB => Command {
                literal: ((cc0 & 0x1F) << 2) + 4,
                copy: 0,
                offset: 0,
            },
            _ => Command {
                literal: cc0 & 0x03,
                copy: 0,
                offset: 0,
            },
        };

        Ok(command)
    }
}

/// Read the declared output size from the stream header.
///
/// # Errors
/// Returns [`Error::CorruptData`] if the magic byte is wrong or the header
/// is truncated.
pub fn decompressed_size(data: &[u8]) -> Result<usize> {
    header(data).map(|(size, _)| size)
}

fn header(data: &[u8]) -> Result<(usize, usize)> {
    if data.len() < 2 {
        return Err(Error::corrupt("RefPack: stream shorter than header"));
    }
    if data[1] != MAGIC {
        return Err(Error::corrupt(format!(
            "RefPack: invalid magic {:#04X}, expected {MAGIC:#04X}",
            data[1]
        )));
    }

    let size_len = if data[0] & FLAG_LARGE_SIZE != 0 { 4 } else { 3 };
    let size_bytes = data
        .get(2..2 + size_len)
        .ok_or_else(|| Error::corrupt("RefPack: truncated size field"))?;
    let size = size_bytes
        .iter()
        .fold(0usize, |acc, &b| (acc << 8) | usize::from(b));

    Ok((size, 2 + size_len))
}

/// Decompress a RefPack stream
///
/// # Errors
/// Returns [`Error::CorruptData`] on a bad magic byte, on commands that read
/// or write out of bounds, and when the output does not reach the size
/// declared in the header.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let (size, start) = header(data)?;
    let mut input = Input { data, pos: start };
    let mut output: Vec<u8> = Vec::with_capacity(size.min(MAX_PREALLOC));

    while input.has_more() {
        let command = input.command()?;

        if output.len() + command.literal + command.copy > size {
            return Err(Error::corrupt(format!(
                "RefPack: output overruns declared size {size}"
            )));
        }

        output.extend_from_slice(input.take(command.literal)?);

        if command.copy > 0 {
            if command.offset >= output.len() {
                return Err(Error::corrupt(format!(
                    "RefPack: back-reference {} before start of output ({} bytes written)",
                    command.offset + 1,
                    output.len()
                )));
            }
            // Source and destination may overlap, so this has to go one byte
            // at a time and read what it just wrote.
            for _ in 0..command.copy {
                let byte = output[output.len() - 1 - command.offset];
                output.push(byte);
            }
        }
    }

    if output.len() != size {
        return Err(Error::corrupt(format!(
            "RefPack: produced {} bytes, header declares {size}",
            output.len()
        )));
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_literal_block_and_stop() {
        // 0xE0: 4 literals, 0xFC: stop with no literals
        let data = [0x10, 0xFB, 0x00, 0x00, 0x04, 0xE0, b'a', b'b', b'c', b'd', 0xFC];
        assert_eq!(decompress(&data).unwrap(), b"abcd");
    }

    #[test]
    fn test_stop_with_trailing_literal() {
        let data = [0x10, 0xFB, 0x00, 0x00, 0x01, 0xFD, b'z'];
        assert_eq!(decompress(&data).unwrap(), b"z");
    }

    #[test]
    fn test_two_byte_overlapping_copy() {
        // 2 literals, copy 6 at distance 2
        let data = [0x10, 0xFB, 0x00, 0x00, 0x08, 0x0E, 0x01, b'a', b'b'];
        assert_eq!(decompress(&data).unwrap(), b"abababab");
    }

    #[test]
    fn test_run_length_copy() {
        // 1 literal, copy 5 at distance 1
        let data = [0x10, 0xFB, 0x00, 0x00, 0x06, 0x09, 0x00, b'x'];
        assert_eq!(decompress(&data).unwrap(), b"xxxxxx");
    }

    #[test]
    fn test_three_byte_command() {
        // 3 literals, copy 4 at distance 3
        let data = [0x10, 0xFB, 0x00, 0x00, 0x07, 0x80, 0xC0, 0x02, b'a', b'b', b'c'];
        assert_eq!(decompress(&data).unwrap(), b"abcabca");
    }

    #[test]
    fn test_four_byte_command() {
        // 2 literals, copy 5 at distance 2
        let data = [
            0x10, 0xFB, 0x00, 0x00, 0x07, 0xC2, 0x00, 0x01, 0x00, b'h', b'i',
        ];
        assert_eq!(decompress(&data).unwrap(), b"hihihih");
    }

    #[test]
    fn test_four_byte_long_copy() {
        // 1 literal, copy 256 + 39 + 5 = 300 at distance 1
        let data = [
            0x10, 0xFB, 0x00, 0x01, 0x2D, 0xC5, 0x00, 0x00, 39, b'q',
        ];
        let out = decompress(&data).unwrap();
        assert_eq!(out.len(), 301);
        assert!(out.iter().all(|&b| b == b'q'));
    }

    #[test]
    fn test_all_command_classes_with_large_size_field() {
        let data = [
            0x80, 0xFB, 0x00, 0x00, 0x00, 19, // header, 4-byte size
            0xE0, b'a', b'b', b'c', b'd', // 4 literals
            0x00, 0x03, // copy 3 at distance 4
            0x80, 0x40, 0x00, b'e', // 1 literal, copy 4 at distance 1
            0xC0, 0x00, 0x0B, 0x00, // copy 5 at distance 12
            0xFE, b'y', b'z', // stop with 2 literals
        ];
        let out = decompress(&data).unwrap();
        assert_eq!(out, b"abcdabceeeeeabcdayz");
        assert_eq!(out.len(), decompressed_size(&data).unwrap());
    }

    #[test]
    fn test_bad_magic_rejected() {
        let data = [0x10, 0xFA, 0x00, 0x00, 0x01, 0xFD, b'z'];
        assert!(matches!(decompress(&data), Err(Error::CorruptData { .. })));
    }

    #[test]
    fn test_short_output_rejected() {
        let data = [0x10, 0xFB, 0x00, 0x00, 0x05, 0xE0, b'a', b'b', b'c', b'd'];
        assert!(matches!(decompress(&data), Err(Error::CorruptData { .. })));
    }

    #[test]
    fn test_huge_declared_size_rejected() {
        let data = [0x80, 0xFB, 0xFF, 0xFF, 0xFF, 0xFF, 0xFD, b'z'];
        assert_eq!(decompressed_size(&data).unwrap(), 0xFFFF_FFFF);
        assert!(matches!(decompress(&data), Err(Error::CorruptData { .. })));
    }

    #[test]
    fn test_reference_before_start_rejected() {
        let data = [0x10, 0xFB, 0x00, 0x00, 0x03, 0x00, 0x05];
        assert!(matches!(decompress(&data), Err(Error::CorruptData { .. })));
    }

    #[test]
    fn test_truncated_literals_rejected() {
        let data = [0x10, 0xFB, 0x00, 0x00, 0x04, 0xE0, b'a'];
        assert!(matches!(decompress(&data), Err(Error::CorruptData { .. })));
    }
}
