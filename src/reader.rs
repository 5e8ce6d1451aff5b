//! Random access to the byte ranges of a container's backing stream.

use std::io::{self, Read, Seek, SeekFrom, Write};

use super::error::IconResult;

/// Largest block moved at once by [`ByteRangeReader::copy_to`].
const COPY_BLOCK_LENGTH: usize = 0x4000;

/// Random access to byte ranges of a container's backing stream.
///
/// The reader owns the stream; dropping it releases the underlying handle.
pub struct ByteRangeReader<R> {
    inner: R,
    length: u64,
}

impl<R: Read + Seek> ByteRangeReader<R> {
    /// Wraps a stream, measuring its total length.
    pub fn new(mut inner: R) -> io::Result<ByteRangeReader<R>> {
        let length = inner.seek(SeekFrom::End(0))?;
        Ok(ByteRangeReader { inner, length })
    }

    /// Returns the total length of the stream, in bytes.
    pub fn len(&self) -> u64 {
        self.length
    }

    /// Returns true if the stream holds no bytes at all.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Reads up to `length` bytes starting at `offset`.  Fewer bytes are
    /// returned when the range runs past the end of the stream.
    pub fn read_at(&mut self, offset: u64, length: usize) -> io::Result<Vec<u8>> {
        let mut buffer = Vec::with_capacity(length.min(COPY_BLOCK_LENGTH));
        if offset < self.length {
            self.inner.seek(SeekFrom::Start(offset))?;
            self.inner
                .by_ref()
                .take(length as u64)
                .read_to_end(&mut buffer)?;
        }
        Ok(buffer)
    }

    /// Reads exactly `length` bytes starting at `offset`.  A range that does
    /// not lie entirely inside the stream is a format error; nothing is read
    /// in that case.
    pub fn read_exact_at(&mut self, offset: u64, length: usize) -> IconResult<Vec<u8>> {
        let end = offset.checked_add(length as u64);
        if end.map_or(true, |end| end > self.length) {
            return Err(format_error!(
                "range of {} bytes at offset {} exceeds stream length {}",
                length,
                offset,
                self.length
            ));
        }
        let buffer = self.read_at(offset, length)?;
        if buffer.len() != length {
            return Err(format_error!("short read at offset {}", offset));
        }
        Ok(buffer)
    }

    /// Copies `length` bytes starting at `offset` into `out`, in blocks.
    pub fn copy_to<W: Write>(&mut self, offset: u64, length: u64, out: &mut W) -> IconResult<()> {
        let mut copied = 0u64;
        while copied < length {
            let block = (length - copied).min(COPY_BLOCK_LENGTH as u64) as usize;
            let buffer = self.read_exact_at(offset + copied, block)?;
            out.write_all(&buffer)?;
            copied += block as u64;
        }
        Ok(())
    }
}
