//! Structural validation of PNG streams: walks the length-prefixed,
//! CRC-suffixed chunk sequence without decompressing any pixels.

use byteorder::{BigEndian, ByteOrder};
use std::io::{Read, Seek, Write};

use super::error::IconResult;
use super::reader::ByteRangeReader;

/// The eight bytes every PNG stream starts with.
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

/// Density, in pixels per meter, flagged with a `²` in descriptions.
pub const SQUARE_DENSITY: u32 = 2835;

const IHDR: &[u8; 4] = b"IHDR";
const PHYS: &[u8; 4] = b"pHYs";
const IEND: &[u8; 4] = b"IEND";

/// Bytes of framing around every chunk payload: length, tag and CRC.
const CHUNK_OVERHEAD: u64 = 12;

/// What a validated PNG stream says about its image.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RasterInfo {
    /// Image width, in pixels.
    pub width: u32,
    /// Image height, in pixels.
    pub height: u32,
    /// Horizontal and vertical density in pixels per meter, if declared.
    pub density: Option<(u32, u32)>,
}

impl RasterInfo {
    /// Returns true if both axes declare exactly [`SQUARE_DENSITY`].
    pub fn is_square_density(&self) -> bool {
        self.density == Some((SQUARE_DENSITY, SQUARE_DENSITY))
    }

    /// Returns a description such as `"256 PNG"`, `"16x32 PNG"` or
    /// `"512² PNG"`.
    pub fn description(&self) -> String {
        let mut text = self.width.to_string();
        if self.width != self.height {
            text.push_str(&format!("x{}", self.height));
        }
        if self.is_square_density() {
            text.push('²');
        }
        text.push_str(" PNG");
        text
    }
}

/// Returns true if `data` begins with the PNG signature.
pub fn has_signature(data: &[u8]) -> bool {
    data.starts_with(&PNG_SIGNATURE)
}

/// Validates the PNG stream of `size` bytes (signature included) that starts
/// at `offset`, checking the CRC of every chunk up to and including `IEND`,
/// and returns the dimensions and density it declares.
pub fn scan<R: Read + Seek>(
    reader: &mut ByteRangeReader<R>,
    offset: u64,
    size: u64,
) -> IconResult<RasterInfo> {
    let signature = reader.read_exact_at(offset, PNG_SIGNATURE.len())?;
    if signature != PNG_SIGNATURE {
        return Err(format_error!("missing PNG signature at offset {}", offset));
    }
    let start = offset + PNG_SIGNATURE.len() as u64;
    let limit = offset + size;
    let mut position = start;
    let mut info = RasterInfo {
        width: 0,
        height: 0,
        density: None,
    };
    loop {
        let length = BigEndian::read_u32(&reader.read_exact_at(position, 4)?) as u64;
        if position + length + CHUNK_OVERHEAD > limit {
            return Err(format_error!(
                "PNG chunk at offset {} runs past the end of its {}-byte entry",
                position,
                size
            ));
        }
        let body = reader.read_exact_at(position + 4, length as usize + 4)?;
        let stored = BigEndian::read_u32(&reader.read_exact_at(position + 8 + length, 4)?);
        if crc32fast::hash(&body) != stored {
            return Err(format_error!("PNG chunk CRC mismatch at offset {}", position));
        }
        let (tag, payload) = body.split_at(4);
        let name = String::from_utf8_lossy(tag);
        tracing::trace!(offset = position, length, tag = %name, "PNG chunk");
        position += length + CHUNK_OVERHEAD;
        if tag == IHDR && payload.len() >= 8 {
            info.width = BigEndian::read_u32(&payload[0..4]);
            info.height = BigEndian::read_u32(&payload[4..8]);
        } else if tag == PHYS && payload.len() >= 8 {
            info.density = Some((
                BigEndian::read_u32(&payload[0..4]),
                BigEndian::read_u32(&payload[4..8]),
            ));
        } else if tag == IEND {
            break;
        }
    }
    if position != limit {
        return Err(format_error!(
            "PNG stream ends after {} bytes but its entry declares {}",
            position - offset,
            size
        ));
    }
    Ok(info)
}

/// Copies the PNG stream of `size` bytes at `offset` to `out` verbatim,
/// following chunk boundaries to know how much to move.  Returns the number
/// of bytes copied.
pub fn copy<R: Read + Seek, W: Write>(
    reader: &mut ByteRangeReader<R>,
    offset: u64,
    size: u64,
    out: &mut W,
) -> IconResult<u64> {
    let signature_length = PNG_SIGNATURE.len() as u64;
    reader.copy_to(offset, signature_length, out)?;
    let mut copied = signature_length;
    while copied < size {
        let head = reader.read_exact_at(offset + copied, 8)?;
        let length = BigEndian::read_u32(&head[0..4]) as u64;
        if copied + length + CHUNK_OVERHEAD > size {
            return Err(format_error!(
                "PNG chunk at offset {} runs past the end of its {}-byte entry",
                offset + copied,
                size
            ));
        }
        reader.copy_to(offset + copied, length + CHUNK_OVERHEAD, out)?;
        copied += length + CHUNK_OVERHEAD;
    }
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::WriteBytesExt;
    use std::io::Cursor;

    fn chunk(tag: &[u8; 4], payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.write_u32::<BigEndian>(payload.len() as u32).unwrap();
        out.extend_from_slice(tag);
        out.extend_from_slice(payload);
        let mut crc = crc32fast::Hasher::new();
        crc.update(tag);
        crc.update(payload);
        out.write_u32::<BigEndian>(crc.finalize()).unwrap();
        out
    }

    fn stream(width: u32, height: u32, density: Option<u32>) -> Vec<u8> {
        let mut ihdr = Vec::new();
        ihdr.write_u32::<BigEndian>(width).unwrap();
        ihdr.write_u32::<BigEndian>(height).unwrap();
        ihdr.extend_from_slice(&[8, 6, 0, 0, 0]);
        let mut out = PNG_SIGNATURE.to_vec();
        out.extend(chunk(IHDR, &ihdr));
        if let Some(ppm) = density {
            let mut phys = Vec::new();
            phys.write_u32::<BigEndian>(ppm).unwrap();
            phys.write_u32::<BigEndian>(ppm).unwrap();
            phys.push(1);
            out.extend(chunk(PHYS, &phys));
        }
        out.extend(chunk(b"IDAT", &[0x78, 0x9c, 0x03, 0x00]));
        out.extend(chunk(IEND, &[]));
        out
    }

    fn reader(bytes: Vec<u8>) -> ByteRangeReader<Cursor<Vec<u8>>> {
        ByteRangeReader::new(Cursor::new(bytes)).unwrap()
    }

    #[test]
    fn scan_reads_dimensions_and_density() {
        let data = stream(48, 48, None);
        let size = data.len() as u64;
        let info = scan(&mut reader(data), 0, size).unwrap();
        assert_eq!((info.width, info.height, info.density), (48, 48, None));
        assert_eq!(info.description(), "48 PNG");

        let data = stream(512, 256, Some(SQUARE_DENSITY));
        let size = data.len() as u64;
        let info = scan(&mut reader(data), 0, size).unwrap();
        assert_eq!(info.density, Some((2835, 2835)));
        assert_eq!(info.description(), "512x256² PNG");

        let data = stream(32, 32, Some(5669));
        let size = data.len() as u64;
        assert_eq!(scan(&mut reader(data), 0, size).unwrap().description(), "32 PNG");
    }

    #[test]
    fn scan_at_nonzero_offset() {
        let mut data = b"prefix!!".to_vec();
        let png = stream(16, 16, None);
        let size = png.len() as u64;
        data.extend(png);
        data.extend_from_slice(b"trailing");
        let info = scan(&mut reader(data), 8, size).unwrap();
        assert_eq!(info.width, 16);
    }

    #[test]
    fn every_flipped_payload_byte_fails_the_crc() {
        let data = stream(16, 16, Some(SQUARE_DENSITY));
        let size = data.len() as u64;
        // Tag and payload of IHDR start after signature + length field.
        for index in 12..29 {
            let mut corrupt = data.clone();
            corrupt[index] ^= 0x01;
            let error = scan(&mut reader(corrupt), 0, size).unwrap_err();
            assert!(error.is_format(), "byte {}", index);
        }
    }

    #[test]
    fn size_mismatch_is_rejected() {
        let data = stream(16, 16, None);
        let size = data.len() as u64;
        assert!(scan(&mut reader(data.clone()), 0, size - 1).unwrap_err().is_format());
        let mut padded = data.clone();
        padded.extend_from_slice(&[0; 4]);
        assert!(scan(&mut reader(padded), 0, size + 4).unwrap_err().is_format());
    }

    #[test]
    fn truncated_length_header_is_rejected() {
        let data = stream(16, 16, None);
        let cut = data[..data.len() - 14].to_vec();
        let size = data.len() as u64;
        assert!(scan(&mut reader(cut), 0, size).unwrap_err().is_format());
    }

    #[test]
    fn missing_signature_is_rejected() {
        let mut data = stream(16, 16, None);
        data[1] = b'Q';
        let size = data.len() as u64;
        assert!(scan(&mut reader(data), 0, size).unwrap_err().is_format());
    }

    #[test]
    fn copy_is_verbatim() {
        let png = stream(24, 24, Some(SQUARE_DENSITY));
        let mut data = vec![0xee; 5];
        data.extend_from_slice(&png);
        let mut out = Vec::new();
        let copied = copy(&mut reader(data), 5, png.len() as u64, &mut out).unwrap();
        assert_eq!(copied, png.len() as u64);
        assert_eq!(out, png);
    }
}
