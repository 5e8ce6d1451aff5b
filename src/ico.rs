//! The Microsoft icon container (`.ico`).
//!
//! A 6-byte header (reserved zero, type 1, image count) is followed by one
//! 16-byte little-endian directory record per image, then the image data.
//! Each image is either a PNG stream or a device-independent bitmap.

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Seek, SeekFrom, Write};

use super::bitmap;
use super::chunks;
use super::entry::{EntryKind, IconEntry, Target};
use super::error::{truncated, IconResult};
use super::icontype::leading_size;
use super::pngfile;
use super::reader::ByteRangeReader;

/// The first four bytes of an ICO file.
pub const ICO_MAGIC: [u8; 4] = [0, 0, 1, 0];

/// Tag given to every entry of a Microsoft container.
pub const ICO_TAG: &str = "ICO";

const ICONDIR_HEADER_LENGTH: u64 = 6;
const ICONDIR_ENTRY_LENGTH: u64 = 16;

/// Value of the type field for icons (cursors use 2).
const RESOURCE_TYPE_ICON: u16 = 1;

/// Directory counts must stay below this.
const MAX_ENTRIES: usize = 256;

/// Largest side a bitmap entry may have.
const MAX_BITMAP_SIDE: u32 = 256;

/// One record of the image directory.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct DirEntry {
    width: u8,
    height: u8,
    colors: u8,
    reserved: u8,
    planes: u16,
    bits_per_pixel: u16,
    data_size: u32,
    data_offset: u32,
}

impl DirEntry {
    fn for_icon(size: u32, data_size: u32, data_offset: u32) -> DirEntry {
        // A dimension of 256 is stored as 0.
        let side = if size < 256 { size as u8 } else { 0 };
        DirEntry {
            width: side,
            height: side,
            colors: 0,
            reserved: 0,
            planes: 1,
            bits_per_pixel: 32,
            data_size,
            data_offset,
        }
    }

    fn read<R: Read>(mut reader: R) -> io::Result<DirEntry> {
        Ok(DirEntry {
            width: reader.read_u8()?,
            height: reader.read_u8()?,
            colors: reader.read_u8()?,
            reserved: reader.read_u8()?,
            planes: reader.read_u16::<LittleEndian>()?,
            bits_per_pixel: reader.read_u16::<LittleEndian>()?,
            data_size: reader.read_u32::<LittleEndian>()?,
            data_offset: reader.read_u32::<LittleEndian>()?,
        })
    }

    fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_u8(self.width)?;
        writer.write_u8(self.height)?;
        writer.write_u8(self.colors)?;
        writer.write_u8(self.reserved)?;
        writer.write_u16::<LittleEndian>(self.planes)?;
        writer.write_u16::<LittleEndian>(self.bits_per_pixel)?;
        writer.write_u32::<LittleEndian>(self.data_size)?;
        writer.write_u32::<LittleEndian>(self.data_offset)?;
        Ok(())
    }

    /// Describes the record, e.g. `"48 32-bit RGBA"` or `"16 16 mask"`.
    /// `width` replaces the stored width, which is 0 for 256-pixel images.
    fn description(&self, width: i64) -> String {
        let mut text = width.to_string();
        if self.width != self.height {
            text.push_str(&format!("x{}", self.height));
        }
        if self.colors == 0 {
            text.push_str(&format!(" {}-bit RGB", self.bits_per_pixel));
            if self.bits_per_pixel == 32 {
                text.push('A');
            }
        } else {
            text.push_str(&format!(" {} mask", self.colors));
        }
        text
    }
}

/// Reads the directory of an ICO file and decodes every PNG or 32-bit
/// bitmap it points at.
pub fn read_entries<R: Read + Seek>(
    reader: &mut ByteRangeReader<R>,
) -> IconResult<Vec<IconEntry>> {
    let header = reader.read_exact_at(0, ICONDIR_HEADER_LENGTH as usize)?;
    let reserved = LittleEndian::read_u16(&header[0..2]);
    let resource_type = LittleEndian::read_u16(&header[2..4]);
    let count = LittleEndian::read_u16(&header[4..6]) as usize;
    if reserved != 0 || resource_type != RESOURCE_TYPE_ICON || count == 0 || count >= MAX_ENTRIES {
        return Err(format_error!(
            "not an ico file (reserved {}, type {}, {} images)",
            reserved,
            resource_type,
            count
        ));
    }
    let mut entries = Vec::with_capacity(count);
    for index in 0..count {
        let position = ICONDIR_HEADER_LENGTH + ICONDIR_ENTRY_LENGTH * index as u64;
        let raw = reader.read_exact_at(position, ICONDIR_ENTRY_LENGTH as usize)?;
        let record = DirEntry::read(&raw[..]).map_err(truncated("directory record"))?;
        let offset = record.data_offset as u64;
        let length = record.data_size as u64;
        if offset + length > reader.len() {
            return Err(format_error!(
                "image {} ({} bytes at offset {}) runs past the end of the {}-byte file",
                index,
                length,
                offset,
                reader.len()
            ));
        }
        let mut entry = IconEntry::new(ICO_TAG, offset, length);
        entry.description = Some(record.description(record.width as i64));
        let peek = reader.read_at(offset, 8)?;
        if chunks::has_signature(&peek) {
            pngfile::read_raster(reader, &mut entry)?;
        } else if peek.len() == 8 && LittleEndian::read_u32(&peek[0..4]) == bitmap::HEADER_LENGTH {
            classify_bitmap(reader, &record, &peek, &mut entry)?;
        }
        tracing::debug!(index, offset, length, kind = %entry.kind, "ico image");
        entries.push(entry);
    }
    Ok(entries)
}

fn classify_bitmap<R: Read + Seek>(
    reader: &mut ByteRangeReader<R>,
    record: &DirEntry,
    peek: &[u8],
    entry: &mut IconEntry,
) -> IconResult<()> {
    if record.width == 0 && record.height == 0 {
        let width = LittleEndian::read_i32(&peek[4..8]);
        entry.description = Some(record.description(width as i64));
    }
    let description = entry.description.clone().unwrap_or_default();
    let layout = description
        .strip_suffix(" RGBA")
        .or_else(|| description.strip_suffix(" RGB"))
        .unwrap_or(&description)
        .to_string();
    let side = leading_size(&layout).unwrap_or(0);
    entry.layout = Some(layout);
    let expected = bitmap::bitmap_length(side).map(u64::from);
    if side == 0 || side > MAX_BITMAP_SIDE || Some(entry.length) != expected {
        return Ok(());
    }
    let data = reader.read_exact_at(entry.offset, entry.length as usize)?;
    match bitmap::decode(&data, side) {
        Ok(image) => {
            entry.kind = EntryKind::PaddedBitmap;
            entry.size = side;
            entry.image = Some(image);
        }
        Err(error) => {
            tracing::warn!(offset = entry.offset, %error, "undecodable bitmap image");
        }
    }
    Ok(())
}

/// Writes the selected entries as an ICO file.  Entries laid out as PNG
/// become PNG images; all others become 32-bit bitmaps.  Returns the number
/// of bytes written, or 0 if nothing was selected.
pub fn write_entries<R: Read + Seek, W: Write + Seek>(
    entries: &mut [IconEntry],
    source: &mut ByteRangeReader<R>,
    out: &mut W,
) -> IconResult<u64> {
    let mut plan = Vec::new();
    for (index, entry) in entries.iter_mut().enumerate() {
        if !entry.is_selected() {
            continue;
        }
        let size = match entry.output_size() {
            Some(size) if size > 0 => size,
            _ => {
                tracing::warn!(index, tag = %entry.tag, "entry has no size; dropped");
                continue;
            }
        };
        let kind = if entry.wants_raster() {
            EntryKind::Raster
        } else {
            EntryKind::PaddedBitmap
        };
        if kind == EntryKind::PaddedBitmap {
            let fits = entry
                .image
                .as_ref()
                .map_or(false, |image| image.is_square() && image.width() == size);
            if !fits {
                tracing::warn!(
                    index,
                    size,
                    "image dimensions do not match the bitmap size; dropped"
                );
                continue;
            }
        }
        entry.target = Target::Encode(kind);
        plan.push((index, kind, size));
    }
    if plan.is_empty() {
        return Ok(0);
    }
    if plan.len() >= MAX_ENTRIES {
        return Err(argument_error!("an ico file holds at most {} images", MAX_ENTRIES - 1));
    }
    out.write_u16::<LittleEndian>(0)?;
    out.write_u16::<LittleEndian>(RESOURCE_TYPE_ICON)?;
    out.write_u16::<LittleEndian>(plan.len() as u16)?;
    let directory_length = ICONDIR_ENTRY_LENGTH * plan.len() as u64;
    out.write_all(&vec![0u8; directory_length as usize])?;
    let mut offset = ICONDIR_HEADER_LENGTH + directory_length;
    let mut records = Vec::with_capacity(plan.len());
    for &(index, kind, size) in &plan {
        let entry = &entries[index];
        let length = if kind == EntryKind::Raster {
            pngfile::write_raster(entry, source, out)?
        } else {
            let image = entry
                .image
                .as_ref()
                .ok_or_else(|| argument_error!("entry {} has no pixels to encode", index))?;
            let data = bitmap::encode(image)?;
            out.write_all(&data)?;
            data.len() as u64
        };
        tracing::debug!(index, kind = %kind, size, offset, length, "wrote ico image");
        let record = DirEntry::for_icon(size, checked_length(length)?, checked_length(offset)?);
        records.push(record);
        offset += length;
    }
    let total = out.seek(SeekFrom::End(0))?;
    out.seek(SeekFrom::Start(ICONDIR_HEADER_LENGTH))?;
    for record in &records {
        record.write(&mut *out)?;
    }
    out.seek(SeekFrom::End(0))?;
    Ok(total)
}

fn checked_length(length: u64) -> IconResult<u32> {
    u32::try_from(length).map_err(|_| argument_error!("ico data of {} bytes is too large", length))
}
