//! The single-image raster container: a bare PNG file.

use std::io::{Read, Seek, Write};

use super::chunks::{self, PNG_SIGNATURE};
use super::entry::{EntryKind, IconEntry, Target};
use super::error::IconResult;
use super::icontype::leading_size;
use super::image::Image;
use super::reader::ByteRangeReader;

/// Tag given to the entry of a raster container.
pub const PNG_TAG: &str = "PNG";

/// Reads the one entry of a PNG file.
pub fn read_entries<R: Read + Seek>(
    reader: &mut ByteRangeReader<R>,
) -> IconResult<Vec<IconEntry>> {
    let signature = reader.read_exact_at(0, PNG_SIGNATURE.len())?;
    if signature != PNG_SIGNATURE {
        return Err(format_error!("not a PNG file (wrong signature)"));
    }
    let mut entry = IconEntry::new(PNG_TAG, 0, reader.len());
    read_raster(reader, &mut entry)?;
    Ok(vec![entry])
}

/// Validates the PNG stream in the entry's byte range and decodes its
/// pixels.  A structural failure is an error; a stream the `png` crate
/// cannot decode only leaves the entry as `NotAnIcon`.
pub(crate) fn read_raster<R: Read + Seek>(
    reader: &mut ByteRangeReader<R>,
    entry: &mut IconEntry,
) -> IconResult<()> {
    let info = chunks::scan(reader, entry.offset, entry.length)?;
    let description = info.description();
    entry.size = if info.width == info.height { info.width } else { 0 };
    entry.layout = Some(description.clone());
    entry.description = Some(description);
    let data = reader.read_exact_at(entry.offset, entry.length as usize)?;
    match Image::read_png(&data) {
        Ok(image) => {
            entry.kind = EntryKind::Raster;
            entry.image = Some(image);
        }
        Err(error) => {
            tracing::warn!(
                tag = %entry.tag,
                offset = entry.offset,
                %error,
                "undecodable PNG entry"
            );
            entry.kind = EntryKind::NotAnIcon;
        }
    }
    Ok(())
}

/// Writes the entry's pixels as a standalone PNG stream, copying the source
/// bytes unchanged when the entry already is one.  Returns the number of
/// bytes written.
pub(crate) fn write_raster<R: Read + Seek, W: Write>(
    entry: &IconEntry,
    source: &mut ByteRangeReader<R>,
    out: &mut W,
) -> IconResult<u64> {
    if entry.kind == EntryKind::Raster && entry.has_source_range() {
        return chunks::copy(source, entry.offset, entry.length, out);
    }
    let image = entry
        .image
        .as_ref()
        .ok_or_else(|| argument_error!("entry '{}' has no pixels to encode", entry.tag))?;
    let png = image.to_png()?;
    out.write_all(&png)?;
    Ok(png.len() as u64)
}

/// Writes the largest selected entry as a PNG file.  Nothing is written when
/// no entry qualifies.  Returns the number of bytes written.
pub fn write_entries<R: Read + Seek, W: Write>(
    entries: &mut [IconEntry],
    source: &mut ByteRangeReader<R>,
    out: &mut W,
) -> IconResult<u64> {
    let mut largest: Option<(usize, u32)> = None;
    for (index, entry) in entries.iter().enumerate() {
        if !entry.is_selected() {
            continue;
        }
        let size = entry
            .description
            .as_deref()
            .and_then(leading_size)
            .or_else(|| entry.output_size())
            .unwrap_or(0);
        if largest.map_or(true, |(_, best)| size > best) {
            largest = Some((index, size));
        }
    }
    let (index, size) = match largest {
        Some(found) => found,
        None => return Ok(0),
    };
    let entry = &mut entries[index];
    entry.target = Target::Encode(EntryKind::Raster);
    let written = write_raster(entry, source, out)?;
    tracing::debug!(index, size, length = written, "wrote PNG entry");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn source(bytes: Vec<u8>) -> ByteRangeReader<Cursor<Vec<u8>>> {
        ByteRangeReader::new(Cursor::new(bytes)).unwrap()
    }

    fn solid(side: u32, value: u8) -> Image {
        Image::from_rgba_data(side, side, vec![value; (4 * side * side) as usize]).unwrap()
    }

    #[test]
    fn reads_single_entry() {
        let png = solid(32, 200).to_png().unwrap();
        let length = png.len() as u64;
        let entries = read_entries(&mut source(png)).unwrap();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.kind, EntryKind::Raster);
        assert_eq!((entry.offset, entry.length), (0, length));
        assert_eq!(entry.tag, "PNG");
        assert_eq!(entry.size, 32);
        assert_eq!(entry.description.as_deref(), Some("32 PNG"));
        assert_eq!(entry.image, Some(solid(32, 200)));
    }

    #[test]
    fn rejects_wrong_signature() {
        let mut png = solid(16, 1).to_png().unwrap();
        png[7] = 0;
        assert!(read_entries(&mut source(png)).unwrap_err().is_format());
        assert!(read_entries(&mut source(b"\x89PNG".to_vec())).unwrap_err().is_format());
    }

    #[test]
    fn writes_largest_entry() {
        let mut entries = vec![
            IconEntry::from_image(solid(16, 1)),
            IconEntry::from_image(solid(48, 2)),
            IconEntry::from_image(solid(48, 3)),
            IconEntry::from_image(solid(32, 4)),
        ];
        let mut empty = source(Vec::new());
        let mut out = Vec::new();
        let written = write_entries(&mut entries, &mut empty, &mut out).unwrap();
        assert_eq!(written, out.len() as u64);
        assert_eq!(Image::read_png(&out).unwrap(), solid(48, 2));
        assert_eq!(entries[1].target, Target::Encode(EntryKind::Raster));
        assert_eq!(entries[2].target, Target::Unset);
    }

    #[test]
    fn nothing_selected_writes_nothing() {
        let mut entries = vec![IconEntry::from_image(solid(16, 1))];
        entries[0].target = Target::Omit;
        entries.push(IconEntry::new("TOC ", 8, 16));
        let mut out = Vec::new();
        assert_eq!(write_entries(&mut entries, &mut source(Vec::new()), &mut out).unwrap(), 0);
        assert!(out.is_empty());
    }

    #[test]
    fn raster_sources_are_copied_verbatim() {
        let png = solid(24, 77).to_png().unwrap();
        let mut reader = source(png.clone());
        let mut entries = read_entries(&mut reader).unwrap();
        let mut out = Vec::new();
        write_entries(&mut entries, &mut reader, &mut out).unwrap();
        assert_eq!(out, png);
    }
}
