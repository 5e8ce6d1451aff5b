//! The Apple icon family container (`.icns`).
//!
//! A family is an 8-byte header (`icns` and the big-endian length of the
//! whole file) followed by a flat run of elements, each an OSType and a
//! big-endian length that counts its own 8-byte header.

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};
use std::io::{Read, Seek, SeekFrom, Write};

use super::chunks;
use super::container::ReadOptions;
use super::entry::{EntryKind, IconEntry, Target};
use super::error::IconResult;
use super::icontype::{self, leading_size, OSType};
use super::image::Image;
use super::pngfile;
use super::reader::ByteRangeReader;
use super::rle::{self, ARGB_MAGIC};

/// The first four bytes of an ICNS file.
pub const ICNS_MAGIC_LITERAL: &[u8; 4] = b"icns";

/// The length of an icon family header, in bytes.
const ICON_FAMILY_HEADER_LENGTH: u64 = 8;

/// The length of an icon element header, in bytes.
const ICON_ELEMENT_HEADER_LENGTH: u64 = 8;

/// The JPEG 2000 signature box that starts a JPEG 2000 element.
const JPEG_2000_SIGNATURE: [u8; 8] = [0, 0, 0, 0x0c, b'j', b'P', b' ', b' '];

/// Reads every element of an icon family, then joins each 24-bit RGB
/// element with its mask.
pub fn read_entries<R: Read + Seek>(
    reader: &mut ByteRangeReader<R>,
    options: &ReadOptions,
) -> IconResult<Vec<IconEntry>> {
    let header = reader.read_exact_at(0, ICON_FAMILY_HEADER_LENGTH as usize)?;
    if &header[0..4] != ICNS_MAGIC_LITERAL {
        return Err(format_error!("not an icns file (wrong magic literal)"));
    }
    let file_length = BigEndian::read_u32(&header[4..8]) as u64;
    if file_length != reader.len() {
        return Err(format_error!(
            "icns header declares {} bytes but the file holds {}",
            file_length,
            reader.len()
        ));
    }
    let mut entries = Vec::new();
    let mut position = ICON_FAMILY_HEADER_LENGTH;
    while position < reader.len() {
        let head = reader.read_exact_at(position, ICON_ELEMENT_HEADER_LENGTH as usize)?;
        let ostype = OSType([head[0], head[1], head[2], head[3]]);
        let length = BigEndian::read_u32(&head[4..8]) as u64;
        if length < ICON_ELEMENT_HEADER_LENGTH || position + length > reader.len() {
            return Err(format_error!(
                "'{}' element at offset {} has invalid length {}",
                ostype,
                position,
                length
            ));
        }
        let mut entry = IconEntry::new(
            ostype.to_string(),
            position + ICON_ELEMENT_HEADER_LENGTH,
            length - ICON_ELEMENT_HEADER_LENGTH,
        );
        entry.description = icontype::describe(ostype).map(str::to_string);
        classify(reader, ostype, &mut entry)?;
        tracing::debug!(
            tag = %ostype,
            offset = position,
            length,
            kind = %entry.kind,
            "icns element"
        );
        entries.push(entry);
        position += length;
    }
    join_masks(reader, &mut entries, options)?;
    Ok(entries)
}

fn classify<R: Read + Seek>(
    reader: &mut ByteRangeReader<R>,
    ostype: OSType,
    entry: &mut IconEntry,
) -> IconResult<()> {
    let peek = reader.read_at(entry.offset, JPEG_2000_SIGNATURE.len())?;
    let side = entry.description.as_deref().and_then(leading_size).unwrap_or(0);
    if chunks::has_signature(&peek) {
        pngfile::read_raster(reader, entry)?;
    } else if peek == JPEG_2000_SIGNATURE {
        entry.description = Some(format!("{} JPEG 2000", side));
    } else if ostype.is_rgb24() {
        // Pixels are decoded once every mask has been seen.
        entry.kind = EntryKind::PlanarRgb;
        entry.size = side;
        entry.description = Some(format!("{} 24-bit APPLE", side));
        entry.layout = Some(format!("{} 32-bit", side));
    } else if ostype.may_hold_argb() && peek.starts_with(ARGB_MAGIC) {
        entry.description = Some(format!("{} 32-bit ARGB", side));
        entry.layout = Some(format!("{} 32-bit", side));
        let data = reader.read_exact_at(entry.offset, entry.length as usize)?;
        match rle::decode_argb(&data, side) {
            Ok(image) => {
                entry.kind = EntryKind::PlanarArgb;
                entry.size = side;
                entry.image = Some(image);
            }
            Err(error) => {
                tracing::warn!(tag = %ostype, %error, "undecodable ARGB element");
            }
        }
    } else if ostype == OSType::TABLE_OF_CONTENTS {
        entry.kind = EntryKind::TableOfContents;
    }
    Ok(())
}

fn join_masks<R: Read + Seek>(
    reader: &mut ByteRangeReader<R>,
    entries: &mut [IconEntry],
    options: &ReadOptions,
) -> IconResult<()> {
    for index in 0..entries.len() {
        if entries[index].kind != EntryKind::PlanarRgb {
            continue;
        }
        match join_mask(reader, entries, index) {
            Ok(image) => entries[index].image = Some(image),
            Err(error) => {
                if options.strict_masks {
                    return Err(error);
                }
                let tag = &entries[index].tag;
                tracing::warn!(%tag, %error, "RGB element without usable mask");
                entries[index].kind = EntryKind::NotAnIcon;
            }
        }
    }
    Ok(())
}

fn join_mask<R: Read + Seek>(
    reader: &mut ByteRangeReader<R>,
    entries: &[IconEntry],
    index: usize,
) -> IconResult<Image> {
    let entry = &entries[index];
    let layout = entry.layout.as_deref().unwrap_or("");
    let mask_type = icontype::resolve(layout, &entry.tag)
        .and_then(|found| found.mask)
        .ok_or_else(|| format_error!("no mask type pairs with '{}' elements", entry.tag))?;
    let mask_tag = mask_type.to_string();
    let mask = entries
        .iter()
        .find(|candidate| candidate.tag == mask_tag)
        .ok_or_else(|| format_error!("'{}' element has no '{}' mask", entry.tag, mask_tag))?;
    let data = reader.read_exact_at(entry.offset, entry.length as usize)?;
    let alpha = reader.read_exact_at(mask.offset, mask.length as usize)?;
    rle::decode_rgb(&data, &alpha, entry.size)
}

/// One element to be written.
struct PlannedElement {
    index: usize,
    ostype: OSType,
    kind: EntryKind,
}

/// Writes the selected entries as an icon family, adding a table of
/// contents when more than one element is written.  Entries whose layout
/// no element type stores are left out.  Returns the number of bytes
/// written, or 0 if nothing was selected.
pub fn write_entries<R: Read + Seek, W: Write + Seek>(
    entries: &mut [IconEntry],
    source: &mut ByteRangeReader<R>,
    out: &mut W,
) -> IconResult<u64> {
    let plan = plan_elements(entries);
    if plan.is_empty() {
        return Ok(0);
    }
    let with_toc = plan.len() > 1;
    let toc_length = ICON_ELEMENT_HEADER_LENGTH * (plan.len() as u64 + 1);
    out.write_all(ICNS_MAGIC_LITERAL)?;
    out.write_u32::<BigEndian>(0)?;
    if with_toc {
        out.write_all(&vec![0u8; toc_length as usize])?;
    }
    let mut lengths = Vec::with_capacity(plan.len());
    for element in &plan {
        let length = write_element(&entries[element.index], element, source, out)?;
        tracing::debug!(tag = %element.ostype, kind = %element.kind, length, "wrote icns element");
        lengths.push(length);
    }
    let total = out.seek(SeekFrom::End(0))?;
    out.seek(SeekFrom::Start(4))?;
    out.write_u32::<BigEndian>(checked_length(total)?)?;
    if with_toc {
        out.write_all(&OSType::TABLE_OF_CONTENTS.0)?;
        out.write_u32::<BigEndian>(checked_length(toc_length)?)?;
        for (element, &length) in plan.iter().zip(&lengths) {
            out.write_all(&element.ostype.0)?;
            out.write_u32::<BigEndian>(length)?;
        }
    }
    out.seek(SeekFrom::End(0))?;
    Ok(total)
}

fn plan_elements(entries: &mut [IconEntry]) -> Vec<PlannedElement> {
    let mut plan = Vec::new();
    for (index, entry) in entries.iter_mut().enumerate() {
        if !entry.is_selected() {
            continue;
        }
        let layout = match entry.output_layout() {
            Some(layout) => layout,
            None => {
                tracing::warn!(index, tag = %entry.tag, "entry has no layout; dropped");
                continue;
            }
        };
        let found = match icontype::resolve(&layout, &entry.tag) {
            Some(found) => found,
            None => {
                tracing::warn!(index, %layout, "no icns element type stores this layout; dropped");
                continue;
            }
        };
        if !fits_layout(entry, &layout) {
            tracing::warn!(index, %layout, "image dimensions do not match the layout; dropped");
            continue;
        }
        entry.target = Target::Encode(found.kind);
        plan.push(PlannedElement {
            index,
            ostype: found.ostype,
            kind: found.kind,
        });
        if let Some(mask) = found.mask {
            plan.push(PlannedElement {
                index,
                ostype: mask,
                kind: EntryKind::PlanarMask,
            });
        }
    }
    plan
}

/// Every element type holds a square image of the side its layout names.
fn fits_layout(entry: &IconEntry, layout: &str) -> bool {
    match (&entry.image, leading_size(layout)) {
        (Some(image), Some(side)) => image.is_square() && image.width() == side,
        _ => false,
    }
}

/// Writes one element, header included, and returns its length.
fn write_element<R: Read + Seek, W: Write>(
    entry: &IconEntry,
    element: &PlannedElement,
    source: &mut ByteRangeReader<R>,
    out: &mut W,
) -> IconResult<u32> {
    if element.kind == EntryKind::Raster {
        let mut payload = Vec::new();
        pngfile::write_raster(entry, source, &mut payload)?;
        return write_payload(element.ostype, &payload, out);
    }
    let image = entry
        .image
        .as_ref()
        .ok_or_else(|| argument_error!("entry '{}' has no pixels to encode", entry.tag))?;
    let payload = match element.kind {
        EntryKind::PlanarRgb => rle::encode_rgb(image),
        EntryKind::PlanarMask => rle::encode_mask(image),
        EntryKind::PlanarArgb => rle::encode_argb(image),
        other => {
            return Err(argument_error!("cannot write a {} icns element", other));
        }
    };
    write_payload(element.ostype, &payload, out)
}

fn write_payload<W: Write>(ostype: OSType, payload: &[u8], out: &mut W) -> IconResult<u32> {
    let length = checked_length(payload.len() as u64 + ICON_ELEMENT_HEADER_LENGTH)?;
    out.write_all(&ostype.0)?;
    out.write_u32::<BigEndian>(length)?;
    out.write_all(payload)?;
    Ok(length)
}

fn checked_length(length: u64) -> IconResult<u32> {
    u32::try_from(length).map_err(|_| argument_error!("icns data of {} bytes is too large", length))
}
