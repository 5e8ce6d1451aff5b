//! The device-independent bitmap layout used for non-PNG images inside ICO
//! files: a 40-byte header, 32-bit BGRA rows stored bottom-up, then a 1-bit
//! AND mask, also bottom-up.  Every row is padded to a 4-byte boundary.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

use super::error::{truncated, IconResult};
use super::image::Image;

/// The length of the device header, in bytes.
pub const HEADER_LENGTH: u32 = 40;

/// Horizontal and vertical resolution written into every header (72 DPI).
pub const PIXELS_PER_METER: i32 = 2835;

/// Pixels with an alpha value below this are marked transparent in the mask.
const MASK_ALPHA_THRESHOLD: u8 = 128;

/// The 40-byte header at the start of every bitmap entry.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BitmapHeader {
    /// Size of this header, in bytes.
    pub header_size: u32,
    /// Width of the image, in pixels.
    pub width: i32,
    /// Twice the image height; the bitmap is followed by a mask of the same
    /// height.
    pub height: i32,
    /// Number of color planes (always 1).
    pub planes: u16,
    /// Bits per pixel.
    pub bit_count: u16,
    /// Compression method (0 for none).
    pub compression: u32,
    /// Size of pixel rows plus mask rows, in bytes.
    pub image_size: u32,
    /// Horizontal resolution, in pixels per meter.
    pub x_pixels_per_meter: i32,
    /// Vertical resolution, in pixels per meter.
    pub y_pixels_per_meter: i32,
    /// Number of palette colors used.
    pub colors_used: u32,
    /// Number of important palette colors.
    pub colors_important: u32,
}

impl BitmapHeader {
    /// Returns the header written for a square 32-bit icon, or `None` if
    /// the bitmap would not fit the header's 32-bit fields.
    pub fn for_icon(side: u32) -> Option<BitmapHeader> {
        let height = side.checked_mul(2).and_then(|height| i32::try_from(height).ok())?;
        Some(BitmapHeader {
            header_size: HEADER_LENGTH,
            width: side as i32,
            height,
            planes: 1,
            bit_count: 32,
            compression: 0,
            image_size: bitmap_length(side)? - HEADER_LENGTH,
            x_pixels_per_meter: PIXELS_PER_METER,
            y_pixels_per_meter: PIXELS_PER_METER,
            colors_used: 0,
            colors_important: 0,
        })
    }

    /// Reads a header.
    pub fn read<R: Read>(mut reader: R) -> io::Result<BitmapHeader> {
        Ok(BitmapHeader {
            header_size: reader.read_u32::<LittleEndian>()?,
            width: reader.read_i32::<LittleEndian>()?,
            height: reader.read_i32::<LittleEndian>()?,
            planes: reader.read_u16::<LittleEndian>()?,
            bit_count: reader.read_u16::<LittleEndian>()?,
            compression: reader.read_u32::<LittleEndian>()?,
            image_size: reader.read_u32::<LittleEndian>()?,
            x_pixels_per_meter: reader.read_i32::<LittleEndian>()?,
            y_pixels_per_meter: reader.read_i32::<LittleEndian>()?,
            colors_used: reader.read_u32::<LittleEndian>()?,
            colors_important: reader.read_u32::<LittleEndian>()?,
        })
    }

    /// Writes the header.
    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_u32::<LittleEndian>(self.header_size)?;
        writer.write_i32::<LittleEndian>(self.width)?;
        writer.write_i32::<LittleEndian>(self.height)?;
        writer.write_u16::<LittleEndian>(self.planes)?;
        writer.write_u16::<LittleEndian>(self.bit_count)?;
        writer.write_u32::<LittleEndian>(self.compression)?;
        writer.write_u32::<LittleEndian>(self.image_size)?;
        writer.write_i32::<LittleEndian>(self.x_pixels_per_meter)?;
        writer.write_i32::<LittleEndian>(self.y_pixels_per_meter)?;
        writer.write_u32::<LittleEndian>(self.colors_used)?;
        writer.write_u32::<LittleEndian>(self.colors_important)?;
        Ok(())
    }
}

/// Rounds `value` up to a multiple of `multiple`.
pub fn round_up(value: u32, multiple: u32) -> u32 {
    (value + multiple - 1) / multiple * multiple
}

/// Length of one 32-bit pixel row, in bytes, or `None` on overflow.
pub fn pixel_row_length(side: u32) -> Option<u32> {
    side.checked_mul(4)
}

/// Length of one 1-bit mask row, in bytes.
pub fn mask_row_length(side: u32) -> u32 {
    round_up(side / 8 + u32::from(side % 8 != 0), 4)
}

/// Total length of a bitmap entry for a square icon: header, pixel rows and
/// mask rows.  Returns `None` when that does not fit in 32 bits.
pub fn bitmap_length(side: u32) -> Option<u32> {
    let pixels = pixel_row_length(side)?.checked_mul(side)?;
    let mask = mask_row_length(side).checked_mul(side)?;
    HEADER_LENGTH.checked_add(pixels)?.checked_add(mask)
}

/// Encodes a square image as a bitmap entry.
pub fn encode(image: &Image) -> IconResult<Vec<u8>> {
    if !image.is_square() || image.width() == 0 {
        return Err(argument_error!(
            "bitmap icons must be square and non-empty (got {}x{})",
            image.width(),
            image.height()
        ));
    }
    let side = image.width();
    let header = BitmapHeader::for_icon(side)
        .ok_or_else(|| argument_error!("a {}-pixel bitmap icon is too large", side))?;
    let row_length = 4 * side as usize;
    let mut output = Vec::with_capacity((header.image_size + HEADER_LENGTH) as usize);
    header.write(&mut output)?;
    for row in image.data().chunks_exact(4 * side as usize).rev() {
        let start = output.len();
        for pixel in row.chunks_exact(4) {
            output.extend_from_slice(&[pixel[2], pixel[1], pixel[0], pixel[3]]);
        }
        output.resize(start + row_length, 0);
    }
    output.extend_from_slice(&encode_mask(image));
    Ok(output)
}

/// Builds the bottom-up 1-bit mask for a square image.  A bit is set where
/// the pixel's alpha is below 128.
pub fn encode_mask(image: &Image) -> Vec<u8> {
    let side = image.width() as usize;
    if side == 0 {
        return Vec::new();
    }
    let row_length = mask_row_length(image.width()) as usize;
    let mut mask = vec![0u8; row_length * image.height() as usize];
    for (row, pixels) in image.data().chunks_exact(4 * side).rev().enumerate() {
        let bits = &mut mask[row * row_length..(row + 1) * row_length];
        for (x, pixel) in pixels.chunks_exact(4).enumerate() {
            if pixel[3] < MASK_ALPHA_THRESHOLD {
                bits[x / 8] |= 0x80 >> (x % 8);
            }
        }
    }
    mask
}

/// Decodes a bitmap entry for a square icon of `side` pixels.  The alpha
/// channel comes from the 32-bit pixel data; the trailing mask is not
/// consulted.
pub fn decode(data: &[u8], side: u32) -> IconResult<Image> {
    let header = BitmapHeader::read(data).map_err(truncated("bitmap header"))?;
    if header.header_size != HEADER_LENGTH {
        return Err(format_error!("unexpected bitmap header size {}", header.header_size));
    }
    if header.width != side as i32 || header.bit_count != 32 {
        return Err(format_error!(
            "expected a {}-pixel 32-bit bitmap, found {} pixels at {} bits",
            side,
            header.width,
            header.bit_count
        ));
    }
    let row_length = pixel_row_length(side)
        .ok_or_else(|| format_error!("a {}-pixel bitmap is too large", side))?
        as usize;
    let start = HEADER_LENGTH as usize;
    let end = start + row_length * side as usize;
    let rows = data
        .get(start..end)
        .ok_or_else(|| format_error!("truncated bitmap pixel data"))?;
    let mut rgba = Vec::with_capacity(4 * (side * side) as usize);
    for row in rows.chunks_exact(row_length).rev() {
        for pixel in row[..4 * side as usize].chunks_exact(4) {
            rgba.extend_from_slice(&[pixel[2], pixel[1], pixel[0], pixel[3]]);
        }
    }
    Image::from_rgba_data(side, side, rgba)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn gradient(side: u32) -> Image {
        let mut data = Vec::new();
        for y in 0..side {
            for x in 0..side {
                data.extend_from_slice(&[x as u8, y as u8, (x ^ y) as u8, ((x * 16) % 256) as u8]);
            }
        }
        Image::from_rgba_data(side, side, data).unwrap()
    }

    #[test]
    fn header_layout() {
        let mut output = Vec::new();
        let header = BitmapHeader::for_icon(16).unwrap();
        header.write(&mut output).unwrap();
        assert_eq!(output.len(), 40);
        assert_eq!(&output[0..4], &[40, 0, 0, 0]);
        assert_eq!(&output[4..8], &[16, 0, 0, 0]);
        assert_eq!(&output[8..12], &[32, 0, 0, 0]);
        assert_eq!(&output[12..16], &[1, 0, 32, 0]);
        assert_eq!(&output[20..24], &[0x40, 0x04, 0, 0]); // 1024 + 64
        assert_eq!(&output[24..28], &[0x13, 0x0b, 0, 0]); // 2835
        assert_eq!(BitmapHeader::read(Cursor::new(&output)).unwrap(), header);
    }

    #[test]
    fn row_padding() {
        assert_eq!(pixel_row_length(17), Some(68));
        assert_eq!(mask_row_length(17), 4);
        assert_eq!(mask_row_length(32), 4);
        assert_eq!(mask_row_length(33), 8);
        assert_eq!(bitmap_length(16), Some(40 + 1024 + 64));
        assert_eq!(bitmap_length(256), Some(40 + 262144 + 8192));
    }

    #[test]
    fn oversized_lengths_overflow_to_none() {
        assert_eq!(pixel_row_length(u32::MAX), None);
        assert_eq!(bitmap_length(40000), None);
        assert!(BitmapHeader::for_icon(40000).is_none());
        assert_eq!(mask_row_length(u32::MAX), 0x2000_0000);
    }

    #[test]
    fn empty_images_are_rejected() {
        let image = Image::new(0, 0);
        assert!(encode(&image).unwrap_err().is_argument());
        assert!(encode_mask(&image).is_empty());
    }

    #[test]
    fn mask_threshold() {
        let mut image = Image::new(2, 2);
        image.data_mut()[3] = 127;
        image.data_mut()[7] = 128;
        image.data_mut()[11] = 255;
        image.data_mut()[15] = 0;
        let mask = encode_mask(&image);
        // Bottom row first: (0,1) opaque, (1,1) transparent.
        assert_eq!(mask, vec![0b0100_0000, 0, 0, 0, 0b1000_0000, 0, 0, 0]);
    }

    #[test]
    fn rows_are_bottom_up_bgra() {
        let mut image = Image::new(1, 2);
        image.data_mut().copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
        let mut square = Image::new(2, 2);
        square.data_mut()[..4].copy_from_slice(&[1, 2, 3, 4]);
        let encoded = encode(&square).unwrap();
        assert_eq!(encoded.len() as u32, bitmap_length(2).unwrap());
        // Top-left pixel lands at the start of the last pixel row.
        assert_eq!(&encoded[48..52], &[3, 2, 1, 4]);
        assert!(encode(&image).unwrap_err().is_argument());
    }

    #[test]
    fn round_trip() {
        for &side in &[16, 17, 32, 48, 128] {
            let image = gradient(side);
            let encoded = encode(&image).unwrap();
            assert_eq!(encoded.len() as u32, bitmap_length(side).unwrap());
            assert_eq!(decode(&encoded, side).unwrap(), image, "side {}", side);
        }
    }

    #[test]
    fn decode_rejects_bad_headers() {
        let mut encoded = encode(&gradient(16)).unwrap();
        assert!(decode(&encoded, 32).unwrap_err().is_format());
        assert!(decode(&encoded[..100], 16).unwrap_err().is_format());
        assert!(decode(&encoded[..20], 16).unwrap_err().is_format());
        encoded[0] = 108;
        assert!(decode(&encoded, 16).unwrap_err().is_format());
    }
}
