use std::io::{Cursor, Write};

use super::error::IconResult;
use super::image::{gray_alpha_to_rgba, grayscale_to_rgba, rgb_to_rgba, Image};

impl Image {
    /// Decodes an image from an in-memory PNG stream, converting it to RGBA.
    pub fn read_png(input: &[u8]) -> IconResult<Image> {
        let mut decoder = png::Decoder::new(Cursor::new(input));
        decoder.set_transformations(png::Transformations::STRIP_16 | png::Transformations::EXPAND);
        let mut reader = decoder
            .read_info()
            .map_err(|error| format_error!("malformed PNG data; {}", error))?;
        let (width, height) = {
            let info = reader.info();
            (info.width, info.height)
        };
        let (color_type, bit_depth) = reader.output_color_type();
        if bit_depth != png::BitDepth::Eight {
            return Err(format_error!("unsupported PNG bit depth: {:?}", bit_depth));
        }
        let buffer_size = reader
            .output_buffer_size()
            .ok_or_else(|| format_error!("PNG image of {}x{} is too large", width, height))?;
        let mut buffer = vec![0u8; buffer_size];
        let frame = reader
            .next_frame(&mut buffer)
            .map_err(|error| format_error!("malformed PNG data; {}", error))?;
        buffer.truncate(frame.buffer_size());
        let rgba = match color_type {
            png::ColorType::Rgba => buffer,
            png::ColorType::Rgb => rgb_to_rgba(&buffer),
            png::ColorType::GrayscaleAlpha => gray_alpha_to_rgba(&buffer),
            png::ColorType::Grayscale => grayscale_to_rgba(&buffer),
            png::ColorType::Indexed => {
                return Err(format_error!("unexpanded palette in PNG data"));
            }
        };
        Image::from_rgba_data(width, height, rgba)
    }

    /// Encodes the image as an RGBA PNG stream.
    pub fn write_png<W: Write>(&self, output: W) -> IconResult<()> {
        let mut encoder = png::Encoder::new(output, self.width(), self.height());
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder
            .write_header()
            .map_err(|error| format_error!("cannot encode PNG; {}", error))?;
        writer
            .write_image_data(self.data())
            .map_err(|error| format_error!("cannot encode PNG; {}", error))?;
        writer
            .finish()
            .map_err(|error| format_error!("cannot encode PNG; {}", error))?;
        Ok(())
    }

    /// Encodes the image as an RGBA PNG stream held in memory.
    pub fn to_png(&self) -> IconResult<Vec<u8>> {
        let mut output = Vec::new();
        self.write_png(&mut output)?;
        Ok(output)
    }
}
