use super::error::IconResult;

/// A decoded icon image.  Pixel data is always 8-bit RGBA, stored row-major
/// and top-down, whatever encoding the image was read from.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Image {
    width: u32,
    height: u32,
    data: Box<[u8]>,
}

impl Image {
    /// Creates a new image with all pixel data set to zero (fully
    /// transparent black).
    pub fn new(width: u32, height: u32) -> Image {
        let data_bytes = 4 * (width as usize) * (height as usize);
        Image {
            width,
            height,
            data: vec![0u8; data_bytes].into_boxed_slice(),
        }
    }

    /// Creates an image from existing RGBA data.  Returns an error if `data`
    /// is not exactly `4 * width * height` bytes long.
    pub fn from_rgba_data(width: u32, height: u32, data: Vec<u8>) -> IconResult<Image> {
        let expected = 4 * (width as usize) * (height as usize);
        if data.len() != expected {
            return Err(argument_error!(
                "wrong RGBA data length ({} instead of {} for {}x{})",
                data.len(),
                expected,
                width,
                height
            ));
        }
        Ok(Image {
            width,
            height,
            data: data.into_boxed_slice(),
        })
    }

    /// Returns the width of the image, in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the height of the image, in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns true if the image is as wide as it is tall.
    pub fn is_square(&self) -> bool {
        self.width == self.height
    }

    /// Returns a reference to the image's RGBA pixel data.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns a mutable reference to the image's RGBA pixel data.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Returns the RGBA pixel at (`x`, `y`).
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let start = 4 * (y as usize * self.width as usize + x as usize);
        let mut pixel = [0u8; 4];
        pixel.copy_from_slice(&self.data[start..start + 4]);
        pixel
    }

    /// Copies one channel (0 = red, 1 = green, 2 = blue, 3 = alpha) out into
    /// a plane of one byte per pixel.
    pub(crate) fn channel(&self, index: usize) -> Vec<u8> {
        self.data.iter().skip(index).step_by(4).copied().collect()
    }

    /// Overwrites one channel from a plane of one byte per pixel.  A short
    /// plane leaves the remaining pixels untouched.
    pub(crate) fn set_channel(&mut self, index: usize, plane: &[u8]) {
        for (pixel, &value) in self.data.chunks_exact_mut(4).zip(plane) {
            pixel[index] = value;
        }
    }
}

/// Converts RGB image data into RGBA.
pub(crate) fn rgb_to_rgba(rgb: &[u8]) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(rgb.len() / 3 * 4);
    for pixel in rgb.chunks_exact(3) {
        rgba.extend_from_slice(pixel);
        rgba.push(u8::MAX);
    }
    rgba
}

/// Converts grayscale image data into RGBA.
pub(crate) fn grayscale_to_rgba(gray: &[u8]) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(gray.len() * 4);
    for &value in gray {
        rgba.extend_from_slice(&[value, value, value, u8::MAX]);
    }
    rgba
}

/// Converts grayscale-with-alpha image data into RGBA.
pub(crate) fn gray_alpha_to_rgba(gray_alpha: &[u8]) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(gray_alpha.len() * 2);
    for pixel in gray_alpha.chunks_exact(2) {
        rgba.extend_from_slice(&[pixel[0], pixel[0], pixel[0], pixel[1]]);
    }
    rgba
}
