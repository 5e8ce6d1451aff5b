//! The run-length scheme Apple uses for 24-bit RGB and 32-bit ARGB icon
//! elements, plus the uncompressed 8-bit mask plane that accompanies RGB
//! elements.
//!
//! Each color plane is compressed on its own and the compressed planes are
//! concatenated.  A control byte below `0x80` introduces `control + 1`
//! literal bytes; a control byte of `0x80` or above repeats the next byte
//! `control - 0x80 + 3` times.

use super::error::IconResult;
use super::image::Image;

/// Marker that begins the payload of a 32-bit ARGB element.
pub const ARGB_MAGIC: &[u8; 4] = b"ARGB";

/// The 128x128 RGB element (`it32`) always begins with four zero bytes.
const IT32_PREFIX: [u8; 4] = [0; 4];

/// Side length of the only icon size that carries the `it32` prefix.
const IT32_SIDE: u32 = 128;

const MAX_LITERAL_RUN: usize = 128;
const MIN_REPEAT_RUN: usize = 3;
const MAX_REPEAT_RUN: usize = 128;

/// Decodes run-length data from `input` into `output`, returning how many
/// input bytes were consumed.
///
/// Decoding stops once `output` is full or `input` is exhausted.  A control
/// byte whose operands are cut off by the end of `input` is dropped without
/// error, and any output it would have produced is left untouched.
pub fn decode(input: &[u8], output: &mut [u8]) -> usize {
    let mut index = 0;
    let mut filled = 0;
    while index < input.len() && filled < output.len() {
        let control = input[index] as usize;
        if control < 0x80 {
            let count = control + 1;
            if index + count >= input.len() {
                break;
            }
            let take = count.min(output.len() - filled);
            output[filled..filled + take].copy_from_slice(&input[index + 1..index + 1 + take]);
            filled += take;
            index += count + 1;
        } else {
            let count = control - 0x80 + MIN_REPEAT_RUN;
            if index + 1 >= input.len() {
                break;
            }
            let take = count.min(output.len() - filled);
            let value = input[index + 1];
            output[filled..filled + take].iter_mut().for_each(|byte| *byte = value);
            filled += take;
            index += 2;
        }
    }
    index
}

/// Compresses a single plane.
pub fn encode(plane: &[u8]) -> Vec<u8> {
    let mut output = Vec::with_capacity(plane.len() + plane.len() / MAX_LITERAL_RUN + 1);
    encode_into(plane, &mut output);
    output
}

/// Compresses a single plane, appending to `output`.
pub fn encode_into(plane: &[u8], output: &mut Vec<u8>) {
    let mut index = 0;
    while index < plane.len() {
        let start = index;
        while index < plane.len() && index - start < MAX_LITERAL_RUN {
            if starts_repeat(plane, index) {
                break;
            }
            index += 1;
        }
        if index > start {
            output.push((index - start - 1) as u8);
            output.extend_from_slice(&plane[start..index]);
        }
        if index < plane.len() {
            let value = plane[index];
            let mut count = 1;
            while index + count < plane.len()
                && count < MAX_REPEAT_RUN
                && plane[index + count] == value
            {
                count += 1;
            }
            // Shorter runs go back into the next literal.
            if count >= MIN_REPEAT_RUN {
                output.push((0x80 + count - MIN_REPEAT_RUN) as u8);
                output.push(value);
                index += count;
            }
        }
    }
}

fn starts_repeat(plane: &[u8], index: usize) -> bool {
    index + 2 < plane.len() && plane[index] == plane[index + 1] && plane[index] == plane[index + 2]
}

/// Decodes a 24-bit RGB element together with its 8-bit mask element into a
/// single RGBA image of `side` by `side` pixels.
pub fn decode_rgb(data: &[u8], mask: &[u8], side: u32) -> IconResult<Image> {
    let num_pixels = (side * side) as usize;
    if mask.len() != num_pixels {
        return Err(format_error!(
            "wrong mask payload length ({} instead of {})",
            mask.len(),
            num_pixels
        ));
    }
    let data = if side == IT32_SIDE {
        data.get(IT32_PREFIX.len()..).unwrap_or(&[])
    } else {
        data
    };
    let mut planes = vec![0u8; 3 * num_pixels];
    decode(data, &mut planes);
    let mut image = Image::new(side, side);
    for (channel, plane) in planes.chunks_exact(num_pixels).enumerate() {
        image.set_channel(channel, plane);
    }
    image.set_channel(3, mask);
    Ok(image)
}

/// Encodes the color channels of an image as a 24-bit RGB element payload.
pub fn encode_rgb(image: &Image) -> Vec<u8> {
    let mut output = Vec::new();
    if image.width() == IT32_SIDE {
        output.extend_from_slice(&IT32_PREFIX);
    }
    for channel in 0..3 {
        encode_into(&image.channel(channel), &mut output);
    }
    output
}

/// Returns the alpha channel of an image as an 8-bit mask element payload.
pub fn encode_mask(image: &Image) -> Vec<u8> {
    image.channel(3)
}

/// Decodes a 32-bit ARGB element payload into an RGBA image of `side` by
/// `side` pixels.
pub fn decode_argb(data: &[u8], side: u32) -> IconResult<Image> {
    if !data.starts_with(ARGB_MAGIC) {
        return Err(format_error!("ARGB element is missing its marker"));
    }
    let num_pixels = (side * side) as usize;
    let mut planes = vec![0u8; 4 * num_pixels];
    decode(&data[ARGB_MAGIC.len()..], &mut planes);
    let mut image = Image::new(side, side);
    let mut planes = planes.chunks_exact(num_pixels);
    if let Some(alpha) = planes.next() {
        image.set_channel(3, alpha);
    }
    for (channel, plane) in planes.enumerate() {
        image.set_channel(channel, plane);
    }
    Ok(image)
}

/// Encodes an image as a 32-bit ARGB element payload.
pub fn encode_argb(image: &Image) -> Vec<u8> {
    let mut output = ARGB_MAGIC.to_vec();
    for &channel in &[3, 0, 1, 2] {
        encode_into(&image.channel(channel), &mut output);
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_image(side: u32) -> Image {
        let mut data = Vec::new();
        for index in 0..(side * side) {
            let row = index / side;
            data.push((row * 7 % 256) as u8);
            data.push(if index % 5 == 0 { 9 } else { 200 });
            data.push((index % 3) as u8);
            data.push(if row < side / 2 { 255 } else { (index % 256) as u8 });
        }
        Image::from_rgba_data(side, side, data).unwrap()
    }

    #[test]
    fn triple_run_then_literal_pair() {
        let encoded = encode(&[7, 7, 7, 9, 9]);
        assert_eq!(encoded, vec![0x80, 7, 1, 9, 9]);
        let mut decoded = [0u8; 5];
        assert_eq!(decode(&encoded, &mut decoded), 5);
        assert_eq!(decoded, [7, 7, 7, 9, 9]);
    }

    #[test]
    fn pairs_are_never_repeat_encoded() {
        assert_eq!(encode(&[5, 5]), vec![1, 5, 5]);
        assert_eq!(encode(&[1, 2, 2, 3]), vec![3, 1, 2, 2, 3]);
        assert_eq!(encode(&[4, 4, 4]), vec![0x80, 4]);
    }

    #[test]
    fn long_runs_are_split() {
        let plane = vec![6u8; 300];
        let encoded = encode(&plane);
        assert_eq!(encoded, vec![0xfd, 6, 0xfd, 6, 0xa9, 6]);
        let mut decoded = vec![0u8; 300];
        decode(&encoded, &mut decoded);
        assert_eq!(decoded, plane);
    }

    #[test]
    fn long_literals_are_split() {
        let plane: Vec<u8> = (0..200).map(|i| (i % 2) as u8).collect();
        let encoded = encode(&plane);
        assert_eq!(encoded[0], 127);
        assert_eq!(encoded[129], 71);
        assert_eq!(encoded.len(), 202);
    }

    #[test]
    fn truncated_tail_is_dropped() {
        let mut output = [0xaau8; 6];
        // Literal of 4 with only 2 operands left.
        let consumed = decode(&[0x80, 1, 3, 8, 9], &mut output);
        assert_eq!(consumed, 2);
        assert_eq!(output, [1, 1, 1, 0xaa, 0xaa, 0xaa]);
        // Repeat with its value missing.
        let consumed = decode(&[0, 5, 0x81], &mut output);
        assert_eq!(consumed, 2);
        assert_eq!(output[0], 5);
    }

    #[test]
    fn decode_stops_when_output_is_full() {
        let mut output = [0u8; 2];
        let consumed = decode(&[0x85, 3, 0x85, 4], &mut output);
        assert_eq!(consumed, 2);
        assert_eq!(output, [3, 3]);
    }

    #[test]
    fn decode_known_rgb_payload() {
        let data: Vec<u8> = vec![0, 12, 255, 0, 250, 0, 128, 34, 255, 0, 248,
                                 0, 1, 56, 99, 255, 0, 249, 0];
        let mask = vec![255u8; 256];
        let image = decode_rgb(&data, &mask, 16).expect("failed to decode");
        assert_eq!(image.pixel(0, 0), [12, 34, 56, 255]);
        assert_eq!(image.pixel(1, 0), [0, 34, 99, 255]);
        assert_eq!(image.pixel(15, 15), [0, 0, 0, 255]);
    }

    #[test]
    fn rgb_round_trip() {
        for &side in &[16, 32, 48, 128] {
            let image = sample_image(side);
            let data = encode_rgb(&image);
            let mask = encode_mask(&image);
            let decoded = decode_rgb(&data, &mask, side).unwrap();
            assert_eq!(decoded, image, "side {}", side);
        }
    }

    #[test]
    fn it32_has_zero_prefix() {
        let data = encode_rgb(&sample_image(128));
        assert_eq!(&data[..4], &[0, 0, 0, 0]);
        let data = encode_rgb(&sample_image(32));
        assert_ne!(&data[..4], &[0, 0, 0, 0]);
    }

    #[test]
    fn argb_round_trip() {
        for &side in &[16, 32, 48, 128] {
            let image = sample_image(side);
            let data = encode_argb(&image);
            assert_eq!(&data[..4], b"ARGB");
            assert_eq!(decode_argb(&data, side).unwrap(), image, "side {}", side);
        }
    }

    #[test]
    fn argb_needs_marker() {
        assert!(decode_argb(b"RGBA\x80\x00", 16).unwrap_err().is_format());
    }

    #[test]
    fn mask_length_is_checked() {
        let data = encode_rgb(&sample_image(16));
        assert!(decode_rgb(&data, &[0u8; 255], 16).unwrap_err().is_format());
    }
}
