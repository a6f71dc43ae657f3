//! Synthetic frame generation for the simulated source
//!
//! Fills a frame buffer the way `vc.ril.source` would for a given
//! [`SourcePattern`]. Only packed RGB encodings are generated; alpha is
//! always opaque.

use crate::format::{Encoding, VideoFormat};
use crate::param::SourcePattern;

/// Size of a checkerboard block in pixels
const BLOCK_SIZE: u32 = 16;

/// EBU colour bars, RGB
const COLOUR_BARS: [[u8; 3]; 8] = [
    [0xff, 0xff, 0xff],
    [0xff, 0xff, 0x00],
    [0x00, 0xff, 0xff],
    [0x00, 0xff, 0x00],
    [0xff, 0x00, 0xff],
    [0xff, 0x00, 0x00],
    [0x00, 0x00, 0xff],
    [0x00, 0x00, 0x00],
];

/// Fill `data` with one frame of `pattern`
///
/// `frame` advances animated patterns. Returns the number of bytes written,
/// or `None` if the encoding is not a packed RGB format or `data` is too
/// small for the frame.
pub fn fill(
    pattern: SourcePattern,
    format: &VideoFormat,
    frame: u64,
    rng: &mut fastrand::Rng,
    data: &mut [u8],
) -> Option<usize> {
    let bpp = format.encoding.bytes_per_pixel()? as usize;
    let stride = format.stride()? as usize;
    let size = format.frame_size()? as usize;
    if data.len() < size {
        return None;
    }

    let width = format.width as usize;
    for (y, row) in data[..size].chunks_exact_mut(stride).enumerate() {
        for (x, px) in row[..width * bpp].chunks_exact_mut(bpp).enumerate() {
            let rgb = match pattern {
                SourcePattern::White => [0xff; 3],
                SourcePattern::Black => [0x00; 3],
                SourcePattern::Random => [rng.u8(..), rng.u8(..), rng.u8(..)],
                SourcePattern::Noise => {
                    let v = rng.u8(..);
                    [v, v, v]
                }
                SourcePattern::Diagonal => {
                    let v = ((x + y + frame as usize) & 0xff) as u8;
                    [v, v, v]
                }
                SourcePattern::Colour => {
                    let bar = x * COLOUR_BARS.len() / width.max(1);
                    COLOUR_BARS[bar.min(COLOUR_BARS.len() - 1)]
                }
                SourcePattern::Blocks => {
                    let on = ((x as u32 / BLOCK_SIZE) + (y as u32 / BLOCK_SIZE) + frame as u32) % 2 == 0;
                    if on {
                        [0xff; 3]
                    } else {
                        [0x00; 3]
                    }
                }
                SourcePattern::Swirly => {
                    let dx = x as i64 - width as i64 / 2;
                    let dy = y as i64 - format.height as i64 / 2;
                    let v = ((dx * dx + dy * dy) as u64 / 8 + frame * 4) as u8;
                    [v, v.wrapping_add(85), v.wrapping_add(170)]
                }
            };
            write_pixel(format.encoding, rgb, px);
        }
        // Row padding is left as whatever the buffer held
    }

    Some(size)
}

fn write_pixel(encoding: Encoding, [r, g, b]: [u8; 3], px: &mut [u8]) {
    match encoding {
        Encoding::BGRA => px.copy_from_slice(&[b, g, r, 0xff]),
        Encoding::RGB24 => px.copy_from_slice(&[r, g, b]),
        _ => px.copy_from_slice(&[r, g, b, 0xff]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgba(width: u32, height: u32) -> VideoFormat {
        VideoFormat::for_frame(Encoding::RGBA, width, height)
    }

    #[test]
    fn test_white_fills_every_pixel() {
        let format = rgba(32, 16);
        let mut data = vec![0u8; format.frame_size().expect("size") as usize];
        let mut rng = fastrand::Rng::with_seed(1);

        let written = fill(SourcePattern::White, &format, 0, &mut rng, &mut data);
        assert_eq!(written, Some(data.len()));
        assert!(data.iter().all(|&b| b == 0xff));
    }

    #[test]
    fn test_random_is_seeded() {
        let format = rgba(32, 16);
        let size = format.frame_size().expect("size") as usize;
        let mut a = vec![0u8; size];
        let mut b = vec![0u8; size];

        fill(SourcePattern::Random, &format, 0, &mut fastrand::Rng::with_seed(7), &mut a);
        fill(SourcePattern::Random, &format, 0, &mut fastrand::Rng::with_seed(7), &mut b);
        assert_eq!(a, b);

        // Alpha is opaque, colour channels vary
        assert!(a.chunks_exact(4).all(|px| px[3] == 0xff));
        assert!(a.chunks_exact(4).any(|px| px[0] != a[0]));
    }

    #[test]
    fn test_bgra_swaps_channels() {
        let format = VideoFormat::for_frame(Encoding::BGRA, 32, 16);
        let mut data = vec![0u8; format.frame_size().expect("size") as usize];
        let mut rng = fastrand::Rng::with_seed(1);

        fill(SourcePattern::Colour, &format, 0, &mut rng, &mut data);
        // Second bar is yellow: r=ff g=ff b=00
        let px = &data[5 * 4..6 * 4];
        assert_eq!(px, &[0x00, 0xff, 0xff, 0xff]);
    }

    #[test]
    fn test_rejects_short_buffer_and_planar() {
        let mut rng = fastrand::Rng::with_seed(1);
        let mut small = vec![0u8; 16];
        assert_eq!(fill(SourcePattern::Black, &rgba(32, 16), 0, &mut rng, &mut small), None);

        let yuv = VideoFormat::for_frame(Encoding::I420, 32, 16);
        let mut data = vec![0u8; 4096];
        assert_eq!(fill(SourcePattern::Black, &yuv, 0, &mut rng, &mut data), None);
    }
}
