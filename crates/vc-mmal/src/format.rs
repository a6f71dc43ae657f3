//! Elementary stream formats for video ports
//!
//! MMAL describes a video port with an encoding (a fourcc), the allocated
//! frame dimensions and a crop rectangle for the visible part. Hardware
//! ports want the allocated width aligned to 32 pixels and the height to 16
//! lines; the crop keeps the size the application actually asked for.

use std::fmt;

/// Width alignment required by VideoCore video ports
pub const WIDTH_ALIGN: u32 = 32;

/// Height alignment required by VideoCore video ports
pub const HEIGHT_ALIGN: u32 = 16;

/// Row stride alignment in bytes
pub const STRIDE_ALIGN: u32 = 32;

/// Round `value` up to the next multiple of `align`
///
/// `align` must be a power of two.
///
/// # Examples
///
/// ```rust
/// use vc_mmal::align_up;
///
/// assert_eq!(align_up(100, 32), 128);
/// assert_eq!(align_up(128, 32), 128);
/// ```
#[must_use]
pub const fn align_up(value: u32, align: u32) -> u32 {
    (value + align - 1) & !(align - 1)
}

/// A fourcc pixel encoding
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Encoding(u32);

impl Encoding {
    /// 32-bit RGBA, `MMAL_ENCODING_RGBA`
    pub const RGBA: Self = Self::from_fourcc(*b"RGBA");
    /// 32-bit BGRA, `MMAL_ENCODING_BGRA`
    pub const BGRA: Self = Self::from_fourcc(*b"BGRA");
    /// 24-bit packed RGB, `MMAL_ENCODING_RGB24`
    pub const RGB24: Self = Self::from_fourcc(*b"RGB3");
    /// Planar YUV 4:2:0, `MMAL_ENCODING_I420`
    pub const I420: Self = Self::from_fourcc(*b"I420");
    /// VideoCore-internal opaque handles, `MMAL_ENCODING_OPAQUE`
    pub const OPAQUE: Self = Self::from_fourcc(*b"OPQV");

    /// Build an encoding the way `MMAL_FOURCC(a, b, c, d)` does
    #[must_use]
    pub const fn from_fourcc(code: [u8; 4]) -> Self {
        Self(
            code[0] as u32 | (code[1] as u32) << 8 | (code[2] as u32) << 16 | (code[3] as u32) << 24,
        )
    }

    /// Wrap a raw fourcc value
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw fourcc value
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Bytes per pixel for packed encodings, `None` for planar/opaque ones
    #[must_use]
    pub fn bytes_per_pixel(self) -> Option<u32> {
        match self {
            Self::RGBA | Self::BGRA => Some(4),
            Self::RGB24 => Some(3),
            _ => None,
        }
    }
}

impl fmt::Debug for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Encoding({self})")
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.0.to_le_bytes();
        if bytes.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
            for b in bytes {
                write!(f, "{}", char::from(b))?;
            }
            Ok(())
        } else {
            write!(f, "{:#010x}", self.0)
        }
    }
}

/// A rectangle in pixels, `MMAL_RECT_T`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    #[must_use]
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// Whether this rectangle lies entirely inside a `width` x `height` frame
    #[must_use]
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x >= 0
            && self.y >= 0
            && self.width > 0
            && self.height > 0
            && i64::from(self.x) + i64::from(self.width) <= i64::from(width)
            && i64::from(self.y) + i64::from(self.height) <= i64::from(height)
    }
}

/// Video format of a port
///
/// Mirrors the parts of `MMAL_ES_FORMAT_T` / `MMAL_VIDEO_FORMAT_T` this
/// workspace sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoFormat {
    /// Pixel encoding
    pub encoding: Encoding,
    /// Allocated frame width in pixels
    pub width: u32,
    /// Allocated frame height in lines
    pub height: u32,
    /// Visible region
    pub crop: Rect,
}

impl Default for VideoFormat {
    fn default() -> Self {
        Self {
            encoding: Encoding::OPAQUE,
            width: 0,
            height: 0,
            crop: Rect::default(),
        }
    }
}

impl VideoFormat {
    /// Format for a `width` x `height` frame
    ///
    /// Allocated dimensions are aligned up to [`WIDTH_ALIGN`] and
    /// [`HEIGHT_ALIGN`]; the crop covers exactly the requested frame.
    #[must_use]
    pub fn for_frame(encoding: Encoding, width: u32, height: u32) -> Self {
        Self {
            encoding,
            width: align_up(width, WIDTH_ALIGN),
            height: align_up(height, HEIGHT_ALIGN),
            crop: Rect::new(0, 0, width as i32, height as i32),
        }
    }

    /// Row stride in bytes, aligned to [`STRIDE_ALIGN`]
    #[must_use]
    pub fn stride(&self) -> Option<u32> {
        self.encoding
            .bytes_per_pixel()
            .map(|bpp| align_up(self.width * bpp, STRIDE_ALIGN))
    }

    /// Bytes needed for one frame of this format
    #[must_use]
    pub fn frame_size(&self) -> Option<u32> {
        match self.encoding {
            Encoding::I420 => Some(self.width * self.height * 3 / 2),
            _ => self.stride().map(|stride| stride * self.height),
        }
    }

    /// Whether allocated dimensions satisfy the hardware alignment rules
    #[must_use]
    pub fn is_aligned(&self) -> bool {
        self.width % WIDTH_ALIGN == 0 && self.height % HEIGHT_ALIGN == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0, 16), 0);
        assert_eq!(align_up(1, 16), 16);
        assert_eq!(align_up(120, 16), 128);
        assert_eq!(align_up(128 * 4, 32), 512);
        assert_eq!(align_up(641, 32), 672);
    }

    #[test]
    fn test_fourcc() {
        // MMAL_FOURCC('R','G','B','A') is little-endian packed
        assert_eq!(Encoding::RGBA.raw(), 0x4142_4752);
        assert_eq!(Encoding::RGBA.to_string(), "RGBA");
        assert_eq!(Encoding::RGBA.bytes_per_pixel(), Some(4));
        assert_eq!(Encoding::I420.bytes_per_pixel(), None);
    }

    #[test]
    fn test_for_frame_aligns() {
        let format = VideoFormat::for_frame(Encoding::RGBA, 100, 50);
        assert_eq!(format.width, 128);
        assert_eq!(format.height, 64);
        assert_eq!(format.crop, Rect::new(0, 0, 100, 50));
        assert!(format.is_aligned());
    }

    #[test]
    fn test_frame_size() {
        let format = VideoFormat::for_frame(Encoding::RGBA, 128, 128);
        assert_eq!(format.stride(), Some(512));
        assert_eq!(format.frame_size(), Some(128 * 128 * 4));

        let yuv = VideoFormat::for_frame(Encoding::I420, 64, 32);
        assert_eq!(yuv.frame_size(), Some(64 * 32 * 3 / 2));

        assert_eq!(VideoFormat::default().frame_size(), None);
    }

    #[test]
    fn test_crop_bounds() {
        assert!(Rect::new(0, 0, 128, 128).fits_within(128, 128));
        assert!(!Rect::new(1, 0, 128, 128).fits_within(128, 128));
        assert!(!Rect::new(0, 0, 0, 10).fits_within(128, 128));
        assert!(!Rect::new(-1, 0, 10, 10).fits_within(128, 128));
    }
}
