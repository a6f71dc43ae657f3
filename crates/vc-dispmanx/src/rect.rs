//! Geometry and element attributes
//!
//! Plain-data mirrors of `VC_RECT_T`, `VC_IMAGE_TYPE_T`,
//! `VC_DISPMANX_ALPHA_T`, `DISPMANX_PROTECTION_T` and
//! `DISPMANX_TRANSFORM_T`.

/// Shift applied to source rectangles, which DispmanX takes in 16.16 fixed point
pub const FIXED_SHIFT: u32 = 16;

/// Round `value` up to a multiple of `align` (a power of two)
#[must_use]
pub const fn align_up(value: u32, align: u32) -> u32 {
    (value + align - 1) & !(align - 1)
}

/// A rectangle, `VC_RECT_T`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    /// `vc_dispmanx_rect_set`
    #[must_use]
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// Rectangle at the origin covering `width` x `height`
    #[must_use]
    pub const fn of_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, width as i32, height as i32)
    }

    /// The same rectangle in 16.16 fixed point, as element source rectangles expect
    #[must_use]
    pub const fn to_fixed(self) -> Self {
        Self::new(
            self.x << FIXED_SHIFT,
            self.y << FIXED_SHIFT,
            self.width << FIXED_SHIFT,
            self.height << FIXED_SHIFT,
        )
    }

    /// Whole-pixel rectangle from a 16.16 fixed point one (fraction dropped)
    #[must_use]
    pub const fn from_fixed(self) -> Self {
        Self::new(
            self.x >> FIXED_SHIFT,
            self.y >> FIXED_SHIFT,
            self.width >> FIXED_SHIFT,
            self.height >> FIXED_SHIFT,
        )
    }

    /// Whether the rectangle has no area
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Whether the rectangle lies inside a `width` x `height` area at the origin
    #[must_use]
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x >= 0
            && self.y >= 0
            && !self.is_empty()
            && i64::from(self.x) + i64::from(self.width) <= i64::from(width)
            && i64::from(self.y) + i64::from(self.height) <= i64::from(height)
    }

    /// Source bytes a write of this rectangle reads at `pitch`
    ///
    /// DispmanX copies whole rows from the top of the source, so the source
    /// must hold `pitch * (y + height)` bytes, padding of the last row included.
    #[must_use]
    pub fn upload_len(&self, pitch: u32) -> u64 {
        let rows = i64::from(self.y) + i64::from(self.height);
        u64::try_from(rows).unwrap_or(0) * u64::from(pitch)
    }
}

/// Resource pixel formats, `VC_IMAGE_TYPE_T`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ImageType {
    /// 16-bit 5:6:5
    Rgb565 = 1,
    /// 24-bit packed R, G, B
    Rgb888 = 5,
    /// 32-bit packed R, G, B, A
    Rgba32 = 15,
}

impl ImageType {
    /// Raw `VC_IMAGE_TYPE_T` value
    #[must_use]
    pub fn raw(self) -> u32 {
        self as u32
    }

    /// Bytes per pixel
    #[must_use]
    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            Self::Rgb565 => 2,
            Self::Rgb888 => 3,
            Self::Rgba32 => 4,
        }
    }

    /// Row pitch DispmanX expects for an image `width` pixels wide
    #[must_use]
    pub fn pitch(self, width: u32) -> u32 {
        align_up(width * self.bytes_per_pixel(), 32)
    }
}

/// How element alpha is derived, `DISPMANX_FLAGS_ALPHA_T`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AlphaMode {
    /// Per-pixel alpha from the resource
    FromSource,
    /// `opacity` applied to every pixel
    #[default]
    FixedAllPixels,
    /// `opacity` applied to non-zero pixels, zero pixels are transparent
    FixedNonZero,
    /// `opacity` applied to pixels brighter than 0x07, darker ones are transparent
    FixedExceed0x07,
}

impl AlphaMode {
    /// Raw flag value
    #[must_use]
    pub fn raw(self) -> u32 {
        match self {
            Self::FromSource => 0,
            Self::FixedAllPixels => 1,
            Self::FixedNonZero => 2,
            Self::FixedExceed0x07 => 3,
        }
    }
}

/// Alpha blend descriptor, `VC_DISPMANX_ALPHA_T`
///
/// The mask resource is never used here and is always `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Alpha {
    pub mode: AlphaMode,
    pub opacity: u8,
}

impl Alpha {
    /// Fixed opacity over the whole element
    #[must_use]
    pub const fn fixed(opacity: u8) -> Self {
        Self {
            mode: AlphaMode::FixedAllPixels,
            opacity,
        }
    }
}

impl Default for Alpha {
    fn default() -> Self {
        Self::fixed(255)
    }
}

/// Content protection, `DISPMANX_PROTECTION_T`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Protection {
    #[default]
    None,
    Hdcp,
}

impl Protection {
    /// Raw value
    #[must_use]
    pub fn raw(self) -> u32 {
        match self {
            Self::None => 0,
            Self::Hdcp => 11,
        }
    }
}

/// Element orientation, `DISPMANX_TRANSFORM_T`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum Transform {
    #[default]
    Rot0 = 0,
    MirrorRot0 = 1,
    MirrorRot180 = 2,
    Rot180 = 3,
    MirrorRot90 = 4,
    Rot270 = 5,
    Rot90 = 6,
    MirrorRot270 = 7,
}

impl Transform {
    /// Raw value
    #[must_use]
    pub fn raw(self) -> u32 {
        self as u32
    }

    /// Map a normalized destination position to the source position it shows
    ///
    /// Coordinates are in `[0, 1)` across the destination and source rectangles.
    #[must_use]
    pub fn source_position(self, u: f64, v: f64) -> (f64, f64) {
        match self {
            Self::Rot0 => (u, v),
            Self::MirrorRot0 => (1.0 - u, v),
            Self::MirrorRot180 => (u, 1.0 - v),
            Self::Rot180 => (1.0 - u, 1.0 - v),
            Self::MirrorRot90 => (v, u),
            Self::Rot270 => (1.0 - v, u),
            Self::Rot90 => (v, 1.0 - u),
            Self::MirrorRot270 => (1.0 - v, 1.0 - u),
        }
    }
}
