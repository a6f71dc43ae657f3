//! Port parameters
//!
//! Only the two parameters a pattern source needs are modelled: the
//! synthetic pattern selector and the zero-copy switch.

/// `MMAL_PARAMETER_GROUP_COMMON`
const GROUP_COMMON: u32 = 0;

/// `MMAL_PARAMETER_GROUP_VIDEO`
const GROUP_VIDEO: u32 = 1 << 16;

/// `MMAL_PARAMETER_ZERO_COPY`
pub const PARAMETER_ZERO_COPY: u32 = GROUP_COMMON + 4;

/// `MMAL_PARAMETER_VIDEO_SOURCE_PATTERN`
pub const PARAMETER_VIDEO_SOURCE_PATTERN: u32 = GROUP_VIDEO + 50;

/// Synthetic image generated by `vc.ril.source`
///
/// Discriminants match `MMAL_SOURCE_PATTERN_T`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum SourcePattern {
    /// Solid white
    White = 0,
    /// Solid black
    Black = 1,
    /// Diagonal gradient
    Diagonal = 2,
    /// Grey noise
    Noise = 3,
    /// Random colour noise
    #[default]
    Random = 4,
    /// Colour bars
    Colour = 5,
    /// Checkerboard blocks
    Blocks = 6,
    /// Swirling pattern
    Swirly = 7,
}

impl SourcePattern {
    /// Raw `MMAL_SOURCE_PATTERN_T` value
    #[must_use]
    pub fn raw(self) -> u32 {
        self as u32
    }
}

/// A parameter that can be set on an output port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortParameter {
    /// `MMAL_PARAMETER_VIDEO_SOURCE_PATTERN`
    SourcePattern(SourcePattern),
    /// `MMAL_PARAMETER_ZERO_COPY`
    ZeroCopy(bool),
}

impl PortParameter {
    /// MMAL parameter id
    #[must_use]
    pub fn id(&self) -> u32 {
        match self {
            Self::SourcePattern(_) => PARAMETER_VIDEO_SOURCE_PATTERN,
            Self::ZeroCopy(_) => PARAMETER_ZERO_COPY,
        }
    }

    /// Human-readable parameter name for logs
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::SourcePattern(_) => "MMAL_PARAMETER_VIDEO_SOURCE_PATTERN",
            Self::ZeroCopy(_) => "MMAL_PARAMETER_ZERO_COPY",
        }
    }
}
