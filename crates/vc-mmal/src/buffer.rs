//! Buffer headers and the completion callback
//!
//! A buffer header is owned by its pool while queued, by the driver once sent
//! to a port, and is lent back to the application only for the duration of
//! the port callback. [`FilledBuffer`] encodes that loan as a borrow: the
//! payload slice cannot outlive the callback invocation.

use bitflags::bitflags;

bitflags! {
    /// `MMAL_BUFFER_HEADER_FLAG_*`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BufferFlags: u32 {
        /// End of stream
        const EOS = 1 << 0;
        /// Start of a frame
        const FRAME_START = 1 << 1;
        /// End of a frame
        const FRAME_END = 1 << 2;
        /// Complete frame
        const FRAME = Self::FRAME_START.bits() | Self::FRAME_END.bits();
        /// Key frame
        const KEYFRAME = 1 << 3;
        /// Discontinuity in the stream
        const DISCONTINUITY = 1 << 4;
        /// Codec configuration data
        const CONFIG = 1 << 5;
        /// Encrypted payload
        const ENCRYPTED = 1 << 6;
        /// Codec side information
        const CODECSIDEINFO = 1 << 7;
        /// Snapshot frame
        const SNAPSHOT = 1 << 8;
        /// Payload is known to be corrupt
        const CORRUPTED = 1 << 9;
        /// Payload failed to transmit
        const TRANSMISSION_FAILED = 1 << 10;
    }
}

impl BufferFlags {
    /// Whether the buffer carries a whole frame
    #[must_use]
    pub fn is_complete_frame(self) -> bool {
        self.contains(Self::FRAME) && !self.intersects(Self::CORRUPTED | Self::TRANSMISSION_FAILED)
    }
}

/// A filled buffer lent to the port callback
#[derive(Debug, Clone, Copy)]
pub struct FilledBuffer<'a> {
    /// Index of the header inside its pool
    pub index: usize,
    /// Payload, `length` bytes starting at the header's offset
    pub data: &'a [u8],
    /// Header flags
    pub flags: BufferFlags,
    /// Presentation timestamp in microseconds, if known
    pub pts: Option<i64>,
    /// Size of the allocation behind the payload
    pub alloc_size: u32,
}

impl FilledBuffer<'_> {
    /// Bytes filled by the producer
    #[must_use]
    pub fn length(&self) -> usize {
        self.data.len()
    }
}

/// Callback invoked on the driver thread for every completed buffer
pub type BufferCallback = Box<dyn FnMut(FilledBuffer<'_>) + Send + 'static>;

/// Common view over pool-owned buffer headers
pub trait BufferHeader: Send {
    /// Index inside the owning pool
    fn index(&self) -> usize;

    /// Allocated payload size in bytes
    fn alloc_size(&self) -> u32;

    /// Bytes currently filled
    fn length(&self) -> u32;

    /// Current header flags
    fn flags(&self) -> BufferFlags;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_flags() {
        assert_eq!(BufferFlags::FRAME.bits(), 0x6);
        assert!(BufferFlags::FRAME.is_complete_frame());
        assert!((BufferFlags::FRAME | BufferFlags::KEYFRAME).is_complete_frame());
        assert!(!BufferFlags::FRAME_END.is_complete_frame());
        assert!(!(BufferFlags::FRAME | BufferFlags::CORRUPTED).is_complete_frame());
    }

    #[test]
    fn test_filled_buffer_length() {
        let payload = [0u8; 16];
        let buffer = FilledBuffer {
            index: 0,
            data: &payload[..12],
            flags: BufferFlags::FRAME,
            pts: None,
            alloc_size: 16,
        };
        assert_eq!(buffer.length(), 12);
    }
}
