//! # vc-mmal
//!
//! MMAL video source components, output ports and buffer pools.
//!
//! This crate is part of the vc-pattern workspace. It models the slice of
//! the VideoCore Multi-Media Abstraction Layer needed to pull frames out of
//! a source component: create a component, configure and commit the format
//! of an output port, set port parameters, allocate a pool, enable the port
//! with a callback, and feed it buffers.
//!
//! # Backends
//!
//! - [`sim`] - a software `vc.ril.source` with its own driver thread, used by
//!   default and by every test in the workspace
//! - `vc` - the VideoCore userland libraries, behind the `videocore` feature
//!
//! Both implement the traits in [`component`], so code written against
//! [`ComponentFactory`] runs unchanged on either.
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::mpsc;
//! use vc_mmal::sim::SimFactory;
//! use vc_mmal::{
//!     BufferPool, ComponentFactory, Encoding, FilledBuffer, MediaComponent, OutputPort,
//!     PortParameter, SourcePattern, VideoFormat, SOURCE_COMPONENT,
//! };
//!
//! # fn main() -> Result<(), vc_mmal::MmalError> {
//! let mut factory = SimFactory::with_default();
//! let mut component = factory.create(SOURCE_COMPONENT)?;
//! let port = component.output(0).expect("source has one output");
//!
//! *port.format_mut() = VideoFormat::for_frame(Encoding::RGBA, 128, 128);
//! port.commit_format()?;
//! port.set_parameter(PortParameter::SourcePattern(SourcePattern::Random))?;
//!
//! let pool = port.create_pool(port.buffer_num(), port.buffer_size())?;
//! let (tx, rx) = mpsc::sync_channel(1);
//! port.enable(Box::new(move |buffer: FilledBuffer<'_>| {
//!     let _ = tx.try_send(buffer.length());
//! }))?;
//! while let Some(header) = pool.get() {
//!     port.send_buffer(header)?;
//! }
//!
//! let filled = rx.recv().expect("one frame");
//! assert_eq!(filled, 128 * 128 * 4);
//!
//! port.disable()?;
//! port.destroy_pool(pool);
//! component.destroy()?;
//! factory.shutdown()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐      ┌──────────────────────────┐
//! │  ComponentFactory    │ ───> │  MediaComponent          │
//! └──────────────────────┘      │   output(0): OutputPort  │
//!                               └────────────┬─────────────┘
//!                                            │ create_pool
//!                                            ▼
//!                               ┌──────────────────────────┐
//!                               │  BufferPool              │
//!                               │   get() -> BufferHeader  │──┐ send_buffer
//!                               └──────────────────────────┘  │
//!                                                             ▼
//!                               ┌──────────────────────────┐
//!                               │  driver thread           │
//!                               │   callback(FilledBuffer) │
//!                               └──────────────────────────┘
//! ```
//!
//! # Cargo Features
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `videocore` | No | Link `libmmal_core`, `libmmal_util`, `libmmal_vc_client` |

// =============================================================================
// CORE MODULES
// =============================================================================

pub mod buffer;
pub mod component;
pub mod error;
pub mod format;
pub mod param;
pub mod pattern;
pub mod sim;

// =============================================================================
// FEATURE MODULES
// =============================================================================

/// Raw MMAL declarations
///
/// Requires the `videocore` feature.
#[cfg(feature = "videocore")]
pub mod ffi;

/// VideoCore backend
///
/// Requires the `videocore` feature.
#[cfg(feature = "videocore")]
pub mod vc;

// =============================================================================
// RE-EXPORTS - PRIMARY API
// =============================================================================

pub use buffer::{BufferCallback, BufferFlags, BufferHeader, FilledBuffer};
pub use component::{
    BufferPool, BufferRequirements, ComponentFactory, MediaComponent, OutputPort, SOURCE_COMPONENT,
};
pub use error::{MmalError, MmalStatus, Result};
pub use format::{align_up, Encoding, Rect, VideoFormat, HEIGHT_ALIGN, STRIDE_ALIGN, WIDTH_ALIGN};
pub use param::{PortParameter, SourcePattern};

#[cfg(feature = "videocore")]
pub use vc::{VcComponent, VcFactory, VcPool, VcPort};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_source_component_name() {
        assert_eq!(SOURCE_COMPONENT, "vc.ril.source");
    }
}
