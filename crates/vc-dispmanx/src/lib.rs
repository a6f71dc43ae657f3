//! # vc-dispmanx
//!
//! DispmanX overlays and VideoCore platform bring-up.
//!
//! This crate is part of the vc-pattern workspace. It covers what is needed
//! to put a block of RGBA pixels on screen for a moment: open a display,
//! upload the pixels into a resource, add an element with a fixed alpha,
//! hold, remove it and close the display.
//!
//! # Quick Start
//!
//! ```rust
//! use std::time::Duration;
//! use vc_dispmanx::sim::SimDispmanx;
//! use vc_dispmanx::{DisplaySurfaceManager, ImageView, SurfaceConfig};
//!
//! # fn main() -> Result<(), vc_dispmanx::DispmanxError> {
//! let api = SimDispmanx::default();
//! let surface = DisplaySurfaceManager::new(
//!     api.clone(),
//!     SurfaceConfig::builder().hold(Duration::ZERO).build(),
//! );
//!
//! let pixels = vec![0xffu8; 512 * 128];
//! surface.show_image(&ImageView::packed(&pixels, 128, 128)?)?;
//!
//! // Shown, then removed
//! assert_eq!(api.presentations().len(), 2);
//! # Ok(())
//! # }
//! ```
//!
//! # Backends
//!
//! | Backend | Host | DispmanX | Feature |
//! |---------|------|----------|---------|
//! | Simulated | [`SimHost`] | [`sim::SimDispmanx`] | always |
//! | VideoCore | `BcmHost` | `VcDispmanx` | `videocore` |

// =============================================================================
// CORE MODULES
// =============================================================================

pub mod api;
pub mod error;
pub mod host;
pub mod rect;
pub mod sim;
pub mod surface;

// =============================================================================
// FEATURE MODULES
// =============================================================================

/// Raw `bcm_host.h` declarations
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

pub use api::{DisplayHandle, Dispmanx, ElementHandle, ElementSpec, ResourceHandle, UpdateHandle};
pub use error::{DispmanxError, Result};
pub use host::{Host, HostSession, SimHost};
pub use rect::{align_up, Alpha, AlphaMode, ImageType, Protection, Rect, Transform};
pub use surface::{DisplaySurfaceManager, ImageView, SurfaceConfig, SurfaceConfigBuilder};

#[cfg(feature = "videocore")]
pub use vc::{BcmHost, VcDispmanx};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
