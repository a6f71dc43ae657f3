//! # vc-pattern
//!
//! Capture one frame from the VideoCore `vc.ril.source` pattern generator
//! and show it on a DispmanX overlay.
//!
//! The crate ties together the workspace libraries:
//!
//! - **[`mmal`]** - MMAL component, port and pool bindings, plus a simulated source
//! - **[`dispmanx`]** - `bcm_host` and DispmanX bindings, plus a simulated compositor
//!
//! and adds the capture sequence that drives them:
//!
//! - **[`sequence`]** - the single-shot INIT → TERMINATED run
//! - **[`handshake`]** - the completion gate between the driver thread and the run
//! - **[`config`]** - frame size, pattern and overlay settings
//! - **[`error`]** - located diagnostics for every checked hardware call
//!
//! # Features
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `videocore` | No | Link `libmmal` and `libbcm_host` and run on real hardware |
//!
//! Without `videocore` the binary and tests run the same sequence against the
//! simulated backends.
//!
//! # Quick Start
//!
//! ```rust
//! use std::time::Duration;
//! use vc_pattern::prelude::*;
//! use vc_pattern::dispmanx::sim::SimDispmanx;
//! use vc_pattern::mmal::sim::SimFactory;
//!
//! let host = SimHost::new();
//! let config = DemoConfig::builder()
//!     .surface(SurfaceConfig::builder().hold(Duration::ZERO).build())
//!     .build();
//!
//! let mut sequence = CaptureSequence::new(
//!     host.clone(),
//!     SimFactory::with_default(),
//!     SimDispmanx::default().with_host(host),
//!     config,
//! );
//! let report = sequence.run()?;
//! println!("Showed buffer {} ({} bytes)", report.frame.index, report.frame.length);
//! # Ok::<(), DemoError>(())
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         vc-pattern                           │
//! │      CaptureSequence ── Handshake ── DemoConfig/DemoError    │
//! ├──────────────────────────────┬───────────────────────────────┤
//! │           vc-mmal            │          vc-dispmanx          │
//! │                              │                               │
//! │  ComponentFactory            │  Host / HostSession           │
//! │  OutputPort / BufferPool     │  Dispmanx                     │
//! │  SimFactory | VcFactory      │  DisplaySurfaceManager        │
//! │                              │  SimDispmanx | VcDispmanx     │
//! └──────────────┬───────────────┴───────────────┬───────────────┘
//!                │                               │
//!                ▼                               ▼
//!        libmmal / libmmal_vc_client       libbcm_host (DispmanX)
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod config;
pub mod error;
pub mod handshake;
pub mod sequence;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// RE-EXPORTS
// =============================================================================

/// MMAL components, ports and buffer pools.
///
/// See [`vc_mmal`] documentation for details.
pub use vc_mmal as mmal;

/// `bcm_host` lifetime and DispmanX overlays.
///
/// See [`vc_dispmanx`] documentation for details.
pub use vc_dispmanx as dispmanx;

pub use config::{DemoConfig, DemoConfigBuilder};
pub use error::{CallSite, DemoError, Result};
pub use handshake::{handshake, Completer, Handshake, HandshakeError};
pub use sequence::{CaptureSequence, FrameSummary, RunReport, SequenceState, Step, StepRecord};

// =============================================================================
// PRELUDE - Common types for convenience
// =============================================================================

/// Prelude module with commonly used types.
///
/// ```rust
/// use vc_pattern::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::DemoConfig;
    pub use crate::error::DemoError;
    pub use crate::sequence::{CaptureSequence, RunReport, SequenceState};

    pub use vc_dispmanx::{Host, SimHost, SurfaceConfig};
    pub use vc_mmal::{ComponentFactory, SourcePattern};
}
