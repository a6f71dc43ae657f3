//! Capture run configuration
//!
//! The binary always runs with [`DemoConfig::default()`]: a 128x128 RGBA
//! random-pattern frame from `vc.ril.source`, shown at half opacity on
//! layer 5 for one second. The builder exists for tests and library users.
//!
//! # Examples
//!
//! ```rust
//! use std::time::Duration;
//! use vc_pattern::config::DemoConfig;
//! use vc_pattern::mmal::SourcePattern;
//!
//! let config = DemoConfig::builder()
//!     .size(64, 48)
//!     .pattern(SourcePattern::Colour)
//!     .completion_timeout(Duration::from_secs(5))
//!     .build();
//! assert!(config.validate().is_ok());
//! ```

use std::time::Duration;

use vc_dispmanx::SurfaceConfig;
use vc_mmal::{Encoding, SourcePattern, VideoFormat, SOURCE_COMPONENT};

/// Largest frame edge accepted, in pixels
const MAX_EDGE: u32 = 4096;

/// Configuration for one capture-and-show run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoConfig {
    /// Component to create (default: `vc.ril.source`)
    pub component: String,

    /// Output port to configure (default: 0)
    pub output_port: usize,

    /// Frame width before alignment (default: 128)
    pub width: u32,

    /// Frame height before alignment (default: 128)
    pub height: u32,

    /// Pixel encoding (default: RGBA)
    ///
    /// The overlay uploads RGBA32, so anything else only works with a
    /// display path that converts.
    pub encoding: Encoding,

    /// Pattern the source generates (default: random)
    pub pattern: SourcePattern,

    /// Request zero-copy buffers (default: false)
    pub zero_copy: bool,

    /// Give up waiting for the frame after this long (default: wait forever)
    pub completion_timeout: Option<Duration>,

    /// Overlay settings
    pub surface: SurfaceConfig,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            component: SOURCE_COMPONENT.to_string(),
            output_port: 0,
            width: 128,
            height: 128,
            encoding: Encoding::RGBA,
            pattern: SourcePattern::Random,
            zero_copy: false,
            completion_timeout: None,
            surface: SurfaceConfig::default(),
        }
    }
}

impl DemoConfig {
    /// Create a new configuration builder
    #[must_use]
    pub fn builder() -> DemoConfigBuilder {
        DemoConfigBuilder::default()
    }

    /// Port format to request: size aligned up, crop set to the frame
    #[must_use]
    pub fn video_format(&self) -> VideoFormat {
        VideoFormat::for_frame(self.encoding, self.width, self.height)
    }

    /// Validate configuration and return any issues
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut issues = Vec::new();

        if self.component.is_empty() {
            issues.push("component cannot be empty".to_string());
        }

        if self.width == 0 || self.height == 0 {
            issues.push(format!("frame size {}x{} has no pixels", self.width, self.height));
        }

        if self.width > MAX_EDGE || self.height > MAX_EDGE {
            issues.push(format!("frame size {}x{} exceeds {MAX_EDGE}", self.width, self.height));
        }

        if self.encoding != Encoding::RGBA {
            issues.push(format!("encoding {} cannot be shown, the overlay takes RGBA", self.encoding));
        }

        if self.completion_timeout.is_some_and(|t| t.is_zero()) {
            issues.push("completion_timeout must be non-zero".to_string());
        }

        if let Err(surface) = self.surface.validate() {
            issues.extend(surface.into_iter().map(|issue| format!("surface: {issue}")));
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(issues)
        }
    }
}

/// Builder for [`DemoConfig`]
#[derive(Debug, Clone, Default)]
pub struct DemoConfigBuilder {
    component: Option<String>,
    output_port: Option<usize>,
    size: Option<(u32, u32)>,
    encoding: Option<Encoding>,
    pattern: Option<SourcePattern>,
    zero_copy: Option<bool>,
    completion_timeout: Option<Duration>,
    surface: Option<SurfaceConfig>,
}

impl DemoConfigBuilder {
    /// Set the component name
    #[must_use]
    pub fn component(mut self, name: impl Into<String>) -> Self {
        self.component = Some(name.into());
        self
    }

    /// Set the output port index
    #[must_use]
    pub fn output_port(mut self, index: usize) -> Self {
        self.output_port = Some(index);
        self
    }

    /// Set the frame size
    #[must_use]
    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.size = Some((width, height));
        self
    }

    /// Set the pixel encoding
    #[must_use]
    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    /// Set the source pattern
    #[must_use]
    pub fn pattern(mut self, pattern: SourcePattern) -> Self {
        self.pattern = Some(pattern);
        self
    }

    /// Set whether zero-copy buffers are requested
    #[must_use]
    pub fn zero_copy(mut self, enable: bool) -> Self {
        self.zero_copy = Some(enable);
        self
    }

    /// Stop waiting for the frame after `timeout`
    #[must_use]
    pub fn completion_timeout(mut self, timeout: Duration) -> Self {
        self.completion_timeout = Some(timeout);
        self
    }

    /// Set the overlay configuration
    #[must_use]
    pub fn surface(mut self, surface: SurfaceConfig) -> Self {
        self.surface = Some(surface);
        self
    }

    /// Build the configuration
    #[must_use]
    pub fn build(self) -> DemoConfig {
        let defaults = DemoConfig::default();
        let (width, height) = self.size.unwrap_or((defaults.width, defaults.height));

        DemoConfig {
            component: self.component.unwrap_or(defaults.component),
            output_port: self.output_port.unwrap_or(defaults.output_port),
            width,
            height,
            encoding: self.encoding.unwrap_or(defaults.encoding),
            pattern: self.pattern.unwrap_or(defaults.pattern),
            zero_copy: self.zero_copy.unwrap_or(defaults.zero_copy),
            completion_timeout: self.completion_timeout.or(defaults.completion_timeout),
            surface: self.surface.unwrap_or(defaults.surface),
        }
    }
}
