//! Show an image on a DispmanX overlay for a fixed time
//!
//! [`DisplaySurfaceManager::show_image`] runs one complete show-and-remove
//! cycle:
//!
//! ```text
//! display_open ─> update_start ─> resource_create ─> resource_write_data
//!   ─> element_add ─> resource_delete ─> update_submit_sync
//!   ─> (hold) ─> update_start ─> element_remove ─> update_submit_sync
//!   ─> display_close
//! ```
//!
//! Every step is checked and the first failure aborts the cycle. The display
//! is closed on the way out even when a later step failed.

use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::api::{DisplayHandle, Dispmanx, ElementSpec};
use crate::error::{DispmanxError, Result};
use crate::rect::{Alpha, ImageType, Protection, Rect, Transform};

/// Configuration for the overlay surface
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use vc_dispmanx::SurfaceConfig;
///
/// let config = SurfaceConfig::builder()
///     .layer(10)
///     .opacity(255)
///     .hold(Duration::from_millis(500))
///     .build();
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceConfig {
    /// Display device to open (default: 0, the main LCD/HDMI output)
    pub display: u32,

    /// Element layer (default: 5)
    pub layer: i32,

    /// Fixed element opacity (default: 128, half transparent)
    pub opacity: u8,

    /// How long the element stays on screen (default: 1s)
    pub hold: Duration,

    /// Priority passed to `update_start` (default: 0)
    pub priority: i32,

    /// Element orientation (default: no rotation)
    pub transform: Transform,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            display: 0,
            layer: 5,
            opacity: 128,
            hold: Duration::from_secs(1),
            priority: 0,
            transform: Transform::Rot0,
        }
    }
}

impl SurfaceConfig {
    /// Create a new configuration builder
    #[must_use]
    pub fn builder() -> SurfaceConfigBuilder {
        SurfaceConfigBuilder::default()
    }

    /// Validate configuration and return any issues
    pub fn validate(&self) -> std::result::Result<(), Vec<String>> {
        let mut issues = Vec::new();

        if self.opacity == 0 {
            issues.push("opacity 0 makes the element invisible".to_string());
        }

        if self.hold > Duration::from_secs(60) {
            issues.push("hold should not exceed 60s".to_string());
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(issues)
        }
    }

    /// Alpha descriptor for elements shown with this configuration
    #[must_use]
    pub fn alpha(&self) -> Alpha {
        Alpha::fixed(self.opacity)
    }
}

/// Builder for [`SurfaceConfig`]
#[derive(Debug, Clone, Default)]
pub struct SurfaceConfigBuilder {
    display: Option<u32>,
    layer: Option<i32>,
    opacity: Option<u8>,
    hold: Option<Duration>,
    priority: Option<i32>,
    transform: Option<Transform>,
}

impl SurfaceConfigBuilder {
    /// Set the display device
    #[must_use]
    pub fn display(mut self, device: u32) -> Self {
        self.display = Some(device);
        self
    }

    /// Set the element layer
    #[must_use]
    pub fn layer(mut self, layer: i32) -> Self {
        self.layer = Some(layer);
        self
    }

    /// Set the fixed opacity
    #[must_use]
    pub fn opacity(mut self, opacity: u8) -> Self {
        self.opacity = Some(opacity);
        self
    }

    /// Set how long the element stays on screen
    #[must_use]
    pub fn hold(mut self, hold: Duration) -> Self {
        self.hold = Some(hold);
        self
    }

    /// Set the update priority
    #[must_use]
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Set the element orientation
    #[must_use]
    pub fn transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Build the configuration
    #[must_use]
    pub fn build(self) -> SurfaceConfig {
        let defaults = SurfaceConfig::default();

        SurfaceConfig {
            display: self.display.unwrap_or(defaults.display),
            layer: self.layer.unwrap_or(defaults.layer),
            opacity: self.opacity.unwrap_or(defaults.opacity),
            hold: self.hold.unwrap_or(defaults.hold),
            priority: self.priority.unwrap_or(defaults.priority),
            transform: self.transform.unwrap_or(defaults.transform),
        }
    }
}

/// Borrowed RGBA32 pixel data
#[derive(Debug, Clone, Copy)]
pub struct ImageView<'a> {
    data: &'a [u8],
    width: u32,
    height: u32,
    pitch: u32,
}

impl<'a> ImageView<'a> {
    /// Image with rows `pitch` bytes apart
    pub fn new(data: &'a [u8], width: u32, height: u32, pitch: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(DispmanxError::invalid_image(format!("empty image {width}x{height}")));
        }

        let row = u64::from(width) * u64::from(ImageType::Rgba32.bytes_per_pixel());
        if u64::from(pitch) < row {
            return Err(DispmanxError::invalid_image(format!(
                "pitch {pitch} shorter than a {width} pixel row"
            )));
        }

        let needed = Rect::of_size(width, height).upload_len(pitch);
        if (data.len() as u64) < needed {
            return Err(DispmanxError::invalid_image(format!(
                "{width}x{height} pitch {pitch} needs {needed} bytes, got {}",
                data.len()
            )));
        }

        Ok(Self {
            data,
            width,
            height,
            pitch,
        })
    }

    /// Image with the DispmanX default pitch, `align_up(width * 4, 32)`
    pub fn packed(data: &'a [u8], width: u32, height: u32) -> Result<Self> {
        Self::new(data, width, height, ImageType::Rgba32.pitch(width))
    }

    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn pitch(&self) -> u32 {
        self.pitch
    }
}

/// Shows images on a DispmanX overlay
#[derive(Debug, Clone)]
pub struct DisplaySurfaceManager<D> {
    api: D,
    config: SurfaceConfig,
}

impl<D: Dispmanx> DisplaySurfaceManager<D> {
    pub fn new(api: D, config: SurfaceConfig) -> Self {
        Self { api, config }
    }

    #[must_use]
    pub fn config(&self) -> &SurfaceConfig {
        &self.config
    }

    /// The DispmanX implementation in use
    #[must_use]
    pub fn api(&self) -> &D {
        &self.api
    }

    /// Show `image` 1:1 at the top-left of the display, hold, then remove it
    ///
    /// Blocks the calling thread for the whole cycle including the hold.
    pub fn show_image(&self, image: &ImageView<'_>) -> Result<()> {
        let handle = self.api.display_open(self.config.display)?;
        debug!("Opened display {} as {}", self.config.display, handle);

        let shown = self.present(handle, image);
        let closed = self.api.display_close(handle);

        match (shown, closed) {
            (Err(e), Err(close)) => {
                warn!("Closing display {} after a failed show also failed: {}", handle, close);
                Err(e)
            }
            (Err(e), Ok(())) => Err(e),
            (Ok(()), closed) => {
                closed?;
                debug!("Closed display {}", handle);
                Ok(())
            }
        }
    }

    fn present(&self, display: DisplayHandle, image: &ImageView<'_>) -> Result<()> {
        let api = &self.api;
        let (width, height) = (image.width(), image.height());
        let frame = Rect::of_size(width, height);

        let update = api.update_start(self.config.priority)?;
        let resource = api.resource_create(ImageType::Rgba32, width, height)?;
        api.resource_write_data(resource, ImageType::Rgba32, image.pitch(), image.data(), &frame)?;

        let spec = ElementSpec {
            layer: self.config.layer,
            dest: frame,
            src: frame.to_fixed(),
            protection: Protection::None,
            alpha: self.config.alpha(),
            transform: self.config.transform,
        };
        let element = api.element_add(update, display, resource, &spec)?;

        // The element holds its own reference to the resource
        api.resource_delete(resource)?;
        api.update_submit_sync(update)?;
        info!(
            "Showing {}x{} image on display {} layer {} (opacity {}) for {:?}",
            width, height, self.config.display, self.config.layer, self.config.opacity, self.config.hold
        );

        if !self.config.hold.is_zero() {
            thread::sleep(self.config.hold);
        }

        let update = api.update_start(self.config.priority)?;
        api.element_remove(update, element)?;
        api.update_submit_sync(update)?;
        debug!("Removed element {}", element);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{DispmanxCall, SimDisplayConfig, SimDispmanx};

    fn quick() -> SurfaceConfig {
        SurfaceConfig::builder().hold(Duration::ZERO).build()
    }

    #[test]
    fn test_default_config() {
        let config = SurfaceConfig::default();
        assert_eq!(config.display, 0);
        assert_eq!(config.layer, 5);
        assert_eq!(config.opacity, 128);
        assert_eq!(config.hold, Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_invisible() {
        let config = SurfaceConfig::builder().opacity(0).build();
        let issues = config.validate().expect_err("invisible");
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn test_image_view_bounds() {
        let data = vec![0u8; 512 * 128];
        let view = ImageView::packed(&data, 128, 128).expect("fits");
        assert_eq!(view.pitch(), 512);

        assert!(ImageView::packed(&data[..1000], 128, 128).is_err());
        assert!(ImageView::new(&data, 128, 128, 256).is_err());
        assert!(ImageView::new(&data, 0, 128, 512).is_err());

        // The last row needs its padding too, as the upload reads whole rows
        let tight = vec![0u8; 416 * 9 + 400];
        assert!(ImageView::packed(&tight, 100, 10).is_err());
        let padded = vec![0u8; 416 * 10];
        assert!(ImageView::packed(&padded, 100, 10).is_ok());
    }

    #[test]
    fn test_show_image_call_order() {
        let api = SimDispmanx::new(SimDisplayConfig::default());
        let surface = DisplaySurfaceManager::new(api.clone(), quick());
        let data = vec![0x80u8; 512 * 128];

        surface
            .show_image(&ImageView::packed(&data, 128, 128).expect("view"))
            .expect("show");

        assert_eq!(
            api.journal().calls(),
            vec![
                DispmanxCall::DisplayOpen,
                DispmanxCall::UpdateStart,
                DispmanxCall::ResourceCreate,
                DispmanxCall::ResourceWriteData,
                DispmanxCall::ElementAdd,
                DispmanxCall::ResourceDelete,
                DispmanxCall::UpdateSubmitSync,
                DispmanxCall::UpdateStart,
                DispmanxCall::ElementRemove,
                DispmanxCall::UpdateSubmitSync,
                DispmanxCall::DisplayClose,
            ]
        );
        assert_eq!(api.open_displays(), 0);
        assert_eq!(api.live_resources(), 0);
    }

    #[test]
    fn test_show_image_logs_display_handle() {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_test_writer()
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);
        let data = vec![0u8; 512 * 128];
        let view = ImageView::packed(&data, 128, 128).expect("view");

        let api = SimDispmanx::new(SimDisplayConfig::default());
        DisplaySurfaceManager::new(api, quick()).show_image(&view).expect("show");

        // Both the show and the close fail, which takes the warn path
        let api = SimDispmanx::new(
            SimDisplayConfig::default()
                .with_fault(DispmanxCall::ResourceWriteData, -1)
                .with_fault(DispmanxCall::DisplayClose, -1),
        );
        let err = DisplaySurfaceManager::new(api, quick())
            .show_image(&view)
            .expect_err("write fails");
        assert_eq!(err.code(), Some(0xffff_ffff));
    }

    #[test]
    fn test_failed_step_still_closes_display() {
        let api = SimDispmanx::new(SimDisplayConfig::default().with_fault(DispmanxCall::ResourceWriteData, -1));
        let surface = DisplaySurfaceManager::new(api.clone(), quick());
        let data = vec![0u8; 512 * 128];

        let err = surface
            .show_image(&ImageView::packed(&data, 128, 128).expect("view"))
            .expect_err("write fails");
        assert_eq!(
            err,
            DispmanxError::Call {
                call: "vc_dispmanx_resource_write_data",
                code: -1
            }
        );
        assert!(!api.journal().contains(DispmanxCall::ElementAdd));
        assert_eq!(api.journal().calls().last(), Some(&DispmanxCall::DisplayClose));
        assert_eq!(api.open_displays(), 0);
    }
}
