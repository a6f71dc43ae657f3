//! Simulated DispmanX compositor
//!
//! Keeps displays, updates, resources and elements in memory with the same
//! handle lifetimes as the firmware service. Updates are staged and applied
//! on [`Dispmanx::update_submit_sync`], which composites every element of
//! the affected displays into an RGBA screen by layer order and records the
//! result as a [`Presentation`].
//!
//! Every call lands in a [`SimJournal`] with the instant it was made, and
//! any call can be made to fail, which is what the overlay tests build on.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::api::{DisplayHandle, Dispmanx, ElementHandle, ElementSpec, ResourceHandle, UpdateHandle};
use crate::error::{DispmanxError, Result};
use crate::host::SimHost;
use crate::rect::{Alpha, AlphaMode, ImageType, Rect, Transform};

/// Return value for calls the simulated compositor rejects
const FAILED: i32 = -1;

/// Calls recorded by the simulated compositor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispmanxCall {
    DisplayOpen,
    UpdateStart,
    ResourceCreate,
    ResourceWriteData,
    ElementAdd,
    ResourceDelete,
    UpdateSubmitSync,
    ElementRemove,
    DisplayClose,
}

impl DispmanxCall {
    /// The DispmanX function this call stands for
    #[must_use]
    pub fn api_name(self) -> &'static str {
        match self {
            Self::DisplayOpen => "vc_dispmanx_display_open",
            Self::UpdateStart => "vc_dispmanx_update_start",
            Self::ResourceCreate => "vc_dispmanx_resource_create",
            Self::ResourceWriteData => "vc_dispmanx_resource_write_data",
            Self::ElementAdd => "vc_dispmanx_element_add",
            Self::ResourceDelete => "vc_dispmanx_resource_delete",
            Self::UpdateSubmitSync => "vc_dispmanx_update_submit_sync",
            Self::ElementRemove => "vc_dispmanx_element_remove",
            Self::DisplayClose => "vc_dispmanx_display_close",
        }
    }

    fn returns_handle(self) -> bool {
        matches!(
            self,
            Self::DisplayOpen | Self::UpdateStart | Self::ResourceCreate | Self::ElementAdd
        )
    }
}

/// Shared, timestamped record of calls made against the compositor
#[derive(Debug, Clone, Default)]
pub struct SimJournal {
    calls: Arc<Mutex<Vec<(DispmanxCall, Instant)>>>,
}

impl SimJournal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, call: DispmanxCall) {
        self.calls.lock().push((call, Instant::now()));
    }

    /// All calls in the order they were made
    #[must_use]
    pub fn calls(&self) -> Vec<DispmanxCall> {
        self.calls.lock().iter().map(|(call, _)| *call).collect()
    }

    /// Number of times `call` was made
    #[must_use]
    pub fn count(&self, call: DispmanxCall) -> usize {
        self.calls.lock().iter().filter(|(c, _)| *c == call).count()
    }

    /// Whether `call` was made at least once
    #[must_use]
    pub fn contains(&self, call: DispmanxCall) -> bool {
        self.count(call) > 0
    }

    /// When `call` was last made
    #[must_use]
    pub fn last_at(&self, call: DispmanxCall) -> Option<Instant> {
        self.calls
            .lock()
            .iter()
            .rev()
            .find(|(c, _)| *c == call)
            .map(|(_, at)| *at)
    }
}

/// Behaviour of the simulated compositor
#[derive(Debug, Clone)]
pub struct SimDisplayConfig {
    /// Screen width in pixels (default: 640)
    pub screen_width: u32,

    /// Screen height in pixels (default: 480)
    pub screen_height: u32,

    /// Colour behind all elements, RGBA (default: opaque black)
    pub background: [u8; 4],

    /// Display devices that can be opened (default: 0 only)
    pub devices: Vec<u32>,

    /// Calls that fail; integer calls return the given code, handle calls return no handle
    pub faults: Vec<(DispmanxCall, i32)>,
}

impl Default for SimDisplayConfig {
    fn default() -> Self {
        Self {
            screen_width: 640,
            screen_height: 480,
            background: [0, 0, 0, 0xff],
            devices: vec![0],
            faults: Vec::new(),
        }
    }
}

impl SimDisplayConfig {
    /// Make `call` fail with `code`
    #[must_use]
    pub fn with_fault(mut self, call: DispmanxCall, code: i32) -> Self {
        self.faults.push((call, code));
        self
    }

    /// Set the screen size
    #[must_use]
    pub fn with_screen(mut self, width: u32, height: u32) -> Self {
        self.screen_width = width;
        self.screen_height = height;
        self
    }

    /// Make another display device available
    #[must_use]
    pub fn with_device(mut self, device: u32) -> Self {
        self.devices.push(device);
        self
    }

    fn fault(&self, call: DispmanxCall) -> Option<i32> {
        self.faults.iter().find(|(c, _)| *c == call).map(|(_, code)| *code)
    }
}

/// One composited screen, captured on `update_submit_sync`
#[derive(Debug, Clone)]
pub struct Presentation {
    /// Display device the screen belongs to
    pub display: u32,
    /// Elements on screen after the update
    pub elements: usize,
    pub width: u32,
    pub height: u32,
    /// RGBA pixels, `width * 4` bytes per row
    pub frame: Vec<u8>,
    pub at: Instant,
}

impl Presentation {
    /// RGBA value at (`x`, `y`)
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let off = ((y * self.width + x) * 4) as usize;
        let px = self.frame.get(off..off + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}

/// Resource contents, always stored as RGBA
#[derive(Debug, Clone)]
struct SimImage {
    image_type: ImageType,
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl SimImage {
    fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let off = ((y * self.width + x) * 4) as usize;
        [
            self.pixels[off],
            self.pixels[off + 1],
            self.pixels[off + 2],
            self.pixels[off + 3],
        ]
    }
}

#[derive(Debug, Clone)]
struct SimElement {
    display: u32,
    layer: i32,
    dest: Rect,
    src: Rect,
    alpha: Alpha,
    transform: Transform,
    image: Arc<SimImage>,
}

#[derive(Debug)]
enum Pending {
    Add(u32, SimElement),
    Remove(u32),
}

#[derive(Debug, Default)]
struct State {
    next_handle: u32,
    /// Display handle to device id
    displays: HashMap<u32, u32>,
    updates: HashMap<u32, Vec<Pending>>,
    resources: HashMap<u32, Arc<SimImage>>,
    elements: HashMap<u32, SimElement>,
    presentations: Vec<Presentation>,
}

impl State {
    fn allocate(&mut self) -> u32 {
        self.next_handle += 1;
        self.next_handle
    }

    fn element_pending(&self, handle: u32) -> bool {
        self.updates
            .values()
            .flatten()
            .any(|op| matches!(op, Pending::Add(h, _) if *h == handle))
    }
}

/// In-memory DispmanX
///
/// Clones share state, so a clone can be handed to a capture callback while
/// the original stays with the test for inspection.
#[derive(Debug, Clone)]
pub struct SimDispmanx {
    config: Arc<SimDisplayConfig>,
    journal: SimJournal,
    state: Arc<Mutex<State>>,
    host: Option<SimHost>,
}

impl Default for SimDispmanx {
    fn default() -> Self {
        Self::new(SimDisplayConfig::default())
    }
}

impl SimDispmanx {
    #[must_use]
    pub fn new(config: SimDisplayConfig) -> Self {
        Self {
            config: Arc::new(config),
            journal: SimJournal::new(),
            state: Arc::new(Mutex::new(State::default())),
            host: None,
        }
    }

    /// Fail every call made while `host` is not initialized
    #[must_use]
    pub fn with_host(mut self, host: SimHost) -> Self {
        self.host = Some(host);
        self
    }

    /// Journal shared by all clones
    #[must_use]
    pub fn journal(&self) -> SimJournal {
        self.journal.clone()
    }

    /// Screens captured so far
    #[must_use]
    pub fn presentations(&self) -> Vec<Presentation> {
        self.state.lock().presentations.clone()
    }

    /// Displays currently open
    #[must_use]
    pub fn open_displays(&self) -> usize {
        self.state.lock().displays.len()
    }

    /// Resource handles not yet deleted
    #[must_use]
    pub fn live_resources(&self) -> usize {
        self.state.lock().resources.len()
    }

    /// Elements currently on screen
    #[must_use]
    pub fn visible_elements(&self) -> usize {
        self.state.lock().elements.len()
    }

    /// Record `call` and return the code it should fail with, if any
    fn enter(&self, call: DispmanxCall) -> Option<i32> {
        self.journal.record(call);

        if let Some(host) = &self.host {
            if !host.is_initialized() {
                debug!("{} called without bcm_host_init", call.api_name());
                return Some(FAILED);
            }
        }

        let fault = self.config.fault(call);
        if let Some(code) = fault {
            debug!("Injecting {} into {}", code, call.api_name());
        }
        fault
    }

    fn fail(call: DispmanxCall, code: i32) -> DispmanxError {
        if call.returns_handle() {
            DispmanxError::NullHandle {
                call: call.api_name(),
            }
        } else {
            DispmanxError::Call {
                call: call.api_name(),
                code,
            }
        }
    }

    fn guard(&self, call: DispmanxCall) -> Result<()> {
        match self.enter(call) {
            Some(code) => Err(Self::fail(call, code)),
            None => Ok(()),
        }
    }

    fn compose(&self, state: &State, display: u32) -> Presentation {
        let (width, height) = (self.config.screen_width, self.config.screen_height);
        let device = state.displays.get(&display).copied().unwrap_or_default();

        let mut frame: Vec<u8> = self
            .config
            .background
            .iter()
            .copied()
            .cycle()
            .take((width * height * 4) as usize)
            .collect();

        let mut elements: Vec<(&u32, &SimElement)> =
            state.elements.iter().filter(|(_, e)| e.display == display).collect();
        elements.sort_by_key(|(handle, e)| (e.layer, **handle));

        for (_, element) in &elements {
            blend(element, &mut frame, width, height);
        }

        Presentation {
            display: device,
            elements: elements.len(),
            width,
            height,
            frame,
            at: Instant::now(),
        }
    }
}

/// Composite one element onto an RGBA screen
fn blend(element: &SimElement, frame: &mut [u8], width: u32, height: u32) {
    let dest = element.dest;
    let src = element.src;
    let image = &element.image;
    let scale = f64::from(1u32 << 16);

    for dy in 0..dest.height {
        let y = dest.y + dy;
        if y < 0 || y >= height as i32 {
            continue;
        }
        for dx in 0..dest.width {
            let x = dest.x + dx;
            if x < 0 || x >= width as i32 {
                continue;
            }

            let u = (f64::from(dx) + 0.5) / f64::from(dest.width);
            let v = (f64::from(dy) + 0.5) / f64::from(dest.height);
            let (s, t) = element.transform.source_position(u, v);
            let sx = (f64::from(src.x) + s * f64::from(src.width)) / scale;
            let sy = (f64::from(src.y) + t * f64::from(src.height)) / scale;
            let sx = (sx.floor().max(0.0) as u32).min(image.width - 1);
            let sy = (sy.floor().max(0.0) as u32).min(image.height - 1);

            let px = image.pixel(sx, sy);
            let alpha = match element.alpha.mode {
                AlphaMode::FromSource => px[3],
                AlphaMode::FixedAllPixels => element.alpha.opacity,
                AlphaMode::FixedNonZero if px[..3].iter().all(|&c| c == 0) => 0,
                AlphaMode::FixedExceed0x07 if px[..3].iter().all(|&c| c <= 0x07) => 0,
                AlphaMode::FixedNonZero | AlphaMode::FixedExceed0x07 => element.alpha.opacity,
            };

            let off = ((y as u32 * width + x as u32) * 4) as usize;
            let a = u32::from(alpha);
            for c in 0..3 {
                let under = u32::from(frame[off + c]);
                let over = u32::from(px[c]);
                frame[off + c] = ((over * a + under * (255 - a) + 127) / 255) as u8;
            }
            frame[off + 3] = 0xff;
        }
    }
}

/// Decode one source pixel into RGBA
fn decode(image_type: ImageType, px: &[u8]) -> [u8; 4] {
    match image_type {
        ImageType::Rgba32 => [px[0], px[1], px[2], px[3]],
        ImageType::Rgb888 => [px[0], px[1], px[2], 0xff],
        ImageType::Rgb565 => {
            let v = u16::from_le_bytes([px[0], px[1]]);
            let r = ((v >> 11) & 0x1f) as u8;
            let g = ((v >> 5) & 0x3f) as u8;
            let b = (v & 0x1f) as u8;
            [(r << 3) | (r >> 2), (g << 2) | (g >> 4), (b << 3) | (b >> 2), 0xff]
        }
    }
}

impl Dispmanx for SimDispmanx {
    fn display_open(&self, device: u32) -> Result<DisplayHandle> {
        let call = DispmanxCall::DisplayOpen;
        self.guard(call)?;

        if !self.config.devices.contains(&device) {
            return Err(Self::fail(call, FAILED));
        }

        let mut state = self.state.lock();
        let handle = state.allocate();
        state.displays.insert(handle, device);
        Ok(DisplayHandle::from_raw(handle))
    }

    fn update_start(&self, priority: i32) -> Result<UpdateHandle> {
        self.guard(DispmanxCall::UpdateStart)?;

        let mut state = self.state.lock();
        let handle = state.allocate();
        state.updates.insert(handle, Vec::new());
        trace!("Update {} started at priority {}", handle, priority);
        Ok(UpdateHandle::from_raw(handle))
    }

    fn resource_create(&self, image_type: ImageType, width: u32, height: u32) -> Result<ResourceHandle> {
        let call = DispmanxCall::ResourceCreate;
        self.guard(call)?;

        if width == 0 || height == 0 {
            return Err(Self::fail(call, FAILED));
        }

        let mut state = self.state.lock();
        let handle = state.allocate();
        state.resources.insert(
            handle,
            Arc::new(SimImage {
                image_type,
                width,
                height,
                pixels: vec![0; (width * height * 4) as usize],
            }),
        );
        Ok(ResourceHandle::from_raw(handle))
    }

    fn resource_write_data(
        &self,
        resource: ResourceHandle,
        image_type: ImageType,
        pitch: u32,
        data: &[u8],
        rect: &Rect,
    ) -> Result<()> {
        let call = DispmanxCall::ResourceWriteData;
        self.guard(call)?;

        let mut state = self.state.lock();
        let Some(image) = state.resources.get_mut(&resource.raw()) else {
            return Err(Self::fail(call, FAILED));
        };
        if image.image_type != image_type || !rect.fits_within(image.width, image.height) {
            return Err(Self::fail(call, FAILED));
        }

        let bpp = image_type.bytes_per_pixel() as usize;
        let (x0, y0) = (rect.x as usize, rect.y as usize);
        let (w, h) = (rect.width as usize, rect.height as usize);
        if (data.len() as u64) < rect.upload_len(pitch) {
            return Err(Self::fail(call, FAILED));
        }
        let pitch = pitch as usize;
        if pitch < (x0 + w) * bpp {
            return Err(Self::fail(call, FAILED));
        }

        let image = Arc::make_mut(image);
        let stride = image.width as usize * 4;
        for row in 0..h {
            let src = &data[(y0 + row) * pitch + x0 * bpp..][..w * bpp];
            let dst = &mut image.pixels[(y0 + row) * stride + x0 * 4..][..w * 4];
            for (out, px) in dst.chunks_exact_mut(4).zip(src.chunks_exact(bpp)) {
                out.copy_from_slice(&decode(image_type, px));
            }
        }

        trace!("Wrote {}x{} into resource {}", w, h, resource);
        Ok(())
    }

    fn element_add(
        &self,
        update: UpdateHandle,
        display: DisplayHandle,
        resource: ResourceHandle,
        spec: &ElementSpec,
    ) -> Result<ElementHandle> {
        let call = DispmanxCall::ElementAdd;
        self.guard(call)?;

        let mut state = self.state.lock();
        if !state.updates.contains_key(&update.raw()) || !state.displays.contains_key(&display.raw()) {
            return Err(Self::fail(call, FAILED));
        }
        let Some(image) = state.resources.get(&resource.raw()).cloned() else {
            return Err(Self::fail(call, FAILED));
        };
        if spec.dest.is_empty() || !spec.src.from_fixed().fits_within(image.width, image.height) {
            return Err(Self::fail(call, FAILED));
        }

        let handle = state.allocate();
        let element = SimElement {
            display: display.raw(),
            layer: spec.layer,
            dest: spec.dest,
            src: spec.src,
            alpha: spec.alpha,
            transform: spec.transform,
            image,
        };
        if let Some(ops) = state.updates.get_mut(&update.raw()) {
            ops.push(Pending::Add(handle, element));
        }
        Ok(ElementHandle::from_raw(handle))
    }

    fn resource_delete(&self, resource: ResourceHandle) -> Result<()> {
        let call = DispmanxCall::ResourceDelete;
        self.guard(call)?;

        match self.state.lock().resources.remove(&resource.raw()) {
            Some(_) => Ok(()),
            None => Err(Self::fail(call, FAILED)),
        }
    }

    fn update_submit_sync(&self, update: UpdateHandle) -> Result<()> {
        let call = DispmanxCall::UpdateSubmitSync;
        self.guard(call)?;

        let mut state = self.state.lock();
        let Some(ops) = state.updates.remove(&update.raw()) else {
            return Err(Self::fail(call, FAILED));
        };

        let mut touched = Vec::new();
        for op in ops {
            match op {
                Pending::Add(handle, element) => {
                    touched.push(element.display);
                    state.elements.insert(handle, element);
                }
                Pending::Remove(handle) => {
                    if let Some(element) = state.elements.remove(&handle) {
                        touched.push(element.display);
                    }
                }
            }
        }
        touched.sort_unstable();
        touched.dedup();

        for display in touched {
            if state.displays.contains_key(&display) {
                let presentation = self.compose(&state, display);
                debug!(
                    "Presented display {} with {} elements",
                    presentation.display, presentation.elements
                );
                state.presentations.push(presentation);
            }
        }
        Ok(())
    }

    fn element_remove(&self, update: UpdateHandle, element: ElementHandle) -> Result<()> {
        let call = DispmanxCall::ElementRemove;
        self.guard(call)?;

        let mut state = self.state.lock();
        let known = state.elements.contains_key(&element.raw()) || state.element_pending(element.raw());
        match state.updates.get_mut(&update.raw()) {
            Some(ops) if known => {
                ops.push(Pending::Remove(element.raw()));
                Ok(())
            }
            _ => Err(Self::fail(call, FAILED)),
        }
    }

    fn display_close(&self, display: DisplayHandle) -> Result<()> {
        let call = DispmanxCall::DisplayClose;
        self.guard(call)?;

        let mut state = self.state.lock();
        if state.displays.remove(&display.raw()).is_none() {
            return Err(Self::fail(call, FAILED));
        }
        state.elements.retain(|_, e| e.display != display.raw());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rect::Protection;

    fn spec(layer: i32, dest: Rect, size: u32, alpha: Alpha) -> ElementSpec {
        ElementSpec {
            layer,
            dest,
            src: Rect::of_size(size, size).to_fixed(),
            protection: Protection::None,
            alpha,
            transform: Transform::Rot0,
        }
    }

    fn solid(api: &SimDispmanx, size: u32, rgba: [u8; 4]) -> ResourceHandle {
        let resource = api.resource_create(ImageType::Rgba32, size, size).expect("resource");
        let pitch = ImageType::Rgba32.pitch(size);
        let mut data = vec![0u8; (pitch * size) as usize];
        for row in data.chunks_exact_mut(pitch as usize) {
            for px in row[..(size * 4) as usize].chunks_exact_mut(4) {
                px.copy_from_slice(&rgba);
            }
        }
        api.resource_write_data(resource, ImageType::Rgba32, pitch, &data, &Rect::of_size(size, size))
            .expect("write");
        resource
    }

    #[test]
    fn test_half_opacity_blend() {
        let api = SimDispmanx::new(SimDisplayConfig::default().with_screen(64, 64));
        let display = api.display_open(0).expect("display");
        let update = api.update_start(0).expect("update");
        let resource = solid(&api, 16, [0xff, 0xff, 0xff, 0xff]);
        api.element_add(update, display, resource, &spec(5, Rect::of_size(16, 16), 16, Alpha::fixed(128)))
            .expect("element");
        api.resource_delete(resource).expect("delete");
        api.update_submit_sync(update).expect("submit");

        let shown = api.presentations();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].elements, 1);
        assert_eq!(shown[0].pixel(0, 0), Some([128, 128, 128, 255]));
        assert_eq!(shown[0].pixel(16, 16), Some([0, 0, 0, 255]));
        assert_eq!(api.live_resources(), 0);
        assert_eq!(api.visible_elements(), 1);
    }

    #[test]
    fn test_layers_stack_in_order() {
        let api = SimDispmanx::new(SimDisplayConfig::default().with_screen(32, 32));
        let display = api.display_open(0).expect("display");
        let update = api.update_start(0).expect("update");
        let red = solid(&api, 8, [0xff, 0, 0, 0xff]);
        let blue = solid(&api, 8, [0, 0, 0xff, 0xff]);

        // Added top layer first; stacking follows layer, not call order
        api.element_add(update, display, blue, &spec(6, Rect::of_size(8, 8), 8, Alpha::fixed(255)))
            .expect("blue");
        api.element_add(update, display, red, &spec(5, Rect::of_size(8, 8), 8, Alpha::fixed(255)))
            .expect("red");
        api.update_submit_sync(update).expect("submit");

        let frame = api.presentations().pop().expect("presentation");
        assert_eq!(frame.pixel(3, 3), Some([0, 0, 0xff, 0xff]));
    }

    #[test]
    fn test_source_rect_scales() {
        let api = SimDispmanx::new(SimDisplayConfig::default().with_screen(32, 32));
        let display = api.display_open(0).expect("display");
        let update = api.update_start(0).expect("update");
        let resource = solid(&api, 4, [0x10, 0x20, 0x30, 0xff]);

        // 4x4 source stretched over 16x16
        api.element_add(update, display, resource, &spec(1, Rect::new(8, 8, 16, 16), 4, Alpha::fixed(255)))
            .expect("element");
        api.update_submit_sync(update).expect("submit");

        let frame = api.presentations().pop().expect("presentation");
        assert_eq!(frame.pixel(8, 8), Some([0x10, 0x20, 0x30, 0xff]));
        assert_eq!(frame.pixel(23, 23), Some([0x10, 0x20, 0x30, 0xff]));
        assert_eq!(frame.pixel(24, 24), Some([0, 0, 0, 0xff]));
    }

    #[test]
    fn test_remove_clears_screen() {
        let api = SimDispmanx::default();
        let display = api.display_open(0).expect("display");
        let update = api.update_start(0).expect("update");
        let resource = solid(&api, 8, [0xff; 4]);
        let element = api
            .element_add(update, display, resource, &spec(5, Rect::of_size(8, 8), 8, Alpha::fixed(255)))
            .expect("element");
        api.update_submit_sync(update).expect("submit");

        let update = api.update_start(0).expect("update");
        api.element_remove(update, element).expect("remove");
        api.update_submit_sync(update).expect("submit");

        let shown = api.presentations();
        assert_eq!(shown.len(), 2);
        assert_eq!(shown[1].elements, 0);
        assert_eq!(shown[1].pixel(0, 0), Some([0, 0, 0, 0xff]));
        api.display_close(display).expect("close");
        assert_eq!(api.open_displays(), 0);
    }

    #[test]
    fn test_write_needs_whole_last_row() {
        let api = SimDispmanx::default();
        let resource = api.resource_create(ImageType::Rgba32, 100, 10).expect("resource");
        let pitch = ImageType::Rgba32.pitch(100);
        let frame = Rect::of_size(100, 10);

        let tight = vec![0u8; (pitch * 9 + 400) as usize];
        assert!(api
            .resource_write_data(resource, ImageType::Rgba32, pitch, &tight, &frame)
            .is_err());
        // Anything the image view accepts uploads
        assert!(crate::surface::ImageView::new(&tight, 100, 10, pitch).is_err());

        let padded = vec![0u8; (pitch * 10) as usize];
        assert!(crate::surface::ImageView::new(&padded, 100, 10, pitch).is_ok());
        api.resource_write_data(resource, ImageType::Rgba32, pitch, &padded, &frame)
            .expect("write");
    }

    #[test]
    fn test_rgb565_upload() {
        let api = SimDispmanx::new(SimDisplayConfig::default().with_screen(8, 8));
        let display = api.display_open(0).expect("display");
        let update = api.update_start(0).expect("update");
        let resource = api.resource_create(ImageType::Rgb565, 1, 1).expect("resource");
        // Pure green, one padded row
        let mut data = [0u8; 32];
        data[..2].copy_from_slice(&0x07e0u16.to_le_bytes());
        api.resource_write_data(resource, ImageType::Rgb565, 32, &data, &Rect::of_size(1, 1))
            .expect("write");
        api.element_add(update, display, resource, &spec(1, Rect::of_size(1, 1), 1, Alpha::fixed(255)))
            .expect("element");
        api.update_submit_sync(update).expect("submit");

        let frame = api.presentations().pop().expect("presentation");
        assert_eq!(frame.pixel(0, 0), Some([0, 0xff, 0, 0xff]));
    }

    #[test]
    fn test_bad_handles_and_faults() {
        let api = SimDispmanx::new(SimDisplayConfig::default().with_fault(DispmanxCall::UpdateStart, -1));
        assert!(api.display_open(3).expect_err("no device").is_null_result());

        let err = api.update_start(0).expect_err("fault");
        assert!(err.is_null_result());

        let err = api.display_close(DisplayHandle::from_raw(99)).expect_err("unknown");
        assert_eq!(err.code(), Some(0xffff_ffff));
        assert_eq!(api.journal().count(DispmanxCall::DisplayOpen), 1);
    }

    #[test]
    fn test_requires_host() {
        let host = SimHost::new();
        let api = SimDispmanx::default().with_host(host.clone());
        assert!(api.display_open(0).is_err());

        crate::host::Host::init(&host);
        assert!(api.display_open(0).is_ok());
    }
}
