//! VideoCore backend over `libbcm_host`

use std::ptr;

use tracing::trace;

use crate::api::{DisplayHandle, Dispmanx, ElementHandle, ElementSpec, ResourceHandle, UpdateHandle};
use crate::error::{DispmanxError, Result};
use crate::ffi;
use crate::host::Host;
use crate::rect::{ImageType, Rect};

impl From<Rect> for ffi::VC_RECT_T {
    fn from(rect: Rect) -> Self {
        Self {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
        }
    }
}

/// `bcm_host_init` / `bcm_host_deinit`
#[derive(Debug, Clone, Copy, Default)]
pub struct BcmHost;

impl Host for BcmHost {
    fn init(&self) {
        // SAFETY: no preconditions; HostSession pairs it with deinit
        unsafe { ffi::bcm_host_init() }
    }

    fn deinit(&self) {
        // SAFETY: only reached after init through HostSession
        unsafe { ffi::bcm_host_deinit() }
    }
}

/// DispmanX through the firmware service
///
/// The service is process-wide and thread-safe, so this is a unit type.
#[derive(Debug, Clone, Copy, Default)]
pub struct VcDispmanx;

impl Dispmanx for VcDispmanx {
    fn display_open(&self, device: u32) -> Result<DisplayHandle> {
        // SAFETY: plain value arguments
        let handle = unsafe { ffi::vc_dispmanx_display_open(device) };
        DispmanxError::check_handle("vc_dispmanx_display_open", handle).map(DisplayHandle::from_raw)
    }

    fn update_start(&self, priority: i32) -> Result<UpdateHandle> {
        // SAFETY: plain value arguments
        let handle = unsafe { ffi::vc_dispmanx_update_start(priority) };
        DispmanxError::check_handle("vc_dispmanx_update_start", handle).map(UpdateHandle::from_raw)
    }

    fn resource_create(&self, image_type: ImageType, width: u32, height: u32) -> Result<ResourceHandle> {
        let mut native = 0u32;
        // SAFETY: `native` is a valid out pointer for the duration of the call
        let handle = unsafe { ffi::vc_dispmanx_resource_create(image_type.raw(), width, height, &mut native) };
        trace!("Resource {:#x} backed by VC image {:#x}", handle, native);
        DispmanxError::check_handle("vc_dispmanx_resource_create", handle).map(ResourceHandle::from_raw)
    }

    fn resource_write_data(
        &self,
        resource: ResourceHandle,
        image_type: ImageType,
        pitch: u32,
        data: &[u8],
        rect: &Rect,
    ) -> Result<()> {
        let call = "vc_dispmanx_resource_write_data";
        if (data.len() as u64) < rect.upload_len(pitch) {
            return Err(DispmanxError::Call { call, code: -1 });
        }

        let rect = ffi::VC_RECT_T::from(*rect);
        // SAFETY: `data` covers every row the rectangle selects; the library
        // only reads through the pointer despite the mutable C signature
        let ret = unsafe {
            ffi::vc_dispmanx_resource_write_data(
                resource.raw(),
                image_type.raw(),
                pitch as i32,
                data.as_ptr().cast_mut().cast(),
                &rect,
            )
        };
        DispmanxError::check(call, ret)
    }

    fn element_add(
        &self,
        update: UpdateHandle,
        display: DisplayHandle,
        resource: ResourceHandle,
        spec: &ElementSpec,
    ) -> Result<ElementHandle> {
        let dest = ffi::VC_RECT_T::from(spec.dest);
        let src = ffi::VC_RECT_T::from(spec.src);
        let mut alpha = ffi::VC_DISPMANX_ALPHA_T {
            flags: spec.alpha.mode.raw(),
            opacity: u32::from(spec.alpha.opacity),
            mask: ffi::DISPMANX_NO_HANDLE,
        };

        // SAFETY: rectangles and alpha live on this stack frame for the call;
        // a NULL clamp selects the default
        let handle = unsafe {
            ffi::vc_dispmanx_element_add(
                update.raw(),
                display.raw(),
                spec.layer,
                &dest,
                resource.raw(),
                &src,
                spec.protection.raw(),
                &mut alpha,
                ptr::null_mut(),
                spec.transform.raw(),
            )
        };
        DispmanxError::check_handle("vc_dispmanx_element_add", handle).map(ElementHandle::from_raw)
    }

    fn resource_delete(&self, resource: ResourceHandle) -> Result<()> {
        // SAFETY: plain value arguments
        let ret = unsafe { ffi::vc_dispmanx_resource_delete(resource.raw()) };
        DispmanxError::check("vc_dispmanx_resource_delete", ret)
    }

    fn update_submit_sync(&self, update: UpdateHandle) -> Result<()> {
        // SAFETY: plain value arguments
        let ret = unsafe { ffi::vc_dispmanx_update_submit_sync(update.raw()) };
        DispmanxError::check("vc_dispmanx_update_submit_sync", ret)
    }

    fn element_remove(&self, update: UpdateHandle, element: ElementHandle) -> Result<()> {
        // SAFETY: plain value arguments
        let ret = unsafe { ffi::vc_dispmanx_element_remove(update.raw(), element.raw()) };
        DispmanxError::check("vc_dispmanx_element_remove", ret)
    }

    fn display_close(&self, display: DisplayHandle) -> Result<()> {
        // SAFETY: plain value arguments
        let ret = unsafe { ffi::vc_dispmanx_display_close(display.raw()) };
        DispmanxError::check("vc_dispmanx_display_close", ret)
    }
}
