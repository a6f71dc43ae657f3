//! The DispmanX call surface
//!
//! [`Dispmanx`] covers the calls a single overlay needs. The real library is
//! a process-wide service, so every method takes `&self`; implementations
//! are expected to be cheap to clone and safe to use from the thread a
//! capture callback runs on.

use std::fmt;

use crate::error::Result;
use crate::rect::{Alpha, ImageType, Protection, Rect, Transform};

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(u32);

        impl $name {
            /// Wrap a raw non-zero handle
            #[must_use]
            pub const fn from_raw(raw: u32) -> Self {
                Self(raw)
            }

            /// Raw handle value
            #[must_use]
            pub const fn raw(self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{:#x}", self.0)
            }
        }
    };
}

handle!(
    /// `DISPMANX_DISPLAY_HANDLE_T`
    DisplayHandle
);
handle!(
    /// `DISPMANX_UPDATE_HANDLE_T`
    UpdateHandle
);
handle!(
    /// `DISPMANX_RESOURCE_HANDLE_T`
    ResourceHandle
);
handle!(
    /// `DISPMANX_ELEMENT_HANDLE_T`
    ElementHandle
);

/// Everything `vc_dispmanx_element_add` needs besides the handles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementSpec {
    /// Stacking layer, higher is on top
    pub layer: i32,
    /// Destination on screen, in pixels
    pub dest: Rect,
    /// Source inside the resource, in 16.16 fixed point
    pub src: Rect,
    pub protection: Protection,
    pub alpha: Alpha,
    pub transform: Transform,
}

/// DispmanX display, update, resource and element calls
pub trait Dispmanx {
    /// `vc_dispmanx_display_open`
    fn display_open(&self, device: u32) -> Result<DisplayHandle>;

    /// `vc_dispmanx_update_start`
    fn update_start(&self, priority: i32) -> Result<UpdateHandle>;

    /// `vc_dispmanx_resource_create`
    fn resource_create(&self, image_type: ImageType, width: u32, height: u32) -> Result<ResourceHandle>;

    /// `vc_dispmanx_resource_write_data`
    ///
    /// `data` holds the whole source image with rows `pitch` bytes apart;
    /// `rect` selects the region to upload.
    fn resource_write_data(
        &self,
        resource: ResourceHandle,
        image_type: ImageType,
        pitch: u32,
        data: &[u8],
        rect: &Rect,
    ) -> Result<()>;

    /// `vc_dispmanx_element_add`
    fn element_add(
        &self,
        update: UpdateHandle,
        display: DisplayHandle,
        resource: ResourceHandle,
        spec: &ElementSpec,
    ) -> Result<ElementHandle>;

    /// `vc_dispmanx_resource_delete`
    ///
    /// Elements already referencing the resource keep it alive.
    fn resource_delete(&self, resource: ResourceHandle) -> Result<()>;

    /// `vc_dispmanx_update_submit_sync`
    fn update_submit_sync(&self, update: UpdateHandle) -> Result<()>;

    /// `vc_dispmanx_element_remove`
    fn element_remove(&self, update: UpdateHandle, element: ElementHandle) -> Result<()>;

    /// `vc_dispmanx_display_close`
    fn display_close(&self, display: DisplayHandle) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_roundtrip() {
        let handle = ElementHandle::from_raw(0x1234);
        assert_eq!(handle.raw(), 0x1234);
        assert_eq!(handle.to_string(), "0x1234");
    }
}
