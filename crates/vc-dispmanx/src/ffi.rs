//! Raw `bcm_host.h` bindings
//!
//! Only the DispmanX calls a single overlay needs, plus platform bring-up.

#![allow(non_camel_case_types, dead_code)]

use libc::{c_int, c_void};

pub type DISPMANX_DISPLAY_HANDLE_T = u32;
pub type DISPMANX_UPDATE_HANDLE_T = u32;
pub type DISPMANX_RESOURCE_HANDLE_T = u32;
pub type DISPMANX_ELEMENT_HANDLE_T = u32;
pub type DISPMANX_PROTECTION_T = u32;
pub type DISPMANX_TRANSFORM_T = u32;
pub type DISPMANX_FLAGS_ALPHA_T = u32;
pub type VC_IMAGE_TYPE_T = u32;

pub const DISPMANX_NO_HANDLE: u32 = 0;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct VC_RECT_T {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct VC_DISPMANX_ALPHA_T {
    pub flags: DISPMANX_FLAGS_ALPHA_T,
    pub opacity: u32,
    pub mask: DISPMANX_RESOURCE_HANDLE_T,
}

/// Opaque; always passed as NULL
#[repr(C)]
pub struct DISPMANX_CLAMP_T {
    _private: [u8; 0],
}

#[link(name = "bcm_host")]
extern "C" {
    pub fn bcm_host_init();
    pub fn bcm_host_deinit();

    pub fn vc_dispmanx_display_open(device: u32) -> DISPMANX_DISPLAY_HANDLE_T;
    pub fn vc_dispmanx_display_close(display: DISPMANX_DISPLAY_HANDLE_T) -> c_int;

    pub fn vc_dispmanx_update_start(priority: i32) -> DISPMANX_UPDATE_HANDLE_T;
    pub fn vc_dispmanx_update_submit_sync(update: DISPMANX_UPDATE_HANDLE_T) -> c_int;

    pub fn vc_dispmanx_resource_create(
        type_: VC_IMAGE_TYPE_T,
        width: u32,
        height: u32,
        native_image_handle: *mut u32,
    ) -> DISPMANX_RESOURCE_HANDLE_T;
    pub fn vc_dispmanx_resource_write_data(
        res: DISPMANX_RESOURCE_HANDLE_T,
        src_type: VC_IMAGE_TYPE_T,
        src_pitch: c_int,
        src_address: *mut c_void,
        rect: *const VC_RECT_T,
    ) -> c_int;
    pub fn vc_dispmanx_resource_delete(res: DISPMANX_RESOURCE_HANDLE_T) -> c_int;

    pub fn vc_dispmanx_element_add(
        update: DISPMANX_UPDATE_HANDLE_T,
        display: DISPMANX_DISPLAY_HANDLE_T,
        layer: i32,
        dest_rect: *const VC_RECT_T,
        src: DISPMANX_RESOURCE_HANDLE_T,
        src_rect: *const VC_RECT_T,
        protection: DISPMANX_PROTECTION_T,
        alpha: *mut VC_DISPMANX_ALPHA_T,
        clamp: *mut DISPMANX_CLAMP_T,
        transform: DISPMANX_TRANSFORM_T,
    ) -> DISPMANX_ELEMENT_HANDLE_T;
    pub fn vc_dispmanx_element_remove(
        update: DISPMANX_UPDATE_HANDLE_T,
        element: DISPMANX_ELEMENT_HANDLE_T,
    ) -> c_int;
}
