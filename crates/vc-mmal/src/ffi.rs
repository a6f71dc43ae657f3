//! Raw MMAL bindings
//!
//! Hand-written declarations for the subset of `interface/mmal` used by the
//! [`crate::vc`] backend. Layouts follow the VideoCore userland headers.

#![allow(non_camel_case_types, non_snake_case, dead_code)]

use libc::{c_char, c_int, c_uint, c_void};

pub type MMAL_STATUS_T = u32;
pub type MMAL_BOOL_T = i32;
pub type MMAL_FOURCC_T = u32;
pub type MMAL_ES_TYPE_T = u32;
pub type MMAL_PORT_TYPE_T = u32;

pub const MMAL_SUCCESS: MMAL_STATUS_T = 0;
pub const MMAL_TIME_UNKNOWN: i64 = i64::MIN;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct MMAL_RECT_T {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct MMAL_RATIONAL_T {
    pub num: i32,
    pub den: i32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct MMAL_VIDEO_FORMAT_T {
    pub width: u32,
    pub height: u32,
    pub crop: MMAL_RECT_T,
    pub frame_rate: MMAL_RATIONAL_T,
    pub par: MMAL_RATIONAL_T,
    pub color_space: MMAL_FOURCC_T,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct MMAL_AUDIO_FORMAT_T {
    pub channels: u32,
    pub sample_rate: u32,
    pub bits_per_sample: u32,
    pub block_align: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct MMAL_SUBPICTURE_FORMAT_T {
    pub x_offset: u32,
    pub y_offset: u32,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub union MMAL_ES_SPECIFIC_FORMAT_T {
    pub audio: MMAL_AUDIO_FORMAT_T,
    pub video: MMAL_VIDEO_FORMAT_T,
    pub subpicture: MMAL_SUBPICTURE_FORMAT_T,
}

#[repr(C)]
pub struct MMAL_ES_FORMAT_T {
    pub type_: MMAL_ES_TYPE_T,
    pub encoding: MMAL_FOURCC_T,
    pub encoding_variant: MMAL_FOURCC_T,
    pub es: *mut MMAL_ES_SPECIFIC_FORMAT_T,
    pub bitrate: u32,
    pub flags: u32,
    pub extradata_size: u32,
    pub extradata: *mut u8,
}

/// Opaque; the application decides what it points to
#[repr(C)]
pub struct MMAL_PORT_USERDATA_T {
    _private: [u8; 0],
}

#[repr(C)]
pub struct MMAL_PORT_PRIVATE_T {
    _private: [u8; 0],
}

#[repr(C)]
pub struct MMAL_COMPONENT_PRIVATE_T {
    _private: [u8; 0],
}

#[repr(C)]
pub struct MMAL_COMPONENT_USERDATA_T {
    _private: [u8; 0],
}

#[repr(C)]
pub struct MMAL_QUEUE_T {
    _private: [u8; 0],
}

#[repr(C)]
pub struct MMAL_BUFFER_HEADER_PRIVATE_T {
    _private: [u8; 0],
}

#[repr(C)]
pub struct MMAL_BUFFER_HEADER_TYPE_SPECIFIC_T {
    _private: [u8; 0],
}

#[repr(C)]
pub struct MMAL_PORT_T {
    pub priv_: *mut MMAL_PORT_PRIVATE_T,
    pub name: *const c_char,
    pub type_: MMAL_PORT_TYPE_T,
    pub index: u16,
    pub index_all: u16,
    pub is_enabled: u32,
    pub format: *mut MMAL_ES_FORMAT_T,
    pub buffer_num_min: u32,
    pub buffer_size_min: u32,
    pub buffer_alignment_min: u32,
    pub buffer_num_recommended: u32,
    pub buffer_size_recommended: u32,
    pub buffer_num: u32,
    pub buffer_size: u32,
    pub component: *mut MMAL_COMPONENT_T,
    pub userdata: *mut MMAL_PORT_USERDATA_T,
    pub capabilities: u32,
}

#[repr(C)]
pub struct MMAL_COMPONENT_T {
    pub priv_: *mut MMAL_COMPONENT_PRIVATE_T,
    pub userdata: *mut MMAL_COMPONENT_USERDATA_T,
    pub name: *const c_char,
    pub is_enabled: u32,
    pub control: *mut MMAL_PORT_T,
    pub input_num: u32,
    pub input: *mut *mut MMAL_PORT_T,
    pub output_num: u32,
    pub output: *mut *mut MMAL_PORT_T,
    pub clock_num: u32,
    pub clock: *mut *mut MMAL_PORT_T,
    pub port_num: u32,
    pub port: *mut *mut MMAL_PORT_T,
    pub id: u32,
}

#[repr(C)]
pub struct MMAL_BUFFER_HEADER_T {
    pub next: *mut MMAL_BUFFER_HEADER_T,
    pub priv_: *mut MMAL_BUFFER_HEADER_PRIVATE_T,
    pub cmd: u32,
    pub data: *mut u8,
    pub alloc_size: u32,
    pub length: u32,
    pub offset: u32,
    pub flags: u32,
    pub pts: i64,
    pub dts: i64,
    pub type_: *mut MMAL_BUFFER_HEADER_TYPE_SPECIFIC_T,
    pub user_data: *mut c_void,
}

#[repr(C)]
pub struct MMAL_POOL_T {
    pub queue: *mut MMAL_QUEUE_T,
    pub headers_num: u32,
    pub header: *mut *mut MMAL_BUFFER_HEADER_T,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct MMAL_PARAMETER_HEADER_T {
    pub id: u32,
    pub size: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct MMAL_PARAMETER_VIDEO_SOURCE_PATTERN_T {
    pub hdr: MMAL_PARAMETER_HEADER_T,
    pub pattern: u32,
    pub param: u32,
    pub framecount: u32,
    pub framerate: MMAL_RATIONAL_T,
}

pub type MMAL_PORT_BH_CB_T =
    Option<unsafe extern "C" fn(port: *mut MMAL_PORT_T, buffer: *mut MMAL_BUFFER_HEADER_T)>;

#[link(name = "mmal_core")]
extern "C" {
    pub fn mmal_component_create(name: *const c_char, component: *mut *mut MMAL_COMPONENT_T) -> MMAL_STATUS_T;
    pub fn mmal_component_destroy(component: *mut MMAL_COMPONENT_T) -> MMAL_STATUS_T;
    pub fn mmal_port_format_commit(port: *mut MMAL_PORT_T) -> MMAL_STATUS_T;
    pub fn mmal_port_parameter_set(port: *mut MMAL_PORT_T, param: *const MMAL_PARAMETER_HEADER_T) -> MMAL_STATUS_T;
    pub fn mmal_port_enable(port: *mut MMAL_PORT_T, cb: MMAL_PORT_BH_CB_T) -> MMAL_STATUS_T;
    pub fn mmal_port_disable(port: *mut MMAL_PORT_T) -> MMAL_STATUS_T;
    pub fn mmal_port_send_buffer(port: *mut MMAL_PORT_T, buffer: *mut MMAL_BUFFER_HEADER_T) -> MMAL_STATUS_T;
    pub fn mmal_queue_length(queue: *mut MMAL_QUEUE_T) -> c_uint;
    pub fn mmal_queue_get(queue: *mut MMAL_QUEUE_T) -> *mut MMAL_BUFFER_HEADER_T;
    pub fn mmal_buffer_header_release(header: *mut MMAL_BUFFER_HEADER_T);
}

#[link(name = "mmal_util")]
extern "C" {
    pub fn mmal_port_parameter_set_boolean(port: *mut MMAL_PORT_T, id: u32, value: MMAL_BOOL_T) -> MMAL_STATUS_T;
    pub fn mmal_port_pool_create(port: *mut MMAL_PORT_T, headers: c_uint, payload_size: u32) -> *mut MMAL_POOL_T;
    pub fn mmal_port_pool_destroy(port: *mut MMAL_PORT_T, pool: *mut MMAL_POOL_T);
}

// Referencing the VC client keeps the library (and the firmware components
// it registers) linked in
#[link(name = "mmal_vc_client")]
extern "C" {
    pub fn mmal_vc_init() -> MMAL_STATUS_T;
    pub fn mmal_vc_deinit();
}

/// `MMAL_BOOL_T` from a Rust bool
pub fn mmal_bool(value: bool) -> MMAL_BOOL_T {
    c_int::from(value)
}
