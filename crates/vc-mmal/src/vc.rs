//! VideoCore MMAL backend
//!
//! Drives the firmware components through `libmmal_core` and friends. The
//! port callback runs on an MMAL worker thread; the boxed Rust closure is
//! stored in `port->userdata` and reclaimed after `mmal_port_disable`
//! returns, at which point MMAL guarantees no further callbacks.

use std::ffi::{CStr, CString};
use std::panic::{self, AssertUnwindSafe};
use std::ptr::{self, NonNull};
use std::slice;
use std::sync::OnceLock;

use tracing::{debug, error, info, warn};

use crate::buffer::{BufferCallback, BufferFlags, BufferHeader, FilledBuffer};
use crate::component::{BufferPool, BufferRequirements, ComponentFactory, MediaComponent, OutputPort};
use crate::error::{MmalError, MmalStatus, Result};
use crate::ffi;
use crate::format::{Encoding, Rect, VideoFormat};
use crate::param::PortParameter;

fn check(call: &'static str, status: ffi::MMAL_STATUS_T) -> Result<()> {
    MmalStatus::from_raw(status).check(call)
}

/// Factory for firmware components
///
/// Takes a reference on the VC client service on first use, after platform
/// bring-up, and drops it on [`ComponentFactory::shutdown`] or when the
/// factory goes away.
#[derive(Debug, Default)]
pub struct VcFactory {
    vc: OnceLock<MmalStatus>,
}

impl VcFactory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn connect(&self) -> Result<()> {
        self.vc
            // SAFETY: mmal_vc_init is reference counted and has no preconditions
            // beyond bcm_host_init, which precedes any component creation.
            .get_or_init(|| MmalStatus::from_raw(unsafe { ffi::mmal_vc_init() }))
            .check("mmal_vc_init")
    }

    fn disconnect(&mut self) {
        if self.vc.take() == Some(MmalStatus::Success) {
            // SAFETY: balances the successful mmal_vc_init in connect().
            unsafe { ffi::mmal_vc_deinit() };
            debug!("Released VC client service");
        }
    }
}

impl Drop for VcFactory {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl ComponentFactory for VcFactory {
    type Component = VcComponent;

    fn create(&self, name: &str) -> Result<VcComponent> {
        self.connect()?;

        let c_name = CString::new(name)
            .map_err(|_| MmalError::invalid_parameter(format!("component name {name:?} contains NUL")))?;
        let mut raw = ptr::null_mut();

        // SAFETY: c_name is a valid C string and raw a valid out pointer.
        check("mmal_component_create", unsafe {
            ffi::mmal_component_create(c_name.as_ptr(), &mut raw)
        })?;
        let raw = NonNull::new(raw)
            .ok_or_else(|| MmalError::status("mmal_component_create", MmalStatus::Fault))?;

        // SAFETY: a successfully created component exposes output_num valid ports.
        let outputs = unsafe {
            let component = raw.as_ref();
            (0..component.output_num as usize)
                .filter_map(|i| NonNull::new(*component.output.add(i)))
                .map(VcPort::new)
                .collect()
        };

        info!("Created component {}", name);
        Ok(VcComponent {
            raw: Some(raw),
            name: name.to_string(),
            outputs,
        })
    }

    fn shutdown(&mut self) -> Result<()> {
        self.disconnect();
        Ok(())
    }
}

/// A firmware component
pub struct VcComponent {
    raw: Option<NonNull<ffi::MMAL_COMPONENT_T>>,
    name: String,
    outputs: Vec<VcPort>,
}

impl MediaComponent for VcComponent {
    type Port = VcPort;

    fn name(&self) -> &str {
        &self.name
    }

    fn output_count(&self) -> usize {
        self.outputs.len()
    }

    fn output(&mut self, index: usize) -> Option<&mut VcPort> {
        self.outputs.get_mut(index)
    }

    fn destroy(mut self) -> Result<()> {
        let Some(raw) = self.raw.take() else {
            return Ok(());
        };
        for port in &mut self.outputs {
            if port.is_enabled() {
                warn!("Destroying {} with port {} still enabled", self.name, port.name);
                port.disable()?;
            }
        }
        // SAFETY: raw came from mmal_component_create and is destroyed once.
        check("mmal_component_destroy", unsafe {
            ffi::mmal_component_destroy(raw.as_ptr())
        })?;
        info!("Destroyed component {}", self.name);
        Ok(())
    }
}

impl Drop for VcComponent {
    fn drop(&mut self) {
        if let Some(raw) = self.raw.take() {
            for port in &mut self.outputs {
                if port.is_enabled() {
                    let _ = port.disable();
                }
            }
            // SAFETY: raw came from mmal_component_create and was not destroyed yet.
            let status = unsafe { ffi::mmal_component_destroy(raw.as_ptr()) };
            if status != ffi::MMAL_SUCCESS {
                error!("mmal_component_destroy failed in drop: {:#010x}", status);
            }
        }
    }
}

struct CallbackSlot {
    callback: BufferCallback,
}

/// An output port of a firmware component
pub struct VcPort {
    raw: NonNull<ffi::MMAL_PORT_T>,
    name: String,
    format: VideoFormat,
    /// Boxed callback shared with the MMAL worker thread while enabled
    slot: *mut CallbackSlot,
}

impl VcPort {
    fn new(raw: NonNull<ffi::MMAL_PORT_T>) -> Self {
        // SAFETY: port pointers from a live component are valid and carry a
        // NUL-terminated name.
        let name = unsafe {
            let port = raw.as_ref();
            if port.name.is_null() {
                String::from("port")
            } else {
                CStr::from_ptr(port.name).to_string_lossy().into_owned()
            }
        };
        let mut port = Self {
            raw,
            name,
            format: VideoFormat::default(),
            slot: ptr::null_mut(),
        };
        port.read_format();
        port
    }

    fn port(&self) -> &ffi::MMAL_PORT_T {
        // SAFETY: the port outlives this wrapper, which lives inside its component.
        unsafe { self.raw.as_ref() }
    }

    fn read_format(&mut self) {
        // SAFETY: format and format->es are allocated by MMAL for every port.
        let format = unsafe {
            let es_format = &*self.raw.as_ref().format;
            let video = (*es_format.es).video;
            VideoFormat {
                encoding: Encoding::from_raw(es_format.encoding),
                width: video.width,
                height: video.height,
                crop: Rect::new(video.crop.x, video.crop.y, video.crop.width, video.crop.height),
            }
        };
        self.format = format;
    }

    fn write_format(&mut self) {
        let format = self.format;
        // SAFETY: format and format->es are allocated by MMAL for every port and
        // the port is not enabled, so nothing else is reading them.
        unsafe {
            let es_format = &mut *self.raw.as_mut().format;
            es_format.encoding = format.encoding.raw();
            let video = &mut (*es_format.es).video;
            video.width = format.width;
            video.height = format.height;
            video.crop = ffi::MMAL_RECT_T {
                x: format.crop.x,
                y: format.crop.y,
                width: format.crop.width,
                height: format.crop.height,
            };
        }
    }
}

unsafe extern "C" fn port_callback(port: *mut ffi::MMAL_PORT_T, buffer: *mut ffi::MMAL_BUFFER_HEADER_T) {
    if port.is_null() || buffer.is_null() {
        return;
    }

    // SAFETY: userdata was set to a live CallbackSlot in enable() and is only
    // reclaimed after mmal_port_disable, after which MMAL stops calling us.
    // The header is valid for the duration of this call.
    unsafe {
        let slot = (*port).userdata.cast::<CallbackSlot>();
        if !slot.is_null() {
            let header = &*buffer;
            let data = if header.data.is_null() {
                &[][..]
            } else {
                slice::from_raw_parts(header.data.add(header.offset as usize), header.length as usize)
            };
            let filled = FilledBuffer {
                index: header.user_data as usize,
                data,
                flags: BufferFlags::from_bits_retain(header.flags),
                pts: (header.pts != ffi::MMAL_TIME_UNKNOWN).then_some(header.pts),
                alloc_size: header.alloc_size,
            };

            let callback = &mut (*slot).callback;
            if panic::catch_unwind(AssertUnwindSafe(|| callback(filled))).is_err() {
                error!("Port callback panicked");
            }
        }

        ffi::mmal_buffer_header_release(buffer);
    }
}

impl OutputPort for VcPort {
    type Pool = VcPool;

    fn name(&self) -> &str {
        &self.name
    }

    fn format(&self) -> &VideoFormat {
        &self.format
    }

    fn format_mut(&mut self) -> &mut VideoFormat {
        &mut self.format
    }

    fn commit_format(&mut self) -> Result<()> {
        self.write_format();
        // SAFETY: raw is a valid port.
        check("mmal_port_format_commit", unsafe {
            ffi::mmal_port_format_commit(self.raw.as_ptr())
        })?;
        self.read_format();
        debug!("{}: committed {:?}", self.name, self.format);
        Ok(())
    }

    fn set_parameter(&mut self, parameter: PortParameter) -> Result<()> {
        let status = match parameter {
            PortParameter::SourcePattern(pattern) => {
                let param = ffi::MMAL_PARAMETER_VIDEO_SOURCE_PATTERN_T {
                    hdr: ffi::MMAL_PARAMETER_HEADER_T {
                        id: parameter.id(),
                        size: std::mem::size_of::<ffi::MMAL_PARAMETER_VIDEO_SOURCE_PATTERN_T>() as u32,
                    },
                    pattern: pattern.raw(),
                    param: 0,
                    framecount: 0,
                    framerate: ffi::MMAL_RATIONAL_T::default(),
                };
                // SAFETY: param starts with its header and size covers the whole struct.
                unsafe { ffi::mmal_port_parameter_set(self.raw.as_ptr(), &param.hdr) }
            }
            PortParameter::ZeroCopy(enable) => {
                // SAFETY: raw is a valid port.
                unsafe {
                    ffi::mmal_port_parameter_set_boolean(self.raw.as_ptr(), parameter.id(), ffi::mmal_bool(enable))
                }
            }
        };
        let call = match parameter {
            PortParameter::SourcePattern(_) => "mmal_port_parameter_set",
            PortParameter::ZeroCopy(_) => "mmal_port_parameter_set_boolean",
        };
        check(call, status)
    }

    fn buffer_requirements(&self) -> BufferRequirements {
        let port = self.port();
        BufferRequirements {
            num_min: port.buffer_num_min,
            size_min: port.buffer_size_min,
            num_recommended: port.buffer_num_recommended,
            size_recommended: port.buffer_size_recommended,
        }
    }

    fn buffer_num(&self) -> u32 {
        self.port().buffer_num
    }

    fn buffer_size(&self) -> u32 {
        self.port().buffer_size
    }

    fn create_pool(&mut self, num: u32, size: u32) -> Result<VcPool> {
        // SAFETY: raw is a valid port.
        let raw = unsafe { ffi::mmal_port_pool_create(self.raw.as_ptr(), num, size) };
        let raw = NonNull::new(raw).ok_or(MmalError::PoolCreation { num, size })?;

        // Tag each header with its index so callbacks can report it
        // SAFETY: a pool exposes headers_num valid header pointers.
        unsafe {
            let pool = raw.as_ref();
            for i in 0..pool.headers_num as usize {
                let header = *pool.header.add(i);
                if !header.is_null() {
                    (*header).user_data = i as *mut libc::c_void;
                }
            }
        }

        Ok(VcPool { raw })
    }

    fn enable(&mut self, callback: BufferCallback) -> Result<()> {
        let slot = Box::into_raw(Box::new(CallbackSlot { callback }));
        // SAFETY: the slot stays alive until disable() reclaims it.
        let status = unsafe {
            self.raw.as_mut().userdata = slot.cast();
            ffi::mmal_port_enable(self.raw.as_ptr(), Some(port_callback))
        };

        if let Err(e) = check("mmal_port_enable", status) {
            // SAFETY: enable failed, so MMAL never saw the slot.
            unsafe {
                self.raw.as_mut().userdata = ptr::null_mut();
                drop(Box::from_raw(slot));
            }
            return Err(e);
        }

        self.slot = slot;
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        self.port().is_enabled != 0
    }

    fn send_buffer(&mut self, header: VcBuffer) -> Result<()> {
        // SAFETY: header came from a pool created on this port.
        check("mmal_port_send_buffer", unsafe {
            ffi::mmal_port_send_buffer(self.raw.as_ptr(), header.raw.as_ptr())
        })
    }

    fn disable(&mut self) -> Result<()> {
        // SAFETY: raw is a valid port.
        check("mmal_port_disable", unsafe { ffi::mmal_port_disable(self.raw.as_ptr()) })?;
        if !self.slot.is_null() {
            // SAFETY: the port is disabled, so the callback can no longer run
            // and the slot from enable() has no other user.
            unsafe {
                self.raw.as_mut().userdata = ptr::null_mut();
                drop(Box::from_raw(self.slot));
            }
            self.slot = ptr::null_mut();
        }
        Ok(())
    }

    fn destroy_pool(&mut self, pool: VcPool) {
        // SAFETY: pool was created on this port and is destroyed once.
        unsafe { ffi::mmal_port_pool_destroy(self.raw.as_ptr(), pool.raw.as_ptr()) };
    }
}

/// A pool created with `mmal_port_pool_create`
pub struct VcPool {
    raw: NonNull<ffi::MMAL_POOL_T>,
}

impl BufferPool for VcPool {
    type Header = VcBuffer;

    fn headers_num(&self) -> usize {
        // SAFETY: raw is a live pool.
        unsafe { self.raw.as_ref().headers_num as usize }
    }

    fn queue_length(&self) -> usize {
        // SAFETY: raw is a live pool with a valid queue.
        unsafe { ffi::mmal_queue_length(self.raw.as_ref().queue) as usize }
    }

    fn get(&self) -> Option<VcBuffer> {
        // SAFETY: raw is a live pool with a valid queue.
        let header = unsafe { ffi::mmal_queue_get(self.raw.as_ref().queue) };
        NonNull::new(header).map(|raw| VcBuffer { raw })
    }
}

/// A buffer header taken from a [`VcPool`]
pub struct VcBuffer {
    raw: NonNull<ffi::MMAL_BUFFER_HEADER_T>,
}

// SAFETY: MMAL buffer headers are handed between threads by design; the
// wrapper is only a unique reference to a header taken off a pool queue.
unsafe impl Send for VcBuffer {}

impl VcBuffer {
    fn header(&self) -> &ffi::MMAL_BUFFER_HEADER_T {
        // SAFETY: the header stays valid while its pool lives.
        unsafe { self.raw.as_ref() }
    }
}

impl BufferHeader for VcBuffer {
    fn index(&self) -> usize {
        self.header().user_data as usize
    }

    fn alloc_size(&self) -> u32 {
        self.header().alloc_size
    }

    fn length(&self) -> u32 {
        self.header().length
    }

    fn flags(&self) -> BufferFlags {
        BufferFlags::from_bits_retain(self.header().flags)
    }
}
