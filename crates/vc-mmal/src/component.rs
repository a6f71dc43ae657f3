//! Component, port and pool abstractions
//!
//! These traits are the seam between the capture sequence and a concrete
//! MMAL implementation. [`crate::sim`] provides a software implementation;
//! the `videocore` feature adds one backed by the VideoCore userland
//! libraries.
//!
//! The call order mirrors MMAL:
//!
//! ```text
//! create ─> output(0) ─> format_mut / commit_format ─> set_parameter
//!        ─> create_pool(buffer_num, buffer_size) ─> enable(callback)
//!        ─> send_buffer × queue_length
//!        ...
//!        ─> disable ─> destroy_pool ─> destroy
//!        ─> shutdown
//! ```

use crate::buffer::{BufferCallback, BufferHeader};
use crate::error::Result;
use crate::format::VideoFormat;
use crate::param::PortParameter;

/// Name of the VideoCore synthetic video source component
pub const SOURCE_COMPONENT: &str = "vc.ril.source";

/// Buffer requirements a port reports after format commit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferRequirements {
    /// Minimum number of buffers the port accepts
    pub num_min: u32,
    /// Minimum payload size per buffer
    pub size_min: u32,
    /// Recommended number of buffers
    pub num_recommended: u32,
    /// Recommended payload size per buffer
    pub size_recommended: u32,
}

/// Creates named components
pub trait ComponentFactory {
    /// Component type produced by this factory
    type Component: MediaComponent;

    /// Create a component by name, `mmal_component_create`
    fn create(&self, name: &str) -> Result<Self::Component>;

    /// Release the connection to the media service, `mmal_vc_deinit`
    ///
    /// Called after the last component is destroyed and before platform
    /// teardown. A later `create` connects again.
    fn shutdown(&mut self) -> Result<()>;
}

/// A hardware media component
pub trait MediaComponent {
    /// Output port type
    type Port: OutputPort;

    /// Component name
    fn name(&self) -> &str;

    /// Number of output ports
    fn output_count(&self) -> usize;

    /// Output port `index`
    fn output(&mut self, index: usize) -> Option<&mut Self::Port>;

    /// Destroy the component, `mmal_component_destroy`
    fn destroy(self) -> Result<()>;
}

/// An output port (endpoint) of a component
pub trait OutputPort {
    /// Pool type created by this port
    type Pool: BufferPool;

    /// Port name for logs
    fn name(&self) -> &str;

    /// Current format
    ///
    /// After [`OutputPort::commit_format`] this is the committed format as
    /// read back from the port.
    fn format(&self) -> &VideoFormat;

    /// Mutable access to the format; changes take effect on commit
    fn format_mut(&mut self) -> &mut VideoFormat;

    /// Commit the format, `mmal_port_format_commit`
    fn commit_format(&mut self) -> Result<()>;

    /// Set a parameter, `mmal_port_parameter_set`
    fn set_parameter(&mut self, parameter: PortParameter) -> Result<()>;

    /// Buffer requirements negotiated by the last commit
    fn buffer_requirements(&self) -> BufferRequirements;

    /// Number of buffers the port is configured to use, `port->buffer_num`
    fn buffer_num(&self) -> u32;

    /// Payload size per buffer, `port->buffer_size`
    fn buffer_size(&self) -> u32;

    /// Create a pool of `num` buffers of `size` bytes, `mmal_port_pool_create`
    fn create_pool(&mut self, num: u32, size: u32) -> Result<Self::Pool>;

    /// Enable the port, `mmal_port_enable`
    ///
    /// Once enabled the driver invokes `callback` on its own thread for each
    /// buffer it completes.
    fn enable(&mut self, callback: BufferCallback) -> Result<()>;

    /// Whether the port is enabled
    fn is_enabled(&self) -> bool;

    /// Hand a buffer to the port, `mmal_port_send_buffer`
    fn send_buffer(&mut self, header: <Self::Pool as BufferPool>::Header) -> Result<()>;

    /// Disable the port, `mmal_port_disable`
    ///
    /// Returns only once the driver has stopped invoking the callback.
    fn disable(&mut self) -> Result<()>;

    /// Destroy a pool created by this port, `mmal_port_pool_destroy`
    fn destroy_pool(&mut self, pool: Self::Pool);
}

/// A fixed-capacity set of buffer headers
pub trait BufferPool {
    /// Header type handed out by the pool
    type Header: BufferHeader;

    /// Total number of headers, `pool->headers_num`
    fn headers_num(&self) -> usize;

    /// Headers currently queued, `mmal_queue_length(pool->queue)`
    fn queue_length(&self) -> usize;

    /// Take a header off the queue, `mmal_queue_get(pool->queue)`
    fn get(&self) -> Option<Self::Header>;
}
