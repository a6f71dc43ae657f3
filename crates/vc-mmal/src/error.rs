//! Error types for MMAL operations
//!
//! Every MMAL call reports an `MMAL_STATUS_T`. [`MmalStatus`] mirrors that
//! enum and [`MmalError`] pairs a failing status with the call that produced
//! it, so callers can print the same diagnostic the C API would give.

use thiserror::Error;

/// MMAL status codes
///
/// Discriminants match `MMAL_STATUS_T` from `interface/mmal/mmal_types.h`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum MmalStatus {
    /// Success
    Success = 0,
    /// Out of memory
    NoMemory = 1,
    /// Out of resources (other than memory)
    NoSpace = 2,
    /// Argument is invalid
    Invalid = 3,
    /// Function not implemented
    NotImplemented = 4,
    /// No such file or directory
    NotFound = 5,
    /// No such device or address
    NoDevice = 6,
    /// I/O error
    Io = 7,
    /// Illegal seek
    IllegalSeek = 8,
    /// Data is corrupt
    Corrupt = 9,
    /// Component is not ready
    NotReady = 10,
    /// Component is not configured
    NotConfigured = 11,
    /// Port is already connected
    IsConnected = 12,
    /// Port is disconnected
    NotConnected = 13,
    /// Resource temporarily unavailable, try again later
    Again = 14,
    /// Bad address
    Fault = 15,
}

impl MmalStatus {
    /// Decode a raw `MMAL_STATUS_T` value
    ///
    /// Unknown values decode as [`MmalStatus::Fault`] so a misbehaving
    /// driver can never be mistaken for success.
    #[must_use]
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 => Self::Success,
            1 => Self::NoMemory,
            2 => Self::NoSpace,
            3 => Self::Invalid,
            4 => Self::NotImplemented,
            5 => Self::NotFound,
            6 => Self::NoDevice,
            7 => Self::Io,
            8 => Self::IllegalSeek,
            9 => Self::Corrupt,
            10 => Self::NotReady,
            11 => Self::NotConfigured,
            12 => Self::IsConnected,
            13 => Self::NotConnected,
            14 => Self::Again,
            _ => Self::Fault,
        }
    }

    /// Raw numeric value
    #[must_use]
    pub fn code(self) -> u32 {
        self as u32
    }

    /// Symbolic MMAL name (`MMAL_EINVAL` etc.)
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Success => "MMAL_SUCCESS",
            Self::NoMemory => "MMAL_ENOMEM",
            Self::NoSpace => "MMAL_ENOSPC",
            Self::Invalid => "MMAL_EINVAL",
            Self::NotImplemented => "MMAL_ENOSYS",
            Self::NotFound => "MMAL_ENOENT",
            Self::NoDevice => "MMAL_ENXIO",
            Self::Io => "MMAL_EIO",
            Self::IllegalSeek => "MMAL_ESPIPE",
            Self::Corrupt => "MMAL_ECORRUPT",
            Self::NotReady => "MMAL_ENOTREADY",
            Self::NotConfigured => "MMAL_ECONFIG",
            Self::IsConnected => "MMAL_EISCONN",
            Self::NotConnected => "MMAL_ENOTCONN",
            Self::Again => "MMAL_EAGAIN",
            Self::Fault => "MMAL_EFAULT",
        }
    }

    /// Turn a status returned by `call` into a `Result`
    pub fn check(self, call: &'static str) -> Result<()> {
        if self == Self::Success {
            Ok(())
        } else {
            Err(MmalError::Status { call, status: self })
        }
    }
}

/// Errors that can occur during MMAL operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MmalError {
    /// An MMAL call returned a non-success status
    #[error("{call} failed: {:#010x} ({})", .status.code(), .status.name())]
    Status {
        /// Name of the failing MMAL function
        call: &'static str,
        /// Status it returned
        status: MmalStatus,
    },

    /// `mmal_port_pool_create` returned NULL
    #[error("mmal_port_pool_create returned no pool ({num} x {size} bytes)")]
    PoolCreation {
        /// Requested number of buffer headers
        num: u32,
        /// Requested payload size per buffer
        size: u32,
    },

    /// The pool queue ran dry while buffers were still expected
    #[error("buffer pool queue is empty")]
    QueueEmpty,

    /// Requested output port does not exist on the component
    #[error("component {component} has no output port {index}")]
    NoSuchPort {
        /// Component name
        component: String,
        /// Requested output index
        index: usize,
    },

    /// Invalid parameter passed to an operation
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl MmalError {
    /// Numeric status behind this error, as printed in diagnostics
    ///
    /// Errors that do not come from an MMAL status report `None`.
    #[must_use]
    pub fn status_code(&self) -> Option<u32> {
        match self {
            Self::Status { status, .. } => Some(status.code()),
            _ => None,
        }
    }

    /// Whether this error stands for a NULL handle or empty queue rather than a status
    #[must_use]
    pub fn is_null_result(&self) -> bool {
        matches!(self, Self::PoolCreation { .. } | Self::QueueEmpty)
    }

    pub(crate) fn status(call: &'static str, status: MmalStatus) -> Self {
        Self::Status { call, status }
    }

    pub(crate) fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }
}

/// Result type for MMAL operations
pub type Result<T> = std::result::Result<T, MmalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        for raw in 0..=15 {
            assert_eq!(MmalStatus::from_raw(raw).code(), raw);
        }
        assert_eq!(MmalStatus::from_raw(0x7fff_ffff), MmalStatus::Fault);
    }

    #[test]
    fn test_check() {
        assert!(MmalStatus::Success.check("mmal_port_enable").is_ok());

        let err = MmalStatus::Invalid
            .check("mmal_port_format_commit")
            .expect_err("EINVAL must fail");
        assert_eq!(err.status_code(), Some(3));
        assert_eq!(err.to_string(), "mmal_port_format_commit failed: 0x00000003 (MMAL_EINVAL)");
    }

    #[test]
    fn test_null_results() {
        assert!(MmalError::QueueEmpty.is_null_result());
        assert!(MmalError::PoolCreation { num: 3, size: 65536 }.is_null_result());
        assert!(!MmalError::status("mmal_port_disable", MmalStatus::NotConnected).is_null_result());
        assert_eq!(MmalError::QueueEmpty.status_code(), None);
    }
}
