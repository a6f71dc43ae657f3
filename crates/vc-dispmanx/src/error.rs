//! Error types for DispmanX operations
//!
//! DispmanX reports failure two ways: calls that create something return a
//! zero handle (`DISPMANX_NO_HANDLE`), everything else returns a non-zero
//! integer.

use thiserror::Error;

/// Errors that can occur during DispmanX operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispmanxError {
    /// A DispmanX call returned non-zero
    #[error("{call} failed: {code:#010x}")]
    Call {
        /// Name of the failing DispmanX function
        call: &'static str,
        /// Value it returned
        code: i32,
    },

    /// A DispmanX call returned `DISPMANX_NO_HANDLE`
    #[error("{call} returned no handle")]
    NullHandle {
        /// Name of the failing DispmanX function
        call: &'static str,
    },

    /// Pixel data does not describe the image it claims to
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    /// Invalid surface configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl DispmanxError {
    /// Turn the integer returned by `call` into a `Result`
    pub fn check(call: &'static str, ret: i32) -> Result<()> {
        if ret == 0 {
            Ok(())
        } else {
            Err(Self::Call { call, code: ret })
        }
    }

    /// Turn a handle returned by `call` into a `Result`
    pub fn check_handle(call: &'static str, handle: u32) -> Result<u32> {
        if handle == 0 {
            Err(Self::NullHandle { call })
        } else {
            Ok(handle)
        }
    }

    /// Numeric code behind this error as printed in diagnostics
    #[must_use]
    pub fn code(&self) -> Option<u32> {
        match self {
            // Hex diagnostics show the two's complement of negative returns
            Self::Call { code, .. } => Some(*code as u32),
            _ => None,
        }
    }

    /// Whether this error stands for a missing handle rather than a return code
    #[must_use]
    pub fn is_null_result(&self) -> bool {
        matches!(self, Self::NullHandle { .. })
    }

    pub(crate) fn invalid_image(msg: impl Into<String>) -> Self {
        Self::InvalidImage(msg.into())
    }

    pub(crate) fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

/// Result type for DispmanX operations
pub type Result<T> = std::result::Result<T, DispmanxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check() {
        assert!(DispmanxError::check("vc_dispmanx_update_submit_sync", 0).is_ok());

        let err = DispmanxError::check("vc_dispmanx_update_submit_sync", -1).expect_err("non-zero");
        assert_eq!(err.code(), Some(0xffff_ffff));
        assert_eq!(err.to_string(), "vc_dispmanx_update_submit_sync failed: 0xffffffff");
    }

    #[test]
    fn test_check_handle() {
        assert_eq!(DispmanxError::check_handle("vc_dispmanx_display_open", 7), Ok(7));

        let err = DispmanxError::check_handle("vc_dispmanx_display_open", 0).expect_err("no handle");
        assert!(err.is_null_result());
        assert_eq!(err.code(), None);
        assert_eq!(err.to_string(), "vc_dispmanx_display_open returned no handle");
    }
}
