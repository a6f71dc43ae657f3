//! Checked calls and the run's error type
//!
//! Every hardware call in the capture sequence goes through [`check!`],
//! which records where the call was made and what was called. A failure
//! becomes a [`DemoError`] whose message reads like
//!
//! ```text
//! src/sequence.rs:212: MMAL call failed: port.commit_format(): mmal_port_format_commit failed: 0x00000003 (MMAL_EINVAL)
//! ```
//!
//! The three kinds of hardware failure (a missing handle or empty queue, an
//! MMAL status, a DispmanX return code) differ only in how the code is
//! decoded; they all end the run.
//!
//! [`check!`]: crate::check

use std::fmt;
use std::time::Duration;

use thiserror::Error;
use vc_dispmanx::DispmanxError;
use vc_mmal::MmalError;

use crate::handshake::HandshakeError;

/// Where a checked call was made
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSite {
    pub file: &'static str,
    pub line: u32,
    /// The call expression as written
    pub expr: &'static str,
}

impl CallSite {
    #[must_use]
    pub const fn new(file: &'static str, line: u32, expr: &'static str) -> Self {
        Self { file, line, expr }
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Optional detail, printed in parentheses when present
struct DetailSuffix<'a>(&'a Option<String>);

impl fmt::Display for DetailSuffix<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(detail) => write!(f, " ({detail})"),
            None => Ok(()),
        }
    }
}

/// Errors that end a capture run
#[derive(Error, Debug)]
pub enum DemoError {
    /// A call produced a NULL handle, an empty queue or a false condition
    #[error("{site}: Assertion failed: {}{}", .site.expr, DetailSuffix(.detail))]
    Assertion {
        site: CallSite,
        detail: Option<String>,
    },

    /// An MMAL call returned a non-success status
    #[error("{site}: MMAL call failed: {}: {source}", .site.expr)]
    Mmal {
        site: CallSite,
        source: MmalError,
    },

    /// A DispmanX call returned non-zero
    #[error("{site}: Dispmanx call failed: {}: {source}", .site.expr)]
    Dispmanx {
        site: CallSite,
        source: DispmanxError,
    },

    /// The completion handshake failed
    #[error("Completion handshake failed: {0}")]
    Handshake(#[from] HandshakeError),

    /// No buffer completed within the configured timeout
    #[error("No buffer completed within {0:?}")]
    Timeout(Duration),

    /// The configuration did not validate
    #[error("Invalid configuration: {}", .0.join("; "))]
    InvalidConfig(Vec<String>),

    /// `run` was called on a sequence that already ran
    #[error("Capture sequence already ran")]
    AlreadyRun,
}

impl DemoError {
    /// The checked call that failed, if the error came from one
    #[must_use]
    pub fn site(&self) -> Option<&CallSite> {
        match self {
            Self::Assertion { site, .. } | Self::Mmal { site, .. } | Self::Dispmanx { site, .. } => Some(site),
            _ => None,
        }
    }

    /// Hardware status code behind the error, as printed in diagnostics
    #[must_use]
    pub fn code(&self) -> Option<u32> {
        match self {
            Self::Mmal { source, .. } => source.status_code(),
            Self::Dispmanx { source, .. } => source.code(),
            _ => None,
        }
    }

    /// The MMAL error behind this one, if any
    #[must_use]
    pub fn mmal(&self) -> Option<&MmalError> {
        match self {
            Self::Mmal { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Result type for capture runs
pub type Result<T> = std::result::Result<T, DemoError>;

/// Results that [`check!`](crate::check) knows how to decode
pub trait CheckedCall {
    type Output;

    /// Attach `site` to a failure
    fn checked(self, site: CallSite) -> Result<Self::Output>;
}

impl<T> CheckedCall for std::result::Result<T, MmalError> {
    type Output = T;

    fn checked(self, site: CallSite) -> Result<T> {
        self.map_err(|source| {
            if source.is_null_result() {
                DemoError::Assertion {
                    site,
                    detail: Some(source.to_string()),
                }
            } else {
                DemoError::Mmal { site, source }
            }
        })
    }
}

impl<T> CheckedCall for std::result::Result<T, DispmanxError> {
    type Output = T;

    fn checked(self, site: CallSite) -> Result<T> {
        self.map_err(|source| {
            if source.is_null_result() {
                DemoError::Assertion {
                    site,
                    detail: Some(source.to_string()),
                }
            } else {
                DemoError::Dispmanx { site, source }
            }
        })
    }
}

impl<T> CheckedCall for Option<T> {
    type Output = T;

    fn checked(self, site: CallSite) -> Result<T> {
        self.ok_or(DemoError::Assertion { site, detail: None })
    }
}

impl CheckedCall for bool {
    type Output = ();

    fn checked(self, site: CallSite) -> Result<()> {
        if self {
            Ok(())
        } else {
            Err(DemoError::Assertion { site, detail: None })
        }
    }
}

/// Run a hardware call and turn its failure into a located [`DemoError`]
///
/// Works on `Result<_, MmalError>`, `Result<_, DispmanxError>`, `Option<_>`
/// and `bool`. Evaluates to `Result<T, DemoError>`.
///
/// ```rust
/// use vc_pattern::check;
/// use vc_pattern::error::DemoError;
///
/// let err = check!(None::<u32>).expect_err("None fails");
/// assert!(matches!(err, DemoError::Assertion { .. }));
/// assert!(err.to_string().contains("Assertion failed: None"));
/// ```
#[macro_export]
macro_rules! check {
    ($call:expr) => {
        $crate::error::CheckedCall::checked(
            $call,
            $crate::error::CallSite::new(file!(), line!(), stringify!($call)),
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use vc_mmal::MmalStatus;

    #[test]
    fn test_mmal_diagnostic() {
        let err = check!(MmalStatus::Invalid.check("mmal_port_format_commit")).expect_err("EINVAL");
        let text = err.to_string();

        assert!(text.starts_with("src/error.rs:"), "{text}");
        assert!(text.contains("MMAL call failed: MmalStatus::Invalid"), "{text}");
        assert!(text.ends_with("0x00000003 (MMAL_EINVAL)"), "{text}");
        assert_eq!(err.code(), Some(3));
        let expr = err.site().map(|s| s.expr).unwrap_or_default();
        assert!(expr.contains("mmal_port_format_commit"), "{expr}");
    }

    #[test]
    fn test_dispmanx_diagnostic() {
        let err = check!(DispmanxError::check("vc_dispmanx_update_submit_sync", -1)).expect_err("non-zero");
        assert!(err.to_string().contains("Dispmanx call failed"));
        assert!(err.to_string().ends_with("0xffffffff"));
        assert_eq!(err.code(), Some(0xffff_ffff));
    }

    #[test]
    fn test_null_results_are_assertions() {
        let pool: std::result::Result<(), MmalError> = Err(MmalError::PoolCreation { num: 3, size: 65536 });
        let err = check!(pool).expect_err("no pool");
        assert!(matches!(err, DemoError::Assertion { detail: Some(_), .. }));
        assert_eq!(err.code(), None);

        let err = check!(DispmanxError::check_handle("vc_dispmanx_display_open", 0)).expect_err("no handle");
        assert!(matches!(err, DemoError::Assertion { .. }));

        assert!(check!(Some(5)).is_ok());
        assert!(check!(1 + 1 == 3).is_err());
    }

    #[test]
    fn test_site_line() {
        let line = line!() + 1;
        let err = check!(false).expect_err("false");
        assert_eq!(err.site().map(|s| s.line), Some(line));
    }

    #[test]
    fn test_config_error_display() {
        let err = DemoError::InvalidConfig(vec!["a".into(), "b".into()]);
        assert_eq!(err.to_string(), "Invalid configuration: a; b");
    }
}
