// vasurf/src/error.rs
//
//! Various errors that methods can produce.

use crate::driver::ApiVersion;
use crate::format::{ChromaType, VideoFormat};

use log::debug;
use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};

/// Various errors that methods can produce.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Error {
    /// The chroma type has no equivalent in the driver.
    UnsupportedChroma(ChromaType),
    /// The video format has no driver pixel format or no chroma type.
    UnsupportedFormat(VideoFormat),
    /// The driver interface predates the version that introduced the requested allocation
    /// strategy.
    CapabilityUnavailable {
        /// The driver API version the operation needs.
        required: ApiVersion,
        /// The driver API version actually reported.
        available: ApiVersion,
    },
    /// A driver call returned a non-success status.
    DriverCallFailed {
        /// The name of the driver entry point, e.g. `vaCreateSurfaces()`.
        call: &'static str,
        /// The status the driver returned.
        status: DriverStatus,
    },
    /// An argument did not satisfy the operation's preconditions, for instance an image whose
    /// dimensions differ from the surface's.
    PreconditionMismatch,
    /// No image could be obtained where one was needed.
    NoImage,
}

/// Abstraction of the status codes that the driver returns.
///
/// One variant per driver failure code; `Failed` covers codes this crate does not name.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DriverStatus {
    /// Miscellaneous failure.
    Failed,
    /// The operation failed.
    OperationFailed,
    /// The driver couldn't allocate the resource.
    AllocationFailed,
    /// The display is not valid.
    InvalidDisplay,
    /// The context is not valid.
    InvalidContext,
    /// The surface id does not name a live surface.
    InvalidSurface,
    /// The buffer id does not name a live buffer.
    InvalidBuffer,
    /// The image id does not name a live image.
    InvalidImage,
    /// The subpicture id does not name a live subpicture.
    InvalidSubpicture,
    /// A surface attribute is not supported.
    AttributeNotSupported,
    /// The maximum number of resources was exceeded.
    MaxNumExceeded,
    /// The render target format is not supported.
    UnsupportedRtFormat,
    /// The surface is busy.
    SurfaceBusy,
    /// The image format is not supported or does not match.
    InvalidImageFormat,
    /// A parameter is invalid.
    InvalidParameter,
    /// The requested resolution is not supported.
    ResolutionNotSupported,
    /// The operation is not implemented by the driver.
    Unimplemented,
    /// The memory type is not supported.
    UnsupportedMemoryType,
    /// The hardware is busy.
    HardwareBusy,
    /// The operation timed out.
    TimedOut,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match *self {
            Error::UnsupportedChroma(chroma_type) => {
                write!(f, "unsupported chroma type {:?}", chroma_type)
            }
            Error::UnsupportedFormat(format) => write!(f, "unsupported format {:?}", format),
            Error::CapabilityUnavailable {
                required,
                available,
            } => write!(
                f,
                "driver API {} is too old, {} is required",
                available, required
            ),
            Error::DriverCallFailed { call, status } => write!(f, "{} failed: {:?}", call, status),
            Error::PreconditionMismatch => f.write_str("precondition mismatch"),
            Error::NoImage => f.write_str("no image available"),
        }
    }
}

impl StdError for Error {}

/// Translation of driver statuses to `vasurf` errors.
///
/// Every failed call is logged here with the name of the call, so callers only deal with the
/// returned `Error`.
pub(crate) trait CheckStatus<T> {
    fn check(self, call: &'static str) -> Result<T, Error>;
}

impl<T> CheckStatus<T> for Result<T, DriverStatus> {
    fn check(self, call: &'static str) -> Result<T, Error> {
        self.map_err(|status| {
            debug!("{}: {:?}", call, status);
            Error::DriverCallFailed { call, status }
        })
    }
}
