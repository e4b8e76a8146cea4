// vasurf/src/platform/va/error.rs
//
//! Translation of `libva` status codes to `vasurf` driver statuses.

use super::ffi::*;
use crate::DriverStatus;

pub(crate) trait ToDriverStatus {
    fn to_driver_status(self) -> DriverStatus;
}

impl ToDriverStatus for VAStatus {
    fn to_driver_status(self) -> DriverStatus {
        match self {
            VA_STATUS_ERROR_OPERATION_FAILED => DriverStatus::OperationFailed,
            VA_STATUS_ERROR_ALLOCATION_FAILED => DriverStatus::AllocationFailed,
            VA_STATUS_ERROR_INVALID_DISPLAY => DriverStatus::InvalidDisplay,
            VA_STATUS_ERROR_INVALID_CONTEXT => DriverStatus::InvalidContext,
            VA_STATUS_ERROR_INVALID_SURFACE => DriverStatus::InvalidSurface,
            VA_STATUS_ERROR_INVALID_BUFFER => DriverStatus::InvalidBuffer,
            VA_STATUS_ERROR_INVALID_IMAGE => DriverStatus::InvalidImage,
            VA_STATUS_ERROR_INVALID_SUBPICTURE => DriverStatus::InvalidSubpicture,
            VA_STATUS_ERROR_ATTR_NOT_SUPPORTED => DriverStatus::AttributeNotSupported,
            VA_STATUS_ERROR_MAX_NUM_EXCEEDED => DriverStatus::MaxNumExceeded,
            VA_STATUS_ERROR_UNSUPPORTED_RT_FORMAT => DriverStatus::UnsupportedRtFormat,
            VA_STATUS_ERROR_SURFACE_BUSY => DriverStatus::SurfaceBusy,
            VA_STATUS_ERROR_INVALID_PARAMETER => DriverStatus::InvalidParameter,
            VA_STATUS_ERROR_RESOLUTION_NOT_SUPPORTED => DriverStatus::ResolutionNotSupported,
            VA_STATUS_ERROR_UNIMPLEMENTED => DriverStatus::Unimplemented,
            VA_STATUS_ERROR_INVALID_IMAGE_FORMAT => DriverStatus::InvalidImageFormat,
            VA_STATUS_ERROR_HW_BUSY => DriverStatus::HardwareBusy,
            VA_STATUS_ERROR_UNSUPPORTED_MEMORY_TYPE => DriverStatus::UnsupportedMemoryType,
            VA_STATUS_ERROR_TIMEDOUT => DriverStatus::TimedOut,
            _ => DriverStatus::Failed,
        }
    }
}

/// Turns a `libva` status into a `Result`.
pub(crate) fn va_check(status: VAStatus) -> Result<(), DriverStatus> {
    if status == VA_STATUS_SUCCESS {
        Ok(())
    } else {
        Err(status.to_driver_status())
    }
}
