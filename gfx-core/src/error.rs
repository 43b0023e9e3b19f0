//! Error taxonomy (spec.md §7). Every fallible entry point returns a
//! `GfxResult`; non-fatal failures are additionally funneled to the
//! owning device's uncaptured-error callback with a classifying
//! [`ErrorKind`] so that the API call itself can simply return null /
//! zero-valued, matching the WebGPU contract.

pub use types::ErrorKind;

#[derive(Debug, thiserror::Error)]
pub enum GfxError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("out of memory")]
    OutOfMemory,
    #[error("internal error: {0}")]
    Internal(String),
    #[error("device lost")]
    Lost,
}

impl GfxError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::OutOfMemory => ErrorKind::OutOfMemory,
            Self::Internal(_) => ErrorKind::Internal,
            Self::Lost => ErrorKind::Lost,
        }
    }
}

impl From<hal::HalError> for GfxError {
    fn from(err: hal::HalError) -> Self {
        match err {
            hal::HalError::OutOfMemory => Self::OutOfMemory,
            hal::HalError::DeviceLost => Self::Lost,
            hal::HalError::SurfaceOutdated | hal::HalError::SurfaceLost => {
                Self::Internal(err.to_string())
            }
            hal::HalError::Vulkan(_) | hal::HalError::Allocation(_) => {
                Self::Internal(err.to_string())
            }
        }
    }
}

pub type GfxResult<T> = Result<T, GfxError>;

/// Registered on a [`crate::device::Device`] via `set_uncaptured_error_callback`.
/// Called once per non-fatal error, never across a panic boundary.
pub type UncapturedErrorCallback = Box<dyn FnMut(ErrorKind, String)>;
