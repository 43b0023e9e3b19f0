//! Thin, mostly-unsafe wrappers around `ash` Vulkan calls.
//!
//! This crate is the single supported backend (per spec.md §1's
//! Non-goals: "support for any backend other than an explicit
//! low-level GPU API in the style of Vulkan"). Unlike the teacher
//! (`wgpu-hal`), there is no `Api` trait of associated types standing
//! between this crate and its caller — `gfx-core` depends on these
//! concrete types directly.
//!
//! Resource lifetime, reference counting, command buffering, and
//! synchronization tracking are **not** implemented here; they live in
//! `gfx-core`, which is the only thing that understands "a frame" or
//! "a submission". This crate only knows how to ask the driver to do
//! one thing at a time.

pub mod adapter;
pub mod alloc;
pub mod conv;
pub mod device;
pub mod fence;
pub mod instance;
pub mod queue;
pub mod surface;

pub use adapter::{Adapter, QueueFamilies};
pub use device::Device;
pub use fence::RawFence;
pub use instance::Instance;
pub use queue::Queue;
pub use surface::{AcquiredImage, Surface};

use ash::vk;

/// Error surfaced by a fallible Vulkan call. This is the hal-layer
/// error; `gfx-core` classifies these into the `types::ErrorKind`
/// taxonomy (spec.md §7) before reporting them to the uncaptured-error
/// channel.
#[derive(Debug, thiserror::Error)]
pub enum HalError {
    #[error("out of host or device memory")]
    OutOfMemory,
    #[error("device lost")]
    DeviceLost,
    #[error("vulkan call failed: {0:?}")]
    Vulkan(vk::Result),
    #[error("surface out of date")]
    SurfaceOutdated,
    #[error("surface lost")]
    SurfaceLost,
    #[error("memory allocation failed: {0}")]
    Allocation(String),
}

impl From<vk::Result> for HalError {
    fn from(result: vk::Result) -> Self {
        match result {
            vk::Result::ERROR_OUT_OF_HOST_MEMORY | vk::Result::ERROR_OUT_OF_DEVICE_MEMORY => {
                Self::OutOfMemory
            }
            vk::Result::ERROR_DEVICE_LOST => Self::DeviceLost,
            vk::Result::ERROR_OUT_OF_DATE_KHR => Self::SurfaceOutdated,
            vk::Result::ERROR_SURFACE_LOST_KHR => Self::SurfaceLost,
            other => Self::Vulkan(other),
        }
    }
}

pub type HalResult<T> = Result<T, HalError>;

/// A texture's backing memory: either suballocated by us, or not owned
/// here at all (a swapchain image, whose memory belongs to the
/// presentation engine).
#[derive(Debug)]
pub enum TextureMemory {
    Suballocated(gpu_alloc::MemoryBlock<vk::DeviceMemory>),
    NotOwned,
}
