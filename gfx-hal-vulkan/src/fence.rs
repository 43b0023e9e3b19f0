//! Native fence primitive. Grounded on `wgpu-hal::vulkan::Fence`, which
//! wraps either a pool of binary `vk::Fence`s or a single timeline
//! semaphore depending on what the driver supports.
//!
//! This is the low-level primitive only. The higher-level fence *cache*
//! with its Reset/InUse/Finished state machine and ordered wait
//! callbacks (spec.md §4.3) lives in `gfx-core::fence_cache` and is
//! built on top of this.

use ash::vk;

use crate::{HalError, HalResult};

/// Either a pool of single-use binary fences, or a timeline semaphore
/// counter, mirroring the teacher's choice to prefer
/// `VK_KHR_timeline_semaphore` when the device supports it and fall
/// back to classic fences otherwise.
pub enum RawFence {
    TimelineSemaphore { semaphore: vk::Semaphore, last_completed: u64 },
    FencePool { pool: Vec<vk::Fence>, free: Vec<usize> },
}

impl RawFence {
    pub fn new_timeline(device: &ash::Device) -> HalResult<Self> {
        let mut type_info = vk::SemaphoreTypeCreateInfo::default()
            .semaphore_type(vk::SemaphoreType::TIMELINE)
            .initial_value(0);
        let create_info = vk::SemaphoreCreateInfo::default().push_next(&mut type_info);
        let semaphore =
            unsafe { device.create_semaphore(&create_info, None) }.map_err(HalError::from)?;
        Ok(Self::TimelineSemaphore { semaphore, last_completed: 0 })
    }

    pub fn new_fence_pool() -> Self {
        Self::FencePool { pool: Vec::new(), free: Vec::new() }
    }

    /// Returns a fence/value pair to wait on for the next submission,
    /// allocating a new native fence if the pool is exhausted.
    pub fn acquire(&mut self, device: &ash::Device) -> HalResult<FenceValue> {
        match self {
            Self::TimelineSemaphore { semaphore, last_completed } => {
                *last_completed += 1;
                Ok(FenceValue::Timeline(*semaphore, *last_completed))
            }
            Self::FencePool { pool, free } => {
                let index = if let Some(index) = free.pop() {
                    unsafe { device.reset_fences(&[pool[index]]) }.map_err(HalError::from)?;
                    index
                } else {
                    let fence = unsafe { device.create_fence(&vk::FenceCreateInfo::default(), None) }
                        .map_err(HalError::from)?;
                    pool.push(fence);
                    pool.len() - 1
                };
                Ok(FenceValue::Pooled(pool[index]))
            }
        }
    }

    pub fn release(&mut self, value: &FenceValue) {
        if let (Self::FencePool { pool, free }, FenceValue::Pooled(raw)) = (self, value) {
            if let Some(index) = pool.iter().position(|f| f == raw) {
                free.push(index);
            }
        }
    }

    pub fn is_signaled(&self, device: &ash::Device, value: &FenceValue) -> HalResult<bool> {
        match value {
            FenceValue::Pooled(fence) => {
                unsafe { device.get_fence_status(*fence) }.map_err(HalError::from)
            }
            FenceValue::Timeline(semaphore, target) => {
                let counter =
                    unsafe { device.get_semaphore_counter_value(*semaphore) }
                        .map_err(HalError::from)?;
                Ok(counter >= *target)
            }
        }
    }

    /// Blocks up to `timeout_ns` for `value` to be signaled. Returns
    /// `false` on timeout rather than erroring, matching
    /// `ash::Device::get_fence_status`'s NOT_READY-as-Ok(false) shape.
    pub fn wait(
        &self,
        device: &ash::Device,
        value: &FenceValue,
        timeout_ns: u64,
    ) -> HalResult<bool> {
        match value {
            FenceValue::Pooled(fence) => {
                match unsafe { device.wait_for_fences(&[*fence], true, timeout_ns) } {
                    Ok(()) => Ok(true),
                    Err(vk::Result::TIMEOUT) => Ok(false),
                    Err(other) => Err(HalError::from(other)),
                }
            }
            FenceValue::Timeline(semaphore, target) => {
                let semaphores = [*semaphore];
                let values = [*target];
                let wait_info = vk::SemaphoreWaitInfo::default()
                    .semaphores(&semaphores)
                    .values(&values);
                match unsafe { device.wait_semaphores(&wait_info, timeout_ns) } {
                    Ok(()) => Ok(true),
                    Err(vk::Result::TIMEOUT) => Ok(false),
                    Err(other) => Err(HalError::from(other)),
                }
            }
        }
    }

    pub unsafe fn destroy(&self, device: &ash::Device) {
        match self {
            Self::TimelineSemaphore { semaphore, .. } => device.destroy_semaphore(*semaphore, None),
            Self::FencePool { pool, .. } => {
                for fence in pool {
                    device.destroy_fence(*fence, None);
                }
            }
        }
    }
}

/// A value produced by one `acquire()` call, to be passed to a submit
/// and later polled or waited on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceValue {
    Pooled(vk::Fence),
    Timeline(vk::Semaphore, u64),
}
