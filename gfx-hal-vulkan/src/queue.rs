//! Native queue: submission and present. Grounded on
//! `wgpu-hal::vulkan::queue`. Relay-semaphore present ordering is
//! carried over verbatim: every submission signals the next slot of a
//! small ring of semaphores, and present waits on whichever slot the
//! most recent submission signalled, so a present never races a
//! submission whose work it depends on without an explicit wait.

use std::sync::atomic::{AtomicIsize, Ordering};

use arrayvec::ArrayVec;
use ash::vk;

use crate::device::Device;
use crate::{HalError, HalResult};

const RELAY_SEMAPHORE_COUNT: usize = 2;

pub struct Queue {
    raw: vk::Queue,
    swapchain_fn: ash::khr::swapchain::Device,
    relay_semaphores: [vk::Semaphore; RELAY_SEMAPHORE_COUNT],
    relay_index: AtomicIsize,
}

impl Queue {
    pub fn new(instance: &ash::Instance, device: &Device) -> HalResult<Self> {
        let swapchain_fn = ash::khr::swapchain::Device::new(instance, device.raw());
        let mut relay_semaphores = [vk::Semaphore::null(); RELAY_SEMAPHORE_COUNT];
        for slot in &mut relay_semaphores {
            *slot = unsafe {
                device
                    .raw()
                    .create_semaphore(&vk::SemaphoreCreateInfo::default(), None)
            }
            .map_err(HalError::from)?;
        }
        Ok(Self {
            raw: device.raw_queue(),
            swapchain_fn,
            relay_semaphores,
            relay_index: AtomicIsize::new(-1),
        })
    }

    /// Submits recorded command buffers, optionally waiting on a
    /// swapchain-image-acquire semaphore and signalling a fence value.
    pub fn submit(
        &self,
        device: &Device,
        command_buffers: &[vk::CommandBuffer],
        wait_semaphore: Option<vk::Semaphore>,
        signal_fence: Option<(vk::Fence, Option<(vk::Semaphore, u64)>)>,
    ) -> HalResult<()> {
        let mut wait_stage_masks = Vec::new();
        let mut wait_semaphores = Vec::new();
        let mut signal_semaphores = ArrayVec::<_, { RELAY_SEMAPHORE_COUNT + 1 }>::new();
        let mut signal_values = ArrayVec::<_, 2>::new();

        if let Some(sem) = wait_semaphore {
            wait_stage_masks.push(vk::PipelineStageFlags::TOP_OF_PIPE);
            wait_semaphores.push(sem);
        }

        let old_index = self.relay_index.load(Ordering::Relaxed);
        let sem_index = if old_index >= 0 {
            wait_stage_masks.push(vk::PipelineStageFlags::TOP_OF_PIPE);
            wait_semaphores.push(self.relay_semaphores[old_index as usize]);
            (old_index as usize + 1) % self.relay_semaphores.len()
        } else {
            0
        };
        signal_semaphores.push(self.relay_semaphores[sem_index]);
        self.relay_index.store(sem_index as isize, Ordering::Relaxed);

        let mut fence_raw = vk::Fence::null();
        if let Some((fence, timeline)) = signal_fence {
            fence_raw = fence;
            if let Some((semaphore, value)) = timeline {
                signal_semaphores.push(semaphore);
                signal_values.push(!0);
                signal_values.push(value);
            }
        }

        let mut submit_info = vk::SubmitInfo::default()
            .command_buffers(command_buffers)
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stage_masks)
            .signal_semaphores(&signal_semaphores);

        let mut timeline_info;
        if !signal_values.is_empty() {
            timeline_info =
                vk::TimelineSemaphoreSubmitInfo::default().signal_semaphore_values(&signal_values);
            submit_info = submit_info.push_next(&mut timeline_info);
        }

        profiling::scope!("vkQueueSubmit");
        unsafe { device.raw().queue_submit(self.raw, &[submit_info], fence_raw) }
            .map_err(HalError::from)
    }

    /// Presents `image_index` on `swapchain`, waiting on whichever
    /// relay semaphore the last submission signalled.
    pub fn present(&self, swapchain: vk::SwapchainKHR, image_index: u32) -> HalResult<bool> {
        let swapchains = [swapchain];
        let image_indices = [image_index];
        let mut present_info = vk::PresentInfoKHR::default()
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let old_index = self.relay_index.swap(-1, Ordering::Relaxed);
        if old_index >= 0 {
            present_info = present_info
                .wait_semaphores(&self.relay_semaphores[old_index as usize..old_index as usize + 1]);
        }

        profiling::scope!("vkQueuePresentKHR");
        match unsafe { self.swapchain_fn.queue_present(self.raw, &present_info) } {
            Ok(suboptimal) => Ok(suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Err(HalError::SurfaceOutdated),
            Err(vk::Result::ERROR_SURFACE_LOST_KHR) => Err(HalError::SurfaceLost),
            Err(other) => Err(HalError::from(other)),
        }
    }

    pub unsafe fn destroy(&self, device: &ash::Device) {
        for semaphore in self.relay_semaphores {
            device.destroy_semaphore(semaphore, None);
        }
    }
}
