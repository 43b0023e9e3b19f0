//! Per-frame cache (spec.md §4.6): one of [`crate::device::FRAMES_IN_FLIGHT`]
//! rotating slots holding a command pool, reusable primary/secondary
//! command buffers, a bind-group descriptor-set cache, a
//! final-transition fence/command-buffer/semaphore, and a pool of
//! recently-unused upload buffers.

use std::cell::RefCell;

use ash::vk;
use gpu_descriptor::DescriptorSet;
use rustc_hash::FxHashMap;

use crate::buffer::Buffer;
use crate::error::{GfxError, GfxResult};
use crate::fence::{FenceId, SharedFenceCache};
use crate::handle::Handle;

pub struct FrameSlot {
    command_pool: vk::CommandPool,
    primary_buffers: Vec<vk::CommandBuffer>,
    secondary_buffers: Vec<vk::CommandBuffer>,
    /// Keyed by the owning `BindGroupLayout`'s handle identity (spec.md
    /// §9): "A cache hit avoids descriptor-pool allocation entirely."
    bind_group_cache: RefCell<FxHashMap<usize, Vec<DescriptorSet<vk::DescriptorSet>>>>,
    final_transition_fence: RefCell<Option<FenceId>>,
    final_transition_cmd: vk::CommandBuffer,
    final_transition_semaphore: vk::Semaphore,
    upload_buffers: RefCell<Vec<Handle<Buffer>>>,
    /// Fences registered against this slot by the submit engine
    /// (spec.md §4.7 step 7's "pending map"), waited and reset on
    /// re-entry (spec.md §4.6 steps 1-4).
    pending_fences: RefCell<Vec<FenceId>>,
}

impl FrameSlot {
    pub fn new(device: &ash::Device, queue_family_index: u32) -> GfxResult<Self> {
        let pool_info = vk::CommandPoolCreateInfo::default()
            .flags(vk::CommandPoolCreateFlags::empty())
            .queue_family_index(queue_family_index);
        let command_pool = unsafe { device.create_command_pool(&pool_info, None) }
            .map_err(|e| GfxError::from(hal::HalError::from(e)))?;

        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);
        let final_transition_cmd = unsafe { device.allocate_command_buffers(&alloc_info) }
            .map_err(|e| GfxError::from(hal::HalError::from(e)))?[0];

        let final_transition_semaphore =
            unsafe { device.create_semaphore(&vk::SemaphoreCreateInfo::default(), None) }
                .map_err(|e| GfxError::from(hal::HalError::from(e)))?;

        Ok(Self {
            command_pool,
            primary_buffers: Vec::new(),
            secondary_buffers: Vec::new(),
            bind_group_cache: RefCell::new(FxHashMap::default()),
            final_transition_fence: RefCell::new(None),
            final_transition_cmd,
            final_transition_semaphore,
            upload_buffers: RefCell::new(Vec::new()),
            pending_fences: RefCell::new(Vec::new()),
        })
    }

    pub fn final_transition_cmd(&self) -> vk::CommandBuffer {
        self.final_transition_cmd
    }

    pub fn final_transition_semaphore(&self) -> vk::Semaphore {
        self.final_transition_semaphore
    }

    pub fn set_final_transition_fence(&self, id: FenceId) {
        *self.final_transition_fence.borrow_mut() = Some(id);
    }

    /// Hands back a recycled primary command buffer, or allocates a new
    /// one if the pool is exhausted.
    pub fn acquire_primary_buffer(&mut self, device: &ash::Device) -> GfxResult<vk::CommandBuffer> {
        if let Some(buffer) = self.primary_buffers.pop() {
            return Ok(buffer);
        }
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);
        let buffer = unsafe { device.allocate_command_buffers(&alloc_info) }
            .map_err(|e| GfxError::from(hal::HalError::from(e)))?[0];
        Ok(buffer)
    }

    pub fn acquire_secondary_buffer(&mut self, device: &ash::Device) -> GfxResult<vk::CommandBuffer> {
        if let Some(buffer) = self.secondary_buffers.pop() {
            return Ok(buffer);
        }
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.command_pool)
            .level(vk::CommandBufferLevel::SECONDARY)
            .command_buffer_count(1);
        let buffer = unsafe { device.allocate_command_buffers(&alloc_info) }
            .map_err(|e| GfxError::from(hal::HalError::from(e)))?[0];
        Ok(buffer)
    }

    /// Returns a descriptor set to the bind-group cache, keyed by the
    /// layout it was allocated against (spec.md §4.6: "populated on
    /// BindGroup release").
    pub fn release_bind_group_set(&self, layout_id: usize, set: DescriptorSet<vk::DescriptorSet>) {
        self.bind_group_cache.borrow_mut().entry(layout_id).or_default().push(set);
    }

    /// Drains a cached set for `layout_id`, if one is available (spec.md
    /// §4.6: "drained on BindGroup creation").
    pub fn take_bind_group_set(&self, layout_id: usize) -> Option<DescriptorSet<vk::DescriptorSet>> {
        self.bind_group_cache.borrow_mut().get_mut(&layout_id).and_then(Vec::pop)
    }

    pub fn take_upload_buffer(&self, min_size: types::BufferAddress) -> Option<Handle<Buffer>> {
        let mut pool = self.upload_buffers.borrow_mut();
        let index = pool.iter().position(|b| b.borrow().size >= min_size)?;
        Some(pool.swap_remove(index))
    }

    pub fn return_upload_buffer(&self, buffer: Handle<Buffer>) {
        self.upload_buffers.borrow_mut().push(buffer);
    }

    pub fn register_pending_fence(&self, id: FenceId) {
        self.pending_fences.borrow_mut().push(id);
    }

    /// Slot-entry algorithm (spec.md §4.6 steps 1-4): wait every pending
    /// fence to completion, fire callbacks (done inside the wait),
    /// bulk-reset the command pool, then return the fences to the cache.
    pub fn enter(&mut self, device: &ash::Device, fences: &SharedFenceCache) -> GfxResult<()> {
        let pending = std::mem::take(&mut *self.pending_fences.borrow_mut());
        fences.wait_many(device, &pending, u64::MAX)?;
        unsafe { device.reset_command_pool(self.command_pool, vk::CommandPoolResetFlags::empty()) }
            .map_err(|e| GfxError::from(hal::HalError::from(e)))?;
        for id in pending {
            fences.put_fence(id);
        }
        Ok(())
    }

    /// Non-blocking poll for `device_tick` (spec.md §6): fires callbacks
    /// for any pending fence that has already signalled, without
    /// resetting the pool or returning fences to the cache (that only
    /// happens on slot re-entry).
    pub fn poll(&self, device: &ash::Device, fences: &SharedFenceCache) -> GfxResult<()> {
        for &id in self.pending_fences.borrow().iter() {
            fences.is_signaled(device, id)?;
        }
        Ok(())
    }

    pub unsafe fn destroy(self, device: &ash::Device) {
        device.destroy_semaphore(self.final_transition_semaphore, None);
        device.destroy_command_pool(self.command_pool, None);
    }
}
