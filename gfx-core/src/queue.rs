//! Queue submit engine (spec.md §4.7). A `Queue` owns the presubmit
//! encoder — where staging copies accumulate between submits — and
//! turns a batch of finished [`CommandBuffer`]s into one native submit:
//! synthesizing the inter-buffer compatibility barriers the individual
//! encoders' own trackers didn't know to emit, updating every touched
//! texture's cached layout, latching `latest_fence` on written
//! host-mappable buffers, and registering the resulting fence with the
//! current frame slot so slot recycling (spec.md §4.6) drives release.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use ash::vk;
use hal::fence::FenceValue;
use types::{AccessFlags, BufferAddress, BufferUsage, Extent3d, MapMode, PipelineStages, SubresourceRange, TextureLayout};

use crate::barrier::{synthesize_submit_barriers, SynthesizedBarriers};
use crate::buffer::{Buffer, BufferDescriptor};
use crate::device::Device;
use crate::encoder::{CommandBuffer, CommandEncoder};
use crate::error::{GfxError, GfxResult};
use crate::fence::FenceId;
use crate::handle::Handle;
use crate::surface::{Surface, SurfaceStatus};
use crate::texture::Texture;
use crate::tracker::{BufferSnapshot, ResourceTracker, TextureSnapshot};

pub struct Queue {
    device: Weak<Device>,
    presubmit: RefCell<Option<CommandEncoder>>,
}

impl Queue {
    pub fn new(device: &Rc<Device>) -> Self {
        Self::from_weak(Rc::downgrade(device))
    }

    /// Built from a bare `Weak` so `Device::new` can construct its
    /// queue inside the `Rc::new_cyclic` closure that also produces
    /// the device's own weak self-reference, before any `Rc<Device>`
    /// exists to downgrade.
    pub(crate) fn from_weak(device: Weak<Device>) -> Self {
        Self { device, presubmit: RefCell::new(None) }
    }

    fn device(&self) -> Rc<Device> {
        self.device.upgrade().expect("queue outlived its device")
    }

    /// Lends the presubmit encoder to `f`, creating it the first time
    /// it's needed (spec.md §4.7 step 1: "the place where write-buffer
    /// and write-texture staging copies are accumulated").
    pub fn with_presubmit_encoder<R>(&self, f: impl FnOnce(&mut CommandEncoder) -> R) -> GfxResult<R> {
        let mut slot = self.presubmit.borrow_mut();
        if slot.is_none() {
            let device = self.device();
            let raw = device.with_frame_slot(|frame| frame.acquire_primary_buffer(device.raw()))?;
            *slot = Some(CommandEncoder::new(&device, raw)?);
        }
        Ok(f(slot.as_mut().unwrap()))
    }

    /// Finalizes any outstanding presubmit work without a user submit.
    /// Exposed so callers with pending `write_buffer`/`write_texture`
    /// staging copies but no draw this frame (or about to drop the
    /// device) can still force them out; not run automatically from
    /// `Device::drop`, since a `Weak<Device>` cannot be upgraded once
    /// the device's own strong count has reached zero.
    pub fn flush_presubmit(&self) -> GfxResult<()> {
        if self.presubmit.borrow().is_some() {
            self.submit(Vec::new(), None)?;
        }
        Ok(())
    }

    /// Uploads `data` into `dst` at `dst_offset` via a host-visible
    /// staging buffer, recorded into the presubmit encoder (spec.md
    /// §6). The staging buffer is kept alive by the presubmit
    /// encoder's own tracker until the submission it ends up in
    /// completes.
    pub fn write_buffer(&self, dst: &Handle<Buffer>, dst_offset: BufferAddress, data: &[u8]) -> GfxResult<()> {
        let staging = self.create_staging_buffer(data)?;
        self.with_presubmit_encoder(|encoder| {
            encoder.copy_buffer_to_buffer(&staging, 0, dst, dst_offset, data.len() as BufferAddress);
        })
    }

    /// Uploads `data` into `dst` via a host-visible staging buffer and
    /// a buffer-to-texture copy of `size`, recorded into the presubmit
    /// encoder (spec.md §6).
    pub fn write_texture(&self, dst: &Handle<Texture>, data: &[u8], size: Extent3d) -> GfxResult<()> {
        let staging = self.create_staging_buffer(data)?;
        self.with_presubmit_encoder(|encoder| {
            encoder.copy_buffer_to_texture(&staging, 0, dst, size);
        })
    }

    fn create_staging_buffer(&self, data: &[u8]) -> GfxResult<Handle<Buffer>> {
        let device = self.device();
        let staging = Buffer::new(
            &device,
            &BufferDescriptor {
                label: None,
                size: data.len() as BufferAddress,
                usage: BufferUsage::MAP_WRITE | BufferUsage::COPY_SRC,
                mapped_at_creation: true,
            },
        )?;
        {
            let mut buf = staging.borrow_mut();
            let ptr = buf.map(&device, MapMode::Write)?;
            unsafe { std::ptr::copy_nonoverlapping(data.as_ptr(), ptr, data.len()) };
            buf.unmap(&device);
        }
        Ok(staging)
    }

    /// Forwards to the device's single native queue wait-idle (spec.md
    /// §6).
    pub fn wait_idle(&self) -> GfxResult<()> {
        self.device().wait_idle()
    }

    /// Spec.md §4.8's `present(surface)`: transitions the active image
    /// to present-ready in the presubmit encoder, submits it waiting
    /// on the acquire semaphore the surface's last acquire signalled,
    /// calls native present, then ticks the device (§4.6 slot advance).
    pub fn present(&self, surface: &Surface, texture: &Handle<Texture>) -> GfxResult<SurfaceStatus> {
        let device = self.device();
        let wait_for_acquire = surface.take_acquire_semaphore();
        self.with_presubmit_encoder(|encoder| {
            encoder.transition_texture(texture, TextureLayout::PresentSrc, PipelineStages::BOTTOM_OF_PIPE, AccessFlags::empty());
        })?;
        self.submit(Vec::new(), wait_for_acquire)?;

        let swapchain = surface
            .raw_swapchain()
            .ok_or_else(|| GfxError::Validation("surface not configured".into()))?;
        let index = surface
            .current_index()
            .ok_or_else(|| GfxError::Validation("no acquired image to present".into()))?;

        let status = match device.native_queue().present(swapchain, index) {
            Ok(suboptimal) => Ok(if suboptimal { SurfaceStatus::Suboptimal } else { SurfaceStatus::Optimal }),
            Err(hal::HalError::SurfaceOutdated) => Ok(SurfaceStatus::Outdated),
            Err(hal::HalError::SurfaceLost) => Err(GfxError::Lost),
            Err(e) => Err(GfxError::from(e)),
        }?;
        device.advance_frame();
        Ok(status)
    }

    /// Runs the seven-step submit algorithm of spec.md §4.7 over
    /// `command_buffers`, returning the fence the caller must track to
    /// know the submission completed.
    pub fn submit(
        &self,
        command_buffers: Vec<CommandBuffer>,
        wait_for_acquire: Option<vk::Semaphore>,
    ) -> GfxResult<FenceId> {
        // Step 1: finalize the presubmit encoder, placing it at position 0
        // only if it actually recorded anything.
        let mut buffers = command_buffers;
        if let Some(encoder) = self.presubmit.borrow_mut().take() {
            let had_commands = !encoder.is_empty();
            let finished = encoder.finish()?;
            if had_commands {
                buffers.insert(0, finished);
            }
        }

        if buffers.is_empty() {
            return self.submit_empty(wait_for_acquire);
        }

        // Step 2: synthesize inter-buffer compatibility barriers. Buffers
        // have no cross-submit steady state to seed from (only a
        // texture's layout survives between submits, per Invariant 3), so
        // a buffer's first touch in a submit is assumed to need no
        // barrier against prior frames; cross-frame buffer reuse without
        // an intervening fence wait relies on the submission's own
        // in-order execution on a single queue.
        let trackers: Vec<&ResourceTracker<Buffer, Texture>> =
            buffers.iter().map(CommandBuffer::tracker).collect();
        let batches = synthesize_submit_barriers(
            &trackers,
            |_handle| BufferSnapshot::default(),
            |handle| TextureSnapshot {
                stage: PipelineStages::TOP_OF_PIPE,
                access: AccessFlags::empty(),
                layout: handle.borrow().current_layout(),
                subresource: SubresourceRange::default(),
            },
        );

        let device = self.device();
        let mut native_buffers = Vec::with_capacity(buffers.len() * 2);
        for (cmd, batch) in buffers.iter().zip(batches.iter()) {
            if !batch.is_empty() {
                native_buffers.push(self.record_barrier_buffer(batch)?);
            }
            native_buffers.push(cmd.raw());
        }

        // Step 3: submit the interleaved sequence.
        let fence_id = device.fences().get_fence(device.raw())?;
        let fence_value = device.fences().raw_value(fence_id);
        device.native_queue().submit(
            &device,
            &native_buffers,
            wait_for_acquire,
            Some(submit_fence_args(fence_value)),
        )?;
        device.fences().mark_in_use(fence_id);

        // Step 4: update every tracked texture's cached current layout.
        for cmd in &buffers {
            for (handle, record) in cmd.tracker().textures() {
                handle.borrow().set_current_layout(record.last.layout);
            }
        }

        // Step 5: latch latest_fence on every written host-mappable buffer.
        let mappable = BufferUsage::MAP_READ | BufferUsage::MAP_WRITE;
        for cmd in &buffers {
            for (handle, record) in cmd.tracker().buffers() {
                if record.ever_written && handle.borrow().usage.intersects(mappable) {
                    handle.borrow_mut().set_latest_fence(fence_id);
                }
            }
        }

        // Step 6: on wait-complete, drop every command buffer in the
        // submission so the resource refs their trackers hold are
        // released (spec.md §4.1). The submit fence itself is returned
        // to the cache by the frame slot's own entry algorithm (§4.6
        // step 4), not here.
        device.fences().on_wait_complete(fence_id, move || drop(buffers));

        // Step 7: record the fence against the current frame slot.
        device.with_frame_slot(|frame| frame.register_pending_fence(fence_id));

        Ok(fence_id)
    }

    /// Spec.md §4.7's closing paragraph: a frame with no user commands
    /// but a pending present still needs exactly one fence registered
    /// against the slot, so the recycler's invariant holds.
    fn submit_empty(&self, wait_for_acquire: Option<vk::Semaphore>) -> GfxResult<FenceId> {
        let device = self.device();
        let fence_id = device.fences().get_fence(device.raw())?;
        let fence_value = device.fences().raw_value(fence_id);
        device.native_queue().submit(
            &device,
            &[],
            wait_for_acquire,
            Some(submit_fence_args(fence_value)),
        )?;
        device.fences().mark_in_use(fence_id);
        device.with_frame_slot(|frame| {
            frame.set_final_transition_fence(fence_id);
            frame.register_pending_fence(fence_id);
        });
        Ok(fence_id)
    }

    /// Records one barrier command buffer covering every barrier in
    /// `batch`, batched into a single `vkCmdPipelineBarrier` call with
    /// OR'd stage masks.
    fn record_barrier_buffer(&self, batch: &SynthesizedBarriers<Buffer, Texture>) -> GfxResult<vk::CommandBuffer> {
        let device = self.device();
        let raw = device.with_frame_slot(|frame| frame.acquire_primary_buffer(device.raw()))?;
        let begin_info = vk::CommandBufferBeginInfo::default().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        unsafe { device.raw().begin_command_buffer(raw, &begin_info) }
            .map_err(|e| crate::error::GfxError::from(hal::HalError::from(e)))?;

        let mut src_stage = PipelineStages::empty();
        let mut dst_stage = PipelineStages::empty();

        let buffer_barriers: Vec<_> = batch
            .buffers
            .iter()
            .map(|(handle, barrier)| {
                src_stage |= barrier.src_stage;
                dst_stage |= barrier.dst_stage;
                vk::BufferMemoryBarrier::default()
                    .src_access_mask(hal::conv::map_access_flags(barrier.src_access))
                    .dst_access_mask(hal::conv::map_access_flags(barrier.dst_access))
                    .buffer(handle.borrow().raw())
                    .offset(0)
                    .size(vk::WHOLE_SIZE)
            })
            .collect();

        let image_barriers: Vec<_> = batch
            .textures
            .iter()
            .map(|(handle, barrier)| {
                src_stage |= barrier.src_stage;
                dst_stage |= barrier.dst_stage;
                vk::ImageMemoryBarrier::default()
                    .src_access_mask(hal::conv::map_access_flags(barrier.src_access))
                    .dst_access_mask(hal::conv::map_access_flags(barrier.dst_access))
                    .old_layout(hal::conv::map_image_layout(barrier.old_layout))
                    .new_layout(hal::conv::map_image_layout(barrier.new_layout))
                    .image(handle.borrow().raw())
                    .subresource_range(vk::ImageSubresourceRange {
                        aspect_mask: vk::ImageAspectFlags::COLOR,
                        base_mip_level: 0,
                        level_count: vk::REMAINING_MIP_LEVELS,
                        base_array_layer: 0,
                        layer_count: vk::REMAINING_ARRAY_LAYERS,
                    })
            })
            .collect();

        if src_stage.is_empty() {
            src_stage = PipelineStages::TOP_OF_PIPE;
        }
        if dst_stage.is_empty() {
            dst_stage = PipelineStages::BOTTOM_OF_PIPE;
        }

        unsafe {
            device.raw().cmd_pipeline_barrier(
                raw,
                hal::conv::map_pipeline_stages(src_stage),
                hal::conv::map_pipeline_stages(dst_stage),
                vk::DependencyFlags::empty(),
                &[],
                &buffer_barriers,
                &image_barriers,
            )
        };

        unsafe { device.raw().end_command_buffer(raw) }
            .map_err(|e| crate::error::GfxError::from(hal::HalError::from(e)))?;
        Ok(raw)
    }
}

fn submit_fence_args(value: FenceValue) -> (vk::Fence, Option<(vk::Semaphore, u64)>) {
    match value {
        FenceValue::Pooled(fence) => (fence, None),
        FenceValue::Timeline(semaphore, target) => (vk::Fence::null(), Some((semaphore, target))),
    }
}

#[cfg(test)]
mod tests {
    use super::submit_fence_args;
    use ash::vk;
    use ash::vk::Handle as _;
    use hal::fence::FenceValue;

    #[test]
    fn pooled_fence_signals_no_timeline_semaphore() {
        let fence = vk::Fence::from_raw(1);
        let (raw, timeline) = submit_fence_args(FenceValue::Pooled(fence));
        assert_eq!(raw, fence);
        assert!(timeline.is_none());
    }

    #[test]
    fn timeline_fence_signals_null_vk_fence_and_carries_the_target_value() {
        let semaphore = vk::Semaphore::from_raw(7);
        let (raw, timeline) = submit_fence_args(FenceValue::Timeline(semaphore, 42));
        assert_eq!(raw, vk::Fence::null());
        assert_eq!(timeline, Some((semaphore, 42)));
    }
}
