//! Logical device (spec.md §3): "wraps the logical device; owns the
//! queue, the memory sub-allocator, a fence cache, N per-frame caches,
//! and a renderpass-layout cache. Holds a non-owning reference to its
//! adapter." The memory sub-allocator and renderpass-layout cache live
//! one layer down, inside [`hal::Device`]; this module adds everything
//! above that: the fence cache, the per-frame slot ring, and the
//! uncaptured-error channel.
//!
//! `Device` derefs to [`hal::Device`] so that hal-layer free functions
//! taking `&hal::Device` (`hal::alloc::*`, `hal::conv::*`) can be
//! called by passing a `&crate::device::Device` directly.

use std::cell::RefCell;
use std::ops::Deref;
use std::rc::{Rc, Weak};

use types::ErrorKind;

use crate::error::{GfxResult, UncapturedErrorCallback};
use crate::fence::{FenceCache, SharedFenceCache};
use crate::frame::FrameSlot;
use crate::queue::Queue;

/// Number of rotating per-frame cache slots (spec.md §4.6: "typically 2").
pub const FRAMES_IN_FLIGHT: usize = 2;

pub struct Device {
    pub(crate) raw: hal::Device,
    pub(crate) queue_raw: hal::Queue,
    instance: Rc<hal::Instance>,
    fences: SharedFenceCache,
    frames: RefCell<Vec<FrameSlot>>,
    submitted_frames: RefCell<u64>,
    adapter_name: String,
    error_callback: RefCell<Option<UncapturedErrorCallback>>,
    /// Upgraded by resource constructors that need to hand out an
    /// owning `Rc<Device>` from a `&self` call (spec.md §6's
    /// `device.create_*` surface).
    self_weak: Weak<Device>,
    queue: Queue,
}

impl Device {
    pub(crate) fn new(instance: &Rc<hal::Instance>, adapter: &hal::Adapter) -> GfxResult<Rc<Self>> {
        let raw = adapter
            .request_device(instance.raw(), instance.entry())
            .map_err(crate::error::GfxError::from)?;
        let queue_raw = hal::Queue::new(instance.raw(), &raw).map_err(crate::error::GfxError::from)?;
        let fences = Rc::new(FenceCache::new(raw.supports_timeline_semaphore(), raw.raw())?);
        let graphics_family = raw.queue_families().graphics.unwrap_or(0);
        let frames = (0..FRAMES_IN_FLIGHT)
            .map(|_| FrameSlot::new(raw.raw(), graphics_family))
            .collect::<GfxResult<Vec<_>>>()?;
        let adapter_name = adapter.name();

        Ok(Rc::new_cyclic(|self_weak| Self {
            raw,
            queue_raw,
            instance: instance.clone(),
            fences,
            frames: RefCell::new(frames),
            submitted_frames: RefCell::new(0),
            adapter_name,
            error_callback: RefCell::new(None),
            self_weak: self_weak.clone(),
            queue: Queue::from_weak(self_weak.clone()),
        }))
    }

    /// Upgrades the device's own weak self-reference. Panics only if
    /// called before construction finishes, which cannot happen from
    /// any public entry point.
    fn self_rc(&self) -> Rc<Device> {
        self.self_weak.upgrade().expect("device not fully constructed")
    }

    pub fn adapter_name(&self) -> &str {
        &self.adapter_name
    }

    /// The device's single queue (spec.md §6: "every device exposes a
    /// single queue").
    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub fn instance_raw(&self) -> &ash::Instance {
        self.instance.raw()
    }

    pub fn hal_instance(&self) -> &hal::Instance {
        &self.instance
    }

    pub fn native_queue(&self) -> &hal::Queue {
        &self.queue_raw
    }

    pub fn fences(&self) -> &SharedFenceCache {
        &self.fences
    }

    pub fn set_uncaptured_error_callback(&self, callback: UncapturedErrorCallback) {
        *self.error_callback.borrow_mut() = Some(callback);
    }

    /// Routes a non-fatal error to the uncaptured-error callback
    /// (spec.md §7), returning it unchanged so callers can still
    /// short-circuit with `?` after reporting.
    pub fn report_error(&self, kind: ErrorKind, message: impl Into<String>) {
        if let Some(callback) = self.error_callback.borrow_mut().as_mut() {
            callback(kind, message.into());
        }
    }

    /// Index of the slot currently being entered, `submitted_frames mod N`
    /// (spec.md §4.6).
    pub fn current_frame_index(&self) -> usize {
        (*self.submitted_frames.borrow() as usize) % FRAMES_IN_FLIGHT
    }

    /// Runs the slot-entry algorithm for the current slot (spec.md
    /// §4.6 steps 1-4) and returns it for the caller to record into.
    /// Called by the queue submit engine and by `device_tick`.
    pub fn enter_current_frame_slot(&self) -> GfxResult<()> {
        let index = self.current_frame_index();
        let mut frames = self.frames.borrow_mut();
        frames[index].enter(self.raw.raw(), &self.fences)
    }

    pub fn with_frame_slot<R>(&self, f: impl FnOnce(&mut FrameSlot) -> R) -> R {
        let index = self.current_frame_index();
        let mut frames = self.frames.borrow_mut();
        f(&mut frames[index])
    }

    /// Advances to the next frame slot (spec.md §4.8: "then ticks the
    /// device"). Called once per present, or once per `device_tick`
    /// when nothing was presented this frame.
    pub fn advance_frame(&self) {
        *self.submitted_frames.borrow_mut() += 1;
    }

    /// `device_tick`: polls every in-flight fence without blocking and
    /// fires any completed on-wait-complete callbacks, without
    /// requiring a present to happen (spec.md §6).
    pub fn tick(&self) -> GfxResult<()> {
        for frame in self.frames.borrow().iter() {
            frame.poll(self.raw.raw(), &self.fences)?;
        }
        Ok(())
    }

    /// Waits idle on the device's single native queue (spec.md §5:
    /// "Destroying a device before in-flight work finishes first waits
    /// idle on every queue").
    pub fn wait_idle(&self) -> GfxResult<()> {
        unsafe { self.raw.raw().device_wait_idle() }
            .map_err(|e| crate::error::GfxError::from(hal::HalError::from(e)))
    }

    // Resource-creation surface (spec.md §6). Each method is a thin
    // handoff to the resource module's own constructor, which already
    // takes `&Rc<Device>` — `self_rc()` is what lets these read as
    // ordinary `&self` methods the way `device.create_buffer(...)`
    // reads in the spec.

    pub fn create_buffer(&self, desc: &crate::buffer::BufferDescriptor) -> GfxResult<crate::Handle<crate::buffer::Buffer>> {
        crate::buffer::Buffer::new(&self.self_rc(), desc)
    }

    pub fn create_texture(&self, desc: &crate::texture::TextureDescriptor) -> GfxResult<crate::Handle<crate::texture::Texture>> {
        crate::texture::Texture::new(&self.self_rc(), desc)
    }

    pub fn create_sampler(&self, desc: &crate::sampler::SamplerDescriptor) -> GfxResult<crate::Handle<crate::sampler::Sampler>> {
        crate::sampler::Sampler::new(&self.self_rc(), desc)
    }

    pub fn create_shader_module(
        &self,
        source: Vec<u32>,
        entry_point: impl Into<String>,
    ) -> GfxResult<crate::Handle<crate::shader::ShaderModule>> {
        crate::shader::ShaderModule::new_shared(&self.self_rc(), source, entry_point)
    }

    pub fn create_shader_module_per_stage(
        &self,
        stages: Vec<(types::ShaderStages, Vec<u32>, String)>,
    ) -> GfxResult<crate::Handle<crate::shader::ShaderModule>> {
        crate::shader::ShaderModule::new_per_stage(&self.self_rc(), stages)
    }

    pub fn create_bind_group_layout(
        &self,
        entries: Vec<crate::bind::BindGroupLayoutEntry>,
    ) -> GfxResult<crate::Handle<crate::bind::BindGroupLayout>> {
        crate::bind::BindGroupLayout::new(&self.self_rc(), entries)
    }

    pub fn create_pipeline_layout(
        &self,
        bind_group_layouts: Vec<crate::Handle<crate::bind::BindGroupLayout>>,
    ) -> GfxResult<crate::Handle<crate::bind::PipelineLayout>> {
        crate::bind::PipelineLayout::new(&self.self_rc(), bind_group_layouts)
    }

    pub fn create_bind_group(
        &self,
        layout: crate::Handle<crate::bind::BindGroupLayout>,
        entries: Vec<crate::bind::BindGroupEntry>,
    ) -> GfxResult<crate::Handle<crate::bind::BindGroup>> {
        crate::bind::BindGroup::new(&self.self_rc(), layout, entries)
    }

    pub fn create_render_pipeline(
        &self,
        desc: &crate::pipeline::RenderPipelineDescriptor,
    ) -> GfxResult<crate::Handle<crate::pipeline::RenderPipeline>> {
        crate::pipeline::RenderPipeline::new(&self.self_rc(), desc)
    }

    pub fn create_compute_pipeline(
        &self,
        desc: &crate::pipeline::ComputePipelineDescriptor,
    ) -> GfxResult<crate::Handle<crate::pipeline::ComputePipeline>> {
        crate::pipeline::ComputePipeline::new(&self.self_rc(), desc)
    }

    pub fn create_query_set(&self, ty: types::QueryType, count: u32) -> GfxResult<crate::Handle<crate::query::QuerySet>> {
        crate::query::QuerySet::new(&self.self_rc(), ty, count)
    }

    /// Acquires a primary command buffer from the current frame slot
    /// and wraps it in a fresh [`crate::encoder::CommandEncoder`].
    pub fn create_command_encoder(&self) -> GfxResult<crate::encoder::CommandEncoder> {
        let device = self.self_rc();
        let raw = self.with_frame_slot(|frame| frame.acquire_primary_buffer(self.raw.raw()))?;
        crate::encoder::CommandEncoder::new(&device, raw)
    }

    pub fn create_surface(&self, source: &types::SurfaceSource) -> GfxResult<crate::surface::Surface> {
        crate::surface::Surface::new(&self.self_rc(), source)
    }
}

impl Deref for Device {
    type Target = hal::Device;

    fn deref(&self) -> &Self::Target {
        &self.raw
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        let _ = self.wait_idle();
        let frames = std::mem::take(self.frames.get_mut());
        for frame in frames {
            unsafe { frame.destroy(self.raw.raw()) };
        }
        unsafe { self.queue_raw.destroy(self.raw.raw()) };
        unsafe { self.fences.destroy(self.raw.raw()) };
    }
}

/// A non-owning back-reference to a device, matching spec.md §3's
/// "Adapter holds no backref; most resources hold a weak one."
pub type DeviceRef = Weak<Device>;
