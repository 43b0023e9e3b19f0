//! Logical device: queue creation, the memory sub-allocator, the
//! descriptor-pool allocator, and the renderpass/framebuffer interning
//! caches. Grounded on `wgpu-hal::vulkan::{DeviceShared, Device}`.
//!
//! The render-pass/framebuffer caches are genuinely shared Vulkan-level
//! state (spec.md §4.9: "interns `vk::RenderPass`/`VkFramebuffer`
//! objects keyed by a hashable fingerprint of the attachment
//! description") so, like the teacher, we guard them with
//! `parking_lot::Mutex` rather than the `Rc<RefCell<_>>` used
//! everywhere else above the hal boundary.

use std::ffi::CStr;

use ash::vk;
use gpu_descriptor::{DescriptorSet, DescriptorSetLayoutCreateFlags, DescriptorTotalCount};
use gpu_descriptor_ash::AshDescriptorDevice;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::adapter::{Adapter, QueueFamilies};
use crate::{HalError, HalResult};

/// Fingerprint of a render pass's attachment set, used to intern
/// `vk::RenderPass` objects (spec.md §4.9).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RenderPassKey {
    pub colors: Vec<(vk::Format, vk::AttachmentLoadOp, vk::AttachmentStoreOp)>,
    pub depth_stencil: Option<(vk::Format, vk::AttachmentLoadOp, vk::AttachmentStoreOp)>,
    pub sample_count: u32,
}

/// Fingerprint of a framebuffer's image view set, keyed alongside the
/// render pass it was built for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FramebufferKey {
    pub render_pass: vk::RenderPass,
    pub attachments: Vec<vk::ImageView>,
    pub extent: (u32, u32),
}

pub struct Device {
    pub(crate) raw: ash::Device,
    pub(crate) physical_device: vk::PhysicalDevice,
    pub(crate) queue_families: QueueFamilies,
    pub(crate) raw_queue: vk::Queue,
    pub(crate) mem_allocator: Mutex<gpu_alloc::GpuAllocator<vk::DeviceMemory>>,
    pub(crate) desc_allocator:
        Mutex<gpu_descriptor::DescriptorAllocator<vk::DescriptorPool, vk::DescriptorSet>>,
    render_passes: Mutex<FxHashMap<RenderPassKey, vk::RenderPass>>,
    framebuffers: Mutex<FxHashMap<FramebufferKey, vk::Framebuffer>>,
    supports_timeline_semaphore: bool,
}

impl Device {
    pub(crate) fn new(
        instance: &ash::Instance,
        _entry: &ash::Entry,
        adapter: &Adapter,
    ) -> HalResult<Self> {
        let family_index = adapter
            .queue_families
            .graphics
            .ok_or_else(|| HalError::Allocation("adapter has no graphics queue family".into()))?;

        let queue_priorities = [1.0f32];
        let queue_create_infos = [vk::DeviceQueueCreateInfo::default()
            .queue_family_index(family_index)
            .queue_priorities(&queue_priorities)];

        let mut extensions: Vec<&CStr> = vec![ash::khr::swapchain::NAME];
        let available_extensions =
            unsafe { instance.enumerate_device_extension_properties(adapter.raw) }
                .map_err(HalError::from)?;
        let has_extension = |name: &CStr| {
            available_extensions.iter().any(|e| {
                let ext_name = unsafe { CStr::from_ptr(e.extension_name.as_ptr()) };
                ext_name == name
            })
        };
        let supports_timeline_semaphore = adapter.properties.api_version >= vk::API_VERSION_1_2
            || has_extension(ash::khr::timeline_semaphore::NAME);
        if adapter.properties.api_version < vk::API_VERSION_1_2 && supports_timeline_semaphore {
            extensions.push(ash::khr::timeline_semaphore::NAME);
        }
        let extension_ptrs: Vec<_> = extensions.iter().map(|e| e.as_ptr()).collect();

        let mut features12 =
            vk::PhysicalDeviceVulkan12Features::default().timeline_semaphore(supports_timeline_semaphore);
        let features = vk::PhysicalDeviceFeatures::default();
        let mut create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&extension_ptrs)
            .enabled_features(&features);
        if adapter.properties.api_version >= vk::API_VERSION_1_2 {
            create_info = create_info.push_next(&mut features12);
        }

        let raw = unsafe { instance.create_device(adapter.raw, &create_info, None) }
            .map_err(HalError::from)?;
        let raw_queue = unsafe { raw.get_device_queue(family_index, 0) };

        let mem_properties = adapter.memory_properties;
        let mem_props_for_alloc = unsafe {
            gpu_alloc_ash::device_properties(instance, adapter.properties.api_version, adapter.raw)
        }
        .map_err(|e| HalError::Allocation(format!("{e:?}")))?;
        let mem_allocator = gpu_alloc::GpuAllocator::new(
            gpu_alloc::Config::i_am_prototyping(),
            mem_props_for_alloc,
        );
        let _ = mem_properties;

        let desc_allocator = gpu_descriptor::DescriptorAllocator::new(
            adapter.properties.limits.max_bound_descriptor_sets,
        );

        Ok(Self {
            raw,
            physical_device: adapter.raw,
            queue_families: adapter.queue_families,
            raw_queue,
            mem_allocator: Mutex::new(mem_allocator),
            desc_allocator: Mutex::new(desc_allocator),
            render_passes: Mutex::new(FxHashMap::default()),
            framebuffers: Mutex::new(FxHashMap::default()),
            supports_timeline_semaphore,
        })
    }

    pub fn raw(&self) -> &ash::Device {
        &self.raw
    }

    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    pub fn queue_families(&self) -> QueueFamilies {
        self.queue_families
    }

    pub fn raw_queue(&self) -> vk::Queue {
        self.raw_queue
    }

    pub fn supports_timeline_semaphore(&self) -> bool {
        self.supports_timeline_semaphore
    }

    /// Returns the cached `vk::RenderPass` for this key, creating it
    /// the first time it's requested (spec.md §4.9).
    pub fn render_pass_for(
        &self,
        key: RenderPassKey,
        create: impl FnOnce() -> HalResult<vk::RenderPass>,
    ) -> HalResult<vk::RenderPass> {
        let mut cache = self.render_passes.lock();
        if let Some(pass) = cache.get(&key) {
            return Ok(*pass);
        }
        let pass = create()?;
        cache.insert(key, pass);
        Ok(pass)
    }

    /// Returns the cached `vk::Framebuffer` for this key, creating it
    /// the first time it's requested.
    pub fn framebuffer_for(
        &self,
        key: FramebufferKey,
        create: impl FnOnce() -> HalResult<vk::Framebuffer>,
    ) -> HalResult<vk::Framebuffer> {
        let mut cache = self.framebuffers.lock();
        if let Some(fb) = cache.get(&key) {
            return Ok(*fb);
        }
        let fb = create()?;
        cache.insert(key, fb);
        Ok(fb)
    }

    /// Allocates a single descriptor set of `layout`, drawing from the
    /// pool cache `gpu_descriptor::DescriptorAllocator` maintains
    /// internally (spec.md §4.6's bind-group descriptor-set cache sits
    /// one layer above this and decides whether to call it at all).
    pub fn alloc_descriptor_set(
        &self,
        layout: vk::DescriptorSetLayout,
        counts: &DescriptorTotalCount,
    ) -> HalResult<DescriptorSet<vk::DescriptorSet>> {
        let ash_device = AshDescriptorDevice::wrap(&self.raw);
        let mut sets = unsafe {
            self.desc_allocator.lock().allocate(
                ash_device,
                &layout,
                DescriptorSetLayoutCreateFlags::empty(),
                counts,
                1,
            )
        }
        .map_err(|e| HalError::Allocation(format!("{e:?}")))?;
        Ok(sets.pop().expect("allocate(count=1) returns exactly one set"))
    }

    pub fn free_descriptor_set(&self, set: DescriptorSet<vk::DescriptorSet>) {
        let ash_device = AshDescriptorDevice::wrap(&self.raw);
        unsafe { self.desc_allocator.lock().free(ash_device, Some(set)) };
    }

    /// Drops every interned render pass and framebuffer. Called when a
    /// swapchain is reconfigured, since framebuffers hold onto
    /// swapchain-image views that are about to be destroyed.
    pub fn clear_framebuffer_cache(&self) {
        let mut framebuffers = self.framebuffers.lock();
        for (_, fb) in framebuffers.drain() {
            unsafe { self.raw.destroy_framebuffer(fb, None) };
        }
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        unsafe {
            for (_, pass) in self.render_passes.get_mut().drain() {
                self.raw.destroy_render_pass(pass, None);
            }
            for (_, fb) in self.framebuffers.get_mut().drain() {
                self.raw.destroy_framebuffer(fb, None);
            }
            let _ = self.raw.device_wait_idle();
            self.raw.destroy_device(None);
        }
    }
}
