//! Buffer resource (spec.md §3). Owns its native buffer plus either a
//! sub-allocated or imported memory block, and the mapping state
//! machine `{Unmapped, Pending, Mapped}`.

use ash::vk;
use gpu_alloc::MemoryBlock;
use types::{BufferAddress, BufferUsage, MapMode};

use crate::device::Device;
use crate::error::{GfxError, GfxResult};
use crate::fence::FenceId;
use crate::handle::Handle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapState {
    Unmapped,
    Pending,
    Mapped,
}

pub struct BufferDescriptor {
    pub label: Option<String>,
    pub size: BufferAddress,
    pub usage: BufferUsage,
    pub mapped_at_creation: bool,
}

pub struct Buffer {
    pub(crate) raw: vk::Buffer,
    memory: Option<MemoryBlock<vk::DeviceMemory>>,
    pub usage: BufferUsage,
    pub size: BufferAddress,
    map_state: MapState,
    mapped_ptr: Option<std::ptr::NonNull<u8>>,
    /// Counted ref to the most recent submission that wrote to this
    /// buffer's host-visible memory (spec.md §3 Invariant 2). `None`
    /// until the first such submit, or if it was never written after
    /// `mapped_at_creation` (SPEC_FULL.md §2's buffer-map supplement).
    latest_fence: Option<FenceId>,
    device: std::rc::Weak<Device>,
}

impl Buffer {
    pub(crate) fn new(
        device: &std::rc::Rc<Device>,
        desc: &BufferDescriptor,
    ) -> GfxResult<Handle<Self>> {
        // spec.md §7's own example of a Validation error: `MapRead |
        // ~(MapRead|CopyDst)` cannot be honored, and symmetrically for
        // MapWrite/CopySrc.
        if desc.usage.contains(BufferUsage::MAP_READ)
            && !(BufferUsage::MAP_READ | BufferUsage::COPY_DST).contains(desc.usage)
        {
            return Err(GfxError::Validation(
                "MAP_READ usage may only be combined with COPY_DST".into(),
            ));
        }
        if desc.usage.contains(BufferUsage::MAP_WRITE)
            && !(BufferUsage::MAP_WRITE | BufferUsage::COPY_SRC).contains(desc.usage)
        {
            return Err(GfxError::Validation(
                "MAP_WRITE usage may only be combined with COPY_SRC".into(),
            ));
        }

        let create_info = vk::BufferCreateInfo::default()
            .size(desc.size.max(1))
            .usage(hal::conv::map_buffer_usage(desc.usage))
            .sharing_mode(vk::SharingMode::EXCLUSIVE);
        let raw = unsafe { device.raw().create_buffer(&create_info, None) }
            .map_err(|e| GfxError::from(hal::HalError::from(e)))?;

        let mut memory = hal::alloc::alloc_buffer_memory(device, raw, desc.usage)?;

        let mapped_ptr = if desc.mapped_at_creation {
            Some(Self::map_block(device, &mut memory)?)
        } else {
            None
        };

        Ok(Handle::new(Self {
            raw,
            memory: Some(memory),
            usage: desc.usage,
            size: desc.size,
            map_state: if mapped_ptr.is_some() { MapState::Mapped } else { MapState::Unmapped },
            mapped_ptr,
            latest_fence: None,
            device: std::rc::Rc::downgrade(device),
        }))
    }

    fn map_block(
        device: &Device,
        memory: &mut MemoryBlock<vk::DeviceMemory>,
    ) -> GfxResult<std::ptr::NonNull<u8>> {
        let mem_device = gpu_alloc_ash::AshMemoryDevice::wrap(device.raw());
        let ptr = unsafe { memory.map(mem_device, 0, memory.size() as usize) }
            .map_err(|e| GfxError::Internal(format!("{e:?}")))?;
        Ok(ptr)
    }

    pub fn raw(&self) -> vk::Buffer {
        self.raw
    }

    pub fn map_state(&self) -> MapState {
        self.map_state
    }

    pub fn latest_fence(&self) -> Option<FenceId> {
        self.latest_fence
    }

    /// Records the fence of the submission that most recently wrote to
    /// this buffer, releasing the previous one (spec.md §4.7 step 5).
    pub(crate) fn set_latest_fence(&mut self, fence: FenceId) {
        self.latest_fence = Some(fence);
    }

    /// Begins a map. The caller (queue/device layer) is responsible
    /// for having already waited on `latest_fence` per spec.md §3
    /// Invariant 2 before calling this — `mapped_at_creation` buffers
    /// that were never submitted against skip that wait entirely
    /// (SPEC_FULL.md §2).
    pub fn map(&mut self, device: &Device, _mode: MapMode) -> GfxResult<*mut u8> {
        if self.map_state == MapState::Mapped {
            return Ok(self.mapped_ptr.unwrap().as_ptr());
        }
        let memory = self.memory.as_mut().expect("buffer memory freed");
        let ptr = Self::map_block(device, memory)?;
        self.mapped_ptr = Some(ptr);
        self.map_state = MapState::Mapped;
        Ok(ptr.as_ptr())
    }

    pub fn unmap(&mut self, device: &Device) {
        if self.map_state != MapState::Mapped {
            return;
        }
        if let Some(memory) = self.memory.as_mut() {
            let mem_device = gpu_alloc_ash::AshMemoryDevice::wrap(device.raw());
            unsafe { memory.unmap(mem_device) };
        }
        self.mapped_ptr = None;
        self.map_state = MapState::Unmapped;
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        let Some(device) = self.device.upgrade() else { return };
        if self.map_state == MapState::Mapped {
            self.unmap(&device);
        }
        unsafe { device.raw().destroy_buffer(self.raw, None) };
        if let Some(memory) = self.memory.take() {
            hal::alloc::free(&device, memory);
        }
    }
}
