//! Texture and TextureView resources (spec.md §3). A texture caches its
//! own cached current layout (Invariant 3: updated at queue-submit time
//! only, never during recording) and owns a per-texture view cache
//! keyed by view descriptor (Invariant 7: same descriptor twice returns
//! the same cached view).

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use ash::vk;
use rustc_hash::FxHashMap;
use types::{Extent3d, SubresourceRange, TextureDimension, TextureFormat, TextureLayout, TextureUsage, TextureViewDimension};

use crate::device::Device;
use crate::error::GfxResult;
use crate::handle::{Handle, WeakHandle};

pub struct TextureDescriptor {
    pub label: Option<String>,
    pub size: Extent3d,
    pub mip_level_count: u32,
    pub sample_count: u32,
    pub dimension: TextureDimension,
    pub format: TextureFormat,
    pub usage: TextureUsage,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextureViewDescriptor {
    pub format: TextureFormat,
    pub dimension: TextureViewDimension,
    pub range: SubresourceRange,
}

/// Shared between `TextureView` creation and copy commands, both of
/// which need a subresource's aspect mask derived from its format.
pub(crate) fn aspect_mask_for_format(format: TextureFormat) -> vk::ImageAspectFlags {
    if format.is_depth_stencil() {
        let mut mask = vk::ImageAspectFlags::DEPTH;
        if format.has_stencil() {
            mask |= vk::ImageAspectFlags::STENCIL;
        }
        mask
    } else {
        vk::ImageAspectFlags::COLOR
    }
}

pub struct Texture {
    pub(crate) raw: vk::Image,
    memory: hal::TextureMemory,
    pub format: TextureFormat,
    pub size: Extent3d,
    pub mip_level_count: u32,
    pub sample_count: u32,
    pub usage: TextureUsage,
    /// Invariant 3: written only by the queue submit engine.
    current_layout: RefCell<TextureLayout>,
    view_cache: RefCell<FxHashMap<TextureViewDescriptor, WeakHandle<TextureView>>>,
    device: Weak<Device>,
}

impl Texture {
    pub(crate) fn new(device: &Rc<Device>, desc: &TextureDescriptor) -> GfxResult<Handle<Self>> {
        let create_info = vk::ImageCreateInfo::default()
            .image_type(match desc.dimension {
                TextureDimension::D1 => vk::ImageType::TYPE_1D,
                TextureDimension::D2 => vk::ImageType::TYPE_2D,
                TextureDimension::D3 => vk::ImageType::TYPE_3D,
            })
            .format(hal::conv::map_texture_format(desc.format))
            .extent(vk::Extent3D {
                width: desc.size.width,
                height: desc.size.height,
                depth: if desc.dimension == TextureDimension::D3 { desc.size.depth_or_array_layers } else { 1 },
            })
            .mip_levels(desc.mip_level_count)
            .array_layers(1)
            .samples(
                vk::SampleCountFlags::from_raw(desc.sample_count.max(1)),
            )
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(hal::conv::map_texture_usage(desc.usage))
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        let raw = unsafe { device.raw().create_image(&create_info, None) }
            .map_err(|e| crate::error::GfxError::from(hal::HalError::from(e)))?;
        let memory = hal::alloc::alloc_image_memory(device, raw)
            .map_err(crate::error::GfxError::from)?;

        Ok(Handle::new(Self {
            raw,
            memory,
            format: desc.format,
            size: desc.size,
            mip_level_count: desc.mip_level_count,
            sample_count: desc.sample_count,
            usage: desc.usage,
            current_layout: RefCell::new(TextureLayout::Undefined),
            view_cache: RefCell::new(FxHashMap::default()),
            device: Rc::downgrade(device),
        }))
    }

    /// Wraps a swapchain-owned image that this texture does not destroy
    /// (spec.md §4.8: "records every image as a Texture").
    pub(crate) fn from_swapchain_image(
        device: &Rc<Device>,
        raw: vk::Image,
        format: TextureFormat,
        size: Extent3d,
    ) -> Handle<Self> {
        Handle::new(Self {
            raw,
            memory: hal::TextureMemory::NotOwned,
            format,
            size,
            mip_level_count: 1,
            sample_count: 1,
            usage: TextureUsage::RENDER_ATTACHMENT,
            current_layout: RefCell::new(TextureLayout::Undefined),
            view_cache: RefCell::new(FxHashMap::default()),
            device: Rc::downgrade(device),
        })
    }

    pub fn raw(&self) -> vk::Image {
        self.raw
    }

    pub fn current_layout(&self) -> TextureLayout {
        *self.current_layout.borrow()
    }

    /// Called only by the queue submit engine (Invariant 3).
    pub(crate) fn set_current_layout(&self, layout: TextureLayout) {
        *self.current_layout.borrow_mut() = layout;
    }

    /// Returns the cached view for `desc` if one is still alive,
    /// otherwise creates and caches a new one (Invariant 7).
    pub fn create_view(handle: &Handle<Self>, desc: TextureViewDescriptor) -> GfxResult<Handle<TextureView>> {
        let texture = handle.borrow();
        if let Some(cached) = texture.view_cache.borrow().get(&desc).and_then(WeakHandle::upgrade) {
            return Ok(cached);
        }
        let device = texture.device.upgrade().expect("texture outlived its device");
        let view = TextureView::new(&device, handle, &desc)?;
        texture.view_cache.borrow_mut().insert(desc, view.downgrade());
        Ok(view)
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        let Some(device) = self.device.upgrade() else { return };
        unsafe { device.raw().destroy_image(self.raw, None) };
        if let hal::TextureMemory::Suballocated(block) = std::mem::replace(&mut self.memory, hal::TextureMemory::NotOwned) {
            hal::alloc::free(&device, block);
        }
    }
}

pub struct TextureView {
    raw: vk::ImageView,
    texture: Handle<Texture>,
    device: Weak<Device>,
}

impl TextureView {
    fn new(device: &Rc<Device>, texture: &Handle<Texture>, desc: &TextureViewDescriptor) -> GfxResult<Handle<Self>> {
        let view_type = match desc.dimension {
            TextureViewDimension::D1 => vk::ImageViewType::TYPE_1D,
            TextureViewDimension::D2 => vk::ImageViewType::TYPE_2D,
            TextureViewDimension::D2Array => vk::ImageViewType::TYPE_2D_ARRAY,
            TextureViewDimension::Cube => vk::ImageViewType::CUBE,
            TextureViewDimension::CubeArray => vk::ImageViewType::CUBE_ARRAY,
            TextureViewDimension::D3 => vk::ImageViewType::TYPE_3D,
        };
        let aspect_mask = aspect_mask_for_format(desc.format);
        let subresource_range = vk::ImageSubresourceRange::default()
            .aspect_mask(aspect_mask)
            .base_mip_level(desc.range.base_mip_level)
            .level_count(desc.range.mip_level_count.map_or(vk::REMAINING_MIP_LEVELS, |c| c.get()))
            .base_array_layer(desc.range.base_array_layer)
            .layer_count(desc.range.array_layer_count.map_or(vk::REMAINING_ARRAY_LAYERS, |c| c.get()));

        let create_info = vk::ImageViewCreateInfo::default()
            .image(texture.borrow().raw())
            .view_type(view_type)
            .format(hal::conv::map_texture_format(desc.format))
            .subresource_range(subresource_range);

        let raw = unsafe { device.raw().create_image_view(&create_info, None) }
            .map_err(|e| crate::error::GfxError::from(hal::HalError::from(e)))?;

        Ok(Handle::new(Self { raw, texture: texture.clone(), device: Rc::downgrade(device) }))
    }

    pub fn raw(&self) -> vk::ImageView {
        self.raw
    }

    pub fn texture(&self) -> &Handle<Texture> {
        &self.texture
    }
}

impl Drop for TextureView {
    fn drop(&mut self) {
        let Some(device) = self.device.upgrade() else { return };
        unsafe { device.raw().destroy_image_view(self.raw, None) };
    }
}
