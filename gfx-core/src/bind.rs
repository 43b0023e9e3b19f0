//! BindGroupLayout / PipelineLayout / BindGroup (spec.md §3).

use std::rc::{Rc, Weak};

use ash::vk;
use gpu_descriptor::{DescriptorSet, DescriptorTotalCount};
use types::{BindingType, ShaderStages};

use crate::buffer::Buffer;
use crate::device::Device;
use crate::error::GfxResult;
use crate::handle::Handle;
use crate::sampler::Sampler;
use crate::texture::TextureView;
use crate::tracker::ResourceTracker;

pub struct BindGroupLayoutEntry {
    pub binding: u32,
    pub visibility: ShaderStages,
    pub ty: BindingType,
    pub count: u32,
}

pub struct BindGroupLayout {
    raw: vk::DescriptorSetLayout,
    entries: Vec<BindGroupLayoutEntry>,
    device: Weak<Device>,
}

impl BindGroupLayout {
    pub(crate) fn new(device: &Rc<Device>, entries: Vec<BindGroupLayoutEntry>) -> GfxResult<Handle<Self>> {
        let bindings: Vec<vk::DescriptorSetLayoutBinding> = entries
            .iter()
            .map(|entry| {
                vk::DescriptorSetLayoutBinding::default()
                    .binding(entry.binding)
                    .descriptor_type(map_descriptor_type(entry.ty))
                    .descriptor_count(entry.count.max(1))
                    .stage_flags(map_shader_stages(entry.visibility))
            })
            .collect();
        let create_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);
        let raw = unsafe { device.raw().create_descriptor_set_layout(&create_info, None) }
            .map_err(|e| crate::error::GfxError::from(hal::HalError::from(e)))?;
        Ok(Handle::new(Self { raw, entries, device: Rc::downgrade(device) }))
    }

    pub fn raw(&self) -> vk::DescriptorSetLayout {
        self.raw
    }

    pub fn entries(&self) -> &[BindGroupLayoutEntry] {
        &self.entries
    }

    /// Total descriptor counts by type, as `gpu_descriptor` needs them
    /// to draw a set from its internal pool cache.
    pub(crate) fn descriptor_counts(&self) -> DescriptorTotalCount {
        let mut counts = DescriptorTotalCount::default();
        for entry in &self.entries {
            let n = entry.count.max(1);
            match entry.ty {
                BindingType::UniformBuffer { dynamic_offset: false } => counts.uniform_buffer += n,
                BindingType::UniformBuffer { dynamic_offset: true } => counts.uniform_buffer_dynamic += n,
                BindingType::StorageBuffer { dynamic_offset: false, .. } => counts.storage_buffer += n,
                BindingType::StorageBuffer { dynamic_offset: true, .. } => counts.storage_buffer_dynamic += n,
                BindingType::Sampler => counts.sampler += n,
                BindingType::SampledTexture => counts.sampled_image += n,
                BindingType::StorageTexture { .. } => counts.storage_image += n,
            }
        }
        counts
    }
}

impl Drop for BindGroupLayout {
    fn drop(&mut self) {
        let Some(device) = self.device.upgrade() else { return };
        unsafe { device.raw().destroy_descriptor_set_layout(self.raw, None) };
    }
}

pub struct PipelineLayout {
    raw: vk::PipelineLayout,
    bind_group_layouts: Vec<Handle<BindGroupLayout>>,
    device: Weak<Device>,
}

impl PipelineLayout {
    pub(crate) fn new(device: &Rc<Device>, bind_group_layouts: Vec<Handle<BindGroupLayout>>) -> GfxResult<Handle<Self>> {
        let raw_layouts: Vec<vk::DescriptorSetLayout> =
            bind_group_layouts.iter().map(|l| l.borrow().raw()).collect();
        let create_info = vk::PipelineLayoutCreateInfo::default().set_layouts(&raw_layouts);
        let raw = unsafe { device.raw().create_pipeline_layout(&create_info, None) }
            .map_err(|e| crate::error::GfxError::from(hal::HalError::from(e)))?;
        Ok(Handle::new(Self { raw, bind_group_layouts, device: Rc::downgrade(device) }))
    }

    pub fn raw(&self) -> vk::PipelineLayout {
        self.raw
    }

    pub fn bind_group_layouts(&self) -> &[Handle<BindGroupLayout>] {
        &self.bind_group_layouts
    }
}

impl Drop for PipelineLayout {
    fn drop(&mut self) {
        let Some(device) = self.device.upgrade() else { return };
        unsafe { device.raw().destroy_pipeline_layout(self.raw, None) };
    }
}

/// One resource bound at a particular binding index.
pub enum BindingResource {
    Buffer { buffer: Handle<Buffer>, offset: u64, size: u64 },
    Sampler(Handle<Sampler>),
    TextureView(Handle<TextureView>),
}

pub struct BindGroupEntry {
    pub binding: u32,
    pub resource: BindingResource,
}

/// References a bind-group-layout + an array of resource bindings; owns
/// a descriptor pool/set acquired from the per-frame descriptor-set
/// cache; owns a resource-usage set naming every resource it
/// references (spec.md §3).
pub struct BindGroup {
    layout: Handle<BindGroupLayout>,
    entries: Vec<BindGroupEntry>,
    set: Option<DescriptorSet<vk::DescriptorSet>>,
    /// Invariant 1: membership here is what keeps every bound resource
    /// alive for as long as this bind group is.
    usage: ResourceTracker<Buffer, crate::texture::Texture>,
    device: Weak<Device>,
}

impl BindGroup {
    pub(crate) fn new(
        device: &Rc<Device>,
        layout: Handle<BindGroupLayout>,
        entries: Vec<BindGroupEntry>,
    ) -> GfxResult<Handle<Self>> {
        let counts = layout.borrow().descriptor_counts();
        let set = device
            .alloc_descriptor_set(layout.borrow().raw(), &counts)
            .map_err(crate::error::GfxError::from)?;

        let mut usage = ResourceTracker::new();
        let mut writes = Vec::with_capacity(entries.len());
        let mut buffer_infos = Vec::with_capacity(entries.len());
        let mut image_infos = Vec::with_capacity(entries.len());
        for entry in &entries {
            match &entry.resource {
                BindingResource::Buffer { buffer, offset, size } => {
                    usage.track_ref(buffer);
                    buffer_infos.push((
                        entry.binding,
                        vk::DescriptorBufferInfo::default()
                            .buffer(buffer.borrow().raw())
                            .offset(*offset)
                            .range(*size),
                    ));
                }
                BindingResource::Sampler(sampler) => {
                    usage.track_ref(sampler);
                    image_infos.push((
                        entry.binding,
                        vk::DescriptorImageInfo::default().sampler(sampler.borrow().raw()),
                        vk::DescriptorType::SAMPLER,
                    ));
                }
                BindingResource::TextureView(view) => {
                    usage.track_ref(view);
                    usage.track_ref(view.borrow().texture());
                    image_infos.push((
                        entry.binding,
                        vk::DescriptorImageInfo::default()
                            .image_view(view.borrow().raw())
                            .image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL),
                        vk::DescriptorType::SAMPLED_IMAGE,
                    ));
                }
            }
        }
        for (binding, info) in &buffer_infos {
            writes.push(
                vk::WriteDescriptorSet::default()
                    .dst_set(*set.raw())
                    .dst_binding(*binding)
                    .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                    .buffer_info(std::slice::from_ref(info)),
            );
        }
        for (binding, info, ty) in &image_infos {
            writes.push(
                vk::WriteDescriptorSet::default()
                    .dst_set(*set.raw())
                    .dst_binding(*binding)
                    .descriptor_type(*ty)
                    .image_info(std::slice::from_ref(info)),
            );
        }
        unsafe { device.raw().update_descriptor_sets(&writes, &[]) };

        Ok(Handle::new(Self { layout, entries, set: Some(set), usage, device: Rc::downgrade(device) }))
    }

    pub fn raw_set(&self) -> vk::DescriptorSet {
        *self.set.as_ref().expect("descriptor set released on drop").raw()
    }

    pub fn layout(&self) -> &Handle<BindGroupLayout> {
        &self.layout
    }

    pub fn entries(&self) -> &[BindGroupEntry] {
        &self.entries
    }

    pub fn usage(&self) -> &ResourceTracker<Buffer, crate::texture::Texture> {
        &self.usage
    }
}

impl Drop for BindGroup {
    fn drop(&mut self) {
        let Some(device) = self.device.upgrade() else { return };
        if let Some(set) = self.set.take() {
            device.free_descriptor_set(set);
        }
    }
}

fn map_descriptor_type(ty: BindingType) -> vk::DescriptorType {
    match ty {
        BindingType::UniformBuffer { dynamic_offset: false } => vk::DescriptorType::UNIFORM_BUFFER,
        BindingType::UniformBuffer { dynamic_offset: true } => vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC,
        BindingType::StorageBuffer { dynamic_offset: false, .. } => vk::DescriptorType::STORAGE_BUFFER,
        BindingType::StorageBuffer { dynamic_offset: true, .. } => vk::DescriptorType::STORAGE_BUFFER_DYNAMIC,
        BindingType::Sampler => vk::DescriptorType::SAMPLER,
        BindingType::SampledTexture => vk::DescriptorType::SAMPLED_IMAGE,
        BindingType::StorageTexture { .. } => vk::DescriptorType::STORAGE_IMAGE,
    }
}

fn map_shader_stages(stages: ShaderStages) -> vk::ShaderStageFlags {
    let mut flags = vk::ShaderStageFlags::empty();
    if stages.contains(ShaderStages::VERTEX) {
        flags |= vk::ShaderStageFlags::VERTEX;
    }
    if stages.contains(ShaderStages::FRAGMENT) {
        flags |= vk::ShaderStageFlags::FRAGMENT;
    }
    if stages.contains(ShaderStages::COMPUTE) {
        flags |= vk::ShaderStageFlags::COMPUTE;
    }
    flags
}
