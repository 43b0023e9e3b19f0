//! RenderPipeline / ComputePipeline (spec.md §3, §4.9). Pipeline
//! creation is a straightforward translation of the WebGPU descriptor
//! with three subtleties: vertex-buffer bindings are assigned
//! contiguously from 0, the viewport is left dynamic (flipped at
//! pass-begin time by the encoder, not baked in here), and creation
//! would switch to a rendering-attachment-format descriptor instead of
//! a renderpass if the backend offered dynamic rendering — it doesn't
//! (`hal::Device` never enables `VK_KHR_dynamic_rendering`), so only
//! the renderpass path is live; the match below stays structured as if
//! it weren't, per spec.md §4.9's "must be polymorphic over it".

use std::rc::{Rc, Weak};

use ash::vk;
use types::{
    BlendState, ColorWrites, CompareFunction, CullMode, FrontFace, IndexFormat, PrimitiveTopology, ShaderStages,
    TextureFormat, VertexFormat, VertexStepMode,
};

use crate::bind::PipelineLayout;
use crate::device::Device;
use crate::error::GfxResult;
use crate::handle::Handle;
use crate::shader::ShaderModule;

pub struct VertexAttribute {
    pub format: VertexFormat,
    pub offset: u64,
    pub shader_location: u32,
}

pub struct VertexBufferLayout {
    pub array_stride: u64,
    pub step_mode: VertexStepMode,
    pub attributes: Vec<VertexAttribute>,
}

pub struct ColorTargetState {
    pub format: TextureFormat,
    pub blend: Option<BlendState>,
    pub write_mask: ColorWrites,
}

pub struct DepthStencilState {
    pub format: TextureFormat,
    pub depth_write_enabled: bool,
    pub depth_compare: CompareFunction,
}

pub struct PrimitiveState {
    pub topology: PrimitiveTopology,
    pub strip_index_format: Option<IndexFormat>,
    pub front_face: FrontFace,
    pub cull_mode: CullMode,
}

pub struct RenderPipelineDescriptor {
    pub label: Option<String>,
    pub layout: Handle<PipelineLayout>,
    pub vertex_module: Handle<ShaderModule>,
    pub vertex_buffers: Vec<VertexBufferLayout>,
    pub primitive: PrimitiveState,
    pub depth_stencil: Option<DepthStencilState>,
    pub sample_count: u32,
    pub fragment_module: Option<Handle<ShaderModule>>,
    pub targets: Vec<ColorTargetState>,
}

pub struct RenderPipeline {
    raw: vk::Pipeline,
    layout: Handle<PipelineLayout>,
    render_pass: vk::RenderPass,
    topology: PrimitiveTopology,
    device: Weak<Device>,
}

impl RenderPipeline {
    pub(crate) fn new(device: &Rc<Device>, desc: &RenderPipelineDescriptor) -> GfxResult<Handle<Self>> {
        // Subtlety (i): vertex-buffer bindings are contiguous from 0.
        let mut bindings = Vec::with_capacity(desc.vertex_buffers.len());
        let mut attributes = Vec::new();
        for (binding, buffer) in desc.vertex_buffers.iter().enumerate() {
            let binding = binding as u32;
            bindings.push(
                vk::VertexInputBindingDescription::default()
                    .binding(binding)
                    .stride(buffer.array_stride as u32)
                    .input_rate(match buffer.step_mode {
                        VertexStepMode::Vertex => vk::VertexInputRate::VERTEX,
                        VertexStepMode::Instance => vk::VertexInputRate::INSTANCE,
                    }),
            );
            for attr in &buffer.attributes {
                attributes.push(
                    vk::VertexInputAttributeDescription::default()
                        .binding(binding)
                        .location(attr.shader_location)
                        .format(hal::conv::map_vertex_format(attr.format))
                        .offset(attr.offset as u32),
                );
            }
        }
        let vertex_input = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&bindings)
            .vertex_attribute_descriptions(&attributes);

        let mut input_assembly = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(hal::conv::map_primitive_topology(desc.primitive.topology));
        if matches!(desc.primitive.topology, PrimitiveTopology::LineStrip | PrimitiveTopology::TriangleStrip) {
            input_assembly = input_assembly.primitive_restart_enable(desc.primitive.strip_index_format.is_some());
        }

        // Subtlety (ii): viewport/scissor stay dynamic; the encoder sets
        // a Y-flipped viewport at pass-begin (spec.md §4.9).
        let viewport_state =
            vk::PipelineViewportStateCreateInfo::default().viewport_count(1).scissor_count(1);
        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state = vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

        let rasterization = vk::PipelineRasterizationStateCreateInfo::default()
            .polygon_mode(vk::PolygonMode::FILL)
            .cull_mode(hal::conv::map_cull_mode(desc.primitive.cull_mode))
            .front_face(hal::conv::map_front_face(desc.primitive.front_face))
            .line_width(1.0);

        let sample_count = vk::SampleCountFlags::from_raw(desc.sample_count.max(1));
        let multisample = vk::PipelineMultisampleStateCreateInfo::default().rasterization_samples(sample_count);

        let depth_stencil = desc.depth_stencil.as_ref().map(|ds| {
            vk::PipelineDepthStencilStateCreateInfo::default()
                .depth_test_enable(true)
                .depth_write_enable(ds.depth_write_enabled)
                .depth_compare_op(hal::conv::map_compare_function(ds.depth_compare))
        });

        let attachments: Vec<vk::PipelineColorBlendAttachmentState> = desc
            .targets
            .iter()
            .map(|target| {
                let mut state = vk::PipelineColorBlendAttachmentState::default()
                    .color_write_mask(map_color_writes(target.write_mask));
                if let Some(blend) = &target.blend {
                    state = state
                        .blend_enable(true)
                        .src_color_blend_factor(hal::conv::map_blend_factor(blend.color.src_factor))
                        .dst_color_blend_factor(hal::conv::map_blend_factor(blend.color.dst_factor))
                        .color_blend_op(hal::conv::map_blend_op(blend.color.operation))
                        .src_alpha_blend_factor(hal::conv::map_blend_factor(blend.alpha.src_factor))
                        .dst_alpha_blend_factor(hal::conv::map_blend_factor(blend.alpha.dst_factor))
                        .alpha_blend_op(hal::conv::map_blend_op(blend.alpha.operation));
                }
                state
            })
            .collect();
        let color_blend = vk::PipelineColorBlendStateCreateInfo::default().attachments(&attachments);

        let color_formats: Vec<vk::Format> =
            desc.targets.iter().map(|t| hal::conv::map_texture_format(t.format)).collect();
        let depth_format = desc.depth_stencil.as_ref().map(|ds| hal::conv::map_texture_format(ds.format));
        let render_pass_key = hal::device::RenderPassKey {
            colors: color_formats
                .iter()
                .map(|f| (*f, vk::AttachmentLoadOp::LOAD, vk::AttachmentStoreOp::STORE))
                .collect(),
            depth_stencil: depth_format.map(|f| (f, vk::AttachmentLoadOp::LOAD, vk::AttachmentStoreOp::STORE)),
            sample_count: desc.sample_count,
        };
        let render_pass =
            device.render_pass_for(render_pass_key, || build_render_pass(device, &color_formats, depth_format, sample_count))?;

        let mut stages = Vec::with_capacity(2);
        let vertex_module_ref = desc.vertex_module.borrow();
        let (vertex_raw, vertex_entry) = vertex_module_ref
            .stage(ShaderStages::VERTEX)
            .expect("render pipeline vertex module has no VERTEX stage");
        let vertex_entry_cstr = std::ffi::CString::new(vertex_entry).expect("entry point is valid UTF-8");
        stages.push(
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::VERTEX)
                .module(vertex_raw)
                .name(&vertex_entry_cstr),
        );
        let fragment_module_ref = desc.fragment_module.as_ref().map(|m| m.borrow());
        let fragment_entry_cstr = fragment_module_ref.as_ref().map(|m| {
            let (_, entry) = m.stage(ShaderStages::FRAGMENT).expect("fragment module has no FRAGMENT stage");
            std::ffi::CString::new(entry).expect("entry point is valid UTF-8")
        });
        if let (Some(module), Some(entry_cstr)) = (&fragment_module_ref, &fragment_entry_cstr) {
            let (fragment_raw, _) = module.stage(ShaderStages::FRAGMENT).expect("checked above");
            stages.push(
                vk::PipelineShaderStageCreateInfo::default()
                    .stage(vk::ShaderStageFlags::FRAGMENT)
                    .module(fragment_raw)
                    .name(entry_cstr),
            );
        }

        let mut create_info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&stages)
            .vertex_input_state(&vertex_input)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization)
            .multisample_state(&multisample)
            .color_blend_state(&color_blend)
            .dynamic_state(&dynamic_state)
            .layout(desc.layout.borrow().raw())
            .render_pass(render_pass)
            .subpass(0);
        if let Some(depth_stencil) = &depth_stencil {
            create_info = create_info.depth_stencil_state(depth_stencil);
        }

        let pipelines = unsafe {
            device.raw().create_graphics_pipelines(vk::PipelineCache::null(), std::slice::from_ref(&create_info), None)
        }
        .map_err(|(_, e)| crate::error::GfxError::from(hal::HalError::from(e)))?;
        let raw = pipelines[0];

        Ok(Handle::new(Self {
            raw,
            layout: desc.layout.clone(),
            render_pass,
            topology: desc.primitive.topology,
            device: Rc::downgrade(device),
        }))
    }

    pub fn raw(&self) -> vk::Pipeline {
        self.raw
    }

    pub fn layout(&self) -> &Handle<PipelineLayout> {
        &self.layout
    }

    pub fn render_pass(&self) -> vk::RenderPass {
        self.render_pass
    }

    pub fn topology(&self) -> PrimitiveTopology {
        self.topology
    }
}

impl Drop for RenderPipeline {
    fn drop(&mut self) {
        let Some(device) = self.device.upgrade() else { return };
        unsafe { device.raw().destroy_pipeline(self.raw, None) };
    }
}

pub struct ComputePipelineDescriptor {
    pub label: Option<String>,
    pub layout: Handle<PipelineLayout>,
    pub module: Handle<ShaderModule>,
}

pub struct ComputePipeline {
    raw: vk::Pipeline,
    layout: Handle<PipelineLayout>,
    device: Weak<Device>,
}

impl ComputePipeline {
    pub(crate) fn new(device: &Rc<Device>, desc: &ComputePipelineDescriptor) -> GfxResult<Handle<Self>> {
        let module_ref = desc.module.borrow();
        let (raw_module, entry) = module_ref
            .stage(ShaderStages::COMPUTE)
            .ok_or_else(|| crate::error::GfxError::Validation("compute pipeline module has no COMPUTE stage".into()))?;
        let entry_cstr = std::ffi::CString::new(entry).expect("entry point is valid UTF-8");
        let stage = vk::PipelineShaderStageCreateInfo::default()
            .stage(vk::ShaderStageFlags::COMPUTE)
            .module(raw_module)
            .name(&entry_cstr);
        let create_info =
            vk::ComputePipelineCreateInfo::default().stage(stage).layout(desc.layout.borrow().raw());

        let pipelines = unsafe {
            device.raw().create_compute_pipelines(vk::PipelineCache::null(), std::slice::from_ref(&create_info), None)
        }
        .map_err(|(_, e)| crate::error::GfxError::from(hal::HalError::from(e)))?;

        Ok(Handle::new(Self { raw: pipelines[0], layout: desc.layout.clone(), device: Rc::downgrade(device) }))
    }

    pub fn raw(&self) -> vk::Pipeline {
        self.raw
    }

    pub fn layout(&self) -> &Handle<PipelineLayout> {
        &self.layout
    }
}

impl Drop for ComputePipeline {
    fn drop(&mut self) {
        let Some(device) = self.device.upgrade() else { return };
        unsafe { device.raw().destroy_pipeline(self.raw, None) };
    }
}

fn map_color_writes(mask: ColorWrites) -> vk::ColorComponentFlags {
    let mut flags = vk::ColorComponentFlags::empty();
    if mask.contains(ColorWrites::RED) {
        flags |= vk::ColorComponentFlags::R;
    }
    if mask.contains(ColorWrites::GREEN) {
        flags |= vk::ColorComponentFlags::G;
    }
    if mask.contains(ColorWrites::BLUE) {
        flags |= vk::ColorComponentFlags::B;
    }
    if mask.contains(ColorWrites::ALPHA) {
        flags |= vk::ColorComponentFlags::A;
    }
    flags
}

fn build_render_pass(
    device: &Rc<Device>,
    color_formats: &[vk::Format],
    depth_format: Option<vk::Format>,
    sample_count: vk::SampleCountFlags,
) -> hal::HalResult<vk::RenderPass> {
    let mut attachments = Vec::with_capacity(color_formats.len() + 1);
    let mut color_refs = Vec::with_capacity(color_formats.len());
    for format in color_formats {
        color_refs.push(
            vk::AttachmentReference::default()
                .attachment(attachments.len() as u32)
                .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL),
        );
        attachments.push(
            vk::AttachmentDescription::default()
                .format(*format)
                .samples(sample_count)
                .load_op(vk::AttachmentLoadOp::LOAD)
                .store_op(vk::AttachmentStoreOp::STORE)
                .initial_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
                .final_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL),
        );
    }
    let depth_ref = depth_format.map(|format| {
        let index = attachments.len() as u32;
        attachments.push(
            vk::AttachmentDescription::default()
                .format(format)
                .samples(sample_count)
                .load_op(vk::AttachmentLoadOp::LOAD)
                .store_op(vk::AttachmentStoreOp::STORE)
                .initial_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
                .final_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL),
        );
        vk::AttachmentReference::default().attachment(index).layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
    });

    let mut subpass = vk::SubpassDescription::default()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(&color_refs);
    if let Some(depth_ref) = &depth_ref {
        subpass = subpass.depth_stencil_attachment(depth_ref);
    }

    let create_info = vk::RenderPassCreateInfo::default()
        .attachments(&attachments)
        .subpasses(std::slice::from_ref(&subpass));
    unsafe { device.raw().create_render_pass(&create_info, None) }.map_err(hal::HalError::from)
}
