//! CommandEncoder / CommandBuffer (spec.md §3, §4.4). An encoder owns
//! an open native command buffer and a resource-usage tracker; pass
//! encoders buffer typed records and are only translated into real
//! `vkCmd*` calls when the pass ends, at which point barriers are
//! synthesized from the pass's own bind-group/attachment touches and
//! recorded immediately before the pass body.

use std::rc::Rc;

use ash::vk;
use types::{AccessFlags, BindingType, Color, LoadOp, PipelineStages, ShaderStages, StoreOp, TextureLayout};

use crate::bind::BindingResource;
use crate::buffer::Buffer;
use crate::commands::{
    ComputePassDescriptor, ComputePassEncoder, RenderCommand, RenderPassDescriptor, RenderPassEncoder,
};
use crate::device::Device;
use crate::error::GfxResult;
use crate::handle::Handle;
use crate::texture::Texture;
use crate::tracker::{BufferSnapshot, ResourceTracker, TextureSnapshot};

pub struct CommandEncoder {
    device: Rc<Device>,
    raw: vk::CommandBuffer,
    tracker: ResourceTracker<Buffer, Texture>,
    encoded_commands: u32,
}

impl CommandEncoder {
    pub(crate) fn new(device: &Rc<Device>, raw: vk::CommandBuffer) -> GfxResult<Self> {
        let begin_info = vk::CommandBufferBeginInfo::default().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        unsafe { device.raw().begin_command_buffer(raw, &begin_info) }
            .map_err(|e| crate::error::GfxError::from(hal::HalError::from(e)))?;
        Ok(Self { device: device.clone(), raw, tracker: ResourceTracker::new(), encoded_commands: 0 })
    }

    /// True if nothing has been recorded yet: no finished pass and no
    /// tracked resource touches. Used by the queue submit engine to
    /// decide whether the presubmit encoder is worth including in a
    /// submit (spec.md §4.7 step 1).
    pub(crate) fn is_empty(&self) -> bool {
        self.encoded_commands == 0 && self.tracker.is_empty()
    }

    pub fn begin_render_pass(&self, desc: RenderPassDescriptor) -> RenderPassEncoder {
        RenderPassEncoder::new(desc)
    }

    pub fn begin_compute_pass(&self, desc: ComputePassDescriptor) -> ComputePassEncoder {
        ComputePassEncoder::new(desc)
    }

    /// Ends a render pass encoder: synthesizes the pre-pass barrier from
    /// every bind-group/attachment resource it touched, records the
    /// native begin/end-rendering commands, then replays every buffered
    /// command in order (spec.md §4.4 a-d).
    pub fn end_render_pass(&mut self, pass: RenderPassEncoder) -> GfxResult<()> {
        let RenderPassDescriptor { color_attachments, depth_stencil_attachment, .. } = &pass.begin_info;

        // (a)+(b): bind-group touches already ran through track_and_emit_*
        // as each SetBindGroup record is pre-scanned below, emitting the
        // barrier into this encoder's own buffer immediately.
        for command in &pass.commands {
            if let RenderCommand::SetBindGroup { bind_group, .. } = command {
                self.track_bind_group(bind_group);
            }
        }

        // (c): attachments transition to their working layout before the
        // pass body begins; colour attachment 0's extent seeds the
        // default viewport/scissor if the caller never sets one.
        let mut default_extent = None;
        for attachment in color_attachments.iter().flatten() {
            let texture = attachment.view.borrow().texture().clone();
            self.transition_texture(&texture, TextureLayout::ColorAttachmentOptimal, PipelineStages::COLOR_ATTACHMENT_OUTPUT, AccessFlags::COLOR_ATTACHMENT_WRITE);
            if default_extent.is_none() {
                default_extent = Some(texture.borrow().size);
            }
        }
        if let Some(depth) = depth_stencil_attachment {
            let texture = depth.view.borrow().texture().clone();
            self.transition_texture(
                &texture,
                TextureLayout::DepthStencilAttachmentOptimal,
                PipelineStages::EARLY_FRAGMENT_TESTS,
                AccessFlags::DEPTH_STENCIL_WRITE,
            );
        }

        self.begin_rendering(&pass, default_extent)?;
        let mut state = ReplayState::new(vk::PipelineBindPoint::GRAPHICS);
        for command in &pass.commands {
            self.replay_render_command(command, default_extent, &mut state)?;
        }
        unsafe { self.device.raw().cmd_end_rendering(self.raw) };

        self.encoded_commands += pass.commands.len() as u32;
        Ok(())
    }

    fn begin_rendering(&self, pass: &RenderPassEncoder, default_extent: Option<types::Extent3d>) -> GfxResult<()> {
        let extent = default_extent.unwrap_or(types::Extent3d { width: 1, height: 1, depth_or_array_layers: 1 });
        let color_infos: Vec<vk::RenderingAttachmentInfo> = pass
            .begin_info
            .color_attachments
            .iter()
            .flatten()
            .map(|attachment| {
                let (load_op, clear_value) = match attachment.load {
                    LoadOp::Load => (vk::AttachmentLoadOp::LOAD, vk::ClearValue::default()),
                    LoadOp::Clear => (vk::AttachmentLoadOp::CLEAR, clear_color_value(attachment.clear_color)),
                };
                vk::RenderingAttachmentInfo::default()
                    .image_view(attachment.view.borrow().raw())
                    .image_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
                    .load_op(load_op)
                    .store_op(match attachment.store {
                        StoreOp::Store => vk::AttachmentStoreOp::STORE,
                        StoreOp::Discard => vk::AttachmentStoreOp::DONT_CARE,
                    })
                    .clear_value(clear_value)
            })
            .collect();
        let depth_info = pass.begin_info.depth_stencil_attachment.as_ref().map(|depth| {
            let (load_op, clear_value) = match depth.depth_load {
                LoadOp::Load => (vk::AttachmentLoadOp::LOAD, vk::ClearValue::default()),
                LoadOp::Clear => (
                    vk::AttachmentLoadOp::CLEAR,
                    vk::ClearValue { depth_stencil: vk::ClearDepthStencilValue { depth: depth.depth_clear, stencil: 0 } },
                ),
            };
            vk::RenderingAttachmentInfo::default()
                .image_view(depth.view.borrow().raw())
                .image_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
                .load_op(load_op)
                .store_op(match depth.depth_store {
                    StoreOp::Store => vk::AttachmentStoreOp::STORE,
                    StoreOp::Discard => vk::AttachmentStoreOp::DONT_CARE,
                })
                .clear_value(clear_value)
        });

        let mut rendering_info = vk::RenderingInfo::default()
            .render_area(vk::Rect2D { offset: vk::Offset2D::default(), extent: vk::Extent2D { width: extent.width, height: extent.height } })
            .layer_count(1)
            .color_attachments(&color_infos);
        if let Some(depth_info) = &depth_info {
            rendering_info = rendering_info.depth_attachment(depth_info);
        }
        unsafe { self.device.raw().cmd_begin_rendering(self.raw, &rendering_info) };

        let default_viewport = vk::Viewport {
            x: 0.0,
            y: extent.height as f32,
            width: extent.width as f32,
            height: -(extent.height as f32),
            min_depth: 0.0,
            max_depth: 1.0,
        };
        unsafe { self.device.raw().cmd_set_viewport(self.raw, 0, &[default_viewport]) };
        let default_scissor = vk::Rect2D { offset: vk::Offset2D::default(), extent: vk::Extent2D { width: extent.width, height: extent.height } };
        unsafe { self.device.raw().cmd_set_scissor(self.raw, 0, &[default_scissor]) };
        Ok(())
    }

    fn replay_render_command(
        &mut self,
        command: &RenderCommand,
        default_extent: Option<types::Extent3d>,
        state: &mut ReplayState,
    ) -> GfxResult<()> {
        let raw = self.raw;
        let device = self.device.raw();
        match command {
            RenderCommand::SetPipeline(pipeline) => unsafe {
                state.bind_point = vk::PipelineBindPoint::GRAPHICS;
                state.pipeline_layout = pipeline.borrow().layout().borrow().raw();
                device.cmd_bind_pipeline(raw, vk::PipelineBindPoint::GRAPHICS, pipeline.borrow().raw());
            },
            RenderCommand::SetBindGroup { index, bind_group, dynamic_offsets } => unsafe {
                device.cmd_bind_descriptor_sets(
                    raw,
                    state.bind_point,
                    state.pipeline_layout,
                    *index,
                    &[bind_group.borrow().raw_set()],
                    dynamic_offsets,
                );
            },
            RenderCommand::SetVertexBuffer { slot, buffer, offset } => unsafe {
                device.cmd_bind_vertex_buffers(raw, *slot, &[buffer.borrow().raw()], &[*offset]);
            },
            RenderCommand::SetIndexBuffer { buffer, format, offset } => unsafe {
                device.cmd_bind_index_buffer(raw, buffer.borrow().raw(), *offset, hal::conv::map_index_type(*format));
            },
            RenderCommand::Draw { vertices, instances } => unsafe {
                device.cmd_draw(raw, vertices.len() as u32, instances.len() as u32, vertices.start, instances.start);
            },
            RenderCommand::DrawIndexed { indices, base_vertex, instances } => unsafe {
                device.cmd_draw_indexed(raw, indices.len() as u32, instances.len() as u32, indices.start, *base_vertex, instances.start);
            },
            RenderCommand::DrawIndirect { buffer, args } => unsafe {
                device.cmd_draw_indirect(raw, buffer.borrow().raw(), args.buffer_offset, 1, 0);
            },
            RenderCommand::DrawIndexedIndirect { buffer, args } => unsafe {
                device.cmd_draw_indexed_indirect(raw, buffer.borrow().raw(), args.buffer_offset, 1, 0);
            },
            RenderCommand::MultiDrawIndirect { buffer, args, count } => unsafe {
                device.cmd_draw_indirect(raw, buffer.borrow().raw(), args.buffer_offset, *count, std::mem::size_of::<[u32; 4]>() as u32);
            },
            RenderCommand::MultiDrawIndexedIndirect { buffer, args, count } => unsafe {
                device.cmd_draw_indexed_indirect(raw, buffer.borrow().raw(), args.buffer_offset, *count, std::mem::size_of::<[u32; 5]>() as u32);
            },
            RenderCommand::SetViewport(v) => unsafe {
                // Y-flip: screen space is y-down, clip space is y-up
                // (spec.md §4.9 subtlety ii).
                device.cmd_set_viewport(
                    raw,
                    0,
                    &[vk::Viewport { x: v.x, y: v.y + v.height, width: v.width, height: -v.height, min_depth: v.min_depth, max_depth: v.max_depth }],
                );
            },
            RenderCommand::SetScissorRect(s) => unsafe {
                device.cmd_set_scissor(
                    raw,
                    0,
                    &[vk::Rect2D { offset: vk::Offset2D { x: s.x, y: s.y }, extent: vk::Extent2D { width: s.width, height: s.height } }],
                );
            },
            RenderCommand::SetBlendConstant(c) => unsafe {
                device.cmd_set_blend_constants(raw, &[c.r as f32, c.g as f32, c.b as f32, c.a as f32]);
            },
            RenderCommand::BeginOcclusionQuery { query_set, query_index } => unsafe {
                device.cmd_begin_query(raw, query_set.borrow().raw(), *query_index, vk::QueryControlFlags::empty());
            },
            RenderCommand::EndOcclusionQuery { query_set, query_index } => unsafe {
                device.cmd_end_query(raw, query_set.borrow().raw(), *query_index);
            },
            RenderCommand::InsertDebugMarker(_) => {
                // no VK_EXT_debug_marker/debug_utils command-buffer
                // labelling extension is enabled on this device.
            }
            RenderCommand::ExecuteRenderBundle(bundle) => {
                for nested in bundle.borrow().commands() {
                    self.replay_render_command(nested, default_extent, state)?;
                }
            }
            RenderCommand::SetComputePipeline(pipeline) => unsafe {
                state.bind_point = vk::PipelineBindPoint::COMPUTE;
                state.pipeline_layout = pipeline.borrow().layout().borrow().raw();
                device.cmd_bind_pipeline(raw, vk::PipelineBindPoint::COMPUTE, pipeline.borrow().raw());
            },
            RenderCommand::DispatchWorkgroups { x, y, z } => unsafe {
                device.cmd_dispatch(raw, *x, *y, *z);
            },
            RenderCommand::DispatchWorkgroupsIndirect { buffer, args } => unsafe {
                device.cmd_dispatch_indirect(raw, buffer.borrow().raw(), args.buffer_offset);
            },
        }
        Ok(())
    }

    pub fn end_compute_pass(&mut self, pass: crate::commands::ComputePassEncoder) -> GfxResult<()> {
        for command in &pass.commands {
            if let RenderCommand::SetBindGroup { bind_group, .. } = command {
                self.track_bind_group(bind_group);
            }
        }
        let mut state = ReplayState::new(vk::PipelineBindPoint::COMPUTE);
        for command in &pass.commands {
            self.replay_render_command(command, None, &mut state)?;
        }
        self.encoded_commands += pass.commands.len() as u32;
        Ok(())
    }

    fn track_bind_group(&mut self, bind_group: &Handle<crate::bind::BindGroup>) {
        let group = bind_group.borrow();
        self.tracker.track_ref(bind_group);
        self.tracker.track_ref(group.layout());
        let layout = group.layout().borrow();
        for entry in group.entries() {
            let layout_entry = layout.entries().iter().find(|e| e.binding == entry.binding);
            match &entry.resource {
                BindingResource::Buffer { buffer, .. } => {
                    let (stage, access) = layout_entry
                        .map(|e| buffer_stage_access(e.visibility, e.ty))
                        .unwrap_or((PipelineStages::VERTEX_SHADER | PipelineStages::FRAGMENT_SHADER, AccessFlags::SHADER_READ));
                    self.track_buffer_access(buffer, BufferSnapshot { stage, access });
                }
                BindingResource::Sampler(sampler) => self.tracker.track_ref(sampler),
                BindingResource::TextureView(view) => {
                    let texture = view.borrow().texture().clone();
                    self.tracker.track_ref(view);
                    let stage =
                        layout_entry.map(|e| pipeline_stages_for_shader_stages(e.visibility)).unwrap_or(PipelineStages::FRAGMENT_SHADER);
                    self.transition_texture(&texture, TextureLayout::ShaderReadOnlyOptimal, stage, AccessFlags::SHADER_READ);
                }
            }
        }
    }

    pub(crate) fn transition_texture(&mut self, texture: &Handle<Texture>, layout: TextureLayout, stage: PipelineStages, access: AccessFlags) {
        let barrier = self.tracker.track_and_emit_texture(
            texture,
            TextureSnapshot { stage, access, layout, subresource: types::SubresourceRange::default() },
        );
        if let Some(barrier) = barrier {
            let image_barrier = vk::ImageMemoryBarrier::default()
                .src_access_mask(hal::conv::map_access_flags(barrier.src_access))
                .dst_access_mask(hal::conv::map_access_flags(barrier.dst_access))
                .old_layout(hal::conv::map_image_layout(barrier.old_layout))
                .new_layout(hal::conv::map_image_layout(barrier.new_layout))
                .image(texture.borrow().raw())
                .subresource_range(vk::ImageSubresourceRange {
                    aspect_mask: crate::texture::aspect_mask_for_format(texture.borrow().format),
                    base_mip_level: 0,
                    level_count: vk::REMAINING_MIP_LEVELS,
                    base_array_layer: 0,
                    layer_count: vk::REMAINING_ARRAY_LAYERS,
                });
            unsafe {
                self.device.raw().cmd_pipeline_barrier(
                    self.raw,
                    hal::conv::map_pipeline_stages(barrier.src_stage),
                    hal::conv::map_pipeline_stages(barrier.dst_stage),
                    vk::DependencyFlags::empty(),
                    &[],
                    &[],
                    &[image_barrier],
                )
            };
        }
        texture.borrow().set_current_layout(layout);
    }

    /// Tracks a buffer touch within this encoder, recording a barrier
    /// immediately if this isn't the resource's first sighting (the
    /// intra-buffer half of spec.md §4.5's "single call serves two
    /// purposes").
    fn track_buffer_access(&mut self, handle: &Handle<Buffer>, snap: BufferSnapshot) {
        if let Some(barrier) = self.tracker.track_and_emit_buffer(handle, snap) {
            let buffer_barrier = vk::BufferMemoryBarrier::default()
                .src_access_mask(hal::conv::map_access_flags(barrier.src_access))
                .dst_access_mask(hal::conv::map_access_flags(barrier.dst_access))
                .buffer(handle.borrow().raw())
                .offset(0)
                .size(vk::WHOLE_SIZE);
            unsafe {
                self.device.raw().cmd_pipeline_barrier(
                    self.raw,
                    hal::conv::map_pipeline_stages(barrier.src_stage),
                    hal::conv::map_pipeline_stages(barrier.dst_stage),
                    vk::DependencyFlags::empty(),
                    &[],
                    &[buffer_barrier],
                    &[],
                )
            };
        }
    }

    /// Records a buffer-to-buffer copy (spec.md §6 `command_encoder_copy_*`).
    pub fn copy_buffer_to_buffer(
        &mut self,
        src: &Handle<Buffer>,
        src_offset: types::BufferAddress,
        dst: &Handle<Buffer>,
        dst_offset: types::BufferAddress,
        size: types::BufferAddress,
    ) {
        self.track_buffer_access(src, BufferSnapshot { stage: PipelineStages::TRANSFER, access: AccessFlags::TRANSFER_READ });
        self.track_buffer_access(dst, BufferSnapshot { stage: PipelineStages::TRANSFER, access: AccessFlags::TRANSFER_WRITE });
        let region = vk::BufferCopy { src_offset, dst_offset, size };
        unsafe { self.device.raw().cmd_copy_buffer(self.raw, src.borrow().raw(), dst.borrow().raw(), &[region]) };
        self.encoded_commands += 1;
    }

    /// Records a buffer-to-texture copy, transitioning the destination
    /// to `TransferDstOptimal` first (spec.md §6).
    pub fn copy_buffer_to_texture(
        &mut self,
        src: &Handle<Buffer>,
        src_offset: types::BufferAddress,
        dst: &Handle<Texture>,
        size: types::Extent3d,
    ) {
        self.track_buffer_access(src, BufferSnapshot { stage: PipelineStages::TRANSFER, access: AccessFlags::TRANSFER_READ });
        self.transition_texture(dst, TextureLayout::TransferDstOptimal, PipelineStages::TRANSFER, AccessFlags::TRANSFER_WRITE);
        let region = vk::BufferImageCopy {
            buffer_offset: src_offset,
            buffer_row_length: 0,
            buffer_image_height: 0,
            image_subresource: vk::ImageSubresourceLayers {
                aspect_mask: crate::texture::aspect_mask_for_format(dst.borrow().format),
                mip_level: 0,
                base_array_layer: 0,
                layer_count: 1,
            },
            image_offset: vk::Offset3D::default(),
            image_extent: vk::Extent3D { width: size.width, height: size.height, depth: size.depth_or_array_layers },
        };
        unsafe {
            self.device.raw().cmd_copy_buffer_to_image(
                self.raw,
                src.borrow().raw(),
                dst.borrow().raw(),
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
            )
        };
        self.encoded_commands += 1;
    }

    /// Records a texture-to-buffer copy, transitioning the source to
    /// `TransferSrcOptimal` first (spec.md §6).
    pub fn copy_texture_to_buffer(
        &mut self,
        src: &Handle<Texture>,
        dst: &Handle<Buffer>,
        dst_offset: types::BufferAddress,
        size: types::Extent3d,
    ) {
        self.transition_texture(src, TextureLayout::TransferSrcOptimal, PipelineStages::TRANSFER, AccessFlags::TRANSFER_READ);
        self.track_buffer_access(dst, BufferSnapshot { stage: PipelineStages::TRANSFER, access: AccessFlags::TRANSFER_WRITE });
        let region = vk::BufferImageCopy {
            buffer_offset: dst_offset,
            buffer_row_length: 0,
            buffer_image_height: 0,
            image_subresource: vk::ImageSubresourceLayers {
                aspect_mask: crate::texture::aspect_mask_for_format(src.borrow().format),
                mip_level: 0,
                base_array_layer: 0,
                layer_count: 1,
            },
            image_offset: vk::Offset3D::default(),
            image_extent: vk::Extent3D { width: size.width, height: size.height, depth: size.depth_or_array_layers },
        };
        unsafe {
            self.device.raw().cmd_copy_image_to_buffer(
                self.raw,
                src.borrow().raw(),
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                dst.borrow().raw(),
                &[region],
            )
        };
        self.encoded_commands += 1;
    }

    /// Records a texture-to-texture copy (spec.md §6).
    pub fn copy_texture_to_texture(&mut self, src: &Handle<Texture>, dst: &Handle<Texture>, size: types::Extent3d) {
        self.transition_texture(src, TextureLayout::TransferSrcOptimal, PipelineStages::TRANSFER, AccessFlags::TRANSFER_READ);
        self.transition_texture(dst, TextureLayout::TransferDstOptimal, PipelineStages::TRANSFER, AccessFlags::TRANSFER_WRITE);
        let subresource = vk::ImageSubresourceLayers {
            aspect_mask: crate::texture::aspect_mask_for_format(src.borrow().format),
            mip_level: 0,
            base_array_layer: 0,
            layer_count: 1,
        };
        let region = vk::ImageCopy {
            src_subresource: subresource,
            src_offset: vk::Offset3D::default(),
            dst_subresource: subresource,
            dst_offset: vk::Offset3D::default(),
            extent: vk::Extent3D { width: size.width, height: size.height, depth: size.depth_or_array_layers },
        };
        unsafe {
            self.device.raw().cmd_copy_image(
                self.raw,
                src.borrow().raw(),
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                dst.borrow().raw(),
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
            )
        };
        self.encoded_commands += 1;
    }

    /// Closes the native buffer and hands ownership + tracker to a
    /// `CommandBuffer` (spec.md §3).
    pub fn finish(mut self) -> GfxResult<CommandBuffer> {
        unsafe { self.device.raw().end_command_buffer(self.raw) }
            .map_err(|e| crate::error::GfxError::from(hal::HalError::from(e)))?;
        Ok(CommandBuffer { raw: self.raw, tracker: std::mem::replace(&mut self.tracker, ResourceTracker::new()) })
    }
}

fn clear_color_value(color: Color) -> vk::ClearValue {
    vk::ClearValue { color: vk::ClearColorValue { float32: [color.r as f32, color.g as f32, color.b as f32, color.a as f32] } }
}

/// Tracks the currently-bound pipeline across a replay pass, so
/// `SetBindGroup` (shared between render and compute passes) can bind
/// into the right point with the right layout.
struct ReplayState {
    bind_point: vk::PipelineBindPoint,
    pipeline_layout: vk::PipelineLayout,
}

impl ReplayState {
    fn new(bind_point: vk::PipelineBindPoint) -> Self {
        Self { bind_point, pipeline_layout: vk::PipelineLayout::null() }
    }
}

/// Barrier stage mask a binding's shader visibility touches.
fn pipeline_stages_for_shader_stages(visibility: ShaderStages) -> PipelineStages {
    let mut stages = PipelineStages::empty();
    if visibility.contains(ShaderStages::VERTEX) {
        stages |= PipelineStages::VERTEX_SHADER;
    }
    if visibility.contains(ShaderStages::FRAGMENT) {
        stages |= PipelineStages::FRAGMENT_SHADER;
    }
    if visibility.contains(ShaderStages::COMPUTE) {
        stages |= PipelineStages::COMPUTE_SHADER;
    }
    stages
}

/// Stage/access mask for a bound buffer, derived from its binding's
/// visibility and storage type (spec.md §4.4(a)): writable storage
/// buffers need `SHADER_WRITE` or the tracker never sees the write that
/// a later readback needs a barrier against.
fn buffer_stage_access(visibility: ShaderStages, ty: BindingType) -> (PipelineStages, AccessFlags) {
    let stage = pipeline_stages_for_shader_stages(visibility);
    let access = match ty {
        BindingType::StorageBuffer { read_only: false, .. } => AccessFlags::SHADER_READ | AccessFlags::SHADER_WRITE,
        _ => AccessFlags::SHADER_READ,
    };
    (stage, access)
}

/// A closed command encoder: owns its native command buffer and the
/// resource-usage tracker moved out of the encoder (spec.md §3).
pub struct CommandBuffer {
    pub(crate) raw: vk::CommandBuffer,
    pub(crate) tracker: ResourceTracker<Buffer, Texture>,
}

impl CommandBuffer {
    pub fn raw(&self) -> vk::CommandBuffer {
        self.raw
    }

    pub fn tracker(&self) -> &ResourceTracker<Buffer, Texture> {
        &self.tracker
    }
}
