//! Command buffering layer (spec.md §4.4). Pass encoders do not write
//! to the native command buffer directly — they append typed records to
//! a plain `Vec`, and the encoder walks the list at pass-end to
//! synthesize barriers, emit the native begin/end calls, and replay
//! every draw/dispatch in order.

use types::{Color, IndexFormat, LoadOp, StoreOp};

use crate::bind::BindGroup;
use crate::handle::Handle;
use crate::pipeline::{ComputePipeline, RenderPipeline};
use crate::query::QuerySet;
use crate::render_bundle::RenderBundle;
use crate::buffer::Buffer;

/// One viewport rectangle, already in the Y-up coordinate space the
/// caller specifies it in — the Y-flip to screen space (spec.md §4.9
/// subtlety ii) happens when the encoder replays this record.
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct ScissorRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// A drawcall parameter block read from a buffer rather than passed by
/// value (spec.md §4.4: `draw_indirect`/`draw_indexed_indirect`).
#[derive(Debug, Clone, Copy)]
pub struct IndirectArgs {
    pub buffer_offset: u64,
}

pub enum RenderCommand {
    SetPipeline(Handle<RenderPipeline>),
    SetBindGroup { index: u32, bind_group: Handle<BindGroup>, dynamic_offsets: Vec<u32> },
    SetVertexBuffer { slot: u32, buffer: Handle<Buffer>, offset: u64 },
    SetIndexBuffer { buffer: Handle<Buffer>, format: IndexFormat, offset: u64 },
    Draw { vertices: std::ops::Range<u32>, instances: std::ops::Range<u32> },
    DrawIndexed { indices: std::ops::Range<u32>, base_vertex: i32, instances: std::ops::Range<u32> },
    DrawIndirect { buffer: Handle<Buffer>, args: IndirectArgs },
    DrawIndexedIndirect { buffer: Handle<Buffer>, args: IndirectArgs },
    MultiDrawIndirect { buffer: Handle<Buffer>, args: IndirectArgs, count: u32 },
    MultiDrawIndexedIndirect { buffer: Handle<Buffer>, args: IndirectArgs, count: u32 },
    SetViewport(Viewport),
    SetScissorRect(ScissorRect),
    SetBlendConstant(Color),
    BeginOcclusionQuery { query_set: Handle<QuerySet>, query_index: u32 },
    EndOcclusionQuery { query_set: Handle<QuerySet>, query_index: u32 },
    InsertDebugMarker(String),
    ExecuteRenderBundle(Handle<RenderBundle>),
    SetComputePipeline(Handle<ComputePipeline>),
    DispatchWorkgroups { x: u32, y: u32, z: u32 },
    DispatchWorkgroupsIndirect { buffer: Handle<Buffer>, args: IndirectArgs },
}

/// A render pass's begin-info, captured by value (spec.md §4.4: "not a
/// pointer, so `end()` can reproduce attachments without the caller
/// keeping its descriptor alive").
pub struct ColorAttachment {
    pub view: Handle<crate::texture::TextureView>,
    pub resolve_target: Option<Handle<crate::texture::TextureView>>,
    pub load: LoadOp,
    pub clear_color: Color,
    pub store: StoreOp,
}

pub struct DepthStencilAttachment {
    pub view: Handle<crate::texture::TextureView>,
    pub depth_load: LoadOp,
    pub depth_clear: f32,
    pub depth_store: StoreOp,
}

pub struct RenderPassDescriptor {
    pub label: Option<String>,
    pub color_attachments: Vec<Option<ColorAttachment>>,
    pub depth_stencil_attachment: Option<DepthStencilAttachment>,
    pub occlusion_query_set: Option<Handle<QuerySet>>,
    pub timestamp_writes_query_set: Option<Handle<QuerySet>>,
}

/// An open render-pass encoder: the buffered command list plus the
/// begin-info and ref-held query sets (spec.md §4.4).
pub struct RenderPassEncoder {
    pub(crate) begin_info: RenderPassDescriptor,
    pub(crate) commands: Vec<RenderCommand>,
}

impl RenderPassEncoder {
    pub(crate) fn new(begin_info: RenderPassDescriptor) -> Self {
        Self { begin_info, commands: Vec::new() }
    }

    pub fn push(&mut self, command: RenderCommand) {
        self.commands.push(command);
    }
}

pub struct ComputePassDescriptor {
    pub label: Option<String>,
    pub timestamp_writes_query_set: Option<Handle<QuerySet>>,
}

pub struct ComputePassEncoder {
    pub(crate) begin_info: ComputePassDescriptor,
    pub(crate) commands: Vec<RenderCommand>,
}

impl ComputePassEncoder {
    pub(crate) fn new(begin_info: ComputePassDescriptor) -> Self {
        Self { begin_info, commands: Vec::new() }
    }

    pub fn push(&mut self, command: RenderCommand) {
        self.commands.push(command);
    }
}
