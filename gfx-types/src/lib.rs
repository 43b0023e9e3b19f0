//! Plain-data descriptor, enum, and bitflag types shared between the
//! Vulkan backend (`gfx-hal-vulkan`) and the core implementation
//! (`gfx-core`). Nothing in this crate owns a native handle or performs
//! any API call; it only describes what the caller wants.

use std::num::NonZeroU32;

pub type BufferAddress = u64;
pub type DynamicOffset = u32;

bitflags::bitflags! {
    /// Mirrors `WGPUBufferUsage` in the original C header.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        const MAP_READ           = 1 << 0;
        const MAP_WRITE          = 1 << 1;
        const COPY_SRC           = 1 << 2;
        const COPY_DST           = 1 << 3;
        const INDEX              = 1 << 4;
        const VERTEX             = 1 << 5;
        const UNIFORM            = 1 << 6;
        const STORAGE            = 1 << 7;
        const INDIRECT           = 1 << 8;
        const QUERY_RESOLVE      = 1 << 9;
        const SHADER_DEVICE_ADDRESS      = 1 << 10;
        const ACCELERATION_STRUCTURE_INPUT   = 1 << 11;
        const ACCELERATION_STRUCTURE_STORAGE = 1 << 12;
        const SHADER_BINDING_TABLE           = 1 << 13;
    }
}

impl BufferUsage {
    /// Whether this usage combination needs the 256-byte-aligned
    /// allocation path (see SPEC_FULL.md §2, resolved Open Question).
    pub fn needs_raytracing_alignment(self) -> bool {
        self.intersects(
            Self::ACCELERATION_STRUCTURE_STORAGE | Self::SHADER_BINDING_TABLE,
        )
    }

    pub fn is_host_mappable(self) -> bool {
        self.intersects(Self::MAP_READ | Self::MAP_WRITE)
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        const COPY_SRC             = 1 << 0;
        const COPY_DST             = 1 << 1;
        const TEXTURE_BINDING      = 1 << 2;
        const STORAGE_BINDING      = 1 << 3;
        const RENDER_ATTACHMENT    = 1 << 4;
        const TRANSIENT_ATTACHMENT = 1 << 5;
        const STORAGE_ATTACHMENT   = 1 << 6;
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShaderStages: u32 {
        const VERTEX   = 1 << 0;
        const FRAGMENT = 1 << 1;
        const COMPUTE  = 1 << 2;
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ColorWrites: u32 {
        const RED   = 1 << 0;
        const GREEN = 1 << 1;
        const BLUE  = 1 << 2;
        const ALPHA = 1 << 3;
        const ALL = Self::RED.bits() | Self::GREEN.bits() | Self::BLUE.bits() | Self::ALPHA.bits();
    }
}

bitflags::bitflags! {
    /// Memory-access kinds a command can perform on a resource. Used by
    /// the resource-usage tracker (spec.md §4.5) to decide whether a
    /// transition is a read, a write, or both, and by the barrier
    /// synthesizer to pick source/destination access masks.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AccessFlags: u32 {
        const INDEX_READ               = 1 << 0;
        const VERTEX_ATTRIBUTE_READ    = 1 << 1;
        const UNIFORM_READ             = 1 << 2;
        const INDIRECT_COMMAND_READ    = 1 << 3;
        const SHADER_READ              = 1 << 4;
        const SHADER_WRITE             = 1 << 5;
        const COLOR_ATTACHMENT_READ    = 1 << 6;
        const COLOR_ATTACHMENT_WRITE   = 1 << 7;
        const DEPTH_STENCIL_READ       = 1 << 8;
        const DEPTH_STENCIL_WRITE      = 1 << 9;
        const TRANSFER_READ            = 1 << 10;
        const TRANSFER_WRITE           = 1 << 11;
        const HOST_READ                = 1 << 12;
        const HOST_WRITE               = 1 << 13;
        const MEMORY_READ              = 1 << 14;
        const MEMORY_WRITE             = 1 << 15;
        const QUERY_RESOLVE_WRITE      = 1 << 16;
        const PRESENT                  = 1 << 17;
        const ACCELERATION_STRUCTURE_READ  = 1 << 18;
        const ACCELERATION_STRUCTURE_WRITE = 1 << 19;
    }
}

impl AccessFlags {
    /// The fixed set of access bits treated as writes, per spec.md §4.5.
    pub const WRITE_SET: Self = Self::from_bits_truncate(
        Self::SHADER_WRITE.bits()
            | Self::COLOR_ATTACHMENT_WRITE.bits()
            | Self::DEPTH_STENCIL_WRITE.bits()
            | Self::TRANSFER_WRITE.bits()
            | Self::HOST_WRITE.bits()
            | Self::MEMORY_WRITE.bits()
            | Self::QUERY_RESOLVE_WRITE.bits()
            | Self::ACCELERATION_STRUCTURE_WRITE.bits(),
    );

    pub fn is_write(self) -> bool {
        self.intersects(Self::WRITE_SET)
    }
}

bitflags::bitflags! {
    /// A point in the GPU pipeline at which a barrier can begin or end
    /// scoping. One flag per stage named in the GLOSSARY's "Pipeline stage"
    /// entry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PipelineStages: u32 {
        const TOP_OF_PIPE      = 1 << 0;
        const DRAW_INDIRECT    = 1 << 1;
        const VERTEX_INPUT     = 1 << 2;
        const VERTEX_SHADER    = 1 << 3;
        const FRAGMENT_SHADER  = 1 << 4;
        const EARLY_FRAGMENT_TESTS = 1 << 5;
        const LATE_FRAGMENT_TESTS  = 1 << 6;
        const COLOR_ATTACHMENT_OUTPUT = 1 << 7;
        const COMPUTE_SHADER   = 1 << 8;
        const TRANSFER         = 1 << 9;
        const HOST             = 1 << 10;
        const ALL_COMMANDS     = 1 << 11;
        const BOTTOM_OF_PIPE   = 1 << 12;
    }
}

/// The GPU-visible arrangement of an image's memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureLayout {
    #[default]
    Undefined,
    General,
    ColorAttachmentOptimal,
    DepthStencilAttachmentOptimal,
    DepthStencilReadOnlyOptimal,
    ShaderReadOnlyOptimal,
    TransferSrcOptimal,
    TransferDstOptimal,
    PresentSrc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureFormat {
    #[default]
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Bgra8Unorm,
    Bgra8UnormSrgb,
    R8Unorm,
    Rg8Unorm,
    Rgba16Float,
    R32Float,
    Rgba32Float,
    Depth32Float,
    Depth24PlusStencil8,
    Depth32FloatStencil8,
}

impl TextureFormat {
    pub fn is_depth_stencil(self) -> bool {
        matches!(
            self,
            Self::Depth32Float | Self::Depth24PlusStencil8 | Self::Depth32FloatStencil8
        )
    }

    pub fn has_stencil(self) -> bool {
        matches!(self, Self::Depth24PlusStencil8 | Self::Depth32FloatStencil8)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureDimension {
    D1,
    #[default]
    D2,
    D3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureViewDimension {
    D1,
    #[default]
    D2,
    D2Array,
    Cube,
    CubeArray,
    D3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Extent3d {
    pub width: u32,
    pub height: u32,
    pub depth_or_array_layers: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubresourceRange {
    pub base_mip_level: u32,
    pub mip_level_count: Option<NonZeroU32>,
    pub base_array_layer: u32,
    pub array_layer_count: Option<NonZeroU32>,
}

impl Default for SubresourceRange {
    fn default() -> Self {
        Self {
            base_mip_level: 0,
            mip_level_count: None,
            base_array_layer: 0,
            array_layer_count: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadOp {
    #[default]
    Load,
    Clear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreOp {
    #[default]
    Store,
    Discard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PresentMode {
    #[default]
    Fifo,
    FifoRelaxed,
    Immediate,
    Mailbox,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompositeAlphaMode {
    #[default]
    Opaque,
    PreMultiplied,
    PostMultiplied,
    Inherit,
}

/// Status of a `get_current_texture` call, see spec.md §4.8.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceStatus {
    Optimal,
    Suboptimal,
    Timeout,
    Outdated,
    Lost,
    Error,
}

#[derive(Debug, Clone)]
pub struct SurfaceConfiguration {
    pub usage: TextureUsage,
    pub format: TextureFormat,
    pub width: u32,
    pub height: u32,
    pub image_count: u32,
    pub present_mode: PresentMode,
    pub alpha_mode: CompositeAlphaMode,
    pub view_formats: Vec<TextureFormat>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceCapabilities {
    pub min_image_count: u32,
    pub max_image_count: u32,
    pub current_width: u32,
    pub current_height: u32,
    pub min_width: u32,
    pub min_height: u32,
    pub max_width: u32,
    pub max_height: u32,
}

impl SurfaceCapabilities {
    pub fn clamp_image_count(&self, min_plus_one: u32) -> u32 {
        let want = min_plus_one.max(self.min_image_count);
        if self.max_image_count == 0 {
            want
        } else {
            want.min(self.max_image_count)
        }
    }

    pub fn clamp_extent(&self, width: u32, height: u32) -> (u32, u32) {
        (
            width.clamp(self.min_width, self.max_width.max(self.min_width)),
            height.clamp(self.min_height, self.max_height.max(self.min_height)),
        )
    }
}

/// The kind a [`GfxError`](../gfx_core equivalent) is classified as when
/// funneled to the device's uncaptured-error callback (spec.md §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    OutOfMemory,
    Internal,
    Lost,
}

/// A platform window-surface source, recognized via the chained-struct
/// extension mechanism of spec.md §6. Modeled as an enum with
/// per-variant payloads rather than branching on a string, per the
/// REDESIGN FLAGS.
#[derive(Debug, Clone)]
pub enum SurfaceSource<'a> {
    Xlib { display: *mut std::ffi::c_void, window: u64 },
    Xcb { connection: *mut std::ffi::c_void, window: u32 },
    Wayland { display: *mut std::ffi::c_void, surface: *mut std::ffi::c_void },
    Win32 { hinstance: *mut std::ffi::c_void, hwnd: *mut std::ffi::c_void },
    Metal { layer: *mut std::ffi::c_void },
    Android { window: *mut std::ffi::c_void },
    _Marker(std::marker::PhantomData<&'a ()>),
}

// SAFETY: these are opaque platform handles, passed across threads only
// as inert pointers that the Vulkan backend dereferences under the
// caller's own synchronization; see wgpu-hal's `Surface` for precedent.
unsafe impl<'a> Send for SurfaceSource<'a> {}
unsafe impl<'a> Sync for SurfaceSource<'a> {}

/// Instance-layer selection, recognized via the chained-struct
/// mechanism (spec.md §6).
#[derive(Debug, Clone, Default)]
pub struct InstanceLayerSelection {
    pub layer_names: Vec<String>,
    pub enable_debug_messenger: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapMode {
    Read,
    Write,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStatus {
    Success,
    TimedOut,
}

pub const MAX_COLOR_ATTACHMENTS: usize = 8;
pub const MAX_BIND_GROUPS: usize = 4;
pub const MAX_VERTEX_BUFFERS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    #[default]
    Nearest,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddressMode {
    #[default]
    ClampToEdge,
    Repeat,
    MirrorRepeat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareFunction {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrimitiveTopology {
    PointList,
    LineList,
    LineStrip,
    #[default]
    TriangleList,
    TriangleStrip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexFormat {
    Uint16,
    #[default]
    Uint32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CullMode {
    #[default]
    None,
    Front,
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrontFace {
    #[default]
    Ccw,
    Cw,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum VertexStepMode {
    #[default]
    Vertex,
    Instance,
}

/// Mirrors `WGPUVertexFormat`'s scalar/vector shapes relevant to this
/// backend's supported set (SPEC_FULL.md's ambient-stack note: full
/// WGSL/SPIR-V reflection is out of scope, spec.md §1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexFormat {
    Float32,
    Float32x2,
    Float32x3,
    Float32x4,
    Uint32,
    Uint32x2,
    Uint32x3,
    Uint32x4,
    Sint32,
    Sint32x2,
    Sint32x3,
    Sint32x4,
}

impl VertexFormat {
    pub fn size_bytes(self) -> u64 {
        match self {
            Self::Float32 | Self::Uint32 | Self::Sint32 => 4,
            Self::Float32x2 | Self::Uint32x2 | Self::Sint32x2 => 8,
            Self::Float32x3 | Self::Uint32x3 | Self::Sint32x3 => 12,
            Self::Float32x4 | Self::Uint32x4 | Self::Sint32x4 => 16,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendFactor {
    Zero,
    One,
    Src,
    OneMinusSrc,
    SrcAlpha,
    OneMinusSrcAlpha,
    Dst,
    OneMinusDst,
    DstAlpha,
    OneMinusDstAlpha,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendOperation {
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlendComponent {
    pub src_factor: BlendFactor,
    pub dst_factor: BlendFactor,
    pub operation: BlendOperation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlendState {
    pub color: BlendComponent,
    pub alpha: BlendComponent,
}

/// A single binding entry's resource kind (spec.md §3 BindGroupLayout:
/// "binding, visibility mask, resource kind and sub-parameters").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingType {
    UniformBuffer { dynamic_offset: bool },
    StorageBuffer { dynamic_offset: bool, read_only: bool },
    Sampler,
    SampledTexture,
    StorageTexture { read_only: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    Occlusion,
    Timestamp,
}
