//! Structured descriptor values.
//!
//! Descriptors are transient: decoded from a byte block, handed to the
//! browser-side creation call they serve, and dropped. Enum fields are
//! resolved to their canonical strings through the tables in [`crate::enums`];
//! `None` means the field was encoded as index `0` (absent).

use bitflags::bitflags;

use crate::Handle;

bitflags! {
    #[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        const MAP_READ = 1 << 0;
        const MAP_WRITE = 1 << 1;
        const COPY_SRC = 1 << 2;
        const COPY_DST = 1 << 3;
        const INDEX = 1 << 4;
        const VERTEX = 1 << 5;
        const UNIFORM = 1 << 6;
        const STORAGE = 1 << 7;
        const INDIRECT = 1 << 8;
        const QUERY_RESOLVE = 1 << 9;
    }
}

bitflags! {
    #[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        const COPY_SRC = 1 << 0;
        const COPY_DST = 1 << 1;
        const TEXTURE_BINDING = 1 << 2;
        const STORAGE_BINDING = 1 << 3;
        const RENDER_ATTACHMENT = 1 << 4;
    }
}

bitflags! {
    #[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
    pub struct ShaderStage: u32 {
        const VERTEX = 1 << 0;
        const FRAGMENT = 1 << 1;
        const COMPUTE = 1 << 2;
    }
}

bitflags! {
    #[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
    pub struct MapMode: u32 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
    }
}

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct ColorWrite: u32 {
        const RED = 1 << 0;
        const GREEN = 1 << 1;
        const BLUE = 1 << 2;
        const ALPHA = 1 << 3;
        const ALL = 0xF;
    }
}

impl Default for ColorWrite {
    fn default() -> Self {
        ColorWrite::ALL
    }
}

/// Pipeline layout reference: handle `0` selects automatic layout.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LayoutRef {
    Auto,
    Handle(Handle),
}

impl LayoutRef {
    pub fn from_word(word: Handle) -> Self {
        if word <= 0 {
            LayoutRef::Auto
        } else {
            LayoutRef::Handle(word)
        }
    }

    pub fn to_word(self) -> Handle {
        match self {
            LayoutRef::Auto => 0,
            LayoutRef::Handle(h) => h,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShaderModuleDescriptor<'a> {
    pub code: &'a str,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BufferDescriptor {
    pub size: u64,
    pub usage: BufferUsage,
    pub mapped_at_creation: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureDescriptor {
    pub view_formats: Vec<Option<&'static str>>,
    pub size: [u32; 3],
    pub mip_level_count: u32,
    pub sample_count: u32,
    pub dimension: Option<&'static str>,
    pub format: Option<&'static str>,
    pub usage: TextureUsage,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SamplerDescriptor {
    pub address_mode_u: Option<&'static str>,
    pub address_mode_v: Option<&'static str>,
    pub address_mode_w: Option<&'static str>,
    pub mag_filter: Option<&'static str>,
    pub min_filter: Option<&'static str>,
    pub mipmap_filter: Option<&'static str>,
    pub lod_min_clamp: f32,
    pub lod_max_clamp: f32,
    pub compare: Option<&'static str>,
    pub max_anisotropy: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureViewDescriptor {
    pub format: Option<&'static str>,
    pub dimension: Option<&'static str>,
    pub aspect: Option<&'static str>,
    pub base_mip_level: u32,
    pub mip_level_count: Option<u32>,
    pub base_array_layer: u32,
    pub array_layer_count: Option<u32>,
}

/// One bind group layout entry. The variant mirrors which of the mutually
/// exclusive binding sub-descriptors is present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingLayoutType {
    Buffer {
        ty: Option<&'static str>,
        has_dynamic_offset: bool,
        min_binding_size: u64,
    },
    Sampler {
        ty: Option<&'static str>,
    },
    Texture {
        sample_type: Option<&'static str>,
        view_dimension: Option<&'static str>,
        multisampled: bool,
    },
    StorageTexture {
        access: Option<&'static str>,
        format: Option<&'static str>,
        view_dimension: Option<&'static str>,
    },
    ExternalTexture,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindGroupLayoutEntry {
    pub binding: u32,
    pub visibility: ShaderStage,
    pub ty: BindingLayoutType,
}

/// A raw bind group entry. Offset and size are only meaningful when the
/// referenced resource turns out to be buffer-like; the registry side shapes
/// the entry accordingly.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BindGroupEntry {
    pub binding: u32,
    pub resource: Handle,
    pub offset: u64,
    /// `None` binds the whole buffer (encoded as size `0`).
    pub size: Option<u64>,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct VertexAttribute {
    pub offset: u64,
    pub shader_location: u32,
    pub format: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VertexBufferLayout {
    pub array_stride: u64,
    pub step_mode: Option<&'static str>,
    pub attributes: Vec<VertexAttribute>,
}

/// A pipeline-overridable constant.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ConstantEntry<'a> {
    pub name: &'a str,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VertexState<'a> {
    pub module: Handle,
    pub entry_point: Option<&'a str>,
    pub buffers: Vec<VertexBufferLayout>,
    pub constants: Vec<ConstantEntry<'a>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveState {
    pub topology: Option<&'static str>,
    pub strip_index_format: Option<&'static str>,
    pub front_face: Option<&'static str>,
    pub cull_mode: Option<&'static str>,
    pub unclipped_depth: bool,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct StencilFaceState {
    pub compare: Option<&'static str>,
    pub fail_op: Option<&'static str>,
    pub depth_fail_op: Option<&'static str>,
    pub pass_op: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DepthStencilState {
    pub format: Option<&'static str>,
    pub depth_write_enabled: bool,
    pub depth_compare: Option<&'static str>,
    pub stencil_read_mask: u32,
    pub stencil_write_mask: u32,
    pub depth_bias: i32,
    pub depth_bias_slope_scale: f32,
    pub depth_bias_clamp: f32,
    pub stencil_front: StencilFaceState,
    pub stencil_back: StencilFaceState,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BlendComponent {
    pub operation: Option<&'static str>,
    pub src_factor: Option<&'static str>,
    pub dst_factor: Option<&'static str>,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BlendState {
    pub color: BlendComponent,
    pub alpha: BlendComponent,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColorTargetState {
    pub format: Option<&'static str>,
    pub blend: Option<BlendState>,
    pub write_mask: ColorWrite,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MultisampleState {
    pub count: u32,
    pub mask: u32,
    pub alpha_to_coverage_enabled: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FragmentState<'a> {
    pub module: Handle,
    pub entry_point: Option<&'a str>,
    /// `None` entries are sparse targets.
    pub targets: Vec<Option<ColorTargetState>>,
    pub constants: Vec<ConstantEntry<'a>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderPipelineDescriptor<'a> {
    pub vertex: VertexState<'a>,
    pub primitive: PrimitiveState,
    pub depth_stencil: Option<DepthStencilState>,
    pub multisample: Option<MultisampleState>,
    pub fragment: Option<FragmentState<'a>>,
    pub layout: LayoutRef,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderBundleEncoderDescriptor {
    /// `None` entries are sparse color slots.
    pub color_formats: Vec<Option<&'static str>>,
    pub depth_stencil_format: Option<&'static str>,
    pub sample_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySetDescriptor {
    pub ty: Option<&'static str>,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderPassColorAttachment {
    pub view: Handle,
    pub depth_slice: Option<u32>,
    pub resolve_target: Option<Handle>,
    pub store_op: Option<&'static str>,
    pub load_op: Option<&'static str>,
    pub clear_value: [f64; 4],
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderPassDepthStencilAttachment {
    pub view: Handle,
    pub depth_load_op: Option<&'static str>,
    pub depth_clear_value: f32,
    pub depth_store_op: Option<&'static str>,
    pub depth_read_only: bool,
    pub stencil_load_op: Option<&'static str>,
    pub stencil_clear_value: u32,
    pub stencil_store_op: Option<&'static str>,
    pub stencil_read_only: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TimestampWrites {
    pub query_set: Handle,
    pub beginning_of_pass_write_index: Option<u32>,
    pub end_of_pass_write_index: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderPassDescriptor {
    /// `None` uses the implementation default.
    pub max_draw_count: Option<u64>,
    /// `None` entries are sparse attachments.
    pub color_attachments: Vec<Option<RenderPassColorAttachment>>,
    pub depth_stencil_attachment: Option<RenderPassDepthStencilAttachment>,
    pub occlusion_query_set: Option<Handle>,
    pub timestamp_writes: Option<TimestampWrites>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputePassDescriptor {
    pub timestamp_writes: Option<TimestampWrites>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ImageCopyBuffer {
    pub buffer: Handle,
    pub offset: u64,
    /// `None` when the copy is a single row (encoded as `0`).
    pub bytes_per_row: Option<u32>,
    pub rows_per_image: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCopyTexture {
    pub texture: Handle,
    pub mip_level: u32,
    pub origin: [u32; 3],
    pub aspect: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdapterOptions {
    pub power_preference: Option<&'static str>,
    pub force_fallback_adapter: bool,
}

/// Required limits, ordered like [`crate::enums::LIMIT_NAMES_U64`] followed by
/// [`crate::enums::LIMIT_NAMES_U32`]. Zero means "unspecified, use default".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportedLimits {
    pub limits_u64: [u64; 3],
    pub limits_u32: [u32; 28],
}

impl Default for SupportedLimits {
    fn default() -> Self {
        Self {
            limits_u64: [0; 3],
            limits_u32: [0; 28],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceDescriptor<'a> {
    pub required_limits: SupportedLimits,
    pub default_queue_label: Option<&'a str>,
    /// Bitfield over [`crate::enums::FEATURES`].
    pub required_features: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CanvasConfiguration {
    pub device: Handle,
    pub format: Option<&'static str>,
    pub usage: TextureUsage,
    pub view_formats: Vec<Option<&'static str>>,
    pub color_space: Option<&'static str>,
    pub tone_mapping_mode: Option<&'static str>,
    pub alpha_mode: Option<&'static str>,
    /// Explicit presentation size. `None` (encoded as width `0`) sizes the
    /// swap chain from the canvas itself.
    pub size: Option<[u32; 2]>,
}
