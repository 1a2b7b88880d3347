//! Shared enum/string tables.
//!
//! Enumerations cross the boundary as small integers: descriptor fields carry
//! a 1-based index into one of the tables below, and results computed by the
//! browser side (for example the preferred canvas format) are reported back to
//! native code as the index of the matching string. Index `0` is reserved to
//! mean absent/invalid for fields that are optional in the WebGPU API.
//!
//! Tables are checked-in static data, immutable after initialization and safe
//! for unsynchronized concurrent reads. Where the API reuses strings across
//! domains the table is shared (texture and vertex formats live in one table,
//! filter and mipmap-filter modes share another).

/// An ordered, bidirectionally-indexable enumeration domain.
///
/// Entry `i` of the underlying slice is addressed by index `i + 1`; index `0`
/// decodes as absent.
#[derive(Clone, Copy)]
pub struct EnumTable {
    entries: &'static [&'static str],
}

impl EnumTable {
    pub const fn new(entries: &'static [&'static str]) -> Self {
        Self { entries }
    }

    /// Decodes an index into its canonical string. `0` and out-of-range
    /// indices decode as `None` (absent), not as an error.
    pub fn get(&self, index: u32) -> Option<&'static str> {
        if index == 0 {
            None
        } else {
            self.entries.get(index as usize - 1).copied()
        }
    }

    /// Encodes a canonical string back into its index, or `0` when the
    /// string is not part of the domain.
    pub fn index_of(&self, name: &str) -> u32 {
        match self.entries.iter().position(|&e| e == name) {
            Some(i) => i as u32 + 1,
            None => 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &'static [&'static str] {
        self.entries
    }
}

/// Texture formats and vertex formats share one table, mirroring the reuse of
/// format strings across the two API domains.
pub static TEXTURE_AND_VERTEX_FORMATS: EnumTable = EnumTable::new(&[
    "r8unorm",
    "r8snorm",
    "r8uint",
    "r8sint",
    "r16uint",
    "r16sint",
    "r16float",
    "rg8unorm",
    "rg8snorm",
    "rg8uint",
    "rg8sint",
    "r32uint",
    "r32sint",
    "r32float",
    "rg16uint",
    "rg16sint",
    "rg16float",
    "rgba8unorm",
    "rgba8unorm-srgb",
    "rgba8snorm",
    "rgba8uint",
    "rgba8sint",
    "bgra8unorm",
    "bgra8unorm-srgb",
    "rgb9e5ufloat",
    "rgb10a2uint",
    "rgb10a2unorm",
    "rg11b10ufloat",
    "rg32uint",
    "rg32sint",
    "rg32float",
    "rgba16uint",
    "rgba16sint",
    "rgba16float",
    "rgba32uint",
    "rgba32sint",
    "rgba32float",
    "stencil8",
    "depth16unorm",
    "depth24plus",
    "depth24plus-stencil8",
    "depth32float",
    "depth32float-stencil8",
    "bc1-rgba-unorm",
    "bc1-rgba-unorm-srgb",
    "bc2-rgba-unorm",
    "bc2-rgba-unorm-srgb",
    "bc3-rgba-unorm",
    "bc3-rgba-unorm-srgb",
    "bc4-r-unorm",
    "bc4-r-snorm",
    "bc5-rg-unorm",
    "bc5-rg-snorm",
    "bc6h-rgb-ufloat",
    "bc6h-rgb-float",
    "bc7-rgba-unorm",
    "bc7-rgba-unorm-srgb",
    "etc2-rgb8unorm",
    "etc2-rgb8unorm-srgb",
    "etc2-rgb8a1unorm",
    "etc2-rgb8a1unorm-srgb",
    "etc2-rgba8unorm",
    "etc2-rgba8unorm-srgb",
    "eac-r11unorm",
    "eac-r11snorm",
    "eac-rg11unorm",
    "eac-rg11snorm",
    "astc-4x4-unorm",
    "astc-4x4-unorm-srgb",
    "astc-5x4-unorm",
    "astc-5x4-unorm-srgb",
    "astc-5x5-unorm",
    "astc-5x5-unorm-srgb",
    "astc-6x5-unorm",
    "astc-6x5-unorm-srgb",
    "astc-6x6-unorm",
    "astc-6x6-unorm-srgb",
    "astc-8x5-unorm",
    "astc-8x5-unorm-srgb",
    "astc-8x6-unorm",
    "astc-8x6-unorm-srgb",
    "astc-8x8-unorm",
    "astc-8x8-unorm-srgb",
    "astc-10x5-unorm",
    "astc-10x5-unorm-srgb",
    "astc-10x6-unorm",
    "astc-10x6-unorm-srgb",
    "astc-10x8-unorm",
    "astc-10x8-unorm-srgb",
    "astc-10x10-unorm",
    "astc-10x10-unorm-srgb",
    "astc-12x10-unorm",
    "astc-12x10-unorm-srgb",
    "astc-12x12-unorm",
    "astc-12x12-unorm-srgb",
    "uint8x2",
    "uint8x4",
    "sint8x2",
    "sint8x4",
    "unorm8x2",
    "unorm8x4",
    "snorm8x2",
    "snorm8x4",
    "uint16x2",
    "uint16x4",
    "sint16x2",
    "sint16x4",
    "unorm16x2",
    "unorm16x4",
    "snorm16x2",
    "snorm16x4",
    "float16x2",
    "float16x4",
    "float32",
    "float32x2",
    "float32x3",
    "float32x4",
    "uint32",
    "uint32x2",
    "uint32x3",
    "uint32x4",
    "sint32",
    "sint32x2",
    "sint32x3",
    "sint32x4",
    "unorm10-10-10-2",
]);

pub static POWER_PREFERENCES: EnumTable = EnumTable::new(&["low-power", "high-performance"]);

pub static BLEND_FACTORS: EnumTable = EnumTable::new(&[
    "zero",
    "one",
    "src",
    "one-minus-src",
    "src-alpha",
    "one-minus-src-alpha",
    "dst",
    "one-minus-dst",
    "dst-alpha",
    "one-minus-dst-alpha",
    "src-alpha-saturated",
    "constant",
    "one-minus-constant",
    "src1",
    "one-minus-src1",
    "src1-alpha",
    "one-minus-src1-alpha",
]);

pub static BLEND_OPERATIONS: EnumTable =
    EnumTable::new(&["add", "subtract", "reverse-subtract", "min", "max"]);

pub static STENCIL_OPERATIONS: EnumTable = EnumTable::new(&[
    "keep",
    "zero",
    "replace",
    "invert",
    "increment-clamp",
    "decrement-clamp",
    "increment-wrap",
    "decrement-wrap",
]);

pub static COMPARE_FUNCTIONS: EnumTable = EnumTable::new(&[
    "never",
    "less",
    "equal",
    "less-equal",
    "greater",
    "not-equal",
    "greater-equal",
    "always",
]);

pub static INDEX_FORMATS: EnumTable = EnumTable::new(&["uint16", "uint32"]);

pub static BUFFER_MAP_STATES: EnumTable = EnumTable::new(&["unmapped", "pending", "mapped"]);

pub static TEXTURE_DIMENSIONS: EnumTable = EnumTable::new(&["1d", "2d", "3d"]);

pub static TEXTURE_VIEW_DIMENSIONS: EnumTable =
    EnumTable::new(&["1d", "2d", "2d-array", "cube", "cube-array", "3d"]);

pub static STORAGE_TEXTURE_ACCESS: EnumTable =
    EnumTable::new(&["write-only", "read-only", "read-write"]);

pub static ADDRESS_MODES: EnumTable = EnumTable::new(&["clamp-to-edge", "repeat", "mirror-repeat"]);

pub static TEXTURE_ASPECTS: EnumTable = EnumTable::new(&["all", "stencil-only", "depth-only"]);

pub static PRIMITIVE_TOPOLOGIES: EnumTable = EnumTable::new(&[
    "point-list",
    "line-list",
    "line-strip",
    "triangle-list",
    "triangle-strip",
]);

pub static BUFFER_BINDING_TYPES: EnumTable =
    EnumTable::new(&["uniform", "storage", "read-only-storage"]);

pub static SAMPLER_BINDING_TYPES: EnumTable =
    EnumTable::new(&["filtering", "non-filtering", "comparison"]);

pub static TEXTURE_SAMPLE_TYPES: EnumTable =
    EnumTable::new(&["float", "unfilterable-float", "depth", "sint", "uint"]);

pub static QUERY_TYPES: EnumTable = EnumTable::new(&["occlusion", "timestamp"]);

/// Shared by the filter and mipmap-filter descriptor fields.
pub static FILTER_MODES: EnumTable = EnumTable::new(&["nearest", "linear"]);

pub static LOAD_OPS: EnumTable = EnumTable::new(&["load", "clear"]);

pub static STORE_OPS: EnumTable = EnumTable::new(&["store", "discard"]);

pub static FRONT_FACES: EnumTable = EnumTable::new(&["ccw", "cw"]);

pub static CULL_MODES: EnumTable = EnumTable::new(&["none", "front", "back"]);

pub static VERTEX_STEP_MODES: EnumTable = EnumTable::new(&["vertex", "instance"]);

pub static ERROR_FILTERS: EnumTable = EnumTable::new(&["out-of-memory", "validation", "internal"]);

pub static PREDEFINED_COLOR_SPACES: EnumTable = EnumTable::new(&["srgb", "display-p3"]);

pub static TONE_MAPPING_MODES: EnumTable = EnumTable::new(&["standard", "extended"]);

pub static ALPHA_MODES: EnumTable = EnumTable::new(&["opaque", "premultiplied"]);

/// Adapter/device feature names. Bit `i` of a feature bitfield corresponds to
/// `FEATURES[i]`; this table is 0-based because it names bit positions, not
/// optional enum fields.
pub static FEATURES: &[&str] = &[
    "depth-clip-control",
    "depth32float-stencil8",
    "texture-compression-bc",
    "texture-compression-bc-sliced-3d",
    "texture-compression-etc2",
    "texture-compression-astc",
    "timestamp-query",
    "indirect-first-instance",
    "shader-f16",
    "rg11b10ufloat-renderable",
    "bgra8unorm-storage",
    "float32-filterable",
    "clip-distances",
    "dual-source-blending",
];

/// 64-bit limits, in the order they appear in a limits block.
pub static LIMIT_NAMES_U64: &[&str] = &[
    "maxUniformBufferBindingSize",
    "maxStorageBufferBindingSize",
    "maxBufferSize",
];

/// 32-bit limits, in the order they appear in a limits block (after the
/// 64-bit limits).
pub static LIMIT_NAMES_U32: &[&str] = &[
    "maxTextureDimension1D",
    "maxTextureDimension2D",
    "maxTextureDimension3D",
    "maxTextureArrayLayers",
    "maxBindGroups",
    "maxBindGroupsPlusVertexBuffers",
    "maxBindingsPerBindGroup",
    "maxDynamicUniformBuffersPerPipelineLayout",
    "maxDynamicStorageBuffersPerPipelineLayout",
    "maxSampledTexturesPerShaderStage",
    "maxSamplersPerShaderStage",
    "maxStorageBuffersPerShaderStage",
    "maxStorageTexturesPerShaderStage",
    "maxUniformBuffersPerShaderStage",
    "minUniformBufferOffsetAlignment",
    "minStorageBufferOffsetAlignment",
    "maxVertexBuffers",
    "maxVertexAttributes",
    "maxVertexBufferArrayStride",
    "maxInterStageShaderVariables",
    "maxColorAttachments",
    "maxColorAttachmentBytesPerSample",
    "maxComputeWorkgroupStorageSize",
    "maxComputeInvocationsPerWorkgroup",
    "maxComputeWorkgroupSizeX",
    "maxComputeWorkgroupSizeY",
    "maxComputeWorkgroupSizeZ",
    "maxComputeWorkgroupsPerDimension",
];
