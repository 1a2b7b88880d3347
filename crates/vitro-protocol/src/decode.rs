//! Descriptor decoders.
//!
//! One pure function per creation/operation shape. Each reads a byte block at
//! word-granularity offsets fixed by the schemas documented below and produces
//! the structured descriptor consumed by the browser-side call it serves.
//! Given the same bytes a decoder always produces the same value, independent
//! of call order, so every schema is testable against a synthetic heap built
//! with [`crate::encode::DescriptorWriter`].
//!
//! Layout conventions, applied uniformly:
//!
//! - all fields are 32-bit words, little-endian;
//! - 64-bit quantities occupy two consecutive words, low then high;
//! - f64 values store their bit pattern the same way;
//! - enum fields hold a 1-based index into the matching table in
//!   [`crate::enums`], `0` meaning absent;
//! - variable-length sections are a `(count, pointer)` word pair, the pointer
//!   addressing `count` consecutive fixed-size records in the same byte
//!   space;
//! - optional sub-structures are gated by a designated discriminant word and
//!   are entirely absent from the produced descriptor when it is zero.
//!
//! The decoder trusts the caller's bounds; malformed input is a caller
//! contract violation checked only by debug assertions.

use crate::enums::{self, EnumTable};
use crate::heap::HeapView;
use crate::{descriptors::*, Handle, Ptr};

const fn w(ptr: Ptr, word: u32) -> Ptr {
    ptr + word * 4
}

fn enum_at(heap: &HeapView, table: &EnumTable, ptr: Ptr) -> Option<&'static str> {
    table.get(heap.u32_at(ptr))
}

/// Optional u32 where `0` means unspecified.
fn nonzero_u32(v: u32) -> Option<u32> {
    (v != 0).then_some(v)
}

/// Optional pass-write index where negative means unspecified.
fn write_index(v: i32) -> Option<u32> {
    (v >= 0).then_some(v as u32)
}

/// Shader module block, 2 words:
/// `[0]` WGSL source pointer (non-null), `[1]` reserved.
pub fn shader_module_descriptor<'a>(heap: &HeapView<'a>, ptr: Ptr) -> ShaderModuleDescriptor<'a> {
    debug_assert!(ptr != 0, "shader module descriptor must be non-null");
    ShaderModuleDescriptor {
        code: heap.str_at(heap.u32_at(w(ptr, 0))).unwrap_or(""),
    }
}

/// Buffer block, 4 words:
/// `[0..2]` size u64, `[2]` usage bits, `[3]` mapped-at-creation flag.
pub fn buffer_descriptor(heap: &HeapView, ptr: Ptr) -> BufferDescriptor {
    debug_assert!(ptr != 0, "buffer descriptor must be non-null");
    BufferDescriptor {
        size: heap.u64_at(w(ptr, 0)),
        usage: BufferUsage::from_bits_retain(heap.u32_at(w(ptr, 2))),
        mapped_at_creation: heap.bool_at(w(ptr, 3)),
    }
}

/// Texture block, 10 words:
/// `[0]` view format count, `[1]` view formats pointer (enum indices),
/// `[2..5]` size (width, height, depth-or-layers), `[5]` mip level count,
/// `[6]` sample count, `[7]` dimension enum, `[8]` format enum, `[9]` usage.
pub fn texture_descriptor(heap: &HeapView, ptr: Ptr) -> TextureDescriptor {
    debug_assert!(ptr != 0, "texture descriptor must be non-null");
    TextureDescriptor {
        view_formats: enum_array(
            heap,
            &enums::TEXTURE_AND_VERTEX_FORMATS,
            heap.u32_at(w(ptr, 1)),
            heap.u32_at(w(ptr, 0)),
        ),
        size: [
            heap.u32_at(w(ptr, 2)),
            heap.u32_at(w(ptr, 3)),
            heap.u32_at(w(ptr, 4)),
        ],
        mip_level_count: heap.u32_at(w(ptr, 5)),
        sample_count: heap.u32_at(w(ptr, 6)),
        dimension: enum_at(heap, &enums::TEXTURE_DIMENSIONS, w(ptr, 7)),
        format: enum_at(heap, &enums::TEXTURE_AND_VERTEX_FORMATS, w(ptr, 8)),
        usage: TextureUsage::from_bits_retain(heap.u32_at(w(ptr, 9))),
    }
}

/// Sampler block, 10 words:
/// `[0..3]` address modes u/v/w, `[3]` mag filter, `[4]` min filter,
/// `[5]` mipmap filter, `[6]` lod min clamp f32, `[7]` lod max clamp f32,
/// `[8]` compare function, `[9]` max anisotropy.
pub fn sampler_descriptor(heap: &HeapView, ptr: Ptr) -> SamplerDescriptor {
    debug_assert!(ptr != 0, "sampler descriptor must be non-null");
    SamplerDescriptor {
        address_mode_u: enum_at(heap, &enums::ADDRESS_MODES, w(ptr, 0)),
        address_mode_v: enum_at(heap, &enums::ADDRESS_MODES, w(ptr, 1)),
        address_mode_w: enum_at(heap, &enums::ADDRESS_MODES, w(ptr, 2)),
        mag_filter: enum_at(heap, &enums::FILTER_MODES, w(ptr, 3)),
        min_filter: enum_at(heap, &enums::FILTER_MODES, w(ptr, 4)),
        mipmap_filter: enum_at(heap, &enums::FILTER_MODES, w(ptr, 5)),
        lod_min_clamp: heap.f32_at(w(ptr, 6)),
        lod_max_clamp: heap.f32_at(w(ptr, 7)),
        compare: enum_at(heap, &enums::COMPARE_FUNCTIONS, w(ptr, 8)),
        max_anisotropy: heap.u32_at(w(ptr, 9)),
    }
}

/// Texture view block, 8 words:
/// `[0]` format, `[1]` dimension, `[2]` aspect, `[3]` base mip level,
/// `[4]` mip level count (0 = to the end), `[5]` base array layer,
/// `[6]` array layer count (0 = to the end), `[7]` reserved.
pub fn texture_view_descriptor(heap: &HeapView, ptr: Ptr) -> TextureViewDescriptor {
    debug_assert!(ptr != 0, "texture view descriptor must be non-null");
    TextureViewDescriptor {
        format: enum_at(heap, &enums::TEXTURE_AND_VERTEX_FORMATS, w(ptr, 0)),
        dimension: enum_at(heap, &enums::TEXTURE_VIEW_DIMENSIONS, w(ptr, 1)),
        aspect: enum_at(heap, &enums::TEXTURE_ASPECTS, w(ptr, 2)),
        base_mip_level: heap.u32_at(w(ptr, 3)),
        mip_level_count: nonzero_u32(heap.u32_at(w(ptr, 4))),
        base_array_layer: heap.u32_at(w(ptr, 5)),
        array_layer_count: nonzero_u32(heap.u32_at(w(ptr, 6))),
    }
}

/// Bind group layout entries, 8 words each:
/// `[0]` binding, `[1]` visibility bits, `[2]` type tag
/// (1 buffer, 2 sampler, 3 texture, 4 storage texture, 5 external texture),
/// `[3]` reserved, `[4..8]` type-specific payload:
/// buffer `{type enum, dynamic-offset flag, min binding size u64}`,
/// sampler `{type enum}`, texture `{sample type, view dimension, multisampled}`,
/// storage texture `{access, format, view dimension}`.
pub fn bind_group_layout_entries(
    heap: &HeapView,
    ptr: Ptr,
    count: u32,
) -> Vec<BindGroupLayoutEntry> {
    debug_assert!(ptr != 0 || count == 0, "entries pointer must be non-null");
    let mut entries = Vec::with_capacity(count as usize);
    for i in 0..count {
        let e = w(ptr, i * 8);
        let tag = heap.u32_at(w(e, 2));
        debug_assert!((1..=5).contains(&tag), "bad bind group layout entry tag {tag}");
        let ty = match tag {
            1 => BindingLayoutType::Buffer {
                ty: enum_at(heap, &enums::BUFFER_BINDING_TYPES, w(e, 4)),
                has_dynamic_offset: heap.bool_at(w(e, 5)),
                min_binding_size: heap.u64_at(w(e, 6)),
            },
            2 => BindingLayoutType::Sampler {
                ty: enum_at(heap, &enums::SAMPLER_BINDING_TYPES, w(e, 4)),
            },
            3 => BindingLayoutType::Texture {
                sample_type: enum_at(heap, &enums::TEXTURE_SAMPLE_TYPES, w(e, 4)),
                view_dimension: enum_at(heap, &enums::TEXTURE_VIEW_DIMENSIONS, w(e, 5)),
                multisampled: heap.bool_at(w(e, 6)),
            },
            4 => BindingLayoutType::StorageTexture {
                access: enum_at(heap, &enums::STORAGE_TEXTURE_ACCESS, w(e, 4)),
                format: enum_at(heap, &enums::TEXTURE_AND_VERTEX_FORMATS, w(e, 5)),
                view_dimension: enum_at(heap, &enums::TEXTURE_VIEW_DIMENSIONS, w(e, 6)),
            },
            _ => BindingLayoutType::ExternalTexture,
        };
        entries.push(BindGroupLayoutEntry {
            binding: heap.u32_at(w(e, 0)),
            visibility: ShaderStage::from_bits_retain(heap.u32_at(w(e, 1))),
            ty,
        });
    }
    entries
}

/// Bind group entries, 6 words each:
/// `[0]` binding, `[1]` resource handle, `[2..4]` offset u64,
/// `[4..6]` size u64 (0 = whole buffer). Offset and size only apply when the
/// resource is buffer-like; the registry side shapes the entry.
pub fn bind_group_entries(heap: &HeapView, ptr: Ptr, count: u32) -> Vec<BindGroupEntry> {
    debug_assert!(ptr != 0 || count == 0, "entries pointer must be non-null");
    let mut entries = Vec::with_capacity(count as usize);
    for i in 0..count {
        let e = w(ptr, i * 6);
        entries.push(BindGroupEntry {
            binding: heap.u32_at(w(e, 0)),
            resource: heap.handle_at(w(e, 1)),
            offset: heap.u64_at(w(e, 2)),
            size: {
                let size = heap.u64_at(w(e, 4));
                (size != 0).then_some(size)
            },
        });
    }
    entries
}

/// A contiguous run of handle words.
pub fn handle_array(heap: &HeapView, ptr: Ptr, count: u32) -> Vec<Handle> {
    debug_assert!(ptr != 0 || count == 0, "handle array pointer must be non-null");
    (0..count).map(|i| heap.handle_at(w(ptr, i))).collect()
}

/// A contiguous run of enum index words, decoded through `table`.
pub fn enum_array(
    heap: &HeapView,
    table: &EnumTable,
    ptr: Ptr,
    count: u32,
) -> Vec<Option<&'static str>> {
    debug_assert!(ptr != 0 || count == 0, "enum array pointer must be non-null");
    (0..count).map(|i| enum_at(heap, table, w(ptr, i))).collect()
}

/// Pipeline-overridable constants, 4 words each:
/// `[0]` name pointer, `[1]` reserved, `[2..4]` f64 value bits.
pub fn constants<'a>(heap: &HeapView<'a>, ptr: Ptr, count: u32) -> Vec<ConstantEntry<'a>> {
    debug_assert!(ptr != 0 || count == 0, "constants pointer must be non-null");
    let mut out = Vec::with_capacity(count as usize);
    for i in 0..count {
        let e = w(ptr, i * 4);
        out.push(ConstantEntry {
            name: heap.str_at(heap.u32_at(w(e, 0))).unwrap_or(""),
            value: heap.f64_at(w(e, 2)),
        });
    }
    out
}

fn stencil_face_state(heap: &HeapView, ptr: Ptr) -> StencilFaceState {
    StencilFaceState {
        compare: enum_at(heap, &enums::COMPARE_FUNCTIONS, w(ptr, 0)),
        fail_op: enum_at(heap, &enums::STENCIL_OPERATIONS, w(ptr, 1)),
        depth_fail_op: enum_at(heap, &enums::STENCIL_OPERATIONS, w(ptr, 2)),
        pass_op: enum_at(heap, &enums::STENCIL_OPERATIONS, w(ptr, 3)),
    }
}

fn vertex_buffer_layouts(heap: &HeapView, ptr: Ptr, count: u32) -> Vec<VertexBufferLayout> {
    debug_assert!(ptr != 0 || count == 0, "vertex buffers pointer must be non-null");
    let mut buffers = Vec::with_capacity(count as usize);
    for i in 0..count {
        // 6 words: array stride u64, step mode, attribute count,
        // attributes pointer, reserved.
        let b = w(ptr, i * 6);
        let attr_count = heap.u32_at(w(b, 3));
        let attr_ptr = heap.u32_at(w(b, 4));
        debug_assert!(attr_ptr != 0 || attr_count == 0);
        let mut attributes = Vec::with_capacity(attr_count as usize);
        for j in 0..attr_count {
            // 4 words: offset u64, shader location, format.
            let a = w(attr_ptr, j * 4);
            attributes.push(VertexAttribute {
                offset: heap.u64_at(w(a, 0)),
                shader_location: heap.u32_at(w(a, 2)),
                format: enum_at(heap, &enums::TEXTURE_AND_VERTEX_FORMATS, w(a, 3)),
            });
        }
        buffers.push(VertexBufferLayout {
            array_stride: heap.u64_at(w(b, 0)),
            step_mode: enum_at(heap, &enums::VERTEX_STEP_MODES, w(b, 2)),
            attributes,
        });
    }
    buffers
}

fn color_targets(heap: &HeapView, ptr: Ptr, count: u32) -> Vec<Option<ColorTargetState>> {
    debug_assert!(ptr != 0 || count == 0, "color targets pointer must be non-null");
    let mut targets = Vec::with_capacity(count as usize);
    for i in 0..count {
        // 8 words: format (0 = sparse target), color blend
        // {operation (0 = no blend), src factor, dst factor}, alpha blend
        // {operation, src factor, dst factor}, write mask.
        let t = w(ptr, i * 8);
        let format = enum_at(heap, &enums::TEXTURE_AND_VERTEX_FORMATS, w(t, 0));
        targets.push(format.map(|format| ColorTargetState {
            format: Some(format),
            blend: (heap.u32_at(w(t, 1)) != 0).then(|| BlendState {
                color: blend_component(heap, w(t, 1)),
                alpha: blend_component(heap, w(t, 4)),
            }),
            write_mask: ColorWrite::from_bits_retain(heap.u32_at(w(t, 7))),
        }));
    }
    targets
}

fn blend_component(heap: &HeapView, ptr: Ptr) -> BlendComponent {
    BlendComponent {
        operation: enum_at(heap, &enums::BLEND_OPERATIONS, w(ptr, 0)),
        src_factor: enum_at(heap, &enums::BLEND_FACTORS, w(ptr, 1)),
        dst_factor: enum_at(heap, &enums::BLEND_FACTORS, w(ptr, 2)),
    }
}

/// Render pipeline block, 37 words. Word offsets:
///
/// | words | field |
/// |---|---|
/// | 0 | vertex module handle |
/// | 1 | vertex entry point pointer (0 = default) |
/// | 2, 3 | vertex buffer (count, pointer) |
/// | 4, 5 | vertex constant (count, pointer) |
/// | 6..11 | primitive state: topology, strip index format, front face, cull mode, unclipped depth |
/// | 11 | depth-stencil format (discriminant; 0 omits the whole state) |
/// | 12..19 | depth write flag, depth compare, stencil read/write masks, depth bias (i32), bias slope scale (f32), bias clamp (f32) |
/// | 19..23 | stencil front face state |
/// | 23..27 | stencil back face state |
/// | 27 | multisample count (discriminant; 0 omits the state) |
/// | 28, 29 | multisample mask, alpha-to-coverage flag |
/// | 30 | fragment module handle (discriminant; 0 omits the stage) |
/// | 31 | fragment entry point pointer |
/// | 32, 33 | color target (count, pointer) |
/// | 34, 35 | fragment constant (count, pointer) |
/// | 36 | pipeline layout handle (0 = auto) |
pub fn render_pipeline_descriptor<'a>(
    heap: &HeapView<'a>,
    ptr: Ptr,
) -> RenderPipelineDescriptor<'a> {
    debug_assert!(ptr != 0, "render pipeline descriptor must be non-null");

    let depth_stencil_format = heap.u32_at(w(ptr, 11));
    let multisample_count = heap.u32_at(w(ptr, 27));
    let fragment_module = heap.handle_at(w(ptr, 30));

    RenderPipelineDescriptor {
        vertex: VertexState {
            module: heap.handle_at(w(ptr, 0)),
            entry_point: heap.nonempty_str_at(heap.u32_at(w(ptr, 1))),
            buffers: vertex_buffer_layouts(heap, heap.u32_at(w(ptr, 3)), heap.u32_at(w(ptr, 2))),
            constants: constants(heap, heap.u32_at(w(ptr, 5)), heap.u32_at(w(ptr, 4))),
        },
        primitive: PrimitiveState {
            topology: enum_at(heap, &enums::PRIMITIVE_TOPOLOGIES, w(ptr, 6)),
            strip_index_format: enum_at(heap, &enums::INDEX_FORMATS, w(ptr, 7)),
            front_face: enum_at(heap, &enums::FRONT_FACES, w(ptr, 8)),
            cull_mode: enum_at(heap, &enums::CULL_MODES, w(ptr, 9)),
            unclipped_depth: heap.bool_at(w(ptr, 10)),
        },
        depth_stencil: (depth_stencil_format != 0).then(|| DepthStencilState {
            format: enums::TEXTURE_AND_VERTEX_FORMATS.get(depth_stencil_format),
            depth_write_enabled: heap.bool_at(w(ptr, 12)),
            depth_compare: enum_at(heap, &enums::COMPARE_FUNCTIONS, w(ptr, 13)),
            stencil_read_mask: heap.u32_at(w(ptr, 14)),
            stencil_write_mask: heap.u32_at(w(ptr, 15)),
            depth_bias: heap.i32_at(w(ptr, 16)),
            depth_bias_slope_scale: heap.f32_at(w(ptr, 17)),
            depth_bias_clamp: heap.f32_at(w(ptr, 18)),
            stencil_front: stencil_face_state(heap, w(ptr, 19)),
            stencil_back: stencil_face_state(heap, w(ptr, 23)),
        }),
        multisample: (multisample_count != 0).then(|| MultisampleState {
            count: multisample_count,
            mask: heap.u32_at(w(ptr, 28)),
            alpha_to_coverage_enabled: heap.bool_at(w(ptr, 29)),
        }),
        fragment: (fragment_module != 0).then(|| FragmentState {
            module: fragment_module,
            entry_point: heap.nonempty_str_at(heap.u32_at(w(ptr, 31))),
            targets: color_targets(heap, heap.u32_at(w(ptr, 33)), heap.u32_at(w(ptr, 32))),
            constants: constants(heap, heap.u32_at(w(ptr, 35)), heap.u32_at(w(ptr, 34))),
        }),
        layout: LayoutRef::from_word(heap.handle_at(w(ptr, 36))),
    }
}

/// Render bundle encoder block, 4 words:
/// `[0]` color format count, `[1]` formats pointer (0 entries are sparse
/// slots), `[2]` depth-stencil format (0 = none), `[3]` sample count.
pub fn render_bundle_encoder_descriptor(
    heap: &HeapView,
    ptr: Ptr,
) -> RenderBundleEncoderDescriptor {
    debug_assert!(ptr != 0, "render bundle encoder descriptor must be non-null");
    RenderBundleEncoderDescriptor {
        color_formats: enum_array(
            heap,
            &enums::TEXTURE_AND_VERTEX_FORMATS,
            heap.u32_at(w(ptr, 1)),
            heap.u32_at(w(ptr, 0)),
        ),
        depth_stencil_format: enum_at(heap, &enums::TEXTURE_AND_VERTEX_FORMATS, w(ptr, 2)),
        sample_count: heap.u32_at(w(ptr, 3)),
    }
}

/// Query set block, 2 words: `[0]` type enum, `[1]` count.
pub fn query_set_descriptor(heap: &HeapView, ptr: Ptr) -> QuerySetDescriptor {
    debug_assert!(ptr != 0, "query set descriptor must be non-null");
    QuerySetDescriptor {
        ty: enum_at(heap, &enums::QUERY_TYPES, w(ptr, 0)),
        count: heap.u32_at(w(ptr, 1)),
    }
}

fn timestamp_writes(heap: &HeapView, ptr: Ptr) -> Option<TimestampWrites> {
    let query_set = heap.handle_at(w(ptr, 0));
    (query_set != 0).then(|| TimestampWrites {
        query_set,
        beginning_of_pass_write_index: write_index(heap.i32_at(w(ptr, 1))),
        end_of_pass_write_index: write_index(heap.i32_at(w(ptr, 2))),
    })
}

/// Render pass block, 17 words:
/// `[0..2]` max draw count u64 (0 = default), `[2]` color attachment count,
/// `[3]` attachments pointer, `[4..13]` depth-stencil attachment (view is the
/// discriminant), `[13]` occlusion query set (0 = none), `[14..17]` timestamp
/// writes (query set is the discriminant; negative indices are unspecified).
///
/// Color attachment records are 14 words: `[0]` view (0 = sparse slot),
/// `[1]` depth slice (negative = unspecified), `[2]` resolve target (0 =
/// none), `[3]` store op, `[4]` load op, `[5]` reserved, `[6..14]` clear
/// value, four f64s.
pub fn render_pass_descriptor(heap: &HeapView, ptr: Ptr) -> RenderPassDescriptor {
    debug_assert!(ptr != 0, "render pass descriptor must be non-null");

    let count = heap.u32_at(w(ptr, 2));
    let attachments_ptr = heap.u32_at(w(ptr, 3));
    debug_assert!(attachments_ptr != 0 || count == 0);
    let mut color_attachments = Vec::with_capacity(count as usize);
    for i in 0..count {
        let a = w(attachments_ptr, i * 14);
        let view = heap.handle_at(w(a, 0));
        color_attachments.push((view != 0).then(|| RenderPassColorAttachment {
            view,
            depth_slice: write_index(heap.i32_at(w(a, 1))),
            resolve_target: {
                let target = heap.handle_at(w(a, 2));
                (target != 0).then_some(target)
            },
            store_op: enum_at(heap, &enums::STORE_OPS, w(a, 3)),
            load_op: enum_at(heap, &enums::LOAD_OPS, w(a, 4)),
            clear_value: [
                heap.f64_at(w(a, 6)),
                heap.f64_at(w(a, 8)),
                heap.f64_at(w(a, 10)),
                heap.f64_at(w(a, 12)),
            ],
        }));
    }

    let ds_view = heap.handle_at(w(ptr, 4));
    let occlusion = heap.handle_at(w(ptr, 13));

    RenderPassDescriptor {
        max_draw_count: {
            let count = heap.u64_at(w(ptr, 0));
            (count != 0).then_some(count)
        },
        color_attachments,
        depth_stencil_attachment: (ds_view != 0).then(|| RenderPassDepthStencilAttachment {
            view: ds_view,
            depth_load_op: enum_at(heap, &enums::LOAD_OPS, w(ptr, 5)),
            depth_clear_value: heap.f32_at(w(ptr, 6)),
            depth_store_op: enum_at(heap, &enums::STORE_OPS, w(ptr, 7)),
            depth_read_only: heap.bool_at(w(ptr, 8)),
            stencil_load_op: enum_at(heap, &enums::LOAD_OPS, w(ptr, 9)),
            stencil_clear_value: heap.u32_at(w(ptr, 10)),
            stencil_store_op: enum_at(heap, &enums::STORE_OPS, w(ptr, 11)),
            stencil_read_only: heap.bool_at(w(ptr, 12)),
        }),
        occlusion_query_set: (occlusion != 0).then_some(occlusion),
        timestamp_writes: timestamp_writes(heap, w(ptr, 14)),
    }
}

/// Compute pass block, 3 words: timestamp writes (query set, begin index, end
/// index), query set `0` meaning no timestamp writes.
pub fn compute_pass_descriptor(heap: &HeapView, ptr: Ptr) -> ComputePassDescriptor {
    debug_assert!(ptr != 0, "compute pass descriptor must be non-null");
    ComputePassDescriptor {
        timestamp_writes: timestamp_writes(heap, w(ptr, 0)),
    }
}

/// Image copy buffer block, 6 words:
/// `[0]` buffer handle, `[1..3]` offset u64, `[3]` bytes per row (0 =
/// unspecified), `[4]` rows per image (0 = unspecified), `[5]` reserved.
pub fn image_copy_buffer(heap: &HeapView, ptr: Ptr) -> ImageCopyBuffer {
    debug_assert!(ptr != 0, "image copy buffer must be non-null");
    ImageCopyBuffer {
        buffer: heap.handle_at(w(ptr, 0)),
        offset: heap.u64_at(w(ptr, 1)),
        bytes_per_row: nonzero_u32(heap.u32_at(w(ptr, 3))),
        rows_per_image: nonzero_u32(heap.u32_at(w(ptr, 4))),
    }
}

/// Image copy texture block, 8 words:
/// `[0]` texture handle, `[1]` mip level, `[2..5]` origin x/y/z, `[5]` aspect
/// enum, `[6..8]` reserved.
pub fn image_copy_texture(heap: &HeapView, ptr: Ptr) -> ImageCopyTexture {
    debug_assert!(ptr != 0, "image copy texture must be non-null");
    ImageCopyTexture {
        texture: heap.handle_at(w(ptr, 0)),
        mip_level: heap.u32_at(w(ptr, 1)),
        origin: [
            heap.u32_at(w(ptr, 2)),
            heap.u32_at(w(ptr, 3)),
            heap.u32_at(w(ptr, 4)),
        ],
        aspect: enum_at(heap, &enums::TEXTURE_ASPECTS, w(ptr, 5)),
    }
}

/// Adapter request options, 2 words:
/// `[0]` power preference enum, `[1]` force-fallback flag.
pub fn adapter_options(heap: &HeapView, ptr: Ptr) -> AdapterOptions {
    debug_assert!(ptr != 0, "adapter options must be non-null");
    AdapterOptions {
        power_preference: enum_at(heap, &enums::POWER_PREFERENCES, w(ptr, 0)),
        force_fallback_adapter: heap.bool_at(w(ptr, 1)),
    }
}

fn supported_limits(heap: &HeapView, ptr: Ptr) -> SupportedLimits {
    let mut limits = SupportedLimits::default();
    for (i, slot) in limits.limits_u64.iter_mut().enumerate() {
        *slot = heap.u64_at(w(ptr, i as u32 * 2));
    }
    for (i, slot) in limits.limits_u32.iter_mut().enumerate() {
        *slot = heap.u32_at(w(ptr, 6 + i as u32));
    }
    limits
}

/// Device request block, 37 words:
/// `[0..6]` three u64 limits, `[6..34]` twenty-eight u32 limits (both in
/// limit-table order, 0 = unspecified), `[34]` default queue label pointer,
/// `[35]` reserved, `[36]` required feature bitfield.
pub fn device_descriptor<'a>(heap: &HeapView<'a>, ptr: Ptr) -> DeviceDescriptor<'a> {
    debug_assert!(ptr != 0, "device descriptor must be non-null");
    DeviceDescriptor {
        required_limits: supported_limits(heap, ptr),
        default_queue_label: heap.nonempty_str_at(heap.u32_at(w(ptr, 34))),
        required_features: heap.u32_at(w(ptr, 36)),
    }
}

/// Canvas configuration block, 12 words:
/// `[0]` device handle, `[1]` format enum, `[2]` usage bits, `[3]` view
/// format count, `[4]` view formats pointer, `[5]` color space, `[6]` tone
/// mapping mode, `[7]` alpha mode, `[8]` width (discriminant; 0 sizes the
/// swap chain from the canvas and omits the explicit size), `[9]` height,
/// `[10..12]` reserved.
pub fn canvas_configuration(heap: &HeapView, ptr: Ptr) -> CanvasConfiguration {
    debug_assert!(ptr != 0, "canvas configuration must be non-null");
    let width = heap.u32_at(w(ptr, 8));
    CanvasConfiguration {
        device: heap.handle_at(w(ptr, 0)),
        format: enum_at(heap, &enums::TEXTURE_AND_VERTEX_FORMATS, w(ptr, 1)),
        usage: TextureUsage::from_bits_retain(heap.u32_at(w(ptr, 2))),
        view_formats: enum_array(
            heap,
            &enums::TEXTURE_AND_VERTEX_FORMATS,
            heap.u32_at(w(ptr, 4)),
            heap.u32_at(w(ptr, 3)),
        ),
        color_space: enum_at(heap, &enums::PREDEFINED_COLOR_SPACES, w(ptr, 5)),
        tone_mapping_mode: enum_at(heap, &enums::TONE_MAPPING_MODES, w(ptr, 6)),
        alpha_mode: enum_at(heap, &enums::ALPHA_MODES, w(ptr, 7)),
        size: (width != 0).then(|| [width, heap.u32_at(w(ptr, 9))]),
    }
}
