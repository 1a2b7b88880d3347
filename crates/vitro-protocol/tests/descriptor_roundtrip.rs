//! Encode-with-writer / decode round-trips for every descriptor schema,
//! including the zero-as-absent discriminants for optional sub-structures.

use pretty_assertions::assert_eq;
use vitro_protocol::decode;
use vitro_protocol::encode::DescriptorWriter;
use vitro_protocol::heap::HeapView;
use vitro_protocol::*;

#[test]
fn buffer_descriptor_roundtrip() {
    let desc = BufferDescriptor {
        size: 0x1_2345_6789, // straddles the low/high word split
        usage: BufferUsage::COPY_DST | BufferUsage::STORAGE,
        mapped_at_creation: true,
    };

    let mut writer = DescriptorWriter::new();
    let ptr = writer.buffer_descriptor(&desc);
    let bytes = writer.finish();

    assert_eq!(decode::buffer_descriptor(&HeapView::new(&bytes), ptr), desc);
}

#[test]
fn texture_descriptor_roundtrip() {
    let desc = TextureDescriptor {
        view_formats: vec![Some("rgba8unorm"), Some("rgba8unorm-srgb")],
        size: [1024, 768, 1],
        mip_level_count: 11,
        sample_count: 1,
        dimension: Some("2d"),
        format: Some("bgra8unorm"),
        usage: TextureUsage::TEXTURE_BINDING | TextureUsage::RENDER_ATTACHMENT,
    };

    let mut writer = DescriptorWriter::new();
    let ptr = writer.texture_descriptor(&desc);
    let bytes = writer.finish();

    assert_eq!(decode::texture_descriptor(&HeapView::new(&bytes), ptr), desc);
}

#[test]
fn sampler_descriptor_roundtrip() {
    let desc = SamplerDescriptor {
        address_mode_u: Some("repeat"),
        address_mode_v: Some("clamp-to-edge"),
        address_mode_w: Some("mirror-repeat"),
        mag_filter: Some("linear"),
        min_filter: Some("nearest"),
        mipmap_filter: Some("linear"),
        lod_min_clamp: 0.0,
        lod_max_clamp: 32.0,
        compare: None, // optional field stays absent
        max_anisotropy: 16,
    };

    let mut writer = DescriptorWriter::new();
    let ptr = writer.sampler_descriptor(&desc);
    let bytes = writer.finish();

    assert_eq!(decode::sampler_descriptor(&HeapView::new(&bytes), ptr), desc);
}

#[test]
fn texture_view_descriptor_roundtrip() {
    let desc = TextureViewDescriptor {
        format: Some("depth24plus"),
        dimension: Some("2d-array"),
        aspect: Some("depth-only"),
        base_mip_level: 2,
        mip_level_count: Some(3),
        base_array_layer: 1,
        array_layer_count: None, // to the end
    };

    let mut writer = DescriptorWriter::new();
    let ptr = writer.texture_view_descriptor(&desc);
    let bytes = writer.finish();

    assert_eq!(
        decode::texture_view_descriptor(&HeapView::new(&bytes), ptr),
        desc
    );
}

#[test]
fn bind_group_layout_entries_roundtrip_all_variants() {
    let entries = vec![
        BindGroupLayoutEntry {
            binding: 0,
            visibility: ShaderStage::VERTEX | ShaderStage::FRAGMENT,
            ty: BindingLayoutType::Buffer {
                ty: Some("uniform"),
                has_dynamic_offset: true,
                min_binding_size: 256,
            },
        },
        BindGroupLayoutEntry {
            binding: 1,
            visibility: ShaderStage::FRAGMENT,
            ty: BindingLayoutType::Sampler {
                ty: Some("filtering"),
            },
        },
        BindGroupLayoutEntry {
            binding: 2,
            visibility: ShaderStage::FRAGMENT,
            ty: BindingLayoutType::Texture {
                sample_type: Some("float"),
                view_dimension: Some("cube"),
                multisampled: false,
            },
        },
        BindGroupLayoutEntry {
            binding: 3,
            visibility: ShaderStage::COMPUTE,
            ty: BindingLayoutType::StorageTexture {
                access: Some("write-only"),
                format: Some("rgba16float"),
                view_dimension: Some("2d"),
            },
        },
        BindGroupLayoutEntry {
            binding: 4,
            visibility: ShaderStage::FRAGMENT,
            ty: BindingLayoutType::ExternalTexture,
        },
    ];

    let mut writer = DescriptorWriter::new();
    let ptr = writer.bind_group_layout_entries(&entries);
    let bytes = writer.finish();

    assert_eq!(
        decode::bind_group_layout_entries(&HeapView::new(&bytes), ptr, entries.len() as u32),
        entries
    );
}

#[test]
fn bind_group_entries_roundtrip() {
    let entries = vec![
        BindGroupEntry {
            binding: 0,
            resource: 7,
            offset: 64,
            size: Some(192),
        },
        BindGroupEntry {
            binding: 1,
            resource: 9,
            offset: 0,
            size: None, // whole buffer
        },
    ];

    let mut writer = DescriptorWriter::new();
    let ptr = writer.bind_group_entries(&entries);
    let bytes = writer.finish();

    assert_eq!(
        decode::bind_group_entries(&HeapView::new(&bytes), ptr, entries.len() as u32),
        entries
    );
}

fn full_render_pipeline() -> RenderPipelineDescriptor<'static> {
    RenderPipelineDescriptor {
        vertex: VertexState {
            module: 12,
            entry_point: Some("vs_main"),
            buffers: vec![
                VertexBufferLayout {
                    array_stride: 32,
                    step_mode: Some("vertex"),
                    attributes: vec![
                        VertexAttribute {
                            offset: 0,
                            shader_location: 0,
                            format: Some("float32x3"),
                        },
                        VertexAttribute {
                            offset: 12,
                            shader_location: 1,
                            format: Some("float32x2"),
                        },
                    ],
                },
                VertexBufferLayout {
                    array_stride: 16,
                    step_mode: Some("instance"),
                    attributes: vec![VertexAttribute {
                        offset: 0,
                        shader_location: 2,
                        format: Some("float32x4"),
                    }],
                },
            ],
            constants: vec![ConstantEntry {
                name: "scale",
                value: 2.5,
            }],
        },
        primitive: PrimitiveState {
            topology: Some("triangle-list"),
            strip_index_format: None,
            front_face: Some("ccw"),
            cull_mode: Some("back"),
            unclipped_depth: false,
        },
        depth_stencil: Some(DepthStencilState {
            format: Some("depth24plus-stencil8"),
            depth_write_enabled: true,
            depth_compare: Some("less"),
            stencil_read_mask: 0xFF,
            stencil_write_mask: 0x0F,
            depth_bias: -2,
            depth_bias_slope_scale: 1.25,
            depth_bias_clamp: 0.5,
            stencil_front: StencilFaceState {
                compare: Some("always"),
                fail_op: Some("keep"),
                depth_fail_op: Some("increment-clamp"),
                pass_op: Some("replace"),
            },
            stencil_back: StencilFaceState {
                compare: Some("never"),
                fail_op: Some("zero"),
                depth_fail_op: Some("decrement-wrap"),
                pass_op: Some("invert"),
            },
        }),
        multisample: Some(MultisampleState {
            count: 4,
            mask: 0xFFFF_FFFF,
            alpha_to_coverage_enabled: true,
        }),
        fragment: Some(FragmentState {
            module: 13,
            entry_point: Some("fs_main"),
            targets: vec![
                Some(ColorTargetState {
                    format: Some("bgra8unorm"),
                    blend: Some(BlendState {
                        color: BlendComponent {
                            operation: Some("add"),
                            src_factor: Some("src-alpha"),
                            dst_factor: Some("one-minus-src-alpha"),
                        },
                        alpha: BlendComponent {
                            operation: Some("add"),
                            src_factor: Some("one"),
                            dst_factor: Some("zero"),
                        },
                    }),
                    write_mask: ColorWrite::ALL,
                }),
                None, // sparse target
                Some(ColorTargetState {
                    format: Some("rgba16float"),
                    blend: None,
                    write_mask: ColorWrite::RED | ColorWrite::GREEN,
                }),
            ],
            constants: vec![],
        }),
        layout: LayoutRef::Handle(21),
    }
}

#[test]
fn render_pipeline_descriptor_roundtrip() {
    let desc = full_render_pipeline();

    let mut writer = DescriptorWriter::new();
    let ptr = writer.render_pipeline_descriptor(&desc);
    let bytes = writer.finish();

    assert_eq!(
        decode::render_pipeline_descriptor(&HeapView::new(&bytes), ptr),
        desc
    );
}

#[test]
fn render_pipeline_omits_gated_substructures() {
    let desc = RenderPipelineDescriptor {
        vertex: VertexState {
            module: 3,
            entry_point: None,
            buffers: vec![],
            constants: vec![],
        },
        primitive: PrimitiveState {
            topology: Some("triangle-strip"),
            strip_index_format: Some("uint16"),
            front_face: None,
            cull_mode: None,
            unclipped_depth: false,
        },
        depth_stencil: None,
        multisample: None,
        fragment: None,
        layout: LayoutRef::Auto,
    };

    let mut writer = DescriptorWriter::new();
    let ptr = writer.render_pipeline_descriptor(&desc);
    let bytes = writer.finish();

    let decoded = decode::render_pipeline_descriptor(&HeapView::new(&bytes), ptr);
    assert_eq!(decoded.depth_stencil, None);
    assert_eq!(decoded.multisample, None);
    assert_eq!(decoded.fragment, None);
    assert_eq!(decoded.layout, LayoutRef::Auto);
    assert_eq!(decoded, desc);
}

#[test]
fn render_pass_descriptor_roundtrip() {
    let desc = RenderPassDescriptor {
        max_draw_count: None,
        color_attachments: vec![
            Some(RenderPassColorAttachment {
                view: 4,
                depth_slice: None,
                resolve_target: Some(6),
                store_op: Some("store"),
                load_op: Some("clear"),
                clear_value: [0.1, 0.2, 0.3, 1.0],
            }),
            None, // sparse attachment slot
        ],
        depth_stencil_attachment: Some(RenderPassDepthStencilAttachment {
            view: 5,
            depth_load_op: Some("clear"),
            depth_clear_value: 1.0,
            depth_store_op: Some("store"),
            depth_read_only: false,
            stencil_load_op: Some("load"),
            stencil_clear_value: 0,
            stencil_store_op: Some("discard"),
            stencil_read_only: true,
        }),
        occlusion_query_set: None,
        timestamp_writes: Some(TimestampWrites {
            query_set: 8,
            beginning_of_pass_write_index: Some(0),
            end_of_pass_write_index: None,
        }),
    };

    let mut writer = DescriptorWriter::new();
    let ptr = writer.render_pass_descriptor(&desc);
    let bytes = writer.finish();

    assert_eq!(
        decode::render_pass_descriptor(&HeapView::new(&bytes), ptr),
        desc
    );
}

#[test]
fn render_pass_without_depth_stencil_or_timestamps() {
    let desc = RenderPassDescriptor {
        max_draw_count: Some(1_000_000),
        color_attachments: vec![Some(RenderPassColorAttachment {
            view: 2,
            depth_slice: Some(0),
            resolve_target: None,
            store_op: Some("store"),
            load_op: Some("load"),
            clear_value: [0.0; 4],
        })],
        depth_stencil_attachment: None,
        occlusion_query_set: Some(9),
        timestamp_writes: None,
    };

    let mut writer = DescriptorWriter::new();
    let ptr = writer.render_pass_descriptor(&desc);
    let bytes = writer.finish();

    assert_eq!(
        decode::render_pass_descriptor(&HeapView::new(&bytes), ptr),
        desc
    );
}

#[test]
fn compute_pass_descriptor_roundtrip() {
    for desc in [
        ComputePassDescriptor {
            timestamp_writes: None,
        },
        ComputePassDescriptor {
            timestamp_writes: Some(TimestampWrites {
                query_set: 3,
                beginning_of_pass_write_index: None,
                end_of_pass_write_index: Some(1),
            }),
        },
    ] {
        let mut writer = DescriptorWriter::new();
        let ptr = writer.compute_pass_descriptor(&desc);
        let bytes = writer.finish();

        assert_eq!(
            decode::compute_pass_descriptor(&HeapView::new(&bytes), ptr),
            desc
        );
    }
}

#[test]
fn image_copy_roundtrips() {
    let buffer_side = ImageCopyBuffer {
        buffer: 14,
        offset: 0x1_0000_0010,
        bytes_per_row: Some(4096),
        rows_per_image: None,
    };
    let texture_side = ImageCopyTexture {
        texture: 15,
        mip_level: 2,
        origin: [64, 32, 0],
        aspect: Some("all"),
    };

    let mut writer = DescriptorWriter::new();
    let buffer_ptr = writer.image_copy_buffer(&buffer_side);
    let texture_ptr = writer.image_copy_texture(&texture_side);
    let bytes = writer.finish();
    let heap = HeapView::new(&bytes);

    assert_eq!(decode::image_copy_buffer(&heap, buffer_ptr), buffer_side);
    assert_eq!(decode::image_copy_texture(&heap, texture_ptr), texture_side);
}

#[test]
fn render_bundle_encoder_and_query_set_roundtrip() {
    let bundle = RenderBundleEncoderDescriptor {
        color_formats: vec![Some("bgra8unorm"), None, Some("rgba16float")],
        depth_stencil_format: Some("depth24plus"),
        sample_count: 4,
    };
    let query_set = QuerySetDescriptor {
        ty: Some("timestamp"),
        count: 64,
    };

    let mut writer = DescriptorWriter::new();
    let bundle_ptr = writer.render_bundle_encoder_descriptor(&bundle);
    let query_ptr = writer.query_set_descriptor(&query_set);
    let bytes = writer.finish();
    let heap = HeapView::new(&bytes);

    assert_eq!(
        decode::render_bundle_encoder_descriptor(&heap, bundle_ptr),
        bundle
    );
    assert_eq!(decode::query_set_descriptor(&heap, query_ptr), query_set);
}

#[test]
fn adapter_options_and_device_descriptor_roundtrip() {
    let options = AdapterOptions {
        power_preference: Some("high-performance"),
        force_fallback_adapter: false,
    };
    let mut limits = SupportedLimits::default();
    limits.limits_u64[2] = 1 << 33; // maxBufferSize, needs the high word
    limits.limits_u32[4] = 8; // maxBindGroups
    let device = DeviceDescriptor {
        required_limits: limits,
        default_queue_label: Some("default queue"),
        required_features: 0b101,
    };

    let mut writer = DescriptorWriter::new();
    let options_ptr = writer.adapter_options(&options);
    let device_ptr = writer.device_descriptor(&device);
    let bytes = writer.finish();
    let heap = HeapView::new(&bytes);

    assert_eq!(decode::adapter_options(&heap, options_ptr), options);
    assert_eq!(decode::device_descriptor(&heap, device_ptr), device);
}

#[test]
fn canvas_configuration_size_is_presence_gated() {
    let explicit = CanvasConfiguration {
        device: 3,
        format: Some("bgra8unorm"),
        usage: TextureUsage::RENDER_ATTACHMENT,
        view_formats: vec![Some("bgra8unorm-srgb")],
        color_space: Some("srgb"),
        tone_mapping_mode: Some("standard"),
        alpha_mode: Some("opaque"),
        size: Some([800, 600]),
    };
    let from_canvas = CanvasConfiguration {
        size: None,
        view_formats: vec![],
        ..explicit.clone()
    };

    let mut writer = DescriptorWriter::new();
    let explicit_ptr = writer.canvas_configuration(&explicit);
    let implicit_ptr = writer.canvas_configuration(&from_canvas);
    let bytes = writer.finish();
    let heap = HeapView::new(&bytes);

    assert_eq!(decode::canvas_configuration(&heap, explicit_ptr), explicit);
    let decoded = decode::canvas_configuration(&heap, implicit_ptr);
    assert_eq!(decoded.size, None);
    assert_eq!(decoded, from_canvas);
}

#[test]
fn shader_module_and_constants_roundtrip() {
    let module = ShaderModuleDescriptor {
        code: "@vertex fn vs_main() -> @builtin(position) vec4f { return vec4f(0.0); }",
    };
    let constant_list = vec![
        ConstantEntry {
            name: "alpha_cutoff",
            value: 0.25,
        },
        ConstantEntry {
            name: "debug_level",
            value: 3.0,
        },
    ];

    let mut writer = DescriptorWriter::new();
    let module_ptr = writer.shader_module_descriptor(&module);
    let constants_ptr = writer.constants(&constant_list);
    let bytes = writer.finish();
    let heap = HeapView::new(&bytes);

    assert_eq!(decode::shader_module_descriptor(&heap, module_ptr), module);
    assert_eq!(
        decode::constants(&heap, constants_ptr, constant_list.len() as u32),
        constant_list
    );
}
