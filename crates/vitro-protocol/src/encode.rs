//! Safe descriptor block builder.
//!
//! [`DescriptorWriter`] emits the exact layouts documented in [`crate::decode`]
//! (correct word alignment, split 64-bit fields, `(count, pointer)` sections,
//! zero-as-absent discriminants) into one growing byte arena. It exists for
//! tests/fixtures and host-side tooling that needs to author canonical
//! descriptor blocks; production callers author the blocks in their own
//! language against the same schemas.
//!
//! Sub-blocks (strings, arrays) are written before the block that points at
//! them, so every `ptr` returned by a method is final. Offset `0` is kept
//! unused so it remains the null pointer.

use crate::enums::{self, EnumTable};
use crate::{descriptors::*, Handle, Ptr};

#[derive(Debug, Clone)]
pub struct DescriptorWriter {
    buf: Vec<u8>,
}

impl Default for DescriptorWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl DescriptorWriter {
    pub fn new() -> Self {
        // Burn the first word so no real block lands at offset 0.
        Self { buf: vec![0; 4] }
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }

    fn here(&self) -> Ptr {
        self.buf.len() as Ptr
    }

    fn align4(&mut self) {
        while self.buf.len() % 4 != 0 {
            self.buf.push(0);
        }
    }

    fn push_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn push_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn push_f32(&mut self, v: f32) {
        self.push_u32(v.to_bits());
    }

    /// Low word first, then high, matching the split-64-bit layout rule.
    fn push_u64(&mut self, v: u64) {
        self.push_u32((v & 0xFFFF_FFFF) as u32);
        self.push_u32((v >> 32) as u32);
    }

    fn push_f64(&mut self, v: f64) {
        self.push_u64(v.to_bits());
    }

    fn push_handle(&mut self, h: Handle) {
        self.push_i32(h);
    }

    fn push_bool(&mut self, v: bool) {
        self.push_u32(v as u32);
    }

    fn push_enum(&mut self, table: &EnumTable, value: Option<&str>) {
        self.push_u32(value.map_or(0, |v| table.index_of(v)));
    }

    /// Writes a NUL-terminated string and returns its offset.
    pub fn str(&mut self, s: &str) -> Ptr {
        let ptr = self.here();
        self.buf.extend_from_slice(s.as_bytes());
        self.buf.push(0);
        self.align4();
        ptr
    }

    fn opt_str(&mut self, s: Option<&str>) -> Ptr {
        match s {
            Some(s) => self.str(s),
            None => 0,
        }
    }

    pub fn shader_module_descriptor(&mut self, desc: &ShaderModuleDescriptor<'_>) -> Ptr {
        let code = self.str(desc.code);
        let ptr = self.here();
        self.push_u32(code);
        self.push_u32(0); // reserved
        ptr
    }

    pub fn buffer_descriptor(&mut self, desc: &BufferDescriptor) -> Ptr {
        let ptr = self.here();
        self.push_u64(desc.size);
        self.push_u32(desc.usage.bits());
        self.push_bool(desc.mapped_at_creation);
        ptr
    }

    pub fn texture_descriptor(&mut self, desc: &TextureDescriptor) -> Ptr {
        let view_formats =
            self.enum_array(&enums::TEXTURE_AND_VERTEX_FORMATS, &desc.view_formats);
        let ptr = self.here();
        self.push_u32(desc.view_formats.len() as u32);
        self.push_u32(view_formats);
        for d in desc.size {
            self.push_u32(d);
        }
        self.push_u32(desc.mip_level_count);
        self.push_u32(desc.sample_count);
        self.push_enum(&enums::TEXTURE_DIMENSIONS, desc.dimension);
        self.push_enum(&enums::TEXTURE_AND_VERTEX_FORMATS, desc.format);
        self.push_u32(desc.usage.bits());
        ptr
    }

    pub fn sampler_descriptor(&mut self, desc: &SamplerDescriptor) -> Ptr {
        let ptr = self.here();
        self.push_enum(&enums::ADDRESS_MODES, desc.address_mode_u);
        self.push_enum(&enums::ADDRESS_MODES, desc.address_mode_v);
        self.push_enum(&enums::ADDRESS_MODES, desc.address_mode_w);
        self.push_enum(&enums::FILTER_MODES, desc.mag_filter);
        self.push_enum(&enums::FILTER_MODES, desc.min_filter);
        self.push_enum(&enums::FILTER_MODES, desc.mipmap_filter);
        self.push_f32(desc.lod_min_clamp);
        self.push_f32(desc.lod_max_clamp);
        self.push_enum(&enums::COMPARE_FUNCTIONS, desc.compare);
        self.push_u32(desc.max_anisotropy);
        ptr
    }

    pub fn texture_view_descriptor(&mut self, desc: &TextureViewDescriptor) -> Ptr {
        let ptr = self.here();
        self.push_enum(&enums::TEXTURE_AND_VERTEX_FORMATS, desc.format);
        self.push_enum(&enums::TEXTURE_VIEW_DIMENSIONS, desc.dimension);
        self.push_enum(&enums::TEXTURE_ASPECTS, desc.aspect);
        self.push_u32(desc.base_mip_level);
        self.push_u32(desc.mip_level_count.unwrap_or(0));
        self.push_u32(desc.base_array_layer);
        self.push_u32(desc.array_layer_count.unwrap_or(0));
        self.push_u32(0); // reserved
        ptr
    }

    pub fn bind_group_layout_entries(&mut self, entries: &[BindGroupLayoutEntry]) -> Ptr {
        let ptr = self.here();
        for e in entries {
            self.push_u32(e.binding);
            self.push_u32(e.visibility.bits());
            match &e.ty {
                BindingLayoutType::Buffer {
                    ty,
                    has_dynamic_offset,
                    min_binding_size,
                } => {
                    self.push_u32(1);
                    self.push_u32(0); // reserved
                    self.push_enum(&enums::BUFFER_BINDING_TYPES, *ty);
                    self.push_bool(*has_dynamic_offset);
                    self.push_u64(*min_binding_size);
                }
                BindingLayoutType::Sampler { ty } => {
                    self.push_u32(2);
                    self.push_u32(0);
                    self.push_enum(&enums::SAMPLER_BINDING_TYPES, *ty);
                    self.push_u32(0);
                    self.push_u64(0);
                }
                BindingLayoutType::Texture {
                    sample_type,
                    view_dimension,
                    multisampled,
                } => {
                    self.push_u32(3);
                    self.push_u32(0);
                    self.push_enum(&enums::TEXTURE_SAMPLE_TYPES, *sample_type);
                    self.push_enum(&enums::TEXTURE_VIEW_DIMENSIONS, *view_dimension);
                    self.push_bool(*multisampled);
                    self.push_u32(0);
                }
                BindingLayoutType::StorageTexture {
                    access,
                    format,
                    view_dimension,
                } => {
                    self.push_u32(4);
                    self.push_u32(0);
                    self.push_enum(&enums::STORAGE_TEXTURE_ACCESS, *access);
                    self.push_enum(&enums::TEXTURE_AND_VERTEX_FORMATS, *format);
                    self.push_enum(&enums::TEXTURE_VIEW_DIMENSIONS, *view_dimension);
                    self.push_u32(0);
                }
                BindingLayoutType::ExternalTexture => {
                    self.push_u32(5);
                    self.push_u32(0);
                    self.push_u32(0);
                    self.push_u32(0);
                    self.push_u64(0);
                }
            }
        }
        ptr
    }

    pub fn bind_group_entries(&mut self, entries: &[BindGroupEntry]) -> Ptr {
        let ptr = self.here();
        for e in entries {
            self.push_u32(e.binding);
            self.push_handle(e.resource);
            self.push_u64(e.offset);
            self.push_u64(e.size.unwrap_or(0));
        }
        ptr
    }

    pub fn handle_array(&mut self, handles: &[Handle]) -> Ptr {
        let ptr = self.here();
        for &h in handles {
            self.push_handle(h);
        }
        ptr
    }

    pub fn enum_array(&mut self, table: &EnumTable, values: &[Option<&'static str>]) -> Ptr {
        let ptr = self.here();
        for &v in values {
            self.push_enum(table, v);
        }
        ptr
    }

    pub fn constants(&mut self, constants: &[ConstantEntry<'_>]) -> Ptr {
        let names: Vec<Ptr> = constants.iter().map(|c| self.str(c.name)).collect();
        let ptr = self.here();
        for (c, name) in constants.iter().zip(names) {
            self.push_u32(name);
            self.push_u32(0); // reserved
            self.push_f64(c.value);
        }
        ptr
    }

    fn stencil_face_state(&mut self, state: &StencilFaceState) {
        self.push_enum(&enums::COMPARE_FUNCTIONS, state.compare);
        self.push_enum(&enums::STENCIL_OPERATIONS, state.fail_op);
        self.push_enum(&enums::STENCIL_OPERATIONS, state.depth_fail_op);
        self.push_enum(&enums::STENCIL_OPERATIONS, state.pass_op);
    }

    fn vertex_buffer_layouts(&mut self, buffers: &[VertexBufferLayout]) -> Ptr {
        let attribute_ptrs: Vec<Ptr> = buffers
            .iter()
            .map(|b| {
                let ptr = self.here();
                for a in &b.attributes {
                    self.push_u64(a.offset);
                    self.push_u32(a.shader_location);
                    self.push_enum(&enums::TEXTURE_AND_VERTEX_FORMATS, a.format);
                }
                ptr
            })
            .collect();

        let ptr = self.here();
        for (b, attrs) in buffers.iter().zip(attribute_ptrs) {
            self.push_u64(b.array_stride);
            self.push_enum(&enums::VERTEX_STEP_MODES, b.step_mode);
            self.push_u32(b.attributes.len() as u32);
            self.push_u32(if b.attributes.is_empty() { 0 } else { attrs });
            self.push_u32(0); // reserved
        }
        ptr
    }

    fn color_targets(&mut self, targets: &[Option<ColorTargetState>]) -> Ptr {
        let ptr = self.here();
        for t in targets {
            match t {
                Some(t) => {
                    self.push_enum(&enums::TEXTURE_AND_VERTEX_FORMATS, t.format);
                    match &t.blend {
                        Some(blend) => {
                            self.blend_component(&blend.color);
                            self.blend_component(&blend.alpha);
                        }
                        None => {
                            for _ in 0..6 {
                                self.push_u32(0);
                            }
                        }
                    }
                    self.push_u32(t.write_mask.bits());
                }
                // Sparse target: format 0, rest zeroed.
                None => {
                    for _ in 0..8 {
                        self.push_u32(0);
                    }
                }
            }
        }
        ptr
    }

    fn blend_component(&mut self, c: &BlendComponent) {
        self.push_enum(&enums::BLEND_OPERATIONS, c.operation);
        self.push_enum(&enums::BLEND_FACTORS, c.src_factor);
        self.push_enum(&enums::BLEND_FACTORS, c.dst_factor);
    }

    pub fn render_pipeline_descriptor(&mut self, desc: &RenderPipelineDescriptor<'_>) -> Ptr {
        let vertex_entry = self.opt_str(desc.vertex.entry_point);
        let vertex_buffers = self.vertex_buffer_layouts(&desc.vertex.buffers);
        let vertex_constants = self.constants(&desc.vertex.constants);
        let fragment_parts = desc.fragment.as_ref().map(|f| {
            (
                self.opt_str(f.entry_point),
                self.color_targets(&f.targets),
                self.constants(&f.constants),
                f,
            )
        });

        let ptr = self.here();

        // Vertex state.
        self.push_handle(desc.vertex.module);
        self.push_u32(vertex_entry);
        self.push_u32(desc.vertex.buffers.len() as u32);
        self.push_u32(if desc.vertex.buffers.is_empty() { 0 } else { vertex_buffers });
        self.push_u32(desc.vertex.constants.len() as u32);
        self.push_u32(if desc.vertex.constants.is_empty() { 0 } else { vertex_constants });

        // Primitive state.
        self.push_enum(&enums::PRIMITIVE_TOPOLOGIES, desc.primitive.topology);
        self.push_enum(&enums::INDEX_FORMATS, desc.primitive.strip_index_format);
        self.push_enum(&enums::FRONT_FACES, desc.primitive.front_face);
        self.push_enum(&enums::CULL_MODES, desc.primitive.cull_mode);
        self.push_bool(desc.primitive.unclipped_depth);

        // Depth-stencil state, format word as the discriminant.
        match &desc.depth_stencil {
            Some(ds) => {
                self.push_enum(&enums::TEXTURE_AND_VERTEX_FORMATS, ds.format);
                self.push_bool(ds.depth_write_enabled);
                self.push_enum(&enums::COMPARE_FUNCTIONS, ds.depth_compare);
                self.push_u32(ds.stencil_read_mask);
                self.push_u32(ds.stencil_write_mask);
                self.push_i32(ds.depth_bias);
                self.push_f32(ds.depth_bias_slope_scale);
                self.push_f32(ds.depth_bias_clamp);
                self.stencil_face_state(&ds.stencil_front);
                self.stencil_face_state(&ds.stencil_back);
            }
            None => {
                for _ in 0..16 {
                    self.push_u32(0);
                }
            }
        }

        // Multisample state, count word as the discriminant.
        match &desc.multisample {
            Some(ms) => {
                self.push_u32(ms.count);
                self.push_u32(ms.mask);
                self.push_bool(ms.alpha_to_coverage_enabled);
            }
            None => {
                for _ in 0..3 {
                    self.push_u32(0);
                }
            }
        }

        // Fragment state, module word as the discriminant.
        match fragment_parts {
            Some((entry, targets, constants, f)) => {
                self.push_handle(f.module);
                self.push_u32(entry);
                self.push_u32(f.targets.len() as u32);
                self.push_u32(if f.targets.is_empty() { 0 } else { targets });
                self.push_u32(f.constants.len() as u32);
                self.push_u32(if f.constants.is_empty() { 0 } else { constants });
            }
            None => {
                for _ in 0..6 {
                    self.push_u32(0);
                }
            }
        }

        self.push_handle(desc.layout.to_word());
        ptr
    }

    pub fn render_bundle_encoder_descriptor(
        &mut self,
        desc: &RenderBundleEncoderDescriptor,
    ) -> Ptr {
        let formats = self.enum_array(&enums::TEXTURE_AND_VERTEX_FORMATS, &desc.color_formats);
        let ptr = self.here();
        self.push_u32(desc.color_formats.len() as u32);
        self.push_u32(formats);
        self.push_enum(&enums::TEXTURE_AND_VERTEX_FORMATS, desc.depth_stencil_format);
        self.push_u32(desc.sample_count);
        ptr
    }

    pub fn query_set_descriptor(&mut self, desc: &QuerySetDescriptor) -> Ptr {
        let ptr = self.here();
        self.push_enum(&enums::QUERY_TYPES, desc.ty);
        self.push_u32(desc.count);
        ptr
    }

    fn timestamp_writes(&mut self, writes: &Option<TimestampWrites>) {
        match writes {
            Some(tw) => {
                self.push_handle(tw.query_set);
                self.push_i32(tw.beginning_of_pass_write_index.map_or(-1, |i| i as i32));
                self.push_i32(tw.end_of_pass_write_index.map_or(-1, |i| i as i32));
            }
            None => {
                for _ in 0..3 {
                    self.push_u32(0);
                }
            }
        }
    }

    pub fn render_pass_descriptor(&mut self, desc: &RenderPassDescriptor) -> Ptr {
        let attachments = self.here();
        for a in &desc.color_attachments {
            match a {
                Some(a) => {
                    self.push_handle(a.view);
                    self.push_i32(a.depth_slice.map_or(-1, |i| i as i32));
                    self.push_handle(a.resolve_target.unwrap_or(0));
                    self.push_enum(&enums::STORE_OPS, a.store_op);
                    self.push_enum(&enums::LOAD_OPS, a.load_op);
                    self.push_u32(0); // reserved
                    for c in a.clear_value {
                        self.push_f64(c);
                    }
                }
                // Sparse attachment: view 0, rest zeroed.
                None => {
                    for _ in 0..14 {
                        self.push_u32(0);
                    }
                }
            }
        }

        let ptr = self.here();
        self.push_u64(desc.max_draw_count.unwrap_or(0));
        self.push_u32(desc.color_attachments.len() as u32);
        self.push_u32(if desc.color_attachments.is_empty() { 0 } else { attachments });
        match &desc.depth_stencil_attachment {
            Some(ds) => {
                self.push_handle(ds.view);
                self.push_enum(&enums::LOAD_OPS, ds.depth_load_op);
                self.push_f32(ds.depth_clear_value);
                self.push_enum(&enums::STORE_OPS, ds.depth_store_op);
                self.push_bool(ds.depth_read_only);
                self.push_enum(&enums::LOAD_OPS, ds.stencil_load_op);
                self.push_u32(ds.stencil_clear_value);
                self.push_enum(&enums::STORE_OPS, ds.stencil_store_op);
                self.push_bool(ds.stencil_read_only);
            }
            None => {
                for _ in 0..9 {
                    self.push_u32(0);
                }
            }
        }
        self.push_handle(desc.occlusion_query_set.unwrap_or(0));
        self.timestamp_writes(&desc.timestamp_writes);
        ptr
    }

    pub fn compute_pass_descriptor(&mut self, desc: &ComputePassDescriptor) -> Ptr {
        let ptr = self.here();
        self.timestamp_writes(&desc.timestamp_writes);
        ptr
    }

    pub fn image_copy_buffer(&mut self, desc: &ImageCopyBuffer) -> Ptr {
        let ptr = self.here();
        self.push_handle(desc.buffer);
        self.push_u64(desc.offset);
        self.push_u32(desc.bytes_per_row.unwrap_or(0));
        self.push_u32(desc.rows_per_image.unwrap_or(0));
        self.push_u32(0); // reserved
        ptr
    }

    pub fn image_copy_texture(&mut self, desc: &ImageCopyTexture) -> Ptr {
        let ptr = self.here();
        self.push_handle(desc.texture);
        self.push_u32(desc.mip_level);
        for o in desc.origin {
            self.push_u32(o);
        }
        self.push_enum(&enums::TEXTURE_ASPECTS, desc.aspect);
        self.push_u32(0); // reserved
        self.push_u32(0); // reserved
        ptr
    }

    pub fn adapter_options(&mut self, options: &AdapterOptions) -> Ptr {
        let ptr = self.here();
        self.push_enum(&enums::POWER_PREFERENCES, options.power_preference);
        self.push_bool(options.force_fallback_adapter);
        ptr
    }

    pub fn device_descriptor(&mut self, desc: &DeviceDescriptor<'_>) -> Ptr {
        let queue_label = self.opt_str(desc.default_queue_label);
        let ptr = self.here();
        for limit in desc.required_limits.limits_u64 {
            self.push_u64(limit);
        }
        for limit in desc.required_limits.limits_u32 {
            self.push_u32(limit);
        }
        self.push_u32(queue_label);
        self.push_u32(0); // reserved
        self.push_u32(desc.required_features);
        ptr
    }

    pub fn canvas_configuration(&mut self, config: &CanvasConfiguration) -> Ptr {
        let view_formats =
            self.enum_array(&enums::TEXTURE_AND_VERTEX_FORMATS, &config.view_formats);
        let ptr = self.here();
        self.push_handle(config.device);
        self.push_enum(&enums::TEXTURE_AND_VERTEX_FORMATS, config.format);
        self.push_u32(config.usage.bits());
        self.push_u32(config.view_formats.len() as u32);
        self.push_u32(if config.view_formats.is_empty() { 0 } else { view_formats });
        self.push_enum(&enums::PREDEFINED_COLOR_SPACES, config.color_space);
        self.push_enum(&enums::TONE_MAPPING_MODES, config.tone_mapping_mode);
        self.push_enum(&enums::ALPHA_MODES, config.alpha_mode);
        match config.size {
            Some([width, height]) => {
                self.push_u32(width);
                self.push_u32(height);
            }
            None => {
                self.push_u32(0);
                self.push_u32(0);
            }
        }
        self.push_u32(0); // reserved
        self.push_u32(0); // reserved
        ptr
    }
}
