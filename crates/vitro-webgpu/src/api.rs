//! Interface to the browser-side WebGPU implementation.
//!
//! The bridge treats the implementation as an external collaborator: it
//! creates objects from structured descriptors, destroys them, and resolves
//! promise-like asynchronous operations through completion senders. The trait
//! is kept flat and mechanical so it can be implemented both against real
//! browser bindings and as the scripted in-memory [`crate::fake::FakeApi`]
//! used by tests.
//!
//! Creation methods return `None` on failure; the registry surfaces that as
//! the invalid handle. Asynchronous methods take a [`CompletionSender`] (or
//! register a standing [`ErrorSink`]) and must eventually resolve it exactly
//! once.
//!
//! Descriptors arrive with handles already resolved where an implementation
//! needs the underlying object: bind group entries are pre-shaped into
//! buffer/non-buffer form, pipeline descriptors carry their shader module
//! references, and render passes carry their attachment views.

use vitro_protocol::{
    AdapterOptions, BufferDescriptor, CanvasConfiguration, ComputePassDescriptor, ConstantEntry,
    DeviceDescriptor, MapMode, QuerySetDescriptor, RenderBundleEncoderDescriptor,
    RenderPassDescriptor, RenderPipelineDescriptor, SamplerDescriptor, ShaderModuleDescriptor,
    SupportedLimits, TextureDescriptor, TextureViewDescriptor,
};

use crate::completion::{CompletionSender, DeviceLostReason, ErrorSink, GpuError};
use crate::object::ExternalRef;
use vitro_protocol::BindGroupLayoutEntry;

/// A device together with its default queue, delivered by device acquisition.
pub struct DeviceObjects {
    pub device: ExternalRef,
    pub queue: ExternalRef,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceLost {
    pub reason: DeviceLostReason,
    pub message: String,
}

/// A decoded image, delivered by the asynchronous image decode operation.
pub struct DecodedImage {
    pub bitmap: ExternalRef,
    pub width: u32,
    pub height: u32,
}

/// A bind group entry with its resource resolved and shaped.
///
/// Buffer-like resources bind as `{buffer, offset, size}`; everything else
/// binds bare. The registry performs the shaping because only it knows the
/// kind behind a handle.
pub enum ResolvedBindingResource {
    Buffer {
        buffer: ExternalRef,
        offset: u64,
        /// `None` binds the whole buffer.
        size: Option<u64>,
    },
    Other(ExternalRef),
}

pub struct ResolvedBindGroupEntry {
    pub binding: u32,
    pub resource: ResolvedBindingResource,
}

/// A render pipeline descriptor with its cross-references resolved.
pub struct ResolvedRenderPipeline<'d, 'a> {
    pub desc: &'d RenderPipelineDescriptor<'a>,
    pub vertex_module: ExternalRef,
    pub fragment_module: Option<ExternalRef>,
    /// `None` selects automatic pipeline layout.
    pub layout: Option<ExternalRef>,
}

/// Compute pipeline creation arguments (the boundary passes these as plain
/// arguments rather than a descriptor block).
pub struct ResolvedComputePipeline<'a> {
    pub module: ExternalRef,
    pub entry_point: Option<&'a str>,
    pub constants: Vec<ConstantEntry<'a>>,
    pub layout: Option<ExternalRef>,
}

/// A render pass descriptor with its attachment views resolved. Entries are
/// positionally parallel to the descriptor's attachment list; sparse slots
/// stay `None`.
pub struct ResolvedRenderPass<'d> {
    pub desc: &'d RenderPassDescriptor,
    pub color_views: Vec<Option<ExternalRef>>,
    pub resolve_targets: Vec<Option<ExternalRef>>,
    pub depth_stencil_view: Option<ExternalRef>,
    pub occlusion_query_set: Option<ExternalRef>,
    pub timestamp_query_set: Option<ExternalRef>,
}

/// The browser-side WebGPU surface, one method per boundary call the bridge
/// forwards.
pub trait WebGpuApi {
    // Navigator.
    fn gpu_available(&self) -> bool;
    fn preferred_canvas_format(&self) -> &'static str;
    fn request_adapter(
        &self,
        options: Option<&AdapterOptions>,
        completion: CompletionSender<Option<ExternalRef>>,
    );

    // Canvas / presentation surface.
    fn canvas_context(&self, selector: &str) -> Option<ExternalRef>;
    fn configure_canvas(
        &self,
        context: &ExternalRef,
        device: &ExternalRef,
        config: &CanvasConfiguration,
    );
    fn unconfigure_canvas(&self, context: &ExternalRef);
    fn current_texture(&self, context: &ExternalRef) -> Option<ExternalRef>;

    // Adapter.
    fn adapter_features(&self, adapter: &ExternalRef) -> u32;
    fn adapter_limits(&self, adapter: &ExternalRef) -> SupportedLimits;
    fn request_device(
        &self,
        adapter: &ExternalRef,
        desc: &DeviceDescriptor<'_>,
        completion: CompletionSender<Option<DeviceObjects>>,
    );

    // Device error machinery.
    fn watch_device_lost(&self, device: &ExternalRef, completion: CompletionSender<DeviceLost>);
    fn set_uncaptured_error_sink(&self, device: &ExternalRef, sink: Option<ErrorSink>);
    fn push_error_scope(&self, device: &ExternalRef, filter: &'static str);
    fn pop_error_scope(
        &self,
        device: &ExternalRef,
        completion: CompletionSender<Option<GpuError>>,
    );

    // Device creation surface.
    fn create_buffer(&self, device: &ExternalRef, desc: &BufferDescriptor) -> Option<ExternalRef>;
    fn create_texture(&self, device: &ExternalRef, desc: &TextureDescriptor)
        -> Option<ExternalRef>;
    fn create_sampler(
        &self,
        device: &ExternalRef,
        desc: Option<&SamplerDescriptor>,
    ) -> Option<ExternalRef>;
    fn create_bind_group_layout(
        &self,
        device: &ExternalRef,
        entries: &[BindGroupLayoutEntry],
    ) -> Option<ExternalRef>;
    fn create_pipeline_layout(
        &self,
        device: &ExternalRef,
        bind_group_layouts: &[ExternalRef],
    ) -> Option<ExternalRef>;
    fn create_bind_group(
        &self,
        device: &ExternalRef,
        layout: &ExternalRef,
        entries: &[ResolvedBindGroupEntry],
    ) -> Option<ExternalRef>;
    fn create_shader_module(
        &self,
        device: &ExternalRef,
        desc: &ShaderModuleDescriptor<'_>,
    ) -> Option<ExternalRef>;
    fn create_render_pipeline(
        &self,
        device: &ExternalRef,
        pipeline: &ResolvedRenderPipeline<'_, '_>,
    ) -> Option<ExternalRef>;
    fn create_render_pipeline_async(
        &self,
        device: &ExternalRef,
        pipeline: &ResolvedRenderPipeline<'_, '_>,
        completion: CompletionSender<Result<ExternalRef, GpuError>>,
    );
    fn create_compute_pipeline(
        &self,
        device: &ExternalRef,
        pipeline: &ResolvedComputePipeline<'_>,
    ) -> Option<ExternalRef>;
    fn create_compute_pipeline_async(
        &self,
        device: &ExternalRef,
        pipeline: &ResolvedComputePipeline<'_>,
        completion: CompletionSender<Result<ExternalRef, GpuError>>,
    );
    fn create_command_encoder(&self, device: &ExternalRef) -> Option<ExternalRef>;
    fn create_render_bundle_encoder(
        &self,
        device: &ExternalRef,
        desc: &RenderBundleEncoderDescriptor,
    ) -> Option<ExternalRef>;
    fn create_query_set(
        &self,
        device: &ExternalRef,
        desc: &QuerySetDescriptor,
    ) -> Option<ExternalRef>;
    fn import_external_texture(
        &self,
        device: &ExternalRef,
        source: &ExternalRef,
    ) -> Option<ExternalRef>;
    fn decode_image_bitmap(
        &self,
        url: &str,
        flip_y: bool,
        completion: CompletionSender<Result<DecodedImage, GpuError>>,
    );

    // Texture.
    fn create_texture_view(
        &self,
        texture: &ExternalRef,
        desc: Option<&TextureViewDescriptor>,
    ) -> Option<ExternalRef>;

    // Buffer mapping.
    fn map_buffer(
        &self,
        buffer: &ExternalRef,
        mode: MapMode,
        offset: u64,
        size: Option<u64>,
        completion: CompletionSender<Result<(), GpuError>>,
    );
    /// Returns whether the range could be acquired (out-of-memory buffers
    /// fail here).
    fn get_mapped_range(&self, buffer: &ExternalRef, offset: u64, size: Option<u64>) -> bool;
    fn read_mapped_range(&self, buffer: &ExternalRef, range_offset: u64, sub_offset: u64, dst: &mut [u8]);
    fn write_mapped_range(&self, buffer: &ExternalRef, range_offset: u64, sub_offset: u64, src: &[u8]);
    fn unmap_buffer(&self, buffer: &ExternalRef);
    fn buffer_map_state(&self, buffer: &ExternalRef) -> &'static str;

    // Command recording boundaries.
    fn begin_render_pass(
        &self,
        encoder: &ExternalRef,
        pass: &ResolvedRenderPass<'_>,
    ) -> Option<ExternalRef>;
    fn begin_compute_pass(
        &self,
        encoder: &ExternalRef,
        desc: Option<&ComputePassDescriptor>,
    ) -> Option<ExternalRef>;
    fn finish_command_encoder(&self, encoder: &ExternalRef) -> Option<ExternalRef>;
    fn finish_render_bundle_encoder(&self, encoder: &ExternalRef) -> Option<ExternalRef>;

    // Queue.
    fn on_submitted_work_done(&self, queue: &ExternalRef, completion: CompletionSender<()>);
}
