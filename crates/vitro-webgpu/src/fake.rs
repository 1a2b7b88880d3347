//! Scripted in-memory implementation of [`WebGpuApi`] for tests.
//!
//! Creation calls hand back inert [`FakeObject`]s and record what they were
//! asked to do; asynchronous calls resolve their completion immediately (the
//! callback still only runs once the bridge dispatches its queue, which is
//! what gives tests control over delivery order). Failure paths are scripted
//! through the `fail_*` switches and the injectable error state.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use vitro_protocol::{
    enums, AdapterOptions, BindGroupLayoutEntry, BufferDescriptor, CanvasConfiguration,
    ComputePassDescriptor, DeviceDescriptor, MapMode, QuerySetDescriptor,
    RenderBundleEncoderDescriptor, SamplerDescriptor, ShaderModuleDescriptor, SupportedLimits,
    TextureDescriptor, TextureViewDescriptor,
};

use crate::api::{
    DecodedImage, DeviceLost, DeviceObjects, ResolvedBindGroupEntry, ResolvedBindingResource,
    ResolvedComputePipeline, ResolvedRenderPass, ResolvedRenderPipeline, WebGpuApi,
};
use crate::completion::{CompletionSender, ErrorSink, GpuError};
use crate::object::{ExternalObject, ExternalRef};

/// Inert stand-in for a browser-side object.
pub struct FakeObject {
    pub tag: &'static str,
    pub destroyed: Cell<bool>,
}

impl FakeObject {
    pub fn new(tag: &'static str) -> Rc<FakeObject> {
        Rc::new(FakeObject {
            tag,
            destroyed: Cell::new(false),
        })
    }
}

impl ExternalObject for FakeObject {
    fn destroy(&self) {
        self.destroyed.set(true);
    }
}

fn key(ext: &ExternalRef) -> usize {
    Rc::as_ptr(ext).cast::<u8>() as usize
}

#[derive(Default)]
pub struct FakeApi {
    /// Human-readable record of every call, for assertions.
    pub calls: RefCell<Vec<String>>,
    /// Every object this API has created, in creation order.
    pub created: RefCell<Vec<Rc<FakeObject>>>,

    pub gpu_unavailable: Cell<bool>,
    /// When set, the next creation call fails (and clears the switch).
    pub fail_next_create: Cell<bool>,
    /// When set, the next mapped range acquisition fails.
    pub fail_next_mapped_range: Cell<bool>,
    /// Error delivered by the next asynchronous map; `None` maps cleanly.
    pub next_map_error: RefCell<Option<GpuError>>,
    /// Error delivered by the next asynchronous pipeline creation.
    pub next_pipeline_error: RefCell<Option<GpuError>>,
    /// Error delivered by the next error scope pop; `None` pops clean.
    pub next_scope_error: RefCell<Option<GpuError>>,

    preferred_format: Cell<Option<&'static str>>,
    pub image_size: Cell<(u32, u32)>,

    contexts: RefCell<HashMap<String, ExternalRef>>,
    frame: RefCell<Option<ExternalRef>>,
    error_scopes: RefCell<Vec<&'static str>>,
    error_sink: RefCell<Option<ErrorSink>>,
    lost_watchers: RefCell<Vec<CompletionSender<DeviceLost>>>,

    map_states: RefCell<HashMap<usize, &'static str>>,
    buffer_contents: RefCell<HashMap<usize, Vec<u8>>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn log(&self, entry: String) {
        self.calls.borrow_mut().push(entry);
    }

    fn take_failure(&self) -> bool {
        self.fail_next_create.replace(false)
    }

    fn create(&self, tag: &'static str) -> Option<ExternalRef> {
        if self.take_failure() {
            return None;
        }
        let object = FakeObject::new(tag);
        self.created.borrow_mut().push(Rc::clone(&object));
        Some(object)
    }

    /// Objects created with `tag`, in creation order.
    pub fn created_with_tag(&self, tag: &str) -> Vec<Rc<FakeObject>> {
        self.created
            .borrow()
            .iter()
            .filter(|o| o.tag == tag)
            .cloned()
            .collect()
    }

    /// Invalidates the cached presentation texture, as a new frame would.
    pub fn advance_frame(&self) {
        *self.frame.borrow_mut() = None;
    }

    /// Reports an uncaptured error through the registered sink, if any.
    pub fn inject_uncaptured_error(&self, error: GpuError) {
        if let Some(sink) = &*self.error_sink.borrow() {
            sink.report(error);
        }
    }

    /// Fires every pending device-lost watcher.
    pub fn lose_device(&self, lost: DeviceLost) {
        for watcher in self.lost_watchers.borrow_mut().drain(..) {
            watcher.resolve(lost.clone());
        }
    }

    pub fn set_preferred_format(&self, format: &'static str) {
        self.preferred_format.set(Some(format));
    }

    pub fn error_scope_depth(&self) -> usize {
        self.error_scopes.borrow().len()
    }
}

impl WebGpuApi for FakeApi {
    fn gpu_available(&self) -> bool {
        !self.gpu_unavailable.get()
    }

    fn preferred_canvas_format(&self) -> &'static str {
        self.preferred_format.get().unwrap_or("bgra8unorm")
    }

    fn request_adapter(
        &self,
        options: Option<&AdapterOptions>,
        completion: CompletionSender<Option<ExternalRef>>,
    ) {
        self.log(format!(
            "request_adapter power={:?}",
            options.and_then(|o| o.power_preference)
        ));
        completion.resolve(self.create("adapter"));
    }

    fn canvas_context(&self, selector: &str) -> Option<ExternalRef> {
        let mut contexts = self.contexts.borrow_mut();
        if let Some(existing) = contexts.get(selector) {
            return Some(Rc::clone(existing));
        }
        let context = self.create("canvas-context")?;
        contexts.insert(selector.to_owned(), Rc::clone(&context));
        Some(context)
    }

    fn configure_canvas(
        &self,
        _context: &ExternalRef,
        _device: &ExternalRef,
        config: &CanvasConfiguration,
    ) {
        self.log(format!(
            "configure_canvas format={:?} size={:?}",
            config.format, config.size
        ));
    }

    fn unconfigure_canvas(&self, _context: &ExternalRef) {
        self.log("unconfigure_canvas".to_owned());
    }

    fn current_texture(&self, _context: &ExternalRef) -> Option<ExternalRef> {
        let mut frame = self.frame.borrow_mut();
        if let Some(texture) = &*frame {
            return Some(Rc::clone(texture));
        }
        let texture = self.create("frame-texture")?;
        *frame = Some(Rc::clone(&texture));
        Some(texture)
    }

    fn adapter_features(&self, _adapter: &ExternalRef) -> u32 {
        let mut bits = 0;
        for feature in ["depth-clip-control", "timestamp-query"] {
            let position = enums::FEATURES
                .iter()
                .position(|&f| f == feature)
                .expect("feature missing from table");
            bits |= 1 << position;
        }
        bits
    }

    fn adapter_limits(&self, _adapter: &ExternalRef) -> SupportedLimits {
        let mut limits = SupportedLimits::default();
        limits.limits_u64 = [65536, 134_217_728, 268_435_456];
        limits.limits_u32[0] = 8192; // maxTextureDimension1D
        limits.limits_u32[1] = 8192; // maxTextureDimension2D
        limits
    }

    fn request_device(
        &self,
        _adapter: &ExternalRef,
        desc: &DeviceDescriptor<'_>,
        completion: CompletionSender<Option<DeviceObjects>>,
    ) {
        self.log(format!(
            "request_device features={:#x} queue_label={:?}",
            desc.required_features, desc.default_queue_label
        ));
        if self.take_failure() {
            completion.resolve(None);
            return;
        }
        let device = self.create("device");
        let queue = self.create("queue");
        match (device, queue) {
            (Some(device), Some(queue)) => {
                completion.resolve(Some(DeviceObjects { device, queue }))
            }
            _ => completion.resolve(None),
        }
    }

    fn watch_device_lost(&self, _device: &ExternalRef, completion: CompletionSender<DeviceLost>) {
        self.lost_watchers.borrow_mut().push(completion);
    }

    fn set_uncaptured_error_sink(&self, _device: &ExternalRef, sink: Option<ErrorSink>) {
        *self.error_sink.borrow_mut() = sink;
    }

    fn push_error_scope(&self, _device: &ExternalRef, filter: &'static str) {
        self.error_scopes.borrow_mut().push(filter);
    }

    fn pop_error_scope(
        &self,
        _device: &ExternalRef,
        completion: CompletionSender<Option<GpuError>>,
    ) {
        self.error_scopes.borrow_mut().pop();
        completion.resolve(self.next_scope_error.borrow_mut().take());
    }

    fn create_buffer(&self, _device: &ExternalRef, desc: &BufferDescriptor) -> Option<ExternalRef> {
        self.log(format!(
            "create_buffer size={} usage={:?} mapped_at_creation={}",
            desc.size, desc.usage, desc.mapped_at_creation
        ));
        let buffer = self.create("buffer")?;
        self.buffer_contents
            .borrow_mut()
            .insert(key(&buffer), vec![0; desc.size as usize]);
        self.map_states.borrow_mut().insert(
            key(&buffer),
            if desc.mapped_at_creation {
                "mapped"
            } else {
                "unmapped"
            },
        );
        Some(buffer)
    }

    fn create_texture(
        &self,
        _device: &ExternalRef,
        desc: &TextureDescriptor,
    ) -> Option<ExternalRef> {
        self.log(format!(
            "create_texture format={:?} size={:?}",
            desc.format, desc.size
        ));
        self.create("texture")
    }

    fn create_sampler(
        &self,
        _device: &ExternalRef,
        desc: Option<&SamplerDescriptor>,
    ) -> Option<ExternalRef> {
        self.log(format!(
            "create_sampler mag={:?}",
            desc.and_then(|d| d.mag_filter)
        ));
        self.create("sampler")
    }

    fn create_bind_group_layout(
        &self,
        _device: &ExternalRef,
        entries: &[BindGroupLayoutEntry],
    ) -> Option<ExternalRef> {
        self.log(format!("create_bind_group_layout entries={}", entries.len()));
        self.create("bind-group-layout")
    }

    fn create_pipeline_layout(
        &self,
        _device: &ExternalRef,
        bind_group_layouts: &[ExternalRef],
    ) -> Option<ExternalRef> {
        self.log(format!(
            "create_pipeline_layout layouts={}",
            bind_group_layouts.len()
        ));
        self.create("pipeline-layout")
    }

    fn create_bind_group(
        &self,
        _device: &ExternalRef,
        _layout: &ExternalRef,
        entries: &[ResolvedBindGroupEntry],
    ) -> Option<ExternalRef> {
        for entry in entries {
            match &entry.resource {
                ResolvedBindingResource::Buffer { offset, size, .. } => self.log(format!(
                    "bind_group[{}] buffer offset={offset} size={size:?}",
                    entry.binding
                )),
                ResolvedBindingResource::Other(_) => {
                    self.log(format!("bind_group[{}] bare resource", entry.binding))
                }
            }
        }
        self.create("bind-group")
    }

    fn create_shader_module(
        &self,
        _device: &ExternalRef,
        desc: &ShaderModuleDescriptor<'_>,
    ) -> Option<ExternalRef> {
        self.log(format!("create_shader_module code_len={}", desc.code.len()));
        self.create("shader-module")
    }

    fn create_render_pipeline(
        &self,
        _device: &ExternalRef,
        pipeline: &ResolvedRenderPipeline<'_, '_>,
    ) -> Option<ExternalRef> {
        self.log(format!(
            "create_render_pipeline fragment={} depth_stencil={} targets={}",
            pipeline.fragment_module.is_some(),
            pipeline.desc.depth_stencil.is_some(),
            pipeline.desc.fragment.as_ref().map_or(0, |f| f.targets.len())
        ));
        self.create("render-pipeline")
    }

    fn create_render_pipeline_async(
        &self,
        device: &ExternalRef,
        pipeline: &ResolvedRenderPipeline<'_, '_>,
        completion: CompletionSender<Result<ExternalRef, GpuError>>,
    ) {
        match self.next_pipeline_error.borrow_mut().take() {
            Some(error) => completion.resolve(Err(error)),
            None => match self.create_render_pipeline(device, pipeline) {
                Some(object) => completion.resolve(Ok(object)),
                None => completion.resolve(Err(GpuError::internal("creation failed"))),
            },
        }
    }

    fn create_compute_pipeline(
        &self,
        _device: &ExternalRef,
        pipeline: &ResolvedComputePipeline<'_>,
    ) -> Option<ExternalRef> {
        self.log(format!(
            "create_compute_pipeline entry={:?} constants={}",
            pipeline.entry_point,
            pipeline.constants.len()
        ));
        self.create("compute-pipeline")
    }

    fn create_compute_pipeline_async(
        &self,
        device: &ExternalRef,
        pipeline: &ResolvedComputePipeline<'_>,
        completion: CompletionSender<Result<ExternalRef, GpuError>>,
    ) {
        match self.next_pipeline_error.borrow_mut().take() {
            Some(error) => completion.resolve(Err(error)),
            None => match self.create_compute_pipeline(device, pipeline) {
                Some(object) => completion.resolve(Ok(object)),
                None => completion.resolve(Err(GpuError::internal("creation failed"))),
            },
        }
    }

    fn create_command_encoder(&self, _device: &ExternalRef) -> Option<ExternalRef> {
        self.create("command-encoder")
    }

    fn create_render_bundle_encoder(
        &self,
        _device: &ExternalRef,
        desc: &RenderBundleEncoderDescriptor,
    ) -> Option<ExternalRef> {
        self.log(format!(
            "create_render_bundle_encoder colors={}",
            desc.color_formats.len()
        ));
        self.create("render-bundle-encoder")
    }

    fn create_query_set(
        &self,
        _device: &ExternalRef,
        desc: &QuerySetDescriptor,
    ) -> Option<ExternalRef> {
        self.log(format!(
            "create_query_set ty={:?} count={}",
            desc.ty, desc.count
        ));
        self.create("query-set")
    }

    fn import_external_texture(
        &self,
        _device: &ExternalRef,
        _source: &ExternalRef,
    ) -> Option<ExternalRef> {
        self.create("external-texture")
    }

    fn decode_image_bitmap(
        &self,
        url: &str,
        flip_y: bool,
        completion: CompletionSender<Result<DecodedImage, GpuError>>,
    ) {
        self.log(format!("decode_image_bitmap url={url} flip_y={flip_y}"));
        if self.take_failure() {
            completion.resolve(Err(GpuError::internal("image decode failed")));
            return;
        }
        let (width, height) = {
            let size = self.image_size.get();
            if size == (0, 0) {
                (16, 16)
            } else {
                size
            }
        };
        match self.create("image-bitmap") {
            Some(bitmap) => completion.resolve(Ok(DecodedImage {
                bitmap,
                width,
                height,
            })),
            None => completion.resolve(Err(GpuError::internal("image decode failed"))),
        }
    }

    fn create_texture_view(
        &self,
        _texture: &ExternalRef,
        desc: Option<&TextureViewDescriptor>,
    ) -> Option<ExternalRef> {
        self.log(format!(
            "create_texture_view format={:?}",
            desc.and_then(|d| d.format)
        ));
        self.create("texture-view")
    }

    fn map_buffer(
        &self,
        buffer: &ExternalRef,
        mode: MapMode,
        offset: u64,
        size: Option<u64>,
        completion: CompletionSender<Result<(), GpuError>>,
    ) {
        self.log(format!("map_buffer mode={mode:?} offset={offset} size={size:?}"));
        match self.next_map_error.borrow_mut().take() {
            Some(error) => completion.resolve(Err(error)),
            None => {
                self.map_states.borrow_mut().insert(key(buffer), "mapped");
                completion.resolve(Ok(()));
            }
        }
    }

    fn get_mapped_range(&self, buffer: &ExternalRef, offset: u64, size: Option<u64>) -> bool {
        self.log(format!("get_mapped_range offset={offset} size={size:?}"));
        if self.fail_next_mapped_range.replace(false) {
            return false;
        }
        self.map_states.borrow().get(&key(buffer)) == Some(&"mapped")
    }

    fn read_mapped_range(
        &self,
        buffer: &ExternalRef,
        range_offset: u64,
        sub_offset: u64,
        dst: &mut [u8],
    ) {
        let contents = self.buffer_contents.borrow();
        let bytes = contents.get(&key(buffer)).expect("unknown fake buffer");
        let start = (range_offset + sub_offset) as usize;
        dst.copy_from_slice(&bytes[start..start + dst.len()]);
    }

    fn write_mapped_range(
        &self,
        buffer: &ExternalRef,
        range_offset: u64,
        sub_offset: u64,
        src: &[u8],
    ) {
        let mut contents = self.buffer_contents.borrow_mut();
        let bytes = contents.get_mut(&key(buffer)).expect("unknown fake buffer");
        let start = (range_offset + sub_offset) as usize;
        bytes[start..start + src.len()].copy_from_slice(src);
    }

    fn unmap_buffer(&self, buffer: &ExternalRef) {
        self.log("unmap_buffer".to_owned());
        self.map_states.borrow_mut().insert(key(buffer), "unmapped");
    }

    fn buffer_map_state(&self, buffer: &ExternalRef) -> &'static str {
        self.map_states
            .borrow()
            .get(&key(buffer))
            .copied()
            .unwrap_or("unmapped")
    }

    fn begin_render_pass(
        &self,
        _encoder: &ExternalRef,
        pass: &ResolvedRenderPass<'_>,
    ) -> Option<ExternalRef> {
        self.log(format!(
            "begin_render_pass colors={} depth_stencil={}",
            pass.color_views.iter().filter(|v| v.is_some()).count(),
            pass.depth_stencil_view.is_some()
        ));
        self.create("render-pass-encoder")
    }

    fn begin_compute_pass(
        &self,
        _encoder: &ExternalRef,
        desc: Option<&ComputePassDescriptor>,
    ) -> Option<ExternalRef> {
        self.log(format!(
            "begin_compute_pass timestamps={}",
            desc.is_some_and(|d| d.timestamp_writes.is_some())
        ));
        self.create("compute-pass-encoder")
    }

    fn finish_command_encoder(&self, _encoder: &ExternalRef) -> Option<ExternalRef> {
        self.create("command-buffer")
    }

    fn finish_render_bundle_encoder(&self, _encoder: &ExternalRef) -> Option<ExternalRef> {
        self.create("render-bundle")
    }

    fn on_submitted_work_done(&self, _queue: &ExternalRef, completion: CompletionSender<()>) {
        self.log("on_submitted_work_done".to_owned());
        completion.resolve(());
    }
}
