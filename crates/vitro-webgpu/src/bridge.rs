//! The boundary operation surface.
//!
//! [`WebGpuBridge`] is what the native-facing entry points call into: it
//! validates handle arguments, decodes descriptor blocks out of the caller's
//! linear memory, drives the external API, and registers the results.
//!
//! Handle validation is two-tier, matching the trusted-caller model: a handle
//! of the wrong kind is a caller bug and only trips a debug assertion, while
//! an unknown (destroyed or never-existent) handle is logged and degrades to
//! a neutral result, never a panic.
//!
//! Asynchronous operations return immediately; their callbacks run when the
//! event loop calls [`WebGpuBridge::dispatch_completions`]. The synchronous
//! variants block on a oneshot channel resolved by the same completion path,
//! which in this cooperative model means the completion must already be
//! queued when the variant drains the queue.
//!
//! Destroying a handle does not cancel a pending operation that references
//! it: the completion still fires and its callback is dispatched with
//! whatever the external API produced. Parent links that died in the
//! meantime are dropped rather than resurrected.

use std::cell::RefCell;
use std::rc::Rc;

use futures_intrusive::channel::shared::oneshot_channel;
use vitro_protocol::{
    decode, enums, heap::HeapView, Handle, LayoutRef, MapMode, Ptr, RenderPipelineDescriptor,
    SupportedLimits,
};

use crate::api::{
    DecodedImage, DeviceLost, DeviceObjects, ResolvedBindGroupEntry, ResolvedBindingResource,
    ResolvedComputePipeline, ResolvedRenderPass, ResolvedRenderPipeline, WebGpuApi,
};
use crate::completion::{CompletionQueue, DeviceLostReason, ErrorKind, GpuError, UserData};
use crate::error::BridgeError;
use crate::object::{ExternalRef, ObjectKind};
use crate::registry::{HandleRegistry, INVALID_HANDLE};

pub type AdapterCallback = Box<dyn FnOnce(Handle, UserData)>;
pub type DeviceCallback = Box<dyn FnOnce(Handle, UserData)>;
/// `(device, status, pipeline, user data)`.
pub type PipelineCallback = Box<dyn FnOnce(Handle, ErrorKind, Handle, UserData)>;
/// `(device, status, message, user data)`.
pub type ErrorScopeCallback = Box<dyn FnOnce(Handle, ErrorKind, Option<String>, UserData)>;
/// Standing registration; fires once per uncaptured error.
pub type UncapturedErrorCallback = Box<dyn FnMut(Handle, ErrorKind, String, UserData)>;
pub type DeviceLostCallback = Box<dyn FnOnce(Handle, DeviceLostReason, String, UserData)>;
/// `(buffer, status, user data)`.
pub type BufferMapCallback = Box<dyn FnOnce(Handle, ErrorKind, UserData)>;
pub type WorkDoneCallback = Box<dyn FnOnce(Handle, UserData)>;
/// `(bitmap, width, height, user data)`.
pub type ImageDecodeCallback = Box<dyn FnOnce(Handle, u32, u32, UserData)>;

pub struct WebGpuBridge<A> {
    api: A,
    registry: Rc<RefCell<HandleRegistry>>,
    completions: CompletionQueue,
}

impl<A: WebGpuApi> WebGpuBridge<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            registry: Rc::new(RefCell::new(HandleRegistry::new())),
            completions: CompletionQueue::new(),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Delivers every queued completion on the calling thread.
    pub fn dispatch_completions(&self) -> usize {
        self.completions.dispatch()
    }

    fn external_of(&self, id: Handle, kind: ObjectKind) -> Option<ExternalRef> {
        let registry = self.registry.borrow();
        match registry.get(id) {
            Some(record) => {
                debug_assert!(
                    record.kind == kind,
                    "handle {id} is {:?}, expected {kind:?}",
                    record.kind
                );
                Some(Rc::clone(&record.external))
            }
            None => {
                tracing::warn!(id, ?kind, "operation on unknown handle");
                None
            }
        }
    }

    // ---- Registry surface ----------------------------------------------

    pub fn num_live_objects(&self) -> usize {
        self.registry.borrow().live_object_count()
    }

    pub fn is_valid_object(&self, id: Handle) -> bool {
        self.registry.borrow().is_valid(id)
    }

    pub fn object_kind(&self, id: Handle) -> Option<ObjectKind> {
        self.registry.borrow().kind_of(id)
    }

    pub fn object_destroy(&mut self, id: Handle) {
        self.registry.borrow_mut().destroy(id);
    }

    pub fn destroy_all_objects(&mut self) {
        self.registry.borrow_mut().destroy_all();
    }

    pub fn object_set_label(&mut self, id: Handle, label: &str) {
        self.registry.borrow_mut().set_label(id, label);
    }

    pub fn object_label(&self, id: Handle) -> Option<String> {
        self.registry.borrow().label(id).map(str::to_owned)
    }

    // ---- Navigator ------------------------------------------------------

    pub fn gpu_available(&self) -> bool {
        self.api.gpu_available()
    }

    /// Reports the preferred presentation format as its enum table index.
    pub fn preferred_canvas_format(&self) -> u32 {
        let format = self.api.preferred_canvas_format();
        let index = enums::TEXTURE_AND_VERTEX_FORMATS.index_of(format);
        debug_assert!(index != 0, "implementation reported unknown format {format:?}");
        index
    }

    pub fn request_adapter_async(
        &mut self,
        heap: &HeapView<'_>,
        options: Ptr,
        callback: AdapterCallback,
        user_data: UserData,
    ) -> bool {
        if !self.api.gpu_available() {
            tracing::error!("WebGPU is not available");
            return false;
        }
        let options = (options != 0).then(|| decode::adapter_options(heap, options));
        let registry = Rc::clone(&self.registry);
        let sender = self.completions.sender(move |adapter: Option<ExternalRef>| {
            let id = registry.borrow_mut().store(ObjectKind::Adapter, adapter);
            callback(id, user_data);
        });
        self.api.request_adapter(options.as_ref(), sender);
        true
    }

    /// Blocking variant of adapter acquisition. The completion must already
    /// be deliverable when this runs (single-threaded cooperative model).
    pub fn request_adapter_sync(&mut self, heap: &HeapView<'_>, options: Ptr) -> Handle {
        if !self.api.gpu_available() {
            tracing::error!("WebGPU is not available");
            return INVALID_HANDLE;
        }
        let options = (options != 0).then(|| decode::adapter_options(heap, options));
        let (tx, rx) = oneshot_channel();
        let registry = Rc::clone(&self.registry);
        let sender = self.completions.sender(move |adapter: Option<ExternalRef>| {
            let id = registry.borrow_mut().store(ObjectKind::Adapter, adapter);
            let _ = tx.send(id);
        });
        self.api.request_adapter(options.as_ref(), sender);
        self.dispatch_completions();
        pollster::block_on(rx.receive()).unwrap_or(INVALID_HANDLE)
    }

    // ---- Adapter --------------------------------------------------------

    pub fn adapter_features(&self, adapter: Handle) -> u32 {
        match self.external_of(adapter, ObjectKind::Adapter) {
            Some(ext) => self.api.adapter_features(&ext),
            None => 0,
        }
    }

    pub fn adapter_supports_feature(&self, adapter: Handle, feature_bit: u32) -> bool {
        debug_assert!(
            feature_bit.is_power_of_two(),
            "pass a single feature bit, not a combination"
        );
        self.adapter_features(adapter) & feature_bit != 0
    }

    pub fn adapter_limits(&self, adapter: Handle) -> SupportedLimits {
        match self.external_of(adapter, ObjectKind::Adapter) {
            Some(ext) => self.api.adapter_limits(&ext),
            None => SupportedLimits::default(),
        }
    }

    pub fn adapter_request_device_async(
        &mut self,
        adapter: Handle,
        heap: &HeapView<'_>,
        descriptor: Ptr,
        callback: DeviceCallback,
        user_data: UserData,
    ) {
        let Some(adapter_ref) = self.external_of(adapter, ObjectKind::Adapter) else {
            callback(INVALID_HANDLE, user_data);
            return;
        };
        let desc = decode::device_descriptor(heap, descriptor);
        let registry = Rc::clone(&self.registry);
        let sender = self
            .completions
            .sender(move |objects: Option<DeviceObjects>| {
                let id = store_device(&registry, adapter, objects);
                callback(id, user_data);
            });
        self.api.request_device(&adapter_ref, &desc, sender);
    }

    /// Blocking variant of device acquisition.
    pub fn adapter_request_device_sync(
        &mut self,
        adapter: Handle,
        heap: &HeapView<'_>,
        descriptor: Ptr,
    ) -> Handle {
        let Some(adapter_ref) = self.external_of(adapter, ObjectKind::Adapter) else {
            return INVALID_HANDLE;
        };
        let desc = decode::device_descriptor(heap, descriptor);
        let (tx, rx) = oneshot_channel();
        let registry = Rc::clone(&self.registry);
        let sender = self
            .completions
            .sender(move |objects: Option<DeviceObjects>| {
                let _ = tx.send(store_device(&registry, adapter, objects));
            });
        self.api.request_device(&adapter_ref, &desc, sender);
        self.dispatch_completions();
        pollster::block_on(rx.receive()).unwrap_or(INVALID_HANDLE)
    }

    // ---- Canvas / presentation surface ---------------------------------

    pub fn canvas_get_webgpu_context(&mut self, selector: &str) -> Handle {
        let Some(context) = self.api.canvas_context(selector) else {
            tracing::error!(selector, "no canvas matches selector");
            return INVALID_HANDLE;
        };
        let mut registry = self.registry.borrow_mut();
        if let Some(existing) = registry.find_by_identity(ObjectKind::CanvasContext, &context) {
            return existing;
        }
        registry.store(ObjectKind::CanvasContext, Some(context))
    }

    pub fn canvas_context_configure(
        &mut self,
        context: Handle,
        heap: &HeapView<'_>,
        config: Ptr,
    ) {
        let Some(context_ref) = self.external_of(context, ObjectKind::CanvasContext) else {
            return;
        };
        let config = decode::canvas_configuration(heap, config);
        let Some(device_ref) = self.external_of(config.device, ObjectKind::Device) else {
            return;
        };
        self.api.configure_canvas(&context_ref, &device_ref, &config);
    }

    pub fn canvas_context_unconfigure(&mut self, context: Handle) {
        if let Some(context_ref) = self.external_of(context, ObjectKind::CanvasContext) {
            self.api.unconfigure_canvas(&context_ref);
        }
    }

    /// Acquires the current presentation texture into the reserved slot.
    ///
    /// The previous occupant is destroyed (with its derived views) unless the
    /// implementation handed back the referentially same texture, in which
    /// case the registry is left untouched.
    pub fn canvas_context_get_current_texture(&mut self, context: Handle) -> Handle {
        let Some(context_ref) = self.external_of(context, ObjectKind::CanvasContext) else {
            return INVALID_HANDLE;
        };
        let Some(texture) = self.api.current_texture(&context_ref) else {
            tracing::error!(context, "presentation surface produced no texture");
            return INVALID_HANDLE;
        };
        self.registry
            .borrow_mut()
            .install_frame_texture(context, texture)
    }

    // ---- Device error machinery ----------------------------------------

    pub fn device_set_lost_callback(
        &mut self,
        device: Handle,
        callback: DeviceLostCallback,
        user_data: UserData,
    ) {
        let Some(device_ref) = self.external_of(device, ObjectKind::Device) else {
            return;
        };
        let sender = self.completions.sender(move |lost: DeviceLost| {
            callback(device, lost.reason, lost.message, user_data);
        });
        self.api.watch_device_lost(&device_ref, sender);
    }

    pub fn device_set_uncaptured_error_callback(
        &mut self,
        device: Handle,
        callback: Option<UncapturedErrorCallback>,
        user_data: UserData,
    ) {
        let Some(device_ref) = self.external_of(device, ObjectKind::Device) else {
            return;
        };
        let sink = callback.map(|mut callback| {
            self.completions.error_sink(move |error: GpuError| {
                callback(device, error.kind, error.message, user_data);
            })
        });
        self.api.set_uncaptured_error_sink(&device_ref, sink);
    }

    pub fn device_push_error_scope(&mut self, device: Handle, filter: u32) {
        let Some(device_ref) = self.external_of(device, ObjectKind::Device) else {
            return;
        };
        let Some(filter) = enums::ERROR_FILTERS.get(filter) else {
            debug_assert!(false, "bad error scope filter {filter}");
            return;
        };
        self.api.push_error_scope(&device_ref, filter);
    }

    pub fn device_pop_error_scope_async(
        &mut self,
        device: Handle,
        callback: ErrorScopeCallback,
        user_data: UserData,
    ) {
        let Some(device_ref) = self.external_of(device, ObjectKind::Device) else {
            callback(device, ErrorKind::None, None, user_data);
            return;
        };
        let sender = self.completions.sender(move |error: Option<GpuError>| {
            match error {
                Some(error) => callback(device, error.kind, Some(error.message), user_data),
                None => callback(device, ErrorKind::None, None, user_data),
            }
        });
        self.api.pop_error_scope(&device_ref, sender);
    }

    /// Blocking variant of error scope pop.
    pub fn device_pop_error_scope_sync(&mut self, device: Handle) -> (ErrorKind, Option<String>) {
        let Some(device_ref) = self.external_of(device, ObjectKind::Device) else {
            return (ErrorKind::None, None);
        };
        let (tx, rx) = oneshot_channel();
        let sender = self.completions.sender(move |error: Option<GpuError>| {
            let _ = tx.send(match error {
                Some(error) => (error.kind.code(), Some(error.message)),
                None => (ErrorKind::None.code(), None),
            });
        });
        self.api.pop_error_scope(&device_ref, sender);
        self.dispatch_completions();
        match pollster::block_on(rx.receive()) {
            Some((code, message)) => (ErrorKind::from_code(code), message),
            None => (ErrorKind::None, None),
        }
    }

    // ---- Device creation surface ---------------------------------------

    pub fn device_get_queue(&self, device: Handle) -> Handle {
        debug_assert!(
            self.registry.borrow().is_kind(device, ObjectKind::Device),
            "device_get_queue on non-device {device}"
        );
        match self
            .registry
            .borrow()
            .derived_of_kind(device, ObjectKind::Queue)
        {
            Some(queue) => queue,
            None => {
                tracing::warn!(device, "no queue registered for device");
                INVALID_HANDLE
            }
        }
    }

    pub fn device_create_buffer(
        &mut self,
        device: Handle,
        heap: &HeapView<'_>,
        descriptor: Ptr,
    ) -> Handle {
        let Some(device_ref) = self.external_of(device, ObjectKind::Device) else {
            return INVALID_HANDLE;
        };
        let desc = decode::buffer_descriptor(heap, descriptor);
        let buffer = self.api.create_buffer(&device_ref, &desc);
        self.registry
            .borrow_mut()
            .store_with_parent(ObjectKind::Buffer, buffer, device)
    }

    pub fn device_create_texture(
        &mut self,
        device: Handle,
        heap: &HeapView<'_>,
        descriptor: Ptr,
    ) -> Handle {
        let Some(device_ref) = self.external_of(device, ObjectKind::Device) else {
            return INVALID_HANDLE;
        };
        let desc = decode::texture_descriptor(heap, descriptor);
        let texture = self.api.create_texture(&device_ref, &desc);
        self.registry
            .borrow_mut()
            .store_with_parent(ObjectKind::Texture, texture, device)
    }

    pub fn device_create_sampler(
        &mut self,
        device: Handle,
        heap: &HeapView<'_>,
        descriptor: Ptr,
    ) -> Handle {
        let Some(device_ref) = self.external_of(device, ObjectKind::Device) else {
            return INVALID_HANDLE;
        };
        let desc = (descriptor != 0).then(|| decode::sampler_descriptor(heap, descriptor));
        let sampler = self.api.create_sampler(&device_ref, desc.as_ref());
        self.registry
            .borrow_mut()
            .store_with_parent(ObjectKind::Sampler, sampler, device)
    }

    pub fn device_create_bind_group_layout(
        &mut self,
        device: Handle,
        heap: &HeapView<'_>,
        entries: Ptr,
        num_entries: u32,
    ) -> Handle {
        let Some(device_ref) = self.external_of(device, ObjectKind::Device) else {
            return INVALID_HANDLE;
        };
        let entries = decode::bind_group_layout_entries(heap, entries, num_entries);
        let layout = self.api.create_bind_group_layout(&device_ref, &entries);
        self.registry
            .borrow_mut()
            .store_with_parent(ObjectKind::BindGroupLayout, layout, device)
    }

    pub fn device_create_pipeline_layout(
        &mut self,
        device: Handle,
        heap: &HeapView<'_>,
        layouts: Ptr,
        num_layouts: u32,
    ) -> Handle {
        let Some(device_ref) = self.external_of(device, ObjectKind::Device) else {
            return INVALID_HANDLE;
        };
        let layout_handles = decode::handle_array(heap, layouts, num_layouts);
        let mut layout_refs = Vec::with_capacity(layout_handles.len());
        for handle in layout_handles {
            let Some(layout) = self.external_of(handle, ObjectKind::BindGroupLayout) else {
                return INVALID_HANDLE;
            };
            layout_refs.push(layout);
        }
        let layout = self.api.create_pipeline_layout(&device_ref, &layout_refs);
        self.registry
            .borrow_mut()
            .store_with_parent(ObjectKind::PipelineLayout, layout, device)
    }

    pub fn device_create_bind_group(
        &mut self,
        device: Handle,
        layout: Handle,
        heap: &HeapView<'_>,
        entries: Ptr,
        num_entries: u32,
    ) -> Handle {
        let Some(device_ref) = self.external_of(device, ObjectKind::Device) else {
            return INVALID_HANDLE;
        };
        let Some(layout_ref) = self.external_of(layout, ObjectKind::BindGroupLayout) else {
            return INVALID_HANDLE;
        };
        let raw_entries = decode::bind_group_entries(heap, entries, num_entries);
        let mut resolved = Vec::with_capacity(raw_entries.len());
        {
            let registry = self.registry.borrow();
            for entry in &raw_entries {
                let Some(record) = registry.get(entry.resource) else {
                    tracing::warn!(
                        resource = entry.resource,
                        "bind group entry references unknown handle"
                    );
                    return INVALID_HANDLE;
                };
                // Buffer bindings carry an offset/size window; every other
                // resource kind binds bare.
                let resource = if record.kind.is_buffer() {
                    ResolvedBindingResource::Buffer {
                        buffer: Rc::clone(&record.external),
                        offset: entry.offset,
                        size: entry.size,
                    }
                } else {
                    ResolvedBindingResource::Other(Rc::clone(&record.external))
                };
                resolved.push(ResolvedBindGroupEntry {
                    binding: entry.binding,
                    resource,
                });
            }
        }
        let bind_group = self
            .api
            .create_bind_group(&device_ref, &layout_ref, &resolved);
        self.registry
            .borrow_mut()
            .store_with_parent(ObjectKind::BindGroup, bind_group, device)
    }

    pub fn device_create_shader_module(
        &mut self,
        device: Handle,
        heap: &HeapView<'_>,
        descriptor: Ptr,
    ) -> Handle {
        let Some(device_ref) = self.external_of(device, ObjectKind::Device) else {
            return INVALID_HANDLE;
        };
        let desc = decode::shader_module_descriptor(heap, descriptor);
        let module = self.api.create_shader_module(&device_ref, &desc);
        self.registry
            .borrow_mut()
            .store_with_parent(ObjectKind::ShaderModule, module, device)
    }

    fn resolve_render_pipeline<'d, 'a>(
        &self,
        desc: &'d RenderPipelineDescriptor<'a>,
    ) -> Option<ResolvedRenderPipeline<'d, 'a>> {
        let vertex_module = self.external_of(desc.vertex.module, ObjectKind::ShaderModule)?;
        let fragment_module = match &desc.fragment {
            Some(fragment) => Some(self.external_of(fragment.module, ObjectKind::ShaderModule)?),
            None => None,
        };
        let layout = match desc.layout {
            LayoutRef::Auto => None,
            LayoutRef::Handle(handle) => {
                Some(self.external_of(handle, ObjectKind::PipelineLayout)?)
            }
        };
        Some(ResolvedRenderPipeline {
            desc,
            vertex_module,
            fragment_module,
            layout,
        })
    }

    pub fn device_create_render_pipeline(
        &mut self,
        device: Handle,
        heap: &HeapView<'_>,
        descriptor: Ptr,
    ) -> Handle {
        let Some(device_ref) = self.external_of(device, ObjectKind::Device) else {
            return INVALID_HANDLE;
        };
        let desc = decode::render_pipeline_descriptor(heap, descriptor);
        let Some(resolved) = self.resolve_render_pipeline(&desc) else {
            return INVALID_HANDLE;
        };
        let pipeline = self.api.create_render_pipeline(&device_ref, &resolved);
        self.registry
            .borrow_mut()
            .store_with_parent(ObjectKind::RenderPipeline, pipeline, device)
    }

    pub fn device_create_render_pipeline_async(
        &mut self,
        device: Handle,
        heap: &HeapView<'_>,
        descriptor: Ptr,
        callback: PipelineCallback,
        user_data: UserData,
    ) {
        let Some(device_ref) = self.external_of(device, ObjectKind::Device) else {
            callback(device, ErrorKind::Internal, INVALID_HANDLE, user_data);
            return;
        };
        let desc = decode::render_pipeline_descriptor(heap, descriptor);
        let Some(resolved) = self.resolve_render_pipeline(&desc) else {
            callback(device, ErrorKind::Validation, INVALID_HANDLE, user_data);
            return;
        };
        let sender = self.pipeline_completion(device, ObjectKind::RenderPipeline, callback, user_data);
        self.api
            .create_render_pipeline_async(&device_ref, &resolved, sender);
    }

    fn resolve_compute_pipeline<'a>(
        &self,
        heap: &HeapView<'a>,
        module: Handle,
        entry_point: Ptr,
        layout: Handle,
        constants: Ptr,
        num_constants: u32,
    ) -> Option<ResolvedComputePipeline<'a>> {
        let module_ref = self.external_of(module, ObjectKind::ShaderModule)?;
        let layout_ref = if layout == 0 {
            None
        } else {
            Some(self.external_of(layout, ObjectKind::PipelineLayout)?)
        };
        Some(ResolvedComputePipeline {
            module: module_ref,
            entry_point: heap.nonempty_str_at(entry_point),
            constants: decode::constants(heap, constants, num_constants),
            layout: layout_ref,
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn device_create_compute_pipeline(
        &mut self,
        device: Handle,
        heap: &HeapView<'_>,
        module: Handle,
        entry_point: Ptr,
        layout: Handle,
        constants: Ptr,
        num_constants: u32,
    ) -> Handle {
        let Some(device_ref) = self.external_of(device, ObjectKind::Device) else {
            return INVALID_HANDLE;
        };
        let Some(resolved) =
            self.resolve_compute_pipeline(heap, module, entry_point, layout, constants, num_constants)
        else {
            return INVALID_HANDLE;
        };
        let pipeline = self.api.create_compute_pipeline(&device_ref, &resolved);
        self.registry
            .borrow_mut()
            .store_with_parent(ObjectKind::ComputePipeline, pipeline, device)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn device_create_compute_pipeline_async(
        &mut self,
        device: Handle,
        heap: &HeapView<'_>,
        module: Handle,
        entry_point: Ptr,
        layout: Handle,
        constants: Ptr,
        num_constants: u32,
        callback: PipelineCallback,
        user_data: UserData,
    ) {
        let Some(device_ref) = self.external_of(device, ObjectKind::Device) else {
            callback(device, ErrorKind::Internal, INVALID_HANDLE, user_data);
            return;
        };
        let Some(resolved) =
            self.resolve_compute_pipeline(heap, module, entry_point, layout, constants, num_constants)
        else {
            callback(device, ErrorKind::Validation, INVALID_HANDLE, user_data);
            return;
        };
        let sender = self.pipeline_completion(device, ObjectKind::ComputePipeline, callback, user_data);
        self.api
            .create_compute_pipeline_async(&device_ref, &resolved, sender);
    }

    fn pipeline_completion(
        &self,
        device: Handle,
        kind: ObjectKind,
        callback: PipelineCallback,
        user_data: UserData,
    ) -> crate::completion::CompletionSender<Result<ExternalRef, GpuError>> {
        let registry = Rc::clone(&self.registry);
        self.completions
            .sender(move |result: Result<ExternalRef, GpuError>| match result {
                Ok(pipeline) => {
                    let id = {
                        let mut registry = registry.borrow_mut();
                        // The owning device may have been destroyed while the
                        // compilation was in flight; deliver the pipeline
                        // unparented in that case.
                        if registry.is_valid(device) {
                            registry.store_with_parent(kind, Some(pipeline), device)
                        } else {
                            registry.store(kind, Some(pipeline))
                        }
                    };
                    callback(device, ErrorKind::None, id, user_data);
                }
                Err(error) => callback(device, error.kind, INVALID_HANDLE, user_data),
            })
    }

    pub fn device_create_command_encoder(&mut self, device: Handle) -> Handle {
        let Some(device_ref) = self.external_of(device, ObjectKind::Device) else {
            return INVALID_HANDLE;
        };
        let encoder = self.api.create_command_encoder(&device_ref);
        self.registry
            .borrow_mut()
            .store_with_parent(ObjectKind::CommandEncoder, encoder, device)
    }

    pub fn device_create_render_bundle_encoder(
        &mut self,
        device: Handle,
        heap: &HeapView<'_>,
        descriptor: Ptr,
    ) -> Handle {
        let Some(device_ref) = self.external_of(device, ObjectKind::Device) else {
            return INVALID_HANDLE;
        };
        let desc = decode::render_bundle_encoder_descriptor(heap, descriptor);
        let encoder = self.api.create_render_bundle_encoder(&device_ref, &desc);
        self.registry
            .borrow_mut()
            .store_with_parent(ObjectKind::RenderBundleEncoder, encoder, device)
    }

    pub fn device_create_query_set(
        &mut self,
        device: Handle,
        heap: &HeapView<'_>,
        descriptor: Ptr,
    ) -> Handle {
        let Some(device_ref) = self.external_of(device, ObjectKind::Device) else {
            return INVALID_HANDLE;
        };
        let desc = decode::query_set_descriptor(heap, descriptor);
        let query_set = self.api.create_query_set(&device_ref, &desc);
        self.registry
            .borrow_mut()
            .store_with_parent(ObjectKind::QuerySet, query_set, device)
    }

    pub fn device_import_external_texture(&mut self, device: Handle, source: Handle) -> Handle {
        let Some(device_ref) = self.external_of(device, ObjectKind::Device) else {
            return INVALID_HANDLE;
        };
        let Some(source_ref) = self.external_of(source, ObjectKind::ImageBitmap) else {
            return INVALID_HANDLE;
        };
        let texture = self.api.import_external_texture(&device_ref, &source_ref);
        self.registry
            .borrow_mut()
            .store_with_parent(ObjectKind::ExternalTexture, texture, device)
    }

    pub fn load_image_bitmap_async(
        &mut self,
        url: &str,
        flip_y: bool,
        callback: ImageDecodeCallback,
        user_data: UserData,
    ) {
        let registry = Rc::clone(&self.registry);
        let sender = self
            .completions
            .sender(move |result: Result<DecodedImage, GpuError>| match result {
                Ok(image) => {
                    let id = registry
                        .borrow_mut()
                        .store(ObjectKind::ImageBitmap, Some(image.bitmap));
                    callback(id, image.width, image.height, user_data);
                }
                Err(error) => {
                    tracing::error!(%error, "image decode failed");
                    callback(INVALID_HANDLE, 0, 0, user_data);
                }
            });
        self.api.decode_image_bitmap(url, flip_y, sender);
    }

    // ---- Texture --------------------------------------------------------

    pub fn texture_create_view(
        &mut self,
        texture: Handle,
        heap: &HeapView<'_>,
        descriptor: Ptr,
    ) -> Handle {
        let Some(texture_ref) = self.external_of(texture, ObjectKind::Texture) else {
            return INVALID_HANDLE;
        };
        let desc = (descriptor != 0).then(|| decode::texture_view_descriptor(heap, descriptor));
        let view = self.api.create_texture_view(&texture_ref, desc.as_ref());
        self.registry
            .borrow_mut()
            .store_with_parent(ObjectKind::TextureView, view, texture)
    }

    // ---- Buffer mapping -------------------------------------------------

    pub fn buffer_map_async(
        &mut self,
        buffer: Handle,
        callback: BufferMapCallback,
        user_data: UserData,
        mode: MapMode,
        offset: u64,
        size: i64,
    ) {
        let Some(buffer_ref) = self.external_of(buffer, ObjectKind::Buffer) else {
            callback(buffer, ErrorKind::Validation, user_data);
            return;
        };
        let sender = self
            .completions
            .sender(move |result: Result<(), GpuError>| match result {
                Ok(()) => callback(buffer, ErrorKind::None, user_data),
                Err(error) => callback(buffer, error.kind, user_data),
            });
        self.api
            .map_buffer(&buffer_ref, mode, offset, explicit_size(size), sender);
    }

    /// Blocking variant of buffer mapping.
    pub fn buffer_map_sync(
        &mut self,
        buffer: Handle,
        mode: MapMode,
        offset: u64,
        size: i64,
    ) -> ErrorKind {
        let Some(buffer_ref) = self.external_of(buffer, ObjectKind::Buffer) else {
            return ErrorKind::Validation;
        };
        let (tx, rx) = oneshot_channel();
        let sender = self
            .completions
            .sender(move |result: Result<(), GpuError>| {
                let _ = tx.send(match result {
                    Ok(()) => ErrorKind::None.code(),
                    Err(error) => error.kind.code(),
                });
            });
        self.api
            .map_buffer(&buffer_ref, mode, offset, explicit_size(size), sender);
        self.dispatch_completions();
        match pollster::block_on(rx.receive()) {
            Some(code) => ErrorKind::from_code(code),
            None => ErrorKind::Internal,
        }
    }

    /// Acquires a mapped range and tracks it by its start offset. Returns the
    /// offset on success or `-1` when the underlying range acquisition fails
    /// (for example on an out-of-memory buffer).
    pub fn buffer_get_mapped_range(&mut self, buffer: Handle, offset: u64, size: i64) -> i64 {
        let Some(buffer_ref) = self.external_of(buffer, ObjectKind::Buffer) else {
            return -1;
        };
        let size = explicit_size(size);
        if !self.api.get_mapped_range(&buffer_ref, offset, size) {
            tracing::error!(buffer, offset, "mapped range acquisition failed");
            return -1;
        }
        self.registry
            .borrow_mut()
            .track_mapped_range(buffer, offset, size);
        offset as i64
    }

    /// Copies out of a previously acquired mapped range. `range_offset` must
    /// be the exact offset the range was acquired at.
    pub fn buffer_read_mapped_range(
        &self,
        buffer: Handle,
        range_offset: u64,
        sub_offset: u64,
        dst: &mut [u8],
    ) -> Result<(), BridgeError> {
        let registry = self.registry.borrow();
        let Some(record) = registry.get(buffer) else {
            return Err(BridgeError::UnknownHandle(buffer));
        };
        debug_assert!(record.kind.is_buffer(), "read_mapped_range on non-buffer");
        if !record.mapped_ranges.contains_key(&range_offset) {
            return Err(BridgeError::NoSuchMappedRange {
                buffer,
                offset: range_offset,
            });
        }
        self.api
            .read_mapped_range(&record.external, range_offset, sub_offset, dst);
        Ok(())
    }

    /// Copies into a previously acquired mapped range.
    pub fn buffer_write_mapped_range(
        &self,
        buffer: Handle,
        range_offset: u64,
        sub_offset: u64,
        src: &[u8],
    ) -> Result<(), BridgeError> {
        let registry = self.registry.borrow();
        let Some(record) = registry.get(buffer) else {
            return Err(BridgeError::UnknownHandle(buffer));
        };
        debug_assert!(record.kind.is_buffer(), "write_mapped_range on non-buffer");
        if !record.mapped_ranges.contains_key(&range_offset) {
            return Err(BridgeError::NoSuchMappedRange {
                buffer,
                offset: range_offset,
            });
        }
        self.api
            .write_mapped_range(&record.external, range_offset, sub_offset, src);
        Ok(())
    }

    /// Unmaps the buffer and forgets every tracked range.
    pub fn buffer_unmap(&mut self, buffer: Handle) {
        let Some(buffer_ref) = self.external_of(buffer, ObjectKind::Buffer) else {
            return;
        };
        self.api.unmap_buffer(&buffer_ref);
        self.registry.borrow_mut().clear_mapped_ranges(buffer);
    }

    /// Reports the buffer's map state as its enum table index.
    pub fn buffer_map_state(&self, buffer: Handle) -> u32 {
        match self.external_of(buffer, ObjectKind::Buffer) {
            Some(buffer_ref) => {
                let state = self.api.buffer_map_state(&buffer_ref);
                let index = enums::BUFFER_MAP_STATES.index_of(state);
                debug_assert!(index != 0, "implementation reported unknown map state {state:?}");
                index
            }
            None => 0,
        }
    }

    // ---- Command recording boundaries ----------------------------------

    pub fn command_encoder_begin_render_pass(
        &mut self,
        encoder: Handle,
        heap: &HeapView<'_>,
        descriptor: Ptr,
    ) -> Handle {
        let Some(encoder_ref) = self.external_of(encoder, ObjectKind::CommandEncoder) else {
            return INVALID_HANDLE;
        };
        let desc = decode::render_pass_descriptor(heap, descriptor);
        let resolved = {
            let registry = self.registry.borrow();
            ResolvedRenderPass {
                color_views: desc
                    .color_attachments
                    .iter()
                    .map(|a| a.as_ref().and_then(|a| registry.external(a.view)))
                    .collect(),
                resolve_targets: desc
                    .color_attachments
                    .iter()
                    .map(|a| {
                        a.as_ref()
                            .and_then(|a| a.resolve_target)
                            .and_then(|t| registry.external(t))
                    })
                    .collect(),
                depth_stencil_view: desc
                    .depth_stencil_attachment
                    .as_ref()
                    .and_then(|ds| registry.external(ds.view)),
                occlusion_query_set: desc
                    .occlusion_query_set
                    .and_then(|q| registry.external(q)),
                timestamp_query_set: desc
                    .timestamp_writes
                    .as_ref()
                    .and_then(|tw| registry.external(tw.query_set)),
                desc: &desc,
            }
        };
        let pass = self.api.begin_render_pass(&encoder_ref, &resolved);
        self.registry
            .borrow_mut()
            .store(ObjectKind::RenderPassEncoder, pass)
    }

    pub fn command_encoder_begin_compute_pass(
        &mut self,
        encoder: Handle,
        heap: &HeapView<'_>,
        descriptor: Ptr,
    ) -> Handle {
        let Some(encoder_ref) = self.external_of(encoder, ObjectKind::CommandEncoder) else {
            return INVALID_HANDLE;
        };
        let desc = (descriptor != 0).then(|| decode::compute_pass_descriptor(heap, descriptor));
        let pass = self.api.begin_compute_pass(&encoder_ref, desc.as_ref());
        self.registry
            .borrow_mut()
            .store(ObjectKind::ComputePassEncoder, pass)
    }

    pub fn command_encoder_finish(&mut self, encoder: Handle) -> Handle {
        let Some(encoder_ref) = self.external_of(encoder, ObjectKind::CommandEncoder) else {
            return INVALID_HANDLE;
        };
        let buffer = self.api.finish_command_encoder(&encoder_ref);
        self.registry
            .borrow_mut()
            .store(ObjectKind::CommandBuffer, buffer)
    }

    pub fn render_bundle_encoder_finish(&mut self, encoder: Handle) -> Handle {
        let Some(encoder_ref) = self.external_of(encoder, ObjectKind::RenderBundleEncoder) else {
            return INVALID_HANDLE;
        };
        let bundle = self.api.finish_render_bundle_encoder(&encoder_ref);
        self.registry
            .borrow_mut()
            .store(ObjectKind::RenderBundle, bundle)
    }

    // ---- Queue ----------------------------------------------------------

    pub fn queue_on_submitted_work_done(
        &mut self,
        queue: Handle,
        callback: WorkDoneCallback,
        user_data: UserData,
    ) {
        let Some(queue_ref) = self.external_of(queue, ObjectKind::Queue) else {
            return;
        };
        let sender = self
            .completions
            .sender(move |_: ()| callback(queue, user_data));
        self.api.on_submitted_work_done(&queue_ref, sender);
    }
}

/// Registers a freshly acquired device and its default queue. The queue is a
/// derived object of the device so device teardown cascades into it.
fn store_device(
    registry: &Rc<RefCell<HandleRegistry>>,
    adapter: Handle,
    objects: Option<DeviceObjects>,
) -> Handle {
    let Some(objects) = objects else {
        return INVALID_HANDLE;
    };
    let mut registry = registry.borrow_mut();
    // The adapter may have been destroyed while the request was in flight;
    // deliver the device unparented in that case.
    let device = if registry.is_valid(adapter) {
        registry.store_with_parent(ObjectKind::Device, Some(objects.device), adapter)
    } else {
        registry.store(ObjectKind::Device, Some(objects.device))
    };
    if device != INVALID_HANDLE {
        registry.store_with_parent(ObjectKind::Queue, Some(objects.queue), device);
    }
    device
}

/// Sizes are passed as `i64` across the boundary; negative means "to the end
/// of the buffer".
fn explicit_size(size: i64) -> Option<u64> {
    (size >= 0).then_some(size as u64)
}
