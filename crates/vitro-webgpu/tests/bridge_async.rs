//! Async completion bridge behavior: exactly-once delivery, standing error
//! sinks, terminal device-lost, and the blocking variants.

use pretty_assertions::assert_eq;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use vitro_protocol::encode::DescriptorWriter;
use vitro_protocol::heap::HeapView;
use vitro_protocol::{AdapterOptions, DeviceDescriptor, MapMode, SupportedLimits};
use vitro_webgpu::api::DeviceLost;
use vitro_webgpu::bridge::WebGpuBridge;
use vitro_webgpu::completion::{DeviceLostReason, ErrorKind, GpuError};
use vitro_webgpu::fake::FakeApi;
use vitro_webgpu::{Handle, ObjectKind, INVALID_HANDLE};

fn boundary_heap() -> (Vec<u8>, u32, u32) {
    let mut writer = DescriptorWriter::new();
    let options = writer.adapter_options(&AdapterOptions {
        power_preference: Some("high-performance"),
        force_fallback_adapter: false,
    });
    let device_desc = writer.device_descriptor(&DeviceDescriptor {
        required_limits: SupportedLimits::default(),
        default_queue_label: None,
        required_features: 0,
    });
    (writer.finish(), options, device_desc)
}

fn setup_device(bridge: &mut WebGpuBridge<FakeApi>) -> (Handle, Handle) {
    let (bytes, options, device_desc) = boundary_heap();
    let heap = HeapView::new(&bytes);
    let adapter = bridge.request_adapter_sync(&heap, options);
    assert!(adapter > 0);
    let device = bridge.adapter_request_device_sync(adapter, &heap, device_desc);
    assert!(device > 0);
    (adapter, device)
}

#[test]
fn adapter_request_refuses_to_start_without_webgpu() {
    let mut bridge = WebGpuBridge::new(FakeApi::new());
    let (bytes, options, _) = boundary_heap();
    let heap = HeapView::new(&bytes);

    bridge.api().gpu_unavailable.set(true);
    assert!(!bridge.gpu_available());
    let started = bridge.request_adapter_async(&heap, options, Box::new(|_, _| panic!()), 0);
    assert!(!started);
    assert_eq!(bridge.request_adapter_sync(&heap, options), INVALID_HANDLE);
}

#[test]
fn adapter_callback_runs_only_on_dispatch_and_only_once() {
    let mut bridge = WebGpuBridge::new(FakeApi::new());
    let (bytes, options, _) = boundary_heap();
    let heap = HeapView::new(&bytes);

    let seen: Rc<RefCell<Vec<(Handle, u64)>>> = Rc::new(RefCell::new(Vec::new()));
    let seen2 = Rc::clone(&seen);
    let started = bridge.request_adapter_async(
        &heap,
        options,
        Box::new(move |adapter, user_data| seen2.borrow_mut().push((adapter, user_data))),
        0xC0FFEE,
    );
    assert!(started);

    // Nothing runs until the event loop drains the queue.
    assert!(seen.borrow().is_empty());
    assert_eq!(bridge.dispatch_completions(), 1);
    {
        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        let (adapter, user_data) = seen[0];
        assert!(adapter > 0);
        assert_eq!(user_data, 0xC0FFEE);
        assert_eq!(bridge.object_kind(adapter), Some(ObjectKind::Adapter));
    }
    // Exactly once: a second drain delivers nothing.
    assert_eq!(bridge.dispatch_completions(), 0);
    assert_eq!(seen.borrow().len(), 1);
}

#[test]
fn device_acquisition_registers_the_queue_as_a_derived_object() {
    let mut bridge = WebGpuBridge::new(FakeApi::new());
    let (adapter, device) = setup_device(&mut bridge);

    assert_eq!(bridge.object_kind(device), Some(ObjectKind::Device));
    let queue = bridge.device_get_queue(device);
    assert!(queue > 0);
    assert_eq!(bridge.object_kind(queue), Some(ObjectKind::Queue));

    // Device teardown cascades into its queue but not its adapter siblings.
    bridge.object_destroy(device);
    assert!(!bridge.is_valid_object(queue));
    assert!(bridge.is_valid_object(adapter));
}

#[test]
fn failed_device_request_delivers_the_invalid_handle() {
    let mut bridge = WebGpuBridge::new(FakeApi::new());
    let (adapter, _) = setup_device(&mut bridge);
    let (bytes, _, device_desc) = boundary_heap();
    let heap = HeapView::new(&bytes);

    bridge.api().fail_next_create.set(true);
    let result = Rc::new(Cell::new(Some(42)));
    let result2 = Rc::clone(&result);
    bridge.adapter_request_device_async(
        adapter,
        &heap,
        device_desc,
        Box::new(move |device, _| result2.set(Some(device))),
        0,
    );
    bridge.dispatch_completions();
    assert_eq!(result.get(), Some(INVALID_HANDLE));
}

#[test]
fn async_pipeline_compilation_reports_success_and_failure_through_one_channel() {
    let mut bridge = WebGpuBridge::new(FakeApi::new());
    let (_, device) = setup_device(&mut bridge);

    let mut writer = DescriptorWriter::new();
    let module_desc = writer.shader_module_descriptor(&vitro_protocol::ShaderModuleDescriptor {
        code: "fn main() {}",
    });
    let bytes = writer.finish();
    let heap = HeapView::new(&bytes);
    let module = bridge.device_create_shader_module(device, &heap, module_desc);
    assert!(module > 0);

    let mut writer = DescriptorWriter::new();
    let pipeline_desc = writer.render_pipeline_descriptor(&minimal_pipeline(module));
    let bytes = writer.finish();
    let heap = HeapView::new(&bytes);

    // Success: status None plus a fresh pipeline handle.
    let ok: Rc<Cell<Option<(ErrorKind, Handle)>>> = Rc::new(Cell::new(None));
    let ok2 = Rc::clone(&ok);
    bridge.device_create_render_pipeline_async(
        device,
        &heap,
        pipeline_desc,
        Box::new(move |_, status, pipeline, _| ok2.set(Some((status, pipeline)))),
        1,
    );
    bridge.dispatch_completions();
    let (status, pipeline) = ok.get().unwrap();
    assert_eq!(status, ErrorKind::None);
    assert_eq!(bridge.object_kind(pipeline), Some(ObjectKind::RenderPipeline));

    // Failure: same callback channel, classified status, no handle.
    *bridge.api().next_pipeline_error.borrow_mut() =
        Some(GpuError::validation("entry point not found"));
    let err: Rc<Cell<Option<(ErrorKind, Handle)>>> = Rc::new(Cell::new(None));
    let err2 = Rc::clone(&err);
    bridge.device_create_render_pipeline_async(
        device,
        &heap,
        pipeline_desc,
        Box::new(move |_, status, pipeline, _| err2.set(Some((status, pipeline)))),
        2,
    );
    bridge.dispatch_completions();
    assert_eq!(err.get(), Some((ErrorKind::Validation, INVALID_HANDLE)));
}

#[test]
fn error_scope_pop_classifies_the_captured_error() {
    let mut bridge = WebGpuBridge::new(FakeApi::new());
    let (_, device) = setup_device(&mut bridge);

    bridge.device_push_error_scope(device, 2); // "validation"
    assert_eq!(bridge.api().error_scope_depth(), 1);
    *bridge.api().next_scope_error.borrow_mut() =
        Some(GpuError::validation("buffer usage mismatch"));

    let seen: Rc<Cell<Option<ErrorKind>>> = Rc::new(Cell::new(None));
    let message: Rc<RefCell<Option<String>>> = Rc::new(RefCell::new(None));
    let seen2 = Rc::clone(&seen);
    let message2 = Rc::clone(&message);
    bridge.device_pop_error_scope_async(
        device,
        Box::new(move |_, status, msg, _| {
            seen2.set(Some(status));
            *message2.borrow_mut() = msg;
        }),
        0,
    );
    bridge.dispatch_completions();
    assert_eq!(seen.get(), Some(ErrorKind::Validation));
    assert_eq!(message.borrow().as_deref(), Some("buffer usage mismatch"));
    assert_eq!(bridge.api().error_scope_depth(), 0);

    // A clean pop reports the success status on the same channel.
    bridge.device_push_error_scope(device, 1); // "out-of-memory"
    let (status, msg) = bridge.device_pop_error_scope_sync(device);
    assert_eq!(status, ErrorKind::None);
    assert_eq!(msg, None);
}

#[test]
fn uncaptured_error_sink_is_a_standing_registration() {
    let mut bridge = WebGpuBridge::new(FakeApi::new());
    let (_, device) = setup_device(&mut bridge);

    let seen: Rc<RefCell<Vec<(ErrorKind, String)>>> = Rc::new(RefCell::new(Vec::new()));
    let seen2 = Rc::clone(&seen);
    bridge.device_set_uncaptured_error_callback(
        device,
        Some(Box::new(move |_, status, message, _| {
            seen2.borrow_mut().push((status, message));
        })),
        0,
    );

    bridge
        .api()
        .inject_uncaptured_error(GpuError::validation("first"));
    bridge
        .api()
        .inject_uncaptured_error(GpuError::out_of_memory("second"));
    bridge.dispatch_completions();
    bridge
        .api()
        .inject_uncaptured_error(GpuError::internal("third"));
    bridge.dispatch_completions();

    assert_eq!(
        &*seen.borrow(),
        &[
            (ErrorKind::Validation, "first".to_owned()),
            (ErrorKind::OutOfMemory, "second".to_owned()),
            (ErrorKind::Internal, "third".to_owned()),
        ]
    );
}

#[test]
fn device_lost_notification_is_terminal_and_fires_once() {
    let mut bridge = WebGpuBridge::new(FakeApi::new());
    let (_, device) = setup_device(&mut bridge);

    let seen: Rc<RefCell<Vec<(DeviceLostReason, String)>>> = Rc::new(RefCell::new(Vec::new()));
    let seen2 = Rc::clone(&seen);
    bridge.device_set_lost_callback(
        device,
        Box::new(move |_, reason, message, _| seen2.borrow_mut().push((reason, message))),
        0,
    );

    bridge.api().lose_device(DeviceLost {
        reason: DeviceLostReason::Destroyed,
        message: "device destroyed".to_owned(),
    });
    // A second loss report finds no watcher left to fire.
    bridge.api().lose_device(DeviceLost {
        reason: DeviceLostReason::Unknown,
        message: "again".to_owned(),
    });
    bridge.dispatch_completions();

    assert_eq!(
        &*seen.borrow(),
        &[(DeviceLostReason::Destroyed, "device destroyed".to_owned())]
    );
}

#[test]
fn submitted_work_done_resolves_with_the_queue_handle() {
    let mut bridge = WebGpuBridge::new(FakeApi::new());
    let (_, device) = setup_device(&mut bridge);
    let queue = bridge.device_get_queue(device);

    let seen: Rc<Cell<Option<(Handle, u64)>>> = Rc::new(Cell::new(None));
    let seen2 = Rc::clone(&seen);
    bridge.queue_on_submitted_work_done(
        queue,
        Box::new(move |queue, user_data| seen2.set(Some((queue, user_data)))),
        7,
    );
    bridge.dispatch_completions();
    assert_eq!(seen.get(), Some((queue, 7)));
}

#[test]
fn image_decode_registers_a_bitmap_usable_for_external_textures() {
    let mut bridge = WebGpuBridge::new(FakeApi::new());
    let (_, device) = setup_device(&mut bridge);
    bridge.api().image_size.set((320, 200));

    let seen: Rc<Cell<Option<(Handle, u32, u32)>>> = Rc::new(Cell::new(None));
    let seen2 = Rc::clone(&seen);
    bridge.load_image_bitmap_async(
        "https://example.test/sprite.png",
        true,
        Box::new(move |bitmap, width, height, _| seen2.set(Some((bitmap, width, height)))),
        0,
    );
    bridge.dispatch_completions();

    let (bitmap, width, height) = seen.get().unwrap();
    assert_eq!((width, height), (320, 200));
    assert_eq!(bridge.object_kind(bitmap), Some(ObjectKind::ImageBitmap));

    let external = bridge.device_import_external_texture(device, bitmap);
    assert_eq!(bridge.object_kind(external), Some(ObjectKind::ExternalTexture));
}

#[test]
fn pending_completion_still_fires_after_its_handle_is_destroyed() {
    let mut bridge = WebGpuBridge::new(FakeApi::new());
    let (_, device) = setup_device(&mut bridge);

    let mut writer = DescriptorWriter::new();
    let buffer_desc = writer.buffer_descriptor(&vitro_protocol::BufferDescriptor {
        size: 64,
        usage: vitro_protocol::BufferUsage::MAP_READ,
        mapped_at_creation: false,
    });
    let bytes = writer.finish();
    let heap = HeapView::new(&bytes);
    let buffer = bridge.device_create_buffer(device, &heap, buffer_desc);

    let seen: Rc<Cell<Option<(Handle, ErrorKind)>>> = Rc::new(Cell::new(None));
    let seen2 = Rc::clone(&seen);
    bridge.buffer_map_async(
        buffer,
        Box::new(move |buffer, status, _| seen2.set(Some((buffer, status)))),
        0,
        MapMode::READ,
        0,
        -1,
    );

    // Destruction does not cancel the pending operation; the callback is
    // delivered with the now-dangling handle.
    bridge.object_destroy(buffer);
    assert!(!bridge.is_valid_object(buffer));
    bridge.dispatch_completions();
    assert_eq!(seen.get(), Some((buffer, ErrorKind::None)));
}

#[test]
fn blocking_map_variant_reports_classified_failures() {
    let mut bridge = WebGpuBridge::new(FakeApi::new());
    let (_, device) = setup_device(&mut bridge);

    let mut writer = DescriptorWriter::new();
    let buffer_desc = writer.buffer_descriptor(&vitro_protocol::BufferDescriptor {
        size: 64,
        usage: vitro_protocol::BufferUsage::MAP_WRITE,
        mapped_at_creation: false,
    });
    let bytes = writer.finish();
    let heap = HeapView::new(&bytes);
    let buffer = bridge.device_create_buffer(device, &heap, buffer_desc);

    assert_eq!(
        bridge.buffer_map_sync(buffer, MapMode::WRITE, 0, -1),
        ErrorKind::None
    );

    *bridge.api().next_map_error.borrow_mut() = Some(GpuError::validation("already mapped"));
    assert_eq!(
        bridge.buffer_map_sync(buffer, MapMode::WRITE, 0, -1),
        ErrorKind::Validation
    );
}

fn minimal_pipeline(module: Handle) -> vitro_protocol::RenderPipelineDescriptor<'static> {
    vitro_protocol::RenderPipelineDescriptor {
        vertex: vitro_protocol::VertexState {
            module,
            entry_point: None,
            buffers: vec![],
            constants: vec![],
        },
        primitive: vitro_protocol::PrimitiveState {
            topology: Some("triangle-list"),
            strip_index_format: None,
            front_face: None,
            cull_mode: None,
            unclipped_depth: false,
        },
        depth_stencil: None,
        multisample: None,
        fragment: None,
        layout: vitro_protocol::LayoutRef::Auto,
    }
}
