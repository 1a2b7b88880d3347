//! Mapped-range tracking: the create-mapped / read / unmap / re-read flow.

use pretty_assertions::assert_eq;

use vitro_protocol::encode::DescriptorWriter;
use vitro_protocol::heap::HeapView;
use vitro_protocol::{
    enums, AdapterOptions, BufferDescriptor, BufferUsage, DeviceDescriptor, MapMode,
    SupportedLimits,
};
use vitro_webgpu::bridge::WebGpuBridge;
use vitro_webgpu::completion::ErrorKind;
use vitro_webgpu::fake::FakeApi;
use vitro_webgpu::{BridgeError, Handle};

fn setup_device(bridge: &mut WebGpuBridge<FakeApi>) -> Handle {
    let mut writer = DescriptorWriter::new();
    let options = writer.adapter_options(&AdapterOptions {
        power_preference: None,
        force_fallback_adapter: false,
    });
    let device_desc = writer.device_descriptor(&DeviceDescriptor {
        required_limits: SupportedLimits::default(),
        default_queue_label: None,
        required_features: 0,
    });
    let bytes = writer.finish();
    let heap = HeapView::new(&bytes);
    let adapter = bridge.request_adapter_sync(&heap, options);
    bridge.adapter_request_device_sync(adapter, &heap, device_desc)
}

fn create_buffer(bridge: &mut WebGpuBridge<FakeApi>, device: Handle, size: u64) -> Handle {
    let mut writer = DescriptorWriter::new();
    let desc = writer.buffer_descriptor(&BufferDescriptor {
        size,
        usage: BufferUsage::MAP_WRITE | BufferUsage::COPY_SRC,
        mapped_at_creation: true,
    });
    let bytes = writer.finish();
    bridge.device_create_buffer(device, &HeapView::new(&bytes), desc)
}

#[test]
fn mapped_at_creation_buffer_lifecycle() {
    let mut bridge = WebGpuBridge::new(FakeApi::new());
    let device = setup_device(&mut bridge);

    let buffer = create_buffer(&mut bridge, device, 256);
    assert!(buffer > 0);
    assert_eq!(
        bridge.buffer_map_state(buffer),
        enums::BUFFER_MAP_STATES.index_of("mapped")
    );

    // Acquire the whole buffer as one range, keyed by its start offset.
    assert_eq!(bridge.buffer_get_mapped_range(buffer, 0, 256), 0);

    let payload = [0xA5u8; 16];
    bridge
        .buffer_write_mapped_range(buffer, 0, 32, &payload)
        .unwrap();
    let mut readback = [0u8; 16];
    bridge
        .buffer_read_mapped_range(buffer, 0, 32, &mut readback)
        .unwrap();
    assert_eq!(readback, payload);

    // Unmapping forgets every tracked range.
    bridge.buffer_unmap(buffer);
    assert_eq!(
        bridge.buffer_map_state(buffer),
        enums::BUFFER_MAP_STATES.index_of("unmapped")
    );
    assert_eq!(
        bridge.buffer_read_mapped_range(buffer, 0, 0, &mut readback),
        Err(BridgeError::NoSuchMappedRange { buffer, offset: 0 })
    );

    // An unmapped buffer cannot hand out ranges either.
    assert_eq!(bridge.buffer_get_mapped_range(buffer, 0, 256), -1);
}

#[test]
fn remapping_restores_range_access() {
    let mut bridge = WebGpuBridge::new(FakeApi::new());
    let device = setup_device(&mut bridge);
    let buffer = create_buffer(&mut bridge, device, 128);

    assert_eq!(bridge.buffer_get_mapped_range(buffer, 0, 128), 0);
    bridge.buffer_unmap(buffer);

    assert_eq!(
        bridge.buffer_map_sync(buffer, MapMode::WRITE, 0, -1),
        ErrorKind::None
    );
    // Negative size maps to "rest of the buffer".
    assert_eq!(bridge.buffer_get_mapped_range(buffer, 64, -1), 64);

    let data = [7u8; 8];
    bridge
        .buffer_write_mapped_range(buffer, 64, 0, &data)
        .unwrap();
    let mut readback = [0u8; 8];
    bridge
        .buffer_read_mapped_range(buffer, 64, 0, &mut readback)
        .unwrap();
    assert_eq!(readback, data);

    // The range is keyed by its start offset; other offsets stay invalid.
    assert_eq!(
        bridge.buffer_read_mapped_range(buffer, 0, 0, &mut readback),
        Err(BridgeError::NoSuchMappedRange { buffer, offset: 0 })
    );
}

#[test]
fn failed_range_acquisition_returns_the_sentinel() {
    let mut bridge = WebGpuBridge::new(FakeApi::new());
    let device = setup_device(&mut bridge);
    let buffer = create_buffer(&mut bridge, device, 64);

    bridge.api().fail_next_mapped_range.set(true);
    assert_eq!(bridge.buffer_get_mapped_range(buffer, 0, 64), -1);

    // The failed acquisition must not have been tracked.
    let mut byte = [0u8; 1];
    assert_eq!(
        bridge.buffer_read_mapped_range(buffer, 0, 0, &mut byte),
        Err(BridgeError::NoSuchMappedRange { buffer, offset: 0 })
    );
}

#[test]
fn range_operations_on_unknown_buffers_degrade_to_errors() {
    let bridge = WebGpuBridge::new(FakeApi::new());
    let mut byte = [0u8; 1];
    assert_eq!(
        bridge.buffer_read_mapped_range(555, 0, 0, &mut byte),
        Err(BridgeError::UnknownHandle(555))
    );
}
