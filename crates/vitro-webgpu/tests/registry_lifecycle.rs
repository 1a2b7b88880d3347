//! Handle allocation, ownership cascades, and the reserved frame-texture
//! slot.

use pretty_assertions::assert_eq;

use std::rc::Rc;

use vitro_webgpu::fake::FakeObject;
use vitro_webgpu::registry::{HandleRegistry, FIRST_DYNAMIC_HANDLE, FRAME_TEXTURE_HANDLE};
use vitro_webgpu::{ExternalRef, ObjectKind, INVALID_HANDLE};

fn obj(tag: &'static str) -> (Rc<FakeObject>, ExternalRef) {
    let object = FakeObject::new(tag);
    let cloned: Rc<FakeObject> = Rc::clone(&object);
    let external: ExternalRef = cloned;
    (object, external)
}

#[test]
fn live_handles_are_unique() {
    let mut registry = HandleRegistry::new();
    let mut handles = Vec::new();
    for _ in 0..100 {
        let (_, external) = obj("buffer");
        handles.push(registry.store(ObjectKind::Buffer, Some(external)));
    }
    let mut deduped = handles.clone();
    deduped.sort_unstable();
    deduped.dedup();
    assert_eq!(deduped.len(), handles.len());
    assert!(handles.iter().all(|&h| h >= FIRST_DYNAMIC_HANDLE));
    assert_eq!(registry.live_object_count(), 100);
}

#[test]
fn storing_nothing_is_a_creation_failure() {
    let mut registry = HandleRegistry::new();
    assert_eq!(registry.store(ObjectKind::Buffer, None), INVALID_HANDLE);
    assert_eq!(registry.live_object_count(), 0);
}

#[test]
fn freed_ids_are_reused() {
    let mut registry = HandleRegistry::new();
    let (_, a) = obj("buffer");
    let first = registry.store(ObjectKind::Buffer, Some(a));
    registry.destroy(first);

    let (_, b) = obj("buffer");
    let second = registry.store(ObjectKind::Buffer, Some(b));
    assert_eq!(second, first);
}

#[test]
fn wraparound_skips_live_handles() {
    // Small id space stand-in: ids 2..=7, one slot of headroom over the five
    // handles kept live below so allocation always has a gap to find.
    let mut registry = HandleRegistry::with_id_ceiling(7);

    let mut live = Vec::new();
    for _ in 0..5 {
        let (_, external) = obj("buffer");
        live.push(registry.store(ObjectKind::Buffer, Some(external)));
    }
    assert_eq!(live, vec![2, 3, 4, 5, 6]);

    // Free one id in the middle; the next allocation must land there and
    // nowhere else.
    registry.destroy(4);
    live.retain(|&id| id != 4);
    let (_, external) = obj("buffer");
    let reused = registry.store(ObjectKind::Buffer, Some(external));
    assert_eq!(reused, 4);
    live.push(reused);

    // Allocate and retire across the wraparound boundary many times over,
    // mirroring the registry's live set as it changes; a fresh allocation
    // must never collide with a handle that is live at allocation time.
    for _ in 0..50 {
        let (_, external) = obj("texture");
        let id = registry.store(ObjectKind::Texture, Some(external));
        assert!(!live.contains(&id), "allocator reissued live id {id}");
        assert_eq!(registry.kind_of(id), Some(ObjectKind::Texture));
        live.push(id);

        let retired = live.remove(0);
        registry.destroy(retired);
        assert!(!registry.is_valid(retired));
        assert_eq!(registry.live_object_count(), 5);
    }
}

#[test]
fn destroy_cascades_through_derived_objects() {
    let mut registry = HandleRegistry::new();
    let (device_obj, device_ref) = obj("device");
    let device = registry.store(ObjectKind::Device, Some(device_ref));

    let (texture_obj, texture_ref) = obj("texture");
    let texture = registry.store_with_parent(ObjectKind::Texture, Some(texture_ref), device);

    let (_, view_a_ref) = obj("texture-view");
    let view_a = registry.store_with_parent(ObjectKind::TextureView, Some(view_a_ref), texture);
    let (_, view_b_ref) = obj("texture-view");
    let view_b = registry.store_with_parent(ObjectKind::TextureView, Some(view_b_ref), texture);

    assert_eq!(registry.live_object_count(), 4);

    registry.destroy(device);

    assert_eq!(registry.live_object_count(), 0);
    for id in [device, texture, view_a, view_b] {
        assert!(!registry.is_valid(id));
        assert_eq!(registry.kind_of(id), None);
    }
    // Kinds with an explicit teardown got it; views have none to call.
    assert!(device_obj.destroyed.get());
    assert!(texture_obj.destroyed.get());
}

#[test]
fn destroying_a_child_unlinks_it_from_its_parent() {
    let mut registry = HandleRegistry::new();
    let (_, texture_ref) = obj("texture");
    let texture = registry.store(ObjectKind::Texture, Some(texture_ref));
    let (_, view_ref) = obj("texture-view");
    let view = registry.store_with_parent(ObjectKind::TextureView, Some(view_ref), texture);

    registry.destroy(view);
    assert!(registry.is_valid(texture));
    assert!(registry.get(texture).unwrap().derived.is_empty());

    // The parent cascade must not trip over the already-destroyed child.
    registry.destroy(texture);
    assert_eq!(registry.live_object_count(), 0);
}

#[test]
fn destroy_is_idempotent() {
    let mut registry = HandleRegistry::new();
    let (object, external) = obj("buffer");
    let id = registry.store(ObjectKind::Buffer, Some(external));

    registry.destroy(id);
    assert_eq!(registry.live_object_count(), 0);
    assert!(object.destroyed.get());

    // Unknown and already-destroyed ids are no-ops.
    registry.destroy(id);
    registry.destroy(99_999);
    registry.destroy(INVALID_HANDLE);
    assert_eq!(registry.live_object_count(), 0);
}

#[test]
fn destroy_all_is_a_flat_teardown_pass() {
    let mut registry = HandleRegistry::new();
    let (device_obj, device_ref) = obj("device");
    let device = registry.store(ObjectKind::Device, Some(device_ref));
    let (buffer_obj, buffer_ref) = obj("buffer");
    registry.store_with_parent(ObjectKind::Buffer, Some(buffer_ref), device);

    registry.destroy_all();

    assert_eq!(registry.live_object_count(), 0);
    assert!(device_obj.destroyed.get());
    assert!(buffer_obj.destroyed.get());

    // The full clear resets the allocator.
    let (_, external) = obj("buffer");
    assert_eq!(
        registry.store(ObjectKind::Buffer, Some(external)),
        FIRST_DYNAMIC_HANDLE
    );
}

#[test]
fn frame_texture_replacement_destroys_the_prior_occupant() {
    let mut registry = HandleRegistry::new();
    let (_, context_ref) = obj("canvas-context");
    let context = registry.store(ObjectKind::CanvasContext, Some(context_ref));

    let (first_obj, first_ref) = obj("frame-texture");
    assert_eq!(
        registry.install_frame_texture(context, first_ref),
        FRAME_TEXTURE_HANDLE
    );
    let (_, view_ref) = obj("texture-view");
    let view =
        registry.store_with_parent(ObjectKind::TextureView, Some(view_ref), FRAME_TEXTURE_HANDLE);

    let (second_obj, second_ref) = obj("frame-texture");
    assert_eq!(
        registry.install_frame_texture(context, second_ref),
        FRAME_TEXTURE_HANDLE
    );

    // Prior occupant and its derived view are gone; the new texture starts
    // with an empty derived list.
    assert!(first_obj.destroyed.get());
    assert!(!registry.is_valid(view));
    assert!(registry
        .get(FRAME_TEXTURE_HANDLE)
        .unwrap()
        .derived
        .is_empty());
    assert!(!second_obj.destroyed.get());
}

#[test]
fn frame_texture_reinstall_of_same_object_is_a_no_op() {
    let mut registry = HandleRegistry::new();
    let (_, context_ref) = obj("canvas-context");
    let context = registry.store(ObjectKind::CanvasContext, Some(context_ref));

    let (texture_obj, texture_ref) = obj("frame-texture");
    registry.install_frame_texture(context, Rc::clone(&texture_ref));
    let (_, view_ref) = obj("texture-view");
    let view =
        registry.store_with_parent(ObjectKind::TextureView, Some(view_ref), FRAME_TEXTURE_HANDLE);

    // Same underlying object: registry state, including the derived view,
    // must be left untouched.
    registry.install_frame_texture(context, texture_ref);

    assert!(!texture_obj.destroyed.get());
    assert!(registry.is_valid(view));
    assert_eq!(
        registry.get(FRAME_TEXTURE_HANDLE).unwrap().derived,
        vec![view]
    );
}

#[test]
fn destroying_the_context_takes_the_frame_texture_with_it() {
    let mut registry = HandleRegistry::new();
    let (_, context_ref) = obj("canvas-context");
    let context = registry.store(ObjectKind::CanvasContext, Some(context_ref));
    let (texture_obj, texture_ref) = obj("frame-texture");
    registry.install_frame_texture(context, texture_ref);

    registry.destroy(context);

    assert!(!registry.is_valid(FRAME_TEXTURE_HANDLE));
    assert!(texture_obj.destroyed.get());
    assert_eq!(registry.live_object_count(), 0);
}

#[test]
fn labels_round_trip() {
    let mut registry = HandleRegistry::new();
    let (_, external) = obj("buffer");
    let id = registry.store(ObjectKind::Buffer, Some(external));

    assert_eq!(registry.label(id), Some(""));
    registry.set_label(id, "vertex ring");
    assert_eq!(registry.label(id), Some("vertex ring"));
    assert_eq!(registry.label(12345), None);
}

#[test]
fn record_back_reference_matches_its_handle() {
    let mut registry = HandleRegistry::new();
    let (_, external) = obj("sampler");
    let id = registry.store(ObjectKind::Sampler, Some(external));
    assert_eq!(registry.get(id).unwrap().id, id);
}
