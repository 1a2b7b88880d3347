//! Handle allocation and the object registry.
//!
//! Handles are reused aggressively: a renderer can burn through thousands of
//! ids per frame (command encoders, pass encoders, swap chain textures,
//! command buffers), so a signed 32-bit id space wraps within hours of
//! realistic use. Freed ids go on a free list for amortized O(1) reuse; when
//! the list is empty the allocator probes forward from a monotonic counter,
//! wrapping from the ceiling back to the first dynamic id and skipping any
//! slot that is still occupied.

use std::collections::HashMap;
use std::rc::Rc;

use crate::object::{ExternalRef, ObjectKind, ObjectRecord};

pub type Handle = i32;

/// The invalid/no-object sentinel. Never present in the registry.
pub const INVALID_HANDLE: Handle = 0;

/// Reserved for the current-frame presentation texture. Its occupant is
/// replaced every presentation cycle and is never allocated dynamically.
pub const FRAME_TEXTURE_HANDLE: Handle = 1;

/// First id the allocator hands out.
pub const FIRST_DYNAMIC_HANDLE: Handle = 2;

pub struct HandleRegistry {
    objects: HashMap<Handle, ObjectRecord>,
    free_ids: Vec<Handle>,
    next_id: Handle,
    id_ceiling: Handle,
}

impl Default for HandleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::with_id_ceiling(Handle::MAX)
    }

    /// A registry whose dynamic ids wrap at `id_ceiling` instead of
    /// `i32::MAX`. Production code wants the default; a small ceiling makes
    /// wraparound behavior testable.
    pub fn with_id_ceiling(id_ceiling: Handle) -> Self {
        assert!(id_ceiling >= FIRST_DYNAMIC_HANDLE);
        Self {
            objects: HashMap::new(),
            free_ids: Vec::new(),
            next_id: FIRST_DYNAMIC_HANDLE,
            id_ceiling,
        }
    }

    /// Returns an id not currently occupied.
    ///
    /// Diverges if every id up to the ceiling is live, which is unreachable
    /// at realistic allocation rates against a 2^31 id space.
    fn alloc_id(&mut self) -> Handle {
        while let Some(id) = self.free_ids.pop() {
            // An id can sit on the free list and still have been re-issued by
            // the probing path after a wraparound; skip those.
            if !self.objects.contains_key(&id) {
                return id;
            }
        }
        loop {
            let id = self.next_id;
            self.next_id = if self.next_id >= self.id_ceiling {
                FIRST_DYNAMIC_HANDLE
            } else {
                self.next_id + 1
            };
            if !self.objects.contains_key(&id) {
                return id;
            }
        }
    }

    /// Stores `external` under a fresh id and returns it.
    ///
    /// `None` signals that the underlying creation call failed; this is
    /// surfaced as a logged error and [`INVALID_HANDLE`], not a panic.
    pub fn store(&mut self, kind: ObjectKind, external: Option<ExternalRef>) -> Handle {
        let Some(external) = external else {
            tracing::error!(?kind, "creation failed, no object to store");
            return INVALID_HANDLE;
        };
        let id = self.alloc_id();
        self.objects.insert(id, ObjectRecord::new(id, kind, external));
        id
    }

    /// Stores `external` as a derived object of `parent`.
    ///
    /// `parent` must reference a live record; a dead parent is a caller
    /// contract breach and the link is silently dropped in release builds.
    pub fn store_with_parent(
        &mut self,
        kind: ObjectKind,
        external: Option<ExternalRef>,
        parent: Handle,
    ) -> Handle {
        let id = self.store(kind, external);
        if id != INVALID_HANDLE {
            self.link_parent_and_child(parent, id);
        }
        id
    }

    fn link_parent_and_child(&mut self, parent: Handle, child: Handle) {
        debug_assert!(
            self.objects.contains_key(&parent),
            "parent {parent} is not a live object"
        );
        if let Some(record) = self.objects.get_mut(&parent) {
            record.derived.push(child);
        }
        if let Some(record) = self.objects.get_mut(&child) {
            record.parent = Some(parent);
        }
    }

    /// Destroys `id` and, transitively, everything derived from it.
    ///
    /// Idempotent: unknown ids are a no-op. The record is removed from the
    /// map before any teardown call or recursion, so re-entrant destruction
    /// of an id already mid-teardown cannot double-free or loop.
    pub fn destroy(&mut self, id: Handle) {
        let Some(record) = self.objects.remove(&id) else {
            return;
        };
        if let Some(parent) = record.parent {
            if let Some(parent_record) = self.objects.get_mut(&parent) {
                parent_record.derived.retain(|&d| d != id);
            }
        }
        if record.kind.has_explicit_destroy() {
            record.external.destroy();
        }
        for child in record.derived {
            self.destroy(child);
        }
        if id >= FIRST_DYNAMIC_HANDLE {
            self.free_ids.push(id);
        }
    }

    /// Tears down every live record in one flat pass (no cascade) and clears
    /// the registry, including the allocator state. Used for full shutdown.
    pub fn destroy_all(&mut self) {
        for record in self.objects.values() {
            if record.kind.has_explicit_destroy() {
                record.external.destroy();
            }
        }
        self.objects.clear();
        self.free_ids.clear();
        self.next_id = FIRST_DYNAMIC_HANDLE;
    }

    pub fn get(&self, id: Handle) -> Option<&ObjectRecord> {
        self.objects.get(&id)
    }

    pub fn get_mut(&mut self, id: Handle) -> Option<&mut ObjectRecord> {
        self.objects.get_mut(&id)
    }

    pub fn is_valid(&self, id: Handle) -> bool {
        self.objects.contains_key(&id)
    }

    pub fn kind_of(&self, id: Handle) -> Option<ObjectKind> {
        self.objects.get(&id).map(|r| r.kind)
    }

    pub fn is_kind(&self, id: Handle, kind: ObjectKind) -> bool {
        self.kind_of(id) == Some(kind)
    }

    pub fn external(&self, id: Handle) -> Option<ExternalRef> {
        self.objects.get(&id).map(|r| Rc::clone(&r.external))
    }

    pub fn live_object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn label(&self, id: Handle) -> Option<&str> {
        self.objects.get(&id).map(|r| r.label.as_str())
    }

    pub fn set_label(&mut self, id: Handle, label: &str) {
        debug_assert!(self.objects.contains_key(&id), "set_label on unknown {id}");
        if let Some(record) = self.objects.get_mut(&id) {
            record.label.clear();
            record.label.push_str(label);
        }
    }

    /// First derived object of `id` with the given kind. Used to find a
    /// device's auto-registered queue.
    pub fn derived_of_kind(&self, id: Handle, kind: ObjectKind) -> Option<Handle> {
        let record = self.objects.get(&id)?;
        record
            .derived
            .iter()
            .copied()
            .find(|&d| self.is_kind(d, kind))
    }

    /// Finds an already-stored object by referential identity.
    pub fn find_by_identity(&self, kind: ObjectKind, external: &ExternalRef) -> Option<Handle> {
        self.objects
            .values()
            .find(|r| r.kind == kind && Rc::ptr_eq(&r.external, external))
            .map(|r| r.id)
    }

    /// Replaces the occupant of the current-frame texture slot.
    ///
    /// If `texture` is referentially identical to the current occupant the
    /// registry is left untouched (including the occupant's derived views).
    /// Otherwise the previous occupant is destroyed first, cascading into its
    /// derived views, and the new texture is installed with an empty derived
    /// list, linked to the presenting `context`. Always returns
    /// [`FRAME_TEXTURE_HANDLE`].
    pub fn install_frame_texture(&mut self, context: Handle, texture: ExternalRef) -> Handle {
        if let Some(current) = self.objects.get(&FRAME_TEXTURE_HANDLE) {
            if Rc::ptr_eq(&current.external, &texture) {
                return FRAME_TEXTURE_HANDLE;
            }
        }
        self.destroy(FRAME_TEXTURE_HANDLE);
        self.objects.insert(
            FRAME_TEXTURE_HANDLE,
            ObjectRecord::new(FRAME_TEXTURE_HANDLE, ObjectKind::Texture, texture),
        );
        self.link_parent_and_child(context, FRAME_TEXTURE_HANDLE);
        FRAME_TEXTURE_HANDLE
    }

    /// Records a mapped range for a buffer-like object.
    pub fn track_mapped_range(&mut self, id: Handle, offset: u64, size: Option<u64>) {
        debug_assert!(
            self.kind_of(id).is_some_and(|k| k.is_buffer()),
            "mapped range tracking on non-buffer {id}"
        );
        if let Some(record) = self.objects.get_mut(&id) {
            record.mapped_ranges.insert(offset, size);
        }
    }

    pub fn mapped_range(&self, id: Handle, offset: u64) -> Option<Option<u64>> {
        self.objects.get(&id)?.mapped_ranges.get(&offset).copied()
    }

    pub fn clear_mapped_ranges(&mut self, id: Handle) {
        if let Some(record) = self.objects.get_mut(&id) {
            record.mapped_ranges.clear();
        }
    }
}
