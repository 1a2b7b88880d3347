//! Object records and the closed kind set.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::registry::Handle;

/// An object owned by the browser-side WebGPU implementation.
///
/// The registry never looks inside; it only holds the reference for later
/// calls, compares identity (`Rc::ptr_eq`) for the current-frame texture
/// slot, and invokes [`destroy`](ExternalObject::destroy) on teardown for the
/// kinds that expose one.
pub trait ExternalObject {
    fn destroy(&self) {}
}

pub type ExternalRef = Rc<dyn ExternalObject>;

/// Every registry-tracked object is exactly one of these kinds.
///
/// Boundary operations classify their handle arguments against this tag
/// before proceeding; a mismatch is a caller bug, checked defensively rather
/// than propagated as a runtime error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Adapter,
    Device,
    Queue,
    Buffer,
    Texture,
    TextureView,
    ExternalTexture,
    Sampler,
    BindGroupLayout,
    BindGroup,
    PipelineLayout,
    ShaderModule,
    ComputePipeline,
    RenderPipeline,
    CommandEncoder,
    CommandBuffer,
    RenderPassEncoder,
    ComputePassEncoder,
    RenderBundle,
    RenderBundleEncoder,
    QuerySet,
    CanvasContext,
    ImageBitmap,
    DeviceLostInfo,
    Error,
}

impl ObjectKind {
    /// Buffer-like objects track mapped ranges and bind as
    /// `{buffer, offset, size}` in bind group entries.
    pub fn is_buffer(self) -> bool {
        self == ObjectKind::Buffer
    }

    /// Kinds whose underlying object exposes an explicit native teardown.
    pub fn has_explicit_destroy(self) -> bool {
        matches!(
            self,
            ObjectKind::Device | ObjectKind::Buffer | ObjectKind::Texture | ObjectKind::QuerySet
        )
    }

    pub fn is_pass_encoder(self) -> bool {
        matches!(
            self,
            ObjectKind::RenderPassEncoder | ObjectKind::ComputePassEncoder
        )
    }

    /// Encoders that accept bind group commands.
    pub fn is_binding_commands_mixin(self) -> bool {
        matches!(
            self,
            ObjectKind::RenderPassEncoder
                | ObjectKind::ComputePassEncoder
                | ObjectKind::RenderBundleEncoder
        )
    }

    pub fn is_render_commands_mixin(self) -> bool {
        matches!(
            self,
            ObjectKind::RenderPassEncoder | ObjectKind::RenderBundleEncoder
        )
    }

    pub fn is_pipeline(self) -> bool {
        matches!(self, ObjectKind::ComputePipeline | ObjectKind::RenderPipeline)
    }
}

/// Registry entry for one live object.
pub struct ObjectRecord {
    /// The record's own id, for symmetric back-lookup.
    pub id: Handle,
    pub kind: ObjectKind,
    pub external: ExternalRef,
    pub label: String,
    /// Owning object, if this object was created "from" another.
    pub parent: Option<Handle>,
    /// Objects created from this one, destroyed along with it, in creation
    /// order.
    pub derived: Vec<Handle>,
    /// Mapped ranges keyed by byte offset; only populated for buffer-like
    /// objects. The value is the mapped size, `None` meaning "to the end of
    /// the buffer".
    pub mapped_ranges: BTreeMap<u64, Option<u64>>,
}

impl ObjectRecord {
    pub fn new(id: Handle, kind: ObjectKind, external: ExternalRef) -> Self {
        Self {
            id,
            kind,
            external,
            label: String::new(),
            parent: None,
            derived: Vec::new(),
            mapped_ranges: BTreeMap::new(),
        }
    }
}
