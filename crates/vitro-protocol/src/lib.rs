//! ABI layer for the vitro WebGPU boundary.
//!
//! Native code drives a browser-hosted WebGPU implementation by passing flat,
//! little-endian byte blocks (descriptors) and 32-bit integer handles across a
//! linear-memory boundary. This crate owns everything about that wire shape:
//!
//! - [`heap::HeapView`], a word-addressed read-only view of the caller's
//!   linear memory,
//! - the descriptor layout schemas and their decoders (see [`decode`]),
//! - the shared enum/string tables that let enumerations cross the boundary
//!   as small integers (see [`enums`]),
//! - [`encode::DescriptorWriter`], a safe builder that emits the same layouts
//!   for tests/fixtures and host-side tooling.
//!
//! The crate is pure translation: no I/O, no GPU types, no registry state.

pub mod decode;
pub mod encode;
pub mod enums;
pub mod heap;

mod descriptors;

pub use descriptors::*;

/// Caller-visible object identity.
///
/// `0` is the invalid/no-object sentinel, `1` is reserved for the
/// current-frame presentation texture, and `[2, i32::MAX]` is the dynamic
/// range managed by the handle registry.
pub type Handle = i32;

/// Byte offset into the caller's linear memory. `0` is the null pointer.
pub type Ptr = u32;
