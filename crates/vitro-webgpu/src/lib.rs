//! Runtime side of the vitro WebGPU boundary.
//!
//! This crate owns the marshaling and lifetime layer between native code and
//! a browser-hosted WebGPU implementation:
//!
//! - [`registry::HandleRegistry`] maps 32-bit handles to object records and
//!   models the parent/child ownership graph with cascading teardown,
//! - [`bridge::WebGpuBridge`] is the boundary operation surface, decoding
//!   descriptor blocks via `vitro-protocol` and driving the external API,
//! - [`completion`] turns promise-like completions into single-shot or
//!   standing callback invocations carrying a status code and an opaque user
//!   token.
//!
//! The browser-side WebGPU implementation itself is an external collaborator
//! reached through the [`api::WebGpuApi`] trait; [`fake::FakeApi`] is a
//! scripted in-memory implementation for tests.
//!
//! Everything here is single-threaded and cooperative: registry mutations
//! happen synchronously within the boundary call that triggered them, and
//! async completions are delivered on the event-loop thread by
//! [`bridge::WebGpuBridge::dispatch_completions`].

pub mod api;
pub mod bridge;
pub mod completion;
pub mod fake;
pub mod registry;

mod error;
mod object;

pub use error::BridgeError;
pub use object::{ExternalObject, ExternalRef, ObjectKind, ObjectRecord};
pub use registry::{Handle, FIRST_DYNAMIC_HANDLE, FRAME_TEXTURE_HANDLE, INVALID_HANDLE};
