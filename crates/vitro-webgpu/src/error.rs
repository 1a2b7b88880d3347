use thiserror::Error;

use crate::registry::Handle;

/// Recoverable failures surfaced synchronously by boundary operations.
///
/// Caller contract violations (wrong-kind handles, malformed descriptor
/// pointers) are deliberately not represented here; those are debug
/// assertions. These variants cover runtime conditions a well-behaved caller
/// can still run into.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BridgeError {
    #[error("unknown handle {0}")]
    UnknownHandle(Handle),
    #[error("buffer {buffer} has no mapped range starting at offset {offset}")]
    NoSuchMappedRange { buffer: Handle, offset: u64 },
}
