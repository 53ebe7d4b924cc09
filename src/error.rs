//! Error types for the policy layer.
//!
//! `alloc` keeps the classical null-return error signal from spec.md §6/§7 —
//! this enum exists for `init`'s `Result` and for propagating extender
//! failures internally, not to change `alloc`'s public signature.

use thiserror::Error;

/// Failure modes the allocator itself can raise.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AllocError {
  /// The [`crate::extend::HeapExtender`] refused to grow the heap.
  #[error("heap extender failed to grow the managed region")]
  OutOfMemory,
}
