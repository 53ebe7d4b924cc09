//! Tuning constants fixed by design (spec.md §6).
//!
//! Centralizing these here keeps the magic numbers out of `allocator.rs` and
//! `freelist.rs`, the way [`crate::align`] centralizes the alignment concern.

/// Bytes requested from the [`crate::extend::HeapExtender`] on a cold miss
/// (no fitting free block and the small-request fast path doesn't apply).
pub const CHUNKSIZE: usize = 65536;

/// Smallest block the allocator ever hands out: header + footer + two
/// 8-byte free-list link slots.
pub const MIN_BLOCK_SIZE: usize = 32;

/// Number of segregated free-list classes.
pub const NUM_CLASSES: usize = 11;

/// Requests whose adjusted block size is at or below this go through the
/// small-request fast path instead of `first_fit`.
pub const SMALL_REQUEST_THRESHOLD: usize = 96;

/// `class(s) = min(NUM_CLASSES - 1, floor(log2(s)) - SIZE_CLASS_BIAS)`.
pub const SIZE_CLASS_BIAS: u32 = 5;

/// Payload and block-size alignment, in bytes.
pub const ALIGNMENT: usize = 8;

/// Size of one header or footer word, in bytes.
pub const TAG_SIZE: usize = 8;

/// Header + footer overhead charged against every block.
pub const OVERHEAD: usize = TAG_SIZE * 2;
