//! # segalloc - A Segregated-Fit Memory Allocator Library
//!
//! This crate provides a **segregated free-list allocator** with boundary-tag
//! coalescing, built on top of the same `sbrk`-backed heap-growth model as a
//! bump allocator, but with reuse of freed memory instead of a one-way bump
//! pointer.
//!
//! ## Overview
//!
//! Memory is tracked in explicit, address-ordered blocks, each bracketed by a
//! header and footer tag recording its size and allocated bit:
//!
//! ```text
//!   Heap Memory (one managed region, grown via sbrk):
//!
//!   ┌────────┬──────────┬──────────┬──────────┬───  ···  ───┬──────────┐
//!   │ Prolog │  Block A │  Block B │  Block C │              │ Epilogue │
//!   │  8B    │ hdr|data|ftr        │          │              │   8B     │
//!   └────────┴──────────┴──────────┴──────────┴───  ···  ───┴──────────┘
//!              ▲                                               ▲
//!              │                                                │
//!         first real block                              always allocated,
//!                                                        size 0 — the
//!                                                        walk's stop sign
//! ```
//!
//! Free blocks are additionally threaded into one of `NUM_CLASSES` doubly
//! linked lists, bucketed by `size_class`, so that a request only has to walk
//! blocks roughly its own size or larger:
//!
//! ```text
//!   Segregated Free Lists:
//!
//!   class 0  (32..63)    -> [free] <-> [free]
//!   class 1  (64..127)   -> [free]
//!   class 2  (128..255)  -> (empty)
//!   ...
//!   class N  (huge)      -> [free] <-> [free] <-> [free]
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   segalloc
//!   ├── config     - Tunable constants (chunk size, size-class count, ...)
//!   ├── align      - 8-byte alignment arithmetic
//!   ├── error      - AllocError
//!   ├── layout     - Boundary-tag block layout and address arithmetic
//!   ├── freelist   - Segregated free-list index (size_class, SegList)
//!   ├── coalesce   - Four-case boundary-tag coalescing
//!   ├── extend     - The HeapExtender seam (SbrkExtender, MockExtender)
//!   └── allocator  - Allocator<E>: init/alloc/free/realloc/checkheap
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use segalloc::{Allocator, SbrkExtender};
//!
//! fn main() {
//!     let mut allocator = Allocator::init(SbrkExtender::new()).unwrap();
//!
//!     let p = allocator.alloc(24).unwrap();
//!     unsafe { p.as_ptr().write(42) };
//!
//!     allocator.free(p);
//! }
//! ```
//!
//! ## How It Works
//!
//! Like a bump allocator, the managed region only ever grows forward via
//! `sbrk(2)`. Unlike one, freed blocks are coalesced with their address-order
//! neighbors and kept on a free list for the next request to reuse, so a
//! alloc/free/alloc churn doesn't monotonically consume the process break.
//!
//! A small-request fast path (`asize <= SMALL_REQUEST_THRESHOLD`) skips the
//! free-list search entirely and grows the heap directly, trading a larger
//! process footprint for O(1) allocation on the common case of many small,
//! short-lived objects.
//!
//! ## Features
//!
//! - **Block reuse**: freed blocks are coalesced and placed back on a
//!   segregated free list instead of being abandoned
//! - **Boundary-tag coalescing**: O(1) merge with either neighbor, using only
//!   the header/footer tags already present at every block boundary
//! - **Pluggable heap growth**: the `HeapExtender` trait separates the
//!   allocator's policy from `sbrk`, so tests run against an in-process mock
//! - **Consistency checking**: `checkheap` walks the heap and free lists,
//!   logging every invariant violation it finds
//!
//! ## Limitations
//!
//! - **Single-threaded only**: no synchronization primitives
//! - **Unix-only in production**: `SbrkExtender` requires `libc::sbrk`
//! - **No memory return to the OS**: the managed region only ever grows
//!
//! ## Safety
//!
//! This crate is inherently unsafe as it deals with raw memory management.
//! The unsafe surface is concentrated in `layout` (address arithmetic) and
//! `freelist`/`coalesce` (pointer-linked lists); `allocator` and `extend`
//! wrap that surface behind a safe `alloc`/`free`/`realloc` API.

pub mod align;
pub mod allocator;
pub mod coalesce;
pub mod config;
pub mod error;
pub mod extend;
pub mod freelist;
pub mod layout;

pub use allocator::{Allocator, CheckFinding};
pub use error::AllocError;
pub use extend::{HeapExtender, MockExtender, SbrkExtender};
