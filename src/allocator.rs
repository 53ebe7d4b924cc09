//! Policy Layer (spec.md §4.4) — the public `init`/`alloc`/`free`/`realloc`/
//! `checkheap` surface.
//!
//! `Allocator<E>` is an ordinary struct holding heap state, with inherent
//! methods standing in for the classical C `mm_malloc`/`mm_free`/`mm_realloc`
//! triad, backed by segregated free lists and boundary-tag coalescing instead
//! of a bump pointer.
//!
//! One deliberate departure from spec.md's literal heap picture: the
//! "seglist head array" spec.md places at the front of the managed region
//! is kept here as ordinary Rust struct state (`SegList`, a field of
//! `Allocator`) rather than bytes inside the extender-managed region. A
//! memory-safe rewrite has no need to store a fixed-size head array inside
//! unsafely-managed memory when it can simply be a struct field; the
//! consistency checker's invariant 7 is adjusted accordingly (see `audit`).

use std::ptr::NonNull;

use crate::coalesce::coalesce;
use crate::config::{CHUNKSIZE, MIN_BLOCK_SIZE, OVERHEAD, SMALL_REQUEST_THRESHOLD, TAG_SIZE};
use crate::error::AllocError;
use crate::extend::HeapExtender;
use crate::freelist::{SegList, size_class};
use crate::layout::{self, BlockPtr};
use crate::align::align8;

/// A single consistency-check violation, as logged by `checkheap` and
/// returned (for assertions) by `Allocator::audit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckFinding {
  /// Header and footer tags for the block at `addr` disagree.
  FooterMismatch { addr: usize },
  /// The payload address at `addr` is not 8-byte aligned.
  Unaligned { addr: usize },
  /// The prologue sentinel isn't the expected allocated, header-sized block.
  BadPrologue,
  /// The epilogue sentinel isn't the expected allocated, zero-size block.
  BadEpilogue,
  /// Two free blocks are adjacent in address order; they should have been
  /// coalesced.
  AdjacentFreeBlocks { addr: usize },
  /// A free block found in list `actual_class` should live in
  /// `expected_class` given its current size.
  ListMembershipMismatch {
    addr: usize,
    expected_class: usize,
    actual_class: usize,
  },
  /// A block appears allocated but was reached by walking a free list.
  AllocatedBlockInFreeList { addr: usize },
  /// The doubly-linked list's `prev` links don't agree with traversal
  /// order.
  BrokenListLinks { addr: usize },
  /// Sum of all block sizes (sentinels included) doesn't match the
  /// extender-reported heap size.
  SizeSumMismatch { expected: usize, actual: usize },
}

/// The segregated-fit allocator. Generic over the heap extender so
/// production code monomorphizes to [`crate::extend::SbrkExtender`] while
/// tests use [`crate::extend::MockExtender`].
pub struct Allocator<E: HeapExtender> {
  seglist: SegList,
  extender: E,
  prologue: BlockPtr,
  epilogue: BlockPtr,
}

impl<E: HeapExtender> Allocator<E> {
  /// Initializes a fresh allocator: grows the heap by `CHUNKSIZE`,
  /// installs the prologue/epilogue sentinels, and leaves a single free
  /// block of `CHUNKSIZE - OVERHEAD` bytes as the sole member of the
  /// largest-class list.
  pub fn init(mut extender: E) -> Result<Self, AllocError> {
    let base = extender.extend(CHUNKSIZE).ok_or(AllocError::OutOfMemory)?;

    unsafe { layout::write_block(base, TAG_SIZE, true) };
    let free_size = CHUNKSIZE - OVERHEAD;
    let fresh = unsafe { layout::next_block(base) };
    unsafe { layout::write_block(fresh, free_size, false) };
    let epilogue = unsafe { layout::next_block(fresh) };
    unsafe { layout::write_epilogue(epilogue) };

    let mut seglist = SegList::new();
    unsafe { seglist.push(fresh, size_class(free_size)) };

    log::debug!(
      "init: grew heap by {CHUNKSIZE} bytes, seeded free block of {free_size} bytes"
    );

    Ok(Allocator {
      seglist,
      extender,
      prologue: base,
      epilogue,
    })
  }

  /// `asize = align8(u + OVERHEAD)`, raised to at least `MIN_BLOCK_SIZE`.
  fn adjust_size(u: usize) -> usize {
    align8(u + OVERHEAD).max(MIN_BLOCK_SIZE)
  }

  /// Grows the heap by exactly `n_bytes` (must already be 8-aligned),
  /// reinterpreting the current epilogue's header word as the header of a
  /// fresh free block, and always coalescing the result with a free
  /// predecessor (see the module doc's note on the resolved Open
  /// Question: unlike spec.md's literal `do_coalesce` flag, this rewrite
  /// never skips coalescing on extend, since merging with an allocated
  /// prologue is free and skipping it only ever produces a transient
  /// invariant-5 violation for no benefit).
  fn grow(&mut self, n_bytes: usize) -> Option<BlockPtr> {
    debug_assert_eq!(n_bytes % 8, 0, "grow requires an 8-aligned byte count");
    let base = self.extender.extend(n_bytes)?;
    // The extender returns the base of the newly granted region, which
    // sits one tag past the current epilogue header (the epilogue's
    // header word is the last word of the region *before* this call).
    debug_assert_eq!(
      base,
      unsafe { NonNull::new_unchecked(self.epilogue.as_ptr().add(TAG_SIZE)) },
      "extender did not return memory contiguous with the prior epilogue"
    );

    let fresh = self.epilogue;
    unsafe { layout::write_block(fresh, n_bytes, false) };
    let epilogue = unsafe { layout::next_block(fresh) };
    unsafe { layout::write_epilogue(epilogue) };
    self.epilogue = epilogue;

    unsafe { self.seglist.push(fresh, size_class(n_bytes)) };
    let survivor = unsafe { coalesce(&mut self.seglist, fresh) };
    log::debug!(
      "grow: heap extended by {n_bytes} bytes, coalesced block is {} bytes",
      unsafe { layout::size_of_block(survivor) }
    );
    Some(survivor)
  }

  /// Places a request of `asize` bytes into free block `b`, splitting off
  /// a residual free block unless the residual would be a splinter
  /// (< `MIN_BLOCK_SIZE`).
  fn place(&mut self, b: BlockPtr, asize: usize) -> NonNull<u8> {
    unsafe {
      let total = layout::size_of_block(b);
      debug_assert!(total >= asize);
      self.seglist.pop(b, size_class(total));

      let remainder = total - asize;
      if remainder >= MIN_BLOCK_SIZE {
        layout::write_block(b, asize, true);
        let rest = layout::next_block(b);
        layout::write_block(rest, remainder, false);
        self.seglist.push(rest, size_class(remainder));
      } else {
        layout::write_block(b, total, true);
      }

      layout::payload_of(b)
    }
  }

  /// Allocates `u` payload bytes, returning `None` for a zero-sized
  /// request or when the heap extender fails to grow.
  pub fn alloc(&mut self, u: usize) -> Option<NonNull<u8>> {
    if u == 0 {
      return None;
    }
    let asize = Self::adjust_size(u);

    if asize <= SMALL_REQUEST_THRESHOLD {
      log::trace!("alloc: small-request fast path, u={u} asize={asize}");
      let b = self.grow(asize)?;
      return Some(self.place(b, asize));
    }

    if let Some(b) = unsafe { self.seglist.first_fit(asize) } {
      log::trace!("alloc: first-fit hit, u={u} asize={asize}");
      return Some(self.place(b, asize));
    }

    let grow_size = asize.max(CHUNKSIZE);
    log::trace!("alloc: first-fit miss, growing by {grow_size} bytes");
    let b = self.grow(grow_size)?;
    Some(self.place(b, asize))
  }

  /// Frees a previously allocated payload. Undefined behavior if `p` was
  /// not returned by `alloc`/`realloc` on this allocator, or has already
  /// been freed.
  pub fn free(&mut self, p: NonNull<u8>) {
    let b = layout::header_of(p);
    unsafe {
      let size = layout::size_of_block(b);
      layout::write_block(b, size, false);
      self.seglist.push(b, size_class(size));
      coalesce(&mut self.seglist, b);
    }
    log::trace!("free: released block");
  }

  /// Reallocates `p` to `new_size` payload bytes, copying
  /// `min(new_size, old_payload_len)` bytes forward. Aborts the process if
  /// the new allocation cannot be satisfied — the design treats this as
  /// unrecoverable rather than leaving the caller holding a dangling
  /// expectation about `p`'s continued validity.
  pub fn realloc(&mut self, p: NonNull<u8>, new_size: usize) -> NonNull<u8> {
    let old_block = layout::header_of(p);
    let old_payload_len = unsafe { layout::size_of_block(old_block) } - OVERHEAD;

    match self.alloc(new_size) {
      Some(q) => {
        let copy_len = new_size.min(old_payload_len);
        unsafe {
          std::ptr::copy_nonoverlapping(p.as_ptr(), q.as_ptr(), copy_len);
        }
        self.free(p);
        q
      }
      None => {
        log::error!(
          "realloc: allocation of {new_size} bytes failed, aborting per design"
        );
        std::process::abort();
      }
    }
  }

  /// Walks the heap and free lists, returning every invariant violation
  /// found (spec.md §8's seven quantified invariants). Never mutates,
  /// never aborts.
  pub fn audit(&self) -> Vec<CheckFinding> {
    let mut findings = Vec::new();
    unsafe {
      if layout::size_of_block(self.prologue) != TAG_SIZE || !layout::is_allocated(self.prologue) {
        findings.push(CheckFinding::BadPrologue);
      }
      if layout::size_of_block(self.epilogue) != 0 || !layout::is_allocated(self.epilogue) {
        findings.push(CheckFinding::BadEpilogue);
      }

      let mut cur = self.prologue;
      let mut total_bytes = 0usize;
      let mut prev_was_free = false;
      loop {
        let size = layout::size_of_block(cur);
        total_bytes += size;

        if size > 0 {
          let header_alloc = layout::is_allocated(cur);
          let footer_word = layout::footer_ptr(cur).read();
          let footer_size = (footer_word & !0x7) as usize;
          let footer_alloc = footer_word & 1 != 0;
          if footer_size != size || footer_alloc != header_alloc {
            findings.push(CheckFinding::FooterMismatch {
              addr: cur.as_ptr() as usize,
            });
          }
        }

        let payload = layout::payload_of(cur).as_ptr() as usize;
        if payload % 8 != 0 {
          findings.push(CheckFinding::Unaligned { addr: cur.as_ptr() as usize });
        }

        let allocated = layout::is_allocated(cur);
        if !allocated && prev_was_free {
          findings.push(CheckFinding::AdjacentFreeBlocks {
            addr: cur.as_ptr() as usize,
          });
        }
        prev_was_free = !allocated;

        if cur == self.epilogue {
          break;
        }
        cur = layout::next_block(cur);
      }

      for k in 0..crate::config::NUM_CLASSES {
        let mut node = self.seglist.head(k);
        let mut prev: Option<BlockPtr> = None;
        while let Some(b) = node {
          if layout::is_allocated(b) {
            findings.push(CheckFinding::AllocatedBlockInFreeList {
              addr: b.as_ptr() as usize,
            });
          }
          let actual_class = size_class(layout::size_of_block(b));
          if actual_class != k {
            findings.push(CheckFinding::ListMembershipMismatch {
              addr: b.as_ptr() as usize,
              expected_class: actual_class,
              actual_class: k,
            });
          }
          let (next, link_prev) = layout::read_links(b);
          if link_prev != prev {
            findings.push(CheckFinding::BrokenListLinks {
              addr: b.as_ptr() as usize,
            });
          }
          prev = Some(b);
          node = next;
        }
      }

      if let (Some(base), Some(end)) = (self.extender.base(), self.extender.end()) {
        let heap_size = end.as_ptr() as usize - base.as_ptr() as usize;
        // The epilogue reports size 0 in its header (spec.md §3) but
        // still physically occupies one tag word, so the walked sum
        // always falls one `TAG_SIZE` short of the extender-reported
        // heap extent.
        if total_bytes + TAG_SIZE != heap_size {
          findings.push(CheckFinding::SizeSumMismatch {
            expected: heap_size,
            actual: total_bytes + TAG_SIZE,
          });
        }
      }
    }
    findings
  }

  /// Production-facing consistency check: logs every finding from
  /// [`Self::audit`] via `log::warn!`, and (if `verbose`) logs a clean
  /// bill of health too. Never aborts, per spec.md §7.
  pub fn checkheap(&self, verbose: bool) {
    let findings = self.audit();
    if findings.is_empty() {
      if verbose {
        log::debug!("checkheap: heap is consistent");
      }
    } else {
      for finding in &findings {
        log::warn!("checkheap: {finding:?}");
      }
    }
  }
}
