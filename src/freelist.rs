//! Segregated Free Lists (spec.md §4.2).
//!
//! An array of doubly-linked free-block lists indexed by size class. Links
//! live in-band, in the first two 8-byte payload slots of each free block
//! (see [`crate::layout::read_links`]/`write_links`). `push`/`pop` are O(1);
//! `first_fit` is O(list length) within whichever classes it has to walk.

use crate::config::{MIN_BLOCK_SIZE, NUM_CLASSES, SIZE_CLASS_BIAS};
use crate::layout::{self, BlockPtr};

/// `class(s) = min(NUM_CLASSES - 1, max(0, floor(log2 s) - SIZE_CLASS_BIAS))`.
///
/// Well-defined for all reachable block sizes because `s >= MIN_BLOCK_SIZE`
/// is a crate-wide invariant; debug-asserted here rather than silently
/// saturating, per spec.md's Design Notes on the size-class function.
pub fn size_class(s: usize) -> usize {
  debug_assert!(
    s >= MIN_BLOCK_SIZE,
    "size_class called on a sub-minimum block size"
  );
  let log2 = s.ilog2() as i64;
  let shifted = log2 - SIZE_CLASS_BIAS as i64;
  let clamped = shifted.max(0) as usize;
  clamped.min(NUM_CLASSES - 1)
}

/// The segregated free-list index: `NUM_CLASSES` list heads, each either
/// empty or a link into a doubly-linked list of free blocks.
pub struct SegList {
  heads: [Option<BlockPtr>; NUM_CLASSES],
}

impl SegList {
  pub fn new() -> Self {
    SegList {
      heads: [None; NUM_CLASSES],
    }
  }

  /// Inserts `b` at the head of list `k` (LIFO).
  ///
  /// # Safety
  ///
  /// `b` must not currently be a member of any list, and the caller must
  /// pass `k == size_class(size_of_block(b))`.
  pub unsafe fn push(&mut self, b: BlockPtr, k: usize) {
    unsafe {
      let old_head = self.heads[k];
      layout::write_links(b, old_head, None);
      if let Some(head) = old_head {
        set_prev(head, Some(b));
      }
      self.heads[k] = Some(b);
    }
  }

  /// Removes `b` from list `k`, using its in-band `next`/`prev` links.
  ///
  /// # Safety
  ///
  /// `b` must currently be a member of list `k`.
  pub unsafe fn pop(&mut self, b: BlockPtr, k: usize) {
    unsafe {
      let (next, prev) = layout::read_links(b);
      match prev {
        Some(p) => set_next(p, next),
        None => self.heads[k] = next,
      }
      if let Some(n) = next {
        set_prev(n, prev);
      }
    }
  }

  /// Starting at `class(s)`, walks forward through classes for the first
  /// free block with `size >= s`. LIFO/insertion-order search within each
  /// list; no best-fit, no rotation.
  ///
  /// # Safety
  ///
  /// Every block reachable from `self.heads` must be a live free block
  /// with truthful links and header.
  pub unsafe fn first_fit(&self, s: usize) -> Option<BlockPtr> {
    let start = size_class(s);
    for k in start..NUM_CLASSES {
      let mut cur = self.heads[k];
      while let Some(b) = cur {
        if unsafe { layout::size_of_block(b) } >= s {
          return Some(b);
        }
        cur = unsafe { layout::read_links(b).0 };
      }
    }
    None
  }

  /// Head of list `k`, for the consistency checker.
  pub fn head(&self, k: usize) -> Option<BlockPtr> {
    self.heads[k]
  }
}

/// Sets `b`'s `next` link, preserving its current `prev`.
///
/// # Safety
///
/// `b` must be a free block.
unsafe fn set_next(b: BlockPtr, next: Option<BlockPtr>) {
  unsafe {
    let (_, prev) = layout::read_links(b);
    layout::write_links(b, next, prev);
  }
}

/// Sets `b`'s `prev` link, preserving its current `next`.
///
/// # Safety
///
/// `b` must be a free block.
unsafe fn set_prev(b: BlockPtr, prev: Option<BlockPtr>) {
  unsafe {
    let (next, _) = layout::read_links(b);
    layout::write_links(b, next, prev);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::ptr::NonNull;

  fn block_at(buf: &mut [u8], offset: usize, size: usize) -> BlockPtr {
    let b = unsafe { NonNull::new_unchecked(buf.as_mut_ptr().add(offset)) };
    unsafe { layout::write_block(b, size, false) };
    b
  }

  #[test]
  fn size_class_buckets_match_the_formula() {
    assert_eq!(size_class(32), 0);
    assert_eq!(size_class(63), 0);
    assert_eq!(size_class(64), 1);
    assert_eq!(size_class(127), 1);
    assert_eq!(size_class(128), 2);
    // Saturates at NUM_CLASSES - 1 for very large blocks.
    assert_eq!(size_class(1 << 30), NUM_CLASSES - 1);
  }

  #[test]
  fn push_then_pop_sole_element_empties_the_list() {
    let mut buf = vec![0u8; 64];
    let b = block_at(&mut buf, 0, 32);
    let mut sl = SegList::new();
    unsafe {
      sl.push(b, 0);
      assert_eq!(sl.head(0), Some(b));
      sl.pop(b, 0);
      assert_eq!(sl.head(0), None);
    }
  }

  #[test]
  fn pop_first_element_advances_head_and_clears_new_heads_prev() {
    let mut buf = vec![0u8; 128];
    let a = block_at(&mut buf, 0, 32);
    let b = block_at(&mut buf, 32, 32);
    let mut sl = SegList::new();
    unsafe {
      sl.push(a, 0);
      sl.push(b, 0); // b is now head, a follows
      assert_eq!(sl.head(0), Some(b));
      sl.pop(b, 0);
      assert_eq!(sl.head(0), Some(a));
      assert_eq!(layout::read_links(a), (None, None));
    }
  }

  #[test]
  fn pop_last_element_clears_predecessors_next() {
    let mut buf = vec![0u8; 128];
    let a = block_at(&mut buf, 0, 32);
    let b = block_at(&mut buf, 32, 32);
    let mut sl = SegList::new();
    unsafe {
      sl.push(a, 0);
      sl.push(b, 0); // list: b -> a
      sl.pop(a, 0); // a is the tail
      assert_eq!(sl.head(0), Some(b));
      assert_eq!(layout::read_links(b), (None, None));
    }
  }

  #[test]
  fn pop_middle_element_splices_neighbors_together() {
    let mut buf = vec![0u8; 192];
    let a = block_at(&mut buf, 0, 32);
    let b = block_at(&mut buf, 32, 32);
    let c = block_at(&mut buf, 64, 32);
    let mut sl = SegList::new();
    unsafe {
      sl.push(a, 0);
      sl.push(b, 0);
      sl.push(c, 0); // list: c -> b -> a
      sl.pop(b, 0);
      assert_eq!(sl.head(0), Some(c));
      assert_eq!(layout::read_links(c), (Some(a), None));
      assert_eq!(layout::read_links(a), (None, Some(c)));
    }
  }

  #[test]
  fn first_fit_finds_first_acceptable_block_and_escalates_classes() {
    let mut buf = vec![0u8; 256];
    let small = block_at(&mut buf, 0, 32); // class 0
    let big = block_at(&mut buf, 32, 128); // class 2
    let mut sl = SegList::new();
    unsafe {
      sl.push(small, size_class(32));
      sl.push(big, size_class(128));

      assert_eq!(sl.first_fit(32), Some(small));
      // No block in class 0 is big enough; escalate to class 2.
      assert_eq!(sl.first_fit(100), Some(big));
      assert_eq!(sl.first_fit(129), None);
    }
  }

  #[test]
  fn first_fit_is_lifo_within_a_class() {
    let mut buf = vec![0u8; 128];
    let a = block_at(&mut buf, 0, 32);
    let b = block_at(&mut buf, 32, 32);
    let mut sl = SegList::new();
    unsafe {
      sl.push(a, 0);
      sl.push(b, 0); // b pushed last, is head
      assert_eq!(sl.first_fit(32), Some(b));
    }
  }
}
