//! Coalescing Engine (spec.md §4.3).
//!
//! Given a block whose allocated bit has just been cleared and which is
//! already a member of its class list, merges it with up to two adjacent
//! free neighbors. The permanently-allocated prologue and epilogue sentinels
//! mean `prev_block`/`next_block` are always valid here and degrade the four
//! cases gracefully at the heap's edges — no bounds checks needed.

use crate::freelist::{SegList, size_class};
use crate::layout::{self, BlockPtr};

/// Coalesces `b` with any free neighbors, returning the surviving block.
///
/// In cases where the previous neighbor absorbs `b`, the returned pointer is
/// that neighbor, not `b` — callers that need to keep tracking the block
/// must use the return value.
///
/// # Safety
///
/// `b` must be a free block already pushed onto `seglist`'s class
/// `size_class(size_of_block(b))`; the blocks immediately before and after
/// `b` (as found via `prev_block`/`next_block`) must be valid, truthfully
/// tagged blocks (sentinels count).
pub unsafe fn coalesce(seglist: &mut SegList, b: BlockPtr) -> BlockPtr {
  unsafe {
    let p = layout::prev_block(b);
    let n = layout::next_block(b);
    let p_free = !layout::is_allocated(p);
    let n_free = !layout::is_allocated(n);

    match (p_free, n_free) {
      // Case 1: no free neighbors, nothing to do.
      (false, false) => b,

      // Case 2: absorb the next block into b.
      (false, true) => {
        seglist.pop(b, size_class(layout::size_of_block(b)));
        seglist.pop(n, size_class(layout::size_of_block(n)));
        let merged = layout::size_of_block(b) + layout::size_of_block(n);
        layout::write_block(b, merged, false);
        seglist.push(b, size_class(merged));
        b
      }

      // Case 3: the previous block absorbs b.
      (true, false) => {
        seglist.pop(p, size_class(layout::size_of_block(p)));
        seglist.pop(b, size_class(layout::size_of_block(b)));
        let merged = layout::size_of_block(p) + layout::size_of_block(b);
        layout::write_block(p, merged, false);
        seglist.push(p, size_class(merged));
        p
      }

      // Case 4: the previous block absorbs both b and the next block.
      (true, true) => {
        seglist.pop(p, size_class(layout::size_of_block(p)));
        seglist.pop(b, size_class(layout::size_of_block(b)));
        seglist.pop(n, size_class(layout::size_of_block(n)));
        let merged =
          layout::size_of_block(p) + layout::size_of_block(b) + layout::size_of_block(n);
        layout::write_block(p, merged, false);
        seglist.push(p, size_class(merged));
        p
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::ptr::NonNull;

  fn block_at(buf: &mut [u8], offset: usize, size: usize, allocated: bool) -> BlockPtr {
    let b = unsafe { NonNull::new_unchecked(buf.as_mut_ptr().add(offset)) };
    unsafe { layout::write_block(b, size, allocated) };
    b
  }

  // Layout: [prologue(alloc,16)][A(32)][B(32)][C(32)][epilogue(alloc,0)]
  fn heap_with_three_blocks() -> (Vec<u8>, BlockPtr, BlockPtr, BlockPtr, BlockPtr) {
    let mut buf = vec![0u8; 16 + 32 * 3 + 8];
    let prologue = block_at(&mut buf, 0, 16, true);
    let a = block_at(&mut buf, 16, 32, true);
    let b = block_at(&mut buf, 48, 32, true);
    let c = block_at(&mut buf, 80, 32, true);
    let _epilogue = block_at(&mut buf, 112, 0, true);
    (buf, prologue, a, b, c)
  }

  #[test]
  fn case1_no_free_neighbors_is_a_no_op() {
    let (_buf, _prologue, a, b, c) = heap_with_three_blocks();
    let mut sl = SegList::new();
    unsafe {
      layout::write_block(b, 32, false);
      sl.push(b, size_class(32));
      let survivor = coalesce(&mut sl, b);
      assert_eq!(survivor, b);
      assert!(layout::is_allocated(a));
      assert!(layout::is_allocated(c));
      assert_eq!(layout::size_of_block(b), 32);
    }
  }

  #[test]
  fn case2_merges_with_free_next_neighbor() {
    let (_buf, _prologue, _a, b, c) = heap_with_three_blocks();
    let mut sl = SegList::new();
    unsafe {
      layout::write_block(c, 32, false);
      sl.push(c, size_class(32));
      layout::write_block(b, 32, false);
      sl.push(b, size_class(32));

      let survivor = coalesce(&mut sl, b);
      assert_eq!(survivor, b);
      assert_eq!(layout::size_of_block(b), 64);
      assert!(!layout::is_allocated(b));
      // c was absorbed; its class list no longer references it directly,
      // the merged block lives in whatever class matches size 64.
      assert_eq!(sl.head(size_class(64)), Some(b));
    }
  }

  #[test]
  fn case3_merges_with_free_prev_neighbor_and_returns_it() {
    let (_buf, _prologue, a, b, _c) = heap_with_three_blocks();
    let mut sl = SegList::new();
    unsafe {
      layout::write_block(a, 32, false);
      sl.push(a, size_class(32));
      layout::write_block(b, 32, false);
      sl.push(b, size_class(32));

      let survivor = coalesce(&mut sl, b);
      assert_eq!(survivor, a);
      assert_eq!(layout::size_of_block(a), 64);
    }
  }

  #[test]
  fn case4_merges_both_neighbors_into_prev() {
    let (_buf, _prologue, a, b, c) = heap_with_three_blocks();
    let mut sl = SegList::new();
    unsafe {
      layout::write_block(a, 32, false);
      sl.push(a, size_class(32));
      layout::write_block(c, 32, false);
      sl.push(c, size_class(32));
      layout::write_block(b, 32, false);
      sl.push(b, size_class(32));

      let survivor = coalesce(&mut sl, b);
      assert_eq!(survivor, a);
      assert_eq!(layout::size_of_block(a), 96);
      assert_eq!(sl.head(size_class(96)), Some(a));
    }
  }
}
