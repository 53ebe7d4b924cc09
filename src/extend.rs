//! The consumed heap-extender interface (spec.md §6) and its two
//! implementations: a real, process-wide `sbrk`-backed extender, and a
//! test-only mock that never touches the process heap.

use std::ptr::NonNull;

/// Grows a managed region by a requested byte count, process-wide and
/// single-threaded. Not re-entrant: `alloc`/`free` must never be called from
/// within an extender's own critical section.
pub trait HeapExtender {
  /// Grows the region by exactly `n_bytes`, returning the base address of
  /// the newly available, contiguous-with-previous region, or `None` on
  /// failure. Called with `n_bytes > 0`.
  fn extend(&mut self, n_bytes: usize) -> Option<NonNull<u8>>;

  /// Base of the managed region, if anything has been allocated yet.
  fn base(&self) -> Option<NonNull<u8>>;

  /// One-past-the-end address of the managed region.
  fn end(&self) -> Option<NonNull<u8>>;
}

/// The real extender: grows the process heap via `sbrk(2)`, the same system
/// call the teacher crate's `BumpAllocator` calls directly.
pub struct SbrkExtender {
  base: Option<NonNull<u8>>,
  end: Option<NonNull<u8>>,
}

impl SbrkExtender {
  pub fn new() -> Self {
    SbrkExtender {
      base: None,
      end: None,
    }
  }
}

impl Default for SbrkExtender {
  fn default() -> Self {
    Self::new()
  }
}

impl HeapExtender for SbrkExtender {
  fn extend(&mut self, n_bytes: usize) -> Option<NonNull<u8>> {
    debug_assert!(n_bytes > 0, "extend called with a zero byte count");
    unsafe {
      let raw = libc::sbrk(n_bytes as libc::intptr_t);
      if raw == usize::MAX as *mut libc::c_void {
        log::warn!("sbrk({n_bytes}) failed");
        return None;
      }
      let base = NonNull::new(raw as *mut u8)?;
      if self.base.is_none() {
        self.base = Some(base);
      }
      self.end = Some(NonNull::new_unchecked(raw.cast::<u8>().add(n_bytes)));
      Some(base)
    }
  }

  fn base(&self) -> Option<NonNull<u8>> {
    self.base
  }

  fn end(&self) -> Option<NonNull<u8>> {
    self.end
  }
}

/// A test double for [`HeapExtender`], backed by a fixed-capacity arena that
/// is grown by bumping a `used` cursor rather than reallocating — a `Vec`
/// that resized on growth would invalidate every pointer handed out so far.
///
/// Grounded in Design Notes §9: "Tests instantiate a fresh instance against
/// a mock extender."
pub struct MockExtender {
  arena: Vec<u8>,
  used: usize,
  fail_next: bool,
}

impl MockExtender {
  /// Creates a mock extender with `capacity` bytes of backing storage.
  /// `extend` calls fail once the arena is exhausted.
  pub fn new(capacity: usize) -> Self {
    MockExtender {
      arena: vec![0u8; capacity],
      used: 0,
      fail_next: false,
    }
  }

  /// Makes the next `extend` call fail regardless of remaining capacity,
  /// to exercise out-of-memory handling.
  pub fn fail_next_extend(&mut self) {
    self.fail_next = true;
  }

  pub fn capacity(&self) -> usize {
    self.arena.len()
  }

  pub fn used(&self) -> usize {
    self.used
  }
}

impl HeapExtender for MockExtender {
  fn extend(&mut self, n_bytes: usize) -> Option<NonNull<u8>> {
    debug_assert!(n_bytes > 0, "extend called with a zero byte count");
    if self.fail_next {
      self.fail_next = false;
      return None;
    }
    if self.used + n_bytes > self.arena.len() {
      return None;
    }
    let base = unsafe { NonNull::new_unchecked(self.arena.as_mut_ptr().add(self.used)) };
    self.used += n_bytes;
    Some(base)
  }

  fn base(&self) -> Option<NonNull<u8>> {
    if self.used == 0 {
      None
    } else {
      NonNull::new(self.arena.as_ptr() as *mut u8)
    }
  }

  fn end(&self) -> Option<NonNull<u8>> {
    if self.used == 0 {
      None
    } else {
      Some(unsafe { NonNull::new_unchecked(self.arena.as_ptr().add(self.used) as *mut u8) })
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn mock_extender_grows_by_bumping_a_cursor() {
    let mut m = MockExtender::new(256);
    let first = m.extend(64).unwrap();
    let second = m.extend(64).unwrap();
    assert_eq!(unsafe { second.as_ptr().offset_from(first.as_ptr()) }, 64);
    assert_eq!(m.used(), 128);
  }

  #[test]
  fn mock_extender_fails_past_capacity() {
    let mut m = MockExtender::new(64);
    assert!(m.extend(32).is_some());
    assert!(m.extend(64).is_none());
  }

  #[test]
  fn mock_extender_fail_next_forces_one_failure() {
    let mut m = MockExtender::new(256);
    m.fail_next_extend();
    assert!(m.extend(32).is_none());
    assert!(m.extend(32).is_some());
  }
}
