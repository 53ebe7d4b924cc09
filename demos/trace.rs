use std::io::Read;

use libc::sbrk;
use segalloc::{Allocator, SbrkExtender};

/// Waits until the user presses ENTER.
/// Useful when you want to inspect memory state with tools like `pmap`, `htop`,
/// `gdb`, or just visually track how allocations change the program break.
fn block_until_enter_pressed() {
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

/// Prints the current program break using `sbrk(0)`.
/// The program break is the upper boundary of the heap managed via brk/sbrk.
unsafe fn print_program_break(label: &str) {
  println!(
    "[{}] PID = {}, program break (sbrk(0)) = {:?}",
    label,
    std::process::id(),
    unsafe { sbrk(0) },
  );
}

fn main() {
  // Our allocator. Unlike a pure bump allocator it tracks freed blocks on
  // segregated free lists and coalesces neighbors, so it can reuse memory
  // instead of only ever growing the program break.
  let mut allocator = Allocator::init(SbrkExtender::new()).expect("initial sbrk grant failed");

  unsafe {
    print_program_break("start");
    allocator.checkheap(true);
    block_until_enter_pressed();

    // ------------------------------------------------------------------
    // 1) Allocate 4 bytes, small enough to take the small-request fast
    //    path (it skips the free-list search and grows the heap directly).
    // ------------------------------------------------------------------
    let first_block = allocator.alloc(4).expect("alloc(4) failed");
    println!("\n[1] alloc(4) -> {:?}", first_block);
    first_block.cast::<u32>().as_ptr().write(0xDEADBEEF);
    println!("[1] value written = 0x{:X}", first_block.cast::<u32>().as_ptr().read());
    block_until_enter_pressed();

    // ------------------------------------------------------------------
    // 2) Allocate 12 bytes to show an "odd-sized" request rounded up to
    //    the next 8-byte block size.
    // ------------------------------------------------------------------
    let second_block = allocator.alloc(12).expect("alloc(12) failed");
    println!("\n[2] alloc(12) -> {:?}", second_block);
    std::ptr::write_bytes(second_block.as_ptr(), 0xAB, 12);
    println!("[2] initialized second block with 0xAB");
    block_until_enter_pressed();

    // ------------------------------------------------------------------
    // 3) Allocate a u64 and confirm 8-byte alignment.
    // ------------------------------------------------------------------
    let third_block = allocator.alloc(8).expect("alloc(8) failed");
    println!("\n[3] alloc(8) -> {:?}", third_block);
    third_block.cast::<u64>().as_ptr().write(0x1122334455667788);
    let addr = third_block.as_ptr() as usize;
    println!("[3] address = {:#X}, addr % 8 = {}", addr, addr % 8);
    block_until_enter_pressed();

    // ------------------------------------------------------------------
    // 4) Allocate an array of 16 u16s, above the fast-path threshold's
    //    padding but still routed through first-fit if a block is free.
    // ------------------------------------------------------------------
    let fourth_block = allocator.alloc(32).expect("alloc(32) failed");
    println!("\n[4] alloc(32) -> {:?}", fourth_block);
    for i in 0..16u16 {
      fourth_block.cast::<u16>().as_ptr().add(i as usize).write(i);
    }
    println!("[4] wrote 0..15 into the u16 array");
    block_until_enter_pressed();

    // ------------------------------------------------------------------
    // 5) Free the first block and watch it return to the free list.
    // ------------------------------------------------------------------
    allocator.free(first_block);
    println!("\n[5] freed first_block at {:?}", first_block);
    allocator.checkheap(true);
    block_until_enter_pressed();

    // ------------------------------------------------------------------
    // 6) Allocate a small block and see whether the freed block was reused.
    // ------------------------------------------------------------------
    let fifth_block = allocator.alloc(2).expect("alloc(2) failed");
    println!("\n[6] alloc(2) -> {:?}", fifth_block);
    println!(
      "[6] fifth_block == first_block? {}",
      if fifth_block == first_block {
        "yes, reused the freed block"
      } else {
        "no, placed elsewhere"
      }
    );
    block_until_enter_pressed();

    // ------------------------------------------------------------------
    // 7) Allocate a large block to observe heap growth past CHUNKSIZE.
    // ------------------------------------------------------------------
    print_program_break("before large alloc");
    let big_block = allocator.alloc(64 * 1024).expect("alloc(64 KiB) failed");
    println!("\n[7] alloc(64 KiB) -> {:?}", big_block);
    print_program_break("after large alloc");
    allocator.checkheap(true);
    block_until_enter_pressed();

    // ------------------------------------------------------------------
    // 8) Grow the large block in place via realloc and confirm the
    //    prefix survives the move.
    // ------------------------------------------------------------------
    let grown = allocator.realloc(big_block, 128 * 1024);
    println!("\n[8] realloc(big_block, 128 KiB) -> {:?}", grown);
    allocator.checkheap(true);

    println!("\n[9] End of demo. Process exit reclaims all memory.");
  }
}
