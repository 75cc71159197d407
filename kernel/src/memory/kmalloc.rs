// SPDX-License-Identifier: GPL-2.0

//! Kernel memory allocation (kmalloc), backed by the segregated free-list
//! heap in [`crate::memory::heap`].

use crate::error::{Error, Result};
use crate::memory::heap;

/// Number of 4 KiB pages reserved for the kernel heap arena at boot.
const HEAP_PAGES: usize = 256; // 1 MiB

/// Get kmalloc statistics: `(total_bytes, used_bytes, free_bytes)`.
pub fn get_stats() -> Result<(usize, usize, usize)> {
	heap::stats()
}

/// Allocate kernel memory.
pub fn kmalloc(size: usize) -> Result<*mut u8> {
	if size == 0 {
		return Err(Error::InvalidArgument);
	}

	let ptr = heap::alloc(size);
	if ptr.is_null() {
		Err(Error::OutOfMemory)
	} else {
		Ok(ptr)
	}
}

/// Free kernel memory.
pub fn kfree(ptr: *mut u8) {
	heap::free(ptr);
}

/// Allocate zeroed kernel memory.
pub fn kzalloc(size: usize) -> Result<*mut u8> {
	let ptr = kmalloc(size)?;
	unsafe {
		core::ptr::write_bytes(ptr, 0, size);
	}
	Ok(ptr)
}

/// Reallocate kernel memory.
pub fn krealloc(ptr: *mut u8, old_size: usize, new_size: usize) -> Result<*mut u8> {
	if ptr.is_null() {
		return kmalloc(new_size);
	}

	if new_size == 0 {
		kfree(ptr);
		return Ok(core::ptr::null_mut());
	}

	let new_ptr = kmalloc(new_size)?;
	let copy_size = core::cmp::min(old_size, new_size);

	unsafe {
		core::ptr::copy_nonoverlapping(ptr, new_ptr, copy_size);
	}

	kfree(ptr);
	Ok(new_ptr)
}

/// Initialize the kernel heap.
pub fn init() -> Result<()> {
	heap::init(HEAP_PAGES)
}
