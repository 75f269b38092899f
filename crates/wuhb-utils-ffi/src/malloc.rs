//! C heap allocator
//!
//! Buffers returned through the C ABI are owned by the caller, who releases
//! them with `free()`. They therefore have to come from the C heap.

use std::alloc::Layout;
use std::ffi::c_void;
use std::ptr::NonNull;

use wuhb_utils::BufferAllocator;

#[cfg(unix)]
/// Alignment plain `malloc` guarantees.
const MALLOC_ALIGNMENT: usize = 2 * std::mem::size_of::<usize>();

/// [`BufferAllocator`] over `malloc`/`free`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MallocAllocator;

impl BufferAllocator for MallocAllocator {
    #[cfg(unix)]
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        if layout.align() <= MALLOC_ALIGNMENT {
            return NonNull::new(unsafe { libc::malloc(layout.size()) }.cast());
        }
        let mut ptr: *mut c_void = std::ptr::null_mut();
        let align = layout.align().max(std::mem::size_of::<*mut c_void>());
        match unsafe { libc::posix_memalign(&mut ptr, align, layout.size()) } {
            0 => NonNull::new(ptr.cast()),
            _ => None,
        }
    }

    // No aligned variant that is compatible with free(); malloc's own
    // alignment has to do.
    #[cfg(not(unix))]
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        NonNull::new(unsafe { libc::malloc(layout.size()) }.cast())
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, _layout: Layout) {
        libc::free(ptr.as_ptr().cast::<c_void>())
    }
}
