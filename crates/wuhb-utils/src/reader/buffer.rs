//! Growable aligned byte buffer for the whole-file reader
//!
//! [`GrowBuffer`] owns one contiguous allocation and tracks how many leading
//! bytes are initialized. Growing allocates the new region first, copies the
//! initialized bytes over and only then releases the old region, so a failed
//! grow leaves the buffer exactly as it was.

use std::alloc::Layout;
use std::mem::MaybeUninit;
use std::ptr::NonNull;

/// Source of raw memory for [`GrowBuffer`].
///
/// Allocation failure is reported as `None`, never by aborting.
pub trait BufferAllocator {
    /// Allocate a block for `layout` (`layout.size()` is never zero).
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>>;

    /// Release a block obtained from [`BufferAllocator::allocate`].
    ///
    /// # Safety
    ///
    /// `ptr` must come from `allocate` on this allocator with the same `layout`
    /// and must not be used afterwards.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

impl<A: BufferAllocator + ?Sized> BufferAllocator for &A {
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        (**self).allocate(layout)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        (**self).deallocate(ptr, layout)
    }
}

/// The Rust global allocator.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemAllocator;

impl BufferAllocator for SystemAllocator {
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        debug_assert!(layout.size() > 0);
        NonNull::new(unsafe { std::alloc::alloc(layout) })
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        std::alloc::dealloc(ptr.as_ptr(), layout)
    }
}

/// Contiguous byte buffer with a capacity and an initialized length.
///
/// `len() <= capacity()` always holds. A zero capacity owns no allocation.
pub struct GrowBuffer<A: BufferAllocator = SystemAllocator> {
    ptr: NonNull<u8>,
    len: usize,
    layout: Layout,
    alloc: A,
}

unsafe impl<A: BufferAllocator + Send> Send for GrowBuffer<A> {}
unsafe impl<A: BufferAllocator + Sync> Sync for GrowBuffer<A> {}

impl<A: BufferAllocator> GrowBuffer<A> {
    /// Empty buffer that owns no memory.
    pub fn empty_in(alloc: A) -> Self {
        Self {
            ptr: NonNull::dangling(),
            len: 0,
            // Size 0, align 1 is always a valid layout.
            layout: Layout::new::<()>(),
            alloc,
        }
    }

    /// Allocate `capacity` bytes aligned to `align`.
    ///
    /// Returns `None` if the allocator refuses or `align` is not a power of two.
    pub fn with_capacity_in(capacity: usize, align: usize, alloc: A) -> Option<Self> {
        let layout = Layout::from_size_align(capacity, align).ok()?;
        if capacity == 0 {
            return Some(Self {
                ptr: NonNull::dangling(),
                len: 0,
                layout,
                alloc,
            });
        }
        let ptr = alloc.allocate(layout)?;
        Some(Self {
            ptr,
            len: 0,
            layout,
            alloc,
        })
    }

    /// Number of initialized bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if no bytes are initialized.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Size of the allocation in bytes.
    pub fn capacity(&self) -> usize {
        self.layout.size()
    }

    /// Alignment of the allocation.
    pub fn alignment(&self) -> usize {
        self.layout.align()
    }

    /// Bytes left before the buffer is full.
    pub fn remaining(&self) -> usize {
        self.capacity() - self.len
    }

    /// Check if every byte of the allocation is initialized.
    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Initialized bytes.
    pub fn as_slice(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// Initialized bytes, mutably.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    /// Uninitialized tail of the allocation.
    pub fn spare_capacity_mut(&mut self) -> &mut [MaybeUninit<u8>] {
        unsafe {
            std::slice::from_raw_parts_mut(
                self.ptr.as_ptr().add(self.len) as *mut MaybeUninit<u8>,
                self.remaining(),
            )
        }
    }

    /// Mark `count` more bytes of the spare capacity as initialized.
    ///
    /// # Safety
    ///
    /// The first `count` bytes of [`GrowBuffer::spare_capacity_mut`] must have
    /// been written.
    pub unsafe fn advance(&mut self, count: usize) {
        debug_assert!(count <= self.remaining());
        self.len += count;
    }

    /// Move the contents into a larger allocation of `new_capacity` bytes.
    ///
    /// On failure the buffer is left untouched and `false` is returned.
    pub fn try_grow(&mut self, new_capacity: usize) -> bool {
        if new_capacity <= self.capacity() {
            return true;
        }
        let Ok(layout) = Layout::from_size_align(new_capacity, self.alignment()) else {
            return false;
        };
        if !self.relocate(layout) {
            return false;
        }
        tracing::debug!(capacity = new_capacity, len = self.len, "read buffer grown");
        true
    }

    /// Shrink the allocation to exactly `len()` bytes.
    ///
    /// Uses a fresh byte-aligned allocation and a copy. If that allocation
    /// fails the oversized buffer is returned unchanged.
    pub fn shrink_to_len(mut self) -> Self {
        if self.is_full() {
            return self;
        }
        if self.len == 0 {
            self.release();
            return self;
        }
        let Ok(layout) = Layout::from_size_align(self.len, 1) else {
            return self;
        };
        if !self.relocate(layout) {
            tracing::debug!(
                len = self.len,
                capacity = self.capacity(),
                "shrinking read buffer failed, keeping oversized buffer"
            );
        }
        self
    }

    /// Copy the initialized bytes into a `Vec`.
    pub fn to_vec(&self) -> Vec<u8> {
        self.as_slice().to_vec()
    }

    /// Give up ownership of the allocation.
    ///
    /// Returns the block (if one is owned), its layout, and the initialized
    /// length. The caller becomes responsible for releasing the block through
    /// an allocator compatible with the one backing this buffer.
    pub fn into_raw_parts(self) -> (Option<NonNull<u8>>, Layout, usize) {
        let this = std::mem::ManuallyDrop::new(self);
        let ptr = (this.layout.size() > 0).then_some(this.ptr);
        (ptr, this.layout, this.len)
    }

    fn relocate(&mut self, layout: Layout) -> bool {
        debug_assert!(layout.size() >= self.len);
        let Some(new_ptr) = self.alloc.allocate(layout) else {
            return false;
        };
        unsafe {
            std::ptr::copy_nonoverlapping(self.ptr.as_ptr(), new_ptr.as_ptr(), self.len);
        }
        self.release_block();
        self.ptr = new_ptr;
        self.layout = layout;
        true
    }

    fn release(&mut self) {
        self.release_block();
        self.ptr = NonNull::dangling();
        self.layout = Layout::new::<()>();
        self.len = 0;
    }

    fn release_block(&mut self) {
        if self.layout.size() > 0 {
            unsafe { self.alloc.deallocate(self.ptr, self.layout) };
        }
    }
}

impl GrowBuffer<SystemAllocator> {
    /// Empty buffer on the global allocator.
    pub fn new() -> Self {
        Self::empty_in(SystemAllocator)
    }
}

impl Default for GrowBuffer<SystemAllocator> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: BufferAllocator> Drop for GrowBuffer<A> {
    fn drop(&mut self) {
        self.release_block();
    }
}

impl<A: BufferAllocator> std::ops::Deref for GrowBuffer<A> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl<A: BufferAllocator> std::ops::DerefMut for GrowBuffer<A> {
    fn deref_mut(&mut self) -> &mut [u8] {
        self.as_mut_slice()
    }
}

impl<A: BufferAllocator> AsRef<[u8]> for GrowBuffer<A> {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl<A: BufferAllocator> std::fmt::Debug for GrowBuffer<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrowBuffer")
            .field("len", &self.len)
            .field("capacity", &self.capacity())
            .field("alignment", &self.alignment())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// Global allocator that can be told to refuse requests and counts live blocks.
    #[derive(Default)]
    struct Flaky {
        refuse: Cell<bool>,
        live: Cell<usize>,
    }

    impl BufferAllocator for Flaky {
        fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
            if self.refuse.get() {
                return None;
            }
            let ptr = SystemAllocator.allocate(layout)?;
            self.live.set(self.live.get() + 1);
            Some(ptr)
        }

        unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
            self.live.set(self.live.get() - 1);
            SystemAllocator.deallocate(ptr, layout)
        }
    }

    fn fill(buffer: &mut GrowBuffer<impl BufferAllocator>, bytes: &[u8]) {
        let spare = buffer.spare_capacity_mut();
        for (slot, &byte) in spare.iter_mut().zip(bytes) {
            slot.write(byte);
        }
        unsafe { buffer.advance(bytes.len()) };
    }

    #[test]
    fn test_aligned_allocation() {
        let buffer = GrowBuffer::with_capacity_in(4096, 0x40, SystemAllocator).unwrap();
        assert_eq!(buffer.capacity(), 4096);
        assert_eq!(buffer.alignment(), 0x40);
        assert_eq!(buffer.as_slice().as_ptr() as usize % 0x40, 0);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_grow_preserves_contents() {
        let alloc = Flaky::default();
        let mut buffer = GrowBuffer::with_capacity_in(4, 0x40, &alloc).unwrap();
        fill(&mut buffer, b"abcd");
        assert!(buffer.is_full());

        assert!(buffer.try_grow(8));
        assert_eq!(buffer.capacity(), 8);
        assert_eq!(buffer.as_slice(), b"abcd");
        assert_eq!(alloc.live.get(), 1);
    }

    #[test]
    fn test_failed_grow_leaves_buffer_intact() {
        let alloc = Flaky::default();
        let mut buffer = GrowBuffer::with_capacity_in(4, 0x40, &alloc).unwrap();
        fill(&mut buffer, b"wxyz");

        alloc.refuse.set(true);
        assert!(!buffer.try_grow(8));
        assert_eq!(buffer.capacity(), 4);
        assert_eq!(buffer.as_slice(), b"wxyz");
        assert_eq!(alloc.live.get(), 1);
    }

    #[test]
    fn test_shrink_to_len() {
        let alloc = Flaky::default();
        let mut buffer = GrowBuffer::with_capacity_in(64, 0x40, &alloc).unwrap();
        fill(&mut buffer, b"hello");

        let buffer = buffer.shrink_to_len();
        assert_eq!(buffer.capacity(), 5);
        assert_eq!(&buffer[..], b"hello");
        assert_eq!(alloc.live.get(), 1);
    }

    #[test]
    fn test_shrink_failure_keeps_oversized_buffer() {
        let alloc = Flaky::default();
        let mut buffer = GrowBuffer::with_capacity_in(64, 0x40, &alloc).unwrap();
        fill(&mut buffer, b"hello");

        alloc.refuse.set(true);
        let buffer = buffer.shrink_to_len();
        assert_eq!(buffer.capacity(), 64);
        assert_eq!(&buffer[..], b"hello");
    }

    #[test]
    fn test_shrink_empty_releases_memory() {
        let alloc = Flaky::default();
        let buffer = GrowBuffer::with_capacity_in(64, 0x40, &alloc).unwrap();
        let buffer = buffer.shrink_to_len();
        assert_eq!(buffer.capacity(), 0);
        assert_eq!(alloc.live.get(), 0);

        let (ptr, layout, len) = buffer.into_raw_parts();
        assert!(ptr.is_none());
        assert_eq!(layout.size(), 0);
        assert_eq!(len, 0);
    }

    #[test]
    fn test_drop_releases_memory() {
        let alloc = Flaky::default();
        {
            let _buffer = GrowBuffer::with_capacity_in(128, 0x40, &alloc).unwrap();
            assert_eq!(alloc.live.get(), 1);
        }
        assert_eq!(alloc.live.get(), 0);
    }

    #[test]
    fn test_refused_initial_allocation() {
        let alloc = Flaky::default();
        alloc.refuse.set(true);
        assert!(GrowBuffer::with_capacity_in(128, 0x40, &alloc).is_none());
    }
}
