//! Whole-file reader
//!
//! Reads a file of unknown length through the handle-based open/read/close
//! calls into one contiguous buffer sized exactly to the content.
//!
//! The buffer starts at [`READ_CHUNK_SIZE`] and grows whenever a read fills
//! it completely: doubling below [`LINEAR_GROWTH_THRESHOLD`], then in
//! [`LINEAR_GROWTH_STEP`] increments. If a growth allocation fails, one
//! smaller step (current capacity + [`READ_CHUNK_SIZE`]) is attempted before
//! giving up with [`WuhbError::NoMemory`].

mod buffer;

use std::mem::MaybeUninit;

use wuhb_utils_abi::FileHandle;

use crate::status::{WuhbError, WuhbResult};

pub use buffer::{BufferAllocator, GrowBuffer, SystemAllocator};

/// Initial buffer size and the largest single read request.
pub const READ_CHUNK_SIZE: usize = 128 * 1024;

/// Alignment of working buffers. Helps the module's read path, not required.
pub const BUFFER_ALIGNMENT: usize = 0x40;

/// Capacity from which growth becomes linear.
pub const LINEAR_GROWTH_THRESHOLD: usize = 1024 * 1024;

/// Linear growth increment.
pub const LINEAR_GROWTH_STEP: usize = 1024 * 1024;

/// Handle-based file access the reader is built on.
pub trait FileAccess {
    /// Open `path` for reading.
    fn open(&self, path: &str) -> WuhbResult<FileHandle>;

    /// Read up to `buf.len()` bytes into the front of `buf`.
    ///
    /// Returns the number of bytes written. Zero or a negative count marks the
    /// end of the stream; short reads are not errors.
    fn read(&self, handle: FileHandle, buf: &mut [MaybeUninit<u8>]) -> WuhbResult<i32>;

    /// Close a handle returned by [`FileAccess::open`].
    fn close(&self, handle: FileHandle) -> WuhbResult<()>;
}

/// Capacity after `current` has been filled.
pub fn grown_capacity(current: usize) -> usize {
    if current >= LINEAR_GROWTH_THRESHOLD {
        current.saturating_add(LINEAR_GROWTH_STEP)
    } else {
        current.saturating_mul(2)
    }
}

/// Read the whole file at `path` into a buffer from `alloc`.
///
/// The handle is closed exactly once on every path after a successful open.
/// A close failure discards the data and is returned.
pub fn read_whole_file<F, A>(files: &F, path: &str, alloc: A) -> WuhbResult<GrowBuffer<A>>
where
    F: FileAccess + ?Sized,
    A: BufferAllocator,
{
    let handle = files.open(path)?;

    let Some(mut buffer) = GrowBuffer::with_capacity_in(READ_CHUNK_SIZE, BUFFER_ALIGNMENT, alloc)
    else {
        let _ = files.close(handle);
        return Err(WuhbError::NoMemory);
    };

    loop {
        let request = READ_CHUNK_SIZE.min(buffer.remaining());
        let read = match files.read(handle, &mut buffer.spare_capacity_mut()[..request]) {
            Ok(read) => read,
            Err(err) => {
                drop(buffer);
                let _ = files.close(handle);
                return Err(err);
            }
        };

        if read <= 0 {
            break;
        }

        let read = read as usize;
        if read > request {
            tracing::warn!(
                path,
                read,
                request,
                "read reported more bytes than requested"
            );
            drop(buffer);
            let _ = files.close(handle);
            return Err(WuhbError::UnknownError);
        }
        // The first `read` spare bytes were written by the read call.
        unsafe { buffer.advance(read) };

        if buffer.is_full() {
            let capacity = buffer.capacity();
            if !buffer.try_grow(grown_capacity(capacity))
                && !buffer.try_grow(capacity.saturating_add(READ_CHUNK_SIZE))
            {
                tracing::debug!(path, capacity, "read buffer growth failed");
                drop(buffer);
                let _ = files.close(handle);
                return Err(WuhbError::NoMemory);
            }
        }
    }

    files.close(handle)?;

    Ok(buffer.shrink_to_len())
}
