//! Whole-file reads through the facade's open/read/close

mod common;

use std::alloc::Layout;
use std::cell::Cell;
use std::ptr::NonNull;

use wuhb_utils::reader::READ_CHUNK_SIZE;
use wuhb_utils::{BufferAllocator, BundleSource, SystemAllocator, WuhbError};
use wuhb_utils_abi::exports;

const PATH: &str = "app:/content/data.bin";

fn read_back(len: usize) {
    let session = common::mounted_session();
    common::add_file(PATH, common::pattern(len));

    let buffer = session.read_whole_file(PATH).unwrap();
    assert_eq!(buffer.len(), len);
    assert_eq!(buffer.capacity(), len);
    assert!(buffer.as_slice() == common::pattern(len).as_slice());

    assert_eq!(common::calls(exports::FILE_OPEN), 1);
    assert_eq!(common::calls(exports::FILE_CLOSE), 1);
    assert_eq!(common::open_handles(), 0);
    let max = READ_CHUNK_SIZE as u32;
    common::with_state(|s| assert!(s.read_sizes.iter().all(|&size| size <= max)));
}

#[test]
fn test_read_empty_file() {
    read_back(0);
}

#[test]
fn test_read_chunk_boundaries() {
    read_back(READ_CHUNK_SIZE - 1);
    read_back(READ_CHUNK_SIZE);
    read_back(READ_CHUNK_SIZE + 1);
}

#[test]
fn test_read_two_mib() {
    read_back(2 * 1024 * 1024);
}

#[test]
fn test_read_with_linear_growth() {
    read_back(3 * 1024 * 1024 + 77);
}

#[test]
fn test_read_with_short_reads() {
    let session = common::mounted_session();
    let content = common::pattern(200_000);
    common::add_file(PATH, content.clone());
    common::with_state(|s| s.read_limit = Some(999));

    let buffer = session.read_whole_file(PATH).unwrap();
    assert!(buffer.as_slice() == content.as_slice());
    assert!(common::calls(exports::FILE_READ) > 200_000 / 999);
}

#[test]
fn test_read_missing_file() {
    let session = common::mounted_session();
    assert_eq!(
        session.read_whole_file("app:/missing").map(|b| b.len()),
        Err(WuhbError::FileNotFound)
    );
    assert_eq!(common::calls(exports::FILE_READ), 0);
    assert_eq!(common::calls(exports::FILE_CLOSE), 0);
}

#[test]
fn test_read_handle_lost_mid_loop() {
    let session = common::mounted_session();
    common::add_file(PATH, common::pattern(1024 * 1024));
    common::with_state(|s| s.fail_reads_after = Some(2));

    assert_eq!(
        session.read_whole_file(PATH).map(|b| b.len()),
        Err(WuhbError::FileHandleNotFound)
    );
    assert_eq!(common::calls(exports::FILE_READ), 3);
    assert_eq!(common::calls(exports::FILE_CLOSE), 1);
    assert_eq!(common::open_handles(), 0);
}

#[test]
fn test_read_close_failure() {
    let session = common::mounted_session();
    common::add_file(PATH, common::pattern(10));
    common::force(exports::FILE_CLOSE, -5);

    assert_eq!(
        session.read_whole_file(PATH).map(|b| b.len()),
        Err(WuhbError::FileHandleNotFound)
    );
    assert_eq!(common::calls(exports::FILE_CLOSE), 1);
}

#[test]
fn test_read_without_read_export() {
    let mut session = common::session_without(&[exports::FILE_READ]);
    session.init_library().unwrap();

    // The open path is gated separately from the read path, so the handle is
    // opened and then closed again.
    common::add_bundle("fs:/b.wuhb", Default::default());
    session
        .mount_bundle("app", "fs:/b.wuhb", BundleSource::FileDescriptor)
        .unwrap();
    common::add_file(PATH, common::pattern(10));

    assert_eq!(
        session.read_whole_file(PATH).map(|b| b.len()),
        Err(WuhbError::UnsupportedCommand)
    );
    assert_eq!(common::calls(exports::FILE_CLOSE), 1);
    assert_eq!(common::open_handles(), 0);
}

/// Global allocator with a block size limit.
struct Capped {
    max: usize,
    live: Cell<usize>,
}

impl BufferAllocator for Capped {
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        if layout.size() > self.max {
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

#[test]
fn test_read_under_memory_pressure() {
    let session = common::mounted_session();
    common::add_file(PATH, common::pattern(2 * 1024 * 1024));
    let alloc = Capped {
        max: 1024 * 1024,
        live: Cell::new(0),
    };

    assert_eq!(
        session.read_whole_file_in(PATH, &alloc).map(|b| b.len()),
        Err(WuhbError::NoMemory)
    );
    assert_eq!(alloc.live.get(), 0);
    assert_eq!(common::calls(exports::FILE_CLOSE), 1);
}

#[test]
fn test_read_with_fallback_growth() {
    let session = common::mounted_session();
    let content = common::pattern(600 * 1024);
    common::add_file(PATH, content.clone());
    // 1 MiB is refused after 512 KiB fills up; 640 KiB is not.
    let alloc = Capped {
        max: 700 * 1024,
        live: Cell::new(0),
    };

    let buffer = session.read_whole_file_in(PATH, &alloc).unwrap();
    assert!(buffer.as_slice() == content.as_slice());
    drop(buffer);
    assert_eq!(alloc.live.get(), 0);
}
