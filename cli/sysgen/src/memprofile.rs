//! Heap accounting for `--memprofile`.

use std::alloc::{GlobalAlloc, Layout, System};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use serde::Serialize;

/// A global allocator that forwards to the system allocator and counts
/// allocations and live bytes.
pub struct CountingAlloc {
    allocations: AtomicU64,
    deallocations: AtomicU64,
    current: AtomicU64,
    peak: AtomicU64,
}

/// Counter values at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HeapProfile {
    pub allocations: u64,
    pub deallocations: u64,
    pub current_bytes: u64,
    pub peak_bytes: u64,
}

impl CountingAlloc {
    pub const fn new() -> Self {
        Self {
            allocations: AtomicU64::new(0),
            deallocations: AtomicU64::new(0),
            current: AtomicU64::new(0),
            peak: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> HeapProfile {
        HeapProfile {
            allocations: self.allocations.load(Ordering::Relaxed),
            deallocations: self.deallocations.load(Ordering::Relaxed),
            current_bytes: self.current.load(Ordering::Relaxed),
            peak_bytes: self.peak.load(Ordering::Relaxed),
        }
    }

    fn grow(&self, bytes: u64) {
        let now = self.current.fetch_add(bytes, Ordering::Relaxed) + bytes;
        self.peak.fetch_max(now, Ordering::Relaxed);
    }

    fn shrink(&self, bytes: u64) {
        self.current.fetch_sub(bytes, Ordering::Relaxed);
    }
}

impl Default for CountingAlloc {
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl GlobalAlloc for CountingAlloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = System.alloc(layout);
        if !ptr.is_null() {
            self.allocations.fetch_add(1, Ordering::Relaxed);
            self.grow(layout.size() as u64);
        }
        ptr
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = System.alloc_zeroed(layout);
        if !ptr.is_null() {
            self.allocations.fetch_add(1, Ordering::Relaxed);
            self.grow(layout.size() as u64);
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        System.dealloc(ptr, layout);
        self.deallocations.fetch_add(1, Ordering::Relaxed);
        self.shrink(layout.size() as u64);
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new_ptr = System.realloc(ptr, layout, new_size);
        if !new_ptr.is_null() {
            let old_size = layout.size();
            if new_size > old_size {
                self.grow((new_size - old_size) as u64);
            } else {
                self.shrink((old_size - new_size) as u64);
            }
        }
        new_ptr
    }
}

/// Write a profile as pretty JSON.
pub fn write_profile(path: &Path, profile: &HeapProfile) -> Result<()> {
    let mut json = serde_json::to_string_pretty(profile).context("serializing heap profile")?;
    json.push('\n');
    std::fs::write(path, json)
        .with_context(|| format!("writing heap profile {}", path.display()))
}
