//! # Physical Frame Management
//!
//! The two physical-memory collaborators of the paging subsystem:
//!
//! ```text
//! ┌──────────────────────────────┐   ┌──────────────────────────────┐
//! │ Free-frame pool              │   │ Physical memory              │
//! │ (BitmapFrameAlloc)           │   │ (PhysicalMemory)             │
//! │  • which frames are free     │   │  • the bytes of each frame   │
//! │  • one SpinLock for the map  │   │  • one SpinLock per frame    │
//! └──────────────┬───────────────┘   └───────────────┬──────────────┘
//!                │ FrameAlloc                         │ PhysMapper
//!                └───────────────┬────────────────────┘
//!                                ▼
//!                      Ram (both, same range)
//! ```
//!
//! The pool is shared by every core, so allocation and release are
//! serialized on its lock. Reading or writing an already-allocated frame
//! only takes that frame's own lock; a frame has exactly one owner at a time,
//! so the per-frame lock is never contended in practice.
//!
//! ## Usage
//! ```rust
//! use kernel_alloc::Ram;
//! use kernel_memory_addresses::PhysicalPage;
//! use kernel_vmem::{FrameAlloc, PhysMapper};
//!
//! let ram = Ram::new(PhysicalPage::from_number(0x80_000), 4);
//! let frame = ram.alloc_4k().expect("frame");
//! ram.with_frame(frame, |bytes| bytes[0] = 0xAA);
//! ram.free_4k(frame);
//! assert_eq!(ram.free_frames(), 4);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

extern crate alloc;

pub mod frame_alloc;
pub mod phys_mapper;

use kernel_memory_addresses::PhysicalPage;
use kernel_vmem::{FrameAlloc, PageBuf, PhysMapper};

pub use frame_alloc::BitmapFrameAlloc;
pub use phys_mapper::PhysicalMemory;

/// A contiguous range of physical memory together with its free-frame pool.
#[derive(Debug)]
pub struct Ram {
    memory: PhysicalMemory,
    pool: BitmapFrameAlloc,
}

impl Ram {
    /// Manage `frames` frames starting at `base`.
    #[must_use]
    pub fn new(base: PhysicalPage, frames: usize) -> Self {
        Self {
            memory: PhysicalMemory::new(base, frames),
            pool: BitmapFrameAlloc::new(base, frames),
        }
    }

    #[must_use]
    pub const fn memory(&self) -> &PhysicalMemory {
        &self.memory
    }

    #[must_use]
    pub const fn pool(&self) -> &BitmapFrameAlloc {
        &self.pool
    }
}

impl FrameAlloc for Ram {
    fn alloc_4k(&self) -> Option<PhysicalPage> {
        self.pool.alloc_4k()
    }

    fn free_4k(&self, page: PhysicalPage) {
        self.pool.free_4k(page);
    }

    fn free_frames(&self) -> usize {
        self.pool.free_frames()
    }
}

impl PhysMapper for Ram {
    fn with_frame<R>(&self, page: PhysicalPage, f: impl FnOnce(&mut PageBuf) -> R) -> R {
        self.memory.with_frame(page, f)
    }
}
