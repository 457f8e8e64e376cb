//! # Physical Memory
//!
//! Backing bytes for a range of 4 KiB frames, addressed by [`PhysicalPage`].
//!
//! A hart reaches physical memory through the kernel's direct map; hosted
//! builds and tests have no such map, so frames live in an owned slice
//! instead. Both expose the same [`PhysMapper`] interface to the pager.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;
use kernel_info::memory::PAGE_SIZE;
use kernel_memory_addresses::PhysicalPage;
use kernel_sync::SpinLock;
use kernel_vmem::{PageBuf, PhysMapper};

/// One 4 KiB, page-aligned frame.
#[repr(C, align(4096))]
struct Frame(PageBuf);

/// Owned frames for a contiguous physical range.
pub struct PhysicalMemory {
    base: PhysicalPage,
    frames: Box<[SpinLock<Frame>]>,
}

impl PhysicalMemory {
    /// `frames` zeroed frames starting at `base`.
    #[must_use]
    pub fn new(base: PhysicalPage, frames: usize) -> Self {
        let frames: Vec<_> = (0..frames)
            .map(|_| SpinLock::new("frame", Frame([0; PAGE_SIZE])))
            .collect();
        Self {
            base,
            frames: frames.into_boxed_slice(),
        }
    }

    #[must_use]
    pub const fn base(&self) -> PhysicalPage {
        self.base
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Whether `page` lies inside this range.
    #[must_use]
    pub fn contains(&self, page: PhysicalPage) -> bool {
        self.slot(page).is_some()
    }

    fn slot(&self, page: PhysicalPage) -> Option<&SpinLock<Frame>> {
        let idx = page.number().checked_sub(self.base.number())?;
        self.frames.get(usize::try_from(idx).ok()?)
    }
}

impl PhysMapper for PhysicalMemory {
    fn with_frame<R>(&self, page: PhysicalPage, f: impl FnOnce(&mut PageBuf) -> R) -> R {
        let Some(frame) = self.slot(page) else {
            panic!("physical memory: {page} is outside this range");
        };
        frame.with_lock(|frame| f(&mut frame.0))
    }
}

impl fmt::Debug for PhysicalMemory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhysicalMemory")
            .field("base", &self.base)
            .field("frames", &self.frames.len())
            .finish()
    }
}
