//! Bitmap-based physical frame allocator.
//!
//! One bit per frame (`1` = in use). Allocation scans from a rotating hint so
//! recently freed frames are not handed out again immediately.

use alloc::vec;
use alloc::vec::Vec;
use core::fmt;
use kernel_memory_addresses::PhysicalPage;
use kernel_sync::SpinLock;
use kernel_vmem::FrameAlloc;
use log::trace;

const BITS: usize = u64::BITS as usize;

struct Bitmap {
    words: Vec<u64>,
    frames: usize,
    free: usize,
    hint: usize,
}

impl Bitmap {
    fn new(frames: usize) -> Self {
        Self {
            words: vec![0; frames.div_ceil(BITS)],
            frames,
            free: frames,
            hint: 0,
        }
    }

    fn is_used(&self, idx: usize) -> bool {
        self.words[idx / BITS] & (1 << (idx % BITS)) != 0
    }

    fn set(&mut self, idx: usize, used: bool) {
        let mask = 1 << (idx % BITS);
        if used {
            self.words[idx / BITS] |= mask;
        } else {
            self.words[idx / BITS] &= !mask;
        }
    }

    fn take(&mut self) -> Option<usize> {
        if self.free == 0 {
            return None;
        }
        let idx = (0..self.frames)
            .map(|i| (self.hint + i) % self.frames)
            .find(|&i| !self.is_used(i))?;
        self.set(idx, true);
        self.free -= 1;
        self.hint = (idx + 1) % self.frames;
        Some(idx)
    }
}

/// Free-frame pool over a fixed, contiguous range of frames.
pub struct BitmapFrameAlloc {
    base: PhysicalPage,
    map: SpinLock<Bitmap>,
}

impl BitmapFrameAlloc {
    /// Pool of `frames` frames starting at `base`, all initially free.
    #[must_use]
    pub fn new(base: PhysicalPage, frames: usize) -> Self {
        Self {
            base,
            map: SpinLock::new("frame-pool", Bitmap::new(frames)),
        }
    }

    /// Total number of frames managed.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.map.with_lock(|m| m.frames)
    }

    /// Whether `page` is currently handed out.
    #[must_use]
    pub fn is_allocated(&self, page: PhysicalPage) -> bool {
        self.index_of(page)
            .is_some_and(|idx| self.map.with_lock(|m| m.is_used(idx)))
    }

    fn index_of(&self, page: PhysicalPage) -> Option<usize> {
        let idx = usize::try_from(page.number().checked_sub(self.base.number())?).ok()?;
        (idx < self.map.with_lock(|m| m.frames)).then_some(idx)
    }
}

impl FrameAlloc for BitmapFrameAlloc {
    fn alloc_4k(&self) -> Option<PhysicalPage> {
        let idx = self.map.with_lock(Bitmap::take)?;
        let page = PhysicalPage::from_number(self.base.number() + idx as u64);
        trace!("frame-pool: alloc {page}");
        Some(page)
    }

    /// # Panics
    /// If `page` is outside the pool or not currently allocated. Either is a
    /// double free or a stray frame, i.e. a kernel bug.
    fn free_4k(&self, page: PhysicalPage) {
        let Some(idx) = self.index_of(page) else {
            panic!("frame-pool: {page} is not managed by this pool");
        };
        self.map.with_lock(|m| {
            assert!(m.is_used(idx), "frame-pool: double free of {page}");
            m.set(idx, false);
            m.free += 1;
        });
        trace!("frame-pool: free {page}");
    }

    fn free_frames(&self) -> usize {
        self.map.with_lock(|m| m.free)
    }
}

impl fmt::Debug for BitmapFrameAlloc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BitmapFrameAlloc")
            .field("base", &self.base)
            .field("capacity", &self.capacity())
            .field("free", &self.free_frames())
            .finish()
    }
}
