#![allow(dead_code)]

use kernel_alloc::Ram;
use kernel_info::memory::PAGE_SIZE;
use kernel_memory_addresses::{PhysicalPage, VirtualAddress};
use kernel_swap::{MemoryBackingStore, PagingConfig, Process};
use kernel_vmem::PhysMapper;

pub const RAM_BASE: u64 = 0x80_000;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn ram(frames: usize) -> Ram {
    Ram::new(PhysicalPage::from_number(RAM_BASE), frames)
}

pub fn config(total: usize, resident: usize) -> PagingConfig {
    PagingConfig::DEFAULT
        .with_max_total_pages(total)
        .with_max_resident_pages(resident)
        .validate()
        .expect("valid config")
}

pub fn store(slots: usize) -> MemoryBackingStore {
    MemoryBackingStore::with_capacity(slots)
}

pub fn va(v: u64) -> VirtualAddress {
    VirtualAddress::new(v)
}

/// Deterministic page contents derived from `seed`.
pub fn pattern(seed: u8) -> Box<[u8; PAGE_SIZE]> {
    let mut page = Box::new([0u8; PAGE_SIZE]);
    for (i, b) in page.iter_mut().enumerate() {
        *b = seed.wrapping_add((i % 251) as u8);
    }
    page
}

/// Write `data` into the resident page at `addr`.
pub fn fill(
    ram: &Ram,
    process: &Process<MemoryBackingStore>,
    addr: VirtualAddress,
    data: &[u8; PAGE_SIZE],
) {
    let pa = process.space().translate(addr).expect("page is resident");
    ram.write_frame(pa.page(), data);
}

/// Read the resident page at `addr`.
pub fn contents(
    ram: &Ram,
    process: &Process<MemoryBackingStore>,
    addr: VirtualAddress,
) -> Box<[u8; PAGE_SIZE]> {
    let pa = process.space().translate(addr).expect("page is resident");
    let mut out = Box::new([0u8; PAGE_SIZE]);
    ram.read_frame(pa.page(), &mut out);
    out
}
