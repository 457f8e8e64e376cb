mod common;

use common::*;
use kernel_swap::{FaultKind, FaultVerdict, PageFault, Pager, SwapError};
use kernel_vmem::{FrameAlloc, PageEntryBits};

#[test]
fn mapping_twice_is_refused() {
    init_logging();
    let ram = ram(4);
    let pager = Pager::new(&ram, &ram, config(4, 4));
    let mut p = pager.spawn(1, store(4));

    pager
        .map_user_page(&mut p, va(0x1000), PageEntryBits::user_rw())
        .unwrap();
    let err = pager
        .map_user_page(&mut p, va(0x1abc), PageEntryBits::user_ro())
        .unwrap_err();
    assert!(matches!(err.as_swap(), Some(SwapError::AlreadyMapped(_))));

    pager.evict_one(&mut p).unwrap();
    let err = pager
        .map_user_page(&mut p, va(0x1000), PageEntryBits::user_rw())
        .unwrap_err();
    assert!(matches!(err.as_swap(), Some(SwapError::AlreadyMapped(_))));
    pager.teardown(&mut p);
}

#[test]
fn fresh_pages_are_zeroed() {
    init_logging();
    let ram = ram(1);
    let pager = Pager::new(&ram, &ram, config(4, 4));
    let mut p = pager.spawn(1, store(4));

    pager
        .map_user_page(&mut p, va(0x1000), PageEntryBits::user_rw())
        .unwrap();
    fill(&ram, &p, va(0x1000), &pattern(0xEE));
    pager.unmap_user_page(&mut p, va(0x1000)).unwrap();

    pager
        .map_user_page(&mut p, va(0x9000), PageEntryBits::user_rw())
        .unwrap();
    assert!(contents(&ram, &p, va(0x9000)).iter().all(|&b| b == 0));
    pager.teardown(&mut p);
}

#[test]
fn unmapping_releases_frame_or_slot() {
    init_logging();
    let ram = ram(4);
    let pager = Pager::new(&ram, &ram, config(4, 4));
    let mut p = pager.spawn(1, store(4));

    for base in [0x1000, 0x2000, 0x3000] {
        pager
            .map_user_page(&mut p, va(base), PageEntryBits::user_rw())
            .unwrap();
    }
    pager.evict_one(&mut p).unwrap();
    pager.evict_one(&mut p).unwrap();
    assert_eq!(p.swap().in_use(), 2);

    // Evicted, not at the head of the queue.
    pager.unmap_user_page(&mut p, va(0x2000)).unwrap();
    assert_eq!(p.swap().in_use(), 1);
    assert_eq!(p.paging().queue_size(), 1);

    // Resident.
    let free = ram.free_frames();
    pager.unmap_user_page(&mut p, va(0x3000)).unwrap();
    assert_eq!(ram.free_frames(), free + 1);
    assert_eq!(p.paging().peek_victim(), None);

    let err = pager.unmap_user_page(&mut p, va(0x3000)).unwrap_err();
    assert!(matches!(err.as_swap(), Some(SwapError::NotMapped(_))));
    assert_eq!(p.paging().check_consistency(p.space()), Ok(()));
    pager.teardown(&mut p);
}

#[test]
fn teardown_returns_every_frame_and_slot() {
    init_logging();
    let ram = ram(3);
    let pager = Pager::new(&ram, &ram, config(8, 8));
    let mut p = pager.spawn(1, store(8));

    for n in 1..=6_u64 {
        pager
            .map_user_page(&mut p, va(n * 0x1000), PageEntryBits::user_rw())
            .unwrap();
    }
    assert_eq!(p.paging().queue_size(), 3);
    assert_eq!(p.paging().resident_count(), 3);

    let stats = pager.teardown(&mut p);
    assert_eq!(stats.evictions, 3);
    assert_eq!(stats.peak_evicted, 3);
    assert_eq!(ram.free_frames(), 3);
    assert_eq!(p.swap().in_use(), 0);
    assert!(p.space().is_empty());
    assert_eq!(p.paging().queue_size(), 0);
}

/// Drive a process through a long mix of mappings, evictions and faults and
/// check the bookkeeping after every step.
#[test]
fn bookkeeping_matches_the_page_table_throughout() {
    init_logging();
    let ram = ram(4);
    let pager = Pager::new(&ram, &ram, config(16, 3));
    let mut p = pager.spawn(1, store(16));

    let pages = 12_u64;
    let mut seed = 0x2545_f491_u32;
    let mut next = move || {
        seed ^= seed << 13;
        seed ^= seed >> 17;
        seed ^= seed << 5;
        u64::from(seed)
    };

    for step in 0..500 {
        let addr = va((next() % pages + 1) * 0x1000);
        let entry = p.space().walk(addr);
        if entry.is_unmapped() {
            pager
                .map_user_page(&mut p, addr, PageEntryBits::user_rw())
                .unwrap();
            fill(&ram, &p, addr, &pattern((addr.as_u64() >> 12) as u8));
        } else if entry.is_evicted() {
            let fault = PageFault {
                addr,
                pc: va(0x100 + step),
                kind: FaultKind::Store,
            };
            assert_eq!(
                pager.handle_page_fault(&mut p, fault).unwrap(),
                FaultVerdict::Resume {
                    pc: va(0x100 + step)
                }
            );
            assert_eq!(
                contents(&ram, &p, addr),
                pattern((addr.as_u64() >> 12) as u8)
            );
        } else if next() % 4 == 0 {
            pager.unmap_user_page(&mut p, addr).unwrap();
        }

        assert_eq!(
            p.paging().check_consistency(p.space()),
            Ok(()),
            "step {step}"
        );
        assert!(p.paging().resident_count() <= 3);
        assert_eq!(p.paging().queue_size(), p.space().evicted_pages().count());
        assert_eq!(p.swap().in_use(), p.paging().queue_size());
    }

    pager.teardown(&mut p);
    assert_eq!(ram.free_frames(), 4);
}
