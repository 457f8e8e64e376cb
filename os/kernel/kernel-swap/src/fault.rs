//! Page-fault resolution for evicted pages.

use crate::Pager;
use crate::backing_store::BackingStore;
use crate::error::{Fatal, FatalKind, PagingError};
use crate::pager::{debug_check, locate_queued};
use crate::process::{EXIT_KILLED, Process};
use kernel_memory_addresses::{PhysicalPage, VirtualAddress, VirtualPage};
use kernel_vmem::{FrameAlloc, PageEntryBits, PhysMapper, PtEntry, PtEntryKind, SwapOffset};
use log::{debug, warn};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FaultKind {
    Load,
    Store,
}

/// A user-mode page fault as seen by the resolver.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PageFault {
    /// Faulting data address.
    pub addr: VirtualAddress,
    /// Address of the faulting instruction.
    pub pc: VirtualAddress,
    pub kind: FaultKind,
}

/// What the trap path should do next.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FaultVerdict {
    /// Return to user mode at `pc` so the faulting access is retried.
    Resume { pc: VirtualAddress },
    /// Kill the process with `exit_code`.
    Terminate { exit_code: i32 },
}

impl<M: PhysMapper, A: FrameAlloc> Pager<'_, M, A> {
    /// Resolve a page fault of `process`.
    ///
    /// | Entry at `fault.addr` | Result |
    /// |-----------------------|--------|
    /// | evicted               | page restored, `Resume` at the faulting pc |
    /// | evicted, no frame obtainable | `Terminate` |
    /// | unmapped              | `Terminate` |
    /// | resident              | fatal |
    ///
    /// # Errors
    /// A [`Fatal`] when the page table and the paging bookkeeping disagree.
    pub fn handle_page_fault<S: BackingStore>(
        &self,
        process: &mut Process<S>,
        fault: PageFault,
    ) -> Result<FaultVerdict, Fatal> {
        let pid = process.pid();
        let page = fault.addr.page();
        match process.space.entry(page).decode() {
            PtEntryKind::Resident { .. } => {
                Err(Fatal::new(FatalKind::ResidentPageFaulted(fault.addr)))
            }
            PtEntryKind::Unmapped => {
                warn!(
                    "pid {pid}: {:?} fault at {} (pc {}) outside any mapping",
                    fault.kind, fault.addr, fault.pc
                );
                Ok(FaultVerdict::Terminate {
                    exit_code: EXIT_KILLED,
                })
            }
            PtEntryKind::Evicted { offset, flags } => {
                match self.restore(process, page, offset, flags) {
                    Ok(frame) => {
                        debug!("pid {pid}: restored {page} from slot {offset} into {frame}");
                        Ok(FaultVerdict::Resume { pc: fault.pc })
                    }
                    Err(PagingError::Swap(e)) => {
                        warn!("pid {pid}: cannot restore {page}: {e}");
                        Ok(FaultVerdict::Terminate {
                            exit_code: EXIT_KILLED,
                        })
                    }
                    Err(PagingError::Fatal(f)) => Err(f),
                }
            }
        }
    }

    /// Bring `page` back from `offset` into a frame.
    ///
    /// The page's queue entry is taken out before a frame is acquired, so
    /// that evicting another page to make room cannot fail on a full queue.
    /// If no frame can be had, the entry goes back where it was. A corrupt
    /// slot is fatal and leaves the entry out.
    fn restore<S: BackingStore>(
        &self,
        process: &mut Process<S>,
        page: VirtualPage,
        offset: SwapOffset,
        flags: PageEntryBits,
    ) -> Result<PhysicalPage, PagingError> {
        let index = locate_queued(process, page, offset)?;
        let Some(pending) = process.paging.take_evicted(index) else {
            return Err(PagingError::fatal(FatalKind::QueueMismatch {
                page,
                head: process.paging.oldest_evicted().map(|e| e.page),
            }));
        };

        let frame = match self.acquire_frame(process) {
            Ok(frame) => frame,
            Err(e) => {
                process.paging.requeue_evicted(index, pending)?;
                return Err(e);
            }
        };

        let swap = &process.swap;
        if self
            .mapper
            .with_frame(frame, |bytes| swap.read_page(offset, bytes))
            .is_err()
        {
            self.frames.free_4k(frame);
            return Err(PagingError::fatal(FatalKind::BackingStoreCorrupt(offset)));
        }

        if let Err(e) = process.paging.record_resident(page) {
            self.frames.free_4k(frame);
            process.paging.requeue_evicted(index, pending)?;
            return Err(e.into());
        }
        process.space.set(page, PtEntry::make_resident(flags, frame));
        process.swap.release(offset);
        process.paging.count_restoration();

        debug_check(process);
        Ok(frame)
    }
}
