//! The page-fault slice of the supervisor trap path.
//!
//! ```text
//!  trap ─► TrapSnapshot::capture ─► TrapCause::decode ─┬─ load/store page fault ─► Pager::handle_page_fault
//!          (interrupts off)                            └─ anything else ─► NotPageFault (caller's business)
//! ```

use crate::Pager;
use crate::backing_store::BackingStore;
use crate::fault::{FaultKind, FaultVerdict, PageFault};
use crate::process::Process;
use bitfield_struct::bitfield;
use kernel_memory_addresses::VirtualAddress;
use kernel_sync::{InterruptControl, IrqGuard};
use kernel_vmem::{FrameAlloc, PhysMapper};
use log::trace;

/// Exception code of a load page fault.
pub const LOAD_PAGE_FAULT: u64 = 13;
/// Exception code of a store/AMO page fault.
pub const STORE_PAGE_FAULT: u64 = 15;

/// Supervisor cause register layout.
///
/// Reference: RISC-V Privileged ISA, "Supervisor Cause Register (scause)".
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct Scause {
    /// Exception or interrupt code.
    #[bits(63)]
    pub code: u64, // bits 0..=62

    /// 1 = asynchronous interrupt, 0 = synchronous exception.
    pub interrupt: bool, // bit 63
}

/// Read access to the trap CSRs of the current hart.
pub trait TrapRegisters {
    fn scause(&self) -> u64;
    /// Faulting pc.
    fn sepc(&self) -> u64;
    /// Faulting address for memory faults.
    fn stval(&self) -> u64;
}

/// Trap CSRs copied out in one interrupt-free window.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TrapSnapshot {
    pub scause: Scause,
    pub sepc: u64,
    pub stval: u64,
}

impl TrapSnapshot {
    /// Copy the trap CSRs with interrupts disabled, so a nested trap cannot
    /// overwrite them halfway through.
    pub fn capture<R, C>(regs: &R, irq: &C) -> Self
    where
        R: TrapRegisters + ?Sized,
        C: InterruptControl + ?Sized,
    {
        let _window = IrqGuard::new(irq);
        Self {
            scause: Scause::from_bits(regs.scause()),
            sepc: regs.sepc(),
            stval: regs.stval(),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TrapCause {
    LoadPageFault,
    StorePageFault,
    /// Any other synchronous exception.
    Exception(u64),
    Interrupt(u64),
}

impl TrapCause {
    #[must_use]
    pub const fn decode(scause: Scause) -> Self {
        if scause.interrupt() {
            return Self::Interrupt(scause.code());
        }
        match scause.code() {
            LOAD_PAGE_FAULT => Self::LoadPageFault,
            STORE_PAGE_FAULT => Self::StorePageFault,
            code => Self::Exception(code),
        }
    }

    /// The fault kind, if this is a page fault the pager resolves.
    #[must_use]
    pub const fn fault_kind(self) -> Option<FaultKind> {
        match self {
            Self::LoadPageFault => Some(FaultKind::Load),
            Self::StorePageFault => Some(FaultKind::Store),
            Self::Exception(_) | Self::Interrupt(_) => None,
        }
    }

    #[must_use]
    pub const fn explain(self) -> &'static str {
        match self {
            Self::LoadPageFault => "Load from a page that is not resident",
            Self::StorePageFault => "Store to a page that is not resident",
            Self::Exception(_) => "Exception not handled by the pager",
            Self::Interrupt(_) => "Asynchronous interrupt",
        }
    }
}

/// What the trap path did with a trap.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TrapOutcome {
    /// Fault resolved; the trap frame's pc was set to `pc`.
    Resumed { pc: VirtualAddress },
    /// The process was marked killed.
    Terminated { exit_code: i32 },
    /// Not a page fault; left for other handlers.
    NotPageFault(TrapCause),
}

impl<M: PhysMapper, A: FrameAlloc> Pager<'_, M, A> {
    /// Route a user trap to the fault resolver and apply its verdict.
    ///
    /// On `Resume` the trap frame's pc is the faulting instruction itself, so
    /// the access is retried rather than skipped.
    ///
    /// # Panics
    /// Halts the kernel on a fatal paging condition.
    pub fn dispatch_user_trap<S: BackingStore>(
        &self,
        process: &mut Process<S>,
        trap: TrapSnapshot,
    ) -> TrapOutcome {
        let cause = TrapCause::decode(trap.scause);
        let Some(kind) = cause.fault_kind() else {
            return TrapOutcome::NotPageFault(cause);
        };
        trace!(
            "pid {}: {} at {:#x} (pc {:#x})",
            process.pid(),
            cause.explain(),
            trap.stval,
            trap.sepc
        );

        process.trapframe.epc = trap.sepc;
        let fault = PageFault {
            addr: VirtualAddress::new(trap.stval),
            pc: VirtualAddress::new(trap.sepc),
            kind,
        };
        match self.handle_page_fault(process, fault) {
            Ok(FaultVerdict::Resume { pc }) => {
                process.trapframe.epc = pc.as_u64();
                TrapOutcome::Resumed { pc }
            }
            Ok(FaultVerdict::Terminate { exit_code }) => {
                process.kill(exit_code);
                TrapOutcome::Terminated { exit_code }
            }
            Err(fatal) => fatal.halt(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel_sync::SoftInterrupts;

    struct Csrs {
        scause: u64,
        sepc: u64,
        stval: u64,
    }

    impl TrapRegisters for Csrs {
        fn scause(&self) -> u64 {
            self.scause
        }
        fn sepc(&self) -> u64 {
            self.sepc
        }
        fn stval(&self) -> u64 {
            self.stval
        }
    }

    #[test]
    fn page_fault_codes_decode() {
        assert_eq!(
            TrapCause::decode(Scause::from_bits(13)),
            TrapCause::LoadPageFault
        );
        assert_eq!(
            TrapCause::decode(Scause::from_bits(15)),
            TrapCause::StorePageFault
        );
        assert_eq!(
            TrapCause::decode(Scause::from_bits(8)),
            TrapCause::Exception(8)
        );
        assert_eq!(TrapCause::decode(Scause::from_bits(12)).fault_kind(), None);
    }

    #[test]
    fn interrupt_bit_wins() {
        let s = Scause::new().with_interrupt(true).with_code(13);
        assert_eq!(TrapCause::decode(s), TrapCause::Interrupt(13));
        assert_eq!(s.into_bits(), (1 << 63) | 13);
    }

    #[test]
    fn capture_runs_with_interrupts_off() {
        let irq = SoftInterrupts::new(true);
        let regs = Csrs {
            scause: 15,
            sepc: 0x1c4,
            stval: 0x3008,
        };
        let snap = TrapSnapshot::capture(&regs, &irq);
        assert_eq!(irq.disable_count(), 1);
        assert!(irq.enabled());
        assert_eq!(snap.sepc, 0x1c4);
        assert_eq!(snap.stval, 0x3008);
        assert_eq!(snap.scause.code(), STORE_PAGE_FAULT);
    }

    #[test]
    fn capture_leaves_disabled_interrupts_disabled() {
        let irq = SoftInterrupts::new(false);
        let regs = Csrs {
            scause: 13,
            sepc: 0,
            stval: 0,
        };
        let _ = TrapSnapshot::capture(&regs, &irq);
        assert!(!irq.enabled());
        assert_eq!(irq.disable_count(), 0);
    }
}
