use crate::PagingConfig;
use crate::backing_store::BackingStore;
use crate::paging_state::PagingState;
use kernel_vmem::AddressSpace;

pub type Pid = u32;

/// Exit status of a process killed by an unresolvable fault.
pub const EXIT_KILLED: i32 = -1;

/// Saved user-mode registers the paging code touches.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct TrapFrame {
    /// User program counter to return to.
    pub epc: u64,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ProcState {
    Running,
    /// Marked for termination; the scheduler reaps it on its next pass.
    Killed { exit_code: i32 },
}

/// The slice of a process the paging subsystem owns.
///
/// Page table, paging state and backing store are owned by the process and
/// only touched through `&mut Process`.
#[derive(Debug)]
pub struct Process<S> {
    pid: Pid,
    pub(crate) space: AddressSpace,
    pub(crate) paging: PagingState,
    pub(crate) swap: S,
    pub trapframe: TrapFrame,
    state: ProcState,
}

impl<S: BackingStore> Process<S> {
    /// A fresh process with an empty address space.
    #[must_use]
    pub fn new(pid: Pid, swap: S, config: PagingConfig) -> Self {
        Self {
            pid,
            space: AddressSpace::new(),
            paging: PagingState::new(config),
            swap,
            trapframe: TrapFrame::default(),
            state: ProcState::Running,
        }
    }
}

impl<S> Process<S> {
    #[must_use]
    pub const fn pid(&self) -> Pid {
        self.pid
    }

    #[must_use]
    pub const fn space(&self) -> &AddressSpace {
        &self.space
    }

    #[must_use]
    pub const fn paging(&self) -> &PagingState {
        &self.paging
    }

    #[must_use]
    pub const fn swap(&self) -> &S {
        &self.swap
    }

    #[must_use]
    pub const fn state(&self) -> ProcState {
        self.state
    }

    #[must_use]
    pub const fn is_killed(&self) -> bool {
        matches!(self.state, ProcState::Killed { .. })
    }

    /// Mark the process for termination. The first exit code wins.
    pub const fn kill(&mut self, exit_code: i32) {
        if let ProcState::Running = self.state {
            self.state = ProcState::Killed { exit_code };
        }
    }
}
