//! # Demand Paging
//!
//! Lets a process use more virtual pages than it has physical frames by
//! moving its oldest resident pages out to a backing store and bringing them
//! back on the next access.
//!
//! ## Pieces
//! - [`PagingState`]: per-process FIFOs of resident and evicted pages.
//! - [`Pager::evict_one`]: the eviction engine.
//! - [`Pager::handle_page_fault`]: the fault resolver.
//! - [`Pager::dispatch_user_trap`]: the trap-path entry point.
//! - [`BackingStore`]: where evicted contents live ([`MemoryBackingStore`]
//!   keeps them on the heap).
//!
//! ## Lifecycle of a page
//!
//! ```text
//!  map_user_page        evict_one                 fault on access
//! ──────────────► R ─────────────────► E(offset) ─────────────────► R
//!                 │  write to store,    │  read from store into a
//!                 │  free frame,        │  new frame, release slot,
//!                 │  enqueue            │  dequeue
//!                 ▼                     ▼
//!          unmap_user_page / teardown: frame or slot released
//! ```
//!
//! ## Concurrency
//! A process's page table and paging state are only touched by the hart
//! running that process, under exclusive `&mut` access. The frame pool and
//! each backing store serialize internally.
//!
//! ## Errors
//! Resource exhaustion surfaces as [`SwapError`] and at worst kills the
//! faulting process. Bookkeeping corruption surfaces as [`Fatal`], which
//! halts the kernel.

#![cfg_attr(not(any(test, doctest)), no_std)]

extern crate alloc;

pub mod backing_store;
mod config;
mod error;
mod evict;
mod fault;
mod fifo;
mod pager;
pub mod paging_state;
mod process;
pub mod trap;

pub use backing_store::{BackingStore, BackingStoreError, MemoryBackingStore};
pub use config::{ConfigError, PagingConfig};
pub use error::{Fatal, FatalKind, PagingError, SwapError};
pub use evict::Eviction;
pub use fault::{FaultKind, FaultVerdict, PageFault};
pub use fifo::FifoRing;
pub use pager::Pager;
pub use paging_state::{EvictedPage, PagingState, PagingStats};
pub use process::{EXIT_KILLED, Pid, ProcState, Process, TrapFrame};
pub use trap::{Scause, TrapCause, TrapOutcome, TrapRegisters, TrapSnapshot};
