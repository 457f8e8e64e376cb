//! # Kernel synchronization primitives
//!
//! - [`SpinLock`]: a named test-and-test-and-set lock guarding shared paging
//!   resources (the free-frame pool and backing-store slot tables).
//! - [`IrqGuard`]: RAII interrupt window over an [`InterruptControl`]
//!   implementation, used while in-flight trap state is copied out.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod irq;
mod spin_lock;

pub use irq::{InterruptControl, IrqGuard, SoftInterrupts};
pub use spin_lock::{SpinLock, SpinLockGuard};
