//! # Kernel Paging Configuration
//!
//! Compile-time constants shared by every crate that touches user pages:
//! the frame pool, the page-table codec and the swap subsystem.
//!
//! ## Paging Model
//!
//! ```text
//!   user page ──► resident (backed by a 4 KiB frame)
//!        ▲                 │ evict (FIFO, per process)
//!        │ restore         ▼
//!        └──────── evicted (backed by one backing-store slot)
//! ```
//!
//! * A process may hold at most [`MAX_RESIDENT_PAGES`](memory::MAX_RESIDENT_PAGES)
//!   resident pages before mapping another page forces an eviction.
//! * A process may have at most [`MAX_TOTAL_PAGES`](memory::MAX_TOTAL_PAGES)
//!   pages evicted at any time; this is the capacity of its eviction queue.
//! * Every backing-store slot is exactly [`PAGE_SIZE`](memory::PAGE_SIZE) bytes.
//!
//! ## Compile-Time Validation
//!
//! The [`memory`] module asserts the relationships between these constants
//! in a `const` block, so an inconsistent configuration fails the build.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

pub mod memory;
