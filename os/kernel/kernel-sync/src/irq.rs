//! Interrupt windows.
//!
//! The trap path has to copy the saved program counter and the cause/value
//! registers out before anything can raise a nested trap and overwrite them.
//! [`IrqGuard`] disables interrupts for exactly that window and restores the
//! previous state on drop.
//!
//! The actual enable/disable is behind [`InterruptControl`] so the same code
//! runs on a hart (where it toggles `sstatus.SIE`) and in host tests (where
//! [`SoftInterrupts`] simply records the state).

use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Per-hart interrupt enable control.
pub trait InterruptControl {
    /// Whether interrupts are currently enabled on this hart.
    fn enabled(&self) -> bool;

    /// Disable interrupts on this hart.
    fn disable(&self);

    /// Enable interrupts on this hart.
    fn enable(&self);
}

/// RAII guard that disables interrupts on creation and restores them on drop.
///
/// Interrupts are re-enabled **only** if they were enabled when the guard was
/// created, so guards nest.
///
/// ```
/// use kernel_sync::{InterruptControl, IrqGuard, SoftInterrupts};
///
/// let irq = SoftInterrupts::new(true);
/// {
///     let _g = IrqGuard::new(&irq);
///     assert!(!irq.enabled());
/// }
/// assert!(irq.enabled());
/// ```
pub struct IrqGuard<'a, C: InterruptControl + ?Sized> {
    control: &'a C,
    were_enabled: bool,
}

impl<'a, C: InterruptControl + ?Sized> IrqGuard<'a, C> {
    #[inline]
    #[must_use]
    pub fn new(control: &'a C) -> Self {
        let were_enabled = control.enabled();
        if were_enabled {
            control.disable();
        }
        Self {
            control,
            were_enabled,
        }
    }
}

impl<C: InterruptControl + ?Sized> Drop for IrqGuard<'_, C> {
    fn drop(&mut self) {
        if self.were_enabled {
            self.control.enable();
        }
    }
}

/// Software interrupt state for hosted builds and tests.
///
/// Counts how often interrupts were disabled so tests can assert on the
/// size of the critical window.
#[derive(Debug, Default)]
pub struct SoftInterrupts {
    enabled: AtomicBool,
    disables: AtomicUsize,
}

impl SoftInterrupts {
    #[must_use]
    pub const fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
            disables: AtomicUsize::new(0),
        }
    }

    /// Number of enabled-to-disabled transitions observed so far.
    pub fn disable_count(&self) -> usize {
        self.disables.load(Ordering::Relaxed)
    }
}

impl InterruptControl for SoftInterrupts {
    fn enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    fn disable(&self) {
        if self.enabled.swap(false, Ordering::AcqRel) {
            self.disables.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn enable(&self) {
        self.enabled.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_restores_enabled_state() {
        let irq = SoftInterrupts::new(true);
        {
            let _g = IrqGuard::new(&irq);
            assert!(!irq.enabled());
        }
        assert!(irq.enabled());
        assert_eq!(irq.disable_count(), 1);
    }

    #[test]
    fn guard_keeps_disabled_state() {
        let irq = SoftInterrupts::new(false);
        {
            let _g = IrqGuard::new(&irq);
            assert!(!irq.enabled());
        }
        assert!(!irq.enabled());
        assert_eq!(irq.disable_count(), 0);
    }

    #[test]
    fn nested_guards_restore_once() {
        let irq = SoftInterrupts::new(true);
        {
            let _outer = IrqGuard::new(&irq);
            {
                let _inner = IrqGuard::new(&irq);
            }
            assert!(!irq.enabled(), "inner guard must not re-enable");
        }
        assert!(irq.enabled());
    }
}
