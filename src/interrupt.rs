use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};

/// Shared Ctrl-C state.
///
/// Normally an interrupt ends the program. While a foreground tunnel runs,
/// a [`ForwardGuard`] is held and interrupts are only recorded, so the
/// waiter can relay them to the child.
#[derive(Clone, Default)]
pub struct Interrupts {
    inner: Arc<State>,
}

#[derive(Default)]
struct State {
    forwarding: AtomicBool,
    pending: AtomicBool,
}

impl Interrupts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the process-wide SIGINT handler. Call once at startup.
    pub fn install(&self, on_exit: fn()) -> Result<()> {
        let this = self.clone();
        ctrlc::set_handler(move || {
            if !this.raise() {
                on_exit();
                std::process::exit(0);
            }
        })
        .context("failed to install interrupt handler")
    }

    /// Record an interrupt. Returns false when nobody is forwarding.
    pub fn raise(&self) -> bool {
        if self.is_forwarding() {
            self.inner.pending.store(true, Ordering::SeqCst);
            true
        } else {
            false
        }
    }

    /// Consume a pending interrupt.
    pub fn take_pending(&self) -> bool {
        self.inner.pending.swap(false, Ordering::SeqCst)
    }

    pub fn is_forwarding(&self) -> bool {
        self.inner.forwarding.load(Ordering::SeqCst)
    }

    /// Start capturing interrupts until the guard is dropped.
    pub fn forward(&self) -> ForwardGuard {
        self.inner.pending.store(false, Ordering::SeqCst);
        self.inner.forwarding.store(true, Ordering::SeqCst);
        ForwardGuard {
            interrupts: self.clone(),
        }
    }
}

/// Restores exit-on-interrupt when dropped, on every return path.
pub struct ForwardGuard {
    interrupts: Interrupts,
}

impl Drop for ForwardGuard {
    fn drop(&mut self) {
        self.interrupts.inner.forwarding.store(false, Ordering::SeqCst);
        self.interrupts.inner.pending.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raise_without_guard_is_unhandled() {
        let ints = Interrupts::new();
        assert!(!ints.raise());
        assert!(!ints.take_pending());
    }

    #[test]
    fn guard_captures_then_restores() {
        let ints = Interrupts::new();
        {
            let _guard = ints.forward();
            assert!(ints.is_forwarding());
            assert!(ints.raise());
            assert!(ints.take_pending());
            assert!(!ints.take_pending());
            assert!(ints.raise());
        }
        assert!(!ints.is_forwarding());
        assert!(!ints.take_pending());
        assert!(!ints.raise());
    }
}
