//! Continuation Stack
//!
//! A single slot holding the callback that consumes the next input line.
//! Multi-step commands (entropy, passwords, mnemonic words, confirmations)
//! suspend by installing a callback; the callback may install the next
//! step, so the depth of a dialogue is unbounded while at most one step is
//! ever pending.

use tracing::{debug, warn};

/// Callback receiving the next input line
pub type Continuation<C> = Box<dyn FnOnce(&mut C, &str)>;

pub struct ContinuationSlot<C> {
    slot: Option<Continuation<C>>,
}

impl<C> Default for ContinuationSlot<C> {
    fn default() -> Self {
        Self { slot: None }
    }
}

impl<C> ContinuationSlot<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the callback for the next line
    pub fn suspend(&mut self, next: impl FnOnce(&mut C, &str) + 'static) {
        if self.slot.is_some() {
            warn!("replacing a pending continuation");
        }
        self.slot = Some(Box::new(next));
    }

    pub fn is_pending(&self) -> bool {
        self.slot.is_some()
    }

    /// Drop the pending callback without running it
    pub fn clear(&mut self) -> bool {
        self.slot.take().is_some()
    }

    fn take(&mut self) -> Option<Continuation<C>> {
        self.slot.take()
    }
}

/// Contexts that own a continuation slot
pub trait Suspendable: Sized {
    fn continuation(&mut self) -> &mut ContinuationSlot<Self>;
}

/// Hand `line` to the pending continuation, if any.
///
/// The slot is emptied before the callback runs. Returns `false` when no
/// continuation was pending and the line should be dispatched as a command.
pub fn feed<C: Suspendable>(ctx: &mut C, line: &str) -> bool {
    match ctx.continuation().take() {
        Some(next) => {
            debug!("resuming suspended command");
            next(ctx, line);
            true
        }
        None => false,
    }
}
