//! Thread-bound transaction context holder.
//!
//! Each thread carries its own stack of context frames. A frame is pushed by
//! every managed invocation that personally started or suspended a
//! transaction, and records what that invocation must restore on exit.
//! Invocations that merely join the active transaction (or run without one
//! and had nothing to suspend) push no frame. The top frame's installed
//! handle is the thread's current transaction; resource-access code observes
//! it through [`current`].

use std::cell::RefCell;
use std::sync::Arc;

use log::warn;

use crate::manager::{TransactionManager, TxnHandle};

/// One entry of the per-thread context stack: what an invocation installed
/// and what it has to restore. Read-only after creation.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Frame {
    /// Transaction the invocation runs under; `None` is the explicit
    /// "running without a transaction" marker.
    pub(crate) active: Option<TxnHandle>,
    /// Transaction suspended on entry, to be resumed on exit.
    pub(crate) suspended: Option<TxnHandle>,
}

thread_local! {
    static STACK: RefCell<Vec<Frame>> = const { RefCell::new(Vec::new()) };
}

/// Returns the transaction bound to the current thread, or `None` when the
/// thread is running non-transactionally.
pub fn current() -> Option<TxnHandle> {
    STACK.with(|stack| stack.borrow().last().and_then(|frame| frame.active))
}

/// Current nesting depth of context-owning invocations on this thread.
pub fn depth() -> usize {
    STACK.with(|stack| stack.borrow().len())
}

pub(crate) fn push(frame: Frame) {
    STACK.with(|stack| stack.borrow_mut().push(frame));
}

pub(crate) fn pop() -> Option<Frame> {
    STACK.with(|stack| stack.borrow_mut().pop())
}

/// Scope guard for one context-owning invocation.
///
/// Pushes a frame on entry and, on drop, pops it and resumes any transaction
/// the invocation suspended. Dropping runs on every exit path, including
/// unwinding out of the target operation, so context restoration is
/// guaranteed. A resume failure on the restore path is logged rather than
/// surfaced; it must never mask an in-flight failure.
pub(crate) struct ContextScope {
    manager: Arc<dyn TransactionManager>,
}

impl ContextScope {
    pub(crate) fn enter(
        manager: Arc<dyn TransactionManager>,
        active: Option<TxnHandle>,
        suspended: Option<TxnHandle>,
    ) -> Self {
        push(Frame { active, suspended });
        Self { manager }
    }
}

impl Drop for ContextScope {
    fn drop(&mut self) {
        if let Some(frame) = pop() {
            if let Some(prev) = frame.suspended {
                if let Err(e) = self.manager.resume(&prev) {
                    warn!("failed to resume suspended transaction {}: {}", prev.id(), e);
                }
            }
        }
    }
}
