use std::sync::Arc;

use log::{debug, warn};

use crate::attribute::TransactionAttribute;
use crate::classify::{DefaultClassifier, ExceptionClassifier, FailureClass};
use crate::context::{self, ContextScope, Frame};
use crate::errors::{MaatError, Result};
use crate::manager::{TransactionManager, TxnHandle, TxnStatus};
use crate::propagation::{self, PropagationAction};
use crate::InvocationOutcome;

/// Maat Prelude
pub mod prelude {
    pub use crate::attribute::*;
    pub use crate::classify::*;
    pub use crate::errors::*;
    pub use crate::manager::*;
    pub use crate::propagation::*;
    pub use crate::*;
}

/// The main entry point for the Maat transaction propagation engine.
///
/// A `Maat` instance wraps one [`TransactionManager`] and decorates managed
/// operations with declarative propagation semantics: [`execute`](Self::execute)
/// runs a closure under the policy declared by its [`TransactionAttribute`],
/// joining, suspending, starting, or rejecting as the policy requires, and
/// commits or rolls back any transaction the invocation started.
///
/// The instance is cheap to clone and safe to share across threads; all
/// transaction context is bound to the calling thread.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use ::maat::prelude::*;
///
/// # use ahash::AHashMap as HashMap;
/// # use parking_lot::Mutex;
/// # use std::sync::atomic::{AtomicU64, Ordering};
/// # #[derive(Default)]
/// # pub struct MockManager {
/// #     next_id: AtomicU64,
/// #     status: Mutex<HashMap<TxnId, TxnStatus>>,
/// # }
/// #
/// # impl TransactionManager for MockManager {
/// #     fn begin(&self) -> Result<TxnHandle> {
/// #         let id = self.next_id.fetch_add(1, Ordering::SeqCst);
/// #         self.status.lock().insert(id, TxnStatus::Active);
/// #         Ok(TxnHandle::new(id))
/// #     }
/// #     fn commit(&self, txn: &TxnHandle) -> Result<()> {
/// #         self.status.lock().insert(txn.id(), TxnStatus::Committed);
/// #         Ok(())
/// #     }
/// #     fn rollback(&self, txn: &TxnHandle) -> Result<()> {
/// #         self.status.lock().insert(txn.id(), TxnStatus::RolledBack);
/// #         Ok(())
/// #     }
/// #     fn suspend(&self, _txn: &TxnHandle) -> Result<()> {
/// #         Ok(())
/// #     }
/// #     fn resume(&self, _txn: &TxnHandle) -> Result<()> {
/// #         Ok(())
/// #     }
/// #     fn status(&self, txn: &TxnHandle) -> Result<TxnStatus> {
/// #         Ok(self
/// #             .status
/// #             .lock()
/// #             .get(&txn.id())
/// #             .copied()
/// #             .unwrap_or(TxnStatus::Active))
/// #     }
/// #     fn set_rollback_only(&self, txn: &TxnHandle) -> Result<()> {
/// #         self.status.lock().insert(txn.id(), TxnStatus::MarkedRollbackOnly);
/// #         Ok(())
/// #     }
/// # }
/// #
/// let manager = Arc::new(MockManager::default());
/// let maat = Maat::new(manager);
///
/// // Runs inside a transaction started and committed by the engine.
/// let result = maat.execute(TransactionAttribute::Required, || {
///     // Resource access observes the transaction via maat::context::current().
///     Ok(())
/// });
/// assert!(result.is_ok());
/// ```
#[derive(Clone)]
pub struct Maat {
    /// The transaction manager that owns begin/commit/rollback durability.
    manager: Arc<dyn TransactionManager>,
    /// Policy deciding whether a failure commits or rolls back an owned
    /// transaction.
    classifier: Arc<dyn ExceptionClassifier>,
}

impl Maat {
    /// Creates an engine over the given transaction manager with the default
    /// failure classification policy.
    pub fn new(manager: Arc<dyn TransactionManager>) -> Self {
        Self::with_classifier(manager, Arc::new(DefaultClassifier))
    }

    /// Creates an engine with a caller-supplied failure classifier.
    pub fn with_classifier(
        manager: Arc<dyn TransactionManager>,
        classifier: Arc<dyn ExceptionClassifier>,
    ) -> Self {
        Self {
            manager,
            classifier,
        }
    }

    /// Returns the transaction bound to the calling thread, if any.
    pub fn current(&self) -> Option<TxnHandle> {
        context::current()
    }

    /// Reports the status of the given transaction.
    pub fn status(&self, txn: TxnHandle) -> Result<TxnStatus> {
        self.manager.status(&txn)
    }

    /// Vetoes the eventual commit of the calling thread's transaction.
    ///
    /// Any participant may call this; the mark is strictly additive and
    /// forces the owner to roll back at completion.
    ///
    /// # Errors
    ///
    /// Returns [`MaatError::NoTransaction`] when the thread has no bound
    /// transaction.
    pub fn set_rollback_only(&self) -> Result<()> {
        let txn = context::current().ok_or(MaatError::NoTransaction)?;
        self.manager.set_rollback_only(&txn)
    }

    /// Starts a client-demarcated transaction and binds it to the calling
    /// thread.
    ///
    /// This is the boundary a non-managed caller uses around invocations of
    /// managed operations; the operations then join (or suspend, or reject
    /// against) this transaction according to their attributes.
    ///
    /// # Errors
    ///
    /// Returns [`MaatError::IllegalTransactionState`] if the thread already
    /// has a bound transaction; client transactions do not nest.
    pub fn begin(&self) -> Result<TxnHandle> {
        if context::current().is_some() {
            return Err(MaatError::IllegalTransactionState);
        }
        let txn = self.manager.begin()?;
        debug!("client transaction {} begun", txn.id());
        context::push(Frame {
            active: Some(txn),
            suspended: None,
        });
        Ok(txn)
    }

    /// Commits a client-demarcated transaction and unbinds it.
    ///
    /// If a participant marked the transaction rollback-only, it is rolled
    /// back instead and [`MaatError::RollbackOnly`] is returned.
    pub fn commit(&self, txn: TxnHandle) -> Result<()> {
        self.unbind(txn)?;
        if matches!(self.manager.status(&txn)?, TxnStatus::MarkedRollbackOnly) {
            debug!("client transaction {} vetoed, rolling back", txn.id());
            self.manager.rollback(&txn)?;
            return Err(MaatError::RollbackOnly);
        }
        debug!("client transaction {} committing", txn.id());
        self.manager.commit(&txn)
    }

    /// Rolls back a client-demarcated transaction and unbinds it.
    pub fn rollback(&self, txn: TxnHandle) -> Result<()> {
        self.unbind(txn)?;
        debug!("client transaction {} rolling back", txn.id());
        self.manager.rollback(&txn)
    }

    /// Pops the thread's top context frame, which must hold exactly the
    /// transaction being finished. Finishing out of nesting order is a
    /// programming-contract violation, not a recoverable state.
    fn unbind(&self, txn: TxnHandle) -> Result<()> {
        if context::current() != Some(txn) {
            return Err(MaatError::IllegalTransactionState);
        }
        context::pop();
        Ok(())
    }

    /// Runs one managed invocation under the given propagation attribute.
    ///
    /// The closure's failure, if any, is always re-surfaced unchanged; the
    /// engine's commit/rollback decision never replaces it. Rejections
    /// ([`MaatError::NoTransaction`], [`MaatError::IllegalTransactionState`])
    /// surface before the closure runs.
    pub fn execute<R, F>(&self, attribute: TransactionAttribute, f: F) -> Result<R>
    where
        F: FnOnce() -> Result<R>,
    {
        self.execute_with_outcome(attribute, f).0
    }

    /// Runs one managed invocation and additionally reports how the engine
    /// disposed of the transaction.
    ///
    /// The outcome is needed where the result alone is ambiguous: an
    /// `Application`-classified failure re-surfaces as an error although the
    /// owned transaction committed, and an owner that was marked
    /// rollback-only returns its value although the transaction rolled back.
    pub fn execute_with_outcome<R, F>(
        &self,
        attribute: TransactionAttribute,
        f: F,
    ) -> (Result<R>, InvocationOutcome)
    where
        F: FnOnce() -> Result<R>,
    {
        let current = context::current();
        let action = propagation::resolve(attribute, current.is_some());
        debug!(
            "attribute {:?} with active={} resolved to {:?}",
            attribute,
            current.is_some(),
            action
        );

        match (action, current) {
            (PropagationAction::RejectNoTransaction, _) => {
                (Err(MaatError::NoTransaction), InvocationOutcome::Propagated)
            }
            (PropagationAction::RejectActiveTransaction, _) => (
                Err(MaatError::IllegalTransactionState),
                InvocationOutcome::Propagated,
            ),
            (PropagationAction::Join, Some(txn)) => self.run_joined(txn, f),
            (PropagationAction::RunWithout, _) => (f(), InvocationOutcome::Propagated),
            (PropagationAction::SuspendAndRun, Some(prev)) => {
                if let Err(e) = self.manager.suspend(&prev) {
                    return (Err(e), InvocationOutcome::Propagated);
                }
                debug!("transaction {} suspended", prev.id());
                let _scope = ContextScope::enter(Arc::clone(&self.manager), None, Some(prev));
                (f(), InvocationOutcome::Propagated)
            }
            (PropagationAction::Begin, _) => self.run_owned(None, f),
            (PropagationAction::SuspendAndBegin, Some(prev)) => {
                if let Err(e) = self.manager.suspend(&prev) {
                    return (Err(e), InvocationOutcome::Propagated);
                }
                debug!("transaction {} suspended", prev.id());
                self.run_owned(Some(prev), f)
            }
            // The resolver only yields Join/Suspend* when a transaction is
            // active; these arms are unreachable through resolve().
            (PropagationAction::Join, None)
            | (PropagationAction::SuspendAndRun, None)
            | (PropagationAction::SuspendAndBegin, None) => {
                (Err(MaatError::NoTransaction), InvocationOutcome::Propagated)
            }
        }
    }

    /// Runs the closure inside a transaction owned by an enclosing scope.
    ///
    /// The joined transaction is never committed or rolled back here; a
    /// System-classified failure only marks it rollback-only, vetoing the
    /// owner's eventual commit.
    fn run_joined<R, F>(&self, txn: TxnHandle, f: F) -> (Result<R>, InvocationOutcome)
    where
        F: FnOnce() -> Result<R>,
    {
        let result = f();
        if let Err(err) = &result {
            if self.classifier.classify(err) == FailureClass::System {
                debug!(
                    "system failure in joined transaction {}, marking rollback-only",
                    txn.id()
                );
                if let Err(e) = self.manager.set_rollback_only(&txn) {
                    warn!(
                        "failed to mark transaction {} rollback-only: {}",
                        txn.id(),
                        e
                    );
                }
                return (result, InvocationOutcome::MarkedRollbackOnly);
            }
        }
        (result, InvocationOutcome::Propagated)
    }

    /// Begins a transaction owned by this invocation, runs the closure under
    /// it, and finishes it according to the outcome and classification.
    fn run_owned<R, F>(
        &self,
        suspended: Option<TxnHandle>,
        f: F,
    ) -> (Result<R>, InvocationOutcome)
    where
        F: FnOnce() -> Result<R>,
    {
        let txn = match self.manager.begin() {
            Ok(txn) => txn,
            Err(e) => {
                if let Some(prev) = suspended {
                    if let Err(re) = self.manager.resume(&prev) {
                        warn!("failed to resume suspended transaction {}: {}", prev.id(), re);
                    }
                }
                return (Err(e), InvocationOutcome::Propagated);
            }
        };
        debug!("transaction {} begun for managed invocation", txn.id());

        // The scope guard pops the frame and resumes any suspended
        // transaction on every exit path, after the transaction is finished.
        let scope = ContextScope::enter(Arc::clone(&self.manager), Some(txn), suspended);
        let result = f();
        let (result, outcome) = self.finish_owned(txn, result);
        drop(scope);
        (result, outcome)
    }

    /// Finishes a transaction owned by this invocation.
    ///
    /// Normal return commits unless the transaction was marked rollback-only.
    /// On failure the classifier decides: System rolls back; Application
    /// commits unless marked. The original failure is re-surfaced unchanged;
    /// facade errors while it is in flight are logged, never substituted.
    fn finish_owned<R>(&self, txn: TxnHandle, result: Result<R>) -> (Result<R>, InvocationOutcome) {
        match result {
            Ok(value) => match self.manager.status(&txn) {
                Ok(TxnStatus::MarkedRollbackOnly) => {
                    debug!("owned transaction {} vetoed, rolling back", txn.id());
                    match self.manager.rollback(&txn) {
                        Ok(()) => (Ok(value), InvocationOutcome::RolledBack),
                        Err(e) => (Err(e), InvocationOutcome::RolledBack),
                    }
                }
                Ok(_) => {
                    debug!("owned transaction {} committing", txn.id());
                    match self.manager.commit(&txn) {
                        Ok(()) => (Ok(value), InvocationOutcome::Committed),
                        Err(e) => (Err(e), InvocationOutcome::Committed),
                    }
                }
                Err(e) => (Err(e), InvocationOutcome::Propagated),
            },
            Err(err) => {
                let class = self.classifier.classify(&err);
                let marked = matches!(
                    self.manager.status(&txn),
                    Ok(TxnStatus::MarkedRollbackOnly)
                );
                if class == FailureClass::System || marked {
                    debug!(
                        "owned transaction {} rolling back ({:?} failure, marked={})",
                        txn.id(),
                        class,
                        marked
                    );
                    if let Err(e) = self.manager.rollback(&txn) {
                        warn!("rollback of transaction {} failed: {}", txn.id(), e);
                    }
                    (Err(err), InvocationOutcome::RolledBack)
                } else {
                    debug!(
                        "owned transaction {} committing despite application failure",
                        txn.id()
                    );
                    if let Err(e) = self.manager.commit(&txn) {
                        warn!("commit of transaction {} failed: {}", txn.id(), e);
                    }
                    (Err(err), InvocationOutcome::Committed)
                }
            }
        }
    }
}
