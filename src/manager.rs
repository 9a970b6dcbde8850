use crate::errors::Result;

/// Unique transaction identifier assigned by the transaction manager.
pub type TxnId = u64;

/// Opaque handle for an in-flight transaction.
///
/// The transaction itself is owned by the [`TransactionManager`] that created
/// it; the engine and the context holder only ever hold copies of the handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxnHandle {
    id: TxnId,
}

impl TxnHandle {
    /// Creates a handle for the given manager-assigned id.
    pub fn new(id: TxnId) -> Self {
        Self { id }
    }

    /// Returns the manager-assigned transaction id.
    pub fn id(&self) -> TxnId {
        self.id
    }
}

/// Current status of a transaction as reported by its manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnStatus {
    /// The transaction is in flight and may still commit.
    Active,
    /// A participant vetoed the commit; the transaction can only roll back.
    MarkedRollbackOnly,
    /// The transaction has committed.
    Committed,
    /// The transaction has rolled back.
    RolledBack,
}

/// Trait for the transaction manager the engine delegates to.
///
/// Implementations own transaction durability: begin/commit/rollback ordering
/// against the underlying resource managers, any prepare/commit logging, and
/// recovery. The engine never looks inside a transaction; it only drives the
/// lifecycle operations below and binds handles to threads via the context
/// holder.
///
/// `suspend` and `resume` detach and reattach resource enlistment for the
/// given transaction without finishing it. The engine passes the handle
/// explicitly; implementations must not keep their own per-thread notion of
/// a current transaction.
///
/// `commit` and `rollback` on an already-finished transaction must fail with
/// [`MaatError::AlreadyFinished`](crate::MaatError::AlreadyFinished) rather
/// than silently succeed.
///
/// Implementations must be `Send` and `Sync`; the engine is driven from many
/// independent threads.
pub trait TransactionManager: Send + Sync {
    /// Starts a new transaction and returns its handle.
    ///
    /// # Errors
    ///
    /// Returns [`MaatError::ManagerUnavailable`](crate::MaatError::ManagerUnavailable)
    /// if no manager is reachable.
    fn begin(&self) -> Result<TxnHandle>;

    /// Commits the given transaction.
    fn commit(&self, txn: &TxnHandle) -> Result<()>;

    /// Rolls back the given transaction.
    fn rollback(&self, txn: &TxnHandle) -> Result<()>;

    /// Detaches the given transaction's resource enlistment without
    /// finishing it.
    fn suspend(&self, txn: &TxnHandle) -> Result<()>;

    /// Reattaches a previously suspended transaction.
    fn resume(&self, txn: &TxnHandle) -> Result<()>;

    /// Reports the transaction's current status.
    fn status(&self, txn: &TxnHandle) -> Result<TxnStatus>;

    /// Records a rollback-only veto on the given transaction.
    ///
    /// The mark is strictly additive: it can force an eventual rollback but
    /// never force a commit.
    fn set_rollback_only(&self, txn: &TxnHandle) -> Result<()>;
}
