pub mod attribute;
pub mod classify;
pub mod context;
pub mod errors;
pub mod maat;
pub mod manager;
pub mod propagation;

// Re-export key types and structs for easier access
pub use attribute::TransactionAttribute;
pub use classify::{DefaultClassifier, ExceptionClassifier, FailureClass};
pub use errors::{MaatError, Result};
pub use maat::prelude;
pub use maat::Maat;
pub use manager::{TransactionManager, TxnHandle, TxnId, TxnStatus};
pub use propagation::{resolve, PropagationAction};

// Define the InvocationOutcome enum here as it's a core part of the public API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
///
/// How the engine disposed of the transaction for one managed invocation
pub enum InvocationOutcome {
    ///
    /// [InvocationOutcome::Committed] means this invocation owned the active
    /// transaction and committed it. Also reported when an
    /// Application-classified failure is re-surfaced to the caller while the
    /// owned transaction commits underneath it.
    Committed,
    ///
    /// [InvocationOutcome::RolledBack] means this invocation owned the active
    /// transaction and rolled it back, either because a System-classified
    /// failure was raised or because the transaction was marked
    /// rollback-only by the time the invocation finished.
    RolledBack,
    ///
    /// [InvocationOutcome::MarkedRollbackOnly] means this invocation joined a
    /// transaction owned by an enclosing scope and vetoed its eventual
    /// commit. The transaction itself is still in flight; only its owner
    /// finishes it.
    MarkedRollbackOnly,
    ///
    /// [InvocationOutcome::Propagated] means this invocation finished no
    /// transaction: it ran without one, joined one it did not own and left
    /// it untouched, or was rejected before the operation body ran.
    Propagated,
}
