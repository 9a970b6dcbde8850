use crate::attribute::TransactionAttribute;

/// The action the interceptor must take for one invocation, decided from the
/// declared attribute and the presence of an active transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropagationAction {
    /// Run inside the already-active transaction without owning it.
    Join,
    /// Start a new transaction and own it for the invocation.
    Begin,
    /// Suspend the active transaction, then start and own a new one.
    SuspendAndBegin,
    /// Suspend the active transaction and run non-transactionally.
    SuspendAndRun,
    /// Run non-transactionally; nothing to suspend.
    RunWithout,
    /// Fail the invocation: a transaction is required but none is active.
    RejectNoTransaction,
    /// Fail the invocation: an active transaction is forbidden.
    RejectActiveTransaction,
}

/// Resolves the declared attribute against the current context state.
///
/// Pure decision function with no side effects. Rejections are returned as
/// actions so the caller can fail before any target side effect runs.
pub fn resolve(attribute: TransactionAttribute, has_active: bool) -> PropagationAction {
    use PropagationAction::*;
    use TransactionAttribute::*;

    match (attribute, has_active) {
        (Mandatory, false) => RejectNoTransaction,
        (Mandatory, true) => Join,
        (Never, false) => RunWithout,
        (Never, true) => RejectActiveTransaction,
        (NotSupported, false) => RunWithout,
        (NotSupported, true) => SuspendAndRun,
        (Required, false) => Begin,
        (Required, true) => Join,
        (RequiresNew, false) => Begin,
        (RequiresNew, true) => SuspendAndBegin,
        (Supports, false) => RunWithout,
        (Supports, true) => Join,
    }
}
