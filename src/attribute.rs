use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Defines the transaction propagation policies supported by the Maat engine.
///
/// A propagation attribute is attached to each managed operation and declares
/// how an invocation of that operation relates to the transaction (if any)
/// already bound to the calling thread. The attribute is resolved against the
/// current context on every entry; it never changes for the lifetime of the
/// operation's configuration.
pub enum TransactionAttribute {
    /// **Mandatory:**
    ///
    /// The operation must run inside an already-active transaction. With an
    /// active transaction present the invocation joins it; without one the
    /// invocation is rejected before the operation body runs. Use this for
    /// operations that only make sense as part of a larger unit of work, such
    /// as a delegated step of a client-demarcated transaction.
    Mandatory,
    /// **Never:**
    ///
    /// The operation must run outside any transaction. With no active
    /// transaction the operation simply runs; with one present the invocation
    /// is rejected before the operation body runs.
    Never,
    /// **NotSupported:**
    ///
    /// The operation runs outside any transaction. An active transaction is
    /// suspended for the duration of the invocation and resumed afterwards;
    /// work performed by the operation is not enlisted in it.
    NotSupported,
    /// **Required:**
    ///
    /// The default policy of most managed-component systems. An active
    /// transaction is joined; with none present a new transaction is started
    /// for the duration of the invocation and committed or rolled back when
    /// it returns.
    Required,
    /// **RequiresNew:**
    ///
    /// The operation always runs in its own transaction. An active
    /// transaction is suspended, a new one is started, and the suspended one
    /// is resumed after the new transaction finishes. The outer transaction's
    /// fate is unaffected by the inner one.
    RequiresNew,
    /// **Supports:**
    ///
    /// The operation is indifferent to transactions. An active transaction is
    /// joined; with none present the operation runs non-transactionally. The
    /// invocation never starts, commits, or rolls back a transaction itself.
    Supports,
}
