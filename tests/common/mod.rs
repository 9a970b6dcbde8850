//! Common utilities for Maat integration tests.

use ahash::AHashMap as HashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use maat::{
    context, Maat, MaatError, Result, TransactionAttribute, TransactionManager, TxnHandle, TxnId,
    TxnStatus,
};

// --- MockTxnManager ---

/// One facade call observed by the mock manager, in invocation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerCall {
    Begin(TxnId),
    Commit(TxnId),
    Rollback(TxnId),
    Suspend(TxnId),
    Resume(TxnId),
}

struct TxnRecord {
    status: TxnStatus,
    staged: Vec<String>,
    suspended: bool,
}

impl TxnRecord {
    fn is_finished(&self) -> bool {
        matches!(self.status, TxnStatus::Committed | TxnStatus::RolledBack)
    }
}

/// A mock implementation of the `TransactionManager` trait doubling as the
/// row store the tests count against.
///
/// Rows inserted under a transaction are staged in that transaction's record
/// and applied to the shared table on commit, discarded on rollback. Rows
/// inserted with no transaction bound to the thread are applied immediately
/// (autocommit). Every facade call is recorded in order so tests can assert
/// exact begin/suspend/commit/resume sequences.
pub struct MockTxnManager {
    next_id: AtomicU64,
    txns: Mutex<HashMap<TxnId, TxnRecord>>,
    rows: Mutex<Vec<String>>,
    calls: Mutex<Vec<ManagerCall>>,
    fail_begin: AtomicBool,
}

impl Default for MockTxnManager {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTxnManager {
    /// Creates a new `MockTxnManager` instance with an empty table.
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            txns: Mutex::new(HashMap::new()),
            rows: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            fail_begin: AtomicBool::new(false),
        }
    }

    /// Makes the next `begin` fail with `ManagerUnavailable`.
    pub fn fail_next_begin(&self) {
        self.fail_begin.store(true, Ordering::SeqCst);
    }

    /// Inserts one row under the calling thread's transaction, or
    /// immediately when no transaction is bound.
    pub fn insert_row(&self, value: &str) -> Result<()> {
        match context::current() {
            Some(txn) => {
                let mut txns = self.txns.lock();
                let rec = txns
                    .get_mut(&txn.id())
                    .ok_or_else(|| MaatError::Other(format!("unknown transaction {}", txn.id())))?;
                if rec.is_finished() {
                    return Err(MaatError::AlreadyFinished(txn.id()));
                }
                if rec.suspended {
                    return Err(MaatError::Other(format!(
                        "insert against suspended transaction {}",
                        txn.id()
                    )));
                }
                rec.staged.push(value.to_string());
                Ok(())
            }
            None => {
                self.rows.lock().push(value.to_string());
                Ok(())
            }
        }
    }

    /// Number of committed rows.
    pub fn count_rows(&self) -> usize {
        self.rows.lock().len()
    }

    /// Committed rows in apply order.
    pub fn rows(&self) -> Vec<String> {
        self.rows.lock().clone()
    }

    /// All facade calls observed so far, in order.
    pub fn calls(&self) -> Vec<ManagerCall> {
        self.calls.lock().clone()
    }

    pub fn begins(&self) -> usize {
        self.count_calls(|c| matches!(c, ManagerCall::Begin(_)))
    }

    pub fn commits(&self) -> usize {
        self.count_calls(|c| matches!(c, ManagerCall::Commit(_)))
    }

    pub fn rollbacks(&self) -> usize {
        self.count_calls(|c| matches!(c, ManagerCall::Rollback(_)))
    }

    pub fn suspends(&self) -> usize {
        self.count_calls(|c| matches!(c, ManagerCall::Suspend(_)))
    }

    pub fn resumes(&self) -> usize {
        self.count_calls(|c| matches!(c, ManagerCall::Resume(_)))
    }

    fn count_calls(&self, pred: impl Fn(&ManagerCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: ManagerCall) {
        self.calls.lock().push(call);
    }
}

impl TransactionManager for MockTxnManager {
    fn begin(&self) -> Result<TxnHandle> {
        if self.fail_begin.swap(false, Ordering::SeqCst) {
            return Err(MaatError::ManagerUnavailable("begin refused".to_string()));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.txns.lock().insert(
            id,
            TxnRecord {
                status: TxnStatus::Active,
                staged: Vec::new(),
                suspended: false,
            },
        );
        self.record(ManagerCall::Begin(id));
        Ok(TxnHandle::new(id))
    }

    fn commit(&self, txn: &TxnHandle) -> Result<()> {
        let mut txns = self.txns.lock();
        let rec = txns
            .get_mut(&txn.id())
            .ok_or_else(|| MaatError::Other(format!("unknown transaction {}", txn.id())))?;
        if rec.is_finished() {
            return Err(MaatError::AlreadyFinished(txn.id()));
        }
        if rec.status == TxnStatus::MarkedRollbackOnly {
            // The engine must roll back a vetoed transaction, never commit it.
            return Err(MaatError::Other(format!(
                "commit of rollback-only transaction {}",
                txn.id()
            )));
        }
        let staged = std::mem::take(&mut rec.staged);
        rec.status = TxnStatus::Committed;
        self.rows.lock().extend(staged);
        self.record(ManagerCall::Commit(txn.id()));
        Ok(())
    }

    fn rollback(&self, txn: &TxnHandle) -> Result<()> {
        let mut txns = self.txns.lock();
        let rec = txns
            .get_mut(&txn.id())
            .ok_or_else(|| MaatError::Other(format!("unknown transaction {}", txn.id())))?;
        if rec.is_finished() {
            return Err(MaatError::AlreadyFinished(txn.id()));
        }
        rec.staged.clear();
        rec.status = TxnStatus::RolledBack;
        self.record(ManagerCall::Rollback(txn.id()));
        Ok(())
    }

    fn suspend(&self, txn: &TxnHandle) -> Result<()> {
        let mut txns = self.txns.lock();
        let rec = txns
            .get_mut(&txn.id())
            .ok_or_else(|| MaatError::Other(format!("unknown transaction {}", txn.id())))?;
        if rec.is_finished() {
            return Err(MaatError::AlreadyFinished(txn.id()));
        }
        if rec.suspended {
            return Err(MaatError::Other(format!(
                "transaction {} already suspended",
                txn.id()
            )));
        }
        rec.suspended = true;
        self.record(ManagerCall::Suspend(txn.id()));
        Ok(())
    }

    fn resume(&self, txn: &TxnHandle) -> Result<()> {
        let mut txns = self.txns.lock();
        let rec = txns
            .get_mut(&txn.id())
            .ok_or_else(|| MaatError::Other(format!("unknown transaction {}", txn.id())))?;
        if !rec.suspended {
            return Err(MaatError::Other(format!(
                "transaction {} is not suspended",
                txn.id()
            )));
        }
        rec.suspended = false;
        self.record(ManagerCall::Resume(txn.id()));
        Ok(())
    }

    fn status(&self, txn: &TxnHandle) -> Result<TxnStatus> {
        let txns = self.txns.lock();
        let rec = txns
            .get(&txn.id())
            .ok_or_else(|| MaatError::Other(format!("unknown transaction {}", txn.id())))?;
        Ok(rec.status)
    }

    fn set_rollback_only(&self, txn: &TxnHandle) -> Result<()> {
        let mut txns = self.txns.lock();
        let rec = txns
            .get_mut(&txn.id())
            .ok_or_else(|| MaatError::Other(format!("unknown transaction {}", txn.id())))?;
        if rec.is_finished() {
            return Err(MaatError::AlreadyFinished(txn.id()));
        }
        rec.status = TxnStatus::MarkedRollbackOnly;
        Ok(())
    }
}

// --- TestBean ---

/// Managed component used by the integration tests.
///
/// Inserts rows through the engine under a configured attribute, optionally
/// delegating the actual insert to a nested Mandatory-attributed operation.
pub struct TestBean {
    maat: Maat,
    db: Arc<MockTxnManager>,
    attribute: TransactionAttribute,
}

impl TestBean {
    pub fn new(maat: Maat, db: Arc<MockTxnManager>, attribute: TransactionAttribute) -> Self {
        Self {
            maat,
            db,
            attribute,
        }
    }

    /// Inserts one row under the bean's attribute. With `delegate` the
    /// insert happens inside a nested Mandatory-attributed call.
    pub fn insert_row(&self, value: &str, delegate: bool) -> Result<()> {
        self.maat.execute(self.attribute, || {
            if delegate {
                self.maat
                    .execute(TransactionAttribute::Mandatory, || self.db.insert_row(value))
            } else {
                self.db.insert_row(value)
            }
        })
    }

    /// Inserts one row, then raises the given failure from inside the
    /// managed invocation.
    pub fn insert_then_fail(&self, value: &str, failure: MaatError) -> Result<()> {
        self.maat.execute(self.attribute, || {
            self.db.insert_row(value)?;
            Err(failure)
        })
    }

    pub fn count_rows(&self) -> usize {
        self.db.count_rows()
    }
}

// --- Helper Functions ---

/// Helper function to create an engine over a fresh mock manager.
pub fn setup() -> (Maat, Arc<MockTxnManager>) {
    let db = Arc::new(MockTxnManager::new());
    let maat = Maat::new(db.clone());
    (maat, db)
}
