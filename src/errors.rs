use thiserror::Error;

use crate::manager::TxnId;

#[derive(Error, Debug)]
pub enum MaatError {
    #[error("transaction required but none is active")]
    NoTransaction,

    #[error("active transaction forbidden by propagation policy")]
    IllegalTransactionState,

    #[error("transaction manager unavailable: {0}")]
    ManagerUnavailable(String),

    #[error("transaction {0} already finished")]
    AlreadyFinished(TxnId),

    #[error("transaction was marked rollback-only and has been rolled back")]
    RollbackOnly,

    #[error("application failure: {0}")]
    Application(String),

    #[error("system failure: {0}")]
    System(String),

    #[error("other error: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, MaatError>;
