use crate::errors::MaatError;

/// Classification of a failure raised by a managed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// An expected business-level outcome. A transaction owned by the
    /// failing invocation still commits.
    Application,
    /// An unexpected fault. A transaction owned by the failing invocation
    /// rolls back; a joined transaction is marked rollback-only.
    System,
}

/// Trait for deciding how a raised failure affects the active transaction.
///
/// The engine consults the classifier once per failed invocation, after the
/// operation body has returned. Classification only chooses between commit
/// and rollback; the original failure is re-surfaced to the caller unchanged
/// either way.
pub trait ExceptionClassifier: Send + Sync {
    /// Classifies the given failure.
    fn classify(&self, error: &MaatError) -> FailureClass;
}

/// The default classification policy: failures raised as expected business
/// outcomes ([`MaatError::Application`]) classify as `Application`; every
/// other failure classifies as `System`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultClassifier;

impl ExceptionClassifier for DefaultClassifier {
    fn classify(&self, error: &MaatError) -> FailureClass {
        match error {
            MaatError::Application(_) => FailureClass::Application,
            _ => FailureClass::System,
        }
    }
}
