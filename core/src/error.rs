use crate::store::StoreError;

/// Errors surfaced by the domain core. Three tiers:
///
/// - business rules (`NoActiveShift`, `TaskNotFound`, `CompletedTask`,
///   `Validation`, `VagueMessage`, `LowConfidence`) — rejected input, reported
///   to the caller and never fatal;
/// - collaborator failures (`Store`) — degraded at the boundary that owns them;
/// - `Consistency` — a corrupted invariant (e.g. the active shift missing from
///   its own rotation ordering), distinct from bad input.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("No active shift")]
    NoActiveShift,

    #[error("Task {0} not found in active records.")]
    TaskNotFound(String),

    #[error("Cannot modify a completed task")]
    CompletedTask,

    #[error("{0}")]
    Validation(String),

    #[error("Message too vague for operational logging.")]
    VagueMessage,

    #[error("NLP Confidence ({0:.2}) below safe threshold. Request human intervention.")]
    LowConfidence(f64),

    #[error("data consistency fault: {0}")]
    Consistency(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Machine-readable error codes carried on API error envelopes.
pub mod codes {
    pub const NO_ACTIVE_SHIFT: &str = "no_active_shift";
    pub const TASK_NOT_FOUND: &str = "task_not_found";
    pub const TASK_COMPLETED: &str = "task_completed";
    pub const VALIDATION_FAILED: &str = "validation_failed";
    pub const LOW_CONFIDENCE: &str = "low_confidence";
    pub const VAGUE_MESSAGE: &str = "vague_message";
    pub const CONSISTENCY_FAULT: &str = "consistency_fault";
    pub const INTERNAL_ERROR: &str = "internal_error";
}

impl CoreError {
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::NoActiveShift => codes::NO_ACTIVE_SHIFT,
            CoreError::TaskNotFound(_) => codes::TASK_NOT_FOUND,
            CoreError::CompletedTask => codes::TASK_COMPLETED,
            CoreError::Validation(_) => codes::VALIDATION_FAILED,
            CoreError::VagueMessage => codes::VAGUE_MESSAGE,
            CoreError::LowConfidence(_) => codes::LOW_CONFIDENCE,
            CoreError::Consistency(_) => codes::CONSISTENCY_FAULT,
            CoreError::Store(_) => codes::INTERNAL_ERROR,
        }
    }
}
