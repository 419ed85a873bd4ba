use synthesis_types::HypothesisId;

/// Errors from the audit loop.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("audit of {hypothesis_id} cancelled at iteration {iteration}")]
    Cancelled {
        hypothesis_id: HypothesisId,
        iteration: u32,
    },

    #[error("refinement worker pool closed: {0}")]
    WorkerPool(#[from] tokio::sync::AcquireError),
}

impl AuditError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AuditError::Cancelled { .. })
    }
}
