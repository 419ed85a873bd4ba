use synthesis_types::HypothesisId;

/// Errors from a hypothesis store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("hypothesis already persisted: {0}")]
    Conflict(HypothesisId),
    #[error("invalid record: {0}")]
    InvalidRecord(String),
    #[error("storage backend error: {0}")]
    Backend(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let id = HypothesisId::new();
        let e = StoreError::Conflict(id);
        assert!(format!("{}", e).contains(&id.to_string()));
        let e = StoreError::Backend("lock poisoned".into());
        assert!(format!("{}", e).contains("lock poisoned"));
    }
}
