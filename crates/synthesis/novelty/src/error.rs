use synthesis_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum NoveltyError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("equivalence class table lock poisoned")]
    LockPoisoned,
}
