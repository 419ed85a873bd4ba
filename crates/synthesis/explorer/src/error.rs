/// Errors from the exploration engine.
#[derive(Debug, thiserror::Error)]
pub enum ExplorerError {
    #[error("exploration cancelled after {completed_steps} steps")]
    Cancelled { completed_steps: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let e = ExplorerError::Cancelled { completed_steps: 4 };
        assert!(format!("{}", e).contains("4 steps"));
    }
}
