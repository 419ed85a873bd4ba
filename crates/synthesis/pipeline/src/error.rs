use crate::stage::Stage;
use synthesis_audit::AuditError;

/// Configuration problems, raised at startup only.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to read configuration from {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration value for {field}: {reason}")]
    Invalid { field: String, reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("pipeline cancelled during {stage}")]
    Cancelled { stage: Stage },

    #[error("no source documents supplied")]
    NoSources,

    #[error("audit stage failed: {0}")]
    Audit(AuditError),
}

impl PipelineError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PipelineError::Cancelled { .. })
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
