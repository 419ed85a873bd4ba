use crate::error::OracleError;
use async_trait::async_trait;
use tracing::warn;

/// Text embedding provider.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f64>, OracleError>;

    /// Length of every vector this service returns.
    fn dimension(&self) -> usize;
}

/// Embed `text`, degrading to a zero vector on failure.
///
/// The zero vector is the "no signal" sentinel: the novelty gate never
/// matches or records it and the calibrator treats it as neutral.
pub async fn embed_or_neutral(service: &dyn EmbeddingService, text: &str) -> Vec<f64> {
    match service.embed(text).await {
        Ok(vector) => vector,
        Err(e) => {
            warn!(error = %e, dimension = service.dimension(), "embedding unavailable, using neutral vector");
            vec![0.0; service.dimension()]
        }
    }
}

/// Deterministic bag-of-tokens embedder.
///
/// Each lowercase alphanumeric token is hashed with blake3 into a signed
/// bucket; the sum is L2-normalized. Texts sharing vocabulary land close
/// together, which is all the gate and trap controller need offline.
#[derive(Clone, Debug)]
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    pub fn embed_sync(&self, text: &str) -> Vec<f64> {
        let mut vector = vec![0.0; self.dimension];
        let lowered = text.to_lowercase();
        for token in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let hash = blake3::hash(token.as_bytes());
            let bytes = hash.as_bytes();
            let mut index_bytes = [0u8; 8];
            index_bytes.copy_from_slice(&bytes[..8]);
            let index = (u64::from_le_bytes(index_bytes) % self.dimension as u64) as usize;
            let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[index] += sign;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f64>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        vector
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(64)
    }
}

#[async_trait]
impl EmbeddingService for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f64>, OracleError> {
        Ok(self.embed_sync(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Embedder that always fails, for degraded-path tests.
pub struct FailingEmbedder {
    dimension: usize,
}

impl FailingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

#[async_trait]
impl EmbeddingService for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f64>, OracleError> {
        Err(OracleError::with_status(503, "simulated embedding outage"))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
