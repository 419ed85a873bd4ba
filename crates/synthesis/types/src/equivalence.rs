use crate::ids::ClassId;
use crate::vector::cosine_distance;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Online cluster of previously rejected hypothesis embeddings.
///
/// Classes only grow: absorbing a member moves the centroid and can widen
/// the radius, but nothing ever shrinks or merges them.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EquivalenceClass {
    pub id: ClassId,
    pub centroid: Vec<f64>,
    pub member_count: usize,
    /// Largest cosine distance observed between an absorbed member and the
    /// centroid at absorption time.
    pub radius: f64,
    pub representative_reason: String,
    pub created_at: DateTime<Utc>,
}

impl EquivalenceClass {
    pub fn singleton(embedding: Vec<f64>, reason: impl Into<String>) -> Self {
        Self {
            id: ClassId::new(),
            centroid: embedding,
            member_count: 1,
            radius: 0.0,
            representative_reason: reason.into(),
            created_at: Utc::now(),
        }
    }

    pub fn distance_to(&self, embedding: &[f64]) -> f64 {
        cosine_distance(&self.centroid, embedding)
    }

    /// Fold an embedding in: `c' = (c*n + e)/(n+1)`, radius = max(radius, d).
    pub fn absorb(&mut self, embedding: &[f64]) {
        let distance = self.distance_to(embedding);
        let n = self.member_count as f64;
        for (c, e) in self.centroid.iter_mut().zip(embedding) {
            *c = (*c * n + e) / (n + 1.0);
        }
        self.member_count += 1;
        self.radius = self.radius.max(distance);
    }
}
