use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoveltyConfig {
    /// Cosine distance within which a rejection joins an existing class.
    pub novelty_threshold: f64,
    /// Membership tolerance applied to a class radius.
    pub radius_buffer: f64,
    /// Membership radius of tight or singleton classes.
    pub min_membership_radius: f64,
}

impl Default for NoveltyConfig {
    fn default() -> Self {
        Self {
            novelty_threshold: 0.25,
            radius_buffer: 1.1,
            min_membership_radius: 0.25,
        }
    }
}

impl NoveltyConfig {
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.novelty_threshold = threshold;
        self
    }

    /// `max(radius * radius_buffer, min_membership_radius)`.
    pub fn membership_radius(&self, class_radius: f64) -> f64 {
        (class_radius * self.radius_buffer).max(self.min_membership_radius)
    }
}
