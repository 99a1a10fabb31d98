use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::ClusterError;

/// Upper bound for the day windows, about a century.
const MAX_WINDOW_DAYS: i64 = 36_500;

/// Controls engine behavior.
///
/// Every field has a default, so a partial YAML/JSON document deserializes
/// into a usable config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Embedding dimension. Default: 768.
    pub dim: usize,

    /// Minimum cosine similarity (exclusive) for two documents to be
    /// duplicates. Default: 0.90.
    pub duplicate_threshold: f32,

    /// Minimum cosine similarity (exclusive) for a document to join a
    /// cluster. Must not exceed `duplicate_threshold`. Default: 0.75.
    pub cluster_threshold: f32,

    /// Maximum duplicate candidates considered per document. Default: 10.
    pub duplicate_limit: usize,

    /// Maximum related (same topic, not duplicate) documents returned.
    /// Default: 20.
    pub related_limit: usize,

    /// Maximum members sampled when recomputing a centroid. Default: 100.
    pub centroid_sample: usize,

    /// Minimum sample size before the representative document is
    /// reselected. Default: 3.
    pub representative_min_members: usize,

    /// Members created within this many days count as recent for the
    /// priority score. Default: 7.
    pub recency_window_days: i64,

    /// Empty clusters older than this many days are deactivated by cleanup.
    /// Default: 7.
    pub empty_cluster_grace_days: i64,

    /// New-cluster labels are cut to this many characters. Default: 100.
    pub label_max_chars: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dim: 768,
            duplicate_threshold: 0.90,
            cluster_threshold: 0.75,
            duplicate_limit: 10,
            related_limit: 20,
            centroid_sample: 100,
            representative_min_members: 3,
            recency_window_days: 7,
            empty_cluster_grace_days: 7,
            label_max_chars: 100,
        }
    }
}

impl Config {
    /// Rejects configurations the engine cannot honor.
    pub fn validate(&self) -> Result<(), ClusterError> {
        if self.dim == 0 {
            return Err(ClusterError::InvalidConfig("dim must be positive".into()));
        }
        for (name, t) in [
            ("duplicate_threshold", self.duplicate_threshold),
            ("cluster_threshold", self.cluster_threshold),
        ] {
            if !(t > 0.0 && t <= 1.0) {
                return Err(ClusterError::InvalidConfig(format!(
                    "{name} must be in (0, 1], got {t}"
                )));
            }
        }
        if self.cluster_threshold > self.duplicate_threshold {
            return Err(ClusterError::InvalidConfig(format!(
                "cluster_threshold {} exceeds duplicate_threshold {}",
                self.cluster_threshold, self.duplicate_threshold
            )));
        }
        if self.centroid_sample == 0 {
            return Err(ClusterError::InvalidConfig(
                "centroid_sample must be positive".into(),
            ));
        }
        for (name, days) in [
            ("recency_window_days", self.recency_window_days),
            ("empty_cluster_grace_days", self.empty_cluster_grace_days),
        ] {
            if !(0..=MAX_WINDOW_DAYS).contains(&days) {
                return Err(ClusterError::InvalidConfig(format!(
                    "{name} must be in [0, {MAX_WINDOW_DAYS}], got {days}"
                )));
            }
        }
        Ok(())
    }

    /// Cosine distance cutoff for duplicates.
    pub(crate) fn duplicate_distance(&self) -> f32 {
        1.0 - self.duplicate_threshold
    }

    /// Cosine distance cutoff for cluster membership.
    pub(crate) fn cluster_distance(&self) -> f32 {
        1.0 - self.cluster_threshold
    }

    pub(crate) fn recency_window(&self) -> Duration {
        Duration::days(self.recency_window_days)
    }

    pub(crate) fn empty_cluster_grace(&self) -> Duration {
        Duration::days(self.empty_cluster_grace_days)
    }
}
