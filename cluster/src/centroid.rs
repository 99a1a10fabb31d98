use analyst_vecindex::mean;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use crate::engine::Engine;
use crate::error::ClusterError;
use crate::types::{Cluster, ClusterId, DocumentId};

/// `0.3 * members + 0.7 * recent members`.
pub fn priority_score(member_count: usize, recent_count: usize) -> f64 {
    0.3 * member_count as f64 + 0.7 * recent_count as f64
}

impl Engine {
    /// Recomputes the centroid, member count and (for large enough samples)
    /// representative of a cluster.
    ///
    /// Returns `None`, writing nothing, when the cluster has no embedded
    /// members.
    pub fn recompute(&self, id: ClusterId) -> Result<Option<Cluster>, ClusterError> {
        let _guard = self.cluster_locks.lock(&id);
        self.recompute_locked(id)
    }

    /// [`Engine::recompute`] for callers already holding the cluster lock.
    pub(crate) fn recompute_locked(&self, id: ClusterId) -> Result<Option<Cluster>, ClusterError> {
        let mut cluster = self.load_cluster(id)?;
        let members = self.store.members(id)?;

        // Newest first, so the sample is the most recent members.
        let dim = self.index.dim();
        let mut sample: Vec<(&DocumentId, &[f32])> = members
            .iter()
            .filter_map(|d| {
                let v = d.embedding.as_deref().filter(|v| v.len() == dim)?;
                Some((&d.id, v))
            })
            .take(self.cfg.centroid_sample)
            .collect();

        let vectors: Vec<&[f32]> = sample.iter().map(|(_, v)| *v).collect();
        let Some(centroid) = mean(&vectors) else {
            debug!(cluster = %id, "no embedded members, centroid unchanged");
            return Ok(None);
        };

        if sample.len() >= self.cfg.representative_min_members {
            // Scan in id order so an exact tie goes to the lowest id.
            sample.sort_by(|a, b| a.0.cmp(b.0));
            let closest = self.index.nearest(
                &centroid,
                sample.iter().map(|(doc, v)| (*doc, Some(*v))),
                f32::INFINITY,
                1,
            )?;
            if let Some(rep) = closest.first() {
                cluster.representative = Some(rep.id.clone());
            }
        }

        cluster.centroid = Some(centroid);
        cluster.member_count = members.len();
        cluster.last_membership_change = Some(self.now());
        self.store.put_cluster(&cluster)?;

        debug!(
            cluster = %id,
            members = cluster.member_count,
            sampled = sample.len(),
            "recomputed centroid"
        );
        Ok(Some(cluster))
    }

    /// Recounts members and recomputes the priority score. Centroid,
    /// representative and membership are left alone.
    pub fn refresh_statistics(&self, id: ClusterId) -> Result<Cluster, ClusterError> {
        let _guard = self.cluster_locks.lock(&id);
        self.refresh_locked(id)
    }

    pub(crate) fn refresh_locked(&self, id: ClusterId) -> Result<Cluster, ClusterError> {
        let mut cluster = self.load_cluster(id)?;
        let members = self.store.members(id)?;

        let since = self.window_start(self.cfg.recency_window());
        let recent = members.iter().filter(|d| d.created_at >= since).count();

        cluster.member_count = members.len();
        cluster.priority_score = priority_score(cluster.member_count, recent);
        self.store.put_cluster(&cluster)?;

        info!(
            cluster = %id,
            members = cluster.member_count,
            recent,
            priority = cluster.priority_score,
            "refreshed cluster statistics"
        );
        Ok(cluster)
    }

    /// Refreshes every active cluster. Returns how many were refreshed.
    pub fn refresh_all_statistics(&self) -> Result<usize, ClusterError> {
        let mut refreshed = 0;
        for cluster in self.store.clusters()? {
            if !cluster.active {
                continue;
            }
            self.refresh_statistics(cluster.id)?;
            refreshed += 1;
        }
        Ok(refreshed)
    }

    /// Deactivates active clusters that have no members and were created
    /// before the grace period. Returns how many were deactivated.
    pub fn deactivate_empty_clusters(&self) -> Result<usize, ClusterError> {
        let cutoff = self.window_start(self.cfg.empty_cluster_grace());

        let mut deactivated = 0;
        for candidate in self.store.clusters()? {
            if !candidate.active || candidate.created_at >= cutoff {
                continue;
            }

            let _guard = self.cluster_locks.lock(&candidate.id);
            let mut cluster = self.load_cluster(candidate.id)?;
            if !cluster.active || self.store.count_members(cluster.id)? > 0 {
                continue;
            }

            cluster.active = false;
            cluster.member_count = 0;
            self.store.put_cluster(&cluster)?;
            info!(cluster = %cluster.id, "deactivated empty cluster");
            deactivated += 1;
        }
        Ok(deactivated)
    }

    /// `now - window`, saturating at the earliest representable time.
    fn window_start(&self, window: Duration) -> DateTime<Utc> {
        self.now()
            .checked_sub_signed(window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Active clusters by priority (highest first), then member count
    /// (largest first), then id.
    pub fn ranked_clusters(&self, limit: usize) -> Result<Vec<Cluster>, ClusterError> {
        let mut clusters: Vec<Cluster> = self
            .store
            .clusters()?
            .into_iter()
            .filter(|c| c.active)
            .collect();

        clusters.sort_by(|a, b| {
            b.priority_score
                .total_cmp(&a.priority_score)
                .then_with(|| b.member_count.cmp(&a.member_count))
                .then_with(|| a.id.cmp(&b.id))
        });
        clusters.truncate(limit);
        Ok(clusters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_score() {
        assert_eq!(priority_score(0, 0), 0.0);
        assert!((priority_score(10, 4) - 5.8).abs() < 1e-9);
        assert!(priority_score(2, 2) > priority_score(3, 0));
    }
}
