use tracing::{info, warn};

use crate::engine::Engine;
use crate::error::ClusterError;
use crate::types::{ClusterId, MergeRecord};

impl Engine {
    /// Folds every member of `source` into `target`.
    ///
    /// The source is deactivated before any document moves, so concurrent
    /// assignment never picks it as a fresh target. The merge is recorded
    /// and the target recomputed. Both clusters are locked for the whole
    /// operation.
    pub fn merge_clusters(
        &self,
        source: ClusterId,
        target: ClusterId,
        reason: &str,
    ) -> Result<MergeRecord, ClusterError> {
        if source == target {
            return Err(ClusterError::SameCluster(source));
        }

        let _guards = self.cluster_locks.lock_pair(&source, &target);
        let mut src = self.load_cluster(source)?;
        let dst = self.load_cluster(target)?;
        if !dst.active {
            return Err(ClusterError::InactiveCluster(target));
        }

        let was_active = src.active;
        src.active = false;
        self.store.put_cluster(&src)?;

        let moved = match self.store.reassign_members(source, target) {
            Ok(n) => n,
            Err(e) => {
                if was_active {
                    src.active = true;
                    if let Err(restore) = self.store.put_cluster(&src) {
                        warn!(
                            cluster = %source,
                            error = %restore,
                            "failed to reactivate merge source"
                        );
                    }
                }
                return Err(e.into());
            }
        };

        let record = self.store.append_merge(MergeRecord {
            seq: 0,
            source,
            target,
            reason: reason.to_string(),
            documents_moved: moved,
            merged_at: self.now(),
        })?;

        src.member_count = 0;
        src.last_membership_change = Some(record.merged_at);
        self.store.put_cluster(&src)?;
        self.recompute_locked(target)?;

        info!(
            %source,
            %target,
            moved,
            reason,
            "merged clusters"
        );
        Ok(record)
    }
}
