use tracing::{debug, info, warn};

use crate::engine::Engine;
use crate::error::ClusterError;
use crate::label::{cluster_label, slugify};
use crate::types::{Assignment, AssignmentKind, ClusterId, ClusterMatch, Document, NewCluster};

/// Searches repeated when the chosen cluster is deactivated before its lock
/// is taken. After the last one a new cluster is created.
const MAX_ASSIGN_ATTEMPTS: usize = 3;

/// Characters of the document id used in a fallback label.
const FALLBACK_ID_CHARS: usize = 12;

impl Engine {
    /// The active cluster whose centroid is closest to `doc`, if any is
    /// within the cluster threshold.
    ///
    /// Clusters are scanned in ascending id, so on an exact distance tie the
    /// lowest id wins.
    pub fn find_best_cluster(&self, doc: &Document) -> Result<Option<ClusterMatch>, ClusterError> {
        let query = self.embedding_of(doc)?;
        let clusters = self.store.clusters()?;

        let hits = self.index.nearest(
            query,
            clusters
                .iter()
                .filter(|c| c.active)
                .map(|c| (c, c.centroid.as_deref())),
            self.cfg.cluster_distance(),
            1,
        )?;

        Ok(hits.into_iter().next().map(|h| ClusterMatch {
            similarity: h.similarity(),
            cluster: h.id.clone(),
        }))
    }

    /// Puts `doc` in its best matching cluster and recomputes that cluster,
    /// or seeds a new singleton cluster when nothing matches.
    pub fn assign_or_create(&self, doc: &mut Document) -> Result<Assignment, ClusterError> {
        for attempt in 1..=MAX_ASSIGN_ATTEMPTS {
            let Some(best) = self.find_best_cluster(doc)? else {
                break;
            };
            let id = best.cluster.id;

            let _guard = self.cluster_locks.lock(&id);
            if !matches!(self.store.get_cluster(id)?, Some(c) if c.active) {
                debug!(
                    document = %doc.id,
                    cluster = %id,
                    attempt,
                    "cluster deactivated, searching again"
                );
                continue;
            }

            doc.assign(id, best.similarity);
            self.store.put_document(doc)?;
            self.recompute_locked(id)?;

            info!(
                document = %doc.id,
                cluster = %id,
                similarity = best.similarity,
                "found matching cluster"
            );
            return Ok(Assignment {
                cluster: id,
                similarity: best.similarity,
                kind: AssignmentKind::Joined,
            });
        }

        self.create_cluster_for(doc)
    }

    fn create_cluster_for(&self, doc: &mut Document) -> Result<Assignment, ClusterError> {
        let centroid = self.embedding_of(doc)?.to_vec();
        let fallback: String = doc.id.as_str().chars().take(FALLBACK_ID_CHARS).collect();
        let label = cluster_label(&doc.title, &fallback, self.cfg.label_max_chars);

        let cluster = self.store.create_cluster(NewCluster {
            slug_base: slugify(&label),
            label,
            centroid,
            representative: doc.id.clone(),
            created_at: self.now(),
        })?;

        // Another document may have joined between creation and this lock;
        // the recompute below folds both in.
        let _guard = self.cluster_locks.lock(&cluster.id);
        doc.assign(cluster.id, 1.0);
        if let Err(e) = self.store.put_document(doc) {
            doc.detach();
            self.abandon_cluster(cluster.id);
            return Err(e.into());
        }
        self.recompute_locked(cluster.id)?;

        info!(
            document = %doc.id,
            cluster = %cluster.id,
            label = %cluster.label,
            "created new cluster"
        );
        Ok(Assignment {
            cluster: cluster.id,
            similarity: 1.0,
            kind: AssignmentKind::Created,
        })
    }

    /// Deactivates a cluster whose founding document could not be written,
    /// unless another document joined it meanwhile. Caller holds the lock.
    fn abandon_cluster(&self, id: ClusterId) {
        let result = self.store.count_members(id).and_then(|members| {
            if members > 0 {
                return Ok(());
            }
            let Some(mut cluster) = self.store.get_cluster(id)? else {
                return Ok(());
            };
            cluster.active = false;
            cluster.member_count = 0;
            self.store.put_cluster(&cluster)
        });
        match result {
            Ok(()) => debug!(cluster = %id, "abandoned new cluster"),
            Err(e) => warn!(cluster = %id, error = %e, "failed to abandon new cluster"),
        }
    }
}
