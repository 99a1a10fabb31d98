use tracing::{debug, info};

use crate::engine::Engine;
use crate::error::ClusterError;
use crate::types::{Assignment, AssignmentKind, Document, DuplicateLink, SimilarDocument};

impl Engine {
    /// Documents whose similarity to `doc` exceeds the duplicate threshold,
    /// closest first, at most `duplicate_limit`.
    ///
    /// Scans every embedded document except `doc` itself.
    pub fn resolve_duplicates(&self, doc: &Document) -> Result<Vec<SimilarDocument>, ClusterError> {
        let query = self.embedding_of(doc)?;
        let candidates = self.store.embedded_documents()?;

        let hits = self.index.nearest(
            query,
            candidates
                .iter()
                .filter(|c| c.id != doc.id)
                .map(|c| (c, c.embedding.as_deref())),
            self.cfg.duplicate_distance(),
            self.cfg.duplicate_limit,
        )?;

        Ok(hits
            .into_iter()
            .map(|h| SimilarDocument {
                similarity: h.similarity(),
                document: h.id.clone(),
            })
            .collect())
    }

    /// Documents on the same topic as `doc` that are not duplicates of it:
    /// similarity above the cluster threshold but not above the duplicate
    /// threshold. Closest first, at most `related_limit`.
    pub fn find_related(&self, doc: &Document) -> Result<Vec<SimilarDocument>, ClusterError> {
        let query = self.embedding_of(doc)?;
        let candidates = self.store.embedded_documents()?;

        let duplicate_distance = self.cfg.duplicate_distance();
        let hits = self.index.nearest(
            query,
            candidates
                .iter()
                .filter(|c| c.id != doc.id)
                .map(|c| (c, c.embedding.as_deref())),
            self.cfg.cluster_distance(),
            usize::MAX,
        )?;

        Ok(hits
            .into_iter()
            .filter(|h| h.distance >= duplicate_distance)
            .take(self.cfg.related_limit)
            .map(|h| SimilarDocument {
                similarity: h.similarity(),
                document: h.id.clone(),
            })
            .collect())
    }

    /// Records `doc` as a duplicate if it has any duplicate matches.
    ///
    /// The primary is the earliest-created match, not the closest one; the
    /// link carries the closest match's similarity. When the primary sits
    /// in an active cluster, `doc` inherits it and `Some` is returned.
    /// Otherwise `None` tells the caller to run cluster assignment.
    pub(crate) fn assign_as_duplicate(
        &self,
        doc: &mut Document,
    ) -> Result<Option<Assignment>, ClusterError> {
        let matches = self.resolve_duplicates(doc)?;
        let Some(closest) = matches.first() else {
            return Ok(None);
        };
        let similarity = closest.similarity;

        let Some(primary) = matches
            .iter()
            .map(|m| &m.document)
            .min_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)))
        else {
            return Ok(None);
        };

        let link = DuplicateLink {
            primary: primary.id.clone(),
            duplicate: doc.id.clone(),
            similarity,
            created_at: self.now(),
        };
        if self.store.insert_duplicate_link(&link)? {
            info!(
                document = %doc.id,
                primary = %primary.id,
                similarity,
                "recorded duplicate"
            );
        }

        let Some(cluster_id) = primary.cluster else {
            debug!(document = %doc.id, primary = %primary.id, "primary has no cluster");
            return Ok(None);
        };

        let _guard = self.cluster_locks.lock(&cluster_id);
        let mut cluster = match self.store.get_cluster(cluster_id)? {
            Some(c) if c.active => c,
            _ => {
                debug!(document = %doc.id, cluster = %cluster_id, "primary cluster not active");
                return Ok(None);
            }
        };

        doc.assign(cluster_id, similarity);
        self.store.put_document(doc)?;

        cluster.member_count = self.store.count_members(cluster_id)?;
        cluster.last_membership_change = Some(self.now());
        self.store.put_cluster(&cluster)?;

        info!(
            document = %doc.id,
            cluster = %cluster_id,
            similarity,
            "inherited cluster from duplicate primary"
        );
        Ok(Some(Assignment {
            cluster: cluster_id,
            similarity,
            kind: AssignmentKind::Duplicate,
        }))
    }
}
