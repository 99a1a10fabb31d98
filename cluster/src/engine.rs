use std::sync::Arc;

use analyst_vecindex::SimilarityIndex;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::ClusterError;
use crate::locks::KeyedLocks;
use crate::store::Store;
use crate::types::{
    Assignment, AssignmentKind, Cluster, ClusterId, Document, DocumentId, DuplicateLink,
    MergeRecord,
};

/// Entry point for duplicate resolution and topic clustering.
///
/// The engine holds no record state between calls; everything is re-read
/// from the [`Store`]. What it does hold is coordination: at most one
/// in-flight decision per document and a single writer per cluster.
///
/// Thread-safe: all methods can be called concurrently.
pub struct Engine {
    pub(crate) cfg: Config,
    pub(crate) store: Arc<dyn Store>,
    pub(crate) index: SimilarityIndex,
    pub(crate) cluster_locks: KeyedLocks<ClusterId>,
    clock: Arc<dyn Clock>,
    document_locks: KeyedLocks<DocumentId>,
}

impl Engine {
    /// Creates an engine reading the system clock. Fails if `cfg` does not
    /// validate.
    pub fn new(cfg: Config, store: Arc<dyn Store>) -> Result<Self, ClusterError> {
        cfg.validate()?;
        Ok(Self {
            index: SimilarityIndex::new(cfg.dim),
            cfg,
            store,
            clock: Arc::new(SystemClock),
            cluster_locks: KeyedLocks::new(),
            document_locks: KeyedLocks::new(),
        })
    }

    /// Replaces the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // -----------------------------------------------------------------------
    // Per-document flow
    // -----------------------------------------------------------------------

    /// Runs duplicate resolution, then cluster assignment, for a document
    /// whose embedding has just become available.
    ///
    /// A document that already has a cluster is left as is and reported
    /// with [`AssignmentKind::Unchanged`], so retries are safe. Fails with
    /// [`ClusterError::MissingEmbedding`] when there is nothing to compare
    /// yet; the caller should reschedule rather than retry.
    pub fn on_article_embedded(&self, id: &DocumentId) -> Result<Assignment, ClusterError> {
        let _guard = self.document_locks.lock(id);

        let mut doc = self.load_document(id)?;
        if let Some(cluster) = doc.cluster {
            debug!(document = %id, %cluster, "already clustered");
            return Ok(Assignment {
                cluster,
                similarity: doc.similarity_to_cluster.unwrap_or_default(),
                kind: AssignmentKind::Unchanged,
            });
        }

        self.process(&mut doc)
    }

    /// Forces re-evaluation: detaches the document from its current cluster
    /// (recomputing that cluster), then runs the full flow again.
    ///
    /// If the flow fails while the document is still detached, it is put
    /// back in its previous cluster.
    pub fn reprocess(&self, id: &DocumentId) -> Result<Assignment, ClusterError> {
        let _guard = self.document_locks.lock(id);

        let original = self.load_document(id)?;
        self.embedding_of(&original)?;

        let mut doc = original.clone();
        if let Some(old) = doc.cluster {
            let _cluster_guard = self.cluster_locks.lock(&old);
            doc.detach();
            self.store.put_document(&doc)?;
            if let Err(e) = self.settle_after_detach(old) {
                self.restore_membership_locked(&original, old);
                return Err(e);
            }
        }

        self.process(&mut doc).inspect_err(|_| {
            if let Some(old) = original.cluster {
                self.restore_membership(&original, old);
            }
        })
    }

    /// Recomputes a cluster that just lost a member. Caller holds the lock.
    fn settle_after_detach(&self, id: ClusterId) -> Result<(), ClusterError> {
        if self.recompute_locked(id)?.is_none() {
            self.refresh_locked(id)?;
        }
        Ok(())
    }

    /// Writes `original` back into `old` when a failed reprocess left it
    /// detached. Skipped if the document was placed elsewhere or `old` went
    /// inactive.
    fn restore_membership(&self, original: &Document, old: ClusterId) {
        let _cluster_guard = self.cluster_locks.lock(&old);
        self.restore_membership_locked(original, old);
    }

    fn restore_membership_locked(&self, original: &Document, old: ClusterId) {
        match self.try_restore(original, old) {
            Ok(true) => debug!(document = %original.id, cluster = %old, "restored membership"),
            Ok(false) => {}
            Err(e) => warn!(
                document = %original.id,
                cluster = %old,
                error = %e,
                "failed to restore membership"
            ),
        }
    }

    fn try_restore(&self, original: &Document, old: ClusterId) -> Result<bool, ClusterError> {
        let current = self.load_document(&original.id)?;
        if current.cluster.is_some() || !self.load_cluster(old)?.active {
            return Ok(false);
        }
        self.store.put_document(original)?;
        self.recompute_locked(old)?;
        self.refresh_locked(old)?;
        Ok(true)
    }

    fn process(&self, doc: &mut Document) -> Result<Assignment, ClusterError> {
        if let Err(e) = self.embedding_of(doc) {
            if matches!(e, ClusterError::MissingEmbedding(_)) {
                warn!(document = %doc.id, "document has no embedding, declining");
            }
            return Err(e);
        }

        if let Some(assignment) = self.assign_as_duplicate(doc)? {
            return Ok(assignment);
        }
        self.assign_or_create(doc)
    }

    // -----------------------------------------------------------------------
    // Document records
    // -----------------------------------------------------------------------

    /// Stores a freshly ingested document. An existing record with the same
    /// id is left untouched. Returns true if stored.
    pub fn register(&self, doc: &Document) -> Result<bool, ClusterError> {
        if let Some(embedding) = &doc.embedding {
            self.index.check(embedding)?;
        }
        Ok(self.store.insert_document(doc)?)
    }

    /// Records the embedding computed for a document. The embedding is
    /// immutable once set: returns false, and writes nothing, if one exists.
    pub fn attach_embedding(
        &self,
        id: &DocumentId,
        embedding: Vec<f32>,
    ) -> Result<bool, ClusterError> {
        self.index.check(&embedding)?;

        let _guard = self.document_locks.lock(id);
        let mut doc = self.load_document(id)?;
        if doc.embedding.is_some() {
            debug!(document = %id, "embedding already set");
            return Ok(false);
        }
        doc.embedding = Some(embedding);
        self.store.put_document(&doc)?;
        Ok(true)
    }

    pub fn document(&self, id: &DocumentId) -> Result<Option<Document>, ClusterError> {
        Ok(self.store.get_document(id)?)
    }

    pub fn cluster(&self, id: ClusterId) -> Result<Option<Cluster>, ClusterError> {
        Ok(self.store.get_cluster(id)?)
    }

    /// Duplicate links whose primary is `primary`.
    pub fn duplicates_of(
        &self,
        primary: &DocumentId,
    ) -> Result<Vec<DuplicateLink>, ClusterError> {
        Ok(self.store.duplicate_links(primary)?)
    }

    /// Every merge performed, oldest first.
    pub fn merge_history(&self) -> Result<Vec<MergeRecord>, ClusterError> {
        Ok(self.store.merge_records()?)
    }

    // -----------------------------------------------------------------------
    // Shared helpers
    // -----------------------------------------------------------------------

    pub(crate) fn load_document(&self, id: &DocumentId) -> Result<Document, ClusterError> {
        self.store
            .get_document(id)?
            .ok_or_else(|| ClusterError::DocumentNotFound(id.clone()))
    }

    pub(crate) fn load_cluster(&self, id: ClusterId) -> Result<Cluster, ClusterError> {
        self.store
            .get_cluster(id)?
            .ok_or(ClusterError::ClusterNotFound(id))
    }

    /// The document's embedding, validated against the configured dimension.
    pub(crate) fn embedding_of<'a>(&self, doc: &'a Document) -> Result<&'a [f32], ClusterError> {
        let embedding = doc
            .embedding
            .as_deref()
            .ok_or_else(|| ClusterError::MissingEmbedding(doc.id.clone()))?;
        self.index.check(embedding)?;
        Ok(embedding)
    }
}
