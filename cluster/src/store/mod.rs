//! Persistence for documents, clusters and the insert-only audit records.
//!
//! The engine keeps no state of its own between calls: every operation
//! re-reads what it needs through [`Store`] and writes results back.

mod memory;
mod redb;

use thiserror::Error;

use crate::types::{
    Cluster, ClusterId, Document, DocumentId, DuplicateLink, MergeRecord, NewCluster,
};

pub use memory::MemoryStore;
pub use redb::RedbStore;

#[derive(Error, Debug)]
pub enum StoreError {
    /// Backend failure (I/O, transaction conflict). Transient.
    #[error("store: storage error: {0}")]
    Storage(String),

    #[error("store: serialization error: {0}")]
    Serialization(String),

    /// An update targeted a record that does not exist.
    #[error("store: not found: {0}")]
    NotFound(String),
}

/// Record persistence used by the engine.
///
/// Implementations must be safe for concurrent use. Single-record writes
/// are atomic; multi-record methods document their own atomicity.
pub trait Store: Send + Sync {
    fn get_document(&self, id: &DocumentId) -> Result<Option<Document>, StoreError>;

    /// Writes `doc`, replacing any record with the same id.
    fn put_document(&self, doc: &Document) -> Result<(), StoreError>;

    /// Writes `doc` unless its id is already present. Returns true if written.
    fn insert_document(&self, doc: &Document) -> Result<bool, StoreError>;

    /// All documents that have an embedding, ordered by creation time then id.
    fn embedded_documents(&self) -> Result<Vec<Document>, StoreError>;

    /// Documents referencing `cluster`, newest first (ties by id).
    fn members(&self, cluster: ClusterId) -> Result<Vec<Document>, StoreError>;

    fn count_members(&self, cluster: ClusterId) -> Result<usize, StoreError> {
        Ok(self.members(cluster)?.len())
    }

    /// Repoints every document referencing `from` to `to` in one atomic
    /// write. Returns how many moved.
    fn reassign_members(&self, from: ClusterId, to: ClusterId) -> Result<usize, StoreError>;

    fn get_cluster(&self, id: ClusterId) -> Result<Option<Cluster>, StoreError>;

    /// Replaces an existing cluster record. The slug is fixed at creation.
    fn put_cluster(&self, cluster: &Cluster) -> Result<(), StoreError>;

    /// Allocates the next cluster id and a unique slug from
    /// `new.slug_base`, and persists the cluster, atomically.
    fn create_cluster(&self, new: NewCluster) -> Result<Cluster, StoreError>;

    /// All clusters, ascending id.
    fn clusters(&self) -> Result<Vec<Cluster>, StoreError>;

    /// Insert-or-ignore on (primary, duplicate). Returns true if inserted.
    fn insert_duplicate_link(&self, link: &DuplicateLink) -> Result<bool, StoreError>;

    /// Links whose primary is `primary`, ordered by duplicate id.
    fn duplicate_links(&self, primary: &DocumentId) -> Result<Vec<DuplicateLink>, StoreError>;

    /// Appends a merge record, assigning its sequence number.
    fn append_merge(&self, record: MergeRecord) -> Result<MergeRecord, StoreError>;

    /// All merge records in append order.
    fn merge_records(&self) -> Result<Vec<MergeRecord>, StoreError>;
}

/// Newest-first member ordering shared by the backends.
pub(crate) fn sort_members(docs: &mut [Document]) {
    docs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
}

/// Scan ordering for similarity candidates shared by the backends.
pub(crate) fn sort_embedded(docs: &mut [Document]) {
    docs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
}
