use std::collections::{BTreeMap, HashSet};

use parking_lot::Mutex;

use super::{Store, StoreError, sort_embedded, sort_members};
use crate::label::unique_slug;
use crate::types::{
    Cluster, ClusterId, Document, DocumentId, DuplicateLink, MergeRecord, NewCluster,
};

/// In-memory [`Store`]. Data is lost on drop; suitable for tests and
/// ephemeral use.
pub struct MemoryStore {
    inner: Mutex<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    documents: BTreeMap<DocumentId, Document>,
    clusters: BTreeMap<ClusterId, Cluster>,
    slugs: HashSet<String>,
    links: BTreeMap<(DocumentId, DocumentId), DuplicateLink>,
    merges: Vec<MergeRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MemoryStoreInner::default()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemoryStore {
    fn get_document(&self, id: &DocumentId) -> Result<Option<Document>, StoreError> {
        Ok(self.inner.lock().documents.get(id).cloned())
    }

    fn put_document(&self, doc: &Document) -> Result<(), StoreError> {
        self.inner.lock().documents.insert(doc.id.clone(), doc.clone());
        Ok(())
    }

    fn insert_document(&self, doc: &Document) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock();
        if inner.documents.contains_key(&doc.id) {
            return Ok(false);
        }
        inner.documents.insert(doc.id.clone(), doc.clone());
        Ok(true)
    }

    fn embedded_documents(&self) -> Result<Vec<Document>, StoreError> {
        let mut docs: Vec<Document> = self
            .inner
            .lock()
            .documents
            .values()
            .filter(|d| d.embedding.is_some())
            .cloned()
            .collect();
        sort_embedded(&mut docs);
        Ok(docs)
    }

    fn members(&self, cluster: ClusterId) -> Result<Vec<Document>, StoreError> {
        let mut docs: Vec<Document> = self
            .inner
            .lock()
            .documents
            .values()
            .filter(|d| d.cluster == Some(cluster))
            .cloned()
            .collect();
        sort_members(&mut docs);
        Ok(docs)
    }

    fn count_members(&self, cluster: ClusterId) -> Result<usize, StoreError> {
        Ok(self
            .inner
            .lock()
            .documents
            .values()
            .filter(|d| d.cluster == Some(cluster))
            .count())
    }

    fn reassign_members(&self, from: ClusterId, to: ClusterId) -> Result<usize, StoreError> {
        let mut inner = self.inner.lock();
        let mut moved = 0;
        for doc in inner.documents.values_mut() {
            if doc.cluster == Some(from) {
                doc.cluster = Some(to);
                moved += 1;
            }
        }
        Ok(moved)
    }

    fn get_cluster(&self, id: ClusterId) -> Result<Option<Cluster>, StoreError> {
        Ok(self.inner.lock().clusters.get(&id).cloned())
    }

    fn put_cluster(&self, cluster: &Cluster) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        match inner.clusters.get_mut(&cluster.id) {
            Some(slot) => {
                let slug = std::mem::take(&mut slot.slug);
                *slot = Cluster {
                    slug,
                    ..cluster.clone()
                };
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("cluster {}", cluster.id))),
        }
    }

    fn create_cluster(&self, new: NewCluster) -> Result<Cluster, StoreError> {
        let mut inner = self.inner.lock();
        let next = inner.clusters.keys().next_back().map_or(1, |id| id.0 + 1);
        let slug = unique_slug::<StoreError>(&new.slug_base, |s| Ok(inner.slugs.contains(s)))?;
        inner.slugs.insert(slug.clone());

        let cluster = new.into_cluster(ClusterId(next), slug);
        inner.clusters.insert(cluster.id, cluster.clone());
        Ok(cluster)
    }

    fn clusters(&self) -> Result<Vec<Cluster>, StoreError> {
        Ok(self.inner.lock().clusters.values().cloned().collect())
    }

    fn insert_duplicate_link(&self, link: &DuplicateLink) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock();
        let key = (link.primary.clone(), link.duplicate.clone());
        if inner.links.contains_key(&key) {
            return Ok(false);
        }
        inner.links.insert(key, link.clone());
        Ok(true)
    }

    fn duplicate_links(&self, primary: &DocumentId) -> Result<Vec<DuplicateLink>, StoreError> {
        Ok(self
            .inner
            .lock()
            .links
            .values()
            .filter(|l| &l.primary == primary)
            .cloned()
            .collect())
    }

    fn append_merge(&self, mut record: MergeRecord) -> Result<MergeRecord, StoreError> {
        let mut inner = self.inner.lock();
        record.seq = inner.merges.len() as u64 + 1;
        inner.merges.push(record.clone());
        Ok(record)
    }

    fn merge_records(&self) -> Result<Vec<MergeRecord>, StoreError> {
        Ok(self.inner.lock().merges.clone())
    }
}
