//! Redb-backed persistent [`Store`].
//!
//! Table layout (values are msgpack with named fields):
//!
//! ```text
//! documents        {document_id}               → Document
//! clusters         {cluster_id:u64}            → Cluster
//! cluster_slugs    {slug}                      → cluster_id
//! duplicate_links  {primary_id}:{duplicate_id} → DuplicateLink
//! merges           {seq:u64}                   → MergeRecord
//! ```

use std::fmt::Display;
use std::path::Path;

use redb::{Database, ReadableTable, TableDefinition, WriteTransaction};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{Store, StoreError, sort_embedded, sort_members};
use crate::label::unique_slug;
use crate::types::{
    Cluster, ClusterId, Document, DocumentId, DuplicateLink, MergeRecord, NewCluster,
};

const DOCUMENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("documents");
const CLUSTERS: TableDefinition<u64, &[u8]> = TableDefinition::new("clusters");
const SLUGS: TableDefinition<&str, u64> = TableDefinition::new("cluster_slugs");
const DUPLICATES: TableDefinition<&str, &[u8]> = TableDefinition::new("duplicate_links");
const MERGES: TableDefinition<u64, &[u8]> = TableDefinition::new("merges");

/// A persistent store backed by a single redb file.
pub struct RedbStore {
    db: Database,
}

impl RedbStore {
    /// Open or create a store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = Database::create(path).map_err(storage)?;

        // Create every table up front so read transactions never miss one.
        let tx = db.begin_write().map_err(storage)?;
        {
            tx.open_table(DOCUMENTS).map_err(storage)?;
            tx.open_table(CLUSTERS).map_err(storage)?;
            tx.open_table(SLUGS).map_err(storage)?;
            tx.open_table(DUPLICATES).map_err(storage)?;
            tx.open_table(MERGES).map_err(storage)?;
        }
        tx.commit().map_err(storage)?;

        Ok(Self { db })
    }

    /// Runs `f` inside a write transaction and commits on success.
    /// Nothing is persisted when `f` fails.
    fn write<T>(
        &self,
        f: impl FnOnce(&WriteTransaction) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let tx = self.db.begin_write().map_err(storage)?;
        let out = f(&tx)?;
        tx.commit().map_err(storage)?;
        Ok(out)
    }

    fn scan_documents(
        &self,
        mut keep: impl FnMut(&Document) -> bool,
    ) -> Result<Vec<Document>, StoreError> {
        let tx = self.db.begin_read().map_err(storage)?;
        let table = tx.open_table(DOCUMENTS).map_err(storage)?;

        let mut docs = Vec::new();
        for item in table.iter().map_err(storage)? {
            let (_, value) = item.map_err(storage)?;
            let doc: Document = decode(value.value())?;
            if keep(&doc) {
                docs.push(doc);
            }
        }
        Ok(docs)
    }
}

impl Store for RedbStore {
    fn get_document(&self, id: &DocumentId) -> Result<Option<Document>, StoreError> {
        let tx = self.db.begin_read().map_err(storage)?;
        let table = tx.open_table(DOCUMENTS).map_err(storage)?;
        let doc = match table.get(id.as_str()).map_err(storage)? {
            Some(value) => Some(decode(value.value())?),
            None => None,
        };
        Ok(doc)
    }

    fn put_document(&self, doc: &Document) -> Result<(), StoreError> {
        let data = encode(doc)?;
        self.write(|tx| {
            let mut table = tx.open_table(DOCUMENTS).map_err(storage)?;
            table
                .insert(doc.id.as_str(), data.as_slice())
                .map_err(storage)?;
            Ok(())
        })
    }

    fn insert_document(&self, doc: &Document) -> Result<bool, StoreError> {
        let data = encode(doc)?;
        self.write(|tx| {
            let mut table = tx.open_table(DOCUMENTS).map_err(storage)?;
            if table.get(doc.id.as_str()).map_err(storage)?.is_some() {
                return Ok(false);
            }
            table
                .insert(doc.id.as_str(), data.as_slice())
                .map_err(storage)?;
            Ok(true)
        })
    }

    fn embedded_documents(&self) -> Result<Vec<Document>, StoreError> {
        let mut docs = self.scan_documents(|d| d.embedding.is_some())?;
        sort_embedded(&mut docs);
        Ok(docs)
    }

    fn members(&self, cluster: ClusterId) -> Result<Vec<Document>, StoreError> {
        let mut docs = self.scan_documents(|d| d.cluster == Some(cluster))?;
        sort_members(&mut docs);
        Ok(docs)
    }

    fn reassign_members(&self, from: ClusterId, to: ClusterId) -> Result<usize, StoreError> {
        self.write(|tx| {
            let mut table = tx.open_table(DOCUMENTS).map_err(storage)?;

            let mut updates: Vec<(String, Vec<u8>)> = Vec::new();
            for item in table.iter().map_err(storage)? {
                let (key, value) = item.map_err(storage)?;
                let mut doc: Document = decode(value.value())?;
                if doc.cluster == Some(from) {
                    doc.cluster = Some(to);
                    updates.push((key.value().to_string(), encode(&doc)?));
                }
            }

            for (key, data) in &updates {
                table
                    .insert(key.as_str(), data.as_slice())
                    .map_err(storage)?;
            }
            Ok(updates.len())
        })
    }

    fn get_cluster(&self, id: ClusterId) -> Result<Option<Cluster>, StoreError> {
        let tx = self.db.begin_read().map_err(storage)?;
        let table = tx.open_table(CLUSTERS).map_err(storage)?;
        let cluster = match table.get(id.0).map_err(storage)? {
            Some(value) => Some(decode(value.value())?),
            None => None,
        };
        Ok(cluster)
    }

    fn put_cluster(&self, cluster: &Cluster) -> Result<(), StoreError> {
        self.write(|tx| {
            let mut table = tx.open_table(CLUSTERS).map_err(storage)?;
            let existing: Cluster = match table.get(cluster.id.0).map_err(storage)? {
                Some(value) => decode(value.value())?,
                None => return Err(StoreError::NotFound(format!("cluster {}", cluster.id))),
            };

            let record = Cluster {
                slug: existing.slug,
                ..cluster.clone()
            };
            let data = encode(&record)?;
            table.insert(cluster.id.0, data.as_slice()).map_err(storage)?;
            Ok(())
        })
    }

    fn create_cluster(&self, new: NewCluster) -> Result<Cluster, StoreError> {
        self.write(|tx| {
            let mut clusters = tx.open_table(CLUSTERS).map_err(storage)?;
            let mut slugs = tx.open_table(SLUGS).map_err(storage)?;

            let next = match clusters.last().map_err(storage)? {
                Some((key, _)) => key.value() + 1,
                None => 1,
            };
            let slug = unique_slug(&new.slug_base, |s| {
                Ok(slugs.get(s).map_err(storage)?.is_some())
            })?;

            let cluster = new.into_cluster(ClusterId(next), slug);
            let data = encode(&cluster)?;
            clusters.insert(next, data.as_slice()).map_err(storage)?;
            slugs.insert(cluster.slug.as_str(), next).map_err(storage)?;
            Ok(cluster)
        })
    }

    fn clusters(&self) -> Result<Vec<Cluster>, StoreError> {
        let tx = self.db.begin_read().map_err(storage)?;
        let table = tx.open_table(CLUSTERS).map_err(storage)?;

        let mut clusters = Vec::new();
        for item in table.iter().map_err(storage)? {
            let (_, value) = item.map_err(storage)?;
            clusters.push(decode(value.value())?);
        }
        Ok(clusters)
    }

    fn insert_duplicate_link(&self, link: &DuplicateLink) -> Result<bool, StoreError> {
        let key = duplicate_key(&link.primary, &link.duplicate);
        let data = encode(link)?;
        self.write(|tx| {
            let mut table = tx.open_table(DUPLICATES).map_err(storage)?;
            if table.get(key.as_str()).map_err(storage)?.is_some() {
                return Ok(false);
            }
            table.insert(key.as_str(), data.as_slice()).map_err(storage)?;
            Ok(true)
        })
    }

    fn duplicate_links(&self, primary: &DocumentId) -> Result<Vec<DuplicateLink>, StoreError> {
        let prefix = duplicate_prefix(primary);
        let tx = self.db.begin_read().map_err(storage)?;
        let table = tx.open_table(DUPLICATES).map_err(storage)?;

        let mut links = Vec::new();
        for item in table.iter().map_err(storage)? {
            let (key, value) = item.map_err(storage)?;
            if !key.value().starts_with(&prefix) {
                continue;
            }
            let link: DuplicateLink = decode(value.value())?;
            if &link.primary == primary {
                links.push(link);
            }
        }
        Ok(links)
    }

    fn append_merge(&self, mut record: MergeRecord) -> Result<MergeRecord, StoreError> {
        self.write(|tx| {
            let mut table = tx.open_table(MERGES).map_err(storage)?;
            record.seq = match table.last().map_err(storage)? {
                Some((key, _)) => key.value() + 1,
                None => 1,
            };
            let data = encode(&record)?;
            table.insert(record.seq, data.as_slice()).map_err(storage)?;
            Ok(record)
        })
    }

    fn merge_records(&self) -> Result<Vec<MergeRecord>, StoreError> {
        let tx = self.db.begin_read().map_err(storage)?;
        let table = tx.open_table(MERGES).map_err(storage)?;

        let mut records = Vec::new();
        for item in table.iter().map_err(storage)? {
            let (_, value) = item.map_err(storage)?;
            records.push(decode(value.value())?);
        }
        Ok(records)
    }
}

/// Format: "{primary}:{duplicate}"
fn duplicate_key(primary: &DocumentId, duplicate: &DocumentId) -> String {
    format!("{primary}:{duplicate}")
}

/// Format: "{primary}:"
fn duplicate_prefix(primary: &DocumentId) -> String {
    format!("{primary}:")
}

fn storage(e: impl Display) -> StoreError {
    StoreError::Storage(e.to_string())
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
    rmp_serde::to_vec_named(value).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(data: &[u8]) -> Result<T, StoreError> {
    rmp_serde::from_slice(data).map_err(|e| StoreError::Serialization(e.to_string()))
}
