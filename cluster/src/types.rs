use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identities
// ---------------------------------------------------------------------------

/// Stable document identity: hex blake3 hash of the canonical source locator.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Derives the identity of the document found at `locator`
    /// (e.g. a canonical URL).
    pub fn from_locator(locator: &str) -> Self {
        Self(blake3::hash(locator.as_bytes()).to_hex().to_string())
    }

    /// Wraps an already-computed identity.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Store-allocated cluster identity. Allocation starts at 1.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ClusterId(pub u64);

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// An ingested document as seen by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,

    /// Canonical source locator the id was derived from.
    pub locator: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,

    /// Set once by the embedding step, never rewritten here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster: Option<ClusterId>,

    /// Always `Some` when `cluster` is `Some`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity_to_cluster: Option<f32>,

    pub created_at: DateTime<Utc>,
}

impl Document {
    pub fn new(
        locator: impl Into<String>,
        title: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let locator = locator.into();
        Self {
            id: DocumentId::from_locator(&locator),
            locator,
            title: title.into(),
            embedding: None,
            cluster: None,
            similarity_to_cluster: None,
            created_at,
        }
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Points the document at `cluster`, keeping the reference and score
    /// in step.
    pub fn assign(&mut self, cluster: ClusterId, similarity: f32) {
        self.cluster = Some(cluster);
        self.similarity_to_cluster = Some(similarity);
    }

    pub fn detach(&mut self) {
        self.cluster = None;
        self.similarity_to_cluster = None;
    }
}

// ---------------------------------------------------------------------------
// Cluster
// ---------------------------------------------------------------------------

/// A topic cluster and its summary statistics.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub id: ClusterId,

    /// Human-readable label.
    pub label: String,

    /// Unique URL slug derived from the label.
    pub slug: String,

    /// Element-wise mean of sampled member embeddings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub centroid: Option<Vec<f32>>,

    /// Member closest to the centroid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub representative: Option<DocumentId>,

    pub member_count: usize,

    /// `0.3 * members + 0.7 * recent members`; refreshed periodically.
    pub priority_score: f64,

    /// Inactive clusters are never assignment targets.
    pub active: bool,

    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_membership_change: Option<DateTime<Utc>>,
}

impl fmt::Debug for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cluster")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("slug", &self.slug)
            .field("centroid_len", &self.centroid.as_ref().map(|c| c.len()))
            .field("representative", &self.representative)
            .field("member_count", &self.member_count)
            .field("priority_score", &self.priority_score)
            .field("active", &self.active)
            .finish()
    }
}

/// Input to [`Store::create_cluster`](crate::Store::create_cluster).
/// The store allocates the id and makes the slug unique.
#[derive(Debug, Clone)]
pub struct NewCluster {
    pub label: String,
    pub slug_base: String,
    pub centroid: Vec<f32>,
    pub representative: DocumentId,
    pub created_at: DateTime<Utc>,
}

impl NewCluster {
    /// Builds the cluster record a store persists for this request.
    pub(crate) fn into_cluster(self, id: ClusterId, slug: String) -> Cluster {
        Cluster {
            id,
            label: self.label,
            slug,
            centroid: Some(self.centroid),
            representative: Some(self.representative),
            member_count: 1,
            priority_score: 0.0,
            active: true,
            created_at: self.created_at,
            last_membership_change: Some(self.created_at),
        }
    }
}

// ---------------------------------------------------------------------------
// Audit records
// ---------------------------------------------------------------------------

/// A decided duplicate relationship. Unique per (primary, duplicate).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateLink {
    pub primary: DocumentId,
    pub duplicate: DocumentId,
    pub similarity: f32,
    pub created_at: DateTime<Utc>,
}

/// Append-only record of one cluster folded into another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeRecord {
    /// Store-allocated sequence number.
    pub seq: u64,
    pub source: ClusterId,
    pub target: ClusterId,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,
    pub documents_moved: usize,
    pub merged_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Engine outcomes
// ---------------------------------------------------------------------------

/// A candidate document paired with its cosine similarity to the query.
#[derive(Debug, Clone)]
pub struct SimilarDocument {
    pub document: Document,
    pub similarity: f32,
}

/// A candidate cluster paired with the query's similarity to its centroid.
#[derive(Debug, Clone)]
pub struct ClusterMatch {
    pub cluster: Cluster,
    pub similarity: f32,
}

/// How a document ended up in its cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentKind {
    /// Inherited from the primary of a duplicate link.
    Duplicate,
    /// Joined the closest existing cluster.
    Joined,
    /// Seeded a new singleton cluster.
    Created,
    /// Already had a cluster; nothing changed.
    Unchanged,
}

/// Result of running a document through the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub cluster: ClusterId,
    pub similarity: f32,
    pub kind: AssignmentKind,
}
