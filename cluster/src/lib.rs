//! Incremental duplicate resolution and topic clustering for embedded
//! documents.
//!
//! Each document whose embedding becomes available goes through
//! [`Engine::on_article_embedded`]: duplicate resolution first, then
//! assignment to the closest active cluster, or a new singleton cluster
//! when none is close enough. Cluster statistics (centroid, representative,
//! member count, priority) are maintained as membership changes.
//!
//! # Usage
//!
//! ```
//! use std::sync::Arc;
//!
//! use analyst_cluster::{AssignmentKind, Config, Document, Engine, MemoryStore};
//! use chrono::Utc;
//!
//! let cfg = Config { dim: 3, ..Config::default() };
//! let engine = Engine::new(cfg, Arc::new(MemoryStore::new())).unwrap();
//!
//! let doc = Document::new("https://example.com/a", "Rust 2024", Utc::now())
//!     .with_embedding(vec![1.0, 0.0, 0.0]);
//! engine.register(&doc).unwrap();
//!
//! let assignment = engine.on_article_embedded(&doc.id).unwrap();
//! assert_eq!(assignment.kind, AssignmentKind::Created);
//! ```
//!
//! # Design
//!
//! The engine keeps no record state: every call re-reads from a [`Store`]
//! and writes results back, so retried calls are safe. Writers to one
//! cluster are serialized by a per-cluster lock; unrelated clusters proceed
//! in parallel.

mod assign;
mod centroid;
mod clock;
mod config;
mod dedup;
mod engine;
mod error;
mod label;
mod locks;
mod merge;
mod store;
mod types;

pub use centroid::priority_score;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use engine::Engine;
pub use error::ClusterError;
pub use store::{MemoryStore, RedbStore, Store, StoreError};
pub use types::{
    Assignment, AssignmentKind, Cluster, ClusterId, ClusterMatch, Document, DocumentId,
    DuplicateLink, MergeRecord, NewCluster, SimilarDocument,
};
