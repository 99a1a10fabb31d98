use analyst_vecindex::VecError;
use thiserror::Error;

use crate::store::StoreError;
use crate::types::{ClusterId, DocumentId};

#[derive(Error, Debug)]
pub enum ClusterError {
    #[error("cluster: invalid vector: expected dimension {expected}, got {got}")]
    InvalidVector { expected: usize, got: usize },

    #[error("cluster: document {0} has no embedding")]
    MissingEmbedding(DocumentId),

    #[error("cluster: document {0} not found")]
    DocumentNotFound(DocumentId),

    #[error("cluster: cluster {0} not found")]
    ClusterNotFound(ClusterId),

    #[error("cluster: cluster {0} is inactive")]
    InactiveCluster(ClusterId),

    #[error("cluster: cannot merge cluster {0} into itself")]
    SameCluster(ClusterId),

    #[error("cluster: invalid config: {0}")]
    InvalidConfig(String),

    #[error("cluster: {0}")]
    Store(#[from] StoreError),
}

impl ClusterError {
    /// Reports whether the surrounding job system may retry the operation.
    /// Only transient storage failures qualify.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClusterError::Store(StoreError::Storage(_)))
    }
}

impl From<VecError> for ClusterError {
    fn from(e: VecError) -> Self {
        match e {
            VecError::DimensionMismatch { expected, got } => {
                ClusterError::InvalidVector { expected, got }
            }
        }
    }
}
