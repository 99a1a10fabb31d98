use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VecError {
    #[error("vecindex: dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}
