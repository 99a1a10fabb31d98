//! Exact cosine nearest-neighbor scan and the vector math shared by the
//! clustering engine.
//!
//! # Usage
//!
//! ```
//! use analyst_vecindex::SimilarityIndex;
//!
//! let idx = SimilarityIndex::new(3);
//! let candidates = vec![
//!     ("a", Some(vec![1.0, 0.0, 0.0])),
//!     ("b", None),
//!     ("c", Some(vec![0.0, 1.0, 0.0])),
//! ];
//! let hits = idx.nearest(&[1.0, 0.0, 0.0], candidates, 0.5, 10).unwrap();
//! assert_eq!(hits.len(), 1);
//! assert_eq!(hits[0].id, "a");
//! ```

mod cosine;
mod error;
mod index;

pub use cosine::{cosine_distance, cosine_similarity, mean};
pub use error::VecError;
pub use index::{Neighbor, SimilarityIndex};
