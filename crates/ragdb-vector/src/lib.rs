//! ragdb-vector
//!
//! Dense side of the hybrid engine: an exhaustive, in-memory vector index
//! with cosine or Euclidean distance.

pub mod distance;
pub mod index;

pub use distance::DistanceMetric;
pub use index::{VectorIndex, VectorQuery};
