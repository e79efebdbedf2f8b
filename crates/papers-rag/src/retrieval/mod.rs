//! Vector indexing and retrieval

mod exact;
mod index;
mod ivf;
mod retriever;
mod similarity;

pub use exact::ExactIndex;
pub use index::{build_index, VectorIndex};
pub use ivf::IvfIndex;
pub use retriever::Retriever;
pub use similarity::cosine_similarity;
