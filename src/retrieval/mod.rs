//! The hybrid retrieval core.
//!
//! - `fanout` - concurrent dispatch across N vector collections + 1 keyword index
//! - `normalize` - backend-native rows to canonical results
//! - `merge` - deduplication and the single comparable ordering
//! - `hybrid` - the orchestrator tying the pipeline together

pub mod fanout;
pub mod hybrid;
pub mod merge;
pub mod normalize;

pub use fanout::{BackendResponse, FanOutCoordinator, RawHits};
pub use hybrid::HybridRetriever;
pub use merge::merge_ranked;
