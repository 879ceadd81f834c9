pub mod backends;
pub mod cli;
pub mod commands;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod model;
pub mod retrieval;

pub use config::Config;
pub use error::{BackendError, RetrievalError};
pub use model::{CollectionSet, MetadataFilter, OriginKind, SearchResult};
pub use retrieval::HybridRetriever;
