pub mod index;
pub mod memory;
pub mod qdrant;
pub mod schema;
pub mod sort;

mod error;

pub use error::Error;
pub use index::{
	AggregationField, BoxFuture, Hits, SearchIndex, SearchQuery, TermBucket, TermsAggregation,
	WriteGuard,
};
pub use memory::MemoryIndex;
pub use qdrant::QdrantIndex;
pub use schema::{FieldKind, IndexSchema, SchemaField};

pub type Result<T, E = Error> = std::result::Result<T, E>;
