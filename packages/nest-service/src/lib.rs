pub mod admin;
pub mod facets;
pub mod fetch;
pub mod persist;

mod error;

pub use admin::ReindexReport;
pub use error::{Error, Result};
pub use fetch::Page;
pub use persist::Persisted;

use std::sync::Arc;

use nest_config::{BACKEND_MEMORY, BACKEND_QDRANT, Config};
use nest_storage::{IndexSchema, MemoryIndex, QdrantIndex, SearchIndex};

/// Nest queries and resource persistence over one search index.
pub struct NestService {
	pub cfg: Config,
	pub index: Arc<dyn SearchIndex>,
}
impl NestService {
	pub fn new(cfg: Config, index: Arc<dyn SearchIndex>) -> Self {
		Self { cfg, index }
	}
}

/// Opens the index described by `cfg` with the resources schema.
pub fn open_index(cfg: &nest_config::Index) -> Result<Arc<dyn SearchIndex>> {
	match cfg.backend.as_str() {
		BACKEND_MEMORY => Ok(Arc::new(MemoryIndex::new(cfg.name.clone()))),
		BACKEND_QDRANT => Ok(Arc::new(QdrantIndex::new(cfg, IndexSchema::resources())?)),
		other => Err(Error::InvalidArgument { message: format!("Unknown index backend {other}.") }),
	}
}
