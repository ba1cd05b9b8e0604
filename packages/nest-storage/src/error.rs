#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Index unavailable: {0}")]
	Unavailable(String),
	#[error("Index error: {0}")]
	Backend(String),
	#[error("Conflict: {0}")]
	Conflict(String),
	#[error("Not found: {0}")]
	NotFound(String),
	#[error(transparent)]
	Qdrant(#[from] Box<qdrant_client::QdrantError>),
	#[error(transparent)]
	Json(#[from] serde_json::Error),
}
impl From<qdrant_client::QdrantError> for Error {
	fn from(err: qdrant_client::QdrantError) -> Self {
		Self::Qdrant(Box::new(err))
	}
}
