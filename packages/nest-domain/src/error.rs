pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
	#[error("Invalid specification: {0}")]
	InvalidSpecification(String),
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
}
